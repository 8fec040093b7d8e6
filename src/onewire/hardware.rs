use std::hint;
use std::time::{
	Duration,
	Instant,
};

/// Spin until at least `duration` passed.
///
/// `thread::sleep` overshoots by far more than a 1-Wire slot allows, so the
/// timing-relevant delays burn CPU instead.
pub fn busy_wait(duration: Duration) {
	let start = Instant::now();
	while start.elapsed() < duration {
		hint::spin_loop();
	}
}

pub trait Hardware {
	/// `true`: drive the data line LOW; `false`: release it to the pull-up
	fn pull_low(&mut self, low: bool);

	/// current level of the data line (`true` is HIGH)
	fn read_pin(&mut self) -> bool;

	/// programming-enable output; `true` is active (logic LOW on the wire)
	fn set_program_enable(&mut self, active: bool);

	// delay for (at least) `duration`
	fn delay(&mut self, duration: Duration) {
		busy_wait(duration);
	}
}

impl<'a, H: Hardware + ?Sized> Hardware for &'a mut H {
	fn pull_low(&mut self, low: bool) {
		H::pull_low(*self, low)
	}
	fn read_pin(&mut self) -> bool {
		H::read_pin(*self)
	}
	fn set_program_enable(&mut self, active: bool) {
		H::set_program_enable(*self, active)
	}
	fn delay(&mut self, duration: Duration) {
		H::delay(*self, duration)
	}
}
