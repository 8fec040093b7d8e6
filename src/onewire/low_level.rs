use std::time::Duration;

use super::Hardware;

// standard speed slot timing (Maxim AN126, values A-J)
const WRITE_ONE_LOW: Duration = Duration::from_micros(6); // A
const WRITE_ONE_RELEASE: Duration = Duration::from_micros(64); // B
const WRITE_ZERO_LOW: Duration = Duration::from_micros(60); // C
const WRITE_ZERO_RELEASE: Duration = Duration::from_micros(10); // D
const READ_SAMPLE: Duration = Duration::from_micros(9); // E
const READ_RELEASE: Duration = Duration::from_micros(55); // F
const RESET_LOW: Duration = Duration::from_micros(480); // H
const PRESENCE_SAMPLE: Duration = Duration::from_micros(70); // I
const RESET_RELEASE: Duration = Duration::from_micros(410); // J

trait InternalLowLevel: Hardware {
	// pull the line LOW for `low`, then release it
	fn _pulse(&mut self, low: Duration) {
		self.pull_low(true);
		self.delay(low);
		self.pull_low(false);
	}
}

impl<H: Hardware + ?Sized> InternalLowLevel for H {
}

pub trait LowLevel: Hardware {
	// returns whether a presence pulse was seen
	fn reset_pulse(&mut self) -> bool {
		self._pulse(RESET_LOW);
		self.delay(PRESENCE_SAMPLE);
		// presence: some device holds the line LOW
		let presence = !self.read_pin();
		self.delay(RESET_RELEASE);
		presence
	}

	fn write_bit(&mut self, bit: bool) {
		if bit {
			self._pulse(WRITE_ONE_LOW);
			self.delay(WRITE_ONE_RELEASE);
		} else {
			self._pulse(WRITE_ZERO_LOW);
			self.delay(WRITE_ZERO_RELEASE);
		}
	}

	// a read slot is a "1" write slot with a sample in the middle
	fn read_bit(&mut self) -> bool {
		self._pulse(WRITE_ONE_LOW);
		self.delay(READ_SAMPLE);
		let bit = self.read_pin();
		self.delay(READ_RELEASE);
		bit
	}

	// least significant bit first
	fn send_byte(&mut self, byte: u8) {
		for bit in 0..8 {
			self.write_bit(0 != byte & (1 << bit));
		}
	}

	fn receive_byte(&mut self) -> u8 {
		let mut result = 0u8;
		for bit in 0..8 {
			if self.read_bit() {
				result |= 1 << bit;
			}
		}
		result
	}
}

impl<H: Hardware + ?Sized> LowLevel for H {
}

#[cfg(test)]
mod tests {
	use super::*;

	// records the LOW pulse widths and answers every sample with `level`
	struct Recorder {
		now: Duration,
		low_since: Option<Duration>,
		pulses: Vec<Duration>,
		level: bool,
	}

	impl Hardware for Recorder {
		fn pull_low(&mut self, low: bool) {
			if low {
				self.low_since = Some(self.now);
			} else if let Some(since) = self.low_since.take() {
				self.pulses.push(self.now - since);
			}
		}
		fn read_pin(&mut self) -> bool {
			self.level
		}
		fn set_program_enable(&mut self, _active: bool) {
		}
		fn delay(&mut self, duration: Duration) {
			self.now += duration;
		}
	}

	fn recorder(level: bool) -> Recorder {
		Recorder {
			now: Duration::from_micros(0),
			low_since: None,
			pulses: Vec::new(),
			level,
		}
	}

	#[test]
	fn byte_slots_lsb_first() {
		let mut hw = recorder(true);
		hw.send_byte(0b0000_0101);
		let widths: Vec<u64> = hw.pulses.iter().map(|d| d.as_micros() as u64).collect();
		assert_eq!(widths, vec![6, 60, 6, 60, 60, 60, 60, 60]);
		// every slot takes 70µs
		assert_eq!(hw.now, Duration::from_micros(8 * 70));
	}

	#[test]
	fn reset_presence() {
		let mut hw = recorder(false);
		assert!(hw.reset_pulse());
		assert_eq!(hw.pulses, vec![RESET_LOW]);
		let mut hw = recorder(true);
		assert!(!hw.reset_pulse());
	}

	#[test]
	fn receive_idle_line() {
		let mut hw = recorder(true);
		assert_eq!(hw.receive_byte(), 0xff);
		let mut hw = recorder(false);
		assert_eq!(hw.receive_byte(), 0x00);
	}
}
