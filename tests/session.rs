extern crate ds2502_prog;

use ds2502_prog::ds2502::{
	ERASED,
	MEMORY_SIZE,
};
use ds2502_prog::onewire::{
	BitBang,
	RomId,
};
use ds2502_prog::session::{
	Collision,
	Conflict,
	Event,
	Session,
	State,
};
use ds2502_prog::sim::{
	SimDevice,
	SimWire,
};

fn prom() -> RomId {
	RomId::new(0x09, [0x5A, 0x1D, 0x00, 0x00, 0x02, 0x25])
}

fn sensor() -> RomId {
	RomId::new(0x28, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
}

struct Operator {
	session: Session,
	bus: BitBang<SimWire>,
}

impl Operator {
	fn new() -> Self {
		let wire = SimWire::new(vec![SimDevice::new(sensor()), SimDevice::new(prom())]);
		let mut session = Session::new();
		let mut events = Vec::new();
		session.start(&mut events);
		assert_eq!(events, vec![Event::Menu]);
		Operator {
			session,
			bus: BitBang::new(wire),
		}
	}

	fn enter(&mut self, line: &str) -> Vec<Event> {
		let mut events = Vec::new();
		self.session.handle_line(&mut self.bus, &mut events, line);
		events
	}

	fn memory(&self) -> &[u8] {
		&self.bus.hardware().device(1).memory()[..]
	}
}

#[test]
fn write_then_overwrite() {
	let mut op = Operator::new();

	// the sensor's family code sorts first in the search
	assert_eq!(op.enter("4"), vec![
		Event::WrongFamily { number: 1, family: 0x28 },
		Event::Device { number: 2, rom: prom() },
		Event::PromptPayload,
	]);
	assert_eq!(op.enter("48 69"), vec![Event::PromptAddress]);
	assert_eq!(op.enter("00"), vec![
		Event::CurrentData(vec![ERASED; MEMORY_SIZE]),
		Event::Preview { address: 0, data: vec![0x48, 0x69] },
		Event::PromptConfirm,
	]);

	let mut image = vec![ERASED; MEMORY_SIZE];
	image[0] = 0x48;
	image[1] = 0x69;
	assert_eq!(op.enter("y"), vec![
		Event::Writing,
		Event::Written { address: 0, len: 2 },
		Event::WrongFamily { number: 1, family: 0x28 },
		Event::Device { number: 2, rom: prom() },
		Event::Memory { rom: prom(), data: image.clone() },
		Event::Menu,
	]);
	assert_eq!(op.session.state(), State::Idle);
	assert_eq!(op.memory(), &image[..]);

	// 0x69 -> 0x41 only clears bits
	op.enter("4");
	op.enter("41");
	let events = op.enter("01");
	assert!(events.contains(&Event::Collision(Conflict {
		address: 1,
		existing: 0x69,
		requested: 0x41,
		collision: Collision::Correct,
	})));
	assert_eq!(events.last(), Some(&Event::PromptConfirm));
	op.enter("Y");
	image[1] = 0x41;
	assert_eq!(op.memory(), &image[..]);

	// the sensor never saw a programming pulse
	assert_eq!(op.bus.hardware().device(0).programmed(), 0);
	assert_eq!(op.bus.hardware().device(1).programmed(), 3);
}

#[test]
fn declined_write_leaves_device_untouched() {
	let mut op = Operator::new();
	op.enter("4");
	op.enter("FFFF0000");
	op.enter("7c");
	assert_eq!(op.session.state(), State::AwaitingConfirmation);
	assert_eq!(op.enter("n"), vec![Event::Cancelled, Event::Menu]);
	assert_eq!(op.memory(), &[ERASED; MEMORY_SIZE][..]);
	assert!(op.bus.hardware().pulses().is_empty());
}

#[test]
fn reading_commands_cover_every_ds2502() {
	let mut op = Operator::new();
	let events = op.enter("3");
	assert_eq!(events, vec![
		Event::WrongFamily { number: 1, family: 0x28 },
		Event::Device { number: 2, rom: prom() },
		Event::Memory { rom: prom(), data: vec![ERASED; MEMORY_SIZE] },
		Event::Menu,
	]);
	assert_eq!(op.session.state(), State::Idle);
}
