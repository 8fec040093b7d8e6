//! Interactive write workflow
//!
//! A `Session` consumes one input line at a time. Reading commands run
//! immediately over all enumerated DS2502 devices; writing collects a hex
//! payload and a start address, shows what the device currently contains
//! (and what already programmed bytes would turn into) and only programs
//! after an explicit "y".

mod hex;
mod pending;
mod report;

pub use self::hex::{
	HexError,
	encode as encode_hex,
};
pub use self::pending::{
	AddressError,
	Collision,
	Conflict,
	PayloadError,
	PendingWrite,
	check_range,
	conflicts,
};
pub use self::report::{
	Event,
	Report,
};

use crate::ds2502::{
	self,
	Discovery,
	MEMORY_SIZE,
};
use crate::onewire::{
	Bus,
	RomId,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
	Idle,
	AwaitingPayload,
	AwaitingAddress,
	AwaitingConfirmation,
	Restarting,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
	ReadStatus,
	ReadRom,
	ReadData,
	WriteData,
}

impl Command {
	pub fn parse(line: &str) -> Option<Self> {
		Some(match line.trim() {
			"1" => Command::ReadStatus,
			"2" => Command::ReadRom,
			"3" => Command::ReadData,
			"4" => Command::WriteData,
			_ => return None,
		})
	}
}

#[derive(Debug)]
pub struct Session {
	state: State,
	target: Option<RomId>,
	payload: Vec<u8>,
	pending: Option<PendingWrite>,
}

impl Default for Session {
	fn default() -> Self {
		Self::new()
	}
}

impl Session {
	pub fn new() -> Self {
		Session {
			state: State::Idle,
			target: None,
			payload: Vec::new(),
			pending: None,
		}
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// device selected for the write in progress
	pub fn target(&self) -> Option<RomId> {
		self.target
	}

	pub fn start<R: Report + ?Sized>(&mut self, report: &mut R) {
		self.to_idle(report);
	}

	/// Feed one line of operator input (without line terminator)
	pub fn handle_line<B, R>(&mut self, bus: &mut B, report: &mut R, line: &str)
	where
		B: Bus + ?Sized,
		R: Report + ?Sized,
	{
		let line = line.trim_end_matches(&['\r', '\n'][..]);
		match self.state {
			State::Idle => self.command(bus, report, line),
			State::AwaitingPayload => self.payload(report, line),
			State::AwaitingAddress => self.address(bus, report, line),
			State::AwaitingConfirmation => self.confirm(bus, report, line),
			// transient; never waits for input
			State::Restarting => self.restart(bus, report),
		}
	}

	fn to_idle<R: Report + ?Sized>(&mut self, report: &mut R) {
		self.state = State::Idle;
		self.target = None;
		self.payload.clear();
		self.pending = None;
		report.report(Event::Menu);
	}

	fn command<B: Bus + ?Sized, R: Report + ?Sized>(&mut self, bus: &mut B, report: &mut R, line: &str) {
		let command = match Command::parse(line) {
			Some(command) => command,
			None => {
				report.report(Event::InvalidCommand(line.to_string()));
				return self.to_idle(report);
			},
		};
		debug!("command {:?}", command);

		if Command::WriteData == command {
			return self.select_target(bus, report);
		}
		dispatch(bus, report, command);
		self.to_idle(report);
	}

	fn select_target<B: Bus + ?Sized, R: Report + ?Sized>(&mut self, bus: &mut B, report: &mut R) {
		let mut target = None;
		for discovery in ds2502::devices(bus) {
			if let Some(rom) = announce(report, discovery) {
				target = Some(rom);
				break;
			}
		}
		match target {
			None => {
				report.report(Event::NoDevices);
				self.to_idle(report);
			},
			Some(rom) => {
				info!("writing to {}", rom);
				self.target = Some(rom);
				self.state = State::AwaitingPayload;
				report.report(Event::PromptPayload);
			},
		}
	}

	fn payload<R: Report + ?Sized>(&mut self, report: &mut R, line: &str) {
		let text: String = line.chars().filter(|c| ' ' != *c).collect();
		let data = match hex::decode(&text) {
			Ok(data) => data,
			Err(e) => {
				report.report(Event::PayloadRejected(PayloadError::Hex(e)));
				return self.to_idle(report);
			},
		};
		if data.is_empty() {
			return report.report(Event::PromptPayload);
		}
		if data.len() >= MEMORY_SIZE {
			report.report(Event::PayloadRejected(PayloadError::TooMany(data.len())));
			return self.to_idle(report);
		}
		self.payload = data;
		self.state = State::AwaitingAddress;
		report.report(Event::PromptAddress);
	}

	fn address<B: Bus + ?Sized, R: Report + ?Sized>(&mut self, bus: &mut B, report: &mut R, line: &str) {
		let text: String = line.chars().filter(|c| ' ' != *c).collect();
		let address = match hex::decode(&text) {
			Err(e) => Err(AddressError::Hex(e)),
			Ok(ref bytes) if 1 != bytes.len() => Err(AddressError::NotSingleByte(bytes.len())),
			Ok(bytes) => Ok(bytes[0]),
		};
		let pending = match address.and_then(|address| PendingWrite::new(address, self.payload.clone())) {
			Ok(pending) => pending,
			Err(e) => {
				report.report(Event::AddressRejected(e));
				return self.to_idle(report);
			},
		};
		let target = match self.target {
			Some(target) => target,
			None => return self.to_idle(report),
		};

		let current = match ds2502::read_memory(bus, &target) {
			Ok(current) => current,
			Err(e) => {
				error!("{}: {}", target, e);
				report.report(Event::ReadFailed(e));
				return self.to_idle(report);
			},
		};
		report.report(Event::CurrentData(current.to_vec()));
		for conflict in conflicts(&current, &pending) {
			if !conflict.collision.is_correct() {
				warn!("0x{:02X}: 0x{:02X} would become 0x{:02X}", conflict.address, conflict.existing, conflict.existing & conflict.requested);
			}
			report.report(Event::Collision(conflict));
		}
		report.report(Event::Preview {
			address: pending.address(),
			data: pending.data().to_vec(),
		});
		self.pending = Some(pending);
		self.state = State::AwaitingConfirmation;
		report.report(Event::PromptConfirm);
	}

	fn confirm<B: Bus + ?Sized, R: Report + ?Sized>(&mut self, bus: &mut B, report: &mut R, line: &str) {
		match line.trim().to_lowercase().as_str() {
			"y" => (),
			"n" => {
				report.report(Event::Cancelled);
				return self.to_idle(report);
			},
			_ => return report.report(Event::PromptConfirm),
		}

		let (target, pending) = match (self.target, self.pending.take()) {
			(Some(target), Some(pending)) => (target, pending),
			_ => return self.to_idle(report),
		};
		report.report(Event::Writing);
		match ds2502::write_memory(bus, &target, pending.address(), pending.data()) {
			Ok(()) => {
				report.report(Event::Written {
					address: pending.address(),
					len: pending.data().len(),
				});
				self.state = State::Restarting;
				self.restart(bus, report);
			},
			Err(e) => {
				error!("{}: write aborted: {}", target, e);
				report.report(Event::WriteFailed(e));
				self.to_idle(report);
			},
		}
	}

	fn restart<B: Bus + ?Sized, R: Report + ?Sized>(&mut self, bus: &mut B, report: &mut R) {
		dispatch(bus, report, Command::ReadData);
		self.to_idle(report);
	}
}

// reports a discovery; returns the identifier of a usable device
fn announce<R: Report + ?Sized>(report: &mut R, discovery: Discovery) -> Option<RomId> {
	match discovery {
		Discovery::Device { number, rom } => {
			report.report(Event::Device { number, rom });
			Some(rom)
		},
		Discovery::WrongFamily { number, rom } => {
			report.report(Event::WrongFamily { number, family: rom.family() });
			None
		},
		Discovery::Crc { number, error } => {
			report.report(Event::RomCrc { number, error });
			None
		},
	}
}

/// Run a reading command over every DS2502 on the bus
pub fn dispatch<B: Bus + ?Sized, R: Report + ?Sized>(bus: &mut B, report: &mut R, command: Command) {
	let mut found = false;
	let mut iter = ds2502::devices(bus);
	while let Some(discovery) = iter.next() {
		let rom = match announce(report, discovery) {
			Some(rom) => rom,
			None => continue,
		};
		found = true;
		let event = match command {
			Command::ReadStatus => match ds2502::read_status(iter.bus(), &rom) {
				Ok(status) => Event::Status { rom, status },
				Err(e) => Event::ReadFailed(e),
			},
			Command::ReadRom => Event::Rom(rom),
			Command::ReadData => match ds2502::read_memory(iter.bus(), &rom) {
				Ok(image) => Event::Memory { rom, data: image.to_vec() },
				Err(e) => Event::ReadFailed(e),
			},
			Command::WriteData => continue,
		};
		report.report(event);
	}
	if !found {
		report.report(Event::NoDevices);
	}
}
