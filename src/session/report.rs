use crate::ds2502::{
	self,
	CrcError,
	Status,
	WriteError,
};
use crate::onewire::RomId;

use super::{
	AddressError,
	Conflict,
	PayloadError,
};

/// Everything a session has to tell the operator
#[derive(Clone, PartialEq, Debug)]
pub enum Event {
	Menu,
	InvalidCommand(String),
	NoDevices,
	Device { number: usize, rom: RomId },
	WrongFamily { number: usize, family: u8 },
	RomCrc { number: usize, error: CrcError },
	Status { rom: RomId, status: Status },
	Rom(RomId),
	Memory { rom: RomId, data: Vec<u8> },
	ReadFailed(ds2502::Error),
	PromptPayload,
	PayloadRejected(PayloadError),
	PromptAddress,
	AddressRejected(AddressError),
	/// device content before a write
	CurrentData(Vec<u8>),
	Collision(Conflict),
	Preview { address: u8, data: Vec<u8> },
	PromptConfirm,
	Writing,
	WriteFailed(WriteError),
	Written { address: u8, len: usize },
	Cancelled,
}

pub trait Report {
	fn report(&mut self, event: Event);
}

impl<R: Report + ?Sized> Report for &mut R {
	fn report(&mut self, event: Event) {
		(**self).report(event)
	}
}

/// collects events, mostly useful for tests
impl Report for Vec<Event> {
	fn report(&mut self, event: Event) {
		self.push(event)
	}
}
