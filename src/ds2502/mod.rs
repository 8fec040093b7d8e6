//! Maxim DS2502: 1 kbit add-only (write-once) memory on 1-Wire
//!
//! Datasheet: https://www.analog.com/media/en/technical-documentation/data-sheets/DS2502.pdf
//!
//! Memory function commands (after a ROM command addressed the device):
//! - 0xF0: READ MEMORY, 2-byte address (little endian); device echoes CRC8 of
//!   command and address, then streams data bytes
//! - 0xAA: READ STATUS, same framing for the 8-byte status page; CRC8 of the
//!   status bytes follows the last one
//! - 0x0F: WRITE MEMORY, 2-byte address, data byte; device echoes CRC8 of the
//!   four bytes, then the master applies the 480µs programming pulse (12V
//!   on the data line, switched by an external circuit) and reads the byte
//!   back. The device increments the address; following bytes are sent
//!   without command and address.
//!
//! Erased memory reads as 0xff; programming can only clear bits.

mod enumerate;
mod frame;
mod memory;
mod program;

use std::time::Duration;

pub use self::enumerate::{
	Devices,
	Discovery,
	devices,
};

pub use self::frame::{
	CrcError,
	CrcLocation,
	check_crc,
	check_crc_from_bus,
	read_frame,
	status_frame,
	write_frame,
};

pub use self::memory::{
	Status,
	read_memory,
	read_memory_into,
	read_status,
};

pub use self::program::{
	WriteError,
	write_memory,
};

pub const FAMILY_CODE: u8 = 0x09;

pub const MEMORY_SIZE: usize = 128;
pub const STATUS_SIZE: usize = 8;
pub const PAGE_COUNT: usize = 4;

pub const READ_MEMORY: u8 = 0xF0;
pub const READ_STATUS: u8 = 0xAA;
pub const WRITE_MEMORY: u8 = 0x0F;

pub const ERASED: u8 = 0xff;

pub const PROGRAM_PULSE: Duration = Duration::from_micros(480);

pub type MemoryImage = [u8; MEMORY_SIZE];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum Error {
	#[fail(display = "no presence pulse")]
	NoPresence,
	#[fail(display = "Can't read {} bytes, memory only has {}", _0, _1)]
	TooLong(usize, usize),
	#[fail(display = "{}", _0)]
	Crc(#[cause] CrcError),
}

impl From<CrcError> for Error {
	fn from(e: CrcError) -> Self {
		Error::Crc(e)
	}
}
