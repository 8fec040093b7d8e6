//! 1-Wire bus master (standard speed)
//!
//! A single open-drain data line with a pull-up; the master and all devices
//! can only pull it low. Every transfer starts with the master pulling the
//! line low:
//!
//! - Reset: LOW for 480µs; devices answer with a presence pulse (LOW) within
//!   the following 60-240µs.
//! - Write 1: LOW for ~6µs, then release for the rest of the 70µs slot.
//! - Write 0: LOW for ~60µs.
//! - Read: LOW for ~6µs, release and sample at ~15µs; a device sending "0"
//!   holds the line LOW past the sample point.
//!
//! Bytes are sent least significant bit first.
//!
//! ROM commands (after reset):
//! - 0xF0: SEARCH ROM; for each of the 64 identifier bits, devices send the
//!   bit and its complement, the master answers with the direction to follow
//! - 0x55: MATCH ROM, followed by the 64-bit identifier
//! - 0xCC: SKIP ROM (only sensible with a single device on the bus)
//! - 0x33: READ ROM (single device only)
//!
//! After a ROM command the (single) selected device expects a memory function
//! command, see `crate::ds2502`.

use std::fmt;
use std::time::Duration;

mod bitbang;
mod crc;
mod hardware;
mod low_level;

pub use self::bitbang::BitBang;

pub use self::crc::{
	Crc8,
	crc8,
};

pub use self::hardware::{
	Hardware,
	busy_wait,
};

pub use self::low_level::LowLevel;

pub const SEARCH_ROM: u8 = 0xF0;
pub const MATCH_ROM: u8 = 0x55;
pub const SKIP_ROM: u8 = 0xCC;
pub const READ_ROM: u8 = 0x33;

/// 64-bit device identifier: family code, 48-bit serial number, CRC8
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RomId(pub [u8; 8]);

impl RomId {
	/// Builds an identifier with a correct trailing CRC
	pub fn new(family: u8, serial: [u8; 6]) -> Self {
		let mut rom = [0u8; 8];
		rom[0] = family;
		rom[1..7].copy_from_slice(&serial);
		rom[7] = crc8(&rom[..7]);
		RomId(rom)
	}

	pub fn family(&self) -> u8 {
		self.0[0]
	}

	pub fn serial(&self) -> &[u8] {
		&self.0[1..7]
	}

	pub fn crc(&self) -> u8 {
		self.0[7]
	}

	// bit `index` (0..64) in transmission order
	pub fn bit(&self, index: usize) -> bool {
		0 != self.0[index / 8] & (1 << (index % 8))
	}

	pub fn set_bit(&mut self, index: usize, value: bool) {
		let mask = 1 << (index % 8);
		if value {
			self.0[index / 8] |= mask;
		} else {
			self.0[index / 8] &= !mask;
		}
	}
}

impl fmt::Display for RomId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for b in self.0.iter() {
			write!(f, "{:02X}", b)?;
		}
		Ok(())
	}
}

impl fmt::Debug for RomId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "RomId({})", self)
	}
}

/// Blocking 1-Wire bus master
///
/// Every call returns only after the corresponding wire-level sequence
/// completed.
pub trait Bus {
	/// reset pulse; returns whether any device answered with a presence pulse
	fn reset(&mut self) -> bool;

	/// continue the device search; `None` when all devices have been found
	/// (or none is present)
	fn search(&mut self) -> Option<RomId>;

	/// restart the device search from the beginning
	fn reset_search(&mut self);

	fn write_byte(&mut self, byte: u8);

	fn read_byte(&mut self) -> u8;

	fn write_bytes(&mut self, bytes: &[u8]) {
		for b in bytes {
			self.write_byte(*b);
		}
	}

	fn read_bytes(&mut self, target: &mut [u8]) {
		for t in target.iter_mut() {
			*t = self.read_byte();
		}
	}

	/// reset and address a single device; returns presence
	fn select(&mut self, rom: &RomId) -> bool {
		if !self.reset() {
			return false;
		}
		self.write_byte(MATCH_ROM);
		self.write_bytes(&rom.0);
		true
	}

	/// reset and address all devices at once; returns presence
	fn skip(&mut self) -> bool {
		if !self.reset() {
			return false;
		}
		self.write_byte(SKIP_ROM);
		true
	}

	/// Drive the programming-enable output active for `width`
	///
	/// Real-time contract: the output is active for at least `width` and not
	/// noticeably longer; implementations must not log, allocate, sleep or
	/// touch the bus between activating and deactivating it.
	fn program_pulse(&mut self, width: Duration);
}

impl<'a, B: Bus + ?Sized> Bus for &'a mut B {
	fn reset(&mut self) -> bool {
		B::reset(*self)
	}
	fn search(&mut self) -> Option<RomId> {
		B::search(*self)
	}
	fn reset_search(&mut self) {
		B::reset_search(*self)
	}
	fn write_byte(&mut self, byte: u8) {
		B::write_byte(*self, byte)
	}
	fn read_byte(&mut self) -> u8 {
		B::read_byte(*self)
	}
	fn write_bytes(&mut self, bytes: &[u8]) {
		B::write_bytes(*self, bytes)
	}
	fn read_bytes(&mut self, target: &mut [u8]) {
		B::read_bytes(*self, target)
	}
	fn select(&mut self, rom: &RomId) -> bool {
		B::select(*self, rom)
	}
	fn skip(&mut self) -> bool {
		B::skip(*self)
	}
	fn program_pulse(&mut self, width: Duration) {
		B::program_pulse(*self, width)
	}
}
