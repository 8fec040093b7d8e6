use crate::onewire::{
	Bus,
	RomId,
};

use super::{
	CrcError,
	CrcLocation,
	FAMILY_CODE,
	check_crc,
};

/// One step of the enumeration; `number` counts found devices from 1
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Discovery {
	Device { number: usize, rom: RomId },
	WrongFamily { number: usize, rom: RomId },
	// last item: the bus is presumed disturbed
	Crc { number: usize, error: CrcError },
}

pub struct Devices<'a, B: Bus + ?Sized + 'a> {
	bus: &'a mut B,
	number: usize,
	done: bool,
}

impl<'a, B: Bus + ?Sized> Devices<'a, B> {
	/// number of identifiers found so far
	pub fn found(&self) -> usize {
		self.number
	}

	/// talk to a device found so far; the search continues afterwards
	pub fn bus(&mut self) -> &mut B {
		&mut *self.bus
	}
}

impl<'a, B: Bus + ?Sized> Iterator for Devices<'a, B> {
	type Item = Discovery;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		let rom = match self.bus.search() {
			Some(rom) => rom,
			None => {
				self.done = true;
				return None;
			},
		};
		self.number += 1;
		let number = self.number;

		if let Err(error) = check_crc(CrcLocation::Rom, &rom.0[..7], rom.crc()) {
			error!("Device {}: {}", number, error);
			self.done = true;
			return Some(Discovery::Crc { number, error });
		}

		if rom.family() != FAMILY_CODE {
			warn!("Device {}: family 0x{:02X} is not a DS2502 (0x{:02X})", number, rom.family(), FAMILY_CODE);
			return Some(Discovery::WrongFamily { number, rom });
		}

		debug!("Device {}: {}", number, rom);
		Some(Discovery::Device { number, rom })
	}
}

/// Start a fresh enumeration of all devices on the bus
pub fn devices<B: Bus + ?Sized>(bus: &mut B) -> Devices<B> {
	bus.reset_search();
	Devices {
		bus,
		number: 0,
		done: false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::onewire::{
		BitBang,
		crc8,
	};
	use crate::sim::{
		SimDevice,
		SimWire,
	};

	fn bus(roms: &[RomId]) -> BitBang<SimWire> {
		BitBang::new(SimWire::new(roms.iter().map(|rom| SimDevice::new(*rom)).collect()))
	}

	#[test]
	fn yields_valid_ds2502() {
		let mut raw = [0x09, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6, 0x00];
		raw[7] = crc8(&raw[..7]);
		let rom = RomId(raw);
		let mut bus = bus(&[rom]);
		let found: Vec<_> = devices(&mut bus).collect();
		assert_eq!(found, vec![Discovery::Device { number: 1, rom }]);
	}

	#[test]
	fn no_devices() {
		let mut bus = bus(&[]);
		let mut iter = devices(&mut bus);
		assert_eq!(iter.next(), None);
		assert_eq!(iter.found(), 0);
	}

	#[test]
	fn skips_other_families() {
		let other = RomId::new(0x28, [1, 2, 3, 4, 5, 6]);
		let prom = RomId::new(0x09, [1, 2, 3, 4, 5, 6]);
		let mut bus = bus(&[other, prom]);
		let found: Vec<_> = devices(&mut bus).collect();
		// bit 0 of the family code decides the search order
		assert_eq!(found, vec![
			Discovery::WrongFamily { number: 1, rom: other },
			Discovery::Device { number: 2, rom: prom },
		]);
	}

	#[test]
	fn crc_error_ends_enumeration() {
		// search order follows identifier bits (LSB first): family 0x08 is
		// found before family 0x09
		let mut broken = RomId::new(0x08, [1, 0, 0, 0, 0, 0]);
		broken.0[7] ^= 0x01;
		let good = RomId::new(0x09, [1, 0, 0, 0, 0, 0]);
		let mut bus = bus(&[broken, good]);
		let found: Vec<_> = devices(&mut bus).collect();
		assert_eq!(found, vec![Discovery::Crc {
			number: 1,
			error: CrcError {
				location: CrcLocation::Rom,
				calculated: crc8(&broken.0[..7]),
				observed: broken.0[7],
			},
		}]);
	}

	#[test]
	fn rejects_every_corrupted_identifier() {
		let good = RomId::new(0x09, [0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
		for bit in 0..8 {
			let mut broken = good;
			broken.0[7] ^= 1 << bit;
			let mut bus = bus(&[broken]);
			let found: Vec<_> = devices(&mut bus).collect();
			match found.as_slice() {
				[Discovery::Crc { number: 1, .. }] => (),
				other => panic!("unexpected enumeration result {:?}", other),
			}
		}
	}
}
