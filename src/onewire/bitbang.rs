use std::time::Duration;

use super::{
	Bus,
	Hardware,
	LowLevel,
	RomId,
	SEARCH_ROM,
};

#[derive(Clone, Copy, Default, Debug)]
struct SearchState {
	rom: RomId,
	// 1-based bit position of the last branch where "0" was taken; 0: none
	last_discrepancy: usize,
	last_device: bool,
}

/// Bus master bit-banging a single data line (plus programming-enable) on
/// some `Hardware`
pub struct BitBang<H: Hardware> {
	hardware: H,
	search: SearchState,
}

impl<H: Hardware> BitBang<H> {
	pub fn new(hardware: H) -> Self {
		BitBang {
			hardware,
			search: SearchState::default(),
		}
	}

	pub fn hardware(&self) -> &H {
		&self.hardware
	}
}

impl<H: Hardware> Bus for BitBang<H> {
	fn reset(&mut self) -> bool {
		self.hardware.reset_pulse()
	}

	fn search(&mut self) -> Option<RomId> {
		if self.search.last_device {
			return None;
		}
		if !self.reset() {
			trace!("search: no presence pulse");
			self.reset_search();
			return None;
		}
		self.hardware.send_byte(SEARCH_ROM);

		let mut rom = self.search.rom;
		let mut last_zero = 0usize;
		for index in 0..64 {
			let id_bit = self.hardware.read_bit();
			let complement = self.hardware.read_bit();
			let direction = match (id_bit, complement) {
				(true, true) => {
					// nobody answered (anymore)
					trace!("search: no device answered bit {}", index);
					self.reset_search();
					return None;
				},
				(true, false) => true,
				(false, true) => false,
				(false, false) => {
					// discrepancy: devices with both values still present
					let position = index + 1;
					let direction = if position < self.search.last_discrepancy {
						rom.bit(index)
					} else {
						position == self.search.last_discrepancy
					};
					if !direction {
						last_zero = position;
					}
					direction
				},
			};
			rom.set_bit(index, direction);
			self.hardware.write_bit(direction);
		}

		self.search.rom = rom;
		self.search.last_discrepancy = last_zero;
		self.search.last_device = 0 == last_zero;
		Some(rom)
	}

	fn reset_search(&mut self) {
		self.search = SearchState::default();
	}

	fn write_byte(&mut self, byte: u8) {
		self.hardware.send_byte(byte)
	}

	fn read_byte(&mut self) -> u8 {
		self.hardware.receive_byte()
	}

	fn program_pulse(&mut self, width: Duration) {
		let hardware = &mut self.hardware;
		hardware.set_program_enable(true);
		hardware.delay(width);
		hardware.set_program_enable(false);
	}
}
