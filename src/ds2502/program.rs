use crate::onewire::{
	Bus,
	RomId,
};

use super::{
	CrcError,
	CrcLocation,
	MEMORY_SIZE,
	PROGRAM_PULSE,
	check_crc_from_bus,
	write_frame,
};

/// Aborted write; bytes before `index` are programmed, the rest wasn't
/// attempted
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum WriteError {
	#[fail(display = "no presence pulse")]
	NoPresence,
	#[fail(display = "Data end 0x{:02X} is beyond the end of memory", end)]
	OutOfRange {
		end: usize,
	},
	#[fail(display = "byte {}: {}", index, error)]
	Crc {
		index: usize,
		#[cause]
		error: CrcError,
	},
	#[fail(display = "Incorrect readback for byte {} (written: 0x{:02X}, read: 0x{:02X})", index, requested, observed)]
	Readback {
		index: usize,
		requested: u8,
		observed: u8,
	},
}

impl WriteError {
	/// number of bytes programmed and verified before the abort
	pub fn applied(&self) -> usize {
		match *self {
			WriteError::NoPresence => 0,
			WriteError::OutOfRange { .. } => 0,
			WriteError::Crc { index, .. } => index,
			WriteError::Readback { index, .. } => index,
		}
	}
}

/// Program `data` starting at `address`, verifying each byte
///
/// Stops at the first CRC or readback failure; there is no way to undo
/// bytes already programmed.
pub fn write_memory<B: Bus + ?Sized>(bus: &mut B, rom: &RomId, address: u8, data: &[u8]) -> Result<(), WriteError> {
	let end = address as usize + data.len();
	if end > MEMORY_SIZE {
		return Err(WriteError::OutOfRange { end });
	}
	if !bus.select(rom) {
		return Err(WriteError::NoPresence);
	}

	for (index, &byte) in data.iter().enumerate() {
		let frame = write_frame(address as u16 + index as u16, byte);
		if 0 == index {
			bus.write_bytes(&frame);
		} else {
			// device incremented the address itself
			bus.write_byte(byte);
		}
		check_crc_from_bus(bus, CrcLocation::WriteCommand, &frame)
			.map_err(|error| WriteError::Crc { index, error })?;

		bus.program_pulse(PROGRAM_PULSE);

		let readback = bus.read_byte();
		if readback != byte {
			return Err(WriteError::Readback {
				index,
				requested: byte,
				observed: readback,
			});
		}
		trace!("{}: programmed 0x{:02X} at 0x{:02X}", rom, byte, address as usize + index);
	}

	info!("{}: wrote {} bytes at 0x{:02X}", rom, data.len(), address);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ds2502::read_memory;
	use crate::onewire::BitBang;
	use crate::sim::{
		SimDevice,
		SimWire,
	};

	fn rom() -> RomId {
		RomId::new(0x09, [0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6])
	}

	fn bus(device: SimDevice) -> BitBang<SimWire> {
		BitBang::new(SimWire::new(vec![device]))
	}

	#[test]
	fn writes_and_verifies() {
		let mut bus = bus(SimDevice::new(rom()));
		write_memory(&mut bus, &rom(), 0x20, b"hello").unwrap();
		let sim = bus.hardware();
		assert_eq!(&sim.device(0).memory()[0x20..0x25], b"hello");
		assert_eq!(sim.device(0).programmed(), 5);
		assert_eq!(sim.pulses(), &[PROGRAM_PULSE; 5]);
		assert_eq!(&read_memory(&mut bus, &rom()).unwrap()[0x20..0x25], b"hello");
	}

	#[test]
	fn write_at_end_of_memory() {
		let mut bus = bus(SimDevice::new(rom()));
		write_memory(&mut bus, &rom(), 126, &[0x01, 0x02]).unwrap();
		assert_eq!(&bus.hardware().device(0).memory()[126..], &[0x01, 0x02]);
	}

	#[test]
	fn readback_mismatch_aborts() {
		// bit 0 already cleared at address 3: 0x55 can only become 0x54
		let device = SimDevice::new(rom()).with_memory(3, &[0xfe]);
		let mut bus = bus(device);
		let err = write_memory(&mut bus, &rom(), 0, &[0x11, 0x22, 0x33, 0x55, 0x66]).unwrap_err();
		assert_eq!(err, WriteError::Readback {
			index: 3,
			requested: 0x55,
			observed: 0x54,
		});
		assert_eq!(err.applied(), 3);
		let sim = bus.hardware();
		assert_eq!(&sim.device(0).memory()[..5], &[0x11, 0x22, 0x33, 0x54, 0xff]);
		assert_eq!(sim.pulses().len(), 4);
	}

	#[test]
	fn crc_failure_aborts_before_pulse() {
		let device = SimDevice::new(rom()).corrupt_write_echo(2);
		let mut bus = bus(device);
		let err = write_memory(&mut bus, &rom(), 0x40, &[0xa0, 0xa1, 0xa2, 0xa3]).unwrap_err();
		match err {
			WriteError::Crc { index: 2, error } => {
				assert_eq!(error.location, CrcLocation::WriteCommand);
				assert_eq!(error.observed, error.calculated ^ 0xff);
			},
			other => panic!("unexpected error {:?}", other),
		}
		assert_eq!(err.applied(), 2);
		let sim = bus.hardware();
		assert_eq!(&sim.device(0).memory()[0x40..0x44], &[0xa0, 0xa1, 0xff, 0xff]);
		assert_eq!(sim.pulses().len(), 2);
	}

	#[test]
	fn data_beyond_memory() {
		let mut bus = bus(SimDevice::new(rom()));
		let err = write_memory(&mut bus, &rom(), 127, &[0x01, 0x02]).unwrap_err();
		assert_eq!(err, WriteError::OutOfRange { end: 129 });
		assert_eq!(err.applied(), 0);
		assert!(bus.hardware().pulses().is_empty());
		assert_eq!(bus.hardware().device(0).memory()[127], 0xff);
	}

	#[test]
	fn absent_device() {
		let mut bus = BitBang::new(SimWire::new(Vec::new()));
		assert_eq!(write_memory(&mut bus, &rom(), 0, &[0]), Err(WriteError::NoPresence));
	}
}
