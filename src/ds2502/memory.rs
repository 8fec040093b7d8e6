use std::fmt;

use crate::onewire::{
	Bus,
	RomId,
};

use super::{
	CrcLocation,
	Error,
	MEMORY_SIZE,
	MemoryImage,
	PAGE_COUNT,
	STATUS_SIZE,
	check_crc_from_bus,
	read_frame,
	status_frame,
};

/// Read the whole memory into `target` (at most `MEMORY_SIZE` bytes)
///
/// `target` stays untouched unless the command echo was valid.
pub fn read_memory_into<B: Bus + ?Sized>(bus: &mut B, rom: &RomId, target: &mut [u8]) -> Result<(), Error> {
	if target.len() > MEMORY_SIZE {
		return Err(Error::TooLong(target.len(), MEMORY_SIZE));
	}
	if !bus.select(rom) {
		return Err(Error::NoPresence);
	}
	let frame = read_frame(0);
	bus.write_bytes(&frame);
	check_crc_from_bus(bus, CrcLocation::ReadCommand, &frame)?;
	bus.read_bytes(target);
	debug!("{}: read {} bytes", rom, target.len());
	Ok(())
}

pub fn read_memory<B: Bus + ?Sized>(bus: &mut B, rom: &RomId) -> Result<MemoryImage, Error> {
	let mut image = [0u8; MEMORY_SIZE];
	read_memory_into(bus, rom, &mut image)?;
	Ok(image)
}

/// The 8-byte status page
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub [u8; STATUS_SIZE]);

impl Status {
	/// page (0..4) is write protected (bit cleared in byte 0)
	pub fn is_protected(&self, page: usize) -> bool {
		assert!(page < PAGE_COUNT);
		0 == self.0[0] & (1 << page)
	}

	/// page (0..4) redirected to another page; the status byte stores the
	/// ones-complement of the new page number
	pub fn redirection(&self, page: usize) -> Option<u8> {
		assert!(page < PAGE_COUNT);
		match self.0[1 + page] {
			0xff => None,
			b => Some(!b),
		}
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Status(")?;
		for page in 0..PAGE_COUNT {
			if page > 0 {
				write!(f, ", ")?;
			}
			write!(f, "page {}", page)?;
			if self.is_protected(page) { write!(f, " [WP]")?; }
			if let Some(r) = self.redirection(page) { write!(f, " -> {}", r)?; }
		}
		write!(f, ")")
	}
}

pub fn read_status<B: Bus + ?Sized>(bus: &mut B, rom: &RomId) -> Result<Status, Error> {
	if !bus.select(rom) {
		return Err(Error::NoPresence);
	}
	let frame = status_frame(0);
	bus.write_bytes(&frame);
	check_crc_from_bus(bus, CrcLocation::StatusCommand, &frame)?;
	let mut status = [0u8; STATUS_SIZE];
	bus.read_bytes(&mut status);
	check_crc_from_bus(bus, CrcLocation::StatusData, &status)?;
	Ok(Status(status))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ds2502::CrcError;
	use crate::onewire::{
		BitBang,
		crc8,
	};
	use crate::sim::{
		SimDevice,
		SimWire,
	};

	fn rom() -> RomId {
		RomId::new(0x09, [0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6])
	}

	#[test]
	fn read_full_image() {
		let content = b"DS2502 test image";
		let mut bus = BitBang::new(SimWire::new(vec![SimDevice::new(rom()).with_memory(0x10, content)]));
		let image = read_memory(&mut bus, &rom()).unwrap();
		assert_eq!(&image[0x10..0x10 + content.len()], &content[..]);
		assert!(image[..0x10].iter().all(|b| *b == 0xff));
		assert!(image[0x10 + content.len()..].iter().all(|b| *b == 0xff));
	}

	#[test]
	fn target_larger_than_memory() {
		let mut bus = BitBang::new(SimWire::new(vec![SimDevice::new(rom())]));
		let mut target = [0x42u8; MEMORY_SIZE + 1];
		assert_eq!(read_memory_into(&mut bus, &rom(), &mut target), Err(Error::TooLong(129, 128)));
		assert!(target.iter().all(|b| *b == 0x42));
	}

	#[test]
	fn absent_device() {
		let mut bus = BitBang::new(SimWire::new(Vec::new()));
		assert_eq!(read_memory(&mut bus, &rom()), Err(Error::NoPresence));
	}

	// a device that never answers keeps the line HIGH: 0xff as echo
	#[test]
	fn bad_echo_leaves_target_untouched() {
		let other = RomId::new(0x09, [1, 1, 1, 1, 1, 1]);
		let mut bus = BitBang::new(SimWire::new(vec![SimDevice::new(other)]));
		let mut target = [0x42u8; MEMORY_SIZE];
		let err = read_memory_into(&mut bus, &rom(), &mut target).unwrap_err();
		assert_eq!(err, Error::Crc(CrcError {
			location: CrcLocation::ReadCommand,
			calculated: crc8(&read_frame(0)),
			observed: 0xff,
		}));
		assert!(target.iter().all(|b| *b == 0x42));
	}

	#[test]
	fn corrupted_read_echo() {
		let mut bus = BitBang::new(SimWire::new(vec![SimDevice::new(rom()).corrupt_read_echo()]));
		let calculated = crc8(&read_frame(0));
		assert_eq!(read_memory(&mut bus, &rom()), Err(Error::Crc(CrcError {
			location: CrcLocation::ReadCommand,
			calculated,
			observed: calculated ^ 0xff,
		})));
	}

	#[test]
	fn status_command_crc() {
		let mut bus = BitBang::new(SimWire::new(vec![SimDevice::new(rom()).corrupt_read_echo()]));
		let calculated = crc8(&status_frame(0));
		assert_eq!(read_status(&mut bus, &rom()), Err(Error::Crc(CrcError {
			location: CrcLocation::StatusCommand,
			calculated,
			observed: calculated ^ 0xff,
		})));
	}

	#[test]
	fn status_data_crc() {
		let raw = [0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
		let device = SimDevice::new(rom()).with_status(raw).corrupt_status_crc();
		let mut bus = BitBang::new(SimWire::new(vec![device]));
		let calculated = crc8(&raw);
		assert_eq!(read_status(&mut bus, &rom()), Err(Error::Crc(CrcError {
			location: CrcLocation::StatusData,
			calculated,
			observed: calculated ^ 0xff,
		})));
	}

	#[test]
	fn status_page() {
		let raw = [0b1111_1010, 0xff, 0xfd, 0xff, 0xff, 0xff, 0xff, 0xff];
		let mut bus = BitBang::new(SimWire::new(vec![SimDevice::new(rom()).with_status(raw)]));
		let status = read_status(&mut bus, &rom()).unwrap();
		assert_eq!(status.0, raw);
		assert!(status.is_protected(0));
		assert!(!status.is_protected(1));
		assert!(status.is_protected(2));
		assert!(!status.is_protected(3));
		assert_eq!(status.redirection(0), None);
		assert_eq!(status.redirection(1), Some(2));
	}
}
