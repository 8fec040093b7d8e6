use std::fmt;

use crate::onewire::{
	Bus,
	crc8,
};

use super::{
	READ_MEMORY,
	READ_STATUS,
	WRITE_MEMORY,
};

/// Which exchange a CRC belongs to
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CrcLocation {
	Rom,
	ReadCommand,
	StatusCommand,
	StatusData,
	WriteCommand,
}

impl fmt::Display for CrcLocation {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			CrcLocation::Rom => "rom",
			CrcLocation::ReadCommand => "read command",
			CrcLocation::StatusCommand => "status command",
			CrcLocation::StatusData => "status data",
			CrcLocation::WriteCommand => "write command",
		})
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "Invalid {} CRC (calculated: 0x{:02X}, device: 0x{:02X})", location, calculated, observed)]
pub struct CrcError {
	pub location: CrcLocation,
	pub calculated: u8,
	pub observed: u8,
}

fn address_bytes(address: u16) -> [u8; 2] {
	[address as u8, (address >> 8) as u8]
}

pub fn read_frame(start: u16) -> [u8; 3] {
	let [lo, hi] = address_bytes(start);
	[READ_MEMORY, lo, hi]
}

pub fn status_frame(start: u16) -> [u8; 3] {
	let [lo, hi] = address_bytes(start);
	[READ_STATUS, lo, hi]
}

pub fn write_frame(address: u16, data: u8) -> [u8; 4] {
	let [lo, hi] = address_bytes(address);
	[WRITE_MEMORY, lo, hi, data]
}

/// Compare the CRC8 of `bytes` with a CRC the device already sent
pub fn check_crc(location: CrcLocation, bytes: &[u8], device_crc: u8) -> Result<(), CrcError> {
	let calculated = crc8(bytes);
	if calculated != device_crc {
		return Err(CrcError {
			location,
			calculated,
			observed: device_crc,
		});
	}
	Ok(())
}

/// Read the CRC byte following `bytes` from the bus and compare
pub fn check_crc_from_bus<B: Bus + ?Sized>(bus: &mut B, location: CrcLocation, bytes: &[u8]) -> Result<(), CrcError> {
	let device_crc = bus.read_byte();
	check_crc(location, bytes, device_crc)
}
