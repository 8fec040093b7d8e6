use crate::ds2502::{
	ERASED,
	MEMORY_SIZE,
};

use super::HexError;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum PayloadError {
	#[fail(display = "{}", _0)]
	Hex(#[cause] HexError),
	#[fail(display = "Too many bytes ({}). DS2502 only has space for 128", _0)]
	TooMany(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum AddressError {
	#[fail(display = "{}", _0)]
	Hex(#[cause] HexError),
	#[fail(display = "Address needs to be exactly one byte, got {}", _0)]
	NotSingleByte(usize),
	#[fail(display = "Address 0x{:02X} is larger than the size of DS2502 (128 Bytes)", _0)]
	OutOfRange(usize),
	#[fail(display = "Data end 0x{:02X} is larger than the size of DS2502 (128 Bytes)", _0)]
	DataEnd(usize),
}

/// A write of `len` bytes at `address` fits into `capacity`
pub fn check_range(capacity: usize, address: usize, len: usize) -> Result<(), AddressError> {
	if address >= capacity {
		return Err(AddressError::OutOfRange(address));
	}
	let end = address + len;
	if end > capacity {
		return Err(AddressError::DataEnd(end));
	}
	Ok(())
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PendingWrite {
	address: u8,
	data: Vec<u8>,
}

impl PendingWrite {
	pub fn new(address: u8, data: Vec<u8>) -> Result<Self, AddressError> {
		check_range(MEMORY_SIZE, address as usize, data.len())?;
		Ok(PendingWrite { address, data })
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}
}

/// What programming a byte over already programmed memory results in
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Collision {
	/// the cell already holds exactly the requested byte
	Unchanged,
	/// only bits that still need clearing differ; result is as requested
	Correct,
	/// the requested byte needs bits set that are already cleared
	Mutated(u8),
}

impl Collision {
	pub fn analyze(existing: u8, requested: u8) -> Option<Self> {
		if ERASED == existing {
			return None;
		}
		let result = existing & requested;
		Some(if existing == requested {
			Collision::Unchanged
		} else if result == requested {
			Collision::Correct
		} else {
			Collision::Mutated(result)
		})
	}

	pub fn is_correct(&self) -> bool {
		match self {
			Collision::Unchanged | Collision::Correct => true,
			Collision::Mutated(_) => false,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Conflict {
	pub address: usize,
	pub existing: u8,
	pub requested: u8,
	pub collision: Collision,
}

/// Every byte of `write` targeting a cell in `current` that isn't erased
pub fn conflicts(current: &[u8], write: &PendingWrite) -> Vec<Conflict> {
	let start = write.address as usize;
	write.data.iter().enumerate().filter_map(|(i, &requested)| {
		let address = start + i;
		let existing = current[address];
		Collision::analyze(existing, requested).map(|collision| Conflict {
			address,
			existing,
			requested,
			collision,
		})
	}).collect()
}
