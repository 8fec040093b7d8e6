//! Simulated 1-Wire bus
//!
//! `SimWire` implements `Hardware` on a virtual clock: it decodes the LOW
//! pulses the master produces into reset pulses and time slots and hands them
//! to the attached `SimDevice`s, which model the DS2502 ROM and memory
//! function commands (including write-once programming on the programming
//! pulse).

use std::collections::VecDeque;
use std::time::Duration;

use crate::ds2502::{
	MEMORY_SIZE,
	READ_MEMORY,
	READ_STATUS,
	STATUS_SIZE,
	WRITE_MEMORY,
};
use crate::onewire::{
	Crc8,
	Hardware,
	MATCH_ROM,
	READ_ROM,
	RomId,
	SEARCH_ROM,
	SKIP_ROM,
	crc8,
};

// LOW pulses at least this long are reset pulses
const RESET_MIN: Duration = Duration::from_micros(400);
// LOW pulses at least this long are "0" slots; shorter ones "1" or read slots
const WRITE_ZERO_MIN: Duration = Duration::from_micros(15);
// minimum programming pulse width the device accepts
const PROGRAM_MIN: Duration = Duration::from_micros(480);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	// not addressed, waiting for the next reset
	Sleeping,
	RomCommand,
	Search { index: usize, step: u8 },
	Match { index: usize },
	// receiving memory function command and address (and data)
	Function,
	ReadMemory { address: usize },
	ReadStatus { address: usize, crc: Crc8 },
	WriteData { address: usize },
	AwaitPulse { address: usize, data: u8 },
}

#[derive(Clone, Debug)]
pub struct SimDevice {
	rom: RomId,
	memory: [u8; MEMORY_SIZE],
	status: [u8; STATUS_SIZE],
	phase: Phase,
	rx: Vec<u8>,
	rx_byte: u8,
	rx_bits: u8,
	tx: VecDeque<bool>,
	write_echoes: usize,
	corrupt_write_echo: Option<usize>,
	corrupt_read_echo: bool,
	corrupt_status_crc: bool,
	programmed: usize,
}

impl SimDevice {
	/// Device with erased memory; memory commands are answered regardless of
	/// the family code in `rom`
	pub fn new(rom: RomId) -> Self {
		SimDevice {
			rom,
			memory: [0xff; MEMORY_SIZE],
			status: [0xff; STATUS_SIZE],
			phase: Phase::Sleeping,
			rx: Vec::new(),
			rx_byte: 0,
			rx_bits: 0,
			tx: VecDeque::new(),
			write_echoes: 0,
			corrupt_write_echo: None,
			corrupt_read_echo: false,
			corrupt_status_crc: false,
			programmed: 0,
		}
	}

	pub fn with_memory(mut self, address: usize, data: &[u8]) -> Self {
		self.memory[address..address + data.len()].copy_from_slice(data);
		self
	}

	pub fn with_status(mut self, status: [u8; STATUS_SIZE]) -> Self {
		self.status = status;
		self
	}

	/// flip the CRC of the `nth` (0-based) write command echo
	pub fn corrupt_write_echo(mut self, nth: usize) -> Self {
		self.corrupt_write_echo = Some(nth);
		self
	}

	/// flip the CRC echoed after every read memory and read status command
	pub fn corrupt_read_echo(mut self) -> Self {
		self.corrupt_read_echo = true;
		self
	}

	/// flip the CRC sent after the 8 status bytes
	pub fn corrupt_status_crc(mut self) -> Self {
		self.corrupt_status_crc = true;
		self
	}

	pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
		&self.memory
	}

	/// number of bytes committed by a programming pulse
	pub fn programmed(&self) -> usize {
		self.programmed
	}

	fn reset(&mut self) -> bool {
		self.phase = Phase::RomCommand;
		self.rx.clear();
		self.rx_bits = 0;
		self.rx_byte = 0;
		self.tx.clear();
		true
	}

	fn sleep(&mut self) {
		self.phase = Phase::Sleeping;
		self.tx.clear();
	}

	fn push_byte(&mut self, byte: u8) {
		for bit in 0..8 {
			self.tx.push_back(0 != byte & (1 << bit));
		}
	}

	// one time slot; `master` is the bit the master wrote ("1" for read
	// slots). Returns the level the device leaves on the line.
	fn slot(&mut self, master: bool) -> bool {
		if let Some(bit) = self.tx.pop_front() {
			return bit;
		}
		match self.phase {
			Phase::Sleeping | Phase::AwaitPulse { .. } => true,
			Phase::Search { index, step } => {
				let bit = self.rom.bit(index);
				match step {
					0 => {
						self.phase = Phase::Search { index, step: 1 };
						bit
					},
					1 => {
						self.phase = Phase::Search { index, step: 2 };
						!bit
					},
					_ => {
						if master != bit {
							self.sleep();
						} else if index == 63 {
							self.phase = Phase::Function;
						} else {
							self.phase = Phase::Search { index: index + 1, step: 0 };
						}
						true
					},
				}
			},
			Phase::Match { index } => {
				if master != self.rom.bit(index) {
					self.sleep();
				} else if index == 63 {
					self.phase = Phase::Function;
				} else {
					self.phase = Phase::Match { index: index + 1 };
				}
				true
			},
			_ => {
				self.refill();
				if let Some(bit) = self.tx.pop_front() {
					return bit;
				}
				self.receive_bit(master);
				true
			},
		}
	}

	fn receive_bit(&mut self, bit: bool) {
		if bit {
			self.rx_byte |= 1 << self.rx_bits;
		}
		self.rx_bits += 1;
		if 8 == self.rx_bits {
			let byte = self.rx_byte;
			self.rx_byte = 0;
			self.rx_bits = 0;
			self.receive_byte(byte);
		}
	}

	fn receive_byte(&mut self, byte: u8) {
		match self.phase {
			Phase::RomCommand => match byte {
				SEARCH_ROM => self.phase = Phase::Search { index: 0, step: 0 },
				MATCH_ROM => self.phase = Phase::Match { index: 0 },
				SKIP_ROM => self.phase = Phase::Function,
				READ_ROM => {
					let rom = self.rom;
					for b in rom.0.iter() {
						self.push_byte(*b);
					}
					self.phase = Phase::Function;
				},
				_ => self.sleep(),
			},
			Phase::Function => {
				self.rx.push(byte);
				let needed = if WRITE_MEMORY == self.rx[0] { 4 } else { 3 };
				if self.rx.len() < needed {
					return;
				}
				let frame = std::mem::replace(&mut self.rx, Vec::new());
				let address = (frame[1] as usize) | ((frame[2] as usize) << 8);
				match frame[0] {
					READ_MEMORY => {
						self.echo_read(&frame);
						self.phase = Phase::ReadMemory { address };
					},
					READ_STATUS => {
						self.echo_read(&frame);
						self.phase = Phase::ReadStatus { address, crc: Crc8::new() };
					},
					WRITE_MEMORY => {
						self.echo_write(&frame);
						self.phase = Phase::AwaitPulse { address, data: frame[3] };
					},
					_ => self.sleep(),
				}
			},
			Phase::WriteData { address } => {
				// follow-up bytes carry no address; the echo still covers the
				// full frame with the incremented address
				let frame = [WRITE_MEMORY, address as u8, (address >> 8) as u8, byte];
				self.echo_write(&frame);
				self.phase = Phase::AwaitPulse { address, data: byte };
			},
			_ => (),
		}
	}

	fn echo_read(&mut self, frame: &[u8]) {
		let crc = crc8(frame);
		self.push_byte(if self.corrupt_read_echo { crc ^ 0xff } else { crc });
	}

	fn echo_write(&mut self, frame: &[u8]) {
		let mut crc = crc8(frame);
		if Some(self.write_echoes) == self.corrupt_write_echo {
			crc ^= 0xff;
		}
		self.write_echoes += 1;
		self.push_byte(crc);
	}

	fn refill(&mut self) {
		match self.phase {
			Phase::ReadMemory { address } => {
				let byte = self.memory.get(address).cloned().unwrap_or(0xff);
				self.phase = Phase::ReadMemory { address: address + 1 };
				self.push_byte(byte);
			},
			Phase::ReadStatus { address, mut crc } => {
				let byte = if address < STATUS_SIZE {
					let b = self.status[address];
					crc.update(b);
					b
				} else if address == STATUS_SIZE {
					if self.corrupt_status_crc { crc.0 ^ 0xff } else { crc.0 }
				} else {
					0xff
				};
				self.phase = Phase::ReadStatus { address: address + 1, crc };
				self.push_byte(byte);
			},
			_ => (),
		}
	}

	fn program_pulse(&mut self) {
		if let Phase::AwaitPulse { address, data } = self.phase {
			let readback = match self.memory.get_mut(address) {
				Some(cell) => {
					// can only clear bits
					*cell &= data;
					self.programmed += 1;
					*cell
				},
				None => 0xff,
			};
			self.push_byte(readback);
			self.phase = Phase::WriteData { address: address + 1 };
		}
	}
}

pub struct SimWire {
	devices: Vec<SimDevice>,
	now: Duration,
	low_since: Option<Duration>,
	level: bool,
	program_since: Option<Duration>,
	pulses: Vec<Duration>,
}

impl SimWire {
	pub fn new(devices: Vec<SimDevice>) -> Self {
		SimWire {
			devices,
			now: Duration::from_micros(0),
			low_since: None,
			level: true,
			program_since: None,
			pulses: Vec::new(),
		}
	}

	pub fn device(&self, index: usize) -> &SimDevice {
		&self.devices[index]
	}

	/// widths of all programming pulses seen so far
	pub fn pulses(&self) -> &[Duration] {
		&self.pulses
	}
}

impl Hardware for SimWire {
	fn pull_low(&mut self, low: bool) {
		if low {
			if self.low_since.is_none() {
				self.low_since = Some(self.now);
			}
			return;
		}
		let since = match self.low_since.take() {
			Some(since) => since,
			None => return,
		};
		let width = self.now - since;
		if width >= RESET_MIN {
			let mut presence = false;
			for device in self.devices.iter_mut() {
				presence |= device.reset();
			}
			self.level = !presence;
		} else {
			let master = width < WRITE_ZERO_MIN;
			// every device sees the slot; the line is a wired AND
			let mut level = true;
			for device in self.devices.iter_mut() {
				level &= device.slot(master);
			}
			self.level = level || !master;
		}
	}

	fn read_pin(&mut self) -> bool {
		self.low_since.is_none() && self.level
	}

	fn set_program_enable(&mut self, active: bool) {
		if active {
			self.program_since = Some(self.now);
			return;
		}
		if let Some(since) = self.program_since.take() {
			let width = self.now - since;
			self.pulses.push(width);
			if width >= PROGRAM_MIN {
				for device in self.devices.iter_mut() {
					device.program_pulse();
				}
			}
		}
	}

	fn delay(&mut self, duration: Duration) {
		self.now += duration;
	}
}
