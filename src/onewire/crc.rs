/// Dallas/Maxim CRC8 (x^8 + x^5 + x^4 + 1), as used for identifiers and
/// DS250x command echoes
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Crc8(pub u8);

impl Crc8 {
	pub fn new() -> Self {
		Crc8(0)
	}

	pub fn update(&mut self, value: u8) {
		let mut crc = self.0 ^ value;
		for _ in 0..8 {
			crc = if 0 != crc & 0x01 {
				(crc >> 1) ^ 0x8C
			} else {
				crc >> 1
			};
		}
		self.0 = crc;
	}
}

pub fn crc8(data: &[u8]) -> u8 {
	let mut crc = Crc8::new();
	for b in data {
		crc.update(*b);
	}
	crc.0
}
