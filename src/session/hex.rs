use hex::FromHexError;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum HexError {
	#[fail(display = "Non hex character {:?} found at position {}", character, position)]
	NonHex {
		character: char,
		position: usize,
	},
	#[fail(display = "Odd number of nibbles (hex characters). Check you didn't remove any leading zeros")]
	OddNibbles,
}

impl From<FromHexError> for HexError {
	fn from(e: FromHexError) -> Self {
		match e {
			FromHexError::InvalidHexCharacter { c, index } => HexError::NonHex { character: c, position: index },
			// odd length; fixed size targets aren't used
			_ => HexError::OddNibbles,
		}
	}
}

/// Decode pairs of hex digits (either case); nothing is decoded unless the
/// whole input is valid
pub fn decode(s: &str) -> Result<Vec<u8>, HexError> {
	// a bad character is reported even when the length is odd too
	if let Some((position, character)) = s.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit()) {
		return Err(HexError::NonHex { character, position });
	}
	Ok(hex::decode(s)?)
}

pub fn encode(bytes: &[u8]) -> String {
	hex::encode_upper(bytes)
}
