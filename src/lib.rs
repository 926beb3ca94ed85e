#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod bus;
pub mod eeprom;
pub mod protect;
pub mod sim;
pub mod sysfs;

pub use self::eeprom::{
	Chunk,
	DeviceGeometry,
	DriverConfig,
	Eeprom,
	EepromError,
	plan_chunks,
};

/// Parse decimal or `0x`-prefixed hexadecimal numbers
pub fn parse_number<T>(s: &str, from_str_radix: fn(&str, u32) -> Result<T, std::num::ParseIntError>) -> AResult<T> {
	let s = s.trim();
	with_context!(("invalid number {:?}", s), {
		if s.starts_with("0x") || s.starts_with("0X") {
			Ok(from_str_radix(&s[2..], 16)?)
		} else {
			Ok(from_str_radix(s, 10)?)
		}
	})
}

/// Parse hex data given as separate arguments; each may carry one `0x`
/// prefix and whitespace between digit pairs.
pub fn parse_hex_bytes<'a, I: IntoIterator<Item = &'a str>>(args: I) -> AResult<Vec<u8>> {
	let mut digits = String::new();
	for arg in args {
		let arg = arg.trim();
		let arg = if arg.starts_with("0x") || arg.starts_with("0X") { &arg[2..] } else { arg };
		digits.extend(arg.chars().filter(|c| !c.is_whitespace()));
	}
	ensure!(digits.is_ascii(), "invalid hex data {:?}", digits);
	ensure!(0 == digits.len() % 2, "hex data needs an even number of digits");
	(0..digits.len()).step_by(2).map(|i| {
		let pair = &digits[i..i + 2];
		u8::from_str_radix(pair, 16).map_err(|_| format_err!("invalid hex data {:?}", pair))
	}).collect()
}

#[cfg(test)]
mod test {
	use super::{
		parse_hex_bytes,
		parse_number,
	};

	#[test]
	fn parse_numbers() {
		assert_eq!(parse_number::<u16>("60", u16::from_str_radix).unwrap(), 60);
		assert_eq!(parse_number::<u16>("0x40", u16::from_str_radix).unwrap(), 64);
		assert_eq!(parse_number::<u32>(" 0XfFfF ", u32::from_str_radix).unwrap(), 0xffff);
		assert!(parse_number::<u16>("0x10000", u16::from_str_radix).is_err());
		assert!(parse_number::<u16>("", u16::from_str_radix).is_err());
		assert!(parse_number::<u16>("0x", u16::from_str_radix).is_err());
		assert!(parse_number::<u16>("12ab", u16::from_str_radix).is_err());
	}

	#[test]
	fn hex_bytes() {
		assert_eq!(parse_hex_bytes(vec!["dead", "beef"]).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(parse_hex_bytes(vec!["0x12", "0x34"]).unwrap(), vec![0x12, 0x34]);
		assert_eq!(parse_hex_bytes(vec!["0X1234", "56 78"]).unwrap(), vec![0x12, 0x34, 0x56, 0x78]);
		// only one prefix per argument
		assert!(parse_hex_bytes(vec!["0x0x12"]).is_err());
		assert!(parse_hex_bytes(vec!["123"]).is_err());
		assert!(parse_hex_bytes(vec!["zz"]).is_err());
		assert!(parse_hex_bytes(vec!["é1"]).is_err());
	}
}
