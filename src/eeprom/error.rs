#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Fail)]
pub enum EepromError {
	#[fail(display = "transfer length is zero")]
	LengthZero,
	#[fail(display = "write length is odd")]
	LengthOdd,
	#[fail(display = "transfer exceeds the transfer limit or device capacity")]
	LengthExceedsLimit,
	#[fail(display = "device select byte not acknowledged")]
	AddressingFailedDeviceSelect,
	#[fail(display = "address high byte not acknowledged")]
	AddressingFailedHighByte,
	#[fail(display = "address low byte not acknowledged")]
	AddressingFailedLowByte,
	#[fail(display = "read failed")]
	ReadFailed,
	#[fail(display = "write failed")]
	WriteFailed,
	// data was written, but reads back differently
	#[fail(display = "verify failed at 0x{:04x}", address)]
	VerifyFailed { address: u16 },
}

impl EepromError {
	/// Stable numeric status; 0 is reserved for success.
	pub fn code(&self) -> u8 {
		match *self {
			EepromError::LengthZero => 1,
			EepromError::LengthOdd => 2,
			EepromError::LengthExceedsLimit => 3,
			EepromError::AddressingFailedDeviceSelect => 4,
			EepromError::AddressingFailedHighByte => 5,
			EepromError::AddressingFailedLowByte => 6,
			EepromError::ReadFailed => 7,
			EepromError::WriteFailed => 8,
			EepromError::VerifyFailed { .. } => 9,
		}
	}

	pub fn is_addressing(&self) -> bool {
		match *self {
			EepromError::AddressingFailedDeviceSelect
			| EepromError::AddressingFailedHighByte
			| EepromError::AddressingFailedLowByte => true,
			_ => false,
		}
	}
}

pub type EResult<T> = Result<T, EepromError>;
