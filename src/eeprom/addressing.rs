use crate::bus::BusTransport;

use super::error::{
	EResult,
	EepromError,
};

/// Select the device for writing and load its address counter.
///
/// START, write select byte, address MSB, address LSB; with `stop` the
/// transaction ends here (a read needs its own START with the read select
/// byte), otherwise write data may follow directly.
///
/// A byte that isn't acknowledged aborts with an error naming the byte; the
/// bus is released with a STOP before returning.
pub fn set_operation_address<B>(bus: &mut B, select_write: u8, address: u16, stop: bool) -> EResult<()>
where
	B: BusTransport + ?Sized,
{
	let steps = [
		(select_write, EepromError::AddressingFailedDeviceSelect),
		((address >> 8) as u8, EepromError::AddressingFailedHighByte),
		(address as u8, EepromError::AddressingFailedLowByte),
	];

	bus.start();
	for &(byte, error) in &steps {
		if !bus.write_byte(byte).is_ack() {
			bus.stop();
			warn!("EEPROM @0x{:04x}: addressing: {}", address, error);
			return Err(error);
		}
	}
	if stop {
		bus.stop();
	}

	Ok(())
}
