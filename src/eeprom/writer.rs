use std::time::Duration;

use crate::bus::BusTransport;
use crate::protect::{
	WriteEnabled,
	WriteProtectGate,
};

use super::addressing::set_operation_address;
use super::error::{
	EResult,
	EepromError,
};
use super::geometry::DeviceGeometry;
use super::planner::{
	Chunk,
	plan_chunks,
};
use super::reader::PagedReader;

/// Page writes with write control bracketing and optional read-back.
///
/// Per write: WriteEnabled → {address handshake → data bytes → STOP}* →
/// write protect asserted again → (settle, read-back). Any failure asserts
/// write protect before returning; a data byte failure also releases the bus.
pub struct PagedWriter<'a, B: BusTransport + ?Sized + 'a, G: WriteProtectGate + ?Sized + 'a> {
	bus: &'a mut B,
	gate: &'a mut G,
	geometry: &'a DeviceGeometry,
	settle: Duration,
}

fn write_chunks<B>(bus: &mut B, geometry: &DeviceGeometry, settle: Duration, start: u16, data: &[u8], chunks: &[Chunk]) -> EResult<()>
where
	B: BusTransport + ?Sized,
{
	let last = chunks.len() - 1;
	for (i, chunk) in chunks.iter().enumerate() {
		set_operation_address(&mut *bus, geometry.select_write, chunk.address, false)?;

		let offset = chunk.offset(start);
		for (pos, b) in data[offset..offset + chunk.length].iter().enumerate() {
			if !bus.write_byte(*b).is_ack() {
				bus.stop();
				warn!("EEPROM @0x{:04x}: write not acknowledged", usize::from(chunk.address) + pos);
				return Err(EepromError::WriteFailed);
			}
		}
		bus.stop();

		if i != last {
			bus.settle(settle);
		}
	}
	Ok(())
}

impl<'a, B, G> PagedWriter<'a, B, G>
where
	B: BusTransport + ?Sized,
	G: WriteProtectGate + ?Sized,
{
	pub fn new(bus: &'a mut B, gate: &'a mut G, geometry: &'a DeviceGeometry, settle: Duration) -> Self {
		PagedWriter {
			bus,
			gate,
			geometry,
			settle,
		}
	}

	/// Write `data` at `address`; with `verify` the range is read back and
	/// compared.
	///
	/// `VerifyFailed` means the data was written but doesn't read back
	/// correctly.
	pub fn write(&mut self, address: u16, data: &[u8], verify: bool) -> EResult<()> {
		if data.is_empty() {
			return Err(EepromError::LengthZero);
		}
		// single bytes get padded by the device
		if 0 != data.len() % 2 {
			return Err(EepromError::LengthOdd);
		}
		self.geometry.check_range(address, data.len())?;
		let chunks = plan_chunks(address, data.len(), self.geometry.page_size, self.geometry.max_chunks)?;
		debug!("EEPROM @0x{:04x}: writing {} bytes in {} chunks", address, data.len(), chunks.len());

		let we = WriteEnabled::new(&mut *self.gate);
		let written = write_chunks(&mut *self.bus, self.geometry, self.settle, address, data, &chunks);
		we.finish();
		written?;

		if verify {
			self.verify(address, data)?;
		}

		Ok(())
	}

	fn verify(&mut self, address: u16, data: &[u8]) -> EResult<()> {
		// last page write cycle
		self.bus.settle(self.settle);

		let mut readback = vec![0u8; data.len()];
		PagedReader::new(&mut *self.bus, self.geometry, self.settle).read_into(address, &mut readback)?;

		if let Some(pos) = data.iter().zip(&readback).position(|(expected, actual)| expected != actual) {
			let failed = (usize::from(address) + pos) as u16;
			warn!("EEPROM @0x{:04x}: verify failed: expected 0x{:02x}, read 0x{:02x}", failed, data[pos], readback[pos]);
			return Err(EepromError::VerifyFailed { address: failed });
		}

		Ok(())
	}
}
