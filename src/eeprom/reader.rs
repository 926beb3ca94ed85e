use std::time::Duration;

use crate::bus::BusTransport;

use super::addressing::set_operation_address;
use super::error::{
	EResult,
	EepromError,
};
use super::geometry::DeviceGeometry;
use super::planner::plan_chunks;

/// Random reads split at page boundaries.
///
/// Each chunk is its own transaction: address handshake (ending with STOP),
/// then a read transaction with the read select byte. The device needs the
/// settle delay between chunks.
pub struct PagedReader<'a, B: BusTransport + ?Sized + 'a> {
	bus: &'a mut B,
	geometry: &'a DeviceGeometry,
	settle: Duration,
}

impl<'a, B: BusTransport + ?Sized> PagedReader<'a, B> {
	pub fn new(bus: &'a mut B, geometry: &'a DeviceGeometry, settle: Duration) -> Self {
		PagedReader {
			bus,
			geometry,
			settle,
		}
	}

	/// Fill `target` from `address` on; `target` contents are unspecified
	/// after an error.
	pub fn read_into(&mut self, address: u16, target: &mut [u8]) -> EResult<()> {
		self.geometry.check_range(address, target.len())?;
		let chunks = plan_chunks(address, target.len(), self.geometry.page_size, self.geometry.max_chunks)?;
		debug!("EEPROM @0x{:04x}: reading {} bytes in {} chunks", address, target.len(), chunks.len());

		let last = chunks.len() - 1;
		for (i, chunk) in chunks.iter().enumerate() {
			set_operation_address(&mut *self.bus, self.geometry.select_write, chunk.address, true)?;

			let offset = chunk.offset(address);
			let part = &mut target[offset..offset + chunk.length];
			if !self.bus.read_bytes(self.geometry.select_read, part).is_ack() {
				warn!("EEPROM @0x{:04x}: reading {} bytes failed", chunk.address, chunk.length);
				return Err(EepromError::ReadFailed);
			}

			if i != last {
				self.bus.settle(self.settle);
			}
		}

		Ok(())
	}

	pub fn read(&mut self, address: u16, length: usize) -> EResult<Vec<u8>> {
		self.geometry.check_range(address, length)?;
		let mut buf = vec![0u8; length];
		self.read_into(address, &mut buf)?;
		Ok(buf)
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use super::PagedReader;
	use crate::eeprom::{
		DeviceGeometry,
		EepromError,
	};
	use crate::sim::{
		BusOp,
		SimulatedEeprom,
	};

	const SETTLE: Duration = Duration::from_millis(5);

	fn filled_sim() -> SimulatedEeprom {
		let mut sim = SimulatedEeprom::m24256();
		let pattern: Vec<u8> = (0..0x400usize).map(|i| (i * 7 + 3) as u8).collect();
		sim.load(0, &pattern);
		sim
	}

	#[test]
	fn single_chunk() {
		let geometry = DeviceGeometry::m24256();
		let mut sim = filled_sim();
		sim.record_ops(true);
		let data = PagedReader::new(&mut sim, &geometry, SETTLE).read(0x10, 4).unwrap();
		assert_eq!(data, &sim.memory()[0x10..0x14]);
		assert_eq!(sim.ops(), &[
			BusOp::Start,
			BusOp::Write(0xa0),
			BusOp::Write(0x00),
			BusOp::Write(0x10),
			BusOp::Stop,
			BusOp::Read { select: 0xa1, length: 4 },
		][..]);
	}

	#[test]
	fn crossing_page() {
		let geometry = DeviceGeometry::m24256();
		let mut sim = filled_sim();
		sim.record_ops(true);
		let data = PagedReader::new(&mut sim, &geometry, SETTLE).read(60, 10).unwrap();
		assert_eq!(data, &sim.memory()[60..70]);
		assert_eq!(sim.settles(), 1);

		let reads: Vec<BusOp> = sim.ops().iter().cloned().filter(|op| match op {
			BusOp::Read { .. } | BusOp::Settle(_) => true,
			_ => false,
		}).collect();
		assert_eq!(reads, vec![
			BusOp::Read { select: 0xa1, length: 4 },
			BusOp::Settle(SETTLE),
			BusOp::Read { select: 0xa1, length: 6 },
		]);
		// second chunk re-addressed at the page start
		assert!(sim.ops().windows(3).any(|w| w == [BusOp::Write(0xa0), BusOp::Write(0x00), BusOp::Write(0x40)]));
	}

	#[test]
	fn settles_between_chunks_only() {
		let geometry = DeviceGeometry::m24256();
		let mut sim = filled_sim();
		let data = PagedReader::new(&mut sim, &geometry, SETTLE).read(0x20, 0x100).unwrap();
		assert_eq!(data, &sim.memory()[0x20..0x120]);
		// 5 pages touched
		assert_eq!(sim.settles(), 4);
	}

	#[test]
	fn rejected_without_bus_activity() {
		let geometry = DeviceGeometry::m24256();
		let mut sim = filled_sim();
		assert_eq!(PagedReader::new(&mut sim, &geometry, SETTLE).read(0, 0), Err(EepromError::LengthZero));
		assert_eq!(PagedReader::new(&mut sim, &geometry, SETTLE).read(0, 1200), Err(EepromError::LengthExceedsLimit));
		assert_eq!(PagedReader::new(&mut sim, &geometry, SETTLE).read(0xfff0, 0x20), Err(EepromError::LengthExceedsLimit));
		assert_eq!(sim.calls(), 0);
	}

	#[test]
	fn data_phase_failure() {
		let geometry = DeviceGeometry::m24256();
		let mut sim = filled_sim();
		sim.nack_read(1);
		assert_eq!(PagedReader::new(&mut sim, &geometry, SETTLE).read(60, 10), Err(EepromError::ReadFailed));
		assert_eq!(sim.settles(), 1);
	}

	#[test]
	fn addressing_failure_aborts() {
		let geometry = DeviceGeometry::m24256();
		let mut sim = filled_sim();
		// select byte of the second chunk
		sim.nack_write_byte(3);
		assert_eq!(
			PagedReader::new(&mut sim, &geometry, SETTLE).read(60, 10),
			Err(EepromError::AddressingFailedDeviceSelect)
		);
	}
}
