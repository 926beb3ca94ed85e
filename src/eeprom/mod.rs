//! Driver for ST M24256-style serial EEPROMs: 64-byte pages, 16-bit
//! addresses, write control input.
//!
//! Protocol:
//! - random address: START, select (write) 0b1010_EEE0, address MSB,
//!   address LSB; each byte must be acknowledged
//! - read: after a random address + STOP: START, select (read)
//!   0b1010_EEE1, data bytes (master NACKs the last), STOP
//! - write: after a random address (no STOP): data bytes, STOP; the page
//!   is programmed after STOP, the address counter rolls over within the
//!   page, so transfers are split at page boundaries
//! - the device needs the write cycle time (5 ms) before it answers again
//!
//! Write control must be low (deasserted) for the data bytes of a write to
//! be acknowledged.

mod addressing;
mod error;
pub mod geometry;
mod planner;
mod reader;
mod writer;

use std::sync::{
	Mutex,
	PoisonError,
};

use crate::bus::{
	BusTransport,
	SharedBus,
};
use crate::protect::WriteProtectGate;

pub use self::addressing::set_operation_address;
pub use self::error::{
	EResult,
	EepromError,
};
pub use self::geometry::{
	DeviceGeometry,
	DriverConfig,
};
pub use self::planner::{
	Chunk,
	plan_chunks,
};
pub use self::reader::PagedReader;
pub use self::writer::PagedWriter;

pub struct Eeprom<T: BusTransport, G: WriteProtectGate> {
	bus: SharedBus<T>,
	// only touched while holding the bus
	gate: Mutex<G>,
	geometry: DeviceGeometry,
	config: DriverConfig,
}

impl<T: BusTransport, G: WriteProtectGate> Eeprom<T, G> {
	/// Asserts write protect and sets the bus clock.
	pub fn new(bus: SharedBus<T>, mut gate: G, geometry: DeviceGeometry, config: DriverConfig) -> crate::AResult<Self> {
		geometry.validate()?;

		gate.assert_protect();
		bus.acquire().set_clock_frequency(config.clock_hz);
		debug!("EEPROM 0x{:02x}: {} bytes, {} byte pages, clock {} Hz",
			geometry.select_write, geometry.capacity, geometry.page_size, config.clock_hz
		);

		Ok(Eeprom {
			bus,
			gate: Mutex::new(gate),
			geometry,
			config,
		})
	}

	/// Sole device on its own bus, default geometry and timing
	pub fn open(transport: T, gate: G) -> crate::AResult<Self> {
		Eeprom::new(SharedBus::new(transport), gate, DeviceGeometry::default(), DriverConfig::default())
	}

	pub fn geometry(&self) -> &DeviceGeometry {
		&self.geometry
	}

	pub fn config(&self) -> &DriverConfig {
		&self.config
	}

	pub fn bus(&self) -> &SharedBus<T> {
		&self.bus
	}

	pub fn read_into(&self, address: u16, target: &mut [u8]) -> EResult<()> {
		let mut bus = self.bus.acquire();
		PagedReader::new(&mut *bus, &self.geometry, self.config.settle_delay()).read_into(address, target)
	}

	pub fn read(&self, address: u16, length: usize) -> EResult<Vec<u8>> {
		let mut bus = self.bus.acquire();
		PagedReader::new(&mut *bus, &self.geometry, self.config.settle_delay()).read(address, length)
	}

	/// `data` must have an even length; see `PagedWriter::write`.
	pub fn write(&self, address: u16, data: &[u8], verify: bool) -> EResult<()> {
		let mut bus = self.bus.acquire();
		let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
		PagedWriter::new(&mut *bus, &mut *gate, &self.geometry, self.config.settle_delay()).write(address, data, verify)
	}

	pub fn write_verified(&self, address: u16, data: &[u8]) -> EResult<()> {
		self.write(address, data, true)
	}
}

impl<T: BusTransport, G: WriteProtectGate> Drop for Eeprom<T, G> {
	fn drop(&mut self) {
		self.gate.get_mut().unwrap_or_else(PoisonError::into_inner).assert_protect();
	}
}
