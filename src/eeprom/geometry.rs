use std::time::Duration;

use super::error::{
	EResult,
	EepromError,
};

// device type identifier 0b1010, chip enable pins E2..E0 low
pub const SELECT_WRITE: u8 = 0b1010_0000;
pub const SELECT_READ: u8 = 0b1010_0001;

pub const PAGE_SIZE: usize = 64;
pub const CAPACITY: usize = 0x1_0000;
pub const MAX_TRANSFER: usize = 1024;

pub const DEFAULT_CLOCK_HZ: u32 = 400_000;
/// Minimum write cycle / recovery time of the device
pub const SETTLE_FLOOR: Duration = Duration::from_millis(5);

/// Fixed attributes of the memory array and its bus addressing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeviceGeometry {
	pub page_size: usize,
	pub capacity: usize,
	pub select_read: u8,
	pub select_write: u8,
	/// longest transfer a single `read`/`write` call accepts
	pub max_transfer: usize,
	/// most chunks (page transactions) a single call may need
	pub max_chunks: usize,
}

impl DeviceGeometry {
	/// M24256 (and friends with 64-byte pages and 16-bit addresses)
	pub fn m24256() -> Self {
		DeviceGeometry {
			page_size: PAGE_SIZE,
			capacity: CAPACITY,
			select_read: SELECT_READ,
			select_write: SELECT_WRITE,
			max_transfer: MAX_TRANSFER,
			max_chunks: MAX_TRANSFER / PAGE_SIZE + 1,
		}
	}

	// chip enable pins E0..E2 select one of 8 devices on a bus
	pub fn with_chip_enable(mut self, chip_enable: u8) -> Self {
		let ce = (chip_enable & 0x7) << 1;
		self.select_write = SELECT_WRITE | ce;
		self.select_read = SELECT_READ | ce;
		self
	}

	pub fn with_capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	// also resizes the chunk bound so a maximal transfer at any alignment fits
	pub fn with_max_transfer(mut self, max_transfer: usize) -> Self {
		self.max_transfer = max_transfer;
		self.max_chunks = max_transfer / self.page_size.max(1) + 1;
		self
	}

	pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
		self.max_chunks = max_chunks;
		self
	}

	pub fn validate(&self) -> crate::AResult<()> {
		ensure!(self.page_size.is_power_of_two(), "page size must be a power of two: {}", self.page_size);
		ensure!(self.capacity > 0 && self.capacity <= CAPACITY, "capacity must be in 1..=0x10000: 0x{:x}", self.capacity);
		ensure!(0 == self.capacity % self.page_size, "capacity 0x{:x} not a multiple of page size {}", self.capacity, self.page_size);
		ensure!(0 == self.select_write & 0x01, "write select byte 0x{:02x} has the read bit set", self.select_write);
		ensure!(self.select_read == self.select_write | 0x01,
			"read select byte 0x{:02x} doesn't match write select byte 0x{:02x}", self.select_read, self.select_write
		);
		ensure!(self.max_transfer > 0, "max transfer must not be zero");
		ensure!(self.max_chunks > 0, "max chunks must not be zero");
		Ok(())
	}

	/// Length and range checks shared by reads and writes
	pub fn check_range(&self, address: u16, length: usize) -> EResult<()> {
		if 0 == length {
			return Err(EepromError::LengthZero);
		}
		if length > self.max_transfer || usize::from(address) + length > self.capacity {
			return Err(EepromError::LengthExceedsLimit);
		}
		Ok(())
	}
}

impl Default for DeviceGeometry {
	fn default() -> Self {
		DeviceGeometry::m24256()
	}
}

/// Bus and timing settings applied when the driver is created
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DriverConfig {
	pub clock_hz: u32,
	pub settle: Duration,
}

impl DriverConfig {
	/// settle delay, never shorter than the device's write cycle time
	pub fn settle_delay(&self) -> Duration {
		self.settle.max(SETTLE_FLOOR)
	}
}

impl Default for DriverConfig {
	fn default() -> Self {
		DriverConfig {
			clock_hz: DEFAULT_CLOCK_HZ,
			settle: SETTLE_FLOOR,
		}
	}
}
