//! Two-wire (I²C) bus as seen by the EEPROM driver.
//!
//! The driver only needs byte-level primitives:
//! - START (or repeated START) condition
//! - write one byte, device answers with ACK or NACK
//! - a complete read transaction: START, device select byte (read
//!   direction), N data bytes where the master acknowledges all but the last
//!   byte, STOP
//! - STOP condition
//!
//! All calls block until the bus is done with them.

use std::sync::{
	Arc,
	Mutex,
	MutexGuard,
	PoisonError,
};
use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub mod bitbang;

pub use self::bitbang::{
	BitBangBus,
	Pins,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Ack {
	Ack,
	NoAck,
}

impl Ack {
	pub fn is_ack(self) -> bool {
		self == Ack::Ack
	}
}

impl From<bool> for Ack {
	// SDA pulled low by the receiver is an acknowledge
	fn from(sda_high: bool) -> Self {
		match sda_high {
			false => Ack::Ack,
			true => Ack::NoAck,
		}
	}
}

pub trait BusTransport {
	fn start(&mut self);
	fn stop(&mut self);

	fn write_byte(&mut self, byte: u8) -> Ack;

	// full read transaction: (repeated) START, `select`, `target.len()` bytes
	// terminated by NACK, STOP. Returns whether the select byte was acknowledged.
	fn read_bytes(&mut self, select: u8, target: &mut [u8]) -> Ack;

	fn set_clock_frequency(&mut self, hz: u32);

	// wait for the device to finish an internal operation
	fn settle(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, T: ?Sized + BusTransport> BusTransport for &'a mut T {
	fn start(&mut self) {
		T::start(*self)
	}
	fn stop(&mut self) {
		T::stop(*self)
	}
	fn write_byte(&mut self, byte: u8) -> Ack {
		T::write_byte(*self, byte)
	}
	fn read_bytes(&mut self, select: u8, target: &mut [u8]) -> Ack {
		T::read_bytes(*self, select, target)
	}
	fn set_clock_frequency(&mut self, hz: u32) {
		T::set_clock_frequency(*self, hz)
	}
	fn settle(&mut self, duration: Duration) {
		T::settle(*self, duration)
	}
}

/// Bus handle that can be shared between drivers (and threads); whoever
/// holds the guard from `acquire` owns the bus.
pub struct SharedBus<T> {
	inner: Arc<Mutex<T>>,
}

impl<T> SharedBus<T> {
	pub fn new(transport: T) -> Self {
		SharedBus {
			inner: Arc::new(Mutex::new(transport)),
		}
	}

	// a panic while holding the bus leaves at most a half-finished
	// transaction; the next START condition resets the device state machine.
	pub fn acquire(&self) -> MutexGuard<T> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl<T> Clone for SharedBus<T> {
	fn clone(&self) -> Self {
		SharedBus {
			inner: self.inner.clone(),
		}
	}
}
