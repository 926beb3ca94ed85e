//! Behavioural model of an M24256-style EEPROM sitting on the bus, with a
//! write control line.
//!
//! - device select byte must match (write direction through `write_byte`,
//!   read direction through `read_bytes`)
//! - two address bytes load the address counter
//! - data bytes are latched into the page and committed on STOP; the
//!   address rolls over within the page
//! - while write control is asserted data bytes are not acknowledged
//! - sequential reads roll over at the end of the array
//!
//! Faults can be injected (NACK on a given call, corrupted read data), and
//! every transport call is counted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{
	AtomicBool,
	AtomicUsize,
	Ordering,
};
use std::time::Duration;

use crate::bus::{
	Ack,
	BusTransport,
};
use crate::eeprom::DeviceGeometry;
use crate::eeprom::geometry::SETTLE_FLOOR;
use crate::protect::WriteProtectGate;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BusOp {
	Start,
	Stop,
	Write(u8),
	Read { select: u8, length: usize },
	Clock(u32),
	Settle(Duration),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	Idle,
	Select,
	AddressHigh,
	AddressLow,
	Data,
	// not addressed (or aborted): no more ACKs until the next START
	Ignored,
}

#[derive(Debug, Default)]
struct GateState {
	protected: AtomicBool,
	asserts: AtomicUsize,
	deasserts: AtomicUsize,
}

/// Write control line wired to a `SimulatedEeprom`
#[derive(Clone, Debug)]
pub struct SimulatedGate {
	state: Arc<GateState>,
}

impl SimulatedGate {
	pub fn is_protected(&self) -> bool {
		self.state.protected.load(Ordering::SeqCst)
	}

	pub fn deasserts(&self) -> usize {
		self.state.deasserts.load(Ordering::SeqCst)
	}

	pub fn asserts(&self) -> usize {
		self.state.asserts.load(Ordering::SeqCst)
	}
}

impl WriteProtectGate for SimulatedGate {
	fn assert_protect(&mut self) {
		self.state.asserts.fetch_add(1, Ordering::SeqCst);
		self.state.protected.store(true, Ordering::SeqCst);
	}

	fn deassert_protect(&mut self) {
		self.state.deasserts.fetch_add(1, Ordering::SeqCst);
		self.state.protected.store(false, Ordering::SeqCst);
	}
}

pub struct SimulatedEeprom {
	geometry: DeviceGeometry,
	memory: Vec<u8>,
	gate: Arc<GateState>,

	phase: Phase,
	address_high: u8,
	counter: usize,
	latched: Vec<(usize, u8)>,
	busy: bool,
	strict_write_cycle: bool,
	clock_hz: u32,

	write_calls: usize,
	read_calls: usize,
	nack_writes: Vec<usize>,
	nack_reads: Vec<usize>,
	corrupted: HashMap<usize, u8>,

	calls: usize,
	settles: usize,
	commits: usize,
	record: bool,
	ops: Vec<BusOp>,
}

impl SimulatedEeprom {
	pub fn new(geometry: DeviceGeometry) -> Self {
		SimulatedEeprom {
			geometry,
			// erased state
			memory: vec![0xff; geometry.capacity],
			gate: Arc::new(GateState::default()),
			phase: Phase::Idle,
			address_high: 0,
			counter: 0,
			latched: Vec::new(),
			busy: false,
			strict_write_cycle: false,
			clock_hz: 0,
			write_calls: 0,
			read_calls: 0,
			nack_writes: Vec::new(),
			nack_reads: Vec::new(),
			corrupted: HashMap::new(),
			calls: 0,
			settles: 0,
			commits: 0,
			record: false,
			ops: Vec::new(),
		}
	}

	pub fn m24256() -> Self {
		SimulatedEeprom::new(DeviceGeometry::m24256())
	}

	pub fn gate(&self) -> SimulatedGate {
		SimulatedGate {
			state: self.gate.clone(),
		}
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn load(&mut self, address: usize, data: &[u8]) {
		self.memory[address..address + data.len()].copy_from_slice(data);
	}

	pub fn address_counter(&self) -> usize {
		self.counter
	}

	pub fn clock_frequency(&self) -> u32 {
		self.clock_hz
	}

	/// After a committed write the device doesn't acknowledge its select byte
	/// until a settle delay of at least the write cycle time passed.
	pub fn strict_write_cycle(&mut self, strict: bool) {
		self.strict_write_cycle = strict;
	}

	pub fn record_ops(&mut self, record: bool) {
		self.record = record;
	}

	pub fn ops(&self) -> &[BusOp] {
		&self.ops
	}

	/// All transport calls so far (settle delays included)
	pub fn calls(&self) -> usize {
		self.calls
	}

	pub fn settles(&self) -> usize {
		self.settles
	}

	/// Number of page writes committed by a STOP
	pub fn commits(&self) -> usize {
		self.commits
	}

	/// The `nth` `write_byte` call from now on (0-based) is not acknowledged
	pub fn nack_write_byte(&mut self, nth: usize) {
		self.nack_writes.push(self.write_calls + nth);
	}

	/// The `nth` `read_bytes` call from now on (0-based) fails on its select byte
	pub fn nack_read(&mut self, nth: usize) {
		self.nack_reads.push(self.read_calls + nth);
	}

	/// Reads of `address` return the stored byte with all bits flipped
	pub fn corrupt_reads_at(&mut self, address: usize) {
		self.corrupted.insert(address, 0xff);
	}

	fn op(&mut self, op: BusOp) {
		self.calls += 1;
		if self.record {
			self.ops.push(op);
		}
	}

	fn is_protected(&self) -> bool {
		self.gate.protected.load(Ordering::SeqCst)
	}

	fn next_in_page(&self, address: usize) -> usize {
		let page_size = self.geometry.page_size;
		(address - address % page_size) + (address + 1) % page_size
	}
}

impl BusTransport for SimulatedEeprom {
	fn start(&mut self) {
		self.op(BusOp::Start);
		// START without STOP aborts a pending page write
		self.latched.clear();
		self.phase = Phase::Select;
	}

	fn stop(&mut self) {
		self.op(BusOp::Stop);
		if self.phase == Phase::Data && !self.latched.is_empty() {
			for &(address, byte) in &self.latched {
				self.memory[address] = byte;
			}
			self.latched.clear();
			self.commits += 1;
			self.busy = self.strict_write_cycle;
		}
		self.phase = Phase::Idle;
	}

	fn write_byte(&mut self, byte: u8) -> Ack {
		self.op(BusOp::Write(byte));
		let call = self.write_calls;
		self.write_calls += 1;
		if self.nack_writes.contains(&call) {
			self.phase = Phase::Ignored;
			return Ack::NoAck;
		}

		match self.phase {
			Phase::Idle | Phase::Ignored => Ack::NoAck,
			Phase::Select => {
				if !self.busy && byte == self.geometry.select_write {
					self.phase = Phase::AddressHigh;
					Ack::Ack
				} else {
					self.phase = Phase::Ignored;
					Ack::NoAck
				}
			},
			Phase::AddressHigh => {
				self.address_high = byte;
				self.phase = Phase::AddressLow;
				Ack::Ack
			},
			Phase::AddressLow => {
				let address = (usize::from(self.address_high) << 8) | usize::from(byte);
				self.counter = address % self.geometry.capacity;
				self.phase = Phase::Data;
				Ack::Ack
			},
			Phase::Data => {
				if self.is_protected() {
					return Ack::NoAck;
				}
				self.latched.push((self.counter, byte));
				self.counter = self.next_in_page(self.counter);
				Ack::Ack
			},
		}
	}

	fn read_bytes(&mut self, select: u8, target: &mut [u8]) -> Ack {
		self.op(BusOp::Read { select, length: target.len() });
		let call = self.read_calls;
		self.read_calls += 1;
		self.latched.clear();
		self.phase = Phase::Idle;

		if self.nack_reads.contains(&call) || self.busy || select != self.geometry.select_read {
			return Ack::NoAck;
		}
		for t in target.iter_mut() {
			let flip = self.corrupted.get(&self.counter).cloned().unwrap_or(0);
			*t = self.memory[self.counter] ^ flip;
			self.counter = (self.counter + 1) % self.geometry.capacity;
		}
		Ack::Ack
	}

	fn set_clock_frequency(&mut self, hz: u32) {
		self.op(BusOp::Clock(hz));
		self.clock_hz = hz;
	}

	fn settle(&mut self, duration: Duration) {
		self.op(BusOp::Settle(duration));
		self.settles += 1;
		if duration >= SETTLE_FLOOR {
			self.busy = false;
		}
	}
}
