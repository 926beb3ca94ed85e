use std::time::Duration;

use super::{
	Ack,
	BusTransport,
	reliable_sleep,
};

// bounded wait for a slave stretching the clock
const CLOCK_STRETCH_POLLS: usize = 1000;

pub const DEFAULT_CLOCK_HZ: u32 = 100_000;

/// Open-drain line levels: `true` releases the line (pulled up), `false`
/// drives it low.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Lines {
	pub scl: bool,
	pub sda: bool,
}

impl Lines {
	pub fn idle() -> Self {
		Lines {
			scl: true,
			sda: true,
		}
	}
}

pub trait Pins {
	fn set_lines(&mut self, lines: Lines);
	fn read_sda(&mut self) -> bool;

	// lines without read-back can't see clock stretching
	fn read_scl(&mut self) -> bool {
		true
	}

	// delay for (at least) `duration`
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

fn half_period(hz: u32) -> Duration {
	Duration::from_nanos(500_000_000 / u64::from(hz.max(1)))
}

/// I²C master on two GPIO lines.
///
/// Every SCL edge is followed by half a clock period of delay; data is only
/// changed while SCL is low, except for START (SDA falling while SCL is
/// high) and STOP (SDA rising while SCL is high).
pub struct BitBangBus<P: Pins> {
	pins: P,
	lines: Lines,
	half_period: Duration,
	started: bool,
}

impl<P: Pins> BitBangBus<P> {
	pub fn new(mut pins: P) -> Self {
		pins.set_lines(Lines::idle());
		BitBangBus {
			pins,
			lines: Lines::idle(),
			half_period: half_period(DEFAULT_CLOCK_HZ),
			started: false,
		}
	}

	pub fn pins(&mut self) -> &mut P {
		&mut self.pins
	}

	pub fn into_pins(self) -> P {
		self.pins
	}

	fn set(&mut self, scl: bool, sda: bool) {
		self.lines = Lines { scl, sda };
		self.pins.set_lines(self.lines);
	}

	fn wait_half(&mut self) {
		let d = self.half_period;
		self.pins.delay(d);
	}

	fn release_scl(&mut self) {
		let sda = self.lines.sda;
		self.set(true, sda);
		for _ in 0..CLOCK_STRETCH_POLLS {
			if self.pins.read_scl() {
				return;
			}
			self.wait_half();
		}
		warn!("I2C: SCL still held low after {} polls", CLOCK_STRETCH_POLLS);
	}

	fn write_bit(&mut self, bit: bool) {
		self.set(false, bit);
		self.wait_half();
		self.release_scl();
		self.wait_half();
		self.set(false, bit);
	}

	fn read_bit(&mut self) -> bool {
		self.set(false, true);
		self.wait_half();
		self.release_scl();
		self.wait_half();
		let bit = self.pins.read_sda();
		self.set(false, true);
		bit
	}

	fn read_byte(&mut self, ack: Ack) -> u8 {
		let mut result = 0u8;
		for bit in (0..8).rev() {
			if self.read_bit() {
				result |= 1u8 << bit;
			}
		}
		// master NACK leaves SDA released
		self.write_bit(ack == Ack::NoAck);
		result
	}
}

impl<P: Pins> BusTransport for BitBangBus<P> {
	fn start(&mut self) {
		if self.started {
			// repeated START: SCL low, release SDA, then SCL; SDA must not
			// rise while SCL is high (that would be a STOP)
			let sda = self.lines.sda;
			if self.lines.scl {
				self.set(false, sda);
				self.wait_half();
			}
			self.set(false, true);
			self.wait_half();
			self.release_scl();
			self.wait_half();
		}
		self.set(true, false);
		self.wait_half();
		self.set(false, false);
		self.wait_half();
		self.started = true;
		trace!("I2C: START");
	}

	fn stop(&mut self) {
		self.set(false, false);
		self.wait_half();
		self.release_scl();
		self.wait_half();
		self.set(true, true);
		self.wait_half();
		self.started = false;
		trace!("I2C: STOP");
	}

	fn write_byte(&mut self, byte: u8) -> Ack {
		for bit in (0..8).rev() {
			self.write_bit(0 != byte & (1u8 << bit));
		}
		let ack = Ack::from(self.read_bit());
		trace!("I2C: wrote 0x{:02x}: {:?}", byte, ack);
		ack
	}

	fn read_bytes(&mut self, select: u8, target: &mut [u8]) -> Ack {
		self.start();
		if !self.write_byte(select).is_ack() {
			self.stop();
			return Ack::NoAck;
		}
		let last = target.len().saturating_sub(1);
		for (i, t) in target.iter_mut().enumerate() {
			*t = self.read_byte(if i == last { Ack::NoAck } else { Ack::Ack });
		}
		trace!("I2C: read {} bytes", target.len());
		self.stop();
		Ack::Ack
	}

	fn set_clock_frequency(&mut self, hz: u32) {
		self.half_period = half_period(hz);
		debug!("I2C: clock {} Hz (half period {:?})", hz, self.half_period);
	}
}

#[cfg(test)]
mod test {
	use std::collections::VecDeque;
	use std::time::Duration;

	use super::{
		BitBangBus,
		Lines,
		Pins,
		half_period,
	};
	use crate::bus::{
		Ack,
		BusTransport,
	};

	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	enum Event {
		Start,
		Stop,
		Bit(bool),
	}

	// decodes bus conditions from the master's line changes; SDA input is
	// served from a queue (low = ACK / zero bit when empty)
	struct Recorder {
		last: Lines,
		pending: Option<bool>,
		events: Vec<Event>,
		input: VecDeque<bool>,
	}

	impl Recorder {
		fn new() -> Self {
			Recorder {
				last: Lines::idle(),
				pending: None,
				events: Vec::new(),
				input: VecDeque::new(),
			}
		}
	}

	impl Pins for Recorder {
		fn set_lines(&mut self, lines: Lines) {
			if self.last.scl && lines.scl {
				// SDA change while SCL is high: not a data bit
				if self.last.sda && !lines.sda {
					self.pending = None;
					self.events.push(Event::Start);
				} else if !self.last.sda && lines.sda {
					self.pending = None;
					self.events.push(Event::Stop);
				}
			} else if !self.last.scl && lines.scl {
				self.pending = Some(lines.sda);
			} else if self.last.scl && !lines.scl {
				if let Some(bit) = self.pending.take() {
					self.events.push(Event::Bit(bit));
				}
			}
			self.last = lines;
		}

		fn read_sda(&mut self) -> bool {
			self.input.pop_front().unwrap_or(false)
		}

		fn delay(&mut self, _duration: Duration) {
		}
	}

	fn bits(byte: u8) -> Vec<Event> {
		(0..8).rev().map(|b| Event::Bit(0 != byte & (1 << b))).collect()
	}

	#[test]
	fn write_byte_framing() {
		let mut bus = BitBangBus::new(Recorder::new());
		bus.start();
		assert_eq!(bus.write_byte(0xa0), Ack::Ack);
		bus.stop();

		let mut expected = vec![Event::Start];
		expected.extend(bits(0xa0));
		// master releases SDA for the ACK clock
		expected.push(Event::Bit(true));
		expected.push(Event::Stop);
		assert_eq!(bus.into_pins().events, expected);
	}

	#[test]
	fn write_byte_nack() {
		let mut pins = Recorder::new();
		// 8 data bits are not sampled by the master; only the ACK bit is
		pins.input.push_back(true);
		let mut bus = BitBangBus::new(pins);
		bus.start();
		assert_eq!(bus.write_byte(0x12), Ack::NoAck);
	}

	#[test]
	fn read_bytes_acks_all_but_last() {
		let mut pins = Recorder::new();
		// select ACK, then 0x81, then 0x7e
		pins.input.push_back(false);
		for b in (0..8).rev() {
			pins.input.push_back(0 != 0x81 & (1 << b));
		}
		for b in (0..8).rev() {
			pins.input.push_back(0 != 0x7e & (1 << b));
		}
		let mut bus = BitBangBus::new(pins);
		let mut buf = [0u8; 2];
		assert_eq!(bus.read_bytes(0xa1, &mut buf), Ack::Ack);
		assert_eq!(buf, [0x81, 0x7e]);

		let events = bus.into_pins().events;
		assert_eq!(events.first(), Some(&Event::Start));
		assert_eq!(events.last(), Some(&Event::Stop));
		// select byte + ACK clock, then per data byte 8 clocks + master ACK/NACK
		let ack_bits: Vec<Event> = vec![events[1 + 8 + 1 + 8], events[1 + 8 + 1 + 9 + 8]];
		assert_eq!(ack_bits, vec![Event::Bit(false), Event::Bit(true)]);
	}

	#[test]
	fn read_bytes_select_nack() {
		let mut pins = Recorder::new();
		pins.input.push_back(true);
		let mut bus = BitBangBus::new(pins);
		let mut buf = [0u8; 4];
		assert_eq!(bus.read_bytes(0xa1, &mut buf), Ack::NoAck);
		assert_eq!(bus.into_pins().events.last(), Some(&Event::Stop));
	}

	#[test]
	fn repeated_start() {
		let mut bus = BitBangBus::new(Recorder::new());
		bus.start();
		bus.write_byte(0xa0);
		bus.start();
		let events = bus.into_pins().events;
		assert_eq!(events.iter().filter(|e| **e == Event::Start).count(), 2);
		assert!(!events.contains(&Event::Stop));
	}

	#[test]
	fn repeated_start_with_clock_high() {
		let mut bus = BitBangBus::new(Recorder::new());
		bus.start();
		// SCL released again after the START condition
		bus.set(true, false);
		bus.pins().events.clear();
		bus.pins().pending = None;
		bus.start();
		let events = bus.into_pins().events;
		assert_eq!(events, vec![Event::Start]);
	}

	#[test]
	fn clock_half_period() {
		assert_eq!(half_period(100_000), Duration::from_micros(5));
		assert_eq!(half_period(400_000), Duration::from_nanos(1250));
		assert_eq!(half_period(0), Duration::from_millis(500));
	}
}
