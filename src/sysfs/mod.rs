//! Bus transport and write control on Linux sysfs GPIO lines.

mod file;
mod gpio;

pub use self::gpio::{
	Direction,
	GpioChip,
	GpioLine,
};

use crate::bus::{
	BitBangBus,
	Pins,
};
use crate::bus::bitbang::Lines;
use crate::protect::WriteProtectGate;

/// Open-drain emulation: a released line is switched to input (the pull-up
/// takes it high), a low line is switched to output low.
#[derive(Debug)]
pub struct OpenDrainPins {
	sda: GpioLine,
	scl: GpioLine,
	lines: Option<Lines>,
}

impl OpenDrainPins {
	pub fn new(sda: GpioLine, scl: GpioLine) -> Self {
		OpenDrainPins {
			sda,
			scl,
			lines: None,
		}
	}

	fn drive(line: &mut GpioLine, release: bool) {
		let direction = if release { Direction::In } else { Direction::OutLow };
		if let Err(e) = line.set_direction(direction) {
			error!("I2C: {}", e);
		}
	}

	fn sample(line: &mut GpioLine) -> bool {
		match line.get_value() {
			Ok(v) => v,
			Err(e) => {
				// reads as released (NACK on SDA)
				error!("I2C: {}", e);
				true
			},
		}
	}
}

impl Pins for OpenDrainPins {
	fn set_lines(&mut self, lines: Lines) {
		let last = self.lines;
		if last.map(|l| l.scl) != Some(lines.scl) {
			OpenDrainPins::drive(&mut self.scl, lines.scl);
		}
		if last.map(|l| l.sda) != Some(lines.sda) {
			OpenDrainPins::drive(&mut self.sda, lines.sda);
		}
		self.lines = Some(lines);
	}

	fn read_sda(&mut self) -> bool {
		OpenDrainPins::sample(&mut self.sda)
	}

	fn read_scl(&mut self) -> bool {
		OpenDrainPins::sample(&mut self.scl)
	}
}

/// Output line connected to the write control input.
#[derive(Debug)]
pub struct WriteProtectLine {
	line: GpioLine,
	active_high: bool,
}

impl WriteProtectLine {
	/// Configures the line as output with protection asserted.
	pub fn new(mut line: GpioLine, active_high: bool) -> crate::AResult<Self> {
		line.set_direction(if active_high { Direction::OutHigh } else { Direction::OutLow })?;
		Ok(WriteProtectLine {
			line,
			active_high,
		})
	}

	fn set(&mut self, protect: bool) {
		if let Err(e) = self.line.set_value(protect == self.active_high) {
			error!("write protect: {}", e);
		}
	}
}

impl WriteProtectGate for WriteProtectLine {
	fn assert_protect(&mut self) {
		self.set(true);
	}

	fn deassert_protect(&mut self) {
		self.set(false);
	}
}

pub fn open_bus(chip: &GpioChip, sda: u32, scl: u32) -> crate::AResult<BitBangBus<OpenDrainPins>> {
	ensure!(sda != scl, "SDA and SCL need different GPIO lines (both {})", sda);
	let sda = chip.line(sda)?;
	let scl = chip.line(scl)?;
	Ok(BitBangBus::new(OpenDrainPins::new(sda, scl)))
}

pub fn open_write_protect(chip: &GpioChip, line: u32, active_high: bool) -> crate::AResult<WriteProtectLine> {
	WriteProtectLine::new(chip.line(line)?, active_high)
}

#[cfg(test)]
mod test {
	use std::fs;
	use std::path::PathBuf;

	use super::{
		GpioChip,
		OpenDrainPins,
		open_bus,
		open_write_protect,
	};
	use crate::bus::Pins;
	use crate::bus::bitbang::Lines;
	use crate::protect::WriteProtectGate;

	fn fake_sysfs(name: &str) -> PathBuf {
		let base = std::env::temp_dir().join(format!("m24256-sysfs-{}-{}", name, std::process::id()));
		let _ = fs::remove_dir_all(&base);
		for n in &[2u32, 3, 4] {
			let dir = base.join(format!("gpio{}", n));
			fs::create_dir_all(&dir).unwrap();
			fs::write(dir.join("direction"), b"").unwrap();
			fs::write(dir.join("value"), b"0").unwrap();
		}
		base
	}

	fn direction(base: &PathBuf, n: u32) -> String {
		String::from_utf8(fs::read(base.join(format!("gpio{}/direction", n))).unwrap()).unwrap()
	}

	#[test]
	fn open_drain_directions() {
		let base = fake_sysfs("pins");
		let chip = GpioChip::with_base(&base);
		let mut pins = OpenDrainPins::new(chip.line(2).unwrap(), chip.line(3).unwrap());

		// releasing both: inputs
		pins.set_lines(Lines::idle());
		assert_eq!(direction(&base, 2), "in");
		assert_eq!(direction(&base, 3), "in");

		// only SDA changes for a START
		fs::write(base.join("gpio3/direction"), b"").unwrap();
		pins.set_lines(Lines { scl: true, sda: false });
		assert_eq!(direction(&base, 2), "low");
		assert_eq!(direction(&base, 3), "");

		assert_eq!(pins.read_sda(), false);
		fs::write(base.join("gpio2/value"), b"1").unwrap();
		assert_eq!(pins.read_sda(), true);
		fs::remove_dir_all(&base).unwrap();
	}

	#[test]
	fn write_protect_polarity() {
		let base = fake_sysfs("wp");
		let chip = GpioChip::with_base(&base);
		{
			let mut wp = open_write_protect(&chip, 4, true).unwrap();
			assert_eq!(direction(&base, 4), "high");
			wp.deassert_protect();
			assert_eq!(fs::read(base.join("gpio4/value")).unwrap(), b"0");
			wp.assert_protect();
			assert_eq!(fs::read(base.join("gpio4/value")).unwrap(), b"1");
		}
		{
			let mut wp = open_write_protect(&chip, 4, false).unwrap();
			wp.assert_protect();
			assert_eq!(fs::read(base.join("gpio4/value")).unwrap(), b"0");
		}
		fs::remove_dir_all(&base).unwrap();
	}

	#[test]
	fn bus_needs_two_lines() {
		let base = fake_sysfs("bus");
		let chip = GpioChip::with_base(&base);
		assert!(open_bus(&chip, 2, 2).is_err());
		assert!(open_bus(&chip, 2, 3).is_ok());
		fs::remove_dir_all(&base).unwrap();
	}
}
