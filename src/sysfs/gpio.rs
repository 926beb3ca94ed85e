use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::bus::reliable_sleep;

use super::file::{
	AttributeFile,
	write_attribute,
};

// udev needs a moment to fix permissions of freshly exported lines
const EXPORT_POLLS: usize = 50;
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	In,
	Out,
	// output, initial level set atomically with the direction
	OutLow,
	OutHigh,
}

impl Direction {
	pub fn as_str(&self) -> &'static str {
		match *self {
			Direction::In => "in",
			Direction::Out => "out",
			Direction::OutLow => "low",
			Direction::OutHigh => "high",
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn parse_level(value: &str) -> crate::AResult<bool> {
	match value {
		"0" => Ok(false),
		"1" => Ok(true),
		e => bail!("Invalid GPIO value {:?}", e),
	}
}

/// GPIO lines through the (legacy) sysfs interface
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct GpioChip {
	base: PathBuf,
}

impl GpioChip {
	pub fn sysfs() -> Self {
		GpioChip::with_base("/sys/class/gpio")
	}

	pub fn with_base<P: Into<PathBuf>>(base: P) -> Self {
		GpioChip {
			base: base.into(),
		}
	}

	fn line_dir(&self, number: u32) -> PathBuf {
		self.base.join(format!("gpio{}", number))
	}

	fn unexport(&self, number: u32) -> io::Result<()> {
		write_attribute(&self.base.join("unexport"), number.to_string().as_bytes())
	}

	/// Open a line, exporting it first if necessary; lines exported here are
	/// unexported again on drop.
	pub fn line(&self, number: u32) -> crate::AResult<GpioLine> {
		let dir = self.line_dir(number);
		let exported = !dir.exists();
		if exported {
			with_context!(("GPIO {}: export", number), {
				write_attribute(&self.base.join("export"), number.to_string().as_bytes())?;
				Ok(())
			})?;
			debug!("GPIO {}: exported", number);
		}

		let mut polls = 0;
		let value = loop {
			match AttributeFile::open(&dir.join("value"), true) {
				Ok(v) => break v,
				Err(ref e) if polls < EXPORT_POLLS && exported
					&& (e.kind() == io::ErrorKind::PermissionDenied || e.kind() == io::ErrorKind::NotFound) =>
				{
					polls += 1;
					reliable_sleep(EXPORT_POLL_INTERVAL);
				},
				Err(e) => {
					if exported {
						if let Err(e) = self.unexport(number) {
							error!("GPIO {}: Failed to unexport: {}", number, e);
						}
					}
					bail!("GPIO {}: couldn't open value: {}", number, e);
				},
			}
		};

		Ok(GpioLine {
			chip: self.clone(),
			number,
			dir,
			value,
			direction: None,
			exported,
		})
	}
}

pub struct GpioLine {
	chip: GpioChip,
	number: u32,
	dir: PathBuf,
	value: AttributeFile,
	direction: Option<Direction>,
	exported: bool,
}

impl GpioLine {
	pub fn number(&self) -> u32 {
		self.number
	}

	pub fn set_direction(&mut self, direction: Direction) -> crate::AResult<()> {
		if self.direction == Some(direction) {
			return Ok(());
		}
		with_context!(("GPIO {}: set direction {}", self.number, direction), {
			write_attribute(&self.dir.join("direction"), direction.as_str().as_bytes())?;
			Ok(())
		})?;
		self.direction = Some(direction);
		Ok(())
	}

	pub fn set_value(&mut self, high: bool) -> crate::AResult<()> {
		with_context!(("GPIO {}: set value", self.number), {
			self.value.write_all(if high { b"1" } else { b"0" })?;
			Ok(())
		})?;
		// a written value replaces the level chosen with the direction
		if self.direction.is_some() {
			self.direction = Some(Direction::Out);
		}
		Ok(())
	}

	pub fn get_value(&mut self) -> crate::AResult<bool> {
		let value = with_context!(("GPIO {}: read value", self.number), {
			Ok(self.value.read_trimmed()?)
		})?;
		parse_level(&value)
	}
}

impl fmt::Debug for GpioLine {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("GpioLine")
			.field("number", &self.number)
			.field("direction", &self.direction)
			.field("exported", &self.exported)
			.finish()
	}
}

impl Drop for GpioLine {
	fn drop(&mut self) {
		if self.exported {
			if let Err(e) = self.chip.unexport(self.number) {
				error!("GPIO {}: Failed to unexport: {}", self.number, e);
			}
		}
	}
}
