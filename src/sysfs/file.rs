use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileExt;
use std::os::unix::io::FromRawFd;
use std::path::Path;

use libc::{
	O_CLOEXEC,
	O_RDONLY,
	O_RDWR,
	O_SYNC,
	open,
};

/// Attribute file kept open for repeated small reads/writes at offset 0
/// (sysfs attributes are re-evaluated on every pread/pwrite).
#[derive(Debug)]
pub struct AttributeFile {
	file: fs::File,
}

impl AttributeFile {
	pub fn open(path: &Path, writable: bool) -> io::Result<Self> {
		let c_path = CString::new(path.as_os_str().as_bytes())
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
		let access = if writable { O_RDWR } else { O_RDONLY };
		let flags = O_CLOEXEC | O_SYNC | access;
		let fd = unsafe { open(c_path.as_ptr(), flags) };
		if fd < 0 {
			return Err(io::Error::last_os_error());
		}
		let file = unsafe { fs::File::from_raw_fd(fd) };
		Ok(AttributeFile { file })
	}

	pub fn read_trimmed(&self) -> io::Result<String> {
		let mut buf = [0u8; 32];
		let len = self.file.read_at(&mut buf, 0)?;
		Ok(String::from_utf8_lossy(&buf[..len]).trim().into())
	}

	pub fn write_all(&self, data: &[u8]) -> io::Result<()> {
		// attributes need to be written in one syscall
		let l = self.file.write_at(data, 0)?;
		if l != data.len() {
			Err(io::Error::new(io::ErrorKind::Other, "failed to write whole attribute"))
		} else {
			Ok(())
		}
	}
}

pub fn write_attribute(path: &Path, data: &[u8]) -> io::Result<()> {
	AttributeFile::open(path, true)?.write_all(data)
}

#[cfg(test)]
mod test {
	use std::fs;

	use super::{
		AttributeFile,
		write_attribute,
	};

	#[test]
	fn read_write_attribute() {
		let dir = std::env::temp_dir().join(format!("m24256-attr-{}", std::process::id()));
		fs::create_dir_all(&dir).unwrap();
		let path = dir.join("value");
		fs::write(&path, b"0\n").unwrap();

		let attr = AttributeFile::open(&path, true).unwrap();
		assert_eq!(attr.read_trimmed().unwrap(), "0");
		write_attribute(&path, b"1").unwrap();
		assert_eq!(attr.read_trimmed().unwrap(), "1");

		assert!(AttributeFile::open(&dir.join("missing"), false).is_err());
		fs::remove_dir_all(&dir).unwrap();
	}
}
