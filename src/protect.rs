/// Write control (WC / WP) input of the EEPROM.
///
/// Asserted means writes are inhibited by the device; the gate only is
/// deasserted while a write data phase is running.
pub trait WriteProtectGate {
	fn assert_protect(&mut self);
	fn deassert_protect(&mut self);
}

impl<'a, G: ?Sized + WriteProtectGate> WriteProtectGate for &'a mut G {
	fn assert_protect(&mut self) {
		G::assert_protect(*self)
	}
	fn deassert_protect(&mut self) {
		G::deassert_protect(*self)
	}
}

/// For boards with the write control pin hardwired low (always writable).
impl WriteProtectGate for () {
	fn assert_protect(&mut self) {
	}
	fn deassert_protect(&mut self) {
	}
}

/// Writes are enabled while this lives; protection is re-asserted on drop,
/// which covers early returns and unwinding.
pub struct WriteEnabled<'a, G: ?Sized + WriteProtectGate + 'a>(&'a mut G);

impl<'a, G: ?Sized + WriteProtectGate> WriteEnabled<'a, G> {
	pub fn new(gate: &'a mut G) -> Self {
		gate.deassert_protect();
		trace!("write protect deasserted");
		WriteEnabled(gate)
	}

	// explicit end of the write phase
	pub fn finish(self) {
	}
}

impl<'a, G: ?Sized + WriteProtectGate> Drop for WriteEnabled<'a, G> {
	fn drop(&mut self) {
		self.0.assert_protect();
		trace!("write protect asserted");
	}
}
