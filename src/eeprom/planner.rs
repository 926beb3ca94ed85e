use super::error::{
	EResult,
	EepromError,
};

/// Part of a transfer that stays within one device page
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Chunk {
	pub address: u16,
	pub length: usize,
}

impl Chunk {
	// offset of this chunk within the transfer starting at `start`
	pub fn offset(&self, start: u16) -> usize {
		usize::from(self.address - start)
	}
}

/// Split `[start, start + length)` into page-aligned chunks, ascending.
///
/// A chunk ends where the page index (`address / page_size`) of the next byte
/// changes, or at the end of the range. Fails with `LengthZero` for an empty
/// range, and with `LengthExceedsLimit` if the range leaves the 16-bit
/// address space, needs more than `max_chunks` chunks or `page_size` is zero.
pub fn plan_chunks(start: u16, length: usize, page_size: usize, max_chunks: usize) -> EResult<Vec<Chunk>> {
	if 0 == length {
		return Err(EepromError::LengthZero);
	}
	if 0 == page_size {
		return Err(EepromError::LengthExceedsLimit);
	}

	let start = usize::from(start);
	let end = match start.checked_add(length) {
		Some(end) if end <= 0x1_0000 => end,
		_ => return Err(EepromError::LengthExceedsLimit),
	};

	let first_page = start / page_size;
	let last_page = (end - 1) / page_size;
	let count = last_page - first_page + 1;
	if count > max_chunks {
		return Err(EepromError::LengthExceedsLimit);
	}

	let mut chunks = Vec::with_capacity(count);
	let mut address = start;
	while address < end {
		let page_end = (address / page_size + 1) * page_size;
		let chunk_end = page_end.min(end);
		chunks.push(Chunk {
			address: address as u16,
			length: chunk_end - address,
		});
		address = chunk_end;
	}
	debug_assert_eq!(chunks.len(), count);

	Ok(chunks)
}
