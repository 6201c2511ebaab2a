//! Trace input and output

// Imports
use {
	anyhow::Context,
	byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt},
	std::io,
	tracesynth_util::ReadByteArray,
};

/// A source of trace records.
///
/// Yields records in original program order, sequentially, once.
pub trait TraceSource {
	/// Reads the next record, or `None` at the end of the trace
	fn read_next(&mut self) -> Result<Option<TraceRecord>, anyhow::Error>;

	/// Returns the remaining record count, if known up front
	fn records_remaining(&self) -> Option<u64>;
}

/// A single memory reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
	/// Cycle index within the trace
	pub cycle: u64,

	/// Byte address
	pub addr: u64,

	/// Access kind
	pub kind: AccessKind,
}

/// Access kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
	/// Data read
	Read,

	/// Data write
	Write,

	/// Instruction fetch
	Fetch,
}

impl AccessKind {
	/// Returns this kind as a dense index
	pub fn index(self) -> usize {
		match self {
			Self::Read => 0,
			Self::Write => 1,
			Self::Fetch => 2,
		}
	}

	/// Returns the kind for a dense index
	pub fn from_index(index: usize) -> Option<Self> {
		match index {
			0 => Some(Self::Read),
			1 => Some(Self::Write),
			2 => Some(Self::Fetch),
			_ => None,
		}
	}

	/// Returns the single-letter mnemonic of this kind
	pub fn mnemonic(self) -> char {
		match self {
			Self::Read => 'r',
			Self::Write => 'w',
			Self::Fetch => 'i',
		}
	}
}

/// Plain-text trace reader.
///
/// Each record is a line of the form `<kind>,0x<hex-address>` with kind one
/// of `r`, `w` or `i`. Any other line is counted as one inactive cycle, so
/// line number and cycle index coincide.
#[derive(Debug)]
pub struct TextTraceReader<R> {
	/// Reader
	reader: R,

	/// Next cycle index
	cycle: u64,

	/// Line buffer
	line: String,
}

impl<R: io::BufRead> TextTraceReader<R> {
	/// Creates a text trace reader
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			cycle: 0,
			line: String::new(),
		}
	}

	/// Parses a record line, without its cycle.
	///
	/// Returns `None` for lines that aren't memory accesses.
	fn parse_line(line: &str) -> Option<(AccessKind, u64)> {
		let (kind, rest) = line.split_once(",0x")?;
		let kind = match kind {
			"r" => AccessKind::Read,
			"w" => AccessKind::Write,
			"i" => AccessKind::Fetch,
			_ => return None,
		};

		// The address is the leading hex run, anything after is ignored
		let hex_len = rest
			.find(|ch: char| !ch.is_ascii_hexdigit())
			.unwrap_or(rest.len());
		let addr = u64::from_str_radix(&rest[..hex_len], 16).ok()?;

		Some((kind, addr))
	}
}

impl<R: io::BufRead> TraceSource for TextTraceReader<R> {
	fn read_next(&mut self) -> Result<Option<TraceRecord>, anyhow::Error> {
		loop {
			self.line.clear();
			let len = self
				.reader
				.read_line(&mut self.line)
				.context("Unable to read line")?;
			if len == 0 {
				return Ok(None);
			}

			let cycle = self.cycle;
			self.cycle += 1;

			match Self::parse_line(self.line.trim_end()) {
				Some((kind, addr)) => return Ok(Some(TraceRecord { cycle, addr, kind })),
				// Inactive cycle
				None => continue,
			}
		}
	}

	fn records_remaining(&self) -> Option<u64> {
		None
	}
}

/// Magic of the binary trace format
pub const MAGIC: [u8; 8] = *b"TSYN v0\0";

/// Binary trace reader
#[derive(Clone, Debug)]
pub struct BinTraceReader<R> {
	/// Records remaining
	records_remaining: u64,

	/// Reader
	reader: R,
}

impl<R: io::Read + io::Seek> BinTraceReader<R> {
	/// Parses a binary trace from a reader
	pub fn from_reader(mut reader: R) -> Result<Self, anyhow::Error> {
		// Read the magic
		let magic = reader.read_byte_array().context("Unable to read magic")?;
		anyhow::ensure!(magic == MAGIC, "Found wrong magic {magic:?}, expected {MAGIC:?}");

		// Read the header
		let header = Header::from_reader(&mut reader).context("Unable to read header")?;
		tracing::trace!(?header, "Parsed header");

		// Get the total number of records from the stream length, warning
		// if the header disagrees
		let total_records = {
			let magic_size = MAGIC.len() as u64;
			let header_size = Header::BYTE_SIZE as u64;
			let record_size = Record::BYTE_SIZE as u64;

			let cur_pos = reader.stream_position().context("Unable to get stream position")?;
			let total_actual_size = reader
				.seek(io::SeekFrom::End(0))
				.context("Unable to get stream length")?;
			reader
				.seek(io::SeekFrom::Start(cur_pos))
				.context("Unable to seek back to records")?;

			let total_expected_size = magic_size + header_size + header.records * record_size;
			if total_actual_size != total_expected_size {
				tracing::warn!(
					"Binary trace size differs from expected. Found {total_actual_size}, expected {total_expected_size}"
				);
			}

			(total_actual_size - magic_size - header_size) / record_size
		};

		Ok(Self {
			records_remaining: total_records,
			reader,
		})
	}
}

impl<R: io::Read + io::Seek> TraceSource for BinTraceReader<R> {
	fn read_next(&mut self) -> Result<Option<TraceRecord>, anyhow::Error> {
		// If we're done, return `None`
		if self.records_remaining == 0 {
			return Ok(None);
		}

		// Else parse the next record and reduce the remaining records
		let record = Record::from_reader(&mut self.reader).context("Unable to read record")?;
		self.records_remaining -= 1;

		Ok(Some(record.0))
	}

	fn records_remaining(&self) -> Option<u64> {
		Some(self.records_remaining)
	}
}

/// Binary trace writer
#[derive(Clone, Debug)]
pub struct BinTraceWriter<W> {
	/// Records written
	records_written: u64,

	/// Writer
	writer: W,
}

impl<W: io::Write + io::Seek> BinTraceWriter<W> {
	/// Creates a new writer
	pub fn new(mut writer: W) -> Result<Self, anyhow::Error> {
		// Write the magic
		// Note: We rewind to ensure we write at the start, because we then
		//       later come back to write the header
		writer.rewind().context("Unable to rewind to start")?;
		writer.write_all(&MAGIC).context("Unable to write magic")?;

		// Skip over the header
		writer
			.seek(io::SeekFrom::Current(Header::BYTE_SIZE as i64))
			.context("Unable to seek past header")?;

		Ok(Self {
			writer,
			records_written: 0,
		})
	}

	/// Writes a record
	pub fn write(&mut self, record: &TraceRecord) -> Result<(), anyhow::Error> {
		Record(*record)
			.to_writer(&mut self.writer)
			.context("Unable to write record")?;

		self.records_written += 1;
		Ok(())
	}

	/// Finishes writing
	pub fn finish(mut self) -> Result<W, anyhow::Error> {
		// Rewind the writer and write the header
		self.writer
			.seek(io::SeekFrom::Start(MAGIC.len() as u64))
			.context("Unable to seek to header")?;

		let header = Header {
			records: self.records_written,
		};
		header.to_writer(&mut self.writer).context("Unable to write header")?;

		Ok(self.writer)
	}
}

/// Header
#[derive(Clone, Copy, Debug)]
struct Header {
	/// Total records
	records: u64,
}

impl Header {
	/// Returns the size of this header (including any padding)
	pub const BYTE_SIZE: usize = 0x10;

	/// Parses a header from a reader
	pub fn from_reader<R: io::Read + io::Seek>(reader: &mut R) -> Result<Self, anyhow::Error> {
		let records = reader.read_u64::<LittleEndian>().context("Unable to read records")?;

		// Then seek over the padding
		reader
			.seek(io::SeekFrom::Current(8))
			.context("Unable to seek over padding")?;

		Ok(Self { records })
	}

	/// Writes a header to a writer
	pub fn to_writer<W: io::Write + io::Seek>(&self, writer: &mut W) -> Result<(), anyhow::Error> {
		writer
			.write_u64::<LittleEndian>(self.records)
			.context("Unable to write records")?;
		writer
			.write_u64::<LittleEndian>(0)
			.context("Unable to write padding")?;

		Ok(())
	}
}

/// On-disk record
#[derive(Clone, Copy, Debug)]
struct Record(TraceRecord);

impl Record {
	/// Returns the size of this record
	pub const BYTE_SIZE: usize = 0x18;

	/// Parses a record from a reader
	pub fn from_reader<R: io::Read>(reader: &mut R) -> Result<Self, anyhow::Error> {
		let cycle = reader.read_u64::<LittleEndian>().context("Unable to read cycle")?;
		let addr = reader.read_u64::<LittleEndian>().context("Unable to read address")?;
		let kind = reader.read_u64::<LittleEndian>().context("Unable to read kind")?;
		let kind = usize::try_from(kind)
			.ok()
			.and_then(AccessKind::from_index)
			.with_context(|| format!("Unknown access kind: {kind}"))?;

		Ok(Self(TraceRecord { cycle, addr, kind }))
	}

	/// Writes a record to a writer
	pub fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<(), anyhow::Error> {
		writer
			.write_u64::<LittleEndian>(self.0.cycle)
			.context("Unable to write cycle")?;
		writer
			.write_u64::<LittleEndian>(self.0.addr)
			.context("Unable to write address")?;
		writer
			.write_u64::<LittleEndian>(self.0.kind.index() as u64)
			.context("Unable to write kind")?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// Imports
	use super::*;

	/// Collects all records of a source
	fn collect<S: TraceSource>(source: &mut S) -> Vec<TraceRecord> {
		std::iter::from_fn(|| source.read_next().expect("Unable to read record"))
			.collect()
	}

	#[test]
	fn text_records_and_inactive_cycles() {
		let trace = "r,0x1000\nnot an access\nw,0x1040\n\ni,0x2000\n";
		let mut reader = TextTraceReader::new(io::Cursor::new(trace));

		assert_eq!(collect(&mut reader), vec![
			TraceRecord {
				cycle: 0,
				addr:  0x1000,
				kind:  AccessKind::Read,
			},
			TraceRecord {
				cycle: 2,
				addr:  0x1040,
				kind:  AccessKind::Write,
			},
			TraceRecord {
				cycle: 4,
				addr:  0x2000,
				kind:  AccessKind::Fetch,
			},
		]);
	}

	#[test]
	fn text_ignores_trailing_payload() {
		// STL-style writes carry a payload after the address
		let trace = "w,0x1f 0xABCD\n";
		let mut reader = TextTraceReader::new(io::Cursor::new(trace));

		let records = collect(&mut reader);
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].addr, 0x1f);
	}

	#[test]
	fn text_rejects_unknown_kinds() {
		let trace = "x,0x1000\nr,0x2000\n";
		let mut reader = TextTraceReader::new(io::Cursor::new(trace));

		let records = collect(&mut reader);
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].cycle, 1);
	}

	#[test]
	fn binary_round_trip() {
		let records = vec![
			TraceRecord {
				cycle: 0,
				addr:  0xdead_0000,
				kind:  AccessKind::Read,
			},
			TraceRecord {
				cycle: 3,
				addr:  0xdead_0040,
				kind:  AccessKind::Write,
			},
			TraceRecord {
				cycle: 4,
				addr:  0xbeef_0000,
				kind:  AccessKind::Fetch,
			},
		];

		let mut writer = BinTraceWriter::new(io::Cursor::new(Vec::new())).expect("Unable to create writer");
		for record in &records {
			writer.write(record).expect("Unable to write record");
		}
		let buffer = writer.finish().expect("Unable to finish writer").into_inner();

		let mut reader = BinTraceReader::from_reader(io::Cursor::new(buffer)).expect("Unable to parse trace");
		assert_eq!(reader.records_remaining(), Some(3));
		assert_eq!(collect(&mut reader), records);
	}

	#[test]
	fn binary_wrong_magic() {
		let buffer = b"WRONG v0\0\0\0\0\0\0\0\0".to_vec();
		assert!(BinTraceReader::from_reader(io::Cursor::new(buffer)).is_err());
	}
}
