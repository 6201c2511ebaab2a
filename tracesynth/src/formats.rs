//! Output trace formats

// Imports
use {
	crate::trace::{AccessKind, TraceRecord},
	std::io,
};

/// Output trace format.
///
/// A closed set of syntaxes, each bound to its formatting function and
/// resolved at configuration-load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
	/// Socket transaction language
	Stl,

	/// The format used by OVPsim trace collection
	Ovp,

	/// Comma-separated `cycle,kind,address` records
	Csv,
}

impl OutputFormat {
	/// Writes one access to `writer` in this format
	pub fn write_access(self, writer: &mut impl io::Write, record: &TraceRecord) -> Result<(), io::Error> {
		match self {
			// Note: STL only distinguishes reads and writes, so instruction
			//       fetches render as reads. Writes carry a default payload.
			Self::Stl => match record.kind {
				AccessKind::Write => writeln!(writer, "{}: write 0x{:x} 0xABCD", record.cycle, record.addr),
				AccessKind::Read | AccessKind::Fetch => {
					writeln!(writer, "{}: read 0x{:x}", record.cycle, record.addr)
				},
			},
			Self::Ovp => writeln!(writer, "{},0x{:x}", record.kind.mnemonic(), record.addr),
			Self::Csv => writeln!(
				writer,
				"{},{},0x{:x}",
				record.cycle,
				record.kind.mnemonic(),
				record.addr
			),
		}
	}
}
