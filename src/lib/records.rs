//! Call-file source and sink.
//!
//! Calls live in a tab-delimited file with a `#`-prefixed header row:
//!
//! ```text
//! kind  contig  start  end  direction  id  attributes  anchor  breakpoint  breakpoint_qual
//! ```
//!
//! Rows tagged `breakend` are fully parsed; the start column doubles as the
//! record's nominal position. Every other row is passed through the
//! pipeline verbatim, with only contig and start parsed for its sort key.
//! Undecodable rows are fatal: silently skipping a record would break the
//! pipeline's no-loss guarantee.
//!
//! The writer never exposes a partially-written file at the destination: it
//! writes to a temp file in the destination directory and atomically
//! persists it only after a successful, complete close. Dropping the writer
//! on any error path removes the temp file and leaves the destination
//! untouched.

use std::io::{BufRead, Lines, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use fgoxide::io::Io;
use tempfile::NamedTempFile;

use crate::breakend::{BreakendDirection, BreakendSummary, EvidenceAttribute};
use crate::calls::{BreakendCall, OtherCall, VariantCall};
use crate::dictionary::ContigDictionary;
use crate::errors::SvasmError;
use crate::pipeline::{CallSink, CallSource, CallStream};

/// Column header written at the top of every call file.
const HEADER: &str =
    "#kind\tcontig\tstart\tend\tdirection\tid\tattributes\tanchor\tbreakpoint\tbreakpoint_qual";

/// Placeholder for absent optional columns.
const MISSING: &str = ".";

/// Lazily yields the calls of a file, in file order.
pub struct CallReader {
    lines: Lines<Box<dyn BufRead + Send>>,
    dict: Arc<ContigDictionary>,
    line_no: u64,
}

impl CallReader {
    /// Open `path` for reading (transparently decompressing `.gz`).
    pub fn open<P: AsRef<Path>>(path: P, dict: Arc<ContigDictionary>) -> Result<Self> {
        let path = path.as_ref();
        let reader = Io::default()
            .new_reader(path)
            .with_context(|| format!("Failed to open call file: {}", path.display()))?;
        Ok(Self { lines: reader.lines(), dict, line_no: 0 })
    }
}

impl Iterator for CallReader {
    type Item = Result<VariantCall>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(parse_call_line(&line, self.line_no, &self.dict).map_err(Into::into));
        }
    }
}

fn parse_call_line(
    line: &str,
    line_no: u64,
    dict: &ContigDictionary,
) -> Result<VariantCall, SvasmError> {
    let malformed = |reason: String| SvasmError::MalformedRecord { line: line_no, reason };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(malformed(format!("expected at least 3 columns, got {}", fields.len())));
    }
    let tid = dict.tid(fields[1])?;
    let start: i64 =
        fields[2].parse().map_err(|_| malformed(format!("bad start '{}'", fields[2])))?;

    if fields[0] != "breakend" {
        // Opaque passthrough; only the sort key is interpreted.
        return Ok(VariantCall::Other(OtherCall { tid, pos: start, line: line.to_string() }));
    }

    if fields.len() != 10 {
        return Err(malformed(format!(
            "breakend rows need 10 columns, got {}",
            fields.len()
        )));
    }
    let end: i64 =
        fields[3].parse().map_err(|_| malformed(format!("bad end '{}'", fields[3])))?;
    let direction = BreakendDirection::from_str(fields[4])
        .map_err(|_| malformed(format!("bad direction '{}'", fields[4])))?;
    let mut summary = BreakendSummary::new(tid, start, end, direction)
        .map_err(|_| malformed(format!("breakend interval start {start} > end {end}")))?;

    if fields[6] != MISSING {
        for pair in fields[6].split(';') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| malformed(format!("bad attribute '{pair}'")))?;
            let attr = EvidenceAttribute::from_str(key)
                .map_err(|_| malformed(format!("unknown attribute '{key}'")))?;
            let value: f64 = value
                .parse()
                .map_err(|_| malformed(format!("bad attribute value '{value}'")))?;
            summary.attributes.insert(attr, value);
        }
    }

    let mut call = BreakendCall::new(start, summary);
    if fields[5] != MISSING {
        call.evidence_id = Some(fields[5].to_string());
    }
    if fields[7] != MISSING {
        call.anchor_seq = fields[7].as_bytes().to_vec();
    }
    if fields[8] != MISSING {
        call.breakpoint_seq = fields[8].as_bytes().to_vec();
    }
    if fields[9] != MISSING {
        call.breakpoint_qual = fields[9]
            .split(',')
            .map(|q| q.parse::<u8>().map_err(|_| malformed(format!("bad quality '{q}'"))))
            .collect::<Result<Vec<u8>, _>>()?;
    }
    if call.breakpoint_qual.len() != call.breakpoint_seq.len() {
        return Err(malformed(format!(
            "breakpoint quality length {} != sequence length {}",
            call.breakpoint_qual.len(),
            call.breakpoint_seq.len()
        )));
    }
    Ok(VariantCall::Breakend(call))
}

/// Serialize one call to its file row.
fn format_call(call: &VariantCall, dict: &ContigDictionary) -> Result<String, SvasmError> {
    match call {
        VariantCall::Other(other) => Ok(other.line.clone()),
        VariantCall::Breakend(call) => {
            let contig = dict
                .name(call.summary.tid)
                .ok_or_else(|| SvasmError::ContigNotFound {
                    name: format!("tid {}", call.summary.tid),
                })?;
            let attributes = if call.summary.attributes.is_empty() {
                MISSING.to_string()
            } else {
                call.summary
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(";")
            };
            let opt_seq = |seq: &[u8]| {
                if seq.is_empty() {
                    MISSING.to_string()
                } else {
                    String::from_utf8_lossy(seq).into_owned()
                }
            };
            let quals = if call.breakpoint_qual.is_empty() {
                MISSING.to_string()
            } else {
                call.breakpoint_qual
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            };
            Ok(format!(
                "breakend\t{contig}\t{}\t{}\t{}\t{}\t{attributes}\t{}\t{}\t{quals}",
                call.pos,
                call.summary.end,
                call.summary.direction,
                call.evidence_id.as_deref().unwrap_or(MISSING),
                opt_seq(&call.anchor_seq),
                opt_seq(&call.breakpoint_seq),
            ))
        }
    }
}

/// A call file the pipeline can pass over more than once.
pub struct TsvCallSource {
    path: PathBuf,
    dict: Arc<ContigDictionary>,
}

impl TsvCallSource {
    /// Create a source over `path`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P, dict: Arc<ContigDictionary>) -> Self {
        Self { path: path.as_ref().to_path_buf(), dict }
    }
}

impl CallSource for TsvCallSource {
    fn open_calls(&self) -> Result<CallStream> {
        let reader = CallReader::open(&self.path, Arc::clone(&self.dict))?;
        Ok(Box::new(reader))
    }
}

/// Writes calls with atomic replace-or-fail semantics.
pub struct CallWriter {
    out: Option<std::io::BufWriter<NamedTempFile>>,
    path: PathBuf,
    dict: Arc<ContigDictionary>,
    written: u64,
}

impl CallWriter {
    /// Create a writer targeting `path`.
    ///
    /// Data accumulates in a temp file beside the destination and only
    /// moves into place on [`CallWriter::finish`].
    pub fn create<P: AsRef<Path>>(path: P, dict: Arc<ContigDictionary>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).with_context(|| {
            format!("Failed to create temp file for output: {}", path.display())
        })?;
        let mut out = std::io::BufWriter::new(tmp);
        writeln!(out, "{HEADER}")?;
        Ok(Self { out: Some(out), path, dict, written: 0 })
    }

    /// Append one call.
    pub fn write_call(&mut self, call: &VariantCall) -> Result<()> {
        let out = self
            .out
            .as_mut()
            .context("write_call on a finished call writer")?;
        writeln!(out, "{}", format_call(call, &self.dict)?)?;
        self.written += 1;
        Ok(())
    }

    /// Flush and atomically move the temp file to the destination.
    ///
    /// Returns the number of calls written. If this is never called the
    /// destination is left untouched.
    pub fn finish(&mut self) -> Result<u64> {
        let out = self.out.take().context("finish on a finished call writer")?;
        let tmp = out
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush output: {}", e.error()))?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to move output into place: {}", self.path.display()))?;
        Ok(self.written)
    }
}

impl CallSink for CallWriter {
    fn write_call(&mut self, call: &VariantCall) -> Result<()> {
        CallWriter::write_call(self, call)
    }

    fn finish(&mut self) -> Result<u64> {
        CallWriter::finish(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> Arc<ContigDictionary> {
        Arc::new(ContigDictionary::from_names(&["chr1", "chr2"]).unwrap())
    }

    fn breakend_line() -> &'static str {
        "breakend\tchr1\t100\t110\tf\tdebruijn-chr1:100-f\tASSEMBLY_READS=2\tA\tACGTGA\t10,10,10,10,10,5"
    }

    #[test]
    fn test_parse_breakend_row() {
        let call = parse_call_line(breakend_line(), 1, &dict()).unwrap();
        let VariantCall::Breakend(call) = call else { panic!("expected breakend") };
        assert_eq!(call.pos, 100);
        assert_eq!(call.summary.start, 100);
        assert_eq!(call.summary.end, 110);
        assert_eq!(call.evidence_id.as_deref(), Some("debruijn-chr1:100-f"));
        assert_eq!(call.breakpoint_seq, b"ACGTGA");
        assert_eq!(call.breakpoint_qual, vec![10, 10, 10, 10, 10, 5]);
        assert_eq!(
            call.summary.attributes[&EvidenceAttribute::AssemblyReads], 2.0
        );
    }

    #[test]
    fn test_parse_other_row_is_verbatim() {
        let line = "snv\tchr2\t55\tA\tG\textra stuff";
        let call = parse_call_line(line, 1, &dict()).unwrap();
        let VariantCall::Other(other) = call else { panic!("expected other") };
        assert_eq!(other.tid, 1);
        assert_eq!(other.pos, 55);
        assert_eq!(other.line, line);
    }

    #[test]
    fn test_start_after_end_is_malformed() {
        let line = "breakend\tchr1\t110\t100\tf\t.\t.\t.\t.\t.";
        let err = parse_call_line(line, 7, &dict()).unwrap_err();
        assert!(matches!(err, SvasmError::MalformedRecord { line: 7, .. }));
    }

    #[test]
    fn test_quality_length_mismatch_is_malformed() {
        let line = "breakend\tchr1\t100\t110\tf\t.\t.\t.\tACGT\t10,10";
        assert!(parse_call_line(line, 1, &dict()).is_err());
    }

    #[test]
    fn test_round_trip_through_format() {
        let call = parse_call_line(breakend_line(), 1, &dict()).unwrap();
        let formatted = format_call(&call, &dict()).unwrap();
        let reparsed = parse_call_line(&formatted, 1, &dict()).unwrap();
        assert_eq!(call, reparsed);
    }

    #[test]
    fn test_writer_is_atomic() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("calls.tsv");

        // A dropped writer leaves no output behind.
        {
            let mut writer = CallWriter::create(&path, dict()).unwrap();
            let call = parse_call_line(breakend_line(), 1, &dict()).unwrap();
            writer.write_call(&call).unwrap();
        }
        assert!(!path.exists());

        // A finished writer produces the file.
        let mut writer = CallWriter::create(&path, dict()).unwrap();
        let call = parse_call_line(breakend_line(), 1, &dict()).unwrap();
        writer.write_call(&call).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);
        assert!(path.exists());

        let mut reader = CallReader::open(&path, dict()).unwrap();
        let read_back = reader.next().unwrap().unwrap();
        assert_eq!(read_back, call);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_reader_skips_header_and_blank_lines() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("calls.tsv");
        std::fs::write(&path, format!("{HEADER}\n\n{}\n", breakend_line())).unwrap();
        let calls: Vec<_> =
            CallReader::open(&path, dict()).unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(calls.len(), 1);
    }
}
