//! Line streaming for the trip CSV.
//!
//! A [`LineStreamer`] owns the open input file. [`LineStreamer::run`] drops
//! the header and hands every following line, one at a time, to whichever
//! worker is waiting on the other end of a rendezvous channel.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use taxis_core::error::{Result, TripsError};
use tracing::{debug, warn};

/// How a clean streaming run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Data lines handed off (header excluded).
    pub lines: u64,
    /// `false` when every receiver went away before the input was exhausted.
    pub exhausted: bool,
}

/// Producer side of the pipeline: an open input file.
///
/// The file handle lives exactly as long as this value.
#[derive(Debug)]
pub struct LineStreamer<R = BufReader<File>> {
    path: PathBuf,
    reader: R,
}

impl LineStreamer {
    /// Open `path` for streaming.
    ///
    /// Fails with [`TripsError::SourceUnavailable`] when the file can not be
    /// opened; nothing else has been started at that point.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| TripsError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }
}

impl<R: BufRead> LineStreamer<R> {
    /// Stream from an already open reader. `path` is only used in errors.
    pub fn from_reader(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Skip the header, then send each line through `tx`.
    ///
    /// `tx` is expected to be a zero-capacity channel so that every send
    /// blocks until a worker takes the line. Dropping `tx` on return closes
    /// the handoff for all workers.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD and the line
    /// is still sent; the record parser decides whether it is usable.
    ///
    /// Returns [`TripsError::SourceRead`] when reading fails part way, which
    /// is distinct from a clean end of input.
    pub fn run(self, tx: Sender<String>) -> Result<StreamSummary> {
        let LineStreamer { path, mut reader } = self;
        let mut buf = Vec::new();

        let read_err = |source: io::Error| TripsError::SourceRead {
            path: path.clone(),
            source,
        };

        if next_line(&mut reader, &mut buf).map_err(read_err)?.is_none() {
            debug!("{} is empty", path.display());
            return Ok(StreamSummary {
                lines: 0,
                exhausted: true,
            });
        }

        let mut sent = 0u64;
        while let Some(line) = next_line(&mut reader, &mut buf).map_err(read_err)? {
            if tx.send(line).is_err() {
                warn!(
                    "all workers stopped after {} lines of {}; stopping stream",
                    sent,
                    path.display()
                );
                return Ok(StreamSummary {
                    lines: sent,
                    exhausted: false,
                });
            }
            sent += 1;
        }

        debug!("streamed {} lines from {}", sent, path.display());
        Ok(StreamSummary {
            lines: sent,
            exhausted: true,
        })
    }
}

/// Read one line without its `\n` or `\r\n` terminator, decoding lossily.
///
/// `Ok(None)` at end of input.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Reader that yields `good` and then fails every read.
#[cfg(test)]
pub(crate) struct FailingReader {
    good: io::Cursor<Vec<u8>>,
}

#[cfg(test)]
impl FailingReader {
    pub(crate) fn new(good: &[u8]) -> Self {
        Self {
            good: io::Cursor::new(good.to_vec()),
        }
    }
}

#[cfg(test)]
impl io::Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = io::Read::read(&mut self.good, buf)?;
        if n == 0 {
            return Err(io::Error::other("disk on fire"));
        }
        Ok(n)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::io::{Cursor, Write};
    use std::thread;
    use tempfile::TempDir;

    fn collect<R: BufRead + Send + 'static>(
        streamer: LineStreamer<R>,
    ) -> (Result<StreamSummary>, Vec<String>) {
        let (tx, rx) = bounded(0);
        let producer = thread::spawn(move || streamer.run(tx));
        let received: Vec<String> = rx.iter().collect();
        (producer.join().unwrap(), received)
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.csv");
        match LineStreamer::open(&missing) {
            Err(TripsError::SourceUnavailable { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_skips_header_and_streams_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trips.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "header").unwrap();
        writeln!(file, "a").unwrap();
        writeln!(file, "b").unwrap();
        write!(file, "c").unwrap();
        drop(file);

        let (result, lines) = collect(LineStreamer::open(&path).unwrap());
        assert_eq!(lines, vec!["a", "b", "c"]);
        assert_eq!(
            result.unwrap(),
            StreamSummary {
                lines: 3,
                exhausted: true
            }
        );
    }

    #[test]
    fn test_header_only_and_empty_input() {
        let (result, lines) =
            collect(LineStreamer::from_reader("h.csv", Cursor::new("header\n")));
        assert!(lines.is_empty());
        assert_eq!(result.unwrap().lines, 0);

        let (result, lines) = collect(LineStreamer::from_reader("e.csv", Cursor::new("")));
        assert!(lines.is_empty());
        assert!(result.unwrap().exhausted);
    }

    #[test]
    fn test_crlf_line_endings_stripped() {
        let (_, lines) = collect(LineStreamer::from_reader(
            "crlf.csv",
            Cursor::new("header\r\nx,1\r\ny,2\r\n"),
        ));
        assert_eq!(lines, vec!["x,1", "y,2"]);
    }

    #[test]
    fn test_read_fault_is_reported() {
        let reader = BufReader::new(FailingReader::new(b"header\nline one\n"));
        let (result, lines) = collect(LineStreamer::from_reader("bad.csv", reader));
        assert_eq!(lines, vec!["line one"]);
        assert!(matches!(result, Err(TripsError::SourceRead { .. })));
    }

    #[test]
    fn test_invalid_utf8_line_is_forwarded() {
        let input = b"header\nx,1\nN,\xD1,2\r\ny,3\n".to_vec();
        let (result, lines) = collect(LineStreamer::from_reader("latin.csv", Cursor::new(input)));
        assert_eq!(lines, vec!["x,1", "N,\u{FFFD},2", "y,3"]);
        assert_eq!(result.unwrap().lines, 3);
    }

    #[test]
    fn test_non_utf8_header_is_skipped() {
        let input = b"Vendor\xFFID,pickup\nx,1\n".to_vec();
        let (result, lines) = collect(LineStreamer::from_reader("h.csv", Cursor::new(input)));
        assert_eq!(lines, vec!["x,1"]);
        assert!(result.unwrap().exhausted);
    }

    #[test]
    fn test_stops_when_receivers_gone() {
        let (tx, rx) = bounded(0);
        drop(rx);
        let streamer = LineStreamer::from_reader("x.csv", Cursor::new("h\n1\n2\n"));
        let summary = streamer.run(tx).unwrap();
        assert_eq!(summary.lines, 0);
        assert!(!summary.exhausted);
    }
}
