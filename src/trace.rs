use std::fs::File;
use std::io::{self, prelude::*, BufReader};
use std::path::Path;

use crate::memory::addr::Operation;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected `R:<hex address>` or `W:<hex address>`, found {text:?}")]
    Malformed { line: usize, text: String },
    #[error("line {line}: {text:?} is not a 32-bit hex address")]
    BadAddress { line: usize, text: String },
}

/// An input event to the memory simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Read(u32),
    Write(u32),
}

impl TraceEvent {
    pub fn addr(&self) -> u32 {
        match *self {
            TraceEvent::Read(addr) | TraceEvent::Write(addr) => addr,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            TraceEvent::Read(_) => Operation::Load,
            TraceEvent::Write(_) => Operation::Store,
        }
    }

    /// Parses one `R:addr` / `W:addr` line. `line` is only used for error reporting.
    pub fn parse(text: &str, line: usize) -> Result<TraceEvent, TraceError> {
        let malformed = || TraceError::Malformed { line, text: text.to_owned() };

        let (access_type, access_addr) = text.split_once(':').ok_or_else(malformed)?;
        let access_addr = access_addr.trim();
        let digits = access_addr
            .strip_prefix("0x")
            .or_else(|| access_addr.strip_prefix("0X"))
            .unwrap_or(access_addr);
        let addr = u32::from_str_radix(digits, 16).map_err(|_| TraceError::BadAddress {
            line,
            text: access_addr.to_owned(),
        })?;

        match access_type.trim() {
            "R" | "r" => Ok(TraceEvent::Read(addr)),
            "W" | "w" => Ok(TraceEvent::Write(addr)),
            _ => Err(malformed()),
        }
    }
}

/// Reads a trace line by line, yielding a TraceEvent for every non-blank line.
/// Lines starting with `#` are comments.
pub struct TraceReader<R> {
    lines: io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        TraceReader { lines: reader.lines(), line_no: 0 }
    }
}

impl TraceReader<BufReader<File>> {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let file = File::open(path)?;
        Ok(TraceReader::new(BufReader::new(file)))
    }
}

impl<'a> TraceReader<io::StdinLock<'a>> {
    pub fn from_stdin(stdin_lock: io::StdinLock<'a>) -> Self {
        TraceReader::new(stdin_lock)
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceEvent, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.next()?;
            self.line_no += 1;
            let line = match next {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(TraceEvent::parse(line, self.line_no));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_reads_and_writes() {
        assert_eq!(TraceEvent::parse("R:0000abcd", 1).unwrap(), TraceEvent::Read(0xabcd));
        assert_eq!(TraceEvent::parse("w:0x10", 1).unwrap(), TraceEvent::Write(0x10));
        assert_eq!(TraceEvent::parse("W: FFFFFFFF", 1).unwrap(), TraceEvent::Write(u32::MAX));
        assert_eq!(TraceEvent::Write(0).operation(), Operation::Store);
        assert_eq!(TraceEvent::Read(0).operation(), Operation::Load);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            TraceEvent::parse("X:10", 4),
            Err(TraceError::Malformed { line: 4, .. })
        ));
        assert!(matches!(
            TraceEvent::parse("R 10", 2),
            Err(TraceError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            TraceEvent::parse("R:100000000", 9),
            Err(TraceError::BadAddress { line: 9, .. })
        ));
    }

    #[test]
    fn reader_skips_blank_and_comment_lines() {
        let input = "# warmup\nR:1000\n\nW:2004\n   \nr:3008\n";
        let events: Vec<_> = TraceReader::new(input.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            events,
            vec![TraceEvent::Read(0x1000), TraceEvent::Write(0x2004), TraceEvent::Read(0x3008)]
        );
    }

    #[test]
    fn reader_counts_physical_lines() {
        let input = "R:1\n\nQ:2\n";
        let mut reader = TraceReader::new(input.as_bytes());
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(TraceError::Malformed { line, .. })) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn unreadable_line_still_counts() {
        // invalid UTF-8 on line 2 fails the read but takes up a line
        let input: &[u8] = b"R:1\n\xFF\nQ:3\n";
        let mut reader = TraceReader::new(input);
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(TraceError::Io(_)))));
        match reader.next() {
            Some(Err(TraceError::Malformed { line, .. })) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}
