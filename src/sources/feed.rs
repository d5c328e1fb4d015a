use crate::error::QuoteError;
use crate::types::QuoteRecord;
use csv::{DeserializeRecordsIntoIter, ReaderBuilder, Trim};
use std::io::{self, Read};

/// Drops everything up to and including the first newline, whatever it
/// holds, then passes bytes through untouched.
struct HeaderSkip<R> {
    inner: R,
    skipping: bool,
}

impl<R: Read> Read for HeaderSkip<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.skipping {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            if let Some(pos) = buf[..n].iter().position(|&b| b == b'\n') {
                self.skipping = false;
                let rest = n - pos - 1;
                if rest > 0 {
                    buf.copy_within(pos + 1..n, 0);
                    return Ok(rest);
                }
            }
        }
        self.inner.read(buf)
    }
}

/// Lazy `timestamp,side,price` records over any byte stream.
///
/// Ends when the underlying reader reports EOF, so a pipe that never
/// closes yields records forever.
pub struct CsvFeed<R: Read> {
    records: DeserializeRecordsIntoIter<HeaderSkip<R>, QuoteRecord>,
}

impl<R: Read> CsvFeed<R> {
    pub fn new(reader: R, delimiter: u8, skip_header: bool) -> Self {
        // Columns are positional; a header line is burned as raw bytes,
        // never parsed, so its field count does not matter.
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .trim(Trim::All)
            .from_reader(HeaderSkip {
                inner: reader,
                skipping: skip_header,
            });

        Self {
            records: reader.into_deserialize(),
        }
    }
}

impl<R: Read> Iterator for CsvFeed<R> {
    type Item = Result<QuoteRecord, QuoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|result| result.map_err(|e| QuoteError::InvalidInput(e.to_string())))
    }
}
