use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::record::{Decoded, Decoder};
use crate::types::Header;

/// Iterates over the decoded records of an uncompressed VCF stream.
///
/// The header is read eagerly on construction; records are decoded one line at a time.
pub struct VcfRecords<R: BufRead> {
    decoder: Decoder,
    line_number: usize,
    buf: String,
    inner: R,
}

impl<R: BufRead> VcfRecords<R> {
    pub fn header(&self) -> &Header {
        self.decoder.header()
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}

impl VcfRecords<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> VcfRecords<R> {
    /// Reads header lines up to and including the `#CHROM` line.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut lines = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                break;
            }
            let line = buf.trim_end_matches(|c: char| c == '\n' || c == '\r');
            if !line.starts_with('#') {
                anyhow::bail!("expected a header line, found {:?}", line);
            }
            lines.push(line.to_owned());
            if !line.starts_with("##") {
                break;
            }
        }

        let header = Header::from_lines(&lines);
        debug!(
            n_info = header.info().len(),
            n_format = header.format().len(),
            n_samples = header.samples().len(),
            n_issues = header.issues().len(),
            "read header"
        );
        Ok(Self {
            decoder: Decoder::from_header(header),
            line_number: lines.len(),
            buf,
            inner: reader,
        })
    }
}

impl<R: BufRead> Iterator for VcfRecords<R> {
    type Item = Result<Decoded>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;
            if self.buf.trim().is_empty() {
                continue;
            }
            let line_number = self.line_number;
            return Some(
                self.decoder
                    .decode(&self.buf)
                    .with_context(|| format!("failed to decode line {}", line_number)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_from_memory() {
        let vcf = "##fileformat=VCFv4.2\n\
                   ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
                   #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
                   1\t10\t.\tA\tC\t.\tPASS\tDP=3\n\
                   \n\
                   1\t20\t.\tA\n";
        let mut records = VcfRecords::new(Cursor::new(vcf)).unwrap();
        assert_eq!(records.header().file_format().as_deref(), Some("VCFv4.2"));
        assert!(records.header().samples().is_empty());

        let first = records.next().unwrap().unwrap();
        assert_eq!(*first.record.pos(), 10);

        let second = records.next().unwrap();
        let message = format!("{:#}", second.unwrap_err());
        assert!(message.starts_with("failed to decode line 6"), "{}", message);

        assert!(records.next().is_none());
    }

    #[test]
    fn test_missing_header() {
        assert!(VcfRecords::new(Cursor::new("1\t10\t.\tA\tC\t.\tPASS\t.\n")).is_err());
    }
}
