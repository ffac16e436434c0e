use cladeflow_core::{CladeError, CladeResult, FastaRecord};
use flate2::read::MultiGzDecoder;
use nom::{
    bytes::complete::tag,
    character::complete::{not_line_ending, space0},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Parse a FASTA header line; the name is everything after `>`.
fn parse_header(input: &str) -> IResult<&str, &str> {
    let (input, name) = preceded(tag(">"), preceded(space0, not_line_ending))(input)?;
    Ok((input, name.trim_end()))
}

/// Streaming FASTA reader.
///
/// Records are produced one at a time with an incrementing `index`, so memory
/// use is bounded by the longest record rather than the whole input.
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: String,
    pending_header: Option<String>,
    index: usize,
    line_no: usize,
    started: bool,
    finished: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            pending_header: None,
            index: 0,
            line_no: 0,
            started: false,
            finished: false,
        }
    }

    fn read_line(&mut self) -> CladeResult<bool> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n > 0)
    }

    fn header_from_line(&self) -> CladeResult<String> {
        parse_header(&self.line)
            .map(|(_, name)| name.to_string())
            .map_err(|e| {
                CladeError::Parse(format!("Invalid FASTA header at line {}: {}", self.line_no, e))
            })
    }

    /// Skip leading blank lines and demand that the first content is a header.
    fn find_first_header(&mut self) -> CladeResult<Option<String>> {
        while self.read_line()? {
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with('>') {
                return Err(CladeError::Parse(format!(
                    "Expected FASTA header at line {}, found sequence data",
                    self.line_no
                )));
            }
            return self.header_from_line().map(Some);
        }
        Ok(None)
    }

    fn next_record(&mut self) -> CladeResult<Option<FastaRecord>> {
        let header = match self.pending_header.take() {
            Some(header) => header,
            None if !self.started => {
                self.started = true;
                match self.find_first_header()? {
                    Some(header) => header,
                    None => return Ok(None),
                }
            }
            None => return Ok(None),
        };

        let mut seq = String::new();
        while self.read_line()? {
            if self.line.starts_with('>') {
                self.pending_header = Some(self.header_from_line()?);
                break;
            }
            seq.extend(
                self.line
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| c.to_ascii_uppercase()),
            );
        }

        let record = FastaRecord::new(self.index, header, seq);
        self.index += 1;
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = CladeResult<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse FASTA held in memory.
pub fn parse_fasta_str(text: &str) -> CladeResult<Vec<FastaRecord>> {
    FastaReader::new(text.as_bytes()).collect()
}

/// Parse a whole FASTA file, gzip or plain.
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> CladeResult<Vec<FastaRecord>> {
    FastaReader::new(FastaFile::open_for_reading(path)?).collect()
}

pub fn write_fasta<W: Write>(mut writer: W, records: &[FastaRecord]) -> CladeResult<()> {
    for record in records {
        writeln!(writer, ">{}", record.seq_name)?;
        for chunk in record.seq.as_bytes().chunks(80) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Trait representing the capability to read FASTA files with automatic compression detection
pub trait FastaReadable {
    /// Open a FASTA file for reading, automatically detecting compression
    fn open_for_reading<P: AsRef<Path>>(path: P) -> CladeResult<Box<dyn BufRead + Send>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            CladeError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;

        if path.extension().and_then(|s| s.to_str()) == Some("gz") {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Zero-sized type that implements FastaReadable
pub struct FastaFile;

impl FastaReadable for FastaFile {}
