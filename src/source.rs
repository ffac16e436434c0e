//! Sequence sources feeding the orchestrators
//!
//! A source is any `Stream` of `CladeResult<FastaRecord>`. An `Err` item is
//! a source failure and ends the run; records after it are not read.

use cladeflow_bio::formats::{FastaFile, FastaReadable, FastaReader};
use cladeflow_core::{CladeError, CladeResult, FastaRecord};
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;

/// Records buffered between the reader thread and the orchestrator
const FILE_BUFFER: usize = 64;

pub type SequenceStream = BoxStream<'static, CladeResult<FastaRecord>>;

/// Stream a FASTA file (plain or `.gz`) from a blocking reader thread.
///
/// Must be called inside a Tokio runtime. The file is opened on the reader
/// thread; an open failure arrives as the first item. Dropping the stream
/// stops the reader at its next record.
pub fn from_fasta_file(path: impl Into<PathBuf>) -> SequenceStream {
    let path = path.into();
    let (tx, rx) = mpsc::channel::<CladeResult<FastaRecord>>(FILE_BUFFER);

    tokio::task::spawn_blocking(move || {
        let reader = match FastaFile::open_for_reading(&path) {
            Ok(reader) => reader,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        };
        let mut sent = 0usize;
        for record in FastaReader::new(reader) {
            let failed = record.is_err();
            if tx.blocking_send(record).is_err() {
                debug!("Stopped reading {} after {} records: consumer gone", path.display(), sent);
                return;
            }
            if failed {
                return;
            }
            sent += 1;
        }
        debug!("Read {} records from {}", sent, path.display());
    });

    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

/// Parse FASTA text held in memory.
pub fn from_fasta_str(text: impl Into<String>) -> SequenceStream {
    let text = text.into();
    let records: Vec<CladeResult<FastaRecord>> = FastaReader::new(text.as_bytes()).collect();
    stream::iter(records).boxed()
}

pub fn from_records(records: Vec<FastaRecord>) -> SequenceStream {
    stream::iter(records.into_iter().map(Ok)).boxed()
}

/// A source that fails immediately, handy where a source had to be built
/// from something that turned out to be unusable.
pub fn failed(error: CladeError) -> SequenceStream {
    stream::once(async move { Err(error) }).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cladeflow_bio::formats::write_fasta;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_from_str_keeps_order() {
        let source = from_fasta_str(">a\nACGT\n>b\nTTTT\n");
        let records: Vec<FastaRecord> = source.map(|r| r.unwrap()).collect().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].seq_name, "b");
    }

    #[tokio::test]
    async fn test_from_file_streams_records() {
        let records: Vec<FastaRecord> = (0..200)
            .map(|i| FastaRecord::new(i, format!("seq{}", i), "ACGT".repeat(30)))
            .collect();
        let file = NamedTempFile::new().unwrap();
        write_fasta(file.reopen().unwrap(), &records).unwrap();

        let read: Vec<FastaRecord> = from_fasta_file(file.path()).map(|r| r.unwrap()).collect().await;
        assert_eq!(read, records);
    }

    #[tokio::test]
    async fn test_missing_file_is_first_item() {
        let mut source = from_fasta_file("/nonexistent/input.fasta");
        assert!(matches!(source.next().await, Some(Err(CladeError::Io(_)))));
        assert!(source.next().await.is_none());
    }

    #[tokio::test]
    async fn test_parse_error_ends_stream() {
        let items: Vec<_> = from_fasta_str("garbage\n>a\nACGT\n").collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
