/// Integration tests for FASTA parsing and writing
use cladeflow_bio::formats::fasta::{parse_fasta, write_fasta, FastaFile, FastaReadable, FastaReader};
use cladeflow_core::FastaRecord;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_fasta_round_trip() {
    let records = vec![
        FastaRecord::new(0, "seq1 Test DNA sequence", "ATGCATGCATGC"),
        FastaRecord::new(1, "seq2", "ATGCNNNATGC"),
        FastaRecord::new(2, "seq3|with|pipes", "A-C-G"),
    ];

    let temp_file = NamedTempFile::new().unwrap();
    write_fasta(File::create(temp_file.path()).unwrap(), &records).unwrap();

    let parsed = parse_fasta(temp_file.path()).unwrap();
    assert_eq!(parsed, records);
}

#[test]
fn test_gzip_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.fasta.gz");

    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    writeln!(encoder, ">a\nACGT\n>b\nTTTT").unwrap();
    encoder.finish().unwrap();

    let parsed = parse_fasta(&path).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[1].seq, "TTTT");
}

#[test]
fn test_streaming_large_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    for i in 0..1000 {
        writeln!(temp_file, ">seq_{}", i).unwrap();
        writeln!(temp_file, "ATGCATGCAT").unwrap();
        writeln!(temp_file, "GCATGCATGC").unwrap();
    }
    temp_file.flush().unwrap();

    let reader = FastaReader::new(FastaFile::open_for_reading(temp_file.path()).unwrap());
    let mut count = 0;
    for (i, record) in reader.enumerate() {
        let record = record.unwrap();
        assert_eq!(record.index, i);
        assert_eq!(record.seq_name, format!("seq_{}", i));
        assert_eq!(record.seq.len(), 20);
        count += 1;
    }
    assert_eq!(count, 1000);
}

#[test]
fn test_missing_file_reports_path() {
    let err = parse_fasta("/nonexistent/input.fasta").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/input.fasta"));
}
