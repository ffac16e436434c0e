use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Newline-delimited JSON written to a file or stdout
pub struct NdjsonWriter {
    inner: BufWriter<Box<dyn Write + Send>>,
    written: usize,
}

impl NdjsonWriter {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let sink: Box<dyn Write + Send> = match path {
            Some(path) => Box::new(
                File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
            ),
            None => Box::new(io::stdout()),
        };
        Ok(Self {
            inner: BufWriter::new(sink),
            written: 0,
        })
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.inner, value)?;
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
