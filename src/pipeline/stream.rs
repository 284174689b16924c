/// Append-only JSONL output
///
/// The file is truncated once at the start of a run. Every accepted record is
/// flushed as soon as it is written, so an interrupted run keeps what it has.
use crate::config::types::{Result, VerifyError};
use crate::record::types::Record;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct StreamWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: u64,
}

impl StreamWriter {
    /// Create (or truncate) the output file, creating parent directories first
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                VerifyError::fatal(format!("Failed to create output directory {}", parent.display()), e)
            })?;
        }

        let file = File::create(&path).map_err(|e| {
            VerifyError::fatal(format!("Failed to create output file {}", path.display()), e)
        })?;

        Ok(StreamWriter {
            path,
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let line = record.to_line()?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
