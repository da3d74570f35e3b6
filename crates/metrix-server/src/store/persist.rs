//! Snapshot file: newline-delimited JSON, one metric per line.
//!
//! Every save truncates and rewrites the whole file. A crash mid-write can
//! leave a torn last line, so reading skips undecodable lines instead of
//! failing.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use metrix_core::error::Result;
use metrix_core::Metric;

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(&self) -> std::io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        opts.open(&self.path)
    }

    /// Truncate and write all records. A record that fails to encode is
    /// logged and skipped; open/write failures abort. Returns lines written.
    pub fn write<'a>(&self, metrics: impl IntoIterator<Item = &'a Metric>) -> Result<usize> {
        let file = self.create().map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "open snapshot for write failed");
            e
        })?;

        let mut w = BufWriter::new(file);
        let mut written = 0;
        for metric in metrics {
            let line = match serde_json::to_vec(metric) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(metric = %metric, error = %e, "skipping unencodable metric");
                    continue;
                }
            };
            w.write_all(&line)?;
            w.write_all(b"\n")?;
            written += 1;
        }
        w.flush()?;

        tracing::debug!(path = %self.path.display(), written, "snapshot saved");
        Ok(written)
    }

    /// Decode every line; blank lines are ignored, malformed ones are logged
    /// and skipped. Fails only if the file cannot be opened or read.
    pub fn read(&self) -> Result<Vec<Metric>> {
        let file = File::open(&self.path).map_err(|e| {
            tracing::debug!(path = %self.path.display(), error = %e, "open snapshot for read failed");
            e
        })?;

        let mut out = Vec::new();
        for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            let line = trim_ascii(&line);
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<Metric>(line) {
                Ok(metric) => out.push(metric),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = idx + 1, error = %e, "skipping malformed snapshot line");
                }
            }
        }
        Ok(out)
    }
}

fn trim_ascii(mut s: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = s {
        if !first.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    while let [rest @ .., last] = s {
        if !last.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    s
}
