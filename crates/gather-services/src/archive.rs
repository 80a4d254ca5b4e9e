use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Reduce a client-supplied filename to its base name so it cannot escape
/// the entry's folder.
pub fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// In-memory ZIP archive with running entry and byte counts.
pub struct ZipArchiveBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
    entries: usize,
    total_bytes: u64,
}

impl ZipArchiveBuilder {
    pub fn new() -> Self {
        let modified =
            zip::DateTime::try_from(time::OffsetDateTime::now_utc()).unwrap_or_default();
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644)
            .last_modified_time(modified);

        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options,
            entries: 0,
            total_bytes: 0,
        }
    }

    pub fn add_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.zip
            .start_file(path, self.options)
            .with_context(|| format!("Failed to add file to ZIP: {}", path))?;
        self.zip
            .write_all(data)
            .with_context(|| format!("Failed to write file data to ZIP: {}", path))?;

        self.entries += 1;
        self.total_bytes += data.len() as u64;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Sum of uncompressed entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn finish(mut self) -> Result<Vec<u8>> {
        let cursor = self.zip.finish().context("Failed to finalize ZIP archive")?;
        Ok(cursor.into_inner())
    }
}

impl Default for ZipArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
