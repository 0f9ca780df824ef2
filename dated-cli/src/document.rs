//! Source documents: the expensive resource the CLI caches.

use std::io;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use dated_core::ResourceUsage;

/// A source file loaded into memory with a line index.
#[derive(Debug)]
pub struct SourceDocument {
    path: PathBuf,
    text: String,
    line_starts: Vec<usize>,
    revision: u32,
}

impl SourceDocument {
    /// Reads and indexes `path`.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path)?;
        let line_starts = index_lines(&text);
        Ok(Self {
            path,
            text,
            line_starts,
            revision: 1,
        })
    }

    /// Re-reads the file in place and bumps the revision.
    ///
    /// On error the previous contents are kept.
    pub fn reload(&mut self) -> io::Result<()> {
        let text = std::fs::read_to_string(&self.path)?;
        self.line_starts = index_lines(&text);
        self.text = text;
        self.revision = self.revision.saturating_add(1);
        Ok(())
    }

    /// Path the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the document has been read.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.line_starts.len()
        }
    }

    /// Returns line `n` (1-based) without its terminator.
    pub fn line(&self, n: usize) -> Option<&str> {
        if n == 0 || n > self.line_count() {
            return None;
        }
        let start = self.line_starts[n - 1];
        let end = self.line_starts.get(n).copied().unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(&['\n', '\r'][..]))
    }
}

impl ResourceUsage for SourceDocument {
    fn memory_usage(&self) -> u64 {
        (size_of::<Self>()
            + self.text.capacity()
            + self.line_starts.capacity() * size_of::<usize>()
            + self.path.as_os_str().len()) as u64
    }
}

fn index_lines(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|&(_, c)| c == '\n')
            .map(|(i, _)| i + 1)
            .filter(|&i| i < text.len()),
    );
    starts
}
