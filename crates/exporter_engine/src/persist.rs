use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` when missing and checks that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Archive being written into a temp file next to its final location.
///
/// Nothing appears under the final name until [`ArchiveFile::commit`];
/// dropping an uncommitted file removes the temp file.
pub struct ArchiveFile {
    dir: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl ArchiveFile {
    pub fn create_in(dir: &Path) -> Result<Self, PersistError> {
        ensure_output_dir(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            writer: BufWriter::new(tmp),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Flushes, syncs and renames the archive to `{dir}/{file_name}`.
    pub fn commit(self, file_name: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(file_name);
        let mut tmp = self.writer.into_inner().map_err(|e| PersistError::Io(e.into_error()))?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

impl Write for ArchiveFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
