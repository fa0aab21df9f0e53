//! Whole-buffer load and save.
//!
//! The file is the table buffer itself: `num_rows` encoded rows back to
//! back, with no header, padding or checksum.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::table::Table;

pub fn load(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Overwrites `path` with `bytes`. A failed write may leave a partial file.
pub fn save(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    Ok(())
}

/// Loads the table stored at `path`, or an empty one when the file cannot
/// be read.
pub fn open_table(path: &Path) -> Table {
    match load(path) {
        Ok(bytes) => {
            let table = Table::from_bytes(bytes);
            info!(path = %path.display(), rows = table.len(), "loaded table");
            table
        }
        Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no database file, starting empty");
            Table::new()
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to read database file, starting empty"
            );
            Table::new()
        }
    }
}

pub fn flush_table(path: &Path, table: &Table) -> Result<()> {
    save(path, table.as_bytes())?;
    info!(path = %path.display(), rows = table.len(), "saved table");
    Ok(())
}
