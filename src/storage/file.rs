//! Atomic file replacement
//!
//! Shards and the catalog are never written in place: the new content goes
//! to a sibling temp file which is then renamed over the old one, so a crash
//! leaves either the old or the new file intact.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;

/// Replace `path` with `bytes` via write-new-then-rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], sync: bool) -> Result<()> {
    let tmp_path = path.with_extension("tmp");

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(bytes)?;
    if sync {
        file.sync_all()?;
    }
    drop(file);

    fs::rename(&tmp_path, path)?;

    // Make the rename itself durable
    if sync {
        if let Some(dir) = path.parent() {
            if let Err(e) = sync_dir(dir) {
                tracing::warn!("Failed to sync directory {}: {}", dir.display(), e);
            }
        }
    }

    Ok(())
}

fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
