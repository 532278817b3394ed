use std::fs::create_dir_all;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::Result;
use crate::StorageError;

/// Atomically write `bytes` to `dir/rel`.
///
/// The bytes go to a temporary file in the destination directory first and
/// are renamed into place, so readers never observe a partial entry and a
/// failed write leaves neither a partial file nor a stray temp file behind
/// (the temp file is removed on drop).
pub(crate) fn write_entry_atomic(
    dir: &Path,
    rel: &Path,
    bytes: &[u8],
) -> Result<()> {
    create_dir_all(dir).map_err(StorageError::IoError)?;

    let dest = dir.join(rel);
    let mut tmp = NamedTempFile::new_in(dir).map_err(StorageError::IoError)?;
    tmp.write_all(bytes).map_err(StorageError::IoError)?;
    tmp.as_file().sync_all().map_err(StorageError::IoError)?;
    tmp.persist(&dest).map_err(|e| StorageError::PersistFailed {
        path: dest.clone(),
        source: e.error,
    })?;

    Ok(())
}
