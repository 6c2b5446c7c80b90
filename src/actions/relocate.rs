//! Relocating misplaced files.
//!
//! A move never overwrites: the target must not exist. Parents are created as
//! needed. Across filesystems, where `rename` cannot work, the file is copied
//! and the source removed only after the copy succeeded.

use std::fs;
use std::io;
use std::path::Path;

use super::delete::FileSnapshot;
use super::ActionError;

/// Move `expected.path` to `target` after verifying it is unchanged.
///
/// Returns the number of bytes moved.
///
/// # Errors
///
/// - `Modified` if the source changed since it was indexed
/// - `TargetExists` if something already occupies `target`
/// - `Io` for directory creation, rename or copy failures
pub fn move_verified(expected: &FileSnapshot, target: &Path) -> Result<u64, ActionError> {
    expected.verify()?;
    move_file(&expected.path, target)
}

/// Move `source` to `target` without overwriting.
///
/// # Errors
///
/// See [`move_verified`].
pub fn move_file(source: &Path, target: &Path) -> Result<u64, ActionError> {
    if target.symlink_metadata().is_ok() {
        return Err(ActionError::TargetExists(target.to_path_buf()));
    }
    // A missing source must not leave target directories behind.
    let size = fs::symlink_metadata(source)
        .map_err(|e| ActionError::from_io(source, e))?
        .len();
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ActionError::from_io(parent, e))?;
    }

    match fs::rename(source, target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!(
                "Rename across devices, copying {} -> {}",
                source.display(),
                target.display()
            );
            copy_then_remove(source, target)?;
        }
        Err(e) => return Err(ActionError::from_io(source, e)),
    }

    log::info!("Moved: {} -> {}", source.display(), target.display());
    Ok(size)
}

fn copy_then_remove(source: &Path, target: &Path) -> Result<(), ActionError> {
    fs::copy(source, target).map_err(|e| ActionError::from_io(target, e))?;
    if let Err(e) = fs::remove_file(source) {
        // Leave the tree as it was: one copy, at the source.
        let _ = fs::remove_file(target);
        return Err(ActionError::from_io(source, e));
    }
    Ok(())
}
