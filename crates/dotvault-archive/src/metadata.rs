//! File metadata carried through backups
//!
//! Mode bits are the low twelve POSIX bits (`0o7777`). On platforms without
//! POSIX permissions no mode is read and applying one is a no-op.

use dotvault_types::{Error, Result};
use filetime::FileTime;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// Mode written into tar headers when permissions are not preserved
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mask selecting permission, setuid, setgid and sticky bits
pub const MODE_MASK: u32 = 0o7777;

/// Read the permission bits of a file
#[cfg(unix)]
pub fn permission_bits(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & MODE_MASK)
}

/// Read the permission bits of a file
#[cfg(not(unix))]
pub fn permission_bits(_metadata: &Metadata) -> Option<u32> {
    None
}

/// Apply permission bits to a written file
#[cfg(unix)]
pub fn apply_permission_bits(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & MODE_MASK))
        .map_err(|e| Error::io_at(path, e))
}

/// Apply permission bits to a written file
#[cfg(not(unix))]
pub fn apply_permission_bits(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Set the modification time of a written file
pub fn apply_modified(path: &Path, modified: SystemTime) -> Result<()> {
    filetime::set_file_mtime(path, FileTime::from_system_time(modified))
        .map_err(|e| Error::io_at(path, e))
}

/// Unlink whatever non-directory occupies `path`
///
/// The next write then creates a fresh file instead of writing through a
/// symlink or into a read-only file. A file still open for reading keeps
/// its content.
pub fn clear_target(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => {
            std::fs::remove_file(path).map_err(|e| Error::io_at(path, e))
        }
        _ => Ok(()),
    }
}

/// Seconds since the Unix epoch, 0 for times before it
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
