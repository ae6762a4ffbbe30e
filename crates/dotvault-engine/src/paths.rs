//! Home-relative path helpers

use chrono::Local;
use dotvault_types::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// The current user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::config("Unable to determine the home directory"))
}

/// Replace a leading `~` with `home`
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Replace a leading `home` with `~`
pub fn contract_home(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", to_posix(rest)),
        Err(_) => path.display().to_string(),
    }
}

/// POSIX-style path of `path` below `home`
///
/// `~/.config/nvim/init.vim` becomes `.config/nvim/init.vim`.
pub fn relative_from_home(path: &Path, home: &Path) -> Result<String> {
    path.strip_prefix(home)
        .map(to_posix)
        .map_err(|_| Error::outside_home(path))
}

/// Join the normal components of a relative path with `/`
pub fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the final component starts with a dot
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name.len() > 1)
}

/// `<prefix>_<YYYYMMDD_HHmmss>` in local time
pub fn timestamped_folder_name(prefix: &str) -> String {
    format!("{}_{}", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}
