//! Desktop actions requested by clients
//!
//! Folders and URLs are handed to the platform opener (`xdg-open`, `open`,
//! `explorer`), located on `PATH`. The child is not waited on.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{PresenterError, Result};

#[cfg(target_os = "macos")]
const OPENERS: &[&str] = &["open"];
#[cfg(target_os = "windows")]
const OPENERS: &[&str] = &["explorer"];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENERS: &[&str] = &["xdg-open", "gio", "open"];

/// Locate the platform opener
pub fn opener() -> Result<PathBuf> {
    OPENERS
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| PresenterError::Action {
            message: format!("no opener found on PATH (tried {})", OPENERS.join(", ")),
        })
}

fn launch(target: &OsStr) -> Result<()> {
    let opener = opener()?;
    let mut command = Command::new(&opener);
    // gio needs a subcommand
    if opener.file_stem() == Some(OsStr::new("gio")) {
        command.arg("open");
    }

    command
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| PresenterError::Action {
            message: format!("failed to run {}: {}", opener.display(), e),
        })?;
    Ok(())
}

/// Open a folder in the file manager.
pub fn open_folder(path: &Path) -> Result<()> {
    tracing::info!("Opening {}", path.display());
    launch(path.as_os_str())
}

/// Whether `url` is an absolute http(s) URL
pub fn is_web_url(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
                && !rest.is_empty()
                && !rest.starts_with('/')
        }
        None => false,
    }
}

/// Open a web page in the default browser. Anything but http(s) is refused.
pub fn open_external_url(url: &str) -> Result<()> {
    if !is_web_url(url) {
        return Err(PresenterError::Action {
            message: format!("refusing to open non-web URL '{}'", url),
        });
    }

    tracing::info!("Opening {}", url);
    launch(OsStr::new(url))
}
