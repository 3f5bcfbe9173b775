//! Theme discovery
//!
//! Themes are plain `.css` files. Presenter and overlay themes each come from
//! two folders: the bundled one shipped with the application and the user's
//! own, whose files shadow bundled ones of the same name.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::paths::AppPaths;
use crate::Result;

const THEME_EXTENSION: &str = "css";
const EXAMPLE_TEMPLATE: &str = "Example.template";
const EXAMPLE_THEME: &str = "Example.css";

/// Which display a theme styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Presenter,
    Overlay,
}

impl ThemeKind {
    /// Bundled folder, then user folder
    pub fn folders(&self, paths: &AppPaths) -> [PathBuf; 2] {
        match self {
            Self::Presenter => [paths.bundled_presenter_themes_dir(), paths.user_presenter_themes_dir.clone()],
            Self::Overlay => [paths.bundled_overlay_themes_dir(), paths.user_overlay_themes_dir.clone()],
        }
    }
}

fn css_names(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(THEME_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    Ok(names)
}

/// Sorted, de-duplicated theme names found in `folders`.
///
/// Missing or unreadable folders contribute nothing.
pub fn theme_names(folders: &[PathBuf]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for folder in folders {
        match css_names(folder) {
            Ok(found) => names.extend(found),
            Err(e) => tracing::debug!("Unable to list themes in {}: {}", folder.display(), e),
        }
    }
    names.into_iter().collect()
}

/// Theme names of one kind
pub fn list_themes(paths: &AppPaths, kind: ThemeKind) -> Vec<String> {
    theme_names(&kind.folders(paths))
}

/// Copy the bundled example template into each user theme folder as a
/// starting point for custom themes.
pub fn copy_example_themes(paths: &AppPaths) {
    for kind in [ThemeKind::Presenter, ThemeKind::Overlay] {
        let [bundled, user] = kind.folders(paths);
        let template = bundled.join(EXAMPLE_TEMPLATE);
        if !template.is_file() {
            continue;
        }
        if let Err(e) = std::fs::copy(&template, user.join(EXAMPLE_THEME)) {
            tracing::warn!("Unable to copy example {:?} theme: {}", kind, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;

    #[test]
    fn test_theme_names_are_sorted_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("bundled");
        let user = dir.path().join("user");
        fs::create_dir_all(&bundled).unwrap();
        fs::create_dir_all(&user).unwrap();

        fs::write(bundled.join("Night.css"), "").unwrap();
        fs::write(bundled.join("Day.css"), "").unwrap();
        fs::write(bundled.join("notes.txt"), "").unwrap();
        fs::write(user.join("Night.css"), "").unwrap();
        fs::write(user.join("Custom.css"), "").unwrap();

        let names = theme_names(&[bundled, user, dir.path().join("missing")]);
        assert_eq!(names, vec!["Custom", "Day", "Night"]);
    }

    #[test]
    fn test_example_theme_is_copied_for_users() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path().to_path_buf(), Utc::now());
        paths.ensure_app_folders().unwrap();
        fs::create_dir_all(paths.bundled_overlay_themes_dir()).unwrap();
        fs::write(paths.bundled_overlay_themes_dir().join(EXAMPLE_TEMPLATE), "body {}").unwrap();

        copy_example_themes(&paths);

        assert_eq!(list_themes(&paths, ThemeKind::Overlay), vec!["Example"]);
        assert!(list_themes(&paths, ThemeKind::Presenter).is_empty());
    }
}
