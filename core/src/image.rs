use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::Result;

/// Shown wherever a meal has no image of its own.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://api.placeholder.com/400/300";

/// Where a meal's picture lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Remote(String),
    Local(PathBuf),
    Placeholder,
}

impl ImageRef {
    #[must_use]
    pub fn from_reference(reference: Option<&str>) -> Self {
        match reference.map(str::trim) {
            None | Some("") => Self::Placeholder,
            Some(r) if r.starts_with("http://") || r.starts_with("https://") => {
                Self::Remote(r.to_string())
            }
            Some(r) => Self::Local(PathBuf::from(r)),
        }
    }

    /// A string a presentation layer can hand to an image widget.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Local(path) => path.display().to_string(),
            Self::Placeholder => PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }

    /// The relative path of a local image with `.` segments dropped, so two
    /// spellings of the same file compare equal. `None` for remote and
    /// placeholder images, absolute paths, and paths that climb out with `..`.
    #[must_use]
    pub fn contained_path(&self) -> Option<PathBuf> {
        let Self::Local(path) = self else {
            return None;
        };
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        (!out.as_os_str().is_empty()).then_some(out)
    }

    /// The file this image occupies under `root`, if it lives there at all.
    #[must_use]
    pub fn resolve_under(&self, root: &Path) -> Option<PathBuf> {
        self.contained_path().map(|relative| root.join(relative))
    }
}

/// Remove a local image file. A file that is already gone is not an error.
///
/// Returns whether a file was actually removed.
pub fn release_file(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "released meal image");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "meal image already absent");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_references() {
        assert_eq!(ImageRef::from_reference(None), ImageRef::Placeholder);
        assert_eq!(ImageRef::from_reference(Some("  ")), ImageRef::Placeholder);
        assert_eq!(
            ImageRef::from_reference(Some("https://cdn.example.com/a.jpg")),
            ImageRef::Remote("https://cdn.example.com/a.jpg".into())
        );
        assert_eq!(
            ImageRef::from_reference(Some("images/meal_1.jpg")),
            ImageRef::Local(PathBuf::from("images/meal_1.jpg"))
        );
    }

    #[test]
    fn test_display_placeholder() {
        assert_eq!(ImageRef::Placeholder.display(), PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn test_resolve_under_root() {
        let img = ImageRef::Local(PathBuf::from("images/a.png"));
        assert_eq!(
            img.resolve_under(Path::new("/data")),
            Some(PathBuf::from("/data/images/a.png"))
        );
        assert_eq!(
            ImageRef::Remote("https://x/y".into()).resolve_under(Path::new("/data")),
            None
        );
        assert_eq!(ImageRef::Placeholder.resolve_under(Path::new("/data")), None);
    }

    #[test]
    fn test_contained_path_normalizes_current_dir() {
        let plain = ImageRef::Local(PathBuf::from("images/a.jpg"));
        let dotted = ImageRef::Local(PathBuf::from("./images/./a.jpg"));
        assert_eq!(plain.contained_path(), dotted.contained_path());
        assert_eq!(plain.contained_path(), Some(PathBuf::from("images/a.jpg")));
    }

    #[test]
    fn test_contained_path_rejects_escapes() {
        for reference in ["/etc/passwd", "../outside.jpg", "images/../../x.jpg", "."] {
            let img = ImageRef::Local(PathBuf::from(reference));
            assert_eq!(img.contained_path(), None, "{reference}");
        }
    }

    #[test]
    fn test_release_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meal.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        assert!(release_file(&path).unwrap());
        assert!(!path.exists());
        // Second release is a no-op
        assert!(!release_file(&path).unwrap());
    }
}
