use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;

/// What is being captured; decides the default file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    fn prefix(self) -> &'static str {
        match self {
            MediaKind::Photo => "IMG_",
            MediaKind::Video => "VID_",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            MediaKind::Photo => ".jpg",
            MediaKind::Video => ".mp4",
        }
    }
}

/// Where and under what name captured media is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreMediaOptions {
    /// Subdirectory under the media root; a single path segment, no leading
    /// separator.
    pub directory: Option<String>,
    /// File name; defaulted from the kind and capture time when empty.
    pub name: Option<String>,
}

impl StoreMediaOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(dir) = &self.directory {
            let path = Path::new(dir);
            if path.is_absolute() {
                return Err(Error::InvalidArgument(
                    "media directory must be relative".into(),
                ));
            }
            if path.components().count() > 1 {
                return Err(Error::InvalidArgument(
                    "media directory must be a single path segment".into(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the output path under `root`, creating a default timestamped
    /// name when none was given and de-colliding an existing name with a
    /// random suffix.
    pub fn output_path(
        &self,
        root: &Path,
        kind: MediaKind,
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf, Error> {
        self.validate()?;

        let dir = match &self.directory {
            Some(d) if !d.is_empty() => root.join(d),
            _ => root.to_path_buf(),
        };

        let name = match &self.name {
            Some(n) if !n.is_empty() => n.clone(),
            _ => format!(
                "{}{}{}",
                kind.prefix(),
                captured_at.format("%Y%m%d_%H%M%S"),
                kind.extension()
            ),
        };

        let candidate = dir.join(&name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        // Keep the extension, tack a unique suffix onto the stem.
        let path = Path::new(&name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(&name);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        Ok(dir.join(format!("{stem}_{}{ext}", Uuid::new_v4().simple())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn rooted_directories_are_rejected() {
        let options = StoreMediaOptions { directory: Some("/dcim".into()), name: None };
        assert!(matches!(options.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn multi_level_directories_are_rejected() {
        let options = StoreMediaOptions { directory: Some("a/b".into()), name: None };
        assert!(matches!(options.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn default_names_carry_kind_prefix_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreMediaOptions::default();
        let photo = options.output_path(dir.path(), MediaKind::Photo, noon()).unwrap();
        assert_eq!(
            photo.file_name().unwrap().to_str().unwrap(),
            "IMG_20260314_120000.jpg"
        );
        let video = options.output_path(dir.path(), MediaKind::Video, noon()).unwrap();
        assert_eq!(
            video.file_name().unwrap().to_str().unwrap(),
            "VID_20260314_120000.mp4"
        );
    }

    #[test]
    fn explicit_names_land_in_the_requested_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreMediaOptions {
            directory: Some("trip".into()),
            name: Some("sunrise.jpg".into()),
        };
        let path = options.output_path(dir.path(), MediaKind::Photo, noon()).unwrap();
        assert_eq!(path, dir.path().join("trip").join("sunrise.jpg"));
    }

    #[test]
    fn existing_names_get_a_unique_suffix_with_the_extension_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sunrise.jpg"), b"taken").unwrap();

        let options = StoreMediaOptions { directory: None, name: Some("sunrise.jpg".into()) };
        let a = options.output_path(dir.path(), MediaKind::Photo, noon()).unwrap();
        let b = options.output_path(dir.path(), MediaKind::Photo, noon()).unwrap();

        assert_ne!(a, dir.path().join("sunrise.jpg"));
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("sunrise_"));
        assert!(name.ends_with(".jpg"));
    }
}
