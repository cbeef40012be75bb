use chrono::Utc;
use tracing::debug;

use crate::error::Error;
use crate::media::{MediaFile, MediaKind, StoreMediaOptions};

/// What the picker is asking a source to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRequest {
    PickPhoto,
    PickVideo,
    Capture { kind: MediaKind, output: std::path::PathBuf },
}

/// The seam to the platform's camera and gallery.
pub trait MediaSource: Send + Sync {
    fn is_camera_available(&self) -> bool;
    fn photos_supported(&self) -> bool;
    fn videos_supported(&self) -> bool;
    /// Root directory captured media is stored under.
    fn media_root(&self) -> std::path::PathBuf;
    fn run(&self, request: &MediaRequest) -> Result<MediaFile, Error>;
}

/// Picks existing media or captures new media through a source, after the
/// capability checks the platform requires.
pub struct MediaPicker<S> {
    source: S,
}

impl<S: MediaSource> MediaPicker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn is_camera_available(&self) -> bool {
        self.source.is_camera_available()
    }

    pub fn photos_supported(&self) -> bool {
        self.source.photos_supported()
    }

    pub fn videos_supported(&self) -> bool {
        self.source.videos_supported()
    }

    pub fn pick_photo(&self) -> Result<MediaFile, Error> {
        if !self.source.photos_supported() {
            return Err(Error::Unavailable);
        }
        self.source.run(&MediaRequest::PickPhoto)
    }

    pub fn pick_video(&self) -> Result<MediaFile, Error> {
        if !self.source.videos_supported() {
            return Err(Error::Unavailable);
        }
        self.source.run(&MediaRequest::PickVideo)
    }

    pub fn take_photo(&self, options: &StoreMediaOptions) -> Result<MediaFile, Error> {
        self.capture(MediaKind::Photo, options)
    }

    pub fn take_video(&self, options: &StoreMediaOptions) -> Result<MediaFile, Error> {
        self.capture(MediaKind::Video, options)
    }

    fn capture(&self, kind: MediaKind, options: &StoreMediaOptions) -> Result<MediaFile, Error> {
        if !self.source.is_camera_available() {
            return Err(Error::Unavailable);
        }
        let supported = match kind {
            MediaKind::Photo => self.source.photos_supported(),
            MediaKind::Video => self.source.videos_supported(),
        };
        if !supported {
            return Err(Error::Unavailable);
        }

        let output = options.output_path(&self.source.media_root(), kind, Utc::now())?;
        debug!(output = %output.display(), "capturing media");
        self.source.run(&MediaRequest::Capture { kind, output })
    }
}
