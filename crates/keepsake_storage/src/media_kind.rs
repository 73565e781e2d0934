//! Media kind detection.

use std::path::Path;

/// Kind of media file, as far as compression is concerned.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    derive_more::Display,
)]
pub enum MediaKind {
    /// Still images (JPEG, PNG, WebP, HEIC, ...)
    #[display("image")]
    Image,
    /// Video (MP4, MOV, MKV, ...)
    #[display("video")]
    Video,
}

impl MediaKind {
    /// Detect the kind from the file extension, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use keepsake_storage::MediaKind;
    /// use std::path::Path;
    ///
    /// assert_eq!(MediaKind::from_path(Path::new("IMG_0001.JPG")), Some(MediaKind::Image));
    /// assert_eq!(MediaKind::from_path(Path::new("clip.mov")), Some(MediaKind::Video));
    /// assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<MediaKind> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "heic" | "heif" | "tif" | "tiff" | "bmp" => {
                Some(MediaKind::Image)
            }
            "mp4" | "mov" | "m4v" | "mkv" | "avi" | "webm" | "3gp" => Some(MediaKind::Video),
            _ => None,
        }
    }
}
