//! Tier-based recompression through ffmpeg.

use crate::MediaKind;
use async_trait::async_trait;
use keepsake_core::CompressionTier;
use keepsake_error::{
    CollaboratorError, CollaboratorErrorKind, KeepsakeResult, StorageError, StorageErrorKind,
};
use keepsake_interface::{CompressedMedia, Compressor};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Image quality and video CRF for each compression tier.
///
/// # Examples
///
/// ```
/// use keepsake_core::CompressionTier;
/// use keepsake_storage::CompressionProfile;
///
/// let profile = CompressionProfile::builder().heavy_crf(32u8).build().unwrap();
/// assert_eq!(profile.crf(CompressionTier::Heavy), 32);
/// assert_eq!(profile.crf(CompressionTier::Light), 26);
/// assert_eq!(profile.image_quality(CompressionTier::Medium), 75);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(default, setter(into))]
pub struct CompressionProfile {
    /// Image quality (1-100) for light compression
    light_quality: u8,
    /// Image quality (1-100) for medium compression
    medium_quality: u8,
    /// Image quality (1-100) for heavy compression
    heavy_quality: u8,
    /// Video CRF for light compression
    light_crf: u8,
    /// Video CRF for medium compression
    medium_crf: u8,
    /// Video CRF for heavy compression
    heavy_crf: u8,
}

impl Default for CompressionProfile {
    fn default() -> Self {
        Self {
            light_quality: 85,
            medium_quality: 75,
            heavy_quality: 65,
            light_crf: 26,
            medium_crf: 28,
            heavy_crf: 30,
        }
    }
}

impl CompressionProfile {
    /// Creates a new profile builder.
    pub fn builder() -> CompressionProfileBuilder {
        CompressionProfileBuilder::default()
    }

    /// Image quality for a tier.
    pub fn image_quality(&self, tier: CompressionTier) -> u8 {
        match tier {
            CompressionTier::Light => self.light_quality,
            CompressionTier::Medium => self.medium_quality,
            CompressionTier::Heavy => self.heavy_quality,
        }
    }

    /// Video CRF for a tier.
    pub fn crf(&self, tier: CompressionTier) -> u8 {
        match tier {
            CompressionTier::Light => self.light_crf,
            CompressionTier::Medium => self.medium_crf,
            CompressionTier::Heavy => self.heavy_crf,
        }
    }
}

/// Map a 1-100 quality onto ffmpeg's `-q:v` scale, where 2 is best and 31 worst.
pub(crate) fn qscale(quality: u8) -> u8 {
    let quality = u32::from(quality.clamp(1, 100));
    (2 + (100 - quality) * 29 / 100) as u8
}

/// ffmpeg arguments compressing `input` into `output`.
pub(crate) fn ffmpeg_args(
    input: &Path,
    output: &Path,
    kind: MediaKind,
    tier: CompressionTier,
    profile: &CompressionProfile,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(input.as_os_str().to_os_string());
    args.extend(["-map_metadata", "0"].iter().map(OsString::from));
    match kind {
        MediaKind::Image => {
            args.push("-q:v".into());
            args.push(qscale(profile.image_quality(tier)).to_string().into());
        }
        MediaKind::Video => {
            args.extend(
                ["-c:v", "libx264", "-preset", "medium", "-c:a", "copy", "-crf"]
                    .iter()
                    .map(OsString::from),
            );
            args.push(profile.crf(tier).to_string().into());
        }
    }
    args.push(output.as_os_str().to_os_string());
    args
}

/// Sibling path ffmpeg writes to before replacing the original.
///
/// Keeps the extension so ffmpeg picks the same container.
pub(crate) fn temp_output(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.keepsake-tmp.{}", stem, ext.to_string_lossy()),
        None => format!("{}.keepsake-tmp", stem),
    };
    path.with_file_name(name)
}

fn tool_error(message: String) -> keepsake_error::KeepsakeError {
    CollaboratorError::new(CollaboratorErrorKind::ToolError(message)).into()
}

/// Compressor that shells out to ffmpeg.
///
/// The compressed file replaces the original at the same path. When the
/// result is not smaller than the original, the original is kept and its
/// size reported unchanged.
#[derive(Debug, Clone)]
pub struct FfmpegCompressor {
    binary: PathBuf,
    profile: CompressionProfile,
}

impl FfmpegCompressor {
    /// Create a compressor using the given ffmpeg binary.
    pub fn new(binary: impl Into<PathBuf>, profile: CompressionProfile) -> Self {
        Self {
            binary: binary.into(),
            profile,
        }
    }

    /// Quality settings in use.
    pub fn profile(&self) -> &CompressionProfile {
        &self.profile
    }
}

#[async_trait]
impl Compressor for FfmpegCompressor {
    #[tracing::instrument(skip_all, fields(path = %local_path.display(), %tier))]
    async fn compress(
        &self,
        local_path: &Path,
        tier: CompressionTier,
    ) -> KeepsakeResult<CompressedMedia> {
        let kind = MediaKind::from_path(local_path).ok_or_else(|| {
            CollaboratorError::new(CollaboratorErrorKind::UnsupportedFormat(
                local_path.display().to_string(),
            ))
        })?;

        let original_size = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StorageError::new(StorageErrorKind::Missing(local_path.display().to_string()))
                } else {
                    StorageError::new(StorageErrorKind::FileRead(format!(
                        "{}: {}",
                        local_path.display(),
                        e
                    )))
                }
            })?
            .len();

        let output = temp_output(local_path);
        let args = ffmpeg_args(local_path, &output, kind, tier, &self.profile);
        tracing::debug!(binary = %self.binary.display(), ?args, "Running ffmpeg");

        let result = tokio::process::Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| tool_error(format!("cannot run {}: {}", self.binary.display(), e)))?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(&output).await;
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(500)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(tool_error(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                tail.trim()
            )));
        }

        let compressed_size = tokio::fs::metadata(&output)
            .await
            .map_err(|e| tool_error(format!("ffmpeg produced no output: {}", e)))?
            .len();

        if compressed_size >= original_size {
            let _ = tokio::fs::remove_file(&output).await;
            tracing::info!(
                original_size,
                compressed_size,
                "Compression did not shrink the file, keeping original"
            );
            return Ok(CompressedMedia::new(local_path, original_size));
        }

        tokio::fs::rename(&output, local_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                output.display(),
                local_path.display(),
                e
            )))
        })?;

        tracing::info!(original_size, compressed_size, %kind, "Compressed");
        Ok(CompressedMedia::new(local_path, compressed_size))
    }
}
