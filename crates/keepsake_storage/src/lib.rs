//! Local media handling for the Keepsake pipeline.
//!
//! - [`LocalMediaStore`]: resolves, measures, hashes and releases local files
//! - [`DirectoryReplicationTarget`]: a replication destination on a mounted directory (e.g. a NAS share)
//! - [`FfmpegCompressor`]: tier-based recompression through the `ffmpeg` binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod directory_target;
mod ffmpeg;
mod local;
mod media_kind;

pub use directory_target::DirectoryReplicationTarget;
pub use ffmpeg::{CompressionProfile, CompressionProfileBuilder, FfmpegCompressor};
pub use local::LocalMediaStore;
pub use media_kind::MediaKind;
