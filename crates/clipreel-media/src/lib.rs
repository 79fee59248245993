//! FFmpeg CLI wrapper for clip compilations.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2` and a stderr log sink
//! - Cancellation and timeouts via tokio
//! - The normalization profile and credit overlay filters
//! - Concat list generation
//! - The `Encoder` seam used by the assembler

pub mod command;
pub mod concat;
pub mod encoder;
pub mod error;
pub mod filters;
pub mod progress;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use concat::{prepare_concat, render_file_list};
pub use encoder::{Encoder, FfmpegEncoder, NormalizeJob};
pub use error::{MediaError, MediaResult};
pub use filters::{credit_box, normalize_chain, NormalizeProfile};
pub use progress::FfmpegProgress;
