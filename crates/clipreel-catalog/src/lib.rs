//! Clip catalog REST client.
//!
//! This crate provides:
//! - Bearer token lifecycle with a durable on-disk cache
//! - Authorized requests that re-authenticate and retry once on 401
//! - Cursor pagination with near-duplicate suppression
//! - Game lookups and a file-backed game directory
//! - Clip download strategies per storage layout version

pub mod client;
pub mod clips;
pub mod config;
pub mod download;
pub mod error;
pub mod games;
pub mod metrics;
pub mod token;
pub mod types;


pub use client::{CatalogClient, PageWalk};
pub use clips::{absorb_page, ClipQuery, ClipSource, DUPLICATE_WINDOW_SECS};
pub use config::CatalogConfig;
pub use download::{ClipDownloader, ClipFetcher, DirectStrategy, DownloadStrategy, ResolvedStrategy};
pub use error::{CatalogError, CatalogResult};
pub use games::{GameDirectory, GameSource};
pub use token::{TokenManager, TokenState};
