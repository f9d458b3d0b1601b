//! Provstamp Format Adapter
//!
//! Detects an artifact's metadata container and edits its text tags through
//! a uniform contract.
//!
//! # Core Concepts
//!
//! - [`FormatKind`]: Container format, detected from content signature
//! - [`FormatStrategy`]: Clear/write/read contract for one format
//! - [`TagTool`]: Boundary to whatever physically edits the container
//! - [`PngTextTool`]: In-process PNG text-chunk editor
//! - [`ExifTool`]: External exiftool backend with timeout
//! - [`FormatRegistry`]: Kind → strategy lookup; unimplemented kinds fail cleanly
//! - [`FormatAdapter`]: Path-level entry point
//!
//! # Example
//!
//! ```rust,ignore
//! use provstamp_format::{FormatAdapter, TagMap};
//!
//! let adapter = FormatAdapter::default();
//! let strategy = adapter.resolve(path, None)?;
//!
//! let mut tags = TagMap::new();
//! tags.insert("user".into(), "alice".into());
//! strategy.clear_recognized(path, &["user"])?;
//! strategy.write(path, &tags)?;
//!
//! assert_eq!(strategy.read(path, &["user"])?, tags);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod adapter;
mod error;
mod exiftool;
mod kind;
mod normalize;
mod png;
mod process;
mod registry;
mod strategy;
mod tool;

pub use adapter::FormatAdapter;
pub use error::{FormatError, ToolOperation};
pub use exiftool::{ExifTool, DEFAULT_TIMEOUT};
pub use kind::{FormatKind, PNG_SIGNATURE};
pub use normalize::normalize_tag_name;
pub use png::{png_content_digest, PngTextTool};
pub use registry::FormatRegistry;
pub use strategy::FormatStrategy;
pub use tool::{ContentDigest, RawTag, TagMap, TagTool};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
