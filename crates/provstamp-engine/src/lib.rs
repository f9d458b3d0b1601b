//! Provstamp Stamping Engine
//!
//! Embeds a provenance record into an artifact's own metadata and recovers
//! exactly the fields it wrote.
//!
//! # Core Concepts
//!
//! - [`StampingEngine`]: `stamp`, `extract` and `assemble_record`
//! - [`StampRequest`]: Builder for one stamp call
//! - [`WipeMode`]: Clear nothing, recognised tags, or every tag before writing
//! - [`StampStep`]: Sub-step reported with every stamp failure
//! - [`EngineConfig`]: TOML configuration (vocabulary, wipe, tool backend)
//! - [`ArtifactProducer`]: Writes the base artifact before stamping
//!
//! # Guarantees
//!
//! - Round trip: `extract` after `stamp` returns the record `stamp` returned
//! - Idempotency: stamping twice leaves no duplicate or stale keys
//! - Non-interference: tags outside the vocabulary survive a stamp
//! - Primary content is verified unchanged after every write
//!
//! # Example
//!
//! ```rust,ignore
//! use provstamp_engine::StampingEngine;
//! use std::path::Path;
//!
//! let engine = StampingEngine::system();
//! let record = engine.stamp(Path::new("plot.png"), Some(Path::new(".")), true, true)?;
//!
//! let extracted = engine.extract(Path::new("plot.png"))?;
//! assert!(record.matches(&extracted));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod engine;
mod error;
mod producer;
mod request;

pub use config::{Backend, ConfigError, EngineConfig, ToolConfig};
pub use engine::StampingEngine;
pub use error::{EngineError, ErrorKind, StampStep};
pub use producer::{ArtifactProducer, BytesProducer, ProducerError};
pub use request::{StampRequest, WipeMode};

pub use provstamp_format::TagMap;
pub use provstamp_record::{ProvenanceRecord, Vocabulary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
