//! Provstamp Record
//!
//! Canonical provenance records for generated artifacts.
//!
//! # Core Concepts
//!
//! - [`Vocabulary`]: Fixed, versioned set of tag names and value shapes
//! - [`ProvenanceRecord`]: Ordered tag → text mapping, always the full key set
//! - [`RecordAssembler`]: Builds records from a [`RevisionSource`] and a [`ContextSource`]
//! - [`GitCli`]: Revision source backed by the `git` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use provstamp_record::RecordAssembler;
//! use std::path::Path;
//!
//! let assembler = RecordAssembler::system();
//! let record = assembler.assemble(Some(Path::new(".")), true);
//!
//! for (tag, value) in record.iter() {
//!     println!("{tag} = {value}");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod assembler;
mod context;
mod record;
mod revision;
mod vocabulary;

pub use assembler::RecordAssembler;
pub use context::{host_descriptor, ContextSource, FixedContext, RecordContext, SystemContext};
pub use record::{ProvenanceFacts, ProvenanceRecord};
pub use revision::{GitCli, RepoInfo, RevisionError, RevisionSource};
pub use vocabulary::{
    Field, TagSpec, ValueShape, Vocabulary, VocabularyError, V1_TIME_FORMAT, V2_TIME_FORMAT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
