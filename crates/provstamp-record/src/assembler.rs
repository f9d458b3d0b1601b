//! Record assembly
//!
//! [`RecordAssembler`] combines the host context with repository state from
//! a [`RevisionSource`]. A missing repository degrades the record (empty
//! repository fields) and is never an error.

use crate::context::{ContextSource, SystemContext};
use crate::record::{ProvenanceFacts, ProvenanceRecord};
use crate::revision::{GitCli, RevisionError, RevisionSource};
use crate::vocabulary::Vocabulary;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Builds [`ProvenanceRecord`]s from injected collaborators
#[derive(Clone)]
pub struct RecordAssembler {
    revision: Arc<dyn RevisionSource>,
    context: Arc<dyn ContextSource>,
}

impl RecordAssembler {
    /// Assembler over explicit collaborators
    #[must_use]
    pub fn new(revision: Arc<dyn RevisionSource>, context: Arc<dyn ContextSource>) -> Self {
        Self { revision, context }
    }

    /// Assembler over `git` and the live process environment
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(GitCli::new()), Arc::new(SystemContext::new()))
    }

    /// Gather typed facts
    ///
    /// Without `repo_path` the working directory is used and ancestor search
    /// is forced on.
    #[must_use]
    pub fn facts(&self, repo_path: Option<&Path>, search_ancestors: bool) -> ProvenanceFacts {
        let ctx = self.context.capture();

        let (path, search) = match repo_path {
            Some(path) => (path.to_path_buf(), search_ancestors),
            None => (ctx.working_dir.clone(), true),
        };

        let repository = match self.revision.locate(&path, search) {
            Ok(info) => Some(info),
            Err(RevisionError::NotFound { path }) => {
                tracing::warn!(
                    "No repository found at {}; repository fields left empty",
                    path.display()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Repository state unavailable ({}); repository fields left empty", e);
                None
            }
        };

        ProvenanceFacts {
            created_at: ctx.now,
            user: ctx.user,
            host: ctx.host,
            caller: ctx.caller,
            repository,
        }
    }

    /// Assemble a record under the current vocabulary
    #[must_use]
    pub fn assemble(&self, repo_path: Option<&Path>, search_ancestors: bool) -> ProvenanceRecord {
        self.assemble_with(Vocabulary::CURRENT, repo_path, search_ancestors)
    }

    /// Assemble a record under a specific vocabulary
    #[must_use]
    pub fn assemble_with(
        &self,
        vocabulary: Vocabulary,
        repo_path: Option<&Path>,
        search_ancestors: bool,
    ) -> ProvenanceRecord {
        let facts = self.facts(repo_path, search_ancestors);
        let record = ProvenanceRecord::render(&facts, vocabulary);
        tracing::debug!(
            "Assembled {} record with {} tags",
            vocabulary,
            record.len()
        );
        record
    }
}

impl fmt::Debug for RecordAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordAssembler").finish_non_exhaustive()
    }
}
