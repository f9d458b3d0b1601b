//! Stamping engine
//!
//! Stateless orchestration of one stamp or extract transaction:
//!
//! ```text
//! assemble → resolve → clear → write → verify
//! ```
//!
//! A failure after `clear` leaves the artifact without recognised tags. The
//! failing step is reported and nothing is rolled back; re-running `stamp`
//! is safe.

use crate::config::EngineConfig;
use crate::error::{EngineError, StampStep};
use crate::producer::ArtifactProducer;
use crate::request::{StampRequest, WipeMode};
use provstamp_format::{FormatAdapter, FormatStrategy, TagMap};
use provstamp_record::{ProvenanceRecord, RecordAssembler, Vocabulary};
use std::path::Path;

/// Writes provenance records into artifacts and reads them back
#[derive(Debug, Clone)]
pub struct StampingEngine {
    assembler: RecordAssembler,
    adapter: FormatAdapter,
    config: EngineConfig,
}

impl StampingEngine {
    /// Engine over explicit collaborators with default configuration
    #[must_use]
    pub fn new(assembler: RecordAssembler, adapter: FormatAdapter) -> Self {
        Self {
            assembler,
            adapter,
            config: EngineConfig::default(),
        }
    }

    /// Engine over `git`, the live environment, and the configured tool
    #[must_use]
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            assembler: RecordAssembler::system(),
            adapter: FormatAdapter::new(config.registry()),
            config,
        }
    }

    /// Engine with default configuration over the live system
    #[must_use]
    pub fn system() -> Self {
        Self::from_config(EngineConfig::default())
    }

    /// Replace the configuration, keeping the collaborators
    ///
    /// The format adapter is not rebuilt; use [`StampingEngine::from_config`]
    /// to switch tool backends.
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Vocabulary used by `stamp`, `extract` and `assemble_record`
    #[inline]
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        self.config.vocabulary
    }

    /// Request for `artifact` carrying this engine's defaults
    #[must_use]
    pub fn request(&self, artifact: impl Into<std::path::PathBuf>) -> StampRequest {
        StampRequest::new(artifact)
            .with_vocabulary(self.config.vocabulary)
            .with_wipe(self.config.wipe)
    }

    /// Build a record without writing it anywhere
    #[must_use]
    pub fn assemble_record(&self, repo_path: Option<&Path>, search_ancestors: bool) -> ProvenanceRecord {
        self.assembler
            .assemble_with(self.config.vocabulary, repo_path, search_ancestors)
    }

    /// Stamp `artifact_path` and return the record written
    ///
    /// `wipe_before_write` clears every recognised tag first; otherwise the
    /// record is written over whatever is there.
    ///
    /// # Errors
    /// See [`StampingEngine::stamp_with`]
    pub fn stamp(
        &self,
        artifact_path: &Path,
        repo_path: Option<&Path>,
        search_ancestors: bool,
        wipe_before_write: bool,
    ) -> Result<ProvenanceRecord, EngineError> {
        let mut request = self
            .request(artifact_path)
            .with_search_ancestors(search_ancestors)
            .with_wipe(WipeMode::from(wipe_before_write));
        if let Some(repo) = repo_path {
            request = request.with_repo(repo);
        }
        self.stamp_with(&request)
    }

    /// Stamp according to `request`
    ///
    /// # Errors
    /// [`EngineError::Stamp`] naming the failed step, or
    /// [`EngineError::ContentAltered`] if the primary content changed
    pub fn stamp_with(&self, request: &StampRequest) -> Result<ProvenanceRecord, EngineError> {
        let path = request.artifact();
        tracing::info!("Stamping {}", path.display());

        let record = self.assembler.assemble_with(
            request.vocabulary(),
            request.repo_path(),
            request.search_ancestors(),
        );

        let strategy = self.resolve(path, request.format_hint())?;
        let before = strategy
            .content_digest(path)
            .map_err(EngineError::at(StampStep::Resolve))?;

        match request.wipe() {
            WipeMode::None => {}
            WipeMode::Recognized => {
                strategy
                    .clear_recognized(path, &Vocabulary::recognized_keys())
                    .map_err(EngineError::at(StampStep::Clear))?;
            }
            WipeMode::All => {
                strategy
                    .clear_all(path)
                    .map_err(EngineError::at(StampStep::Clear))?;
            }
        }

        strategy
            .write(path, record.entries())
            .map_err(EngineError::at(StampStep::Write))?;

        let after = strategy
            .content_digest(path)
            .map_err(EngineError::at(StampStep::Verify))?;
        if before != after {
            return Err(EngineError::ContentAltered {
                path: path.to_path_buf(),
                before,
                after,
            });
        }

        tracing::info!(
            "Stamped {} with {} {} tag(s) (wipe: {}, content {})",
            path.display(),
            record.len(),
            record.vocabulary(),
            request.wipe(),
            after.short()
        );
        Ok(record)
    }

    /// Resolve and reject unimplemented formats before any edit
    fn resolve(&self, path: &Path, hint: Option<&str>) -> Result<FormatStrategy, EngineError> {
        let strategy = self
            .adapter
            .resolve(path, hint)
            .map_err(EngineError::at(StampStep::Resolve))?;
        strategy
            .require_implemented()
            .map_err(EngineError::at(StampStep::Resolve))?;
        Ok(strategy)
    }

    /// Run `producer` against `request.artifact()`, then stamp it
    ///
    /// # Errors
    /// [`EngineError::Producer`] if production fails (nothing is stamped),
    /// otherwise as [`StampingEngine::stamp_with`]
    pub fn produce_and_stamp<P: ArtifactProducer + ?Sized>(
        &self,
        producer: &P,
        request: &StampRequest,
    ) -> Result<ProvenanceRecord, EngineError> {
        producer
            .produce(request.artifact())
            .map_err(EngineError::Producer)?;
        tracing::debug!("Produced {}", request.artifact().display());
        self.stamp_with(request)
    }

    /// Read back the recognised tags under this engine's vocabulary
    ///
    /// # Errors
    /// See [`StampingEngine::extract_with`]
    pub fn extract(&self, artifact_path: &Path) -> Result<TagMap, EngineError> {
        self.extract_with(artifact_path, self.config.vocabulary, None)
    }

    /// Read back the tags of `vocabulary`, ordered as the vocabulary
    ///
    /// Tags outside the vocabulary are ignored. Values are checked against
    /// the vocabulary's value shapes.
    ///
    /// # Errors
    /// [`EngineError::Extract`] on format failure, [`EngineError::Malformed`]
    /// when a value has the wrong shape
    pub fn extract_with(
        &self,
        artifact_path: &Path,
        vocabulary: Vocabulary,
        format_hint: Option<&str>,
    ) -> Result<TagMap, EngineError> {
        let strategy = self
            .adapter
            .resolve(artifact_path, format_hint)
            .map_err(EngineError::Extract)?;
        let tags = strategy
            .read(artifact_path, &vocabulary.keys())
            .map_err(EngineError::Extract)?;

        for (name, value) in &tags {
            vocabulary.validate_value(name, value)?;
        }

        tracing::debug!(
            "Extracted {} {} tag(s) from {}",
            tags.len(),
            vocabulary,
            artifact_path.display()
        );
        Ok(tags)
    }

    /// Every text tag in the artifact under its normalised name
    ///
    /// Not filtered to any vocabulary and not shape-checked, so other tools'
    /// metadata is visible too.
    ///
    /// # Errors
    /// [`EngineError::Extract`] on format failure
    pub fn extract_all(
        &self,
        artifact_path: &Path,
        format_hint: Option<&str>,
    ) -> Result<TagMap, EngineError> {
        let tags = self
            .adapter
            .resolve(artifact_path, format_hint)
            .and_then(|strategy| strategy.read_all(artifact_path))
            .map_err(EngineError::Extract)?;
        tracing::debug!("Extracted {} tag(s) from {}", tags.len(), artifact_path.display());
        Ok(tags)
    }
}

impl Default for StampingEngine {
    fn default() -> Self {
        Self::system()
    }
}
