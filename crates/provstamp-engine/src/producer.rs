//! Artifact producers
//!
//! A producer writes the base artifact bytes; stamping runs only after it
//! returns successfully.

use std::error::Error;
use std::fs;
use std::path::Path;

/// Boxed producer failure
pub type ProducerError = Box<dyn Error + Send + Sync>;

/// Writes an artifact to a destination path
pub trait ArtifactProducer {
    /// Write the artifact to `destination`
    ///
    /// # Errors
    /// Any failure to produce the artifact
    fn produce(&self, destination: &Path) -> Result<(), ProducerError>;
}

impl<F> ArtifactProducer for F
where
    F: Fn(&Path) -> Result<(), ProducerError>,
{
    fn produce(&self, destination: &Path) -> Result<(), ProducerError> {
        self(destination)
    }
}

/// Producer that writes a fixed byte buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesProducer(pub Vec<u8>);

impl ArtifactProducer for BytesProducer {
    fn produce(&self, destination: &Path) -> Result<(), ProducerError> {
        fs::write(destination, &self.0)?;
        Ok(())
    }
}
