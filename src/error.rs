use thiserror::Error;

/// An error returned when writing a PTH artifact.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Generic failure while writing the artifact, most likely IO.
    #[error("failed to write PTH file")]
    WriteFailed(#[source] std::io::Error),
}
