use std::{io, path::PathBuf};

use thiserror::Error;

use crate::grid::{CellId, HexDirection};

/// Broad classification of a [`MapGenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was malformed; nothing was mutated.
    CallerInput,
    /// Generation cannot continue without producing an inconsistent world.
    Structural,
    /// A grid mutation was attempted that the grid refused.
    Mutation,
    /// Configuration could not be loaded or failed validation.
    Config,
}

#[derive(Debug, Error)]
pub enum MapGenError {
    #[error("requested {requested} chunks but only {available} sections are available")]
    ChunkCountOutOfRange { requested: usize, available: usize },
    #[error("invalid chunk request: {0}")]
    InvalidRequest(&'static str),
    #[error(
        "found {found} of {requested} starting sections at separation {min_separation}"
    )]
    NoValidStartingSection {
        found: usize,
        requested: usize,
        min_separation: u32,
    },
    #[error("orphan section {section} has no adjacent chunk")]
    OrphanSection { section: u32 },
    #[error("homeland {homeland} has no valid starting location")]
    NoStartingLocation { homeland: usize },
    #[error("grid rejected {change} on cell {cell:?}")]
    MutationRejected { cell: CellId, change: &'static str },
    #[error("grid rejected river edge {direction:?} on cell {cell:?}")]
    RiverRejected { cell: CellId, direction: HexDirection },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MapGenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapGenError::ChunkCountOutOfRange { .. } | MapGenError::InvalidRequest(_) => {
                ErrorKind::CallerInput
            }
            MapGenError::NoValidStartingSection { .. }
            | MapGenError::OrphanSection { .. }
            | MapGenError::NoStartingLocation { .. } => ErrorKind::Structural,
            MapGenError::MutationRejected { .. } | MapGenError::RiverRejected { .. } => {
                ErrorKind::Mutation
            }
            MapGenError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse mapgen config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read mapgen config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid mapgen config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_classified() {
        let err = MapGenError::NoValidStartingSection {
            found: 1,
            requested: 2,
            min_separation: 40,
        };
        assert!(err.is_structural());
        assert_eq!(
            MapGenError::ChunkCountOutOfRange {
                requested: 4,
                available: 2
            }
            .kind(),
            ErrorKind::CallerInput
        );
        let config: MapGenError = ConfigError::Invalid("bad".into()).into();
        assert_eq!(config.kind(), ErrorKind::Config);
    }
}
