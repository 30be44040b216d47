use std::path::PathBuf;

use distmat_providers::matrix_service::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistmatError {
    #[error("Failed to read {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("Unknown municipality: {0}")]
    UnknownMunicipality(String),

    #[error("Batch size must be between 1 and {max}, got {size}")]
    InvalidBatchSize { size: usize, max: usize },

    #[error("Batch {batch} failed (origins: {origin_ids:?}, destinations: {destination_ids:?}): {source}")]
    Api {
        batch: usize,
        origin_ids: Vec<String>,
        destination_ids: Vec<String>,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
