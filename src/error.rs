use std::path::PathBuf;
use thiserror::Error;

/// Unrecoverable failures while loading a chart's inputs.
///
/// A load error halts the setup of the chart that requested the resource;
/// other charts load independently and are unaffected.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV input")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' not found in dataset header")]
    MissingColumn(String),

    #[error("failed to fetch '{url}'")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed GeoJSON boundaries")]
    GeoJson(#[from] geojson::Error),

    #[error("boundary data contains no polygon features")]
    NoFeatures,
}
