use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to read '{}': {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("ill-formatted polygon file: {0}")]
    PolygonFormat(String),
    #[error("ill-formatted walking-graph file: {0}")]
    GraphFormat(String),
    #[error("ill-formatted gtfs-data file: {0}")]
    GtfsFormat(String),
    #[error("invalid GTFS feed: {0}")]
    InvalidGtfs(String),
    #[error("invalid OSM data: {0}")]
    InvalidOsm(String),
    #[error("no graph node to attach stops to")]
    NoNodesToAttach,
    #[error("graph structures are inconsistent: {0}")]
    Inconsistency(String),
    #[error("serialization is not idempotent: {0}")]
    RoundTrip(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
