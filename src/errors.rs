//! Crate error type.
//!
//! Only unrecoverable conditions are errors: bad configuration detected
//! before rendering starts, unreadable marker files, and backend failures.
//! A label that cannot be placed is a normal outcome and never shows up here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by configuration and rendering entry points.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid projection: {srs:?}")]
    InvalidProjection { srs: String },

    #[error("invalid expression {expr:?}: {message}")]
    Expression { expr: String, message: String },

    #[error("cannot read marker file {path}")]
    MarkerFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported marker file {path}")]
    UnsupportedMarker { path: PathBuf },

    #[error("layer {layer:?} references unknown datasource {name:?}")]
    UnknownDatasource { layer: String, name: String },

    #[error("invalid map: {message}")]
    InvalidMap { message: String },

    #[error("font error: {message}")]
    Font { message: String },

    #[error("backend error: {message}")]
    Backend { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
