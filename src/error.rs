// src/error.rs

//! Crate-wide error types
//!
//! Errors raised while parsing references, versions and ranges, or while
//! talking to a recipe provider. Graph-construction errors have their own
//! taxonomy in `resolver::GraphError`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside graph construction
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed reference, version, range, or option text
    #[error("Parse error: {0}")]
    Parse(String),

    /// No known version satisfies a range
    #[error("No version of '{name}' satisfies '{range}' (known: {})", candidates.join(", "))]
    RangeResolution {
        name: String,
        range: String,
        candidates: Vec<String>,
    },

    /// The reference could not be located in the cache or any enabled remote
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// The provider returned recipe data that cannot be resolved against
    #[error("Invalid recipe data for '{reference}': {reason}")]
    RecipeData { reference: String, reason: String },

    /// Underlying provider failure (cache read, remote lookup)
    #[error("Provider error: {0}")]
    Provider(String),
}
