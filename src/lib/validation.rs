//! Input validation utilities.
//!
//! Configuration problems are detected here before any pipeline stage runs,
//! so a bad invocation aborts with no side effects.

use std::path::Path;

use crate::errors::{Result, SvasmError};

/// Validate that a file exists.
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input calls")
///
/// # Errors
/// Returns a [`SvasmError::Configuration`] if the file does not exist.
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SvasmError::Configuration {
            reason: format!("{description} does not exist: {}", path.display()),
        });
    }
    Ok(())
}

/// Validate that input and output do not designate the same resource.
///
/// Paths are canonicalized where possible so `calls.tsv` and
/// `./calls.tsv` are recognized as the same file.
///
/// # Errors
/// Returns a [`SvasmError::Configuration`] if both paths resolve to the
/// same location.
pub fn validate_distinct_paths<P: AsRef<Path>>(input: P, output: P) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    let resolved_input = input.canonicalize().unwrap_or_else(|_| input.to_path_buf());
    let resolved_output = output.canonicalize().unwrap_or_else(|_| output.to_path_buf());
    if resolved_input == resolved_output {
        return Err(SvasmError::Configuration {
            reason: format!("input and output must be different files: {}", input.display()),
        });
    }
    Ok(())
}
