// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for fdt

use thiserror::Error;

/// Result type alias for fdt operations
pub type Result<T> = std::result::Result<T, FdtError>;

/// fdt error types
#[derive(Error, Debug)]
pub enum FdtError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dispatch error: {0}")]
    Dispatch(String),
}
