// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the configuration store.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot open config file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required config file '{path}' failed to load")]
    RequireFailed { path: PathBuf },

    #[error("include depth limit exceeded at '{path}'")]
    TooDeep { path: PathBuf },

    #[error("cannot write config file '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file has no path")]
    NoPath,
}
