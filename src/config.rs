// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Once;

/// Overrides the database location when set.
pub const DB_ENV: &str = "CASHBOOK_DB";

static TRACING_INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Config {
            db_path: db_path.into(),
        }
    }

    /// `$CASHBOOK_DB` if set and non-empty, the platform data dir otherwise.
    pub fn from_env() -> Result<Self> {
        Self::with_override(std::env::var(DB_ENV).ok())
    }

    fn with_override(db_override: Option<String>) -> Result<Self> {
        match db_override.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Ok(Config::new(p)),
            _ => Ok(Config::new(crate::db::db_path()?)),
        }
    }
}

/// Install the global fmt subscriber. `RUST_LOG` directives are honoured,
/// with `cashbook=info` added on top. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "cashbook=info".parse() {
            filter = filter.add_directive(directive);
        }
        // another subscriber may already be installed by the host application
        let _ = fmt().with_env_filter(filter).try_init();
        tracing::debug!("cashbook tracing initialized");
    });
}
