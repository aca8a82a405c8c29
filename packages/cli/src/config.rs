//! Environment-driven configuration for the CLI.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub struct Config {
    /// Postgres connection string.
    pub database_url: String,

    /// Directory holding groups.txt, systems.txt and campaign_aliases.txt.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let data_dir = env::var("TABLETALLY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        Ok(Self {
            database_url,
            data_dir,
        })
    }
}
