use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tokio::sync::RwLock;

use crate::investigate::{Investigator, RunSettings};

/// Run parameters admins can change at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout_secs: 120,
        }
    }
}

impl RunConfig {
    /// Defaults, overridden by `RECON_CONCURRENCY` / `RECON_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = dotenv::var("RECON_CONCURRENCY") {
            config.concurrency = raw
                .trim()
                .parse()
                .with_context(|| format!("RECON_CONCURRENCY is not a number: {}", raw))?;
        }
        if let Ok(raw) = dotenv::var("RECON_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("RECON_TIMEOUT_SECS is not a number: {}", raw))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=16).contains(&self.concurrency),
            "concurrency must be between 1 and 16"
        );
        anyhow::ensure!(self.timeout_secs > 0, "timeout_secs must be positive");
        Ok(())
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings {
            concurrency: self.concurrency,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

pub struct AppState {
    pub investigator: Arc<Investigator>,
    pub admin_ids: HashSet<u64>,
    pub run_config: Arc<RwLock<RunConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
