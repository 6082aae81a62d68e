// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::DEFAULT_WORKERS;
use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;

/// Operator configuration loaded from flags or environment variables
#[derive(Parser, Debug, Clone)]
#[command(
    name = "konfig-syncer",
    version,
    about = "Replicates annotated ConfigMaps and Secrets across namespaces"
)]
pub struct Config {
    /// Path to a kubeconfig. Only required if out-of-cluster.
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// The address of the Kubernetes API server. Overrides any value in kubeconfig.
    #[arg(long, env = "KONFIG_SYNCER_MASTER")]
    pub master: Option<String>,

    /// Enable debug logging
    #[arg(long, env = "KONFIG_SYNCER_DEBUG")]
    pub debug: bool,

    /// Log in human readable mode rather than the default JSON
    #[arg(long, env = "KONFIG_SYNCER_HUMAN_READABLE_LOGS")]
    pub human_readable_logs: bool,

    /// Number of workers per resource kind
    #[arg(long, env = "KONFIG_SYNCER_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

impl Config {
    /// Load configuration from the command line and environment.
    /// Exits the process on `--help`, `--version` and unparsable arguments.
    pub fn load() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.workers > 0, "--workers must be at least 1");
        Ok(())
    }

    /// Default tracing filter directive for this configuration
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "konfig_syncer=debug,info"
        } else {
            "info"
        }
    }
}
