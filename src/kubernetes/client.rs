// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation from the process configuration

use crate::config::Config;
use crate::error::{Result, SyncError};
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config as KConfig,
};
use tracing::{debug, info, instrument};

/// Create the client used for watches and writes
#[instrument(skip(config))]
pub async fn create_client(config: &Config) -> Result<Client> {
    let client_config = client_config(config).await?;
    info!("Using Kubernetes API server {}", client_config.cluster_url);

    Client::try_from(client_config)
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to create client: {}", e)))
}

/// Resolve the client configuration: explicit kubeconfig, or whatever can be inferred
/// (in-cluster service account, `KUBECONFIG`, `~/.kube/config`), then apply the master override.
async fn client_config(config: &Config) -> Result<KConfig> {
    let mut client_config = match &config.kubeconfig {
        Some(path) => {
            debug!("Loading kubeconfig from {}", path.display());
            let kubeconfig = tokio::fs::read_to_string(path).await.map_err(|e| {
                SyncError::KubeconfigError(format!(
                    "Failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            config_from_kubeconfig(&kubeconfig).await?
        }
        None => KConfig::infer()
            .await
            .map_err(|e| SyncError::KubeconfigError(format!("Failed to infer config: {}", e)))?,
    };

    if let Some(master) = &config.master {
        debug!(
            "Overriding cluster URL {} with {}",
            client_config.cluster_url, master
        );
        client_config.cluster_url = master.parse().map_err(|e| {
            SyncError::KubeconfigError(format!("Invalid master URL {}: {}", master, e))
        })?;
    }

    Ok(client_config)
}

/// Create a client configuration from a kubeconfig string
async fn config_from_kubeconfig(kubeconfig: &str) -> Result<KConfig> {
    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    KConfig::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
        .await
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to create config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: https://10.0.0.1:6443
    insecure-skip-tls-verify: true
contexts:
- name: test
  context:
    cluster: test
    user: test
current-context: test
users:
- name: test
  user:
    token: abc123
"#;

    fn config_with(kubeconfig: Option<std::path::PathBuf>, master: Option<&str>) -> Config {
        Config {
            kubeconfig,
            master: master.map(str::to_string),
            debug: false,
            human_readable_logs: false,
            workers: 2,
        }
    }

    fn write_kubeconfig(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "konfig-syncer-{}-{}.yaml",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_config_from_kubeconfig() {
        let config = config_from_kubeconfig(KUBECONFIG).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
    }

    #[tokio::test]
    async fn test_config_from_invalid_kubeconfig() {
        let err = config_from_kubeconfig("clusters: [").await.unwrap_err();
        assert!(matches!(err, SyncError::KubeconfigError(_)));
    }

    #[tokio::test]
    async fn test_master_overrides_cluster_url() {
        let path = write_kubeconfig("master");
        let config = config_with(Some(path.clone()), Some("https://api.example.com:443"));

        let client_config = client_config(&config).await.unwrap();
        assert_eq!(client_config.cluster_url.host(), Some("api.example.com"));

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_file() {
        let config = config_with(Some("/nonexistent/kubeconfig".into()), None);
        let err = client_config(&config).await.unwrap_err();
        assert!(matches!(err, SyncError::KubeconfigError(_)));
    }
}
