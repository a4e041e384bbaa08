// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for k8slist
//!
//! All k8slist data is stored under ~/.k8slist/:
//! - ~/.k8slist/config.json - user configuration
//! - ~/.k8slist/log/ - rolling log files

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::kubernetes::GroupVersionResource;
use crate::resources::FallbackEntry;

/// Get the base k8slist directory (~/.k8slist/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".k8slist"))
        .context("Could not determine home directory")
}

/// Where list and get requests read objects from
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Every request goes to the API server
    #[default]
    Api,
    /// Watched resources are served from memory, kept current by informers
    Memory,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9090
}

fn fallback_entry(group: &str, version: &str, resource: &str, kind: &str) -> FallbackEntry {
    FallbackEntry {
        group: group.to_string(),
        version: version.to_string(),
        resource: resource.to_string(),
        kind: kind.to_string(),
    }
}

/// Metrics API resources are served by an aggregated API server and are
/// often missing from discovery
fn default_fallback() -> Vec<FallbackEntry> {
    vec![
        fallback_entry("metrics.k8s.io", "v1beta1", "pods", "PodMetrics"),
        fallback_entry("metrics.k8s.io", "v1beta1", "nodes", "NodeMetrics"),
    ]
}

fn default_watch() -> Vec<GroupVersionResource> {
    [
        ("", "v1", "pods"),
        ("", "v1", "services"),
        ("", "v1", "configmaps"),
        ("", "v1", "namespaces"),
        ("", "v1", "nodes"),
        ("apps", "v1", "deployments"),
        ("apps", "v1", "statefulsets"),
        ("apps", "v1", "daemonsets"),
        ("apps", "v1", "replicasets"),
        ("batch", "v1", "jobs"),
    ]
    .into_iter()
    .map(|(g, v, r)| GroupVersionResource::new(g, v, r))
    .collect()
}

/// k8slist configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Kubeconfig context; the kubeconfig's current context when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub backend: Backend,

    /// Resources the REST mapper may not know, mapped to their kinds
    #[serde(default = "default_fallback")]
    pub fallback: Vec<FallbackEntry>,

    /// Resources kept in memory by the `memory` backend
    #[serde(default = "default_watch")]
    pub watch: Vec<GroupVersionResource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: None,
            bind: default_bind(),
            port: default_port(),
            backend: Backend::default(),
            fallback: default_fallback(),
            watch: default_watch(),
        }
    }
}

impl Config {
    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Write through a temp file in the same directory, then rename over `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write config")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.k8slist/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }
}
