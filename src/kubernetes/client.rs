// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, anyhow};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::time::{Duration, Instant};
use tracing::info;

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Pick the context to use: the explicit one if given, else the kubeconfig's current context.
/// Errors if the result does not name a context in the kubeconfig.
pub fn resolve_context(kubeconfig: &Kubeconfig, context: Option<&str>) -> Result<String> {
    let context_name = context
        .map(String::from)
        .or_else(|| kubeconfig.current_context.clone())
        .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

    if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
        return Err(anyhow!("Context '{}' not found in kubeconfig", context_name));
    }

    Ok(context_name)
}

/// A client bound to one kubeconfig context
#[derive(Clone)]
pub struct ClusterClient {
    pub context: String,
    pub client: Client,
}

impl ClusterClient {
    /// Read the kubeconfig and build a client for `context` (or the current context)
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;
        let context = resolve_context(&kubeconfig, context)?;
        let start = Instant::now();

        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context.clone()),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to load kubeconfig for context '{}'", context))?;

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", context))?;

        info!(
            context = %context,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Connected"
        );

        Ok(Self { context, client })
    }
}
