// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Result, anyhow};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

use k8slist::cli::{Args, Command};
use k8slist::config::{self, Backend, Config};
use k8slist::kubernetes::discovery::discover_resources;
use k8slist::kubernetes::informer::spawn_informer;
use k8slist::kubernetes::{ApiCache, Cache, ClusterClient, MemoryCache, ResourceRegistry, Scheme};
use k8slist::output;
use k8slist::query::parse_query;
use k8slist::resources::{FallbackTable, HandlerRegistry, Reader, ResourceGetter, ResourceInterface};
use k8slist::server::{AppState, HttpServer};

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // 10MB per file, 5 files, rotated daily as well
    let log_path = log_dir.join("k8slist.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024);

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, guard) = file_appender.get_non_blocking_appender();
    // Keep the background writer alive for the life of the process
    std::mem::forget(guard);

    let filter = if verbose { "k8slist=debug,tower_http=debug" } else { "k8slist=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("K8SLIST_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let context = args.context.clone().or_else(|| config.context.clone());

    let cluster = ClusterClient::connect(context.as_deref()).await?;
    let registry = Arc::new(discover_resources(&cluster.client).await?);

    match &args.command {
        Command::Serve {
            port,
            bind,
            backend,
        } => {
            let backend = backend.unwrap_or(config.backend);
            let getter = build_getter(&cluster, registry.clone(), &config, backend);

            let server = HttpServer::new(
                port.unwrap_or(config.port),
                bind.clone().unwrap_or_else(|| config.bind.clone()),
            );
            server
                .run(AppState {
                    resources: Arc::new(getter),
                    registry,
                })
                .await?;
        }
        Command::List {
            resource,
            namespace,
            query,
        } => {
            let gvr = lookup(&registry, resource)?;
            let getter = build_getter(&cluster, registry.clone(), &config, Backend::Api);

            let query = parse_query(query)?;
            let result = getter
                .list_resources(&gvr, namespace.as_deref(), &query)
                .await?;
            println!("{}", output::render_list(&result, &args.output, args.no_headers));
        }
        Command::Get {
            resource,
            name,
            namespace,
        } => {
            let gvr = lookup(&registry, resource)?;
            let getter = build_getter(&cluster, registry.clone(), &config, Backend::Api);

            let obj = getter.get_resource(&gvr, Some(namespace), name).await?;
            println!("{}", output::render_object(&obj, &args.output, args.no_headers));
        }
        Command::Resources => {
            let rows = output::Rows::from_resources(&registry.list_resources());
            println!("{}", output::render_rows(&rows, &args.output, args.no_headers));
        }
    }

    Ok(())
}

fn lookup(registry: &ResourceRegistry, resource: &str) -> Result<k8slist::kubernetes::GroupVersionResource> {
    registry
        .get(resource)
        .map(|info| info.gvr())
        .ok_or_else(|| k8slist::Error::UnknownResource(resource.to_string()).into())
}

fn build_reader(cache: Arc<dyn Cache>) -> Reader {
    Reader::new(
        cache,
        Arc::new(Scheme::with_core_types()),
        Arc::new(HandlerRegistry::with_defaults()),
    )
}

/// Wire the getter over the chosen object store; for the memory backend,
/// start an informer per watched resource
fn build_getter(
    cluster: &ClusterClient,
    registry: Arc<ResourceRegistry>,
    config: &Config,
    backend: Backend,
) -> ResourceGetter {
    let fallback = FallbackTable::from_entries(&config.fallback);
    match backend {
        Backend::Api => {
            let cache = Arc::new(ApiCache::new(cluster.client.clone()));
            ResourceGetter::new(registry, fallback, build_reader(cache))
        }
        Backend::Memory => {
            let cache = Arc::new(MemoryCache::new());
            let getter = ResourceGetter::new(registry, fallback, build_reader(cache.clone()));
            let targets = getter.watch_targets(&config.watch);
            for resource in &targets {
                spawn_informer(cluster.client.clone(), resource.clone(), cache.clone());
            }
            info!(
                context = %cluster.context,
                watched = targets.len(),
                configured = config.watch.len(),
                "Memory backend started"
            );
            getter
        }
    }
}
