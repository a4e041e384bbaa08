// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Backend;

#[derive(Parser, Debug)]
#[command(name = "k8slist")]
#[command(author, version, about = "List, filter, sort and page through Kubernetes resources")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Kubernetes context to use (overrides the config file)
    #[arg(short, long, global = true, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Config file (default: ~/.k8slist/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Omit column headers in output
    #[arg(long, global = true)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the listing API over HTTP
    Serve {
        /// Port to listen on (default from config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to (default from config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Where objects are read from (default from config)
        #[arg(long, value_enum)]
        backend: Option<Backend>,
    },

    /// List resources, e.g. `list pods -n default --query sortBy=name --query limit=10`
    List {
        /// Resource plural, kind or short name
        resource: String,

        /// Namespace; all namespaces when omitted
        #[arg(short, long)]
        namespace: Option<String>,

        /// Query parameter as key=value, same keys as the HTTP API (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },

    /// Get a single resource by name
    Get {
        /// Resource plural, kind or short name
        resource: String,

        name: String,

        /// Namespace of namespaced resources
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },

    /// Show the resources known to the cluster
    Resources,
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Split `key=value` at the first `=`
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("paging=limit=10,page=2").unwrap(),
            ("paging".to_string(), "limit=10,page=2".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_list_args() {
        let args = Args::parse_from([
            "k8slist", "list", "po", "-n", "kube-system", "-q", "sortBy=name", "-q", "limit=5", "-o", "json",
        ]);
        let Command::List {
            resource,
            namespace,
            query,
        } = args.command
        else {
            panic!("expected list");
        };
        assert_eq!(resource, "po");
        assert_eq!(namespace.as_deref(), Some("kube-system"));
        assert_eq!(query.len(), 2);
        assert!(matches!(args.output, OutputFormat::Json));
    }

    #[test]
    fn test_serve_args() {
        let args = Args::parse_from(["k8slist", "--context", "prod", "serve", "--backend", "memory", "-p", "8080"]);
        assert_eq!(args.context.as_deref(), Some("prod"));
        let Command::Serve { port, bind, backend } = args.command else {
            panic!("expected serve");
        };
        assert_eq!(port, Some(8080));
        assert!(bind.is_none());
        assert_eq!(backend, Some(Backend::Memory));
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
