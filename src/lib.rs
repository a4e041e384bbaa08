// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Uniform list and get access to Kubernetes resources
//!
//! A resource is addressed by its GVR, resolved to a typed or dynamic
//! object, read from a cache and run through a filter, sort and paginate
//! pipeline described by a [`query::Query`].

pub mod cli;
pub mod config;
pub mod error;
pub mod kubernetes;
pub mod output;
pub mod query;
pub mod resources;
pub mod server;

pub use error::{Error, Result};
