// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

pub mod cache;
mod client;
pub mod discovery;
mod gvr;
pub mod informer;
pub mod object;

pub use cache::{ApiCache, Cache, MemoryCache};
pub use client::{ClusterClient, resolve_context};
pub use discovery::{MapperError, ResourceRegistry, RestMapper, RestMapping};
pub use gvr::GroupVersionResource;
pub use object::{ObjectMetaAccessor, ResourceObject, Scheme, TypedObject};
