// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! GVR-addressed get and list
//!
//! Type resolution runs in two tiers. The REST mapper is asked first: a
//! mapped kind the scheme knows is decoded into its concrete type, any
//! other mapped kind stays dynamic. Resources the mapper has never heard
//! of (aggregated APIs that do not show up in discovery) are looked up in
//! a fixed fallback table and served as dynamic objects.

use async_trait::async_trait;
use kube::api::{ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::list::ListResult;
use super::reader::{ObjectType, Reader, ResolvedResource};
use crate::error::{Error, Result};
use crate::kubernetes::{GroupVersionResource, MapperError, ResourceObject, RestMapper};
use crate::query::Query;

/// Uniform access to any resource by GVR
#[async_trait]
pub trait ResourceInterface: Send + Sync {
    async fn get_resource(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject>;

    async fn list_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        query: &Query,
    ) -> Result<ListResult<ResourceObject>>;
}

/// One fallback mapping as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEntry {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
}

/// GVR → GVK for resources the REST mapper does not know.
/// Fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    kinds: HashMap<GroupVersionResource, GroupVersionKind>,
}

impl FallbackTable {
    pub fn new(entries: impl IntoIterator<Item = (GroupVersionResource, GroupVersionKind)>) -> Self {
        Self {
            kinds: entries.into_iter().collect(),
        }
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a FallbackEntry>) -> Self {
        Self::new(entries.into_iter().map(|e| {
            (
                GroupVersionResource::new(&e.group, &e.version, &e.resource),
                GroupVersionKind::gvk(&e.group, &e.version, &e.kind),
            )
        }))
    }

    pub fn get(&self, gvr: &GroupVersionResource) -> Option<&GroupVersionKind> {
        self.kinds.get(gvr)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// [`ResourceInterface`] over a REST mapper, a fallback table and a [`Reader`]
pub struct ResourceGetter {
    mapper: Arc<dyn RestMapper>,
    fallback: FallbackTable,
    reader: Reader,
}

impl ResourceGetter {
    pub fn new(mapper: Arc<dyn RestMapper>, fallback: FallbackTable, reader: Reader) -> Self {
        Self {
            mapper,
            fallback,
            reader,
        }
    }

    /// Decide how `gvr` is read and decoded
    pub fn resolve(&self, gvr: &GroupVersionResource) -> Result<ResolvedResource> {
        match self.mapper.kind_for(gvr) {
            Ok(mapping) => {
                let object_type = if self.reader.scheme().recognizes(&mapping.gvk) {
                    ObjectType::Typed(mapping.gvk.clone())
                } else {
                    ObjectType::Dynamic(mapping.gvk.clone())
                };
                trace!(
                    gvr = %gvr,
                    kind = %mapping.gvk.kind,
                    typed = matches!(object_type, ObjectType::Typed(_)),
                    "Resolved via REST mapper"
                );
                Ok(ResolvedResource {
                    gvr: gvr.clone(),
                    api_resource: mapping.api_resource(),
                    namespaced: mapping.is_namespaced(),
                    object_type,
                })
            }
            Err(MapperError::NoMatch(_)) => {
                let gvk = self
                    .fallback
                    .get(gvr)
                    .ok_or_else(|| Error::NotSupportedType(gvr.clone()))?;
                debug!(gvr = %gvr, kind = %gvk.kind, "Resolved via fallback table");
                Ok(ResolvedResource {
                    gvr: gvr.clone(),
                    api_resource: ApiResource::from_gvk_with_plural(gvk, &gvr.resource),
                    namespaced: true,
                    object_type: ObjectType::Dynamic(gvk.clone()),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// API resources to keep informers on for `gvrs`, resolved the same way
    /// as reads so fallback resources are watched under their table kind.
    /// Unresolvable entries are logged and skipped.
    pub fn watch_targets(&self, gvrs: &[GroupVersionResource]) -> Vec<ApiResource> {
        gvrs.iter()
            .filter_map(|gvr| match self.resolve(gvr) {
                Ok(resolved) => Some(resolved.api_resource),
                Err(e) => {
                    warn!(gvr = %gvr, error = %e, "Not watching resource");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl ResourceInterface for ResourceGetter {
    async fn get_resource(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject> {
        let resolved = self.resolve(gvr)?;
        self.reader.get(&resolved, namespace, name).await
    }

    async fn list_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        query: &Query,
    ) -> Result<ListResult<ResourceObject>> {
        let resolved = self.resolve(gvr)?;
        self.reader.list(&resolved, namespace, query).await
    }
}
