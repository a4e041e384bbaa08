// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use std::sync::Arc;
use tracing::debug;

use super::handlers::{HandlerRegistry, compare_with, filter_with};
use super::list::{ListResult, default_list};
use crate::error::{Error, Result};
use crate::kubernetes::{Cache, GroupVersionResource, ResourceObject, Scheme};
use crate::query::Query;

/// How objects of a resource are materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    /// Decoded into the scheme's concrete type for this GVK
    Typed(GroupVersionKind),
    /// Kept as raw JSON tagged with this GVK
    Dynamic(GroupVersionKind),
}

/// A GVR after type resolution: where to read it and what to decode it into
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    pub gvr: GroupVersionResource,
    pub api_resource: ApiResource,
    pub namespaced: bool,
    pub object_type: ObjectType,
}

/// Get and list over a [`Cache`], applying the list pipeline to every list
#[derive(Clone)]
pub struct Reader {
    cache: Arc<dyn Cache>,
    scheme: Arc<Scheme>,
    handlers: Arc<HandlerRegistry>,
}

impl Reader {
    pub fn new(cache: Arc<dyn Cache>, scheme: Arc<Scheme>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            cache,
            scheme,
            handlers,
        }
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    fn scope<'a>(resolved: &ResolvedResource, namespace: Option<&'a str>) -> Option<&'a str> {
        if resolved.namespaced { namespace } else { None }
    }

    fn convert(&self, resolved: &ResolvedResource, obj: DynamicObject) -> Result<ResourceObject> {
        match &resolved.object_type {
            ObjectType::Typed(gvk) => match self.scheme.decode(gvk, obj) {
                Some(decoded) => Ok(ResourceObject::Typed(decoded?)),
                None => Err(Error::NotSupportedType(resolved.gvr.clone())),
            },
            ObjectType::Dynamic(gvk) => Ok(ResourceObject::dynamic(gvk, obj)),
        }
    }

    /// Point lookup. Cluster-scoped resources ignore `namespace`.
    pub async fn get(&self, resolved: &ResolvedResource, namespace: Option<&str>, name: &str) -> Result<ResourceObject> {
        let namespace = Self::scope(resolved, namespace);
        let obj = self
            .cache
            .get(&resolved.api_resource, namespace, name)
            .await?;
        self.convert(resolved, obj)
    }

    /// List, then filter, sort and paginate according to `query`
    pub async fn list(
        &self,
        resolved: &ResolvedResource,
        namespace: Option<&str>,
        query: &Query,
    ) -> Result<ListResult<ResourceObject>> {
        let namespace = Self::scope(resolved, namespace);
        let raw = self
            .cache
            .list(&resolved.api_resource, namespace, query.label_selector.as_ref())
            .await?;
        let fetched = raw.len();

        let objects = raw
            .into_iter()
            .map(|obj| self.convert(resolved, obj))
            .collect::<Result<Vec<_>>>()?;

        let handler = self.handlers.get(&resolved.gvr);
        let result = default_list(
            objects,
            query,
            |l, r, field| compare_with(handler, l, r, field),
            |obj, filter| filter_with(handler, obj, filter),
        );

        debug!(
            gvr = %resolved.gvr,
            namespace = ?namespace,
            fetched,
            total_items = result.total_items,
            returned = result.items.len(),
            "Listed resources"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::{MemoryCache, ObjectMetaAccessor};
    use serde_json::json;

    fn pods_resolved() -> ResolvedResource {
        let gvk = GroupVersionKind::gvk("", "v1", "Pod");
        ResolvedResource {
            gvr: GroupVersionResource::new("", "v1", "pods"),
            api_resource: ApiResource::from_gvk_with_plural(&gvk, "pods"),
            namespaced: true,
            object_type: ObjectType::Typed(gvk),
        }
    }

    fn pod(ns: &str, name: &str, phase: &str) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &pods_resolved().api_resource)
            .within(ns)
            .data(json!({"spec": {"containers": []}, "status": {"phase": phase}}));
        obj.types = None;
        obj
    }

    async fn reader_with(objects: Vec<DynamicObject>) -> Reader {
        let cache = MemoryCache::new();
        cache.replace(&pods_resolved().api_resource, objects).await;
        Reader::new(
            Arc::new(cache),
            Arc::new(Scheme::with_core_types()),
            Arc::new(HandlerRegistry::with_defaults()),
        )
    }

    #[tokio::test]
    async fn test_get_decodes_typed() {
        let reader = reader_with(vec![pod("default", "web", "Running")]).await;
        let obj = reader
            .get(&pods_resolved(), Some("default"), "web")
            .await
            .unwrap();
        assert!(obj.is_typed());
        assert_eq!(obj.name(), "web");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let reader = reader_with(vec![]).await;
        let err = reader
            .get(&pods_resolved(), Some("default"), "web")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_uses_resource_handler() {
        let reader = reader_with(vec![
            pod("default", "web-1", "Running"),
            pod("default", "web-2", "Pending"),
            pod("other", "web-3", "Running"),
        ])
        .await;

        let query = Query::new().filter("status", "running");
        let result = reader
            .list(&pods_resolved(), Some("default"), &query)
            .await
            .unwrap();
        assert_eq!(result.total_items, 1);
        assert_eq!(result.items[0].name(), "web-1");

        let all = reader.list(&pods_resolved(), None, &query).await.unwrap();
        assert_eq!(all.total_items, 2);
    }

    #[tokio::test]
    async fn test_dynamic_resource_is_tagged() {
        let mut resolved = pods_resolved();
        let gvk = GroupVersionKind::gvk("metrics.example.io", "v1", "PodMetrics");
        resolved.object_type = ObjectType::Dynamic(gvk.clone());

        let reader = reader_with(vec![pod("default", "web", "Running")]).await;
        let result = reader.list(&resolved, None, &Query::new()).await.unwrap();
        assert!(!result.items[0].is_typed());
        assert_eq!(result.items[0].gvk(), Some(gvk));
    }

    #[tokio::test]
    async fn test_cache_errors_pass_through() {
        let reader = Reader::new(
            Arc::new(MemoryCache::new()),
            Arc::new(Scheme::with_core_types()),
            Arc::new(HandlerRegistry::new()),
        );
        let err = reader
            .list(&pods_resolved(), None, &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotSynced(_)));
    }
}
