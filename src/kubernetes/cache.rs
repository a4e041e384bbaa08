// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Object stores the reader lists from
//!
//! Two backends implement [`Cache`]:
//!
//! - [`MemoryCache`]: an in-memory store indexed by resource, namespace and
//!   name, kept current by informers (see `informer.rs`)
//! - [`ApiCache`]: reads straight from the API server, following continue
//!   tokens so a list always returns the complete collection
//!
//! Neither retries. Lists hand back freshly allocated vectors that the
//! caller owns and may reorder freely.

use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::{Api, Client};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::GroupVersionResource;
use super::object::ObjectMetaAccessor;
use crate::error::{Error, Result};
use crate::query::LabelSelector;

/// Page size for paginated list requests against the API server
const PAGE_SIZE: u32 = 500;

fn gvr_of(resource: &ApiResource) -> GroupVersionResource {
    GroupVersionResource::new(&resource.group, &resource.version, &resource.plural)
}

/// Point and collection reads over some object store
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch one object; `namespace` is `None` for cluster-scoped resources
    async fn get(&self, resource: &ApiResource, namespace: Option<&str>, name: &str) -> Result<DynamicObject>;

    /// List objects, optionally restricted to a namespace and a label selector
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<DynamicObject>>;
}

type ObjectKey = (String, String);

fn object_key(obj: &DynamicObject) -> ObjectKey {
    (
        obj.namespace().unwrap_or_default().to_string(),
        obj.name().to_string(),
    )
}

#[derive(Default)]
struct Store {
    objects: HashMap<GroupVersionResource, BTreeMap<ObjectKey, DynamicObject>>,
    synced: HashSet<GroupVersionResource>,
}

/// In-memory object store, safe for concurrent readers and writers
#[derive(Default)]
pub struct MemoryCache {
    store: RwLock<Store>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full contents for a resource and mark it synced
    pub async fn replace(&self, resource: &ApiResource, objects: Vec<DynamicObject>) {
        let gvr = gvr_of(resource);
        let entries: BTreeMap<_, _> = objects
            .into_iter()
            .map(|obj| (object_key(&obj), obj))
            .collect();

        debug!(gvr = %gvr, count = entries.len(), "Cache replaced");

        let mut store = self.store.write().await;
        store.objects.insert(gvr.clone(), entries);
        store.synced.insert(gvr);
    }

    /// Insert or update a single object
    pub async fn apply(&self, resource: &ApiResource, obj: DynamicObject) {
        let gvr = gvr_of(resource);
        trace!(gvr = %gvr, name = %obj.name(), "Cache apply");
        let mut store = self.store.write().await;
        store
            .objects
            .entry(gvr)
            .or_default()
            .insert(object_key(&obj), obj);
    }

    pub async fn delete(&self, resource: &ApiResource, obj: &DynamicObject) {
        let gvr = gvr_of(resource);
        trace!(gvr = %gvr, name = %obj.name(), "Cache delete");
        let mut store = self.store.write().await;
        if let Some(objects) = store.objects.get_mut(&gvr) {
            objects.remove(&object_key(obj));
        }
    }

    pub async fn is_synced(&self, resource: &ApiResource) -> bool {
        self.store.read().await.synced.contains(&gvr_of(resource))
    }

    fn ensure_synced(store: &Store, gvr: &GroupVersionResource) -> Result<()> {
        if store.synced.contains(gvr) {
            Ok(())
        } else {
            Err(Error::NotSynced(gvr.clone()))
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, resource: &ApiResource, namespace: Option<&str>, name: &str) -> Result<DynamicObject> {
        let gvr = gvr_of(resource);
        let store = self.store.read().await;
        Self::ensure_synced(&store, &gvr)?;

        let key = (namespace.unwrap_or_default().to_string(), name.to_string());
        store
            .objects
            .get(&gvr)
            .and_then(|objects| objects.get(&key))
            .cloned()
            .ok_or_else(|| Error::not_found(&resource.plural, name))
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<DynamicObject>> {
        let gvr = gvr_of(resource);
        let store = self.store.read().await;
        Self::ensure_synced(&store, &gvr)?;

        let Some(objects) = store.objects.get(&gvr) else {
            return Ok(Vec::new());
        };

        Ok(objects
            .values()
            .filter(|obj| namespace.is_none_or(|ns| obj.namespace() == Some(ns)))
            .filter(|obj| selector.is_none_or(|s| s.matches(obj.labels())))
            .cloned()
            .collect())
    }
}

/// Reads directly from the API server
#[derive(Clone)]
pub struct ApiCache {
    client: Client,
}

impl ApiCache {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }
}

#[async_trait]
impl Cache for ApiCache {
    async fn get(&self, resource: &ApiResource, namespace: Option<&str>, name: &str) -> Result<DynamicObject> {
        self.api(resource, namespace)
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::not_found(&resource.plural, name))
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<DynamicObject>> {
        let api = self.api(resource, namespace);
        let mut base = ListParams::default();
        if let Some(selector) = selector {
            base = base.labels(&selector.to_string());
        }

        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = base.clone().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list = api.list(&params).await?;
            items.extend(list.items);
            page_count += 1;

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        debug!(
            resource = %resource.plural,
            namespace = ?namespace,
            pages = page_count,
            total_items = items.len(),
            "Listed from API server"
        );

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::GroupVersionKind;
    use serde_json::json;

    fn pods() -> ApiResource {
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk("", "v1", "Pod"), "pods")
    }

    fn pod(ns: &str, name: &str, app: &str) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &pods())
            .within(ns)
            .data(json!({"spec": {}}));
        obj.metadata.labels = Some([("app".to_string(), app.to_string())].into());
        obj
    }

    #[tokio::test]
    async fn test_unsynced_resource_errors() {
        let cache = MemoryCache::new();
        let err = cache.list(&pods(), None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotSynced(_)));
        assert!(!cache.is_synced(&pods()).await);
    }

    #[tokio::test]
    async fn test_list_by_namespace_and_selector() {
        let cache = MemoryCache::new();
        cache
            .replace(
                &pods(),
                vec![pod("a", "web-1", "web"), pod("a", "db-1", "db"), pod("b", "web-2", "web")],
            )
            .await;

        assert_eq!(cache.list(&pods(), None, None).await.unwrap().len(), 3);
        assert_eq!(cache.list(&pods(), Some("a"), None).await.unwrap().len(), 2);

        let selector = LabelSelector::parse("app=web").unwrap();
        let web = cache.list(&pods(), None, Some(&selector)).await.unwrap();
        let names: Vec<_> = web.iter().map(|o| o.name().to_string()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
    }

    #[tokio::test]
    async fn test_get_apply_delete() {
        let cache = MemoryCache::new();
        cache.replace(&pods(), vec![]).await;

        let err = cache.get(&pods(), Some("a"), "web-1").await.unwrap_err();
        assert!(err.is_not_found());

        let obj = pod("a", "web-1", "web");
        cache.apply(&pods(), obj.clone()).await;
        assert_eq!(cache.get(&pods(), Some("a"), "web-1").await.unwrap().name(), "web-1");
        // Wrong namespace
        assert!(cache.get(&pods(), Some("b"), "web-1").await.is_err());

        cache.delete(&pods(), &obj).await;
        assert!(cache.get(&pods(), Some("a"), "web-1").await.is_err());
    }

    #[tokio::test]
    async fn test_list_returns_owned_copies() {
        let cache = MemoryCache::new();
        cache.replace(&pods(), vec![pod("a", "web-1", "web")]).await;

        let mut first = cache.list(&pods(), None, None).await.unwrap();
        first[0].metadata.name = Some("mutated".to_string());

        let second = cache.list(&pods(), None, None).await.unwrap();
        assert_eq!(second[0].name(), "web-1");
    }
}
