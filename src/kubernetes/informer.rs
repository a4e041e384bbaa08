// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Keep a [`MemoryCache`] current with the cluster
//!
//! One watcher per resource. The initial listing is buffered and swapped in
//! with [`MemoryCache::replace`] once complete, so readers never see a
//! partially populated resource; afterwards events are applied one by one.

use futures::StreamExt;
use futures::stream::BoxStream;
use kube::api::{ApiResource, DynamicObject};
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::cache::MemoryCache;

/// Apply one watcher event. `pending` holds objects of an initial listing in progress.
pub async fn apply_event(
    cache: &MemoryCache,
    resource: &ApiResource,
    pending: &mut Option<Vec<DynamicObject>>,
    event: Event<DynamicObject>,
) {
    match event {
        Event::Init => *pending = Some(Vec::new()),
        Event::InitApply(obj) => pending.get_or_insert_with(Vec::new).push(obj),
        Event::InitDone => {
            let objects = pending.take().unwrap_or_default();
            info!(resource = %resource.plural, count = objects.len(), "Informer synced");
            cache.replace(resource, objects).await;
        }
        Event::Apply(obj) => cache.apply(resource, obj).await,
        Event::Delete(obj) => cache.delete(resource, &obj).await,
    }
}

/// Watch events for `resource` across all namespaces. Consecutive errors
/// are spaced out with exponential backoff.
fn watch_events(
    client: Client,
    resource: &ApiResource,
) -> BoxStream<'static, Result<Event<DynamicObject>, watcher::Error>> {
    let api: Api<DynamicObject> = Api::all_with(client, resource);
    watcher::watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed()
}

/// Spawn a watcher for `resource` across all namespaces, feeding `cache`.
///
/// Watch errors are logged; the watcher re-lists on its own.
pub fn spawn_informer(client: Client, resource: ApiResource, cache: Arc<MemoryCache>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = watch_events(client, &resource);
        let mut pending = None;

        info!(resource = %resource.plural, group = %resource.group, "Informer started");

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => apply_event(&cache, &resource, &mut pending, event).await,
                Err(e) => warn!(resource = %resource.plural, error = %e, "Watch error"),
            }
        }

        warn!(resource = %resource.plural, "Informer stream ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::cache::Cache;
    use kube::api::GroupVersionKind;

    fn pods() -> ApiResource {
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk("", "v1", "Pod"), "pods")
    }

    fn pod(name: &str) -> DynamicObject {
        DynamicObject::new(name, &pods()).within("default")
    }

    #[tokio::test]
    async fn test_initial_listing_is_atomic() {
        let cache = MemoryCache::new();
        let ar = pods();
        let mut pending = None;

        apply_event(&cache, &ar, &mut pending, Event::Init).await;
        apply_event(&cache, &ar, &mut pending, Event::InitApply(pod("a"))).await;
        apply_event(&cache, &ar, &mut pending, Event::InitApply(pod("b"))).await;
        assert!(!cache.is_synced(&ar).await);

        apply_event(&cache, &ar, &mut pending, Event::InitDone).await;
        assert!(cache.is_synced(&ar).await);
        assert_eq!(cache.list(&ar, None, None).await.unwrap().len(), 2);
        assert!(pending.is_none());
    }

    #[tokio::test]
    async fn test_events_after_sync() {
        let cache = MemoryCache::new();
        let ar = pods();
        let mut pending = None;

        apply_event(&cache, &ar, &mut pending, Event::Init).await;
        apply_event(&cache, &ar, &mut pending, Event::InitDone).await;
        apply_event(&cache, &ar, &mut pending, Event::Apply(pod("a"))).await;
        apply_event(&cache, &ar, &mut pending, Event::Apply(pod("b"))).await;
        apply_event(&cache, &ar, &mut pending, Event::Delete(pod("a"))).await;

        let names: Vec<_> = cache
            .list(&ar, None, None)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|o| o.metadata.name)
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[tokio::test]
    async fn test_watch_errors_back_off() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
        let client = Client::try_from(config).unwrap();
        let mut stream = watch_events(client, &pods());

        let mut errors = 0;
        let window = tokio::time::sleep(std::time::Duration::from_millis(500));
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut window => break,
                event = stream.next() => match event {
                    Some(Err(_)) => errors += 1,
                    Some(Ok(_)) => panic!("unexpected event from an unreachable server"),
                    None => break,
                },
            }
        }

        // The first retry waits at least 800ms
        assert!(errors >= 1);
        assert!(errors <= 2, "{} watch errors in 500ms", errors);
    }

    #[tokio::test]
    async fn test_relist_replaces_contents() {
        let cache = MemoryCache::new();
        let ar = pods();
        let mut pending = None;

        cache.replace(&ar, vec![pod("stale")]).await;
        apply_event(&cache, &ar, &mut pending, Event::Init).await;
        apply_event(&cache, &ar, &mut pending, Event::InitApply(pod("fresh"))).await;
        apply_event(&cache, &ar, &mut pending, Event::InitDone).await;

        let list = cache.list(&ar, None, None).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].metadata.name.as_deref(), Some("fresh"));
    }
}
