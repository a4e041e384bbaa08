// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource discovery and GVR → GVK mapping
//!
//! The registry starts from the built-in kinds compiled into k8s-openapi
//! (instant, no I/O) and can be extended with everything the API server
//! advertises, CRDs and aggregated APIs included. It serves as the REST
//! mapper for type resolution and as the alias table for short resource
//! names (`po`, `deploy`, `svc`).

use anyhow::Result;
use kube::Client;
use kube::api::GroupVersionKind;
use kube::discovery::{ApiCapabilities, ApiResource, Discovery, Scope};
use std::collections::BTreeMap;
use std::collections::HashMap;
use tracing::{debug, info};

use super::GroupVersionResource;

/// Result of mapping a GVR to its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestMapping {
    pub gvk: GroupVersionKind,
    pub plural: String,
    pub scope: Scope,
}

impl RestMapping {
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk, &self.plural)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MapperError {
    /// The resource is not registered with the mapper
    #[error("no matches for {0}")]
    NoMatch(GroupVersionResource),
    #[error("{0}")]
    Failed(String),
}

/// Maps a resource to its kind and scope
pub trait RestMapper: Send + Sync {
    fn kind_for(&self, gvr: &GroupVersionResource) -> Result<RestMapping, MapperError>;
}

/// Information about a discovered Kubernetes resource
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    /// The API resource definition
    pub api_resource: ApiResource,
    /// API capabilities (verbs, scope, etc.)
    pub capabilities: ApiCapabilities,
    /// Short names (e.g., "po" for pods, "deploy" for deployments)
    pub aliases: Vec<String>,
    /// Whether this is a built-in kind (has a static type) or discovered at runtime
    pub is_core: bool,
}

impl ResourceInfo {
    pub fn is_namespaced(&self) -> bool {
        self.capabilities.scope == Scope::Namespaced
    }

    pub fn gvr(&self) -> GroupVersionResource {
        let ar = &self.api_resource;
        GroupVersionResource::new(&ar.group, &ar.version, &ar.plural)
    }

    pub fn gvk(&self) -> GroupVersionKind {
        let ar = &self.api_resource;
        GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind)
    }

    pub fn mapping(&self) -> RestMapping {
        RestMapping {
            gvk: self.gvk(),
            plural: self.api_resource.plural.clone(),
            scope: self.capabilities.scope.clone(),
        }
    }
}

/// Registry of all known resources for a cluster
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    by_gvr: BTreeMap<GroupVersionResource, ResourceInfo>,
    /// Plural, kind and short names → GVR
    alias_map: HashMap<String, GroupVersionResource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the registry.
    ///
    /// Built-in resources own their plural and short names: a discovered
    /// resource with a conflicting name (e.g. `events` in `events.k8s.io`)
    /// stays reachable by GVR but does not take the alias. Between two
    /// discovered resources the first one registered keeps the name.
    pub fn add(&mut self, info: ResourceInfo) {
        let gvr = info.gvr();

        let mut names = vec![
            info.api_resource.plural.to_lowercase(),
            info.api_resource.kind.to_lowercase(),
        ];
        names.extend(info.aliases.iter().map(|a| a.to_lowercase()));

        for name in names {
            let take = match self.alias_map.get(&name).and_then(|g| self.by_gvr.get(g)) {
                None => true,
                Some(existing) => info.is_core && !existing.is_core,
            };
            if take {
                self.alias_map.insert(name, gvr.clone());
            }
        }

        self.by_gvr.insert(gvr, info);
    }

    /// Look up a resource by plural, kind or short name
    pub fn get(&self, name: &str) -> Option<&ResourceInfo> {
        let gvr = self.alias_map.get(&name.to_lowercase())?;
        self.by_gvr.get(gvr)
    }

    pub fn get_by_gvr(&self, gvr: &GroupVersionResource) -> Option<&ResourceInfo> {
        if gvr.version.is_empty() {
            // Unversioned lookup picks the first registered version
            return self
                .by_gvr
                .values()
                .find(|info| info.api_resource.group == gvr.group && info.api_resource.plural == gvr.resource);
        }
        self.by_gvr.get(gvr)
    }

    /// All resources, ordered by GVR
    pub fn list_resources(&self) -> Vec<&ResourceInfo> {
        self.by_gvr.values().collect()
    }

    pub fn len(&self) -> usize {
        self.by_gvr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_gvr.is_empty()
    }

    /// Merge another registry into this one using the normal add() rules
    pub fn merge(&mut self, other: ResourceRegistry) {
        for info in other.by_gvr.into_values() {
            self.add(info);
        }
    }
}

impl RestMapper for ResourceRegistry {
    fn kind_for(&self, gvr: &GroupVersionResource) -> Result<RestMapping, MapperError> {
        self.get_by_gvr(gvr)
            .map(ResourceInfo::mapping)
            .ok_or_else(|| MapperError::NoMatch(gvr.clone()))
    }
}

/// Build a registry with the built-in resources using k8s-openapi types (no discovery, instant startup)
pub fn build_core_registry() -> ResourceRegistry {
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        autoscaling::v2::HorizontalPodAutoscaler,
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, Endpoints, Event, LimitRange, Namespace, Node, PersistentVolume,
            PersistentVolumeClaim, Pod, ResourceQuota, Secret, Service, ServiceAccount,
        },
        networking::v1::{Ingress, NetworkPolicy},
        policy::v1::PodDisruptionBudget,
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
        storage::v1::StorageClass,
    };

    let mut registry = ResourceRegistry::new();

    // Scope is given explicitly since kube::Resource exposes it only as an associated type
    macro_rules! add_resource {
        ($type:ty, namespaced, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, Scope::Namespaced, [$($alias),*])
        }};
        ($type:ty, cluster, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, Scope::Cluster, [$($alias),*])
        }};
        (@inner $type:ty, $scope:expr, [$($alias:expr),* $(,)?]) => {{
            registry.add(ResourceInfo {
                api_resource: ApiResource::erase::<$type>(&()),
                capabilities: ApiCapabilities {
                    scope: $scope,
                    subresources: vec![],
                    operations: vec![],
                },
                aliases: vec![$($alias.to_string()),*],
                is_core: true,
            });
        }};
    }

    // Core API (v1) - namespaced resources
    add_resource!(Pod, namespaced, ["po"]);
    add_resource!(Service, namespaced, ["svc"]);
    add_resource!(ConfigMap, namespaced, ["cm"]);
    add_resource!(Secret, namespaced, []);
    add_resource!(Event, namespaced, ["ev"]);
    add_resource!(ServiceAccount, namespaced, ["sa"]);
    add_resource!(Endpoints, namespaced, ["ep"]);
    add_resource!(PersistentVolumeClaim, namespaced, ["pvc"]);
    add_resource!(ResourceQuota, namespaced, ["quota"]);
    add_resource!(LimitRange, namespaced, ["limits"]);

    // Core API (v1) - cluster-scoped resources
    add_resource!(Node, cluster, ["no"]);
    add_resource!(Namespace, cluster, ["ns"]);
    add_resource!(PersistentVolume, cluster, ["pv"]);

    // Apps API (apps/v1)
    add_resource!(Deployment, namespaced, ["deploy"]);
    add_resource!(StatefulSet, namespaced, ["sts"]);
    add_resource!(DaemonSet, namespaced, ["ds"]);
    add_resource!(ReplicaSet, namespaced, ["rs"]);

    // Batch API (batch/v1)
    add_resource!(Job, namespaced, []);
    add_resource!(CronJob, namespaced, ["cj"]);

    // Networking API (networking.k8s.io/v1)
    add_resource!(Ingress, namespaced, ["ing"]);
    add_resource!(NetworkPolicy, namespaced, ["netpol"]);

    // Autoscaling API (autoscaling/v2)
    add_resource!(HorizontalPodAutoscaler, namespaced, ["hpa"]);

    // Policy API (policy/v1)
    add_resource!(PodDisruptionBudget, namespaced, ["pdb"]);

    // Storage API (storage.k8s.io/v1) - cluster-scoped
    add_resource!(StorageClass, cluster, ["sc"]);

    // RBAC API (rbac.authorization.k8s.io/v1)
    add_resource!(Role, namespaced, []);
    add_resource!(RoleBinding, namespaced, []);
    add_resource!(ClusterRole, cluster, []);
    add_resource!(ClusterRoleBinding, cluster, []);

    registry
}

/// Served versions of a group, preferred first, so its resources claim the
/// short names before older versions are registered
fn preferred_first<'a>(preferred: &'a str, versions: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut ordered = vec![preferred];
    ordered.extend(versions.into_iter().filter(|v| *v != preferred));
    ordered
}

/// Register discovered resources, skipping subresources and built-in GVRs
fn add_discovered(
    registry: &mut ResourceRegistry,
    resources: impl IntoIterator<Item = (ApiResource, ApiCapabilities)>,
) {
    for (ar, caps) in resources {
        // Skip subresources (e.g., pods/log, pods/exec)
        if ar.plural.contains('/') {
            continue;
        }

        let gvr = GroupVersionResource::new(&ar.group, &ar.version, &ar.plural);
        if registry.get_by_gvr(&gvr).is_some_and(|existing| existing.is_core) {
            continue;
        }

        debug!(gvr = %gvr, kind = %ar.kind, "Discovered resource");
        registry.add(ResourceInfo {
            api_resource: ar,
            capabilities: caps,
            aliases: vec![],
            is_core: false,
        });
    }
}

/// Discover every resource the API server advertises (CRDs and aggregated APIs included),
/// at every served version, and merge them on top of the built-in registry
pub async fn discover_resources(client: &Client) -> Result<ResourceRegistry> {
    let start = std::time::Instant::now();
    let mut registry = build_core_registry();
    let core_count = registry.len();

    let discovery = Discovery::new(client.clone()).run().await?;

    for group in discovery.groups() {
        for version in preferred_first(group.preferred_version_or_latest(), group.versions()) {
            add_discovered(&mut registry, group.versioned_resources(version));
        }
    }

    info!(
        core = core_count,
        discovered = registry.len() - core_count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Resource discovery complete"
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crd(group: &str, version: &str, kind: &str, plural: &str, scope: Scope) -> ResourceInfo {
        let gvk = GroupVersionKind::gvk(group, version, kind);
        ResourceInfo {
            api_resource: ApiResource::from_gvk_with_plural(&gvk, plural),
            capabilities: ApiCapabilities {
                scope,
                subresources: vec![],
                operations: vec![],
            },
            aliases: vec![],
            is_core: false,
        }
    }

    #[test]
    fn test_core_registry_lookup_by_alias() {
        let registry = build_core_registry();
        assert_eq!(registry.len(), 28);

        let pods = registry.get("po").unwrap();
        assert_eq!(pods.api_resource.plural, "pods");
        assert!(pods.is_namespaced());

        assert_eq!(registry.get("Deployment").unwrap().gvr().group, "apps");
        assert_eq!(registry.get("deploy").unwrap().api_resource.kind, "Deployment");
        assert!(!registry.get("ns").unwrap().is_namespaced());
        assert!(registry.get("widgets").is_none());
    }

    #[test]
    fn test_kind_for_registered() {
        let registry = build_core_registry();
        let mapping = registry
            .kind_for(&GroupVersionResource::new("apps", "v1", "deployments"))
            .unwrap();
        assert_eq!(mapping.gvk, GroupVersionKind::gvk("apps", "v1", "Deployment"));
        assert_eq!(mapping.plural, "deployments");
        assert!(mapping.is_namespaced());
    }

    #[test]
    fn test_kind_for_no_match() {
        let registry = build_core_registry();
        let gvr = GroupVersionResource::new("example.io", "v1", "widgets");
        let err = registry.kind_for(&gvr).unwrap_err();
        assert!(matches!(err, MapperError::NoMatch(g) if g == gvr));
    }

    #[test]
    fn test_kind_for_unversioned() {
        let registry = build_core_registry();
        let mapping = registry
            .kind_for(&GroupVersionResource::new("", "", "pods"))
            .unwrap();
        assert_eq!(mapping.gvk.version, "v1");
    }

    #[test]
    fn test_core_keeps_name_over_discovered() {
        let mut registry = build_core_registry();
        registry.add(crd("events.k8s.io", "v1", "Event", "events", Scope::Namespaced));

        // Alias stays with core v1 events, the new group is still reachable by GVR
        assert_eq!(registry.get("events").unwrap().api_resource.group, "");
        assert!(
            registry
                .get_by_gvr(&GroupVersionResource::new("events.k8s.io", "v1", "events"))
                .is_some()
        );
    }

    #[test]
    fn test_core_takes_name_from_discovered() {
        let mut registry = ResourceRegistry::new();
        registry.add(crd("example.io", "v1", "Pod", "pods", Scope::Namespaced));
        registry.merge(build_core_registry());

        assert_eq!(registry.get("pods").unwrap().api_resource.group, "");
        assert_eq!(registry.len(), 29);
    }

    fn served(info: ResourceInfo) -> (ApiResource, ApiCapabilities) {
        (info.api_resource, info.capabilities)
    }

    #[test]
    fn test_preferred_version_first() {
        assert_eq!(
            preferred_first("v1", ["v1beta1", "v1", "v2alpha1"]),
            vec!["v1", "v1beta1", "v2alpha1"]
        );
        assert_eq!(preferred_first("v2", ["v1"]), vec!["v2", "v1"]);
    }

    #[test]
    fn test_every_served_version_is_mapped() {
        let mut registry = build_core_registry();
        for version in preferred_first("v1", ["v1beta1", "v1"]) {
            add_discovered(
                &mut registry,
                [
                    served(crd("example.io", version, "Widget", "widgets", Scope::Namespaced)),
                    served(crd("example.io", version, "Widget", "widgets/status", Scope::Namespaced)),
                ],
            );
        }

        // Short name goes to the preferred version, the older one is still mapped
        assert_eq!(registry.get("widgets").unwrap().api_resource.version, "v1");
        let mapping = registry
            .kind_for(&GroupVersionResource::new("example.io", "v1beta1", "widgets"))
            .unwrap();
        assert_eq!(mapping.gvk, GroupVersionKind::gvk("example.io", "v1beta1", "Widget"));
        let status = GroupVersionResource::new("example.io", "v1", "widgets/status");
        assert!(registry.get_by_gvr(&status).is_none());
    }

    #[test]
    fn test_non_preferred_builtin_version_is_mapped() {
        let mut registry = build_core_registry();
        add_discovered(
            &mut registry,
            [served(crd(
                "autoscaling",
                "v1",
                "HorizontalPodAutoscaler",
                "horizontalpodautoscalers",
                Scope::Namespaced,
            ))],
        );

        assert!(
            registry
                .kind_for(&GroupVersionResource::new("autoscaling", "v1", "horizontalpodautoscalers"))
                .is_ok()
        );
        assert_eq!(registry.get("hpa").unwrap().api_resource.version, "v2");
    }

    #[test]
    fn test_discovery_does_not_replace_builtin() {
        let mut registry = build_core_registry();
        add_discovered(&mut registry, [served(crd("", "v1", "Pod", "pods", Scope::Cluster))]);

        let pods = registry.get_by_gvr(&GroupVersionResource::new("", "v1", "pods")).unwrap();
        assert!(pods.is_core);
        assert!(pods.is_namespaced());
    }

    #[test]
    fn test_first_discovered_keeps_name() {
        let mut registry = ResourceRegistry::new();
        registry.add(crd("a.io", "v1", "Widget", "widgets", Scope::Cluster));
        registry.add(crd("b.io", "v1", "Widget", "widgets", Scope::Namespaced));

        assert_eq!(registry.get("widgets").unwrap().api_resource.group, "a.io");
        assert_eq!(registry.list_resources().len(), 2);
    }
}
