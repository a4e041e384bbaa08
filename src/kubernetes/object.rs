// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Objects returned by the listing engine
//!
//! A resource is either one of the built-in kinds known at compile time
//! (decoded into its `k8s-openapi` type) or a dynamic object carrying only
//! its GVK and raw JSON. Both expose their metadata through
//! [`ObjectMetaAccessor`], which is all the engine ever looks at.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{DynamicObject, GroupVersionKind, TypeMeta};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;

static EMPTY_MAP: BTreeMap<String, String> = BTreeMap::new();

/// Read access to standard object metadata
pub trait ObjectMetaAccessor {
    fn meta(&self) -> &ObjectMeta;

    fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    fn namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref()
    }

    fn uid(&self) -> &str {
        self.meta().uid.as_deref().unwrap_or_default()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        self.meta().labels.as_ref().unwrap_or(&EMPTY_MAP)
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        self.meta().annotations.as_ref().unwrap_or(&EMPTY_MAP)
    }

    fn creation_timestamp(&self) -> Option<&DateTime<Utc>> {
        self.meta().creation_timestamp.as_ref().map(|t| &t.0)
    }

    fn owner_references(&self) -> &[OwnerReference] {
        self.meta().owner_references.as_deref().unwrap_or_default()
    }
}

impl ObjectMetaAccessor for ObjectMeta {
    fn meta(&self) -> &ObjectMeta {
        self
    }
}

impl ObjectMetaAccessor for DynamicObject {
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
}

/// GVK of a statically typed resource
pub fn gvk_of<K>() -> GroupVersionKind
where
    K: kube::Resource<DynamicType = ()>,
{
    GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()))
}

fn api_version(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

type Decoder = fn(serde_json::Value) -> serde_json::Result<TypedObject>;

/// Registry of kinds that decode into concrete types
#[derive(Clone, Default)]
pub struct Scheme {
    decoders: HashMap<GroupVersionKind, Decoder>,
}

impl std::fmt::Debug for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheme")
            .field("kinds", &self.decoders.len())
            .finish()
    }
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gvk: GroupVersionKind, decoder: Decoder) {
        self.decoders.insert(gvk, decoder);
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.decoders.contains_key(gvk)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode a raw object into its concrete type.
    ///
    /// Objects from list responses carry no `apiVersion`/`kind`, so the
    /// type fields are set from `gvk` before decoding. Returns `None` for
    /// kinds the scheme does not know.
    pub fn decode(&self, gvk: &GroupVersionKind, mut obj: DynamicObject) -> Option<Result<TypedObject>> {
        let decoder = *self.decoders.get(gvk)?;
        obj.types = Some(TypeMeta {
            api_version: api_version(gvk),
            kind: gvk.kind.clone(),
        });
        Some(
            serde_json::to_value(obj)
                .and_then(decoder)
                .map_err(Into::into),
        )
    }
}

macro_rules! typed_objects {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        /// A built-in resource decoded into its `k8s-openapi` type
        #[derive(Debug, Clone, Serialize)]
        #[serde(untagged)]
        pub enum TypedObject {
            $($kind(Box<$ty>),)*
        }

        impl TypedObject {
            pub fn gvk(&self) -> GroupVersionKind {
                match self {
                    $(Self::$kind(_) => gvk_of::<$ty>(),)*
                }
            }
        }

        impl ObjectMetaAccessor for TypedObject {
            fn meta(&self) -> &ObjectMeta {
                match self {
                    $(Self::$kind(obj) => &obj.metadata,)*
                }
            }
        }

        impl Scheme {
            /// Scheme with every built-in kind registered
            pub fn with_core_types() -> Self {
                let mut scheme = Self::new();
                $(
                    scheme.register(gvk_of::<$ty>(), |value| {
                        Ok(TypedObject::$kind(Box::new(serde_json::from_value(value)?)))
                    });
                )*
                scheme
            }
        }
    };
}

typed_objects! {
    Pod => k8s_openapi::api::core::v1::Pod,
    Service => k8s_openapi::api::core::v1::Service,
    ConfigMap => k8s_openapi::api::core::v1::ConfigMap,
    Secret => k8s_openapi::api::core::v1::Secret,
    Event => k8s_openapi::api::core::v1::Event,
    ServiceAccount => k8s_openapi::api::core::v1::ServiceAccount,
    Endpoints => k8s_openapi::api::core::v1::Endpoints,
    PersistentVolumeClaim => k8s_openapi::api::core::v1::PersistentVolumeClaim,
    ResourceQuota => k8s_openapi::api::core::v1::ResourceQuota,
    LimitRange => k8s_openapi::api::core::v1::LimitRange,
    Node => k8s_openapi::api::core::v1::Node,
    Namespace => k8s_openapi::api::core::v1::Namespace,
    PersistentVolume => k8s_openapi::api::core::v1::PersistentVolume,
    Deployment => k8s_openapi::api::apps::v1::Deployment,
    StatefulSet => k8s_openapi::api::apps::v1::StatefulSet,
    DaemonSet => k8s_openapi::api::apps::v1::DaemonSet,
    ReplicaSet => k8s_openapi::api::apps::v1::ReplicaSet,
    Job => k8s_openapi::api::batch::v1::Job,
    CronJob => k8s_openapi::api::batch::v1::CronJob,
    Ingress => k8s_openapi::api::networking::v1::Ingress,
    NetworkPolicy => k8s_openapi::api::networking::v1::NetworkPolicy,
    HorizontalPodAutoscaler => k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler,
    PodDisruptionBudget => k8s_openapi::api::policy::v1::PodDisruptionBudget,
    StorageClass => k8s_openapi::api::storage::v1::StorageClass,
    Role => k8s_openapi::api::rbac::v1::Role,
    RoleBinding => k8s_openapi::api::rbac::v1::RoleBinding,
    ClusterRole => k8s_openapi::api::rbac::v1::ClusterRole,
    ClusterRoleBinding => k8s_openapi::api::rbac::v1::ClusterRoleBinding,
}

/// A listed or fetched resource: concrete when the kind is built in,
/// dynamic (GVK + raw JSON) otherwise
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceObject {
    Typed(TypedObject),
    Dynamic(DynamicObject),
}

impl ResourceObject {
    /// Wrap a raw object as dynamic, stamping its type fields with `gvk`
    pub fn dynamic(gvk: &GroupVersionKind, mut obj: DynamicObject) -> Self {
        obj.types = Some(TypeMeta {
            api_version: api_version(gvk),
            kind: gvk.kind.clone(),
        });
        Self::Dynamic(obj)
    }

    pub fn gvk(&self) -> Option<GroupVersionKind> {
        match self {
            Self::Typed(obj) => Some(obj.gvk()),
            Self::Dynamic(obj) => obj.types.as_ref().map(|t| {
                let (group, version) = t.api_version.split_once('/').unwrap_or(("", &t.api_version));
                GroupVersionKind::gvk(group, version, &t.kind)
            }),
        }
    }

    pub fn is_typed(&self) -> bool {
        matches!(self, Self::Typed(_))
    }

    pub fn as_typed(&self) -> Option<&TypedObject> {
        match self {
            Self::Typed(obj) => Some(obj),
            Self::Dynamic(_) => None,
        }
    }

    /// Look up a dotted path (`status.phase`) in the object's JSON body
    ///
    /// Typed objects are serialized for the lookup; prefer reading their
    /// fields directly where it matters.
    pub fn field(&self, path: &str) -> Option<serde_json::Value> {
        let lookup = |value: &serde_json::Value| {
            path.split('.')
                .try_fold(value, |current, segment| current.get(segment))
                .cloned()
        };
        match self {
            Self::Typed(obj) => lookup(&serde_json::to_value(obj).ok()?),
            Self::Dynamic(obj) => lookup(&obj.data),
        }
    }
}

impl ObjectMetaAccessor for ResourceObject {
    fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Typed(obj) => obj.meta(),
            Self::Dynamic(obj) => &obj.metadata,
        }
    }
}
