// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Per-resource sort and filter fields
//!
//! A handler claims the fields it understands by returning `Some`; for
//! everything else the metadata defaults from `list.rs` apply. A filter
//! field nobody claims excludes the object.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::list::{default_compare, default_filter};
use crate::kubernetes::{GroupVersionResource, ObjectMetaAccessor, ResourceObject, TypedObject};
use crate::query::{Filter, field};

/// Resource-specific comparer/filterer
pub trait ResourceHandler: Send + Sync {
    /// Ascending order of two objects by `field`, or `None` if the field is not handled here
    fn compare(&self, _left: &ResourceObject, _right: &ResourceObject, _field: &str) -> Option<Ordering> {
        None
    }

    /// Whether `obj` satisfies `filter`, or `None` if the field is not handled here
    fn filter(&self, _obj: &ResourceObject, _filter: &Filter<'_>) -> Option<bool> {
        None
    }
}

fn str_field(obj: &ResourceObject, path: &str) -> Option<String> {
    match obj.field(path)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn int_field(obj: &ResourceObject, path: &str) -> i64 {
    obj.field(path).and_then(|v| v.as_i64()).unwrap_or(0)
}

/// Pods: `status` matches the phase (case-insensitive), `nodeName` the
/// scheduled node; sortable by `restarts`.
pub struct PodHandler;

impl PodHandler {
    fn restarts(obj: &ResourceObject) -> i64 {
        if let Some(TypedObject::Pod(pod)) = obj.as_typed() {
            return pod
                .status
                .as_ref()
                .and_then(|status| status.container_statuses.as_ref())
                .map(|statuses| statuses.iter().map(|s| i64::from(s.restart_count)).sum())
                .unwrap_or(0);
        }
        match obj.field("status.containerStatuses") {
            Some(Value::Array(statuses)) => statuses
                .iter()
                .filter_map(|s| s.get("restartCount").and_then(Value::as_i64))
                .sum(),
            _ => 0,
        }
    }
}

impl ResourceHandler for PodHandler {
    fn compare(&self, left: &ResourceObject, right: &ResourceObject, field: &str) -> Option<Ordering> {
        match field {
            "restarts" => Some(Self::restarts(left).cmp(&Self::restarts(right))),
            _ => None,
        }
    }

    fn filter(&self, obj: &ResourceObject, filter: &Filter<'_>) -> Option<bool> {
        match filter.field {
            field::STATUS => Some(
                str_field(obj, "status.phase").is_some_and(|phase| phase.eq_ignore_ascii_case(filter.value)),
            ),
            "nodeName" => Some(str_field(obj, "spec.nodeName").as_deref() == Some(filter.value)),
            _ => None,
        }
    }
}

/// Workload status derived from replica counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadStatus {
    Running,
    Updating,
    Stopped,
}

impl WorkloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Updating => "updating",
            Self::Stopped => "stopped",
        }
    }

    /// Desired replicas at 0 is stopped; every desired replica ready is running
    pub fn of(obj: &ResourceObject) -> Self {
        let desired = obj.field("spec.replicas").and_then(|v| v.as_i64()).unwrap_or(1);
        let ready = int_field(obj, "status.readyReplicas");
        let total = int_field(obj, "status.replicas");

        if desired == 0 && total == 0 {
            Self::Stopped
        } else if ready == desired && total == desired {
            Self::Running
        } else {
            Self::Updating
        }
    }
}

/// Deployments and StatefulSets: `status` is one of running, updating, stopped
pub struct WorkloadHandler;

impl ResourceHandler for WorkloadHandler {
    fn filter(&self, obj: &ResourceObject, filter: &Filter<'_>) -> Option<bool> {
        match filter.field {
            field::STATUS => Some(WorkloadStatus::of(obj).as_str() == filter.value),
            _ => None,
        }
    }
}

/// Services: `type` matches `spec.type` (ClusterIP when unset)
pub struct ServiceHandler;

impl ResourceHandler for ServiceHandler {
    fn filter(&self, obj: &ResourceObject, filter: &Filter<'_>) -> Option<bool> {
        match filter.field {
            field::TYPE => {
                let ty = str_field(obj, "spec.type").unwrap_or_else(|| "ClusterIP".to_string());
                Some(ty.eq_ignore_ascii_case(filter.value))
            }
            _ => None,
        }
    }
}

/// Nodes: `role` from `node-role.kubernetes.io/<role>` labels, `status`
/// is ready, notready or unschedulable
pub struct NodeHandler;

impl NodeHandler {
    fn status(obj: &ResourceObject) -> &'static str {
        if obj.field("spec.unschedulable") == Some(Value::Bool(true)) {
            return "unschedulable";
        }
        let ready = match obj.field("status.conditions") {
            Some(Value::Array(conditions)) => conditions.iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some("Ready")
                    && c.get("status").and_then(Value::as_str) == Some("True")
            }),
            _ => false,
        };
        if ready { "ready" } else { "notready" }
    }
}

impl ResourceHandler for NodeHandler {
    fn filter(&self, obj: &ResourceObject, filter: &Filter<'_>) -> Option<bool> {
        match filter.field {
            field::STATUS => Some(Self::status(obj) == filter.value),
            "role" => {
                let key = format!("node-role.kubernetes.io/{}", filter.value);
                Some(obj.labels().contains_key(&key))
            }
            _ => None,
        }
    }
}

/// Handlers keyed by group and resource; any version of a resource uses the same handler
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<(String, String), Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for the built-in workload, pod, service and node resources
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let workload: Arc<dyn ResourceHandler> = Arc::new(WorkloadHandler);
        registry.register("", "pods", Arc::new(PodHandler));
        registry.register("apps", "deployments", workload.clone());
        registry.register("apps", "statefulsets", workload);
        registry.register("", "services", Arc::new(ServiceHandler));
        registry.register("", "nodes", Arc::new(NodeHandler));
        registry
    }

    pub fn register(&mut self, group: &str, resource: &str, handler: Arc<dyn ResourceHandler>) {
        self.handlers
            .insert((group.to_string(), resource.to_string()), handler);
    }

    pub fn get(&self, gvr: &GroupVersionResource) -> Option<&dyn ResourceHandler> {
        self.handlers
            .get(&(gvr.group.clone(), gvr.resource.clone()))
            .map(|h| h.as_ref())
    }
}

/// Comparer that asks `handler` first, then falls back to [`default_compare`]
pub fn compare_with(
    handler: Option<&dyn ResourceHandler>,
    left: &ResourceObject,
    right: &ResourceObject,
    field: &str,
) -> Ordering {
    handler
        .and_then(|h| h.compare(left, right, field))
        .unwrap_or_else(|| default_compare(left, right, field))
}

/// Filterer that asks `handler` first, then [`default_filter`]; unclaimed fields exclude
pub fn filter_with(handler: Option<&dyn ResourceHandler>, obj: &ResourceObject, filter: &Filter<'_>) -> bool {
    handler
        .and_then(|h| h.filter(obj, filter))
        .or_else(|| default_filter(obj, filter))
        .unwrap_or(false)
}
