// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod json;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::cli::OutputFormat;
use crate::kubernetes::discovery::ResourceInfo;
use crate::kubernetes::{ObjectMetaAccessor, ResourceObject};
use crate::resources::ListResult;

/// Tabular view of objects, as shown by the table formatter
#[derive(Debug, Clone)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Total matching items when `rows` is one page of a larger list
    pub total: Option<usize>,
}

impl Rows {
    /// NAMESPACE (when any object has one), NAME, KIND, LABELS, AGE
    pub fn from_objects(objects: &[ResourceObject], now: DateTime<Utc>) -> Self {
        let namespaced = objects.iter().any(|o| o.namespace().is_some());

        let mut columns = Vec::new();
        if namespaced {
            columns.push("NAMESPACE".to_string());
        }
        columns.extend(["NAME", "KIND", "LABELS", "AGE"].map(String::from));

        let rows = objects
            .iter()
            .map(|obj| {
                let mut row = Vec::with_capacity(columns.len());
                if namespaced {
                    row.push(obj.namespace().unwrap_or_default().to_string());
                }
                row.push(obj.name().to_string());
                row.push(obj.gvk().map(|g| g.kind).unwrap_or_default());
                row.push(format_labels(obj));
                row.push(
                    obj.creation_timestamp()
                        .map(|ts| format_age(now.signed_duration_since(*ts)))
                        .unwrap_or_else(|| "<unknown>".to_string()),
                );
                row
            })
            .collect();

        Self {
            columns,
            rows,
            total: None,
        }
    }

    /// Rows as JSON objects with lowercased column names as keys
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, val)| (col.to_lowercase(), Value::String(val.clone())))
                    .collect()
            })
            .collect()
    }

    /// Rows for the resources known to the registry, like `kubectl api-resources`
    pub fn from_resources(resources: &[&ResourceInfo]) -> Self {
        let columns = ["NAME", "SHORTNAMES", "APIVERSION", "NAMESPACED", "KIND"]
            .map(String::from)
            .to_vec();
        let rows = resources
            .iter()
            .map(|info| {
                vec![
                    info.api_resource.plural.clone(),
                    info.aliases.join(","),
                    info.api_resource.api_version.clone(),
                    info.is_namespaced().to_string(),
                    info.api_resource.kind.clone(),
                ]
            })
            .collect();
        Self {
            columns,
            rows,
            total: None,
        }
    }
}

fn format_labels(obj: &ResourceObject) -> String {
    let labels = obj.labels();
    if labels.is_empty() {
        return "<none>".to_string();
    }
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Short age the way kubectl prints it: `45s`, `12m`, `5h`, `3d`, `2y`
pub fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h", s / 3600),
        s if s < 86400 * 365 => format!("{}d", s / 86400),
        s => format!("{}y", s / (86400 * 365)),
    }
}

/// Render one page of a list
pub fn render_list(result: &ListResult<ResourceObject>, format: &OutputFormat, no_headers: bool) -> String {
    match format {
        OutputFormat::Table => {
            let mut rows = Rows::from_objects(&result.items, Utc::now());
            rows.total = Some(result.total_items);
            TableFormatter::format(&rows, no_headers)
        }
        OutputFormat::Json => JsonFormatter::format(result),
        OutputFormat::Yaml => YamlFormatter::format(result),
    }
}

/// Render a single object
pub fn render_object(obj: &ResourceObject, format: &OutputFormat, no_headers: bool) -> String {
    match format {
        OutputFormat::Table => {
            TableFormatter::format(&Rows::from_objects(std::slice::from_ref(obj), Utc::now()), no_headers)
        }
        OutputFormat::Json => JsonFormatter::format(obj),
        OutputFormat::Yaml => YamlFormatter::format(obj),
    }
}

/// Render plain rows; structured formats get one object per row keyed by column
pub fn render_rows(rows: &Rows, format: &OutputFormat, no_headers: bool) -> String {
    match format {
        OutputFormat::Table => TableFormatter::format(rows, no_headers),
        OutputFormat::Json => JsonFormatter::format(&rows.to_json_rows()),
        OutputFormat::Yaml => YamlFormatter::format(&rows.to_json_rows()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::api::{ApiResource, DynamicObject, GroupVersionKind};

    fn object(name: &str, ns: Option<&str>, created: DateTime<Utc>) -> ResourceObject {
        let gvk = GroupVersionKind::gvk("", "v1", "ConfigMap");
        let ar = ApiResource::from_gvk_with_plural(&gvk, "configmaps");
        let mut obj = DynamicObject::new(name, &ar);
        obj.metadata.namespace = ns.map(String::from);
        obj.metadata.creation_timestamp = Some(Time(created));
        obj.metadata.labels = Some([("app".to_string(), "web".to_string())].into());
        ResourceObject::dynamic(&gvk, obj)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::seconds(45)), "45s");
        assert_eq!(format_age(chrono::Duration::minutes(12)), "12m");
        assert_eq!(format_age(chrono::Duration::hours(5)), "5h");
        assert_eq!(format_age(chrono::Duration::days(3)), "3d");
        assert_eq!(format_age(chrono::Duration::days(800)), "2y");
        assert_eq!(format_age(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_rows_with_namespace() {
        let objects = vec![object("web", Some("default"), now() - chrono::Duration::hours(2))];
        let rows = Rows::from_objects(&objects, now());
        assert_eq!(rows.columns, vec!["NAMESPACE", "NAME", "KIND", "LABELS", "AGE"]);
        assert_eq!(rows.rows[0], vec!["default", "web", "ConfigMap", "app=web", "2h"]);
    }

    #[test]
    fn test_rows_cluster_scoped() {
        let objects = vec![object("web", None, now())];
        let rows = Rows::from_objects(&objects, now());
        assert_eq!(rows.columns[0], "NAME");
        assert_eq!(rows.rows[0].len(), 4);
    }

    #[test]
    fn test_json_rows() {
        let rows = Rows {
            columns: vec!["NAME".to_string(), "KIND".to_string()],
            rows: vec![vec!["pods".to_string(), "Pod".to_string()]],
            total: None,
        };
        let out = render_rows(&rows, &OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["name"], "pods");
        assert_eq!(value[0]["kind"], "Pod");
    }

    #[test]
    fn test_render_list_json_envelope() {
        let result = ListResult {
            items: vec![object("web", Some("default"), now())],
            total_items: 7,
        };
        let out = render_list(&result, &OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["totalItems"], 7);
        assert_eq!(value["items"][0]["kind"], "ConfigMap");
    }
}
