// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use axum::Json;
use axum::extract::{Path, Query, State};

use super::AppState;
use super::error::ApiError;
use crate::error::Error;
use crate::kubernetes::{GroupVersionResource, ResourceObject};
use crate::query::parse_query;
use crate::resources::ListResult;

type Params = Query<Vec<(String, String)>>;
type ListResponse = Result<Json<ListResult<ResourceObject>>, ApiError>;
type GetResponse = Result<Json<ResourceObject>, ApiError>;

/// Resolve a plural, kind or short name through the registry
fn lookup(state: &AppState, resources: &str) -> Result<GroupVersionResource, Error> {
    state
        .registry
        .get(resources)
        .map(|info| info.gvr())
        .ok_or_else(|| Error::UnknownResource(resources.to_string()))
}

async fn list(state: &AppState, gvr: GroupVersionResource, namespace: Option<&str>, params: &[(String, String)]) -> ListResponse {
    let query = parse_query(params)?;
    let result = state.resources.list_resources(&gvr, namespace, &query).await?;
    Ok(Json(result))
}

async fn get(state: &AppState, gvr: GroupVersionResource, namespace: Option<&str>, name: &str) -> GetResponse {
    let obj = state.resources.get_resource(&gvr, namespace, name).await?;
    Ok(Json(obj))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn list_cluster(State(state): State<AppState>, Path(resources): Path<String>, Query(params): Params) -> ListResponse {
    let gvr = lookup(&state, &resources)?;
    list(&state, gvr, None, &params).await
}

pub async fn list_namespaced(
    State(state): State<AppState>,
    Path((namespace, resources)): Path<(String, String)>,
    Query(params): Params,
) -> ListResponse {
    let gvr = lookup(&state, &resources)?;
    list(&state, gvr, Some(&namespace), &params).await
}

pub async fn get_namespaced(
    State(state): State<AppState>,
    Path((namespace, resources, name)): Path<(String, String, String)>,
) -> GetResponse {
    let gvr = lookup(&state, &resources)?;
    get(&state, gvr, Some(&namespace), &name).await
}

pub async fn list_core(State(state): State<AppState>, Path(resources): Path<String>, Query(params): Params) -> ListResponse {
    list(&state, GroupVersionResource::new("", "v1", &resources), None, &params).await
}

pub async fn list_core_namespaced(
    State(state): State<AppState>,
    Path((namespace, resources)): Path<(String, String)>,
    Query(params): Params,
) -> ListResponse {
    let gvr = GroupVersionResource::new("", "v1", &resources);
    list(&state, gvr, Some(&namespace), &params).await
}

pub async fn get_core_namespaced(
    State(state): State<AppState>,
    Path((namespace, resources, name)): Path<(String, String, String)>,
) -> GetResponse {
    let gvr = GroupVersionResource::new("", "v1", &resources);
    get(&state, gvr, Some(&namespace), &name).await
}

pub async fn list_group(
    State(state): State<AppState>,
    Path((group, version, resources)): Path<(String, String, String)>,
    Query(params): Params,
) -> ListResponse {
    let gvr = GroupVersionResource::new(&group, &version, &resources);
    list(&state, gvr, None, &params).await
}

pub async fn list_group_namespaced(
    State(state): State<AppState>,
    Path((group, version, namespace, resources)): Path<(String, String, String, String)>,
    Query(params): Params,
) -> ListResponse {
    let gvr = GroupVersionResource::new(&group, &version, &resources);
    list(&state, gvr, Some(&namespace), &params).await
}

pub async fn get_group_namespaced(
    State(state): State<AppState>,
    Path((group, version, namespace, resources, name)): Path<(String, String, String, String, String)>,
) -> GetResponse {
    let gvr = GroupVersionResource::new(&group, &version, &resources);
    get(&state, gvr, Some(&namespace), &name).await
}

pub async fn get_cluster(State(state): State<AppState>, Path((resources, name)): Path<(String, String)>) -> GetResponse {
    let gvr = lookup(&state, &resources)?;
    get(&state, gvr, None, &name).await
}

pub async fn get_core(State(state): State<AppState>, Path((resources, name)): Path<(String, String)>) -> GetResponse {
    get(&state, GroupVersionResource::new("", "v1", &resources), None, &name).await
}

pub async fn get_group(
    State(state): State<AppState>,
    Path((group, version, resources, name)): Path<(String, String, String, String)>,
) -> GetResponse {
    let gvr = GroupVersionResource::new(&group, &version, &resources);
    get(&state, gvr, None, &name).await
}
