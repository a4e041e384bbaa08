// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy for the listing engine
//!
//! The engine itself never fails. Errors come from type resolution
//! (unsupported resources), from the cache layer (not found, transport),
//! and from request parsing (label selectors). They are returned as-is to
//! the caller; nothing here retries or annotates.

use crate::kubernetes::{GroupVersionResource, MapperError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the REST mapper nor the fallback table knows this resource
    #[error("not support type: {0}")]
    NotSupportedType(GroupVersionResource),

    /// The object does not exist in the cache
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    /// The in-memory cache has not finished its initial list for this resource
    #[error("cache not synced for {0}")]
    NotSynced(GroupVersionResource),

    /// A short name or plural that is not present in the registry
    #[error("unknown resource: '{0}'")]
    UnknownResource(String),

    #[error("invalid label selector: {0}")]
    InvalidLabelSelector(String),

    /// REST mapper failure other than "no match"
    #[error("rest mapper: {0}")]
    Mapper(#[from] MapperError),

    #[error("failed to decode object: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl Error {
    pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// Whether this error was caused by the request rather than the backend
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotSupportedType(_) | Self::UnknownResource(_) | Self::InvalidLabelSelector(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }
}
