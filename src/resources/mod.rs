// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

pub mod getter;
pub mod handlers;
pub mod list;
pub mod reader;

pub use getter::{FallbackEntry, FallbackTable, ResourceGetter, ResourceInterface};
pub use handlers::{HandlerRegistry, ResourceHandler};
pub use list::{ListResult, default_compare, default_filter, default_list};
pub use reader::{ObjectType, Reader, ResolvedResource};
