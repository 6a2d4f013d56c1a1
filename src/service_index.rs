//! Service index parsing and capability resolution.
//!
//! The index is a list of resources, each tagged with one or more capability
//! types. Resolution is declaration-ordered: the first resource carrying a tag
//! that starts with the requested prefix wins.
use crate::http::{JsonReply, JsonSource};
use anyhow::{bail, Result};
use serde_json::Value;

/// Parsed service index, one entry per object in `resources`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceIndex {
    pub resources: Vec<ServiceResource>,
}

/// One resource record from the index. `endpoint` is `None` when `@id` is
/// absent or not a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResource {
    pub endpoint: Option<String>,
    pub types: Vec<String>,
}

impl ServiceIndex {
    /// Build an index from an untrusted JSON document.
    ///
    /// A missing or malformed `resources` field yields an empty index, which
    /// later surfaces as an unresolved capability rather than a parse error.
    pub fn from_value(value: &Value) -> Self {
        let resources = value
            .get("resources")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(ServiceResource::from_value)
                    .collect()
            })
            .unwrap_or_default();
        Self { resources }
    }
}

impl ServiceResource {
    fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let endpoint = value.get("@id").and_then(Value::as_str);
        Some(Self {
            endpoint: endpoint.map(str::to_string),
            types: capability_types(value.get("@type")),
        })
    }
}

/// Normalize an `@type` field that may be a string, a list, or absent.
fn capability_types(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(tag)) => vec![tag.clone()],
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Return the endpoint of the first resource with a tag starting with `prefix`.
///
/// Resolution stops at that first match; if it has no usable `@id` the
/// capability is unresolved.
pub fn resolve_endpoint<'a>(index: &'a ServiceIndex, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.to_lowercase();
    index
        .resources
        .iter()
        .find(|resource| {
            resource
                .types
                .iter()
                .any(|tag| tag.to_lowercase().starts_with(&prefix))
        })
        .and_then(|resource| resource.endpoint.as_deref())
}

/// Fetch and parse the service index at `url`.
pub fn fetch_service_index(source: &dyn JsonSource, url: &str) -> Result<ServiceIndex> {
    match source.get_json(url)? {
        JsonReply::Body(value) => {
            let index = ServiceIndex::from_value(&value);
            tracing::debug!(
                url,
                resources = index.resources.len(),
                "service index loaded"
            );
            Ok(index)
        }
        JsonReply::Status(status) => bail!("service index failed: {status}"),
    }
}
