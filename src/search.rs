//! Paginated search against the index's query endpoint.
//!
//! Pages are fetched strictly in sequence with a skip/take cursor. The loop
//! ends on the first short page; the offset ceiling only guards against an
//! upstream that never returns one.
use crate::http::{JsonReply, JsonSource};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entries requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 200;
/// Highest offset a request may be issued at.
pub const DEFAULT_MAX_OFFSET: usize = 2000;

const INCLUDE_PRERELEASE: &str = "true";
const SEMVER_LEVEL: &str = "2.0.0";

/// Download count for one published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDownloads {
    pub version: String,
    pub downloads: u64,
}

/// A search hit with every optional field already defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub id: String,
    pub total_downloads: u64,
    pub version: String,
    pub versions: Vec<VersionDownloads>,
}

impl SearchEntry {
    /// Normalize one untrusted search hit. Hits without a usable id are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())?
            .to_string();
        let versions = value
            .get("versions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.is_object())
                    .map(|item| VersionDownloads {
                        version: text_field(item.get("version")),
                        downloads: count_field(item.get("downloads")),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            id,
            total_downloads: count_field(value.get("totalDownloads")),
            version: text_field(value.get("version")),
            versions,
        })
    }
}

fn text_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Non-negative integer, or a non-negative float truncated; anything else is 0.
fn count_field(value: Option<&Value>) -> u64 {
    let Some(Value::Number(number)) = value else {
        return 0;
    };
    number
        .as_u64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|count| count.is_finite() && *count >= 0.0)
                .map(|count| count as u64)
        })
        .unwrap_or(0)
}

/// Query and paging limits for one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page_size: usize,
    pub max_offset: usize,
}

/// Why the paging loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A page came back shorter than the page size.
    Exhausted,
    /// The next offset would have exceeded the ceiling.
    CeilingReached { next_offset: usize },
}

/// Accumulated entries across all fetched pages, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub entries: Vec<SearchEntry>,
    pub pages: usize,
    pub termination: Termination,
}

/// Build the search URL for one page.
pub fn search_url(endpoint: &str, query: &str, skip: usize, take: usize) -> String {
    let encoded = url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>();
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{separator}q={encoded}&skip={skip}&take={take}\
         &prerelease={INCLUDE_PRERELEASE}&semVerLevel={SEMVER_LEVEL}"
    )
}

/// Fetch a single page and return its raw `data` members.
fn fetch_raw_page(
    source: &dyn JsonSource,
    endpoint: &str,
    query: &str,
    skip: usize,
    take: usize,
) -> Result<Vec<Value>> {
    let url = search_url(endpoint, query, skip, take);
    match source.get_json(&url)? {
        JsonReply::Body(Value::Object(mut body)) => match body.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Ok(Vec::new()),
        },
        JsonReply::Body(_) => Ok(Vec::new()),
        JsonReply::Status(status) => bail!("search failed ({query}): {status}"),
    }
}

/// Fetch one page of normalized entries.
pub fn search_page(
    source: &dyn JsonSource,
    endpoint: &str,
    query: &str,
    skip: usize,
    take: usize,
) -> Result<Vec<SearchEntry>> {
    let page = fetch_raw_page(source, endpoint, query, skip, take)?;
    Ok(page.iter().filter_map(SearchEntry::from_value).collect())
}

/// Offset of the next page, or `None` once it would pass `max_offset`.
fn advance(skip: usize, page_size: usize, max_offset: usize) -> Option<usize> {
    let next = skip.checked_add(page_size)?;
    (next <= max_offset).then_some(next)
}

/// Page through every result for `params.query`.
///
/// Any failed request aborts the whole search; there is no partial result.
pub fn search_all(
    source: &dyn JsonSource,
    endpoint: &str,
    params: &SearchParams,
) -> Result<SearchOutcome> {
    if params.page_size == 0 {
        bail!("search page size must be positive");
    }
    let mut entries = Vec::new();
    let mut pages = 0;
    let mut skip = 0usize;

    let termination = loop {
        let page = fetch_raw_page(source, endpoint, &params.query, skip, params.page_size)?;
        pages += 1;
        let page_len = page.len();
        entries.extend(page.iter().filter_map(SearchEntry::from_value));
        tracing::debug!(query = %params.query, skip, page_len, "search page fetched");

        if page_len < params.page_size {
            break Termination::Exhausted;
        }
        match advance(skip, params.page_size, params.max_offset) {
            Some(next) => skip = next,
            None => {
                let next_offset = skip.saturating_add(params.page_size);
                tracing::warn!(
                    query = %params.query,
                    next_offset,
                    max_offset = params.max_offset,
                    "search stopped at offset ceiling before results were exhausted"
                );
                break Termination::CeilingReached { next_offset };
            }
        }
    };

    tracing::info!(
        query = %params.query,
        pages,
        entries = entries.len(),
        "search complete"
    );
    Ok(SearchOutcome {
        entries,
        pages,
        termination,
    })
}
