//! Collection response decoding
//!
//! List endpoints answer either with a bare JSON array or with a paginated
//! envelope `{count, next, previous, results}`. Everything is normalized here
//! so callers always receive a plain sequence of records.

use serde_json::Value;
use tracing::warn;

use super::errors::ApiError;
use crate::models::Record;

/// One decoded page of a collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub records: Vec<Record>,
    /// Total size reported by the envelope, if any
    pub count: Option<u64>,
    /// Absolute URL of the next server page
    pub next: Option<String>,
    pub previous: Option<String>,
}

pub fn decode_list(endpoint: &str, body: Value) -> Result<ListPage, ApiError> {
    match body {
        Value::Null => Ok(ListPage::default()),
        Value::Array(items) => Ok(ListPage {
            records: decode_records(endpoint, items),
            ..ListPage::default()
        }),
        Value::Object(mut map) => {
            let items = match map.remove("results") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => Vec::new(),
                Some(other) => {
                    return Err(ApiError::Decode {
                        endpoint: endpoint.to_string(),
                        reason: format!("'results' is not an array: {}", other),
                    })
                }
                None => {
                    return Err(ApiError::Decode {
                        endpoint: endpoint.to_string(),
                        reason: "object response without 'results'".to_string(),
                    })
                }
            };

            Ok(ListPage {
                records: decode_records(endpoint, items),
                count: map.get("count").and_then(Value::as_u64),
                next: link(&map, "next"),
                previous: link(&map, "previous"),
            })
        }
        other => Err(ApiError::Decode {
            endpoint: endpoint.to_string(),
            reason: format!("expected a list, got {}", other),
        }),
    }
}

/// Decode a single-record body (GET/POST/PUT responses)
pub fn decode_record(endpoint: &str, body: Value) -> Result<Record, ApiError> {
    Record::from_value(body).ok_or_else(|| ApiError::Decode {
        endpoint: endpoint.to_string(),
        reason: "record without an integer id".to_string(),
    })
}

fn decode_records(endpoint: &str, items: Vec<Value>) -> Vec<Record> {
    let total = items.len();
    let records: Vec<Record> = items.into_iter().filter_map(Record::from_value).collect();
    if records.len() < total {
        warn!(
            "Skipped {} of {} items from {} without an integer id",
            total - records.len(),
            total,
            endpoint
        );
    }
    records
}

fn link(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
