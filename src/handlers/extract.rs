// handlers/extract.rs - request decoding shared by every handler

use axum::{
    async_trait,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::filter::Filters;
use crate::state::AppState;
use crate::validator::Validator;

/// A JSON body decoded strictly: one value, no unknown keys, bounded size.
///
/// Input types opt into unknown-key rejection with `#[serde(deny_unknown_fields)]`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T> FromRequest<AppState> for JsonBody<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.config.api.max_request_size_bytes;
        let bytes = axum::body::to_bytes(req.into_body(), limit)
            .await
            .map_err(|_| ApiError::bad_request(format!("body must not be larger than {} bytes", limit)))?;

        decode_json(&bytes).map(JsonBody)
    }
}

pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request("body must not be empty"));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::bad_request(describe_json_error(&e)))
}

fn describe_json_error(err: &serde_json::Error) -> String {
    let msg = err.to_string();
    let at = format!("at line {} column {}", err.line(), err.column());

    match err.classify() {
        Category::Syntax if msg.starts_with("trailing characters") => {
            "body must only contain a single JSON value".to_string()
        }
        Category::Data => match msg.strip_prefix("unknown field `") {
            Some(rest) => {
                let key = rest.split('`').next().unwrap_or_default();
                format!("body contains unknown key \"{}\"", key)
            }
            None => format!("body contains incorrect JSON type ({})", at),
        },
        Category::Syntax | Category::Eof | Category::Io => {
            format!("body contains badly-formed JSON ({})", at)
        }
    }
}

/// Parses a `:id` path segment. Anything but a positive integer is a 400.
pub fn read_id_param(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::bad_request("invalid id parameter")),
    }
}

pub type QueryString = HashMap<String, String>;

pub fn read_string(qs: &QueryString, key: &str, default: &str) -> String {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

/// Optional text filter; an empty value means "no filter".
pub fn read_optional_string(qs: &QueryString, key: &str) -> Option<String> {
    qs.get(key).filter(|s| !s.is_empty()).cloned()
}

pub fn read_int(qs: &QueryString, key: &str, default: i64, v: &mut Validator) -> i64 {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
        _ => default,
    }
}

pub fn read_optional_int(qs: &QueryString, key: &str, v: &mut Validator) -> Option<i32> {
    match qs.get(key) {
        Some(value) if !value.is_empty() => match value.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                v.add_error(key, "must be an integer value");
                None
            }
        },
        _ => None,
    }
}

/// `page`, `page_size` and `sort` with the resource's defaults applied.
pub fn read_filters(
    qs: &QueryString,
    v: &mut Validator,
    default_page_size: i64,
    default_sort: &str,
    safelist: &'static [&'static str],
) -> Filters {
    Filters::new(
        read_int(qs, "page", 1, v),
        read_int(qs, "page_size", default_page_size, v),
        read_string(qs, "sort", default_sort),
        safelist,
    )
}
