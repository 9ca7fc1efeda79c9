use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::runtime::listing::{list_records, DisplayNameLookup, ListQuery, ListingScope};
use crate::runtime::record::RecordStatus;
use crate::runtime::store::KvStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

pub fn handle_list_event<K, N>(
    event: Value,
    scope: ListingScope,
    kv: &K,
    names: &N,
) -> ApiGatewayResponse
where
    K: KvStore + ?Sized,
    N: DisplayNameLookup + ?Sized,
{
    let empty = Map::new();
    let params = event
        .get("queryStringParameters")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let query = match parse_list_query(params) {
        Ok(query) => query,
        Err(error) => {
            return error_response(
                400,
                json!({
                    "error": "validation_error",
                    "message": error.to_string(),
                }),
            )
        }
    };

    match list_records(kv, scope, &query, names) {
        Ok(page) => success_response(200, &page),
        Err(error) => {
            tracing::error!(component = "list_handler", %error, "listing failed");
            error_response(
                502,
                json!({
                    "error": "store_unavailable",
                    "message": error.to_string(),
                }),
            )
        }
    }
}

pub fn parse_list_query(params: &Map<String, Value>) -> Result<ListQuery, QueryError> {
    let text = |name: &str| {
        params
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let status = match text("status") {
        Some(value) => Some(
            RecordStatus::parse(value)
                .ok_or_else(|| QueryError::UnknownStatus(value.to_string()))?,
        ),
        None => None,
    };

    Ok(ListQuery {
        status,
        category: text("category").map(str::to_string),
        search: text("search").map(str::to_string),
        page: parse_number("page", text("page"))?,
        page_size: parse_number("pageSize", text("pageSize"))?,
    })
}

fn parse_number(name: &'static str, value: Option<&str>) -> Result<Option<usize>, QueryError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        _ => Err(QueryError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}

fn success_response(status_code: u16, payload: &impl Serialize) -> ApiGatewayResponse {
    match serde_json::to_string(payload) {
        Ok(body) => ApiGatewayResponse {
            status_code,
            headers: json!({"Content-Type": "application/json"}),
            body,
        },
        Err(error) => error_response(
            500,
            json!({
                "error": "serialization_error",
                "message": error.to_string(),
            }),
        ),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: payload.to_string(),
    }
}
