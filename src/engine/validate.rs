// src/engine/validate.rs

use serde_json::Value;

use crate::engine::error::RequestError;
use crate::engine::ExecutionRequest;

/// Turn a raw request body into an [`ExecutionRequest`].
///
/// Checks, in order: valid JSON, a JSON object, a string `code` field
/// (`source` is accepted when `code` is absent), and non-blank content.
pub fn parse_request(body: &[u8]) -> Result<ExecutionRequest, RequestError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| RequestError::InvalidJson)?;

    let fields = match payload {
        Value::Object(fields) => fields,
        _ => return Err(RequestError::NotAnObject),
    };

    let code = fields.get("code").or_else(|| fields.get("source"));

    match code {
        Some(Value::String(source)) => ExecutionRequest::new(source.clone()),
        _ => Err(RequestError::CodeNotString),
    }
}
