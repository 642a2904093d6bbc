use serde_json::Value;

use crate::{Configuration, ErrorCode, ExpectedContent, JobError};

/// Credentials must be present when the request authenticates.
pub fn check_input(requires_auth: bool, config: &dyn Configuration) -> Result<(), JobError> {
    if !requires_auth {
        return Ok(());
    }
    if config.username().is_empty() {
        return Err(JobError::new(ErrorCode::MissingUser));
    }
    if config.password().is_empty() {
        return Err(JobError::new(ErrorCode::MissingPassword));
    }
    Ok(())
}

/// Validates a raw response body against the expected content and decodes
/// it.
///
/// Returns `Value::Null` when no content is expected.
pub fn check_output(expected: ExpectedContent, body: &[u8]) -> Result<Value, JobError> {
    if expected == ExpectedContent::Empty {
        return Ok(Value::Null);
    }

    if body.is_empty() {
        return Err(JobError::new(ErrorCode::EmptyReply));
    }

    let document: Value = serde_json::from_slice(body)
        .map_err(|err| JobError::with_text(ErrorCode::JsonParseError, err.to_string()))?;

    let is_empty = match &document {
        Value::Null => return Err(JobError::new(ErrorCode::EmptyJson)),
        Value::Array(items) if expected == ExpectedContent::JsonArray => items.is_empty(),
        Value::Object(map) if expected == ExpectedContent::JsonObject => map.is_empty(),
        _ => return Err(JobError::new(ErrorCode::WrongOutputType)),
    };

    if is_empty {
        return Err(JobError::new(ErrorCode::EmptyJson));
    }
    Ok(document)
}
