pub mod human;

use serde_json::{Value, json};

use crate::error::Error;

/// Standard JSON envelope for every command.
pub fn success(command: &str, data: Value) -> Value {
    json!({
        "status": "ok",
        "command": command,
        "data": data,
        "error": null
    })
}

pub fn error(command: &str, code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "command": command,
        "data": null,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Envelope for an arbitrary failure, keeping the engine's error code when
/// the failure came from it.
pub fn from_error(command: &str, err: &anyhow::Error) -> Value {
    let code = err
        .downcast_ref::<Error>()
        .map(Error::code)
        .unwrap_or("general_error");
    error(command, code, &err.to_string())
}
