//! Response envelopes
//!
//! The backend answers either with a bare value or with the value wrapped under a
//! named key (`{"users": [...]}`, `{"group": {...}, "message": "..."}`). Both forms are
//! accepted here so the rest of the crate only ever sees typed entities.

use gatekeeper_core::{ErrorContext, GatekeeperError, GatekeeperResult, Session, User};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

fn decode_error(endpoint: &str, error: serde_json::Error) -> GatekeeperError {
    GatekeeperError::Decode {
        endpoint: endpoint.to_string(),
        message: error.to_string(),
        source: Some(Box::new(error)),
        context: ErrorContext::new("schema").with_operation("decode"),
    }
}

fn unwrap_key(value: Value, key: &str, accept: fn(&Value) -> bool) -> Value {
    match value {
        Value::Object(mut map) if map.get(key).is_some_and(accept) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a list answer, bare or wrapped under `key`
pub fn decode_list<T: DeserializeOwned>(
    value: Value,
    key: &str,
    endpoint: &str,
) -> GatekeeperResult<Vec<T>> {
    let value = unwrap_key(value, key, Value::is_array);
    serde_json::from_value(value).map_err(|e| decode_error(endpoint, e))
}

/// Decode a single-entity answer, bare or wrapped under `key`
pub fn decode_entity<T: DeserializeOwned>(
    value: Value,
    key: &str,
    endpoint: &str,
) -> GatekeeperResult<T> {
    let value = unwrap_key(value, key, Value::is_object);
    serde_json::from_value(value).map_err(|e| decode_error(endpoint, e))
}

#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    user: User,
    #[serde(default)]
    token: Option<String>,
}

/// Decode a register/login answer into the session to persist
pub fn decode_session(value: Value, endpoint: &str) -> GatekeeperResult<Session> {
    let envelope: AuthEnvelope =
        serde_json::from_value(value).map_err(|e| decode_error(endpoint, e))?;

    let session = Session {
        user: envelope.user,
        token: envelope.token,
    };

    if session.bearer_token().is_none() {
        return Err(GatekeeperError::Decode {
            endpoint: endpoint.to_string(),
            message: "response carried no session token".to_string(),
            source: None,
            context: ErrorContext::new("schema").with_operation("decode_session"),
        });
    }

    Ok(session)
}

/// Optional `message` field of a response body
pub fn message_of(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::{Group, PrincipalPermission};
    use serde_json::json;

    #[test]
    fn lists_decode_bare_or_wrapped() {
        let bare: Vec<Group> =
            decode_list(json!([{"id": 1, "name": "Ops"}]), "groups", "GET /api/groups")
                .expect("bare list");
        let wrapped: Vec<Group> = decode_list(
            json!({"groups": [{"id": 1, "name": "Ops"}]}),
            "groups",
            "GET /api/groups",
        )
        .expect("wrapped list");
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn entity_decodes_from_wrapper_with_message() {
        let group: Group = decode_entity(
            json!({"message": "Group created", "group": {"id": 9, "name": "Audit"}}),
            "group",
            "POST /api/groups",
        )
        .expect("wrapped entity");
        assert_eq!(group.id, 9);
        assert_eq!(group.name, "Audit");
    }

    #[test]
    fn malformed_list_is_a_decode_error() {
        let err = decode_list::<PrincipalPermission>(
            json!({"permissions": "nope"}),
            "permissions",
            "GET /api/me/permissions",
        )
        .unwrap_err();
        assert!(matches!(err, GatekeeperError::Decode { .. }));
    }

    #[test]
    fn session_token_from_either_place() {
        let session = decode_session(
            json!({"user": {"id": 1, "username": "root"}, "token": "t1"}),
            "POST /api/auth/login",
        )
        .expect("top-level token");
        assert_eq!(session.bearer_token(), Some("t1"));

        let session = decode_session(
            json!({"user": {"id": 1, "username": "root", "token": "t2"}}),
            "POST /api/auth/login",
        )
        .expect("embedded token");
        assert_eq!(session.bearer_token(), Some("t2"));

        assert!(decode_session(json!({"user": {"id": 1}}), "POST /api/auth/login").is_err());
    }
}
