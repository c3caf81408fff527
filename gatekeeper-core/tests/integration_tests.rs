//! Integration tests for gatekeeper-core infrastructure

use gatekeeper_core::{
    config_error, init_logging, run_cancellable, storage_error, validation_error, Action,
    CancelToken, ErrorContext, GatekeeperConfig, GatekeeperError, Group, LogFormat,
    LoggingConfig, Permission, Resource, Role, User,
};

#[tokio::test]
async fn test_error_handling() {
    let error = config_error!("Invalid config", "test_component");

    match &error {
        GatekeeperError::Config {
            message, context, ..
        } => {
            assert_eq!(message, "Invalid config");
            assert_eq!(context.component, "test_component");
            assert_eq!(context.recovery_suggestions.len(), 2);
        }
        _ => panic!("Expected Config error"),
    }

    // Logging an error must never panic, subscriber or not
    error.log();
    storage_error!("locked", "session").log();
    validation_error!("empty", "name", "drafts").log();

    let auth = GatekeeperError::Authentication {
        message: "jwt expired".to_string(),
        context: ErrorContext::new("transport"),
    };
    assert!(auth.is_authentication_failure());
    assert_eq!(auth.status(), Some(401));
    assert_eq!(auth.user_message(), "jwt expired");
}

#[tokio::test]
async fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        filter_directives: vec!["gatekeeper_core=debug".to_string()],
        ..LoggingConfig::default()
    };

    // The global subscriber can only be installed once per process, so a second
    // call has to report an error instead of panicking.
    let first = init_logging(&config);
    let second = init_logging(&config);
    assert!(first.is_ok() || second.is_err());
    assert!(second.is_err());
}

#[tokio::test]
async fn test_cancellation_is_observable_by_every_clone() {
    let view_token = CancelToken::new();
    let request_token = view_token.clone();

    view_token.cancel();

    let result = run_cancellable(async { Ok::<_, GatekeeperError>(()) }, &request_token, "fetch")
        .await;
    assert!(matches!(result, Err(GatekeeperError::Cancelled { operation }) if operation == "fetch"));
}

#[test]
fn test_resource_routes() {
    assert_eq!(User::PATH, "/api/users");
    assert_eq!(Group::item_path(4), "/api/groups/4");
    assert_eq!(Role::COLLECTION, "roles");
    assert_eq!(Permission::MODULE, "Permissions");
}

#[test]
fn test_permission_entity_wire_format() {
    let permission: Permission = serde_json::from_str(
        r#"{"id":5,"action":"update","module_id":2,"module":{"id":2,"name":"Users"}}"#,
    )
    .expect("permission parses");

    assert_eq!(permission.action, Action::Update);
    assert_eq!(permission.module_name(), Some("Users"));

    let json = serde_json::to_value(&permission).expect("permission serializes");
    assert_eq!(json["action"], "update");
    assert!(json.get("created_at").is_none());
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = GatekeeperConfig::default();
    let text = toml::to_string_pretty(&config).expect("serializes");
    let parsed = GatekeeperConfig::from_toml_str(&text).expect("parses");
    assert_eq!(parsed, config);
}
