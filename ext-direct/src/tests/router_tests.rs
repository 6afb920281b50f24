//! Router tests: classification, validation, batching, output formatting,
//! and descriptor publishing.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};

use crate::call::{CallArg, InvocationResult};
use crate::config::{ApiConfig, DirectConfig};
use crate::error::{ConfigError, HandlerError, RouteError};
use crate::registry::{Action, ActionRegistry, Method};
use crate::router::Router;
use crate::session::MemorySessionStore;
use crate::token::{SET_TOKEN1_HEADER, SET_TOKEN2_HEADER, TOKEN1_COOKIE};
use crate::transport::{DirectRequest, UploadedFile};
use crate::{CacheStore, MemoryStore};

// =============================================================================
// Test Handlers
// =============================================================================

fn int_arg(args: &[CallArg], index: usize) -> i64 {
    args.get(index)
        .and_then(CallArg::value)
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

/// Encode bound arguments so tests can assert on the binding outcome.
fn describe_args(args: &[CallArg]) -> Value {
    Value::Array(
        args.iter()
            .map(|arg| match arg {
                CallArg::Value(v) => v.clone(),
                CallArg::File(f) => json!({"file": f.file_name, "size": f.size()}),
            })
            .collect(),
    )
}

fn test_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register(
        Action::new("Foo").method(
            Method::new("bar", |args: Vec<CallArg>| async move {
                Ok(json!(int_arg(&args, 0) + int_arg(&args, 1)))
            })
            .with_len(2),
        ),
    );

    registry.register(
        Action::new("Calculator")
            .method(Method::new("echo", |args: Vec<CallArg>| async move {
                Ok(describe_args(&args))
            }))
            .method(Method::new("fail", |_args: Vec<CallArg>| async move {
                Err::<Value, _>(HandlerError::new("intentional failure").with_trace("at fail"))
            })),
    );

    registry.register(
        Action::new("Profile").method(
            Method::new("update", |args: Vec<CallArg>| async move {
                Ok(describe_args(&args))
            })
            .form_handler()
            .with_param("a")
            .with_param("fileField")
            .with_param_default("b", json!("default")),
        ),
    );

    registry.register(
        Action::new("Wrapped")
            .method(
                Method::new("get", |_args: Vec<CallArg>| async move { Ok(json!(41)) })
                    .with_transform(|_meta, result, error| match error {
                        None => Ok(json!({"success": true, "data": result})),
                        Some(err) => Ok(json!({"success": false, "message": err.message})),
                    }),
            )
            .method(
                Method::new("explode", |_args: Vec<CallArg>| async move {
                    Err::<Value, _>(HandlerError::new("inner failure"))
                })
                .with_transform(|_meta, result, error| match error {
                    None => Ok(json!({"success": true, "data": result})),
                    Some(err) => Ok(json!({"success": false, "message": err.message})),
                }),
            )
            .method(
                Method::new("broken", |_args: Vec<CallArg>| async move { Ok(json!(1)) })
                    .with_transform(|_meta, _result, _error| {
                        Err(HandlerError::new("transform failure"))
                    }),
            ),
    );

    registry
}

fn test_router() -> Router {
    Router::new(
        Arc::new(test_registry()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySessionStore::new()),
        DirectConfig::new().with_api(
            ApiConfig::new()
                .with_url("http://x/router")
                .with_id("app"),
        ),
    )
    .unwrap()
}

fn parse_single(body: &str) -> InvocationResult {
    serde_json::from_str(body).unwrap()
}

fn parse_batch(body: &str) -> Vec<InvocationResult> {
    serde_json::from_str(body).unwrap()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_empty_registry_is_fatal() {
    let result = Router::new(
        Arc::new(ActionRegistry::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySessionStore::new()),
        DirectConfig::new().with_api(ApiConfig::new().with_url("/r")),
    );
    assert!(matches!(result, Err(ConfigError::NoActions)));
}

#[test]
fn test_missing_url_is_fatal() {
    let result = Router::new(
        Arc::new(test_registry()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySessionStore::new()),
        DirectConfig::new(),
    );
    assert!(matches!(
        result,
        Err(ConfigError::MissingApiProperty("url"))
    ));
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn test_form_classification() {
    assert!(Router::is_form_request(&DirectRequest::form([(
        "extAction", "Profile"
    )])));
    assert!(Router::is_form_request(&DirectRequest::multipart([(
        "extAction", "Profile"
    )])));
    assert!(!Router::is_form_request(&DirectRequest::json("{}")));
    assert!(!Router::is_form_request(&DirectRequest::default()));
}

#[test]
fn test_upload_classification() {
    let file = UploadedFile::new("f", "a.txt", "text/plain", b"hi".to_vec());

    // Multipart alone is not an upload; it needs at least one file.
    assert!(!Router::is_upload(&DirectRequest::multipart([("x", "1")])));
    assert!(Router::is_upload(
        &DirectRequest::multipart([("x", "1")]).with_upload(file.clone())
    ));
    // Files on a urlencoded request do not make it an upload.
    assert!(!Router::is_upload(
        &DirectRequest::form([("x", "1")]).with_upload(file)
    ));
}

// =============================================================================
// JSON routing
// =============================================================================

#[tokio::test]
async fn test_single_call_yields_bare_object() {
    let router = test_router();
    let request = DirectRequest::json(
        r#"{"type":"rpc","action":"Foo","method":"bar","data":[1,2],"tid":7}"#,
    );

    let response = router.route(&request).await.unwrap();
    assert_eq!(response.content_type, "application/json");

    let result = parse_single(&response.body);
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"action": "Foo", "method": "bar", "result": 3, "type": "rpc", "tid": 7})
    );
}

#[tokio::test]
async fn test_batch_yields_array_in_input_order() {
    let router = test_router();
    let request = DirectRequest::json(
        r#"[
            {"type":"rpc","action":"Foo","method":"bar","data":[1,2],"tid":1},
            {"type":"rpc","action":"Calculator","method":"echo","data":["a"],"tid":2},
            {"type":"rpc","action":"Foo","method":"bar","data":[10,20],"tid":3}
        ]"#,
    );

    let response = router.route(&request).await.unwrap();
    let results = parse_batch(&response.body);

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].tid, json!(1));
    assert_eq!(results[1].tid, json!(2));
    assert_eq!(results[2].tid, json!(3));
    assert_eq!(results[0].result(), Some(&json!(3)));
    assert_eq!(results[2].result(), Some(&json!(30)));
}

#[tokio::test]
async fn test_handler_failure_is_isolated_per_call() {
    let router = test_router();
    let request = DirectRequest::json(
        r#"[
            {"type":"rpc","action":"Foo","method":"bar","data":[1,2],"tid":1},
            {"type":"rpc","action":"Calculator","method":"fail","data":null,"tid":2},
            {"type":"rpc","action":"Foo","method":"bar","data":[3,4],"tid":3}
        ]"#,
    );

    let response = router.route(&request).await.unwrap();
    let results = parse_batch(&response.body);

    assert!(results[0].is_rpc());
    assert!(results[1].is_exception());
    assert!(results[2].is_rpc());

    let encoded = serde_json::to_value(&results[1]).unwrap();
    assert_eq!(encoded["message"], "intentional failure");
    assert_eq!(encoded["trace"], "at fail");
}

#[tokio::test]
async fn test_unknown_action_aborts_whole_batch() {
    let router = test_router();
    let request = DirectRequest::json(
        r#"[
            {"type":"rpc","action":"Foo","method":"bar","data":[1,2],"tid":1},
            {"type":"rpc","action":"Nope","method":"bar","data":[],"tid":2}
        ]"#,
    );

    let result = router.route(&request).await;
    assert!(matches!(result, Err(RouteError::UnknownAction(a)) if a == "Nope"));
}

#[tokio::test]
async fn test_disallowed_method_aborts_whole_batch() {
    let router = test_router();
    let request = DirectRequest::json(
        r#"{"type":"rpc","action":"Foo","method":"secret","data":[],"tid":1}"#,
    );

    let result = router.route(&request).await;
    assert!(matches!(
        result,
        Err(RouteError::MethodNotAllowed { action, method })
            if action == "Foo" && method == "secret"
    ));
}

#[tokio::test]
async fn test_malformed_json_body() {
    let router = test_router();

    let result = router.route(&DirectRequest::json("not json")).await;
    assert!(matches!(result, Err(RouteError::MalformedBody(_))));

    let result = router.route(&DirectRequest::json("42")).await;
    assert!(matches!(result, Err(RouteError::MalformedBody(_))));
}

#[tokio::test]
async fn test_non_rpc_elements_are_skipped() {
    let router = test_router();
    let request = DirectRequest::json(
        r#"[
            {"type":"polling","name":"tick"},
            {"type":"rpc","action":"Foo","method":"bar","data":[2,3],"tid":5}
        ]"#,
    );

    let response = router.route(&request).await.unwrap();

    // One surviving call: bare object, not an array.
    let result = parse_single(&response.body);
    assert_eq!(result.result(), Some(&json!(5)));
    assert_eq!(result.tid, json!(5));
}

#[tokio::test]
async fn test_argument_count_mismatch_is_a_caller_error() {
    let router = test_router();
    let request =
        DirectRequest::json(r#"{"type":"rpc","action":"Foo","method":"bar","data":[1],"tid":1}"#);

    let response = router.route(&request).await.unwrap();
    let result = parse_single(&response.body);

    assert!(result.is_exception());
    let encoded = serde_json::to_value(&result).unwrap();
    assert!(
        encoded["message"]
            .as_str()
            .unwrap()
            .contains("expects 2 argument(s)")
    );
}

// =============================================================================
// Result transforms
// =============================================================================

#[tokio::test]
async fn test_transform_reshapes_success() {
    let router = test_router();
    let request =
        DirectRequest::json(r#"{"type":"rpc","action":"Wrapped","method":"get","tid":1}"#);

    let response = router.route(&request).await.unwrap();
    let result = parse_single(&response.body);
    assert_eq!(result.result(), Some(&json!({"success": true, "data": 41})));
}

#[tokio::test]
async fn test_transform_normalizes_handler_failure() {
    let router = test_router();
    let request =
        DirectRequest::json(r#"{"type":"rpc","action":"Wrapped","method":"explode","tid":1}"#);

    let response = router.route(&request).await.unwrap();
    let result = parse_single(&response.body);

    assert!(result.is_rpc());
    assert_eq!(
        result.result(),
        Some(&json!({"success": false, "message": "inner failure"}))
    );
}

#[tokio::test]
async fn test_transform_failure_aborts_request() {
    let router = test_router();
    let request =
        DirectRequest::json(r#"{"type":"rpc","action":"Wrapped","method":"broken","tid":1}"#);

    let result = router.route(&request).await;
    assert!(matches!(
        result,
        Err(RouteError::Transform { method, .. }) if method == "broken"
    ));
}

// =============================================================================
// Form routing
// =============================================================================

#[tokio::test]
async fn test_form_call_binds_fields_files_and_defaults() {
    let router = test_router();
    let request = DirectRequest::multipart([
        ("extAction", "Profile"),
        ("extMethod", "update"),
        ("extTID", "4"),
        ("extType", "rpc"),
        ("extUpload", "true"),
        ("a", "x"),
    ])
    .with_upload(UploadedFile::new(
        "fileField",
        "avatar.png",
        "image/png",
        vec![1, 2, 3],
    ));

    let response = router.route(&request).await.unwrap();
    assert_eq!(response.content_type, "text/html");
    assert!(response.body.starts_with("<html><body><textarea>"));
    assert!(response.body.ends_with("</textarea></body></html>"));

    let json_body = response
        .body
        .trim_start_matches("<html><body><textarea>")
        .trim_end_matches("</textarea></body></html>");
    let result = parse_single(json_body);

    // Three-tier binding: POST field, upload, declared default.
    assert_eq!(
        result.result(),
        Some(&json!(["x", {"file": "avatar.png", "size": 3}, "default"]))
    );
    assert_eq!(result.tid, json!("4"));
}

#[tokio::test]
async fn test_urlencoded_form_yields_json_response() {
    let router = test_router();
    let request = DirectRequest::form([
        ("extAction", "Profile"),
        ("extMethod", "update"),
        ("extTID", "9"),
        ("a", "hello"),
    ]);

    let response = router.route(&request).await.unwrap();
    assert_eq!(response.content_type, "application/json");

    let result = parse_single(&response.body);
    // No uploads and no default for the middle parameter: null.
    assert_eq!(result.result(), Some(&json!(["hello", null, "default"])));
}

#[tokio::test]
async fn test_form_missing_required_field() {
    let router = test_router();
    let request = DirectRequest::form([("extAction", "Profile"), ("extMethod", "update")]);

    let result = router.route(&request).await;
    assert!(matches!(
        result,
        Err(RouteError::MalformedBody(msg)) if msg.contains("extTID")
    ));
}

#[tokio::test]
async fn test_form_unknown_action() {
    let router = test_router();
    let request = DirectRequest::form([
        ("extAction", "Nope"),
        ("extMethod", "update"),
        ("extTID", "1"),
    ]);

    let result = router.route(&request).await;
    assert!(matches!(result, Err(RouteError::UnknownAction(_))));
}

#[tokio::test]
async fn test_upload_response_escapes_quot_entities() {
    let mut registry = test_registry();
    registry.register(
        Action::new("Html").method(
            Method::new("echo", |_args: Vec<CallArg>| async move {
                Ok(json!("&quot;quoted&quot;"))
            })
            .form_handler(),
        ),
    );
    let router = Router::new(
        Arc::new(registry),
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySessionStore::new()),
        DirectConfig::new().with_api(ApiConfig::new().with_url("/r")),
    )
    .unwrap();

    let request = DirectRequest::multipart([
        ("extAction", "Html"),
        ("extMethod", "echo"),
        ("extTID", "1"),
    ])
    .with_upload(UploadedFile::new("f", "f.bin", "application/octet-stream", vec![0]));

    let response = router.route(&request).await.unwrap();
    assert!(response.body.contains("\\&quot;quoted\\&quot;"));
}

// =============================================================================
// Descriptor publishing
// =============================================================================

#[tokio::test]
async fn test_api_publish_body_and_tokens() {
    let router = test_router();
    let response = router.api(&DirectRequest::default()).await.unwrap();

    assert_eq!(response.content_type, "text/javascript");
    assert!(response.body.starts_with("Ext.app.REMOTING_API={"));
    assert!(response.body.contains("\"url\":\"http://x/router\""));
    assert!(response.body.contains("\"type\":\"remoting\""));
    assert!(response.body.contains("Ext.define('Ext.overrides.data.Connection'"));

    let token1 = response.header(SET_TOKEN1_HEADER).unwrap();
    let token2 = response.header(SET_TOKEN2_HEADER).unwrap();
    assert_eq!(token1.len(), 32);
    assert_eq!(token2.len(), 32);

    assert_eq!(response.cookies.len(), 1);
    assert_eq!(response.cookies[0].name, TOKEN1_COOKIE);
    assert_eq!(response.cookies[0].value, token1);
}

#[tokio::test]
async fn test_api_publish_reuses_session_tokens() {
    let router = test_router();

    let first = router.api(&DirectRequest::default()).await.unwrap();
    let token1 = first.header(SET_TOKEN1_HEADER).unwrap().to_string();
    let token2 = first.header(SET_TOKEN2_HEADER).unwrap().to_string();

    // The client echoes the cookie; both tokens must be stable.
    let request = DirectRequest::default().with_cookie(TOKEN1_COOKIE, token1.clone());
    let second = router.api(&request).await.unwrap();

    assert_eq!(second.header(SET_TOKEN1_HEADER), Some(token1.as_str()));
    assert_eq!(second.header(SET_TOKEN2_HEADER), Some(token2.as_str()));
}

#[tokio::test]
async fn test_api_reflects_registry_within_ttl() {
    let router = test_router();

    let first = router.api(&DirectRequest::default()).await.unwrap();
    let second = router.api(&DirectRequest::default()).await.unwrap();

    // Same descriptor JSON both times: the class map came from the cache.
    let descriptor = |body: &str| -> String {
        body.split_once(';').unwrap().0.to_string()
    };
    assert_eq!(descriptor(&first.body), descriptor(&second.body));
}

// =============================================================================
// Property-Based Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any RPC batch of length K, the response has exactly K results,
    /// corresponding to the calls by position and by tid.
    #[test]
    fn prop_batch_ordering_and_tid_correlation(
        pairs in prop::collection::vec((0i64..1000, 0i64..1000), 1..12)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let router = test_router();

            let batch: Vec<Value> = pairs
                .iter()
                .enumerate()
                .map(|(i, (x, y))| {
                    json!({
                        "type": "rpc",
                        "action": "Foo",
                        "method": "bar",
                        "data": [x, y],
                        "tid": i,
                    })
                })
                .collect();
            let request = DirectRequest::json(serde_json::to_string(&batch).unwrap());

            let response = router.route(&request).await.unwrap();
            let results: Vec<InvocationResult> = if pairs.len() == 1 {
                vec![parse_single(&response.body)]
            } else {
                parse_batch(&response.body)
            };

            prop_assert_eq!(results.len(), pairs.len());
            for (i, (x, y)) in pairs.iter().enumerate() {
                prop_assert_eq!(&results[i].tid, &json!(i));
                prop_assert_eq!(results[i].result(), Some(&json!(x + y)));
            }
            Ok(())
        })?;
    }
}

// =============================================================================
// Cache interaction
// =============================================================================

#[tokio::test]
async fn test_routing_works_from_cached_class_map() {
    let registry = Arc::new(test_registry());
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    // Pre-warm the store through a first router, then route with a second
    // one sharing the store: the class map comes back from the cache.
    let config = DirectConfig::new().with_api(ApiConfig::new().with_url("/r").with_id("app"));
    let first = Router::new(
        registry.clone(),
        store.clone(),
        Arc::new(MemorySessionStore::new()),
        config.clone(),
    )
    .unwrap();
    first.api(&DirectRequest::default()).await.unwrap();
    assert!(store.contains("app").await);

    let second = Router::new(
        registry,
        store,
        Arc::new(MemorySessionStore::new()),
        config,
    )
    .unwrap();
    let response = second
        .route(&DirectRequest::json(
            r#"{"type":"rpc","action":"Foo","method":"bar","data":[4,5],"tid":1}"#,
        ))
        .await
        .unwrap();

    assert_eq!(parse_single(&response.body).result(), Some(&json!(9)));
}
