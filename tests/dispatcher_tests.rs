//! Tests for `Router::serve` dispatch
//!
//! # Test Coverage
//!
//! - End-to-end: params captured and written to the response
//! - NoHandlerFound for unmatched method or middleware-only matches
//! - Terminal selection (first in discovery order) and matched-route recording
//! - Handler failure propagation, response transforms, additional data

use cascade_router::{
    DispatchError, RawRequest, RequestContext, Response, ResponseBuilder, Router, RouterOptions,
};
use serde_json::{json, Value};
use std::sync::Arc;

mod common;
use common::recorder::EventLog;
use common::tracing_init;

fn users_router() -> Router {
    let mut router = Router::new();
    router
        .get("/users/:id", |ctx, res, _data| async move {
            res.insert("id", json!(ctx.param("id")));
            Ok(())
        })
        .unwrap();
    router
}

#[tokio::test]
async fn test_end_to_end_get_with_param() {
    tracing_init::init();
    let router = users_router();
    let out = router
        .serve(RawRequest::new("GET", "/users/42"), Value::Null)
        .await
        .unwrap();
    assert_eq!(out["status"], 200);
    assert_eq!(out["body"]["id"], "42");
}

#[tokio::test]
async fn test_end_to_end_wrong_method_is_not_found() {
    let router = users_router();
    let err = router
        .serve(RawRequest::new("POST", "/users/42"), Value::Null)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    match err {
        DispatchError::NoHandlerFound { method, path } => {
            assert_eq!(method, "POST");
            assert_eq!(path, "/users/42");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_method_is_case_insensitive() {
    let router = users_router();
    let out = router
        .serve(RawRequest::new("get", "/users/7/"), Value::Null)
        .await
        .unwrap();
    assert_eq!(out["body"]["id"], "7");
}

#[tokio::test]
async fn test_middleware_only_match_produces_no_response() {
    let log = EventLog::new();
    let mut router = Router::new();
    let mw_log = log.clone();
    router
        .middleware("/anything", move |_ctx, _res, _data| {
            let log = mw_log.clone();
            async move {
                log.push("middleware");
                Ok(())
            }
        })
        .unwrap();

    let err = router
        .serve(RawRequest::new("GET", "/anything"), Value::Null)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    // Nothing ran: selection happens before any middleware
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_first_terminal_in_discovery_order_wins() {
    let mut nested = Router::new();
    nested
        .get("/page", |_ctx, res, _data| async move {
            res.insert("winner", json!("nested"));
            Ok(())
        })
        .unwrap();

    let mut router = Router::new();
    router.mount("/", nested).unwrap();
    router
        .get("/page", |_ctx, res, _data| async move {
            res.insert("winner", json!("root"));
            Ok(())
        })
        .unwrap();

    let out = router
        .serve(RawRequest::new("GET", "/page"), Value::Null)
        .await
        .unwrap();
    assert_eq!(out["body"]["winner"], "nested");
}

#[tokio::test]
async fn test_matched_route_is_recorded() {
    let router = users_router();
    let ctx = Arc::new(RequestContext::new(RawRequest::new("GET", "/users/9"), Value::Null));
    let res = Arc::new(ResponseBuilder::new());
    assert!(res.matched_route().is_none());
    assert!(ctx.params().is_none());

    router.serve_with(Arc::clone(&ctx), Arc::clone(&res)).await.unwrap();

    let route = res.matched_route().unwrap();
    assert_eq!(route.normalized_path(), "/users/:id/");
    assert_eq!(ctx.param("id"), Some("9"));
}

#[tokio::test]
async fn test_context_cannot_be_dispatched_twice() {
    let router = users_router();
    let ctx = Arc::new(RequestContext::new(RawRequest::new("GET", "/users/1"), Value::Null));
    let res = Arc::new(ResponseBuilder::new());
    router.serve_with(Arc::clone(&ctx), Arc::clone(&res)).await.unwrap();

    let err = router
        .serve_with(Arc::clone(&ctx), Arc::new(ResponseBuilder::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ContextAlreadyDispatched));
    assert_eq!(ctx.param("id"), Some("1"));
}

#[tokio::test]
async fn test_reused_response_builder_leaves_new_context_untouched() {
    let router = users_router();
    let res = Arc::new(ResponseBuilder::new());
    let first = Arc::new(RequestContext::new(RawRequest::new("GET", "/users/1"), Value::Null));
    router.serve_with(first, Arc::clone(&res)).await.unwrap();

    let second = Arc::new(RequestContext::new(RawRequest::new("GET", "/users/2"), Value::Null));
    let err = router
        .serve_with(Arc::clone(&second), Arc::clone(&res))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ContextAlreadyDispatched));
    assert!(second.params().is_none());
    assert_eq!(res.body()["id"], "1");
}

#[tokio::test]
async fn test_handler_replaces_payload_with_json_response() {
    let mut router = Router::new();
    router
        .middleware("/items", |_ctx, res, _data| async move {
            res.set_header("x-trace", "mw");
            Ok(())
        })
        .unwrap();
    router
        .post("/items", |_ctx, res, _data| async move {
            res.with_payload(|payload| *payload = Response::json(201, json!({ "created": true })));
            Ok(())
        })
        .unwrap();

    let out = router
        .serve(RawRequest::new("POST", "/items"), Value::Null)
        .await
        .unwrap();
    assert_eq!(out["status"], 201);
    assert_eq!(out["headers"]["content-type"], "application/json");
    // The whole payload was replaced, headers included
    assert!(out["headers"].get("x-trace").is_none());
    assert_eq!(out["body"]["created"], true);
}

#[tokio::test]
async fn test_handler_error_propagates_unmodified() {
    let mut router = Router::new();
    router
        .post("/fail", |_ctx, _res, _data| async move {
            Err(anyhow::anyhow!("database unavailable"))
        })
        .unwrap();

    let err = router
        .serve(RawRequest::new("POST", "/fail"), Value::Null)
        .await
        .unwrap_err();
    match err {
        DispatchError::Handler(e) => assert_eq!(e.to_string(), "database unavailable"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_response_transform_replaces_output() {
    let mut router = Router::with_options(RouterOptions {
        response_transform: Some(Arc::new(|resp: Response| {
            json!({ "code": resp.status, "data": resp.body })
        })),
        ..Default::default()
    });
    router
        .put("/items/:id", |ctx, res, _data| async move {
            res.set_status(202);
            res.insert("updated", json!(ctx.param("id")));
            Ok(())
        })
        .unwrap();

    let out = router
        .serve(RawRequest::new("PUT", "/items/abc"), Value::Null)
        .await
        .unwrap();
    assert_eq!(out, json!({ "code": 202, "data": { "updated": "abc" } }));
}

#[tokio::test]
async fn test_additional_data_reaches_every_handler() {
    let mut router = Router::new();
    router
        .middleware("/", |_ctx, res, data| async move {
            res.insert("seen_by_middleware", data["tenant"].clone());
            Ok(())
        })
        .unwrap();
    router
        .get("/", |ctx, res, data| async move {
            res.insert("seen_by_handler", data["tenant"].clone());
            res.insert("same_as_context", json!(*ctx.additional_data() == data));
            Ok(())
        })
        .unwrap();

    let out = router
        .serve(RawRequest::new("GET", "/"), json!({ "tenant": "acme" }))
        .await
        .unwrap();
    assert_eq!(out["body"]["seen_by_middleware"], "acme");
    assert_eq!(out["body"]["seen_by_handler"], "acme");
    assert_eq!(out["body"]["same_as_context"], true);
}

#[tokio::test]
async fn test_request_headers_and_query_reach_handler() {
    let mut router = Router::new();
    router
        .get("/search", |ctx, res, _data| async move {
            res.insert("q", json!(ctx.query_param("q")));
            res.insert("agent", json!(ctx.header("user-agent")));
            Ok(())
        })
        .unwrap();

    let req = RawRequest::new("GET", "/search?q=rust%20router").with_header("User-Agent", "tests");
    let out = router.serve(req, Value::Null).await.unwrap();
    assert_eq!(out["body"]["q"], "rust router");
    assert_eq!(out["body"]["agent"], "tests");
}

#[tokio::test]
async fn test_serve_from_http_request() {
    let router = users_router();
    let req = http::Request::builder()
        .method(http::Method::GET)
        .uri("/users/55?x=1")
        .body(())
        .unwrap();
    let out = router
        .serve(RawRequest::from_http(&req), Value::Null)
        .await
        .unwrap();
    assert_eq!(out["body"]["id"], "55");
}
