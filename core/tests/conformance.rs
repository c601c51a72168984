use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::http::{Method, StatusCode};
use actix_web::{test, web, App, HttpResponse, Route};
use oapitest::{
    ApiDocument, Checkpoint, OapiError, OapiRequest, OapiTester, ResponseMismatch, RoutingError,
    TesterConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SEARCH_YAML: &str = include_str!("fixtures/search.yaml");

fn search_document() -> ApiDocument {
    ApiDocument::from_yaml_str(SEARCH_YAML).unwrap()
}

/// Route answering every request with a fixed status and JSON body, counting calls.
fn respond(status: StatusCode, body: &'static str, calls: Arc<AtomicUsize>) -> Route {
    web::to(move || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            HttpResponse::build(status)
                .content_type("application/json")
                .body(body)
        }
    })
}

fn mismatch(err: &OapiError) -> &ResponseMismatch {
    match err {
        OapiError::Response(err) => &err.mismatch,
        other => panic!("expected a response error, got {}", other),
    }
}

fn routing(err: &OapiError) -> &RoutingError {
    match err {
        OapiError::Routing(err) => err,
        other => panic!("expected a routing error, got {}", other),
    }
}

#[actix_web::test]
async fn test_search_with_valid_results_passes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = test::init_service(App::new().route(
        "/search",
        respond(
            StatusCode::OK,
            r#"[{"id":1,"name":"Drill","vendor":"r","discontinued":null}]"#,
            calls.clone(),
        ),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app);

    let response = tester
        .validate_api(&OapiRequest::get("/search?page=1&per_page=1&vendor=r"))
        .await
        .unwrap();

    assert_eq!(response.code(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body[0]["vendor"], json!("r"));
}

#[actix_web::test]
async fn test_search_server_error_is_undeclared_status() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = test::init_service(App::new().route(
        "/search",
        respond(StatusCode::INTERNAL_SERVER_ERROR, "", calls.clone()),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app);

    let err = tester
        .validate_api(&OapiRequest::get("/search?page=1&per_page=1&vendor=r"))
        .await
        .unwrap_err();

    assert_eq!(
        mismatch(&err),
        &ResponseMismatch::StatusNotDeclared {
            status: 500,
            method: "GET".into(),
            path_template: "/search".into(),
        }
    );
    assert!(err.to_string().contains("status 500 is not declared"));
    assert_eq!(err.response().map(|r| r.code()), Some(500));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_routing_failures_never_reach_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = test::init_service(
        App::new().default_service(respond(StatusCode::OK, "[]", calls.clone())),
    )
    .await;
    let tester = OapiTester::new(search_document(), app);

    let err = tester
        .validate_api(&OapiRequest::get("/catalog"))
        .await
        .unwrap_err();
    assert_eq!(
        routing(&err),
        &RoutingError::PathNotFound {
            path: "/catalog".into()
        }
    );

    let err = tester
        .validate_api(&OapiRequest::put("/search"))
        .await
        .unwrap_err();
    assert!(matches!(routing(&err), RoutingError::MethodNotAllowed { .. }));

    let err = tester
        .validate_api(&OapiRequest::get("/products/zero"))
        .await
        .unwrap_err();
    assert!(matches!(
        routing(&err),
        RoutingError::InvalidPathParameter { name, value, .. }
            if name == "productId" && value == "zero"
    ));

    let err = tester
        .validate_api(&OapiRequest::get("/search?q=a b"))
        .await
        .unwrap_err();
    assert!(matches!(err, OapiError::Uri(_)));

    assert!(err.response().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_invalid_document_fails_before_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = test::init_service(
        App::new().default_service(respond(StatusCode::OK, "[]", calls.clone())),
    )
    .await;
    let mut document = search_document();
    document.paths.items.get_mut("/search").unwrap().get.as_mut().unwrap().responses.clear();
    let tester = OapiTester::new(document, app);

    let err = tester
        .validate_api(&OapiRequest::get("/search"))
        .await
        .unwrap_err();
    assert!(matches!(err, OapiError::Spec(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_unparsable_server_url_fails_before_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = test::init_service(
        App::new().default_service(respond(StatusCode::OK, "[]", calls.clone())),
    )
    .await;
    let mut document = search_document();
    document.servers = serde_json::from_value(json!([{ "url": "http://exa mple.test" }])).unwrap();
    let tester = OapiTester::new(document, app);

    let err = tester
        .validate_api(&OapiRequest::get("/search"))
        .await
        .unwrap_err();
    assert!(matches!(err, OapiError::Url(_)));
    assert!(err.response().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_redirect_bypasses_declared_responses() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = test::init_service(App::new().route(
        "/search",
        web::get().to(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                HttpResponse::MovedPermanently()
                    .insert_header(("location", "/catalog/search"))
                    .content_type("text/html")
                    .body(r#"<a href="/catalog/search">Moved Permanently</a>."#)
            }
        }),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app);

    let response = tester
        .validate_api(&OapiRequest::get("/search"))
        .await
        .unwrap();
    assert_eq!(response.code(), 301);
    assert_eq!(response.header_values("location"), vec!["/catalog/search"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_hyphenated_path_variable() {
    let document = ApiDocument::from_yaml_str(
        r#"
openapi: 3.1.0
info: { title: Users, version: "1" }
paths:
  /users/{user-id}:
    get:
      operationId: getUser
      parameters:
        - { name: user-id, in: path, required: true, schema: { type: integer } }
      responses:
        "200": { description: ok }
"#,
    )
    .unwrap();
    let app = test::init_service(App::new().route(
        "/users/{id}",
        respond(StatusCode::OK, "", Arc::default()),
    ))
    .await;
    let tester = OapiTester::new(document, app);

    let url = tester.route_url("/users/5").unwrap();
    let route = tester.resolve(&Method::GET, &url).unwrap();
    assert_eq!(route.path_params["user-id"], "5");

    let response = tester
        .validate_api(&OapiRequest::get("/users/5"))
        .await
        .unwrap();
    assert_eq!(response.code(), 200);
}

#[actix_web::test]
async fn test_empty_body_skips_schema() {
    let app = test::init_service(App::new().route(
        "/products/{id}",
        respond(StatusCode::OK, "", Arc::default()),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app);

    let response = tester
        .validate_api(&OapiRequest::get("/products/7"))
        .await
        .unwrap();
    assert!(response.body().is_empty());
}

#[actix_web::test]
async fn test_skip_status_accepts_undeclared_status() {
    let app = test::init_service(App::new().route(
        "/products/{id}",
        respond(StatusCode::IM_A_TEAPOT, r#"{"short":"stout"}"#, Arc::default()),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app);

    let request = OapiRequest::get("/products/7");
    let err = tester.validate_api(&request).await.unwrap_err();
    assert!(matches!(
        mismatch(&err),
        ResponseMismatch::StatusNotDeclared { status: 418, .. }
    ));

    let response = tester
        .validate_api(&request.clone().skip_status(true))
        .await
        .unwrap();
    assert_eq!(response.code(), 418);
}

#[actix_web::test]
async fn test_schema_violation_echoes_body() {
    let body = r#"[{"id":"one","name":"Drill"}]"#;
    let app = test::init_service(App::new().route(
        "/search",
        respond(StatusCode::OK, body, Arc::default()),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app);

    let err = tester
        .validate_api(&OapiRequest::get("/search"))
        .await
        .unwrap_err();

    match mismatch(&err) {
        ResponseMismatch::SchemaViolation {
            media_type,
            violations,
        } => {
            assert_eq!(media_type, "application/json");
            assert!(violations.iter().any(|v| v.contains("vendor")));
            assert!(violations.iter().any(|v| v.contains("/0/id")));
        }
        other => panic!("unexpected mismatch: {}", other),
    }
    assert_eq!(err.response().map(|r| r.text().into_owned()), Some(body.to_string()));
    assert!(err.to_string().ends_with(&format!("ResponseBody: {}", body)));
}

#[actix_web::test]
async fn test_repeated_calls_are_identical() {
    let app = test::init_service(
        App::new()
            .route("/search", respond(StatusCode::OK, r#"[{"id":1}]"#, Arc::default()))
            .route(
                "/products/{id}",
                respond(StatusCode::OK, r#"{"id":2,"name":"Saw","vendor":"q"}"#, Arc::default()),
            ),
    )
    .await;
    let tester = OapiTester::new(search_document(), app);

    let failing = OapiRequest::get("/search?vendor=x");
    let first = tester.validate_api(&failing).await.unwrap_err().to_string();
    let second = tester.validate_api(&failing).await.unwrap_err().to_string();
    assert_eq!(first, second);

    let passing = OapiRequest::get("/products/2");
    let first = tester.validate_api(&passing).await.unwrap();
    let second = tester.validate_api(&passing).await.unwrap();
    assert_eq!(first.body(), second.body());
    assert_eq!(first.code(), second.code());
}

#[actix_web::test]
async fn test_server_prefix_is_applied_to_routing_only() {
    let mut document = search_document();
    document.servers = serde_json::from_value(json!([
        {
            "url": "https://shop.test/api/{version}",
            "variables": { "version": { "default": "v2" } }
        }
    ]))
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let app = test::init_service(App::new().route(
        "/products/{id}",
        respond(StatusCode::NO_CONTENT, "", calls.clone()),
    ))
    .await;
    let tester = OapiTester::new(document, app);
    assert_eq!(tester.base_url(), "https://shop.test/api/v2");

    let url = tester.route_url("/products/15").unwrap();
    let route = tester.resolve(&Method::DELETE, &url).unwrap();
    assert_eq!(route.path_template, "/products/{productId}");
    assert_eq!(route.operation_id(), Some("deleteProduct"));
    assert_eq!(route.path_params.keys().collect::<Vec<_>>(), vec!["productId"]);
    assert_eq!(route.path_params["productId"], "15");

    let response = tester
        .validate_api(&OapiRequest::delete("/products/15"))
        .await
        .unwrap();
    assert_eq!(response.code(), 204);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_observer_sees_pipeline_in_order() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);

    let app = test::init_service(App::new().route(
        "/search",
        respond(StatusCode::OK, "[]", Arc::default()),
    ))
    .await;
    let tester = OapiTester::new(search_document(), app).with_observer(
        move |checkpoint: &Checkpoint<'_>| {
            let label = match checkpoint {
                Checkpoint::RouteUrl { url, .. } => format!("url {}", url),
                Checkpoint::RouteResolved { operation_id, .. } => {
                    format!("resolved {}", operation_id.unwrap_or("-"))
                }
                Checkpoint::HandlerResponded { status, .. } => format!("responded {}", status),
                Checkpoint::Validated { error, .. } => format!("validated {}", error.is_none()),
            };
            sink.borrow_mut().push(label);
        },
    );

    tester
        .validate_api(&OapiRequest::get("/search?page=2"))
        .await
        .unwrap();
    tester
        .validate_api(&OapiRequest::get("/unknown"))
        .await
        .unwrap_err();

    assert_eq!(
        *events.borrow(),
        vec![
            "url http://localhost/search?page=2".to_string(),
            "resolved searchProducts".to_string(),
            "responded 200".to_string(),
            "validated true".to_string(),
            "url http://localhost/unknown".to_string(),
            "validated false".to_string(),
        ]
    );
}

#[actix_web::test]
async fn test_configured_header_and_content_type_checks() {
    let document = ApiDocument::from_yaml_str(
        r#"
openapi: 3.1.0
info: { title: Reports, version: "1" }
paths:
  /report:
    get:
      responses:
        "200":
          description: CSV report
          headers:
            X-Row-Count:
              required: true
              schema: { type: integer }
          content:
            text/csv:
              schema: { type: string, pattern: "^id," }
"#,
    )
    .unwrap();

    let app = test::init_service(App::new().route(
        "/report",
        web::get().to(|| async {
            HttpResponse::Ok()
                .content_type("text/csv")
                .insert_header(("x-row-count", "1"))
                .body("id,name\n1,bolt\n")
        }),
    ))
    .await;

    let config = TesterConfig::from_yaml_str(
        "response_content_type: text/csv\nvalidate_response_headers: true\n",
    )
    .unwrap();
    let tester = OapiTester::new(document.clone(), app).with_config(config);
    let response = tester
        .validate_api(
            &OapiRequest::get("/report").header(
                HeaderName::from_static("accept"),
                HeaderValue::from_static("text/csv"),
            ),
        )
        .await
        .unwrap();
    assert_eq!(response.header_values("x-row-count"), vec!["1"]);

    // The default lookup content type is JSON, which the operation never declares.
    let app = test::init_service(App::new().route(
        "/report",
        web::get().to(|| async { HttpResponse::Ok().body("id\n") }),
    ))
    .await;
    let tester = OapiTester::new(document, app);
    let err = tester
        .validate_api(&OapiRequest::get("/report"))
        .await
        .unwrap_err();
    assert!(matches!(
        mismatch(&err),
        ResponseMismatch::UnsupportedContentType { declared, .. } if declared == "text/csv"
    ));
}
