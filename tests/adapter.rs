use std::{
    collections::{HashMap, HashSet},
    io::{Read, Write},
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

use alb_adapter::{
    alb_adapter, handler_fn, AlbRequestEvent, AlbResponse, FaultPolicy, InvocationContext,
    QueryStrategy, RequestExt,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use serde_json::json;

fn event(method: &str, path: &str) -> AlbRequestEvent {
    AlbRequestEvent {
        http_method: method.to_string(),
        path: path.to_string(),
        ..Default::default()
    }
}

fn ctx() -> InvocationContext {
    InvocationContext::new("req-1")
}

#[test]
fn hello_end_to_end() {
    let adapter = alb_adapter(handler_fn(|_req, res| {
        res.write_head(StatusCode::OK);
        res.write_body(b"Hello");
    }));

    let out = adapter.handle(&ctx(), event("GET", "/hello")).unwrap();

    assert_eq!(out.status_code, 200);
    assert_eq!(out.status_description, "200 OK");
    assert_eq!(out.body, "Hello");
    assert!(!out.is_base64_encoded);
}

#[test]
fn json_event_in_json_envelope_out() {
    let adapter = alb_adapter(handler_fn(|req, res| {
        let mut body = String::new();
        req.into_body().read_to_string(&mut body).unwrap();
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        res.write_head(StatusCode::CREATED);
        res.write_body(body.as_bytes());
    }));

    let evt: AlbRequestEvent = serde_json::from_value(json!({
        "requestContext": {"elb": {"targetGroupArn": "arn:aws:elasticloadbalancing:region:123456789012:targetgroup/my-target-group/6d0ecf831eec9f09"}},
        "httpMethod": "POST",
        "path": "/items",
        "queryStringParameters": null,
        "headers": {"content-type": "application/json"},
        "body": "{\"name\":\"widget\"}",
        "isBase64Encoded": false
    }))
    .unwrap();

    let out = adapter.handle(&ctx(), evt).unwrap();
    assert_eq!(
        serde_json::to_value(&out).unwrap(),
        json!({
            "statusCode": 201,
            "statusDescription": "201 Created",
            "headers": {"content-type": "application/json"},
            "body": "{\"name\":\"widget\"}",
            "isBase64Encoded": false
        })
    );
}

#[test]
fn handler_sees_decoded_request() {
    let seen = Arc::new(std::sync::Mutex::new(None));
    let adapter = alb_adapter({
        let seen = Arc::clone(&seen);
        handler_fn(move |req, _res| {
            let content_length = req.body().content_length();
            let host = req.host().map(str::to_string);
            let request_id = req
                .invocation_context()
                .map(|c| c.request_id().to_string());
            let path = req.uri().path().to_string();
            let query: HashSet<String> = req
                .uri()
                .query()
                .unwrap_or_default()
                .split('&')
                .map(str::to_string)
                .collect();
            let mut body = Vec::new();
            req.into_body().read_to_end(&mut body).unwrap();
            *seen.lock().unwrap() = Some((path, query, host, request_id, content_length, body));
        })
    });

    let mut evt = event("PUT", "/foo/bar");
    evt.query_string_parameters = HashMap::from([
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
    ]);
    evt.headers = HashMap::from([("host".to_string(), "lb.example.com".to_string())]);
    evt.body = STANDARD.encode([0x00, 0x9F, 0x92, 0x96]);
    evt.is_base64_encoded = true;

    adapter.handle(&ctx(), evt).unwrap();

    let (path, query, host, request_id, content_length, body) =
        seen.lock().unwrap().take().unwrap();
    assert_eq!(path, "/foo/bar");
    assert_eq!(query, HashSet::from(["a=1".to_string(), "b=2".to_string()]));
    assert_eq!(host.as_deref(), Some("lb.example.com"));
    assert_eq!(request_id.as_deref(), Some("req-1"));
    assert_eq!(content_length, 4);
    assert_eq!(body, vec![0x00, 0x9F, 0x92, 0x96]);
}

#[test]
fn decode_errors_never_reach_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = alb_adapter({
        let calls = Arc::clone(&calls);
        handler_fn(move |_req, _res| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    });

    let mut bad_body = event("POST", "/");
    bad_body.body = "not*base64".to_string();
    bad_body.is_base64_encoded = true;
    let err = adapter.handle(&ctx(), bad_body).unwrap_err();
    assert!(err.is_decode());

    let mut bad_query = event("GET", "/");
    bad_query.query_string_parameters = HashMap::from([("q".to_string(), "50%".to_string())]);
    let err = adapter.handle(&ctx(), bad_query).unwrap_err();
    assert!(err.is_decode());

    let err = adapter.handle(&ctx(), event("GET", "/with space")).unwrap_err();
    assert!(err.is_parse());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn binary_response_is_base64_encoded() {
    let adapter = alb_adapter(handler_fn(|_req, res| {
        res.write_body(&[0xFF, 0xFE, 0x00, 0x01]);
    }));

    let out = adapter.handle(&ctx(), event("GET", "/blob")).unwrap();
    assert!(out.is_base64_encoded);
    assert_eq!(out.body, "//4AAQ==");
    assert_eq!(
        STANDARD.decode(out.body.as_bytes()).unwrap(),
        vec![0xFF, 0xFE, 0x00, 0x01]
    );
}

#[test]
fn text_response_round_trips() {
    let text = "ünïcödé ✓";
    let adapter = alb_adapter(handler_fn(move |_req, res| {
        let _ = res.write_all(text.as_bytes());
    }));

    let out = adapter.handle(&ctx(), event("GET", "/")).unwrap();
    assert!(!out.is_base64_encoded);
    assert_eq!(out.body, text);
    assert_eq!(out.headers["content-type"], "text/plain; charset=utf-8");
}

#[test]
fn multi_value_headers_are_comma_joined() {
    let adapter = alb_adapter(handler_fn(|_req, res| {
        let h = res.headers_mut();
        h.append(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        h.append(CONTENT_TYPE, HeaderValue::from_static("charset=utf-8"));
        res.write_body(b"<p>hi</p>");
    }));

    let out = adapter.handle(&ctx(), event("GET", "/")).unwrap();
    assert_eq!(out.headers["content-type"], "text/html,charset=utf-8");
}

#[test]
fn canonical_strategy_reencodes_query() {
    let adapter = alb_adapter(handler_fn(|req, res| {
        let query = req.uri().query().unwrap_or_default().to_string();
        res.write_body(query.as_bytes());
    }))
    .with_query_strategy(QueryStrategy::Canonical);

    let mut evt = event("GET", "/search");
    evt.query_string_parameters = HashMap::from([
        ("q".to_string(), "red%20shoes".to_string()),
        ("page".to_string(), "2".to_string()),
    ]);

    let out = adapter.handle(&ctx(), evt).unwrap();
    assert_eq!(out.body, "page=2&q=red+shoes");
}

#[test]
fn panics_become_500_when_configured() {
    let adapter = alb_adapter(handler_fn(|_req, res| {
        res.write_body(b"partial");
        panic!("handler exploded");
    }))
    .with_fault_policy(FaultPolicy::Respond500);

    let out = adapter.handle(&ctx(), event("GET", "/")).unwrap();
    assert_eq!(
        out,
        AlbResponse {
            status_code: 500,
            status_description: "500 Internal Server Error".to_string(),
            headers: HashMap::from([(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string()
            )]),
            body: "internal error".to_string(),
            is_base64_encoded: false,
        }
    );
}

#[test]
fn panics_propagate_by_default() {
    let adapter = alb_adapter(handler_fn(|_req, _res| panic!("handler exploded")));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        adapter.handle(&ctx(), event("GET", "/"))
    }));
    assert!(result.is_err());
}

#[test]
fn deadline_is_visible_to_handler() {
    let adapter = alb_adapter(handler_fn(|req, res| {
        let expired = req
            .invocation_context()
            .map(InvocationContext::is_expired)
            .unwrap_or(false);
        if expired {
            res.write_head(StatusCode::GATEWAY_TIMEOUT);
        }
    }));

    let past =
        InvocationContext::new("late").with_deadline(SystemTime::now() - Duration::from_secs(1));
    let out = adapter.handle(&past, event("GET", "/")).unwrap();
    assert_eq!(out.status_code, 504);

    let future =
        InvocationContext::new("early").with_deadline(SystemTime::now() + Duration::from_secs(30));
    let out = adapter.handle(&future, event("GET", "/")).unwrap();
    assert_eq!(out.status_code, 200);
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let adapter = alb_adapter(handler_fn(|req, res| {
        let id = req
            .invocation_context()
            .map(|c| c.request_id().to_string())
            .unwrap_or_default();
        std::thread::sleep(Duration::from_millis(5));
        res.write_body(id.as_bytes());
    }));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let adapter = adapter.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let ctx = InvocationContext::new(format!("req-{i}"));
            adapter.handle(&ctx, event("GET", "/")).unwrap()
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let out = task.await.unwrap();
        assert_eq!(out.body, format!("req-{i}"));
    }
}
