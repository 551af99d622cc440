//! End-to-end dispatch over real TCP.

use std::time::Duration;

use api_dispatch::auth::ApiKeyAuth;
use api_dispatch::dispatch::{from_sync_fn, handler_fn, sync_handler, ApiError, Args, Flow};
use api_dispatch::registry::{annotate, MetadataStore};
use api_dispatch::routing::resolve_from_config;
use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

const FILES: &[&str] = &[
    "users/index.rs",
    "users/settings.rs",
    "users/[id].rs",
    "search.rs",
    "items.rs",
    "secret.rs",
    "session.rs",
    "boom.rs",
    "teapot.rs",
    ".hidden.rs",
];

fn store() -> MetadataStore {
    let mut store = MetadataStore::new();

    store
        .module("users/index")
        .get("list", &[], sync_handler(|_args: Args| Ok::<_, ApiError>(vec!["ada", "grace"])));
    store
        .module("users/settings")
        .get("settings", &[], sync_handler(|_args: Args| Ok::<_, ApiError>("settings")));
    store
        .module("users/[id]")
        .get(
            "get_user",
            &["id"],
            handler_fn(|args: Args| async move {
                let id: u64 = args.get("id")?;
                Ok::<_, ApiError>(json!({ "id": id }))
            }),
        )
        .with(annotate::path("id"));

    store
        .module("search")
        .get(
            "search",
            &["term", "page"],
            sync_handler(|args: Args| {
                let term: String = args.get("term")?;
                let page: Option<u64> = args.get("page")?;
                Ok::<_, ApiError>(json!({ "term": term, "page": page }))
            }),
        )
        .with(annotate::query("term"))
        .with(annotate::query("page"))
        .with(annotate::optional("page"));

    store
        .module("items")
        .post(
            "create",
            &["name"],
            sync_handler(|args: Args| {
                let name: String = args.get("name")?;
                Ok::<_, ApiError>(json!({ "created": name }))
            }),
        )
        .with(annotate::body("name"));

    store
        .module("secret")
        .get(
            "secret",
            &["auth"],
            sync_handler(|args: Args| Ok::<_, ApiError>(args.raw("auth").cloned())),
        )
        .with(annotate::use_middleware(ApiKeyAuth::new(["k1"])))
        .with(annotate::local("auth", "auth"));

    store
        .module("session")
        .get(
            "session",
            &["sid"],
            sync_handler(|args: Args| args.get::<String>("sid")),
        )
        .with(annotate::cookie("sid"));

    store.module("boom").get(
        "boom",
        &[],
        sync_handler(|_args: Args| -> Result<Value, ApiError> {
            Err(ApiError::internal("database connection refused"))
        }),
    );

    store
        .module("teapot")
        .get("brew", &[], sync_handler(|_args: Args| Ok::<_, ApiError>("short and stout")))
        .with(annotate::use_middleware(from_sync_fn("teapot", |ctx| {
            ctx.set_status(StatusCode::IM_A_TEAPOT);
            Ok(Flow::Continue)
        })));

    store
}

async fn get_json(url: &str) -> (StatusCode, Value) {
    let res = common::client().get(url).send().await.expect("server reachable");
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_static_routes_win_over_dynamic() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;

    let (status, body) = get_json(&server.url("/users/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"this": "succeeded", "with": "settings"}));

    let (_, body) = get_json(&server.url("/users/7")).await;
    assert_eq!(body, json!({"this": "succeeded", "with": {"id": 7}}));

    let (_, body) = get_json(&server.url("/users")).await;
    assert_eq!(body["with"], json!(["ada", "grace"]));
}

#[tokio::test]
async fn test_query_parameters_and_missing_required() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;

    let (_, body) = get_json(&server.url("/search?term=rust&page=2")).await;
    assert_eq!(body["with"], json!({"term": "rust", "page": 2}));

    let (_, body) = get_json(&server.url("/search?term=rust")).await;
    assert_eq!(body["with"], json!({"term": "rust", "page": null}));

    let (status, body) = get_json(&server.url("/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"this": "failed", "with": 400, "because": "Required parameter 'term' is missing"})
    );
}

#[tokio::test]
async fn test_json_and_form_bodies() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;
    let client = common::client();

    let res = client
        .post(server.url("/items"))
        .json(&json!({"name": "pen"}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["with"], json!({"created": "pen"}));

    let res = client
        .post(server.url("/items"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=ink")
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["with"], json!({"created": "ink"}));

    let res = client
        .post(server.url("/items"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_api_key_middleware() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;
    let client = common::client();

    let res = client.get(server.url("/secret")).send().await.unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(res.headers()["www-authenticate"], "ApiKey");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"this": "failed", "with": 401, "because": "Unauthorized"}));

    let res = client
        .get(server.url("/secret"))
        .header("X-API-KEY", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .get(server.url("/secret"))
        .header("X-API-KEY", "k1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["with"], json!({"apiKey": "k1"}));
}

#[tokio::test]
async fn test_cookies_are_parameter_sources() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;

    let res = common::client()
        .get(server.url("/session"))
        .header("cookie", "theme=dark; sid=abc123")
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["with"], "abc123");
}

#[tokio::test]
async fn test_failures_use_the_envelope() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;

    let (status, body) = get_json(&server.url("/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"this": "failed", "with": 500, "because": "unknown"}));

    let (status, body) = get_json(&server.url("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"this": "failed", "with": 404, "because": "Not found"}));

    // Ignored by the default rules.
    let (status, _) = get_json(&server.url("/.hidden")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Route exists but no POST handler is mapped.
    let res = common::client().post(server.url("/boom")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_middleware_sets_status() {
    let tree = common::ApiTree::new(FILES);
    let server = common::start_server(tree.config(), store()).await;

    let (status, body) = get_json(&server.url("/teapot")).await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(
        body,
        json!({"this": "failed", "with": 418, "because": "short and stout"})
    );
}

#[tokio::test]
async fn test_route_table_swap_while_serving() {
    let tree = common::ApiTree::new(FILES);
    let config = tree.config();
    let mut store = store();
    store
        .module("fresh")
        .get("fresh", &[], sync_handler(|_args: Args| Ok::<_, ApiError>("new")));
    let server = common::start_server(config.clone(), store).await;

    let (status, _) = get_json(&server.url("/fresh")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    tree.add("fresh.rs");
    server
        .route_updates
        .send(resolve_from_config(&config.routing).unwrap())
        .unwrap();

    let mut last = StatusCode::NOT_FOUND;
    for _ in 0..50 {
        let (status, _) = get_json(&server.url("/fresh")).await;
        last = status;
        if status == StatusCode::OK {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(last, StatusCode::OK);
}
