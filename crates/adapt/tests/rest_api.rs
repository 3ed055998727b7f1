// crates/adapt/tests/rest_api.rs

//! End-to-end tests through the axum router, auth middleware included.

use adapt::{build_app, ControllerBuilder, RestEnv, RestServer};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine};
use domain::item::{Item, ItemChanges, ItemId};
use domain::resource::{ResourceRegistry, Term};
use domain::security::password::hash_password;
use domain::security::{Role, RoleCapabilities};
use domain::setting::{SiteSettings, UserSettings};
use domain::status::StatusRegistry;
use mockall::mock;
use serde_json::{json, Value as Json};
use serve::{InMemoryStore, ItemQuery, ItemStore, QueryPage, Seed, StoreConfig, StoreError};
use std::sync::{Arc, LazyLock};
use tower::ServiceExt;

const ROOT: &str = "https://example.org/api/wp/v2";

static USERS: LazyLock<Vec<UserSettings>> = LazyLock::new(|| {
    [(2, "ed", Role::Editor), (4, "cody", Role::Contributor)]
        .into_iter()
        .map(|(id, login, role)| UserSettings {
            id,
            login: login.into(),
            role,
            password_hash: hash_password(&format!("{login}-secret")).unwrap(),
        })
        .collect()
});

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

fn site() -> SiteSettings {
    toml::from_str(r#"url = "https://example.org""#).unwrap()
}

fn env_with(store: Arc<dyn ItemStore>) -> RestEnv {
    let statuses = StatusRegistry::default();
    RestEnv {
        registry: Arc::new(ResourceRegistry::with_defaults()),
        caps: Arc::new(RoleCapabilities::new(statuses.clone())),
        statuses: Arc::new(statuses),
        site: Arc::new(site()),
        store,
    }
}

fn router_for(env: RestEnv) -> Router {
    let mut server = RestServer::new(&env.site);
    for ty in env.registry.rest_types() {
        server.register(ControllerBuilder::new(env.clone(), &ty.name).build().unwrap());
    }
    build_app(server, USERS.clone(), &env.site.api_prefix)
}

fn seeded(items: Json, sticky: &[ItemId]) -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new(StoreConfig {
        site_url: "https://example.org".into(),
        ..Default::default()
    }));
    store.register_taxonomy("category");
    store.register_taxonomy("post_tag");
    for id in [2, 4] {
        store.add_user(id);
    }
    store
        .add_term(Term {
            id: 1,
            taxonomy: "category".into(),
            name: "News".into(),
            slug: "news".into(),
            parent: 0,
        })
        .unwrap();
    let seed = Seed::from_json(&json!({"items": items, "sticky": sticky}).to_string()).unwrap();
    store.load(seed).unwrap();
    (router_for(env_with(store.clone())), store)
}

fn post(id: ItemId, kind: &str, status: &str) -> Json {
    json!({
        "id": id, "type": kind, "status": status,
        "date": "2024-01-02T03:04:05",
        "date_gmt": "2024-01-02T03:04:05",
        "modified": "2024-01-02T03:04:05",
        "modified_gmt": "2024-01-02T03:04:05",
        "slug": format!("{kind}-{id}"),
        "author": 2,
        "title": format!("Title {id}"),
        "content": "Body"
    })
}

fn request(method: Method, uri: &str, login: Option<&str>, body: Option<Json>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(login) = login {
        let token = general_purpose::STANDARD.encode(format!("{login}:{login}-secret"));
        builder = builder.header(header::AUTHORIZATION, format!("Basic {token}"));
    }
    match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(router: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Json) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn all_posts(store: &InMemoryStore) -> Vec<Item> {
    let q = ItemQuery {
        status: serve::query::StatusFilter::Any,
        ..ItemQuery::for_kind("post")
    };
    store.query(&q).unwrap().items
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contributor_cannot_publish() {
    let (router, store) = seeded(json!([]), &[]);
    let req = request(
        Method::POST,
        "/api/wp/v2/posts",
        Some("cody"),
        Some(json!({"title": "Mine", "status": "publish"})),
    );
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("rest_cannot_publish"));
    assert!(all_posts(&store).is_empty());
}

#[tokio::test]
async fn sticky_and_password_conflict() {
    let (router, store) = seeded(json!([]), &[]);
    let req = request(
        Method::POST,
        "/api/wp/v2/posts",
        Some("ed"),
        Some(json!({"title": "Both", "sticky": true, "password": "pw"})),
    );
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("rest_invalid_field"));
    assert!(all_posts(&store).is_empty());
}

#[tokio::test]
async fn editor_creates_then_updates() {
    let (router, _store) = seeded(json!([]), &[]);
    let req = request(
        Method::POST,
        "/api/wp/v2/posts",
        Some("ed"),
        Some(json!({"title": "Fresh", "status": "publish", "categories": [1]})),
    );
    let (status, headers, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_u64().unwrap();
    assert_eq!(headers[header::LOCATION], format!("{ROOT}/posts/{id}").as_str());
    assert_eq!(body["categories"], json!([1]));
    assert_eq!(body["_links"]["self"][0]["href"], json!(format!("{ROOT}/posts/{id}")));

    let req = request(
        Method::PATCH,
        &format!("/api/wp/v2/posts/{id}"),
        Some("ed"),
        Some(json!({"title": "Renamed"})),
    );
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"]["raw"], json!("Renamed"));
    assert_eq!(body["slug"], json!("fresh"), "slug is kept once published");
}

#[tokio::test]
async fn form_bodies_are_accepted() {
    let (router, _store) = seeded(json!([]), &[]);
    let token = general_purpose::STANDARD.encode("ed:ed-secret");
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/wp/v2/pages")
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("title=About+us&menu_order=3"))
        .unwrap();
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"]["raw"], json!("About us"));
    assert_eq!(body["menu_order"], json!(3));
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let (router, _store) = seeded(json!([]), &[]);
    let token = general_purpose::STANDARD.encode("ed:ed-secret");
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/wp/v2/posts")
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("rest_invalid_json"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Deletes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trashing_a_trashed_item_is_gone() {
    let (router, _store) = seeded(json!([post(7, "post", "trash")]), &[]);
    let req = request(Method::DELETE, "/api/wp/v2/posts/7?force=false", Some("ed"), None);
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], json!("rest_already_trashed"));
}

#[tokio::test]
async fn forced_delete_removes_the_item() {
    let (router, store) = seeded(json!([post(7, "post", "publish")]), &[]);
    let req = request(Method::DELETE, "/api/wp/v2/posts/7?force=true", Some("ed"), None);
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], json!(true));
    assert_eq!(body["previous"]["id"], json!(7));
    assert!(store.get(7).is_none());

    let (status, _, body) = call(&router, request(Method::GET, "/api/wp/v2/posts/7", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("rest_post_invalid_id"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn relevance_needs_a_search() {
    let (router, _store) = seeded(json!([]), &[]);
    let req = request(Method::GET, "/api/wp/v2/posts?orderby=relevance", None, None);
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("rest_no_search_term_defined"));
}

#[tokio::test]
async fn sticky_outside_include_is_empty() {
    let items = json!([post(1, "post", "publish"), post(2, "post", "publish"), post(3, "post", "publish")]);
    let (router, _store) = seeded(items, &[1]);
    let req = request(Method::GET, "/api/wp/v2/posts?sticky=true&include[]=2&include[]=3", None, None);
    let (status, headers, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(headers["x-total"], "0");
}

#[tokio::test]
async fn pages_past_the_end_report_real_totals() {
    let items = json!([post(1, "post", "publish"), post(2, "post", "publish"), post(3, "post", "publish")]);
    let (router, _store) = seeded(items, &[]);
    let req = request(Method::GET, "/api/wp/v2/posts?per_page=2&page=9", None, None);
    let (status, headers, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(headers["x-total"], "3");
    assert_eq!(headers["x-totalpages"], "2");
}

#[tokio::test]
async fn drafts_are_hidden_from_anonymous_callers() {
    let (router, _store) = seeded(json!([post(5, "post", "draft")]), &[]);
    let (status, _, body) = call(&router, request(Method::GET, "/api/wp/v2/posts/5", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("rest_forbidden"));

    let req = request(Method::GET, "/api/wp/v2/posts/5?context=edit", Some("ed"), None);
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["raw"], json!("Body"));
}

#[tokio::test]
async fn embed_and_options() {
    let mut child = post(8, "page", "publish");
    child["parent"] = json!(3);
    let (router, _store) = seeded(json!([post(3, "page", "publish"), child]), &[]);

    let req = request(Method::GET, "/api/wp/v2/pages/8?_embed=1", None, None);
    let (status, headers, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_embedded"]["up"][0]["id"], json!(3));
    let link = headers[header::LINK].to_str().unwrap();
    assert!(link.contains("rel=\"alternate\""), "{link}");

    let (status, headers, body) = call(&router, request(Method::OPTIONS, "/api/wp/v2/pages", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ALLOW], "GET, POST");
    assert_eq!(body["schema"]["title"], json!("page"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication and routing
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let (router, _store) = seeded(json!([]), &[]);
    let token = general_purpose::STANDARD.encode("ed:wrong");
    let req = Request::builder()
        .uri("/api/wp/v2/posts")
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("incorrect_password"));
    assert!(headers.contains_key(header::WWW_AUTHENTICATE));

    let (status, _, body) = call(&router, request(Method::GET, "/api/wp/v2/posts", Some("nobody"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("invalid_username"));
}

#[tokio::test]
async fn paths_outside_the_prefix_have_no_route() {
    let (router, _store) = seeded(json!([]), &[]);
    for uri in ["/wp/v2/posts", "/apix/wp/v2/posts", "/api/wp/v3/posts"] {
        let (status, _, body) = call(&router, request(Method::GET, uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["code"], json!("rest_no_route"));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage faults
// ─────────────────────────────────────────────────────────────────────────────

mock! {
    Store {}
    impl ItemStore for Store {
        fn query(&self, q: &ItemQuery) -> Result<QueryPage, StoreError>;
        fn get(&self, id: ItemId) -> Option<Item>;
        fn insert(&self, changes: ItemChanges) -> Result<ItemId, StoreError>;
        fn update(&self, changes: ItemChanges) -> Result<ItemId, StoreError>;
        fn trash(&self, id: ItemId) -> Result<Item, StoreError>;
        fn untrash(&self, id: ItemId) -> Result<Item, StoreError>;
        fn delete(&self, id: ItemId) -> Result<Item, StoreError>;
        fn set_terms(&self, id: ItemId, taxonomy: &str, terms: &[u64]) -> Result<(), StoreError>;
        fn sticky_ids(&self) -> Vec<ItemId>;
        fn set_sticky(&self, id: ItemId, sticky: bool) -> Result<(), StoreError>;
        fn user_exists(&self, id: u64) -> bool;
        fn set_featured_media(&self, id: ItemId, media: ItemId) -> Result<(), StoreError>;
        fn set_format(&self, id: ItemId, format: &str) -> Result<(), StoreError>;
        fn set_template(&self, id: ItemId, template: &str) -> Result<(), StoreError>;
        fn set_meta(&self, id: ItemId, key: &str, value: Option<Json>) -> Result<(), StoreError>;
    }
}

#[tokio::test]
async fn failed_insert_is_a_server_error() {
    let mut store = MockStore::new();
    store.expect_insert().times(1).returning(|_| Err(StoreError::Insert));
    let router = router_for(env_with(Arc::new(store)));

    let req = request(Method::POST, "/api/wp/v2/posts", Some("ed"), Some(json!({"title": "x"})));
    let (status, _, body) = call(&router, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], json!("db_insert_error"));
    assert_eq!(body["data"]["status"], json!(500));
}
