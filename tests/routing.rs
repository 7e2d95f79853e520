//! End-to-end dispatch through a registry: matching, authentication, handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use junction::{
    AuthenticationProvider, AuthenticationResult, Comparer, CookieAuthenticationProvider, Method,
    Request, RequestRestriction, Response, Restriction, Route, RouteRegistry, dispatch,
};

fn request(method: &str, uri: &str) -> http::request::Builder {
    http::Request::builder().method(method).uri(uri)
}

fn build(builder: http::request::Builder) -> Request {
    builder.body(Bytes::new()).unwrap().into()
}

struct SessionCookie;

#[async_trait]
impl AuthenticationProvider for SessionCookie {
    async fn authenticate(&self, request: &Request, _route: &Route) -> AuthenticationResult {
        (request.cookie("session") == Some("valid")).into()
    }

    fn failed_authentication_response(&self, request: &Request) -> Response {
        if request.method() == "GET" {
            Response::found("/login")
        } else {
            Response::see_other("/login")
        }
    }
}

fn registry() -> RouteRegistry {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    RouteRegistry::new()
        .route(
            Route::with_random_id("admin", "admin")
                .restrict_by_url_fragments([r"^/admin(/|$)"], Comparer::CaseInsensitiveRegex).unwrap()
                .authenticate_with(SessionCookie)
                .respond_with(|_req: Request| async { "admin" }),
        ).unwrap()
        .route(
            Route::with_random_id("secure-only", "secure")
                .restrict_by_url_scheme("https", Comparer::CaseInsensitivePlain).unwrap()
                .restrict_by_url_fragments(["/secure"], Comparer::CaseSensitivePlain).unwrap()
                .respond_with(|_req: Request| async { "secure" }),
        ).unwrap()
        .route(
            Route::with_random_id("from-search", "results")
                .restrict_by_referer_url_fragments(["/search"], Comparer::CaseSensitivePlain).unwrap()
                .restrict_by_url_fragments(["/results"], Comparer::CaseSensitivePlain).unwrap()
                .respond_with(|_req: Request| async { "from search" }),
        ).unwrap()
        .route(
            Route::with_random_id("results", "results")
                .restrict_by_url_fragments(["/results"], Comparer::CaseSensitivePlain).unwrap()
                .respond_with(|_req: Request| async { "results" }),
        ).unwrap()
        .route(
            Route::with_random_id("echo", "echo")
                .restrict_by_methods([Method::Post]).unwrap()
                .restrict_by_url_fragments(["/echo"], Comparer::CaseSensitivePlain).unwrap()
                .respond_with(|req: Request| async move { Response::json(req.body().to_vec()) }),
        ).unwrap()
        .route(Route::with_random_id("orphan", "orphan").restrict_by_url_fragments(["/orphan"], Comparer::CaseSensitivePlain).unwrap())
        .unwrap()
}

async fn body_of(response: Response) -> String {
    use http_body_util::BodyExt;
    let bytes = response.into_http().into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn unmatched_request_is_not_found() {
    let response = dispatch(&registry(), build(request("GET", "/nowhere"))).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_order_decides_between_overlapping_routes() {
    let registry = registry();

    let plain = build(request("GET", "/results"));
    let referred = build(request("GET", "/results").header("referer", "http://localhost/search?q=x"));

    assert_eq!(body_of(dispatch(&registry, plain).await).await, "results");
    assert_eq!(body_of(dispatch(&registry, referred).await).await, "from search");
}

#[tokio::test]
async fn scheme_restriction() {
    let registry = registry();

    let secure = dispatch(&registry, build(request("GET", "https://example.com/secure"))).await;
    let insecure = dispatch(&registry, build(request("GET", "http://example.com/secure"))).await;

    assert_eq!(body_of(secure).await, "secure");
    assert_eq!(insecure.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_authentication_uses_provider_response() {
    let registry = registry();

    let get = dispatch(&registry, build(request("GET", "/ADMIN"))).await;
    assert_eq!(get.status_code(), StatusCode::FOUND);
    assert_eq!(get.header("location"), Some("/login"));

    let post = dispatch(&registry, build(request("POST", "/admin/users"))).await;
    assert_eq!(post.status_code(), StatusCode::SEE_OTHER);

    let authed = dispatch(&registry, build(request("GET", "/admin").header("cookie", "session=valid"))).await;
    assert_eq!(body_of(authed).await, "admin");
}

#[tokio::test]
async fn cookie_provider_sends_rejected_requests_to_the_login_route() {
    let registry = RouteRegistry::new()
        .route(
            Route::with_random_id("login", "login")
                .restrict_by_url_fragments(["/login"], Comparer::CaseSensitivePlain).unwrap()
                .respond_with(|_req: Request| async { "login" }),
        ).unwrap();
    let provider = CookieAuthenticationProvider::new("ticket", |ticket| ticket == "ok")
        .redirect_to_route(&registry, "login").unwrap()
        .append_return_url();
    let registry = registry
        .route(
            Route::with_random_id("account", "account")
                .restrict_by_url_fragments(["/account"], Comparer::CaseSensitivePlain).unwrap()
                .authenticate_with(provider)
                .respond_with(|_req: Request| async { "account" }),
        ).unwrap();

    let rejected = dispatch(&registry, build(request("POST", "/account?tab=2"))).await;
    assert_eq!(rejected.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(rejected.header("location"), Some("/login?ReturnURL=%2Faccount%3Ftab%3D2"));

    let accepted = dispatch(&registry, build(request("GET", "/account").header("cookie", "ticket=ok"))).await;
    assert_eq!(body_of(accepted).await, "account");
}

#[tokio::test]
async fn handler_sees_request_body() {
    let req: Request = request("POST", "/echo").body(Bytes::from_static(b"{\"a\":1}")).unwrap().into();
    let response = dispatch(&registry(), req).await;

    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(body_of(response).await, "{\"a\":1}");
}

#[tokio::test]
async fn route_without_handler_is_a_server_error() {
    let response = dispatch(&registry(), build(request("GET", "/orphan"))).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[derive(Debug)]
struct Counting(Arc<AtomicUsize>);

#[async_trait]
impl RequestRestriction for Counting {
    async fn matches_request(&self, _request: &Request) -> bool {
        self.0.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[tokio::test]
async fn routes_after_the_match_are_not_evaluated() {
    let before = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));
    let registry = RouteRegistry::new()
        .route(Route::with_random_id("first", "first").restrict(Restriction::custom(Counting(Arc::clone(&before)))))
        .unwrap()
        .route(Route::with_random_id("second", "second").restrict(Restriction::custom(Counting(Arc::clone(&after)))))
        .unwrap();

    let result = registry.match_request(&build(request("GET", "/"))).await;

    assert_eq!(result.route().map(Route::name), Some("first"));
    assert_eq!(before.load(Ordering::SeqCst), 1);
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registry_is_shared_across_tasks() {
    let registry = Arc::new(registry());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let uri = if i % 2 == 0 { "/results" } else { "/nowhere" };
                dispatch(&registry, build(request("GET", uri))).await.status_code()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { StatusCode::OK } else { StatusCode::NOT_FOUND };
        assert_eq!(handle.await.unwrap(), expected);
    }
}
