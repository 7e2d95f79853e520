//! Minimal junction example: a public page, a login page and a cookie-protected
//! admin area.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/admin
//!   curl -i -X POST http://localhost:3000/admin
//!   curl -i -H 'cookie: session=letmein' http://localhost:3000/admin
//!   curl -i 'http://localhost:3000/search?q=rust'

use junction::{
    Comparer, CookieAuthenticationProvider, Error, Method, Request, Response, Route, RouteRegistry,
    Server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let registry = RouteRegistry::new()
        .route(
            Route::with_random_id("login", "login")
                .restrict_by_methods([Method::Get])?
                .restrict_by_url_fragments([r"^/login$"], Comparer::CaseInsensitiveRegex)?
                .respond_with(login),
        )?;

    // The login route has to be registered before a provider can redirect to it.
    let provider = CookieAuthenticationProvider::new("session", |ticket| ticket == "letmein")
        .redirect_to_route(&registry, "login")?
        .append_return_url();

    let registry = registry
        .route(
            Route::with_random_id("admin", "admin")
                .restrict_by_url_fragments([r"^/admin(/|$)"], Comparer::CaseInsensitiveRegex)?
                .authenticate_with(provider)
                .respond_with(admin),
        )?
        .route(
            Route::with_random_id("search", "search")
                .restrict_by_methods([Method::Get])?
                .restrict_by_url_fragments([r"^/search$"], Comparer::CaseSensitiveRegex)?
                .respond_with(search),
        )?
        .route(
            Route::with_random_id("home", "")
                .restrict_by_methods([Method::Get, Method::Head])?
                .restrict_by_url_fragments([r"^/$"], Comparer::CaseSensitiveRegex)?
                .respond_with(|_req: Request| async { "home" }),
        )?;

    Server::bind("0.0.0.0:3000")?.serve(registry).await
}

async fn login(req: Request) -> Response {
    let back = req.query_pairs()
        .find(|(k, _)| k == "ReturnURL")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| "/".to_owned());
    Response::text(format!("log in, then return to {back}"))
}

async fn admin(req: Request) -> Response {
    Response::json(format!(r#"{{"area":"admin","path":"{}"}}"#, req.path()).into_bytes())
}

async fn search(req: Request) -> Response {
    let q = req.query_pairs().find(|(k, _)| k == "q").map(|(_, v)| v.into_owned());
    Response::text(format!("results for {}", q.unwrap_or_default()))
}
