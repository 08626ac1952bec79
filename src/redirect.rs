//! Redirect responses and canonicalizing wrappers.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, LOCATION};
use http::uri::{Scheme, Uri};
use http::{HeaderValue, Method, StatusCode};
use tracing::{debug, warn};

use crate::error::{ErrorClass, HttpError};
use crate::handler::{BoxHandler, Handler, Outcome};
use crate::mux::HostMux;
use crate::render::handle_error;
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

/// Send a `303 See Other` to `target`.
///
/// `GET` and `HEAD` requests also get a short HTML body with a link, as
/// browsers without redirect support expect.
pub fn redirect(w: &mut dyn ResponseWriter, r: &Request, target: &str) {
    let location = match HeaderValue::from_str(target) {
        Ok(location) => location,
        Err(_) => {
            let err = ErrorClass::InternalServerError
                .new(format!("invalid redirect target {:?}", target));
            handle_error(w, r, &err);
            return;
        }
    };

    debug!(from = %r.uri(), to = %target, "redirecting");
    w.headers_mut().insert(LOCATION, location);
    if r.method() == Method::GET || r.method() == Method::HEAD {
        w.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }
    w.write_header(StatusCode::SEE_OTHER);
    if r.method() == Method::GET {
        let body = format!("<a href=\"{}\">See Other</a>.\n", html_escape(target));
        if let Err(e) = w.write_all(body.as_bytes()) {
            warn!(error = %e, "failed writing redirect body");
        }
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Rebuild the request target with a different scheme and authority.
///
/// The original path and query are kept byte for byte.
fn retarget(r: &Request, scheme: Scheme, host: &str) -> Result<String, HttpError> {
    let path_and_query = r
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Uri::builder()
        .scheme(scheme)
        .authority(host)
        .path_and_query(path_and_query)
        .build()
        .map(|uri| uri.to_string())
        .map_err(|e| ErrorClass::BadRequest.new(format!("cannot rebuild url: {}", e)))
}

fn is_https(r: &Request) -> bool {
    if r.uri().scheme() == Some(&Scheme::HTTPS) {
        return true;
    }
    r.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

// =============================================================================
// Redirect handlers
// =============================================================================

/// Redirects every request to a fixed target.
#[derive(Debug, Clone)]
pub struct RedirectHandler {
    target: String,
}

impl RedirectHandler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl Handler for RedirectHandler {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        redirect(w, &r, &self.target);
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        cb(Route::any().with_annotation("Redirect", self.target.clone()));
    }
}

/// Redirects to a target computed from the request.
pub struct RedirectFn<F> {
    f: F,
}

pub fn redirect_fn<F>(f: F) -> RedirectFn<F>
where
    F: Fn(&Request) -> String + Send + Sync,
{
    RedirectFn { f }
}

#[async_trait]
impl<F> Handler for RedirectFn<F>
where
    F: Fn(&Request) -> String + Send + Sync,
{
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let target = (self.f)(&r);
        redirect(w, &r, &target);
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        cb(Route::any().with_annotation("Redirect", "f(req)"));
    }
}

// =============================================================================
// Canonicalizing wrappers
// =============================================================================

/// Redirects plain-HTTP requests to their HTTPS equivalent.
pub struct RequireHttps<H> {
    inner: H,
}

/// Serve `h` over HTTPS only.
///
/// A request counts as HTTPS when its URI says so or when a proxy set
/// `X-Forwarded-Proto: https`.
pub fn require_https<H: Handler>(h: H) -> RequireHttps<H> {
    RequireHttps { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for RequireHttps<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        if is_https(&r) {
            return self.inner.serve(w, r).await;
        }
        let host = r.host().to_string();
        match retarget(&r, Scheme::HTTPS, &host) {
            Ok(target) => redirect(w, &r, &target),
            Err(err) => handle_error(w, &r, &err),
        }
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}

/// Redirects any host to a canonical one, keeping scheme, path and query.
struct HostRedirect {
    host: String,
}

#[async_trait]
impl Handler for HostRedirect {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let scheme = if is_https(&r) {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        };
        match retarget(&r, scheme, &self.host) {
            Ok(target) => redirect(w, &r, &target),
            Err(err) => handle_error(w, &r, &err),
        }
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        cb(Route::any().with_annotation("Redirect", format!("//{}", self.host)));
    }
}

/// Serve `h` only on `host`, redirecting every other host there.
///
/// `"*"` accepts any host and returns `h` unchanged.
pub fn require_host(host: &str, h: impl Handler + 'static) -> BoxHandler {
    if host == "*" {
        return Arc::new(h);
    }
    Arc::new(HostMux::new().route(host, h).route(
        "*",
        HostRedirect {
            host: host.to_string(),
        },
    ))
}

/// Redirects requests whose path lacks a trailing slash.
pub struct RequireTrailingSlash<H> {
    inner: H,
}

pub fn require_trailing_slash<H: Handler>(h: H) -> RequireTrailingSlash<H> {
    RequireTrailingSlash { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for RequireTrailingSlash<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        if r.uri().path().ends_with('/') {
            return self.inner.serve(w, r).await;
        }
        let target = match r.uri().query() {
            Some(query) => format!("{}/?{}", r.uri().path(), query),
            None => format!("{}/", r.uri().path()),
        };
        redirect(w, &r, &target);
        Ok(())
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}
