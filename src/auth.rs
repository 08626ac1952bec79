//! HTTP basic authentication.

use std::sync::OnceLock;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::HeaderValue;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::context::{Context, Symbol};
use crate::error::ErrorClass;
use crate::handler::{Handler, Outcome};
use crate::render::handle_error;
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

fn user_key() -> Symbol {
    static KEY: OnceLock<Symbol> = OnceLock::new();
    *KEY.get_or_init(Symbol::new)
}

/// The user authenticated by [`require_basic_auth`], if any.
pub fn basic_auth_user(ctx: &Context) -> Option<&str> {
    ctx.value::<String>(user_key()).map(String::as_str)
}

/// Decode a `Basic` authorization header into user and password.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Compare a presented secret against the expected one without leaking
/// where they differ through timing.
pub fn credentials_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Only serves requests carrying credentials `check` accepts.
pub struct RequireBasicAuth<H, F> {
    inner: H,
    realm: String,
    check: F,
}

/// Guard `h` with basic auth. The authenticated user is available below
/// through [`basic_auth_user`].
pub fn require_basic_auth<H, F>(
    h: H,
    realm: impl Into<String>,
    check: F,
) -> RequireBasicAuth<H, F>
where
    H: Handler,
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    RequireBasicAuth {
        inner: h,
        realm: realm.into(),
        check,
    }
}

impl<H, F> RequireBasicAuth<H, F> {
    fn challenge(&self, w: &mut dyn ResponseWriter) {
        let value = format!("Basic realm=\"{}\"", self.realm.replace('"', "'"));
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                w.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
            Err(e) => warn!(error = %e, realm = %self.realm, "invalid auth realm"),
        }
    }
}

#[async_trait]
impl<H, F> Handler for RequireBasicAuth<H, F>
where
    H: Handler,
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let credentials = r
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_basic_auth);

        let (user, password) = match credentials {
            Some(credentials) => credentials,
            None => {
                self.challenge(w);
                handle_error(w, &r, &ErrorClass::Unauthorized.new("basic auth required"));
                return Ok(());
            }
        };
        if !(self.check)(&user, &password) {
            debug!(user = %user, "basic auth rejected");
            self.challenge(w);
            let err = ErrorClass::Unauthorized.new("invalid username or password");
            handle_error(w, &r, &err);
            return Ok(());
        }

        let ctx = r.context().with_value(user_key(), user);
        self.inner.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(&mut |route: Route| {
            cb(route.with_annotation("Auth", format!("basic realm={:?}", self.realm)))
        });
    }
}
