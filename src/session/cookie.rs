//! A session store that keeps everything in an encrypted cookie.
//!
//! Each namespace gets its own cookie. The value is
//! `base64url(nonce || XChaCha20-Poly1305(key, nonce, json(values)))`
//! where the key is the SHA-256 of the configured secret. Anything that
//! fails to decode, decrypt or parse loads as a new, empty session.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use http::header::SET_COOKIE;
use http::HeaderValue;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{SessionData, SessionStore};
use crate::context::Context;
use crate::error::{ErrorClass, HttpError, SessionError};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Shortest secret the store accepts, in bytes.
pub const MIN_SECRET_LEN: usize = 10;

const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;
const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Attributes of the session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    /// Lifetime in seconds. Zero leaves it a browser-session cookie;
    /// negative values expire it immediately.
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: 86_400 * 30,
            secure: false,
            http_only: false,
        }
    }
}

type SecretFn = Box<dyn Fn(&Context) -> Result<Vec<u8>, HttpError> + Send + Sync>;

/// Encrypted cookie session store.
pub struct CookieStore {
    options: CookieOptions,
    secret: SecretFn,
    key: Mutex<Option<[u8; KEY_LEN]>>,
}

impl CookieStore {
    /// A store keyed by a fixed secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let secret = secret.into();
        Self::lazy(move |_| Ok(secret.clone()))
    }

    /// A store whose secret is produced on first use.
    ///
    /// The callback runs at most once successfully; its result is hashed
    /// into the key and cached.
    pub fn lazy<F>(secret: F) -> Self
    where
        F: Fn(&Context) -> Result<Vec<u8>, HttpError> + Send + Sync + 'static,
    {
        Self {
            options: CookieOptions::default(),
            secret: Box::new(secret),
            key: Mutex::new(None),
        }
    }

    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    fn key(&self, ctx: &Context) -> Result<[u8; KEY_LEN], HttpError> {
        let mut cached = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = *cached {
            return Ok(key);
        }

        let secret = (self.secret)(ctx)?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ErrorClass::InternalServerError.new("cookie secret not long enough"));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&Sha256::digest(&secret));
        *cached = Some(key);
        Ok(key)
    }

    fn set_cookie(
        &self,
        w: &mut dyn ResponseWriter,
        name: &str,
        value: &str,
        expire: bool,
    ) -> Result<(), SessionError> {
        if !valid_cookie_name(name) {
            return Err(SessionError::InvalidCookie(name.to_string()));
        }

        let mut cookie = format!("{}={}", name, value);
        if !self.options.path.is_empty() {
            cookie.push_str(&format!("; Path={}", self.options.path));
        }
        if let Some(domain) = &self.options.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }
        if expire {
            cookie.push_str(&format!("; Expires={}; Max-Age=0", EXPIRED));
        } else if self.options.max_age > 0 {
            cookie.push_str(&format!("; Max-Age={}", self.options.max_age));
        } else if self.options.max_age < 0 {
            cookie.push_str("; Max-Age=0");
        }
        if self.options.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.options.secure {
            cookie.push_str("; Secure");
        }

        let header = HeaderValue::from_str(&cookie)
            .map_err(|_| SessionError::InvalidCookie(name.to_string()))?;
        w.headers_mut().append(SET_COOKIE, header);
        Ok(())
    }
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for CookieStore {
    async fn load(
        &self,
        ctx: &Context,
        r: &Request,
        namespace: &str,
    ) -> Result<SessionData, SessionError> {
        let key = self.key(ctx)?;

        let raw = match r.cookie(namespace) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(SessionData::empty()),
        };
        let sealed = match URL_SAFE.decode(raw) {
            Ok(sealed) => sealed,
            Err(e) => {
                debug!(namespace, error = %e, "session cookie is not base64");
                return Ok(SessionData::empty());
            }
        };
        let plain = match open(&key, &sealed) {
            Some(plain) => plain,
            None => {
                debug!(namespace, "session cookie failed to decrypt");
                return Ok(SessionData::empty());
            }
        };
        match serde_json::from_slice::<BTreeMap<String, Value>>(&plain) {
            Ok(values) => Ok(SessionData {
                is_new: false,
                values,
            }),
            Err(e) => {
                debug!(namespace, error = %e, "session cookie is not valid json");
                Ok(SessionData::empty())
            }
        }
    }

    async fn save(
        &self,
        ctx: &Context,
        w: &mut dyn ResponseWriter,
        namespace: &str,
        data: &SessionData,
    ) -> Result<(), SessionError> {
        let key = self.key(ctx)?;
        let plain = serde_json::to_vec(&data.values)
            .map_err(|e| SessionError::Serialize(e.to_string()))?;
        let sealed = seal(&key, &plain)?;
        self.set_cookie(w, namespace, &URL_SAFE.encode(sealed), false)
    }

    async fn clear(
        &self,
        _ctx: &Context,
        w: &mut dyn ResponseWriter,
        namespace: &str,
    ) -> Result<(), SessionError> {
        self.set_cookie(w, namespace, "", true)
    }
}

// =============================================================================
// Sealing
// =============================================================================

fn seal(key: &[u8; KEY_LEN], plain: &[u8]) -> Result<Vec<u8>, SessionError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plain)
        .map_err(|_| SessionError::Seal)?;
    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Option<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return None;
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    XChaCha20Poly1305::new(Key::from_slice(key))
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .ok()
}

/// Cookie names are RFC 7230 tokens.
fn valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
