//! Per-request sessions backed by a pluggable store.
//!
//! [`with_store`] installs a [`SessionStore`] for a subtree. Below it,
//! [`load`] returns the session for a namespace, loading it from the store
//! the first time it is asked for in a request and returning the same
//! [`Session`] on every later call. Sessions are mutated in memory and
//! only persisted by an explicit [`Session::save`] (or wiped with
//! [`Session::clear`]).
//!
//! ```text
//! let session = session::load(&r, "visits").await?;
//! let n = session.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
//! session.set("count", n + 1);
//! session.save(r.context(), w).await?;
//! ```

mod cookie;

pub use cookie::{CookieOptions, CookieStore, MIN_SECRET_LEN};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::context::{Context, Symbol};
use crate::error::SessionError;
use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

// =============================================================================
// Store contract
// =============================================================================

/// What a store hands back for one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    /// `true` when nothing usable was stored for the namespace.
    pub is_new: bool,
    pub values: BTreeMap<String, Value>,
}

impl SessionData {
    /// A fresh, empty session.
    pub fn empty() -> Self {
        Self {
            is_new: true,
            values: BTreeMap::new(),
        }
    }
}

/// Persists session values.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for `namespace`. Missing or unreadable data is an
    /// empty, new session rather than an error.
    async fn load(
        &self,
        ctx: &Context,
        r: &Request,
        namespace: &str,
    ) -> Result<SessionData, SessionError>;

    /// Persist `data` for `namespace`.
    async fn save(
        &self,
        ctx: &Context,
        w: &mut dyn ResponseWriter,
        namespace: &str,
        data: &SessionData,
    ) -> Result<(), SessionError>;

    /// Remove whatever is stored for `namespace`.
    async fn clear(
        &self,
        ctx: &Context,
        w: &mut dyn ResponseWriter,
        namespace: &str,
    ) -> Result<(), SessionError>;
}

// =============================================================================
// Session
// =============================================================================

/// One namespace's session for the current request.
pub struct Session {
    namespace: String,
    store: Arc<dyn SessionStore>,
    data: Mutex<SessionData>,
}

impl Session {
    fn new(namespace: &str, store: Arc<dyn SessionStore>, data: SessionData) -> Self {
        Self {
            namespace: namespace.to_string(),
            store,
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the store had nothing for this namespace (and it has not
    /// been saved since).
    pub fn is_new(&self) -> bool {
        self.lock().is_new
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().values.remove(key)
    }

    /// A copy of all values.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.lock().values.clone()
    }

    /// Persist the current values through the store.
    pub async fn save(
        &self,
        ctx: &Context,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), SessionError> {
        let data = self.lock().clone();
        self.store.save(ctx, w, &self.namespace, &data).await?;
        self.lock().is_new = false;
        Ok(())
    }

    /// Drop all values, here and in the store.
    pub async fn clear(
        &self,
        ctx: &Context,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), SessionError> {
        self.lock().values.clear();
        self.store.clear(ctx, w, &self.namespace).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("namespace", &self.namespace)
            .field("data", &*self.lock())
            .finish()
    }
}

// =============================================================================
// Request-scoped cache
// =============================================================================

struct SessionCache {
    store: Arc<dyn SessionStore>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionCache {
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key() -> Symbol {
    static KEY: OnceLock<Symbol> = OnceLock::new();
    *KEY.get_or_init(Symbol::new)
}

/// Installs a session store for everything below it.
pub struct WithStore<H> {
    store: Arc<dyn SessionStore>,
    inner: H,
}

pub fn with_store<S, H>(store: S, h: H) -> WithStore<H>
where
    S: SessionStore + 'static,
    H: Handler,
{
    WithStore {
        store: Arc::new(store),
        inner: h,
    }
}

#[async_trait]
impl<H: Handler> Handler for WithStore<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let cache = Arc::new(SessionCache {
            store: Arc::clone(&self.store),
            sessions: Mutex::new(HashMap::new()),
        });
        let ctx = r.context().with_value(cache_key(), cache);
        self.inner.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}

/// The session for `namespace` in this request.
///
/// Fails with [`SessionError::NoStore`] unless a [`with_store`] wrapper is
/// upstream.
pub async fn load(r: &Request, namespace: &str) -> Result<Arc<Session>, SessionError> {
    let cache = r
        .context()
        .value::<Arc<SessionCache>>(cache_key())
        .ok_or(SessionError::NoStore)?;

    let cached = cache.sessions().get(namespace).cloned();
    if let Some(session) = cached {
        return Ok(session);
    }

    let data = cache.store.load(r.context(), r, namespace).await?;
    debug!(namespace, is_new = data.is_new, "loaded session");
    let session = Arc::new(Session::new(namespace, Arc::clone(&cache.store), data));

    let mut sessions = cache.sessions();
    let session = sessions
        .entry(namespace.to_string())
        .or_insert(session);
    Ok(Arc::clone(session))
}
