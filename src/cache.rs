//! A mutable, request-scoped cache.
//!
//! The context [`Store`](crate::context::Store) is immutable;
//! some things (a user record looked up by an auth layer and reused by a
//! leaf, say) are more naturally memoized. [`register`] installs an empty
//! cache for each request passing through it, and [`set`], [`get`] and
//! [`remove`] operate on the nearest one.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;

use crate::context::{Context, Symbol};
use crate::handler::{Handler, Outcome};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::Route;

type Entries = HashMap<Symbol, Arc<dyn Any + Send + Sync>>;

#[derive(Default)]
struct RequestCache {
    entries: Mutex<Entries>,
}

impl RequestCache {
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key() -> Symbol {
    static KEY: OnceLock<Symbol> = OnceLock::new();
    *KEY.get_or_init(Symbol::new)
}

fn nearest(ctx: &Context) -> Option<&Arc<RequestCache>> {
    ctx.value::<Arc<RequestCache>>(cache_key())
}

/// Installs a fresh cache per request, unless one is already installed.
pub struct Register<H> {
    inner: H,
}

pub fn register<H: Handler>(h: H) -> Register<H> {
    Register { inner: h }
}

#[async_trait]
impl<H: Handler> Handler for Register<H> {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        if nearest(r.context()).is_some() {
            return self.inner.serve(w, r).await;
        }
        let ctx = r
            .context()
            .with_value(cache_key(), Arc::new(RequestCache::default()));
        self.inner.serve(w, r.with_context(ctx)).await
    }

    fn routes(&self, cb: &mut dyn FnMut(Route)) {
        self.inner.routes(cb)
    }
}

/// Store `value` under `key`. Returns `false` if no cache is registered.
pub fn set<T>(ctx: &Context, key: Symbol, value: T) -> bool
where
    T: Any + Send + Sync,
{
    match nearest(ctx) {
        Some(cache) => {
            cache.entries().insert(key, Arc::new(value));
            true
        }
        None => false,
    }
}

/// The value under `key`, if present and of type `T`.
pub fn get<T>(ctx: &Context, key: Symbol) -> Option<Arc<T>>
where
    T: Any + Send + Sync,
{
    let value = nearest(ctx)?.entries().get(&key).cloned()?;
    value.downcast::<T>().ok()
}

/// Drop the value under `key`.
pub fn remove(ctx: &Context, key: Symbol) {
    if let Some(cache) = nearest(ctx) {
        cache.entries().remove(&key);
    }
}
