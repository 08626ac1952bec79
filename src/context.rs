//! Request-scoped context.
//!
//! Every in-flight request carries a [`Context`]: an immutable, chained
//! key/value [`Store`] plus a cancellation token. Handlers never mutate a
//! store; they derive a child with one extra binding and pass that down.
//! Earlier snapshots stay valid, which is what lets the disconnect watcher
//! hold a store while the main path keeps deriving new ones.
//!
//! # Keys
//!
//! Keys are [`Symbol`]s, minted from a process-wide counter. Two symbols
//! created by independent components can never compare equal, so there is
//! no way for one component to read or shadow another's bindings by
//! guessing a name.
//!
//! ```
//! use weft::context::{Store, Symbol};
//!
//! let user = Symbol::new();
//! let root = Store::new();
//! let child = root.with_value(user, String::from("ada"));
//!
//! assert_eq!(child.value::<String>(user).map(String::as_str), Some("ada"));
//! assert!(root.value::<String>(user).is_none());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Symbol
// =============================================================================

/// An unforgeable context key.
///
/// Only [`Symbol::new`] creates one. Symbols are `Copy` so they can live in
/// statics or struct fields, but two calls to `new` always produce values
/// that compare unequal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u64);

impl Symbol {
    /// Mint a fresh symbol.
    pub fn new() -> Self {
        Symbol(NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol(#{})", self.0)
    }
}

// =============================================================================
// Store
// =============================================================================

struct Node {
    parent: Option<Arc<Node>>,
    key: Symbol,
    value: Arc<dyn Any + Send + Sync>,
}

/// Persistent association list of context values.
///
/// Cloning is cheap (one `Arc` bump) and clones share structure with the
/// original.
#[derive(Clone, Default)]
pub struct Store {
    head: Option<Arc<Node>>,
}

impl Store {
    /// An empty store.
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Derive a child store with `key` bound to `value`.
    ///
    /// The receiver is left untouched.
    pub fn with_value<T>(&self, key: Symbol, value: T) -> Store
    where
        T: Any + Send + Sync,
    {
        self.with_shared(key, Arc::new(value))
    }

    /// Like [`with_value`](Self::with_value) for a value that is already
    /// behind an `Arc`.
    pub fn with_shared(&self, key: Symbol, value: Arc<dyn Any + Send + Sync>) -> Store {
        Store {
            head: Some(Arc::new(Node {
                parent: self.head.clone(),
                key,
                value,
            })),
        }
    }

    /// Look up the nearest binding for `key`.
    ///
    /// Returns `None` when the key was never bound or when the nearest
    /// binding holds a value of a different type.
    pub fn value<T: Any>(&self, key: Symbol) -> Option<&T> {
        self.lookup(key).and_then(|value| value.downcast_ref::<T>())
    }

    /// Untyped lookup of the nearest binding for `key`.
    pub fn lookup(&self, key: Symbol) -> Option<&(dyn Any + Send + Sync)> {
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            if node.key == key {
                return Some(node.value.as_ref());
            }
            cursor = node.parent.as_deref();
        }
        None
    }

    /// Number of bindings on the chain, shadowed ones included.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            depth += 1;
            cursor = node.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("depth", &self.depth()).finish()
    }
}

// =============================================================================
// Context
// =============================================================================

/// Values and cancellation state for one request.
#[derive(Clone, Debug, Default)]
pub struct Context {
    store: Store,
    cancel: CancellationToken,
}

impl Context {
    /// A context with no values and a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context with one more binding. Shares the cancellation token.
    pub fn with_value<T>(&self, key: Symbol, value: T) -> Context
    where
        T: Any + Send + Sync,
    {
        Context {
            store: self.store.with_value(key, value),
            cancel: self.cancel.clone(),
        }
    }

    /// Derive a context that shares an already-allocated value.
    pub fn with_shared(&self, key: Symbol, value: Arc<dyn Any + Send + Sync>) -> Context {
        Context {
            store: self.store.with_shared(key, value),
            cancel: self.cancel.clone(),
        }
    }

    /// Derive a context that observes `token` instead of the current one.
    pub fn with_cancellation(&self, token: CancellationToken) -> Context {
        Context {
            store: self.store.clone(),
            cancel: token,
        }
    }

    /// Typed lookup, see [`Store::value`].
    pub fn value<T: Any>(&self, key: Symbol) -> Option<&T> {
        self.store.value(key)
    }

    /// The underlying value store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The request's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the request has been cancelled (typically: client went away).
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the request is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

// =============================================================================
// Tests
// =============================================================================
