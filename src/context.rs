//! Immutable, type-keyed request context.
//!
//! Every [`Request`](crate::Request) carries a [`Context`]. Middleware that
//! wants to hand something to later stages derives a child context with
//! [`Context::with_value`] and swaps it into the request. Nothing is ever
//! mutated in place, so a context captured by one stage keeps seeing exactly
//! the values that existed when it was captured.
//!
//! ```text
//! root ── RequestIdKey("7f3a…") ── LoggerKey(log) ── LogEntryKey(entry)
//!                                                     ▲ newest, searched first
//! ```
//!
//! # Keys are types
//!
//! Values are looked up by their Rust type. A module that stores a value under
//! a private newtype (`struct LoggerKey(Logger)`) owns that slot outright:
//! no other crate can name the type, so no other crate can read or overwrite
//! it by accident. This is the same trick as an unexported key struct.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A persistent linked list of type-keyed values, newest first.
///
/// Cloning is one `Arc` clone. Deriving a child allocates one node and shares
/// the entire parent chain.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

struct Node {
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

impl Context {
    /// An empty context. Every lookup on it returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a child context holding `value`. `self` is left untouched.
    ///
    /// A value of the same type already present in the parent chain is
    /// shadowed, not replaced.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Node {
                value: Box::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Returns the most recently stored value of type `T`, falling back
    /// through parents.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            if let Some(v) = n.value.downcast_ref::<T>() {
                return Some(v);
            }
            node = n.parent.as_deref();
        }
        None
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            depth += 1;
            node = n.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("depth", &self.depth()).finish()
    }
}
