use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// A serializable stand-in for a closure living on the other side.
///
/// The holder cannot call it directly. It answers by making an ordinary
/// outbound call that carries the token back, and the originator looks the
/// token up in its [`CallbackRegistry`].
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Callback<T> {
    id: u64,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Callback<T> {
    pub fn from_id(id: u64) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Callback<T> {}

impl<T> PartialEq for Callback<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Callback<T> {}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.id).finish()
    }
}

type Pending<T> = Box<dyn FnOnce(T) + Send>;

/// Caller-side table of callbacks awaiting an answer from the peer.
pub struct CallbackRegistry<T> {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Pending<T>>>,
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `on_result` and returns the token to pass to the peer.
    pub fn register(&self, on_result: impl FnOnce(T) + Send + 'static) -> Callback<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Box::new(on_result));
        Callback::from_id(id)
    }

    /// Runs the callback for `token`. Returns `false` for unknown or already
    /// completed tokens.
    pub fn complete(&self, token: Callback<T>, value: T) -> bool {
        let entry = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token.id);
        match entry {
            Some(on_result) => {
                on_result(value);
                true
            }
            None => {
                tracing::debug!(id = token.id, "callback token not pending");
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("pending", &self.pending())
            .finish()
    }
}
