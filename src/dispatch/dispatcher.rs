use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::DispatchError;
use crate::Result;
use crate::TagListener;
use crate::Token;

#[derive(Clone)]
struct Registration<D, E> {
    token_id: u64,
    listener: TagListener<D, E>,
}

/// Tag-keyed delivery registry with at most one listener per tag.
///
/// `unicast` routes data events, `broadcast_error` routes error events to
/// every registration. Listeners that signal consumption on delivery are
/// removed; `close_all` clears the registry unconditionally after a final
/// error broadcast.
pub struct TagDispatcher<T, D, E> {
    listeners: DashMap<T, Registration<D, E>>,
}

impl<T, D, E> Default for TagDispatcher<T, D, E>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }
}

impl<T, D, E> TagDispatcher<T, D, E>
where
    T: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    D: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `tag`.
    ///
    /// Fails without touching the registry when the tag is already taken.
    pub fn add_listener(
        &self,
        tag: T,
        listener: TagListener<D, E>,
    ) -> Result<Token<T>> {
        match self.listeners.entry(tag.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(DispatchError::DuplicateTag(format!("{tag:?}")).into())
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let token = Token::new(tag);
                vacant.insert(Registration {
                    token_id: token.id(),
                    listener,
                });
                Ok(token)
            }
        }
    }

    /// Shorthand wrapping `fn` in a persistent synchronous listener
    pub fn add_callback<F>(
        &self,
        tag: T,
        fn_: F,
    ) -> Result<Token<T>>
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        self.add_listener(tag, TagListener::sync(fn_))
    }

    /// Shorthand wrapping `fn` in a persistent listener scheduled onto the
    /// runtime instead of running inline
    pub fn add_callback_async<F>(
        &self,
        tag: T,
        fn_: F,
    ) -> Result<Token<T>>
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        self.add_listener(tag, TagListener::spawned(fn_))
    }

    /// Register a oneshot settlement channel under `tag`.
    ///
    /// The first data event resolves the channel with `Ok`, the first error
    /// event with `Err`; either settlement spends the registration.
    pub fn add_future(
        &self,
        tag: T,
        tx: oneshot::Sender<std::result::Result<D, E>>,
    ) -> Result<Token<T>>
    where
        D: Sync,
        E: Sync,
    {
        let slot = Arc::new(Mutex::new(Some(tx)));
        let err_slot = Arc::clone(&slot);
        let listener = TagListener::sync_oneshot(move |data: D| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Ok(data));
            }
        })
        .with_error(move |err: E| {
            if let Some(tx) = err_slot.lock().take() {
                let _ = tx.send(Err(err));
            }
        });
        self.add_listener(tag, listener)
    }

    /// Deliver `data` to the listener registered under `tag`.
    ///
    /// Fails when no listener is registered; a consumed oneshot listener is
    /// removed afterwards, so a second unicast on the same tag fails too.
    pub fn unicast(
        &self,
        tag: &T,
        data: D,
    ) -> Result<()> {
        // Clone out of the map before invoking: a sync callback may
        // re-enter the dispatcher and must not deadlock on the shard lock.
        let (token_id, listener) = match self.listeners.get(tag) {
            Some(entry) => (entry.token_id, entry.listener.clone()),
            None => return Err(DispatchError::UnknownTag(format!("{tag:?}")).into()),
        };

        if listener.data(data) {
            trace!("oneshot listener for tag {tag:?} consumed, removing");
            self.remove_if_current(tag, token_id);
        }
        Ok(())
    }

    /// Deliver `err` to every registered listener.
    ///
    /// Traverses a snapshot, so removals performed during delivery do not
    /// affect the traversal; listeners signaling consumption are removed.
    pub fn broadcast_error(
        &self,
        err: E,
    ) {
        for (tag, token_id, listener) in self.snapshot() {
            if listener.error(err.clone()) {
                self.remove_if_current(&tag, token_id);
            }
        }
    }

    /// Remove the listener registered under `tag`
    pub fn remove_listener(
        &self,
        tag: &T,
    ) -> Result<()> {
        self.listeners
            .remove(tag)
            .map(|_| ())
            .ok_or_else(|| DispatchError::UnknownTag(format!("{tag:?}")).into())
    }

    /// Broadcast `err` to every listener, then clear the whole registry
    /// regardless of individual consumption signals.
    pub fn close_all(
        &self,
        err: E,
    ) {
        for (_, _, listener) in self.snapshot() {
            listener.error(err.clone());
        }
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn snapshot(&self) -> Vec<(T, u64, TagListener<D, E>)> {
        self.listeners
            .iter()
            .map(|entry| (entry.key().clone(), entry.token_id, entry.listener.clone()))
            .collect()
    }

    /// Remove the registration for `tag` only if it is still the delivery
    /// target; a replacement registered during delivery stays untouched.
    fn remove_if_current(
        &self,
        tag: &T,
        token_id: u64,
    ) {
        self.listeners.remove_if(tag, |_, reg| reg.token_id == token_id);
    }
}
