use std::fmt::Debug;
use std::sync::Arc;

type DataFn<D> = Arc<dyn Fn(D) + Send + Sync>;
type ErrorFn<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Behavioral variant of a [`TagListener`].
///
/// Sync kinds run the callback inline on the delivering task; async kinds
/// schedule it onto the runtime with `tokio::spawn` and never run inline.
/// Oneshot kinds report themselves consumed after the first delivery on
/// either channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    SyncPersistent,
    SyncOneshot,
    AsyncPersistent,
    AsyncOneshot,
}

impl ListenerKind {
    fn is_oneshot(&self) -> bool {
        matches!(self, ListenerKind::SyncOneshot | ListenerKind::AsyncOneshot)
    }

    fn is_async(&self) -> bool {
        matches!(self, ListenerKind::AsyncPersistent | ListenerKind::AsyncOneshot)
    }
}

/// A registered consumer for one tag.
///
/// Data and error channels are independent callbacks; a listener without an
/// error callback silently drops errors. Both delivery methods return `true`
/// when the listener is consumed and must be removed from the registry.
#[derive(Clone)]
pub struct TagListener<D, E> {
    on_data: DataFn<D>,
    on_error: Option<ErrorFn<E>>,
    kind: ListenerKind,
}

impl<D, E> Debug for TagListener<D, E> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TagListener").field("kind", &self.kind).finish()
    }
}

impl<D, E> TagListener<D, E>
where
    D: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F>(
        kind: ListenerKind,
        on_data: F,
    ) -> Self
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        Self {
            on_data: Arc::new(on_data),
            on_error: None,
            kind,
        }
    }

    /// Persistent listener invoked inline
    pub fn sync<F>(on_data: F) -> Self
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        Self::new(ListenerKind::SyncPersistent, on_data)
    }

    /// Inline listener that is removed after its first delivery
    pub fn sync_oneshot<F>(on_data: F) -> Self
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        Self::new(ListenerKind::SyncOneshot, on_data)
    }

    /// Persistent listener scheduled onto the runtime instead of running inline
    pub fn spawned<F>(on_data: F) -> Self
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        Self::new(ListenerKind::AsyncPersistent, on_data)
    }

    /// Scheduled listener that is removed after its first delivery
    pub fn spawned_oneshot<F>(on_data: F) -> Self
    where
        F: Fn(D) + Send + Sync + 'static,
    {
        Self::new(ListenerKind::AsyncOneshot, on_data)
    }

    /// Attach an error-channel callback
    pub fn with_error<F>(
        mut self,
        on_error: F,
    ) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Deliver `data`. Returns `true` if the listener is consumed.
    pub fn data(
        &self,
        data: D,
    ) -> bool {
        if self.kind.is_async() {
            let cb = Arc::clone(&self.on_data);
            tokio::spawn(async move {
                cb(data);
            });
        } else {
            (self.on_data)(data);
        }
        self.kind.is_oneshot()
    }

    /// Deliver `err`. Returns `true` if the listener is consumed.
    ///
    /// Oneshot listeners signal consumption even when no error callback is
    /// attached: the registration is spent either way.
    pub fn error(
        &self,
        err: E,
    ) -> bool {
        if let Some(on_error) = &self.on_error {
            if self.kind.is_async() {
                let cb = Arc::clone(on_error);
                tokio::spawn(async move {
                    cb(err);
                });
            } else {
                on_error(err);
            }
        }
        self.kind.is_oneshot()
    }
}
