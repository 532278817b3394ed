use std::hash::Hash;
use std::hash::Hasher;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Receipt for a listener registration.
///
/// Two tokens compare equal only if they come from the same registration,
/// even when they carry the same tag. The id is taken from a process-wide
/// monotonic counter, so equality is registration identity, not tag value.
#[derive(Debug, Clone)]
pub struct Token<T> {
    id: u64,
    tag: T,
}

impl<T> Token<T> {
    pub(crate) fn new(tag: T) -> Self {
        Self {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            tag,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The tag this token was registered under
    pub fn tag(&self) -> &T {
        &self.tag
    }
}

impl<T> PartialEq for Token<T> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Token<T> {}

impl<T> Hash for Token<T> {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.id.hash(state);
    }
}
