//! Writer role proof.

/// Proof that the caller holds the cluster-wide writer role for a lockspace.
///
/// Exactly one host may mutate a lockspace index at any time. The election
/// that grants this role runs outside the index; the orchestration layer
/// implements this trait for whatever token that election hands out, and
/// must present it to [`Index::open_writable`](crate::Index::open_writable).
pub trait WriterRole {
    /// Lockspace the role was granted for.
    fn lockspace(&self) -> &str;
}

impl<T: WriterRole + ?Sized> WriterRole for &T {
    fn lockspace(&self) -> &str {
        (**self).lockspace()
    }
}
