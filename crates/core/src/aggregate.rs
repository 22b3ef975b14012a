//! Aggregate root trait for mutable in-memory domain models.

/// Aggregate root marker + minimal interface.
///
/// Kept small on purpose: the aggregate decides how it evolves its state, this
/// trait only exposes identity and a version counter for callers that need to
/// tell two observations of the same aggregate apart (e.g. snapshots).
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per completed mutation; no-op operations leave it as is.
    fn version(&self) -> u64;
}
