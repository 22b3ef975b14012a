//! Entity trait: identity that survives edits and reordering.

/// Anything the ledger looks up by id rather than by position.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
