//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Timestamp used for the default listing order (newest first).
    fn created_at(&self) -> DateTime<Utc>;
}

/// Sort entities newest first, breaking ties by id display order so the
/// result is deterministic.
pub fn newest_first<E>(items: &mut [E])
where
    E: Entity,
    E::Id: core::fmt::Display,
{
    items.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().to_string().cmp(&a.id().to_string()))
    });
}
