//! Infrastructure layer: directory storage backends and startup seeding.

pub mod seed;
pub mod store;

pub use seed::{ensure_default_groups, ensure_superuser, BootstrapSuperuser, SeedError};
pub use store::{DirectoryStore, InMemoryDirectoryStore, SharedStore, StoreError, StoreResult, UserUpdate, UserWrite};
#[cfg(feature = "postgres")]
pub use store::PostgresDirectoryStore;
