//! Repository abstraction layer for the Arbiter decision engine
//!
//! This crate defines the read/write contracts the engine relies on:
//!
//! - [`DataModelRepository`]: per-organization table definitions
//! - [`ScenarioRepository`]: scenarios and their iterations, with atomic commit
//! - [`PublicationRepository`]: the publication log and the live iteration pointer
//! - [`DecisionRepository`]: stored decisions
//!
//! [`MemoryRepository`] implements all of them in process, and can be seeded
//! from a [`RepositorySnapshot`] file.

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::MemoryRepository;
pub use snapshot::RepositorySnapshot;
pub use traits::{
    DataModelRepository, DecisionRepository, EngineRepository, PublicationRepository,
    ScenarioRepository,
};
