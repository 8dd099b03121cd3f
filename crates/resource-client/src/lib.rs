//! Resource store client
//!
//! Typed, versioned resources and the store interface the catalog controllers
//! consume, plus an in-memory implementation of that interface.
//!
//! # Example
//!
//! ```no_run
//! use resource_client::{MemoryResourceClient, Resource, ResourceClientTrait, ResourceId, ResourceType, Tenancy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! const WIDGET: ResourceType = ResourceType::new_static("demo", "v1", "Widget");
//!
//! let client = MemoryResourceClient::new([WIDGET]);
//! let id = ResourceId::new(WIDGET, Tenancy::new("default", "default"), "w1");
//!
//! let written = client.write(Resource::new(id.clone(), &serde_json::json!({"size": 3}))?).await?;
//! assert_eq!(written.generation, 1);
//!
//! // CAS delete against the version we just observed
//! client.delete(&id, Some(written.version)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Semantics
//!
//! - **Versions**: every write bumps `version`; `generation` moves only when data changes
//! - **Compare-and-swap**: non-zero write versions and delete versions must match
//! - **Tombstones**: deleting a resource leaves a [`Tombstone`] naming it as owner
//! - **Watch**: every mutation is broadcast as a [`WatchEvent`]

pub mod error;
pub mod memory;
pub mod models;
#[path = "trait.rs"]
pub mod resource_trait;

pub use error::ResourceError;
pub use memory::{MemoryResourceClient, Operation};
pub use models::*;
pub use resource_trait::ResourceClientTrait;
