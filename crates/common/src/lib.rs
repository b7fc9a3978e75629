//! Shared identifier types for the order saga workspace.

mod ids;

pub use ids::AggregateId;

#[doc(hidden)]
pub use uuid::Error as __UuidError;
#[doc(hidden)]
pub use uuid::Uuid as __Uuid;
