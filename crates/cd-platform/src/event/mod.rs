//! Community Event Aggregate

pub mod entity;

pub use entity::{CommunityEvent, EventFormat};

pub type EventRepository = crate::collection::CollectionRepository<CommunityEvent>;
