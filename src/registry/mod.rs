//! Guest registry — durable participant profiles and payment counters.

pub mod model;
pub mod store;

pub use model::GuestRecord;
pub use store::{GuestStore, JsonFileStore};
