//! Dialog controller — the per-user registration state machine.

pub mod controller;
pub mod events;
pub mod state;

pub use controller::DialogController;
pub use events::{Action, InboundEvent, Outbound};
pub use state::{DialogSession, DialogState};
