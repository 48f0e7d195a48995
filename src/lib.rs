//! Event Registrar — conversational ticket-registration bot.

pub mod channels;
pub mod config;
pub mod content;
pub mod dialog;
pub mod error;
pub mod reconcile;
pub mod registry;
