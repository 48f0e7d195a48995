//! Transport layer. The only implementation is the Telegram Bot API
//! channel; the dialog controller itself is transport-agnostic.

pub mod telegram;

pub use telegram::TelegramChannel;
