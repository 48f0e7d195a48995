//! Guest profile records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted profile for one participant.
///
/// Owned by the registry store; mutated only through the dialog controller
/// and the payment-check handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRecord {
    /// Telegram user id — unique key of the registry.
    pub user_id: i64,
    /// Display handle; falls back to the stringified id when absent.
    pub username: String,
    /// First name as reported by the transport.
    pub first_name: String,
    /// Full legal name ("Фамилия Имя Отчество"), collected during registration.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Institution (university), collected during registration.
    #[serde(default)]
    pub university: Option<String>,
    /// Faculty label resolved from the menu selection.
    #[serde(default)]
    pub faculty: Option<String>,
    /// How the participant heard about the event.
    #[serde(default)]
    pub info_source: Option<String>,
    /// When the participant was first seen.
    pub registered_at: DateTime<Utc>,
    /// True only after the participant explicitly confirmed their data.
    #[serde(default)]
    pub confirmed: bool,
    /// How many successful payment checks this participant has made.
    /// Mirrors the authoritative counter in the payment store.
    #[serde(default)]
    pub payment_checks: u32,
}

impl GuestRecord {
    /// Create a first-seen record with the registration timestamp set now.
    pub fn new(user_id: i64, username: Option<&str>, first_name: &str) -> Self {
        let username = username
            .map(String::from)
            .unwrap_or_else(|| user_id.to_string());
        Self {
            user_id,
            username,
            first_name: first_name.to_string(),
            full_name: None,
            university: None,
            faculty: None,
            info_source: None,
            registered_at: Utc::now(),
            confirmed: false,
            payment_checks: 0,
        }
    }

    /// Clear the collected fields and the confirmation flag. Used when the
    /// participant asks to re-enter their data.
    pub fn clear_registration(&mut self) {
        self.full_name = None;
        self.university = None;
        self.faculty = None;
        self.info_source = None;
        self.confirmed = false;
    }
}
