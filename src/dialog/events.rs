//! Inbound events, menu actions, and outbound instructions.
//!
//! Callback data arrives as strings from the transport; [`Action::parse`]
//! turns them into an enumerated type so dispatch is an exhaustive `match`
//! instead of a string-keyed handler table.

use std::path::PathBuf;

use crate::content::{Button, MenuId};

/// An event consumed by the dialog controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start` command.
    StartCommand {
        user_id: i64,
        username: Option<String>,
        first_name: String,
    },
    /// Free-text message.
    TextMessage { user_id: i64, text: String },
    /// Inline-keyboard selection; `data` is the raw callback payload.
    MenuSelection { user_id: i64, data: String },
}

impl InboundEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            Self::StartCommand { user_id, .. }
            | Self::TextMessage { user_id, .. }
            | Self::MenuSelection { user_id, .. } => *user_id,
        }
    }
}

/// A parsed menu action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BuyTicket,
    ChangeData,
    ConfirmYes,
    ConfirmNo,
    EventInfo,
    Venue,
    Schedule,
    AreaMap,
    LoftPlan,
    MainMenu,
    CheckPayment,
    Reconcile,
    /// Faculty selection; the key is validated against the option table.
    Faculty(String),
    /// Info-source selection; the key is validated against the option table.
    InfoSource(String),
}

impl Action {
    /// Parse raw callback data. `None` means an unknown option.
    pub fn parse(data: &str) -> Option<Action> {
        if let Some(key) = data.strip_prefix("faculty_") {
            return Some(Action::Faculty(key.to_string()));
        }
        if let Some(key) = data.strip_prefix("info_source_") {
            return Some(Action::InfoSource(key.to_string()));
        }
        match data {
            "buy_ticket" => Some(Action::BuyTicket),
            "change_data" => Some(Action::ChangeData),
            "confirm_yes" => Some(Action::ConfirmYes),
            "confirm_no" => Some(Action::ConfirmNo),
            "event_info" => Some(Action::EventInfo),
            "menu_venue" => Some(Action::Venue),
            "menu_schedule" => Some(Action::Schedule),
            "menu_map" => Some(Action::AreaMap),
            "menu_loft" => Some(Action::LoftPlan),
            "menu_main" => Some(Action::MainMenu),
            "check_payment" => Some(Action::CheckPayment),
            "send_result" => Some(Action::Reconcile),
            _ => None,
        }
    }
}

/// An instruction for the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Plain text prompt.
    Prompt { user_id: i64, text: String },
    /// A content menu with `{placeholder}` substitutions and optional
    /// extra buttons (the admin's reconcile button).
    Menu {
        user_id: i64,
        menu_id: MenuId,
        substitutions: Vec<(&'static str, String)>,
        extra_buttons: &'static [Button],
    },
    /// A group of photos sent together.
    MediaGroup { user_id: i64, photos: Vec<PathBuf> },
    /// A single document.
    Document { user_id: i64, path: PathBuf },
}

impl Outbound {
    pub fn prompt(user_id: i64, text: impl Into<String>) -> Self {
        Self::Prompt {
            user_id,
            text: text.into(),
        }
    }

    pub fn menu(user_id: i64, menu_id: MenuId) -> Self {
        Self::Menu {
            user_id,
            menu_id,
            substitutions: Vec::new(),
            extra_buttons: &[],
        }
    }
}
