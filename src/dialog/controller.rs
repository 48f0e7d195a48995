//! Dialog controller — owns the per-user sessions, validates input,
//! mutates guest records through the store, and emits outbound
//! instructions for the transport.
//!
//! Every event is handled under one lock, so at most one state transition
//! is in flight at a time — the snapshot store requires a single writer.
//! A transition commits the updated registry before touching in-memory
//! state; a failed commit leaves record and session exactly as they were.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::content::{self, Button, MenuId};
use crate::dialog::events::{Action, InboundEvent, Outbound};
use crate::dialog::state::{DialogSession, DialogState};
use crate::error::{DialogError, Error, StoreError};
use crate::reconcile::{LedgerSource, Matcher};
use crate::registry::{GuestRecord, GuestStore};

struct ControllerState {
    guests: HashMap<i64, GuestRecord>,
    payments: HashMap<String, u32>,
    sessions: HashMap<i64, DialogSession>,
}

/// The registration dialog engine. Transport-independent: consumes
/// [`InboundEvent`]s, returns [`Outbound`] instructions.
pub struct DialogController {
    store: Arc<dyn GuestStore>,
    ledger: Arc<dyn LedgerSource>,
    matcher: Matcher,
    admin_ids: HashSet<i64>,
    media_dir: PathBuf,
    inner: Mutex<ControllerState>,
}

impl DialogController {
    /// Build the controller, loading both snapshots from the store.
    pub async fn new(
        store: Arc<dyn GuestStore>,
        ledger: Arc<dyn LedgerSource>,
        admin_ids: HashSet<i64>,
        media_dir: PathBuf,
    ) -> Self {
        let guests = store.load_guests().await;
        let payments = store.load_payments().await;
        tracing::info!(
            guests = guests.len(),
            payments = payments.len(),
            "Dialog controller initialized"
        );
        Self {
            store,
            ledger,
            matcher: Matcher::new(),
            admin_ids,
            media_dir,
            inner: Mutex::new(ControllerState {
                guests,
                payments,
                sessions: HashMap::new(),
            }),
        }
    }

    /// Handle one inbound event to completion.
    ///
    /// Dialog-level failures (validation, unknown options, missing
    /// sessions) are logged and answered with a user-facing prompt; only
    /// persistence failures propagate as errors.
    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<Outbound>, Error> {
        let mut state = self.inner.lock().await;
        match event {
            InboundEvent::StartCommand {
                user_id,
                username,
                first_name,
            } => self.start(&mut state, user_id, username, &first_name).await,
            InboundEvent::TextMessage { user_id, text } => {
                self.submit_text(&mut state, user_id, &text).await
            }
            InboundEvent::MenuSelection { user_id, data } => {
                self.menu_selection(&mut state, user_id, &data).await
            }
        }
    }

    /// Snapshot of the current registry (test/diagnostic access).
    pub async fn guest(&self, user_id: i64) -> Option<GuestRecord> {
        self.inner.lock().await.guests.get(&user_id).cloned()
    }

    /// Current dialog state for a participant.
    pub async fn dialog_state(&self, user_id: i64) -> Option<DialogState> {
        let state = self.inner.lock().await;
        effective_state(&state, user_id)
    }

    // ── Operations ──────────────────────────────────────────────────

    async fn start(
        &self,
        state: &mut ControllerState,
        user_id: i64,
        username: Option<String>,
        first_name: &str,
    ) -> Result<Vec<Outbound>, Error> {
        let record = match state.guests.get(&user_id) {
            Some(existing) => existing.clone(),
            None => {
                let record = GuestRecord::new(user_id, username.as_deref(), first_name);
                self.commit_guest(state, record.clone()).await?;
                tracing::info!(user_id, "New guest created");
                record
            }
        };

        if record.confirmed {
            // Returning participant: no collection pass, state stays Registered.
            state.sessions.remove(&user_id);
        } else {
            state
                .sessions
                .insert(user_id, DialogSession::new(user_id, DialogState::CollectingName));
        }

        let menu_id = if record.confirmed {
            MenuId::MainMenuRegistered
        } else {
            MenuId::MainMenuNew
        };
        tracing::debug!(user_id, confirmed = record.confirmed, "Start handled");
        Ok(self.main_menu(user_id, menu_id, &record))
    }

    async fn submit_text(
        &self,
        state: &mut ControllerState,
        user_id: i64,
        text: &str,
    ) -> Result<Vec<Outbound>, Error> {
        let Some(record) = state.guests.get(&user_id).cloned() else {
            return Ok(self.session_not_found(user_id));
        };

        let dialog_state = effective_state_of(state, user_id);
        if !dialog_state.expects_text() {
            tracing::debug!(user_id, state = %dialog_state, "Free text outside a collection step; ignored");
            return Ok(Vec::new());
        }

        let trimmed = text.trim();
        if dialog_state == DialogState::CollectingName {
            if trimmed.is_empty() {
                return Ok(self.validation_error(user_id, "empty name", content::INVALID_NAME));
            }
            let mut updated = record;
            updated.full_name = Some(trimmed.to_string());
            self.commit_guest(state, updated).await?;
            self.advance_session(state, user_id, dialog_state);
            tracing::info!(user_id, "Full name collected");
            Ok(vec![Outbound::prompt(user_id, content::ENTER_UNIVERSITY)])
        } else {
            if trimmed.is_empty() {
                return Ok(self.validation_error(
                    user_id,
                    "empty university",
                    content::INVALID_UNIVERSITY,
                ));
            }
            let mut updated = record;
            updated.university = Some(trimmed.to_string());
            self.commit_guest(state, updated).await?;
            self.advance_session(state, user_id, dialog_state);
            tracing::info!(user_id, "University collected");
            Ok(self.expand_menu(user_id, MenuId::Faculty, Vec::new(), &[]))
        }
    }

    async fn menu_selection(
        &self,
        state: &mut ControllerState,
        user_id: i64,
        data: &str,
    ) -> Result<Vec<Outbound>, Error> {
        let Some(action) = Action::parse(data) else {
            return Ok(self.unknown_option(user_id, data));
        };

        match action {
            Action::BuyTicket => self.buy_ticket(state, user_id),
            Action::ChangeData => self.edit(state, user_id).await,
            Action::ConfirmYes => self.confirm(state, user_id, true).await,
            Action::ConfirmNo => self.confirm(state, user_id, false).await,
            Action::Faculty(key) => self.select_faculty(state, user_id, &key).await,
            Action::InfoSource(key) => self.select_info_source(state, user_id, &key).await,
            Action::CheckPayment => self.payment_check(state, user_id).await,
            Action::Reconcile => self.reconcile(state, user_id).await,
            Action::EventInfo => Ok(self.expand_menu(user_id, MenuId::EventInfo, Vec::new(), &[])),
            Action::Venue => Ok(self.expand_menu(user_id, MenuId::Venue, Vec::new(), &[])),
            Action::Schedule => Ok(self.expand_menu(user_id, MenuId::Schedule, Vec::new(), &[])),
            Action::AreaMap => Ok(self.expand_menu(user_id, MenuId::AreaMap, Vec::new(), &[])),
            Action::LoftPlan => Ok(self.expand_menu(user_id, MenuId::LoftPlan, Vec::new(), &[])),
            Action::MainMenu => {
                let Some(record) = state.guests.get(&user_id).cloned() else {
                    return Ok(self.session_not_found(user_id));
                };
                let menu_id = if record.confirmed {
                    MenuId::MainMenuRegistered
                } else {
                    MenuId::MainMenuNew
                };
                Ok(self.main_menu(user_id, menu_id, &record))
            }
        }
    }

    fn buy_ticket(
        &self,
        state: &mut ControllerState,
        user_id: i64,
    ) -> Result<Vec<Outbound>, Error> {
        if !state.guests.contains_key(&user_id) {
            return Ok(self.session_not_found(user_id));
        }
        // Re-entry is idempotent: pressing the button again just restarts
        // the collection pass.
        self.set_session(state, user_id, DialogState::CollectingName);
        tracing::info!(user_id, "Ticket purchase started");
        Ok(vec![Outbound::prompt(user_id, content::PAYMENT_INSTRUCTIONS)])
    }

    async fn select_faculty(
        &self,
        state: &mut ControllerState,
        user_id: i64,
        key: &str,
    ) -> Result<Vec<Outbound>, Error> {
        let Some(record) = state.guests.get(&user_id).cloned() else {
            return Ok(self.session_not_found(user_id));
        };
        let Some(label) = content::faculty_label(key) else {
            return Ok(self.unknown_option(user_id, key));
        };

        let mut updated = record;
        updated.faculty = Some(label.to_string());
        self.commit_guest(state, updated).await?;
        self.advance_session(state, user_id, DialogState::CollectingFaculty);
        tracing::info!(user_id, faculty = label, "Faculty selected");
        Ok(self.expand_menu(user_id, MenuId::InfoSource, Vec::new(), &[]))
    }

    async fn select_info_source(
        &self,
        state: &mut ControllerState,
        user_id: i64,
        key: &str,
    ) -> Result<Vec<Outbound>, Error> {
        let Some(record) = state.guests.get(&user_id).cloned() else {
            return Ok(self.session_not_found(user_id));
        };
        let Some(label) = content::info_source_label(key) else {
            return Ok(self.unknown_option(user_id, key));
        };

        let mut updated = record;
        updated.info_source = Some(label.to_string());
        self.commit_guest(state, updated).await?;
        self.advance_session(state, user_id, DialogState::CollectingInfoSource);
        tracing::info!(user_id, source = label, "Info source selected");

        let record = &state.guests[&user_id];
        let substitutions = vec![
            ("name", record.full_name.clone().unwrap_or_default()),
            ("university", record.university.clone().unwrap_or_default()),
            ("faculty", record.faculty.clone().unwrap_or_default()),
            ("info_source", record.info_source.clone().unwrap_or_default()),
        ];
        Ok(self.expand_menu(user_id, MenuId::Confirmation, substitutions, &[]))
    }

    async fn confirm(
        &self,
        state: &mut ControllerState,
        user_id: i64,
        accepted: bool,
    ) -> Result<Vec<Outbound>, Error> {
        let Some(record) = state.guests.get(&user_id).cloned() else {
            return Ok(self.session_not_found(user_id));
        };
        if effective_state_of(state, user_id) != DialogState::AwaitingConfirmation {
            tracing::warn!(user_id, "Confirmation outside AwaitingConfirmation; ignored");
            return Ok(self.session_not_found(user_id));
        }

        if accepted {
            let mut updated = record.clone();
            updated.confirmed = true;
            self.commit_guest(state, updated).await?;
            // The pass reaches its terminal state, which the confirmed
            // record now encodes on its own; the transient session goes away.
            if let Some(session) = state.sessions.get_mut(&user_id) {
                if session.advance().is_some_and(|next| next.is_terminal()) {
                    state.sessions.remove(&user_id);
                }
            }
            tracing::info!(user_id, "Registration confirmed");
            Ok(self.main_menu(user_id, MenuId::MainMenuRegistered, &state.guests[&user_id]))
        } else {
            // Restart the pass at name collection. Previously entered
            // fields are kept; each step overwrites on re-entry.
            self.set_session(state, user_id, DialogState::CollectingName);
            tracing::info!(user_id, "Registration rejected; restarting collection");
            Ok(vec![Outbound::prompt(user_id, content::ENTER_NAME)])
        }
    }

    async fn edit(
        &self,
        state: &mut ControllerState,
        user_id: i64,
    ) -> Result<Vec<Outbound>, Error> {
        let Some(record) = state.guests.get(&user_id).cloned() else {
            return Ok(self.session_not_found(user_id));
        };
        if effective_state_of(state, user_id) != DialogState::Registered {
            tracing::warn!(user_id, "Edit requested while not registered; ignored");
            return Ok(self.session_not_found(user_id));
        }

        let mut updated = record;
        updated.clear_registration();
        self.commit_guest(state, updated).await?;
        self.set_session(state, user_id, DialogState::CollectingName);
        tracing::info!(user_id, "Registration data cleared for edit");
        Ok(vec![Outbound::prompt(user_id, content::UPDATE_DATA)])
    }

    async fn payment_check(
        &self,
        state: &mut ControllerState,
        user_id: i64,
    ) -> Result<Vec<Outbound>, Error> {
        let key = user_id.to_string();
        if !state.payments.contains_key(&key) {
            tracing::warn!(user_id, "Payment check for id not in the valid list");
            return Ok(vec![Outbound::menu(user_id, MenuId::PaymentError)]);
        }

        let mut updated = state.payments.clone();
        let counter = updated.entry(key).or_insert(0);
        *counter += 1;
        let counter = *counter;
        self.store
            .commit_payments(&updated)
            .await
            .map_err(Error::Store)?;
        state.payments = updated;

        // Mirror the counter on the guest record when one exists.
        if let Some(record) = state.guests.get(&user_id).cloned() {
            let mut record = record;
            record.payment_checks = counter;
            self.commit_guest(state, record).await?;
        }

        tracing::info!(user_id, counter, "Payment confirmed");
        Ok(vec![Outbound::menu(user_id, MenuId::PaymentSuccess)])
    }

    async fn reconcile(
        &self,
        state: &mut ControllerState,
        user_id: i64,
    ) -> Result<Vec<Outbound>, Error> {
        if !self.admin_ids.contains(&user_id) {
            tracing::warn!(user_id, "Reconciliation requested by non-admin");
            return Ok(self.unknown_option(user_id, "send_result"));
        }

        // Point-in-time snapshot, sorted for a deterministic report.
        let mut registry: Vec<(i64, String)> = state
            .guests
            .values()
            .filter_map(|g| g.full_name.clone().map(|name| (g.user_id, name)))
            .collect();
        registry.sort_by_key(|(id, _)| *id);

        let report = self.matcher.run(&registry, self.ledger.as_ref()).await;
        tracing::info!(user_id, clean = report.is_clean(), "Reconciliation triggered");
        Ok(vec![Outbound::prompt(
            user_id,
            format!("{}\n{}", content::RECONCILE_HEADER, report.render()),
        )])
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// Commit the registry with `record` applied, then swap it in. On a
    /// failed commit nothing is mutated.
    async fn commit_guest(
        &self,
        state: &mut ControllerState,
        record: GuestRecord,
    ) -> Result<(), StoreError> {
        let mut updated = state.guests.clone();
        updated.insert(record.user_id, record);
        self.store.commit_guests(&updated).await?;
        state.guests = updated;
        Ok(())
    }

    fn set_session(&self, state: &mut ControllerState, user_id: i64, dialog_state: DialogState) {
        state
            .sessions
            .insert(user_id, DialogSession::new(user_id, dialog_state));
    }

    /// Move the participant one step along the collection sequence from
    /// `current`. The session holds the advanced state; the sequence
    /// itself lives in [`DialogState::next`].
    fn advance_session(&self, state: &mut ControllerState, user_id: i64, current: DialogState) {
        let mut session = DialogSession::new(user_id, current);
        if session.advance().is_none() {
            tracing::warn!(user_id, state = %current, "No state to advance to");
        }
        state.sessions.insert(user_id, session);
    }

    fn main_menu(&self, user_id: i64, menu_id: MenuId, record: &GuestRecord) -> Vec<Outbound> {
        let extra: &'static [Button] = if self.admin_ids.contains(&user_id) {
            std::slice::from_ref(&content::RECONCILE_BUTTON)
        } else {
            &[]
        };
        self.expand_menu(
            user_id,
            menu_id,
            vec![("first_name", record.first_name.clone())],
            extra,
        )
    }

    /// Expand a menu into its outbound sequence: photo group, documents,
    /// then the prompt with its keyboard.
    fn expand_menu(
        &self,
        user_id: i64,
        menu_id: MenuId,
        substitutions: Vec<(&'static str, String)>,
        extra_buttons: &'static [Button],
    ) -> Vec<Outbound> {
        let menu = content::menu(menu_id);
        let mut out = Vec::new();

        let mut photos = Vec::new();
        let mut documents = Vec::new();
        for media in menu.media {
            let path = self.media_dir.join(media);
            match path.extension().and_then(|e| e.to_str()) {
                Some("png" | "jpg" | "jpeg" | "gif" | "bmp") => photos.push(path),
                Some("pdf" | "docx" | "txt") => documents.push(path),
                _ => tracing::warn!(file = %path.display(), "Unknown media type; skipped"),
            }
        }
        if !photos.is_empty() {
            out.push(Outbound::MediaGroup { user_id, photos });
        }
        for path in documents {
            out.push(Outbound::Document { user_id, path });
        }

        out.push(Outbound::Menu {
            user_id,
            menu_id,
            substitutions,
            extra_buttons,
        });
        out
    }

    fn session_not_found(&self, user_id: i64) -> Vec<Outbound> {
        let err = DialogError::SessionNotFound { user_id };
        tracing::warn!(user_id, error = %err, "Restart instruction sent");
        vec![Outbound::prompt(user_id, content::RESTART)]
    }

    fn validation_error(&self, user_id: i64, reason: &str, reprompt: &str) -> Vec<Outbound> {
        let err = DialogError::ValidationError {
            user_id,
            reason: reason.to_string(),
        };
        tracing::info!(user_id, error = %err, "Input rejected; re-prompting");
        vec![Outbound::prompt(user_id, reprompt)]
    }

    fn unknown_option(&self, user_id: i64, key: &str) -> Vec<Outbound> {
        let err = DialogError::UnknownOption {
            user_id,
            key: key.to_string(),
        };
        tracing::warn!(user_id, error = %err, "Unknown option");
        vec![Outbound::prompt(user_id, content::UNKNOWN_COMMAND)]
    }
}

fn effective_state(state: &ControllerState, user_id: i64) -> Option<DialogState> {
    if let Some(session) = state.sessions.get(&user_id) {
        return Some(session.state);
    }
    state.guests.get(&user_id).map(|record| {
        if record.confirmed {
            DialogState::Registered
        } else {
            DialogState::Idle
        }
    })
}

fn effective_state_of(state: &ControllerState, user_id: i64) -> DialogState {
    effective_state(state, user_id).unwrap_or_default()
}
