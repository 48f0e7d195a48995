//! Telegram channel — long-polls the Bot API for updates.
//!
//! Native Bot API implementation: getUpdates long-polling on one side,
//! sendMessage / sendMediaGroup / sendDocument on the other. Updates are
//! parsed into [`InboundEvent`]s, handed to the dialog controller, and the
//! returned [`Outbound`] instructions are delivered back.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use crate::content::{self, Button};
use crate::dialog::{DialogController, InboundEvent, Outbound};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Verify the token against getMe before entering the poll loop.
    pub async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::PollFailed(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::PollFailed(format!(
                "getMe returned {}",
                resp.status()
            )))
        }
    }

    /// Poll for updates and drive the dialog controller. Runs until the
    /// process is stopped; transient errors back off and retry.
    pub async fn run(&self, controller: Arc<DialogController>) -> Result<(), ChannelError> {
        let mut offset: i64 = 0;

        tracing::info!("Telegram channel listening for updates...");

        loop {
            let body = serde_json::json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message", "callback_query"]
            });

            let resp = match self
                .client
                .post(self.api_url("getUpdates"))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            let data: serde_json::Value = match resp.json().await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Telegram parse error: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            let Some(results) = data.get("result").and_then(serde_json::Value::as_array) else {
                continue;
            };

            for update in results {
                if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64) {
                    offset = uid + 1;
                }

                // Button presses must be acknowledged or the client keeps
                // showing a spinner.
                if let Some(callback_id) = update
                    .get("callback_query")
                    .and_then(|q| q.get("id"))
                    .and_then(serde_json::Value::as_str)
                {
                    self.answer_callback(callback_id).await;
                }

                let Some(event) = parse_update(update) else {
                    tracing::debug!("Skipping update with no usable payload");
                    continue;
                };

                let user_id = event.user_id();
                match controller.handle(event).await {
                    Ok(outbound) => {
                        for out in &outbound {
                            if let Err(e) = self.deliver(out).await {
                                tracing::error!(user_id, "Delivery failed: {e}");
                            }
                        }
                    }
                    Err(e) => {
                        // Persistence failures must reach the operator log;
                        // the user gets a retry instruction.
                        tracing::error!(user_id, "Event handling failed: {e}");
                        let _ = self
                            .deliver(&Outbound::prompt(user_id, content::RESTART))
                            .await;
                    }
                }
            }
        }
    }

    /// Deliver one outbound instruction.
    pub async fn deliver(&self, out: &Outbound) -> Result<(), ChannelError> {
        match out {
            Outbound::Prompt { user_id, text } => self.send_message(*user_id, text, None).await,
            Outbound::Menu {
                user_id,
                menu_id,
                substitutions,
                extra_buttons,
            } => {
                let menu = content::menu(*menu_id);
                let text = content::render(menu.text, substitutions);
                let keyboard = inline_keyboard(menu.buttons, extra_buttons);
                self.send_message(*user_id, &text, Some(keyboard)).await
            }
            Outbound::MediaGroup { user_id, photos } => {
                self.send_media_group(*user_id, photos).await
            }
            Outbound::Document { user_id, path } => self.send_document(*user_id, path).await,
        }
    }

    /// Send a text message, splitting anything over Telegram's 4096 char
    /// limit. A keyboard, when present, goes on the final chunk.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<serde_json::Value>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last {
                if let Some(ref kb) = keyboard {
                    body["reply_markup"] = kb.clone();
                }
            }

            let resp = self
                .client
                .post(self.api_url("sendMessage"))
                .json(&body)
                .send()
                .await
                .map_err(|e| ChannelError::SendFailed {
                    chat_id,
                    reason: e.to_string(),
                })?;

            if !resp.status().is_success() {
                let err = resp.text().await.unwrap_or_default();
                return Err(ChannelError::SendFailed {
                    chat_id,
                    reason: format!("sendMessage failed: {err}"),
                });
            }
        }
        Ok(())
    }

    /// Send a group of photos as one album via sendMediaGroup.
    async fn send_media_group(
        &self,
        chat_id: i64,
        photos: &[std::path::PathBuf],
    ) -> Result<(), ChannelError> {
        let mut form = Form::new().text("chat_id", chat_id.to_string());
        let mut media = Vec::new();

        for (i, path) in photos.iter().enumerate() {
            let attach_name = format!("photo{i}");
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("photo.jpg")
                .to_string();
            let bytes = tokio::fs::read(path).await?;
            form = form.part(attach_name.clone(), Part::bytes(bytes).file_name(file_name));
            media.push(serde_json::json!({
                "type": "photo",
                "media": format!("attach://{attach_name}"),
            }));
        }

        let media_json =
            serde_json::to_string(&media).map_err(|e| ChannelError::InvalidUpdate(e.to_string()))?;
        form = form.text("media", media_json);

        let resp = self
            .client
            .post(self.api_url("sendMediaGroup"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                chat_id,
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                chat_id,
                reason: format!("sendMediaGroup failed: {err}"),
            });
        }

        tracing::info!(chat_id, count = photos.len(), "Telegram media group sent");
        Ok(())
    }

    /// Send a document file via sendDocument.
    async fn send_document(&self, chat_id: i64, file_path: &Path) -> Result<(), ChannelError> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let bytes = tokio::fs::read(file_path).await?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name.clone()));

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                chat_id,
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                chat_id,
                reason: format!("sendDocument failed: {err}"),
            });
        }

        tracing::info!(chat_id, file = %file_name, "Telegram document sent");
        Ok(())
    }

    /// Acknowledge a callback query. Failures are logged, not propagated.
    async fn answer_callback(&self, callback_id: &str) {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        if let Err(e) = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
        {
            tracing::warn!("answerCallbackQuery failed: {e}");
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Parse one getUpdates entry into an inbound event.
///
/// Messages without text, updates without a sender, and unknown update
/// kinds all yield `None`.
pub fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(query) = update.get("callback_query") {
        let user_id = query.get("from")?.get("id")?.as_i64()?;
        let data = query.get("data")?.as_str()?;
        return Some(InboundEvent::MenuSelection {
            user_id,
            data: data.to_string(),
        });
    }

    let message = update.get("message")?;
    let from = message.get("from")?;
    let user_id = from.get("id")?.as_i64()?;
    let text = message.get("text")?.as_str()?;

    if text.starts_with("/start") {
        let username = from
            .get("username")
            .and_then(serde_json::Value::as_str)
            .map(String::from);
        let first_name = from
            .get("first_name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        Some(InboundEvent::StartCommand {
            user_id,
            username,
            first_name,
        })
    } else {
        Some(InboundEvent::TextMessage {
            user_id,
            text: text.to_string(),
        })
    }
}

/// Build an inline keyboard: one button per row, extras appended last.
fn inline_keyboard(buttons: &[Button], extra: &[Button]) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = buttons
        .iter()
        .chain(extra.iter())
        .map(|b| {
            serde_json::json!([{
                "text": b.label,
                "callback_data": b.callback,
            }])
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // max_len is a byte count; back off to a char boundary first.
        let mut end = max_len;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        let chunk = &remaining[..end];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(end);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { end } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> TelegramChannel {
        TelegramChannel::new(SecretString::from("123:ABC"))
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel().api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    // ── Update parsing ──────────────────────────────────────────────

    #[test]
    fn parse_start_command() {
        let update = serde_json::json!({
            "update_id": 1,
            "message": {
                "from": {"id": 42, "username": "tester", "first_name": "Иван"},
                "chat": {"id": 42},
                "text": "/start"
            }
        });
        assert_eq!(
            parse_update(&update),
            Some(InboundEvent::StartCommand {
                user_id: 42,
                username: Some("tester".into()),
                first_name: "Иван".into(),
            })
        );
    }

    #[test]
    fn parse_start_without_username() {
        let update = serde_json::json!({
            "message": {
                "from": {"id": 42, "first_name": "Иван"},
                "text": "/start"
            }
        });
        assert_eq!(
            parse_update(&update),
            Some(InboundEvent::StartCommand {
                user_id: 42,
                username: None,
                first_name: "Иван".into(),
            })
        );
    }

    #[test]
    fn parse_plain_text() {
        let update = serde_json::json!({
            "message": {
                "from": {"id": 42},
                "text": "Иванов Иван Иванович"
            }
        });
        assert_eq!(
            parse_update(&update),
            Some(InboundEvent::TextMessage {
                user_id: 42,
                text: "Иванов Иван Иванович".into(),
            })
        );
    }

    #[test]
    fn parse_callback_query() {
        let update = serde_json::json!({
            "callback_query": {
                "id": "abc",
                "from": {"id": 42},
                "data": "buy_ticket"
            }
        });
        assert_eq!(
            parse_update(&update),
            Some(InboundEvent::MenuSelection {
                user_id: 42,
                data: "buy_ticket".into(),
            })
        );
    }

    #[test]
    fn parse_skips_non_text_message() {
        let update = serde_json::json!({
            "message": {
                "from": {"id": 42},
                "photo": [{"file_id": "x"}]
            }
        });
        assert_eq!(parse_update(&update), None);
    }

    #[test]
    fn parse_skips_update_without_sender() {
        let update = serde_json::json!({
            "message": {"text": "hello"}
        });
        assert_eq!(parse_update(&update), None);
    }

    // ── Keyboard rendering ──────────────────────────────────────────

    #[test]
    fn keyboard_one_button_per_row() {
        let buttons = [
            Button { label: "A", callback: "a" },
            Button { label: "B", callback: "b" },
        ];
        let kb = inline_keyboard(&buttons, &[]);
        let rows = kb["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["text"], "A");
        assert_eq!(rows[0][0]["callback_data"], "a");
    }

    #[test]
    fn keyboard_appends_extra_buttons() {
        let buttons = [Button { label: "A", callback: "a" }];
        let extra = [Button { label: "Сверка", callback: "send_result" }];
        let kb = inline_keyboard(&buttons, &extra);
        let rows = kb["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0]["callback_data"], "send_result");
    }

    // ── Message splitting ───────────────────────────────────────────

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        // Cyrillic is two bytes per char; an odd limit lands mid-char.
        let msg = "ф".repeat(3000);
        let chunks = split_message(&msg, 4095);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 4095);
            assert!(chunk.chars().all(|c| c == 'ф'));
        }
        assert_eq!(chunks.concat(), msg);
    }

    // ── Network error paths (no server behind the fake token) ───────

    #[tokio::test]
    async fn send_document_nonexistent_file() {
        let ch = channel();
        let result = ch
            .send_document(1, Path::new("/nonexistent/rules.pdf"))
            .await;
        assert!(matches!(result, Err(ChannelError::Io(_))));
    }

    #[tokio::test]
    async fn media_group_nonexistent_file() {
        let ch = channel();
        let result = ch
            .send_media_group(1, &["/nonexistent/a.jpg".into()])
            .await;
        assert!(matches!(result, Err(ChannelError::Io(_))));
    }
}
