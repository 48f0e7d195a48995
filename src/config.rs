//! Configuration — read once from the environment at startup.

use std::collections::HashSet;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: SecretString,
    /// Directory holding the guest and payment snapshots.
    pub data_dir: PathBuf,
    /// User ids allowed to trigger reconciliation.
    pub admin_ids: HashSet<i64>,
    /// Ledger (Google Sheets) settings; `None` disables the live feed.
    pub ledger: Option<LedgerConfig>,
    /// Directory holding menu photos and documents.
    pub media_dir: PathBuf,
    /// Directory for rotating log files.
    pub log_dir: PathBuf,
}

/// External payment ledger settings.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Spreadsheet id.
    pub sheet_id: String,
    /// Worksheet (tab) name.
    pub sheet_name: String,
    /// API key for the read-only values endpoint.
    pub api_key: SecretString,
}

impl BotConfig {
    /// Build the configuration from environment variables.
    ///
    /// Required: `REGISTRAR_BOT_TOKEN`.
    /// Optional: `REGISTRAR_DATA_DIR` (default `./data`),
    /// `REGISTRAR_ADMIN_IDS` (comma-separated numeric ids),
    /// `REGISTRAR_MEDIA_DIR` (default `./media`),
    /// `REGISTRAR_LOG_DIR` (default `./logs`),
    /// `REGISTRAR_SHEET_ID` / `REGISTRAR_SHEET_NAME` / `REGISTRAR_SHEETS_API_KEY`
    /// (all three required to enable the ledger feed).
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("REGISTRAR_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("REGISTRAR_BOT_TOKEN".into()))?;

        let data_dir = std::env::var("REGISTRAR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let log_dir = std::env::var("REGISTRAR_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"));

        let media_dir = std::env::var("REGISTRAR_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./media"));

        let admin_ids = match std::env::var("REGISTRAR_ADMIN_IDS") {
            Ok(raw) => parse_admin_ids(&raw)?,
            Err(_) => HashSet::new(),
        };

        let ledger = match (
            std::env::var("REGISTRAR_SHEET_ID"),
            std::env::var("REGISTRAR_SHEET_NAME"),
            std::env::var("REGISTRAR_SHEETS_API_KEY"),
        ) {
            (Ok(sheet_id), Ok(sheet_name), Ok(api_key)) => Some(LedgerConfig {
                sheet_id,
                sheet_name,
                api_key: SecretString::from(api_key),
            }),
            _ => None,
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            data_dir,
            admin_ids,
            ledger,
            media_dir,
            log_dir,
        })
    }

    /// Path of the guest registry snapshot.
    pub fn guests_path(&self) -> PathBuf {
        self.data_dir.join("guests.json")
    }

    /// Path of the payment-confirmation snapshot.
    pub fn payments_path(&self) -> PathBuf {
        self.data_dir.join("valid_payments.json")
    }
}

fn parse_admin_ids(raw: &str) -> Result<HashSet<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                key: "REGISTRAR_ADMIN_IDS".into(),
                message: format!("'{s}' is not a numeric user id"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_admin_ids_accepts_comma_list() {
        let ids = parse_admin_ids("438251622, 872471903,102255626").unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&438251622));
        assert!(ids.contains(&102255626));
    }

    #[test]
    fn parse_admin_ids_skips_empty_segments() {
        let ids = parse_admin_ids("1,,2,").unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn parse_admin_ids_rejects_garbage() {
        assert!(parse_admin_ids("1,alice").is_err());
    }

    #[test]
    fn snapshot_paths_live_under_data_dir() {
        let config = BotConfig {
            bot_token: SecretString::from("t"),
            data_dir: PathBuf::from("/var/bot"),
            admin_ids: HashSet::new(),
            ledger: None,
            media_dir: PathBuf::from("/var/bot/media"),
            log_dir: PathBuf::from("/var/log/bot"),
        };
        assert_eq!(config.guests_path(), PathBuf::from("/var/bot/guests.json"));
        assert_eq!(
            config.payments_path(),
            PathBuf::from("/var/bot/valid_payments.json")
        );
    }
}
