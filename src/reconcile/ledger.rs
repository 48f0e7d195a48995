//! External payment ledger — a read-only tabular feed, one row per payer.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::config::LedgerConfig;
use crate::error::LedgerError;

/// One row from the payment ledger. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub surname: String,
    pub given_name: String,
    pub patronymic: String,
    pub institution: String,
    pub amount: String,
    pub ticket_tier: String,
    pub payment_method: String,
    pub date: String,
}

impl LedgerEntry {
    /// Full name as entered by the payer, in registry order.
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.surname, self.given_name, self.patronymic)
    }
}

/// Read-only source of ledger snapshots.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<LedgerEntry>, LedgerError>;
}

/// Google Sheets values feed.
///
/// Reads the worksheet through the v4 values endpoint with an API key.
/// Expected columns: №, Фамилия, Имя, Отчество, ВУЗ, Деньги, Билет,
/// Способ, Дата.
pub struct SheetsLedger {
    config: LedgerConfig,
    client: reqwest::Client,
}

impl SheetsLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn values_url(&self) -> String {
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.config.sheet_id, self.config.sheet_name
        )
    }
}

#[async_trait]
impl LedgerSource for SheetsLedger {
    async fn fetch(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let resp = self
            .client
            .get(self.values_url())
            .query(&[("key", self.config.api_key.expose_secret())])
            .send()
            .await
            .map_err(|e| LedgerError::ExternalSourceUnavailable(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => {}
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(LedgerError::AuthFailed(format!(
                    "sheet {}: {}",
                    self.config.sheet_id,
                    resp.status()
                )));
            }
            reqwest::StatusCode::NOT_FOUND => {
                return Err(LedgerError::NotFound(self.config.sheet_id.clone()));
            }
            s => {
                return Err(LedgerError::ExternalSourceUnavailable(format!(
                    "sheet {}: HTTP {s}",
                    self.config.sheet_id
                )));
            }
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LedgerError::ExternalSourceUnavailable(e.to_string()))?;

        let rows = body
            .get("values")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| LedgerError::MalformedRow("missing 'values' array".into()))?;

        Ok(parse_rows(rows))
    }
}

/// Stand-in used when no sheet is configured. Every fetch fails, which
/// the matcher downgrades to an empty ledger snapshot.
pub struct DisabledLedger;

#[async_trait]
impl LedgerSource for DisabledLedger {
    async fn fetch(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Err(LedgerError::ExternalSourceUnavailable(
            "no ledger configured".into(),
        ))
    }
}

/// Parse sheet rows into ledger entries, skipping the header row.
/// Short or blank rows are logged and skipped rather than failing the fetch.
fn parse_rows(rows: &[serde_json::Value]) -> Vec<LedgerEntry> {
    let mut entries = Vec::new();
    for (i, row) in rows.iter().skip(1).enumerate() {
        let Some(cells) = row.as_array() else {
            tracing::warn!(row = i + 2, "Ledger row is not an array; skipped");
            continue;
        };
        let cell = |idx: usize| -> String {
            cells
                .get(idx)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        let entry = LedgerEntry {
            surname: cell(1),
            given_name: cell(2),
            patronymic: cell(3),
            institution: cell(4),
            amount: cell(5),
            ticket_tier: cell(6),
            payment_method: cell(7),
            date: cell(8),
        };
        if entry.surname.is_empty() && entry.given_name.is_empty() {
            tracing::warn!(row = i + 2, "Ledger row has no name; skipped");
            continue;
        }
        entries.push(entry);
    }
    entries
}
