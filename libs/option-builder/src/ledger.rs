use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::envelope::AccountId;
use crate::types::{AccountState, LedgerSnapshot, OptionError};

/// Read-only view of the ledger needed to build an option.
///
/// Each call is a single attempt; implementations neither retry nor cache.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    async fn latest_ledger(&self) -> Result<LedgerSnapshot, OptionError>;
    async fn load_account(&self, account_id: &AccountId) -> Result<AccountState, OptionError>;
}

pub struct HorizonClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct LedgerPage {
    #[serde(rename = "_embedded")]
    embedded: LedgerRecords,
}

#[derive(Deserialize)]
struct LedgerRecords {
    records: Vec<LedgerRecord>,
}

#[derive(Deserialize)]
struct LedgerRecord {
    sequence: u32,
    closed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AccountRecord {
    sequence: String,
}

impl HorizonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LedgerQuery for HorizonClient {
    async fn latest_ledger(&self) -> Result<LedgerSnapshot, OptionError> {
        let url = format!("{}/ledgers?order=desc&limit=1", self.base_url);
        let page: LedgerPage = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let latest = page
            .embedded
            .records
            .into_iter()
            .next()
            .ok_or_else(|| OptionError::Ledger("horizon returned no ledgers".to_string()))?;
        Ok(LedgerSnapshot {
            height: latest.sequence,
            close_time: latest.closed_at,
        })
    }

    async fn load_account(&self, account_id: &AccountId) -> Result<AccountState, OptionError> {
        let url = format!("{}/accounts/{}", self.base_url, account_id);
        let record: AccountRecord = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let sequence = record.sequence.parse::<i64>().map_err(|e| {
            OptionError::Ledger(format!("bad sequence {:?} for {}: {}", record.sequence, account_id, e))
        })?;
        Ok(AccountState {
            account_id: *account_id,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_horizon_payloads() {
        let ledgers = r#"{"_links": {}, "_embedded": {"records": [
            {"id": "abc", "sequence": 51234567, "closed_at": "2024-05-01T12:00:05Z"}
        ]}}"#;
        let page: LedgerPage = serde_json::from_str(ledgers).unwrap();
        assert_eq!(page.embedded.records[0].sequence, 51_234_567);
        assert_eq!(page.embedded.records[0].closed_at.timestamp(), 1_714_564_805);

        let account = r#"{"id": "G...", "sequence": "219902325555200001"}"#;
        let record: AccountRecord = serde_json::from_str(account).unwrap();
        assert_eq!(record.sequence.parse::<i64>().unwrap(), 219_902_325_555_200_001);
    }
}
