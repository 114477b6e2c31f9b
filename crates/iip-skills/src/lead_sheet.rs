//! Lead sheets: local sled tree, or a spreadsheet webhook.

use crate::http::{check_status, transport_error};
use iip_core::{ChatError, LeadSheet, LEAD_SHEET_HEADER};
use reqwest::Client;
use std::path::Path;

const TREE_NAME: &str = "lead_rows";
const HEADER_KEY: &[u8] = b"lead_header";

/// Appends lead rows as JSON arrays to a sled tree, keyed by a monotonic id.
/// The column header is stored once, next to the first row.
pub struct SledLeadSheet {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledLeadSheet {
    /// Opens or creates the sheet at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// All data rows in insertion order.
    pub fn rows(&self) -> Result<Vec<Vec<String>>, ChatError> {
        self.tree
            .iter()
            .values()
            .map(|value| {
                let value = value.map_err(storage_error)?;
                serde_json::from_slice(&value).map_err(decode_error)
            })
            .collect()
    }

    /// Column header, present once a row has been stored.
    pub fn header(&self) -> Result<Option<Vec<String>>, ChatError> {
        match self.db.get(HEADER_KEY).map_err(storage_error)? {
            Some(value) => serde_json::from_slice(&value).map(Some).map_err(decode_error),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn ensure_header(&self) -> Result<(), ChatError> {
        if !self.tree.is_empty() || self.db.contains_key(HEADER_KEY).map_err(storage_error)? {
            return Ok(());
        }
        let header = serde_json::to_vec(&LEAD_SHEET_HEADER).map_err(decode_error)?;
        self.db.insert(HEADER_KEY, header).map_err(storage_error)?;
        Ok(())
    }
}

fn storage_error(e: sled::Error) -> ChatError {
    ChatError::Internal(format!("lead storage: {}", e))
}

fn decode_error(e: serde_json::Error) -> ChatError {
    ChatError::Internal(format!("lead row encoding: {}", e))
}

#[async_trait::async_trait]
impl LeadSheet for SledLeadSheet {
    fn name(&self) -> &str {
        "SledLeadSheet"
    }

    async fn append_row(&self, fields: &[String]) -> Result<(), ChatError> {
        self.ensure_header()?;
        let id = self.db.generate_id().map_err(storage_error)?;
        let value = serde_json::to_vec(fields).map_err(decode_error)?;
        // big-endian keys keep sled's byte order equal to insertion order
        self.tree
            .insert(id.to_be_bytes(), value)
            .map_err(storage_error)?;
        self.db.flush_async().await.map_err(storage_error)?;
        tracing::debug!(target: "iip::skills", id, columns = fields.len(), "Lead row stored");
        Ok(())
    }
}

/// Posts `{ "header": [...], "values": [...] }` to a spreadsheet web-app URL (e.g. an Apps
/// Script deployment). The script appends `values` and writes `header` first on an empty sheet.
pub struct WebhookLeadSheet {
    client: Client,
    url: String,
}

impl WebhookLeadSheet {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

fn webhook_payload(fields: &[String]) -> serde_json::Value {
    serde_json::json!({ "header": LEAD_SHEET_HEADER, "values": fields })
}

#[async_trait::async_trait]
impl LeadSheet for WebhookLeadSheet {
    fn name(&self) -> &str {
        "WebhookLeadSheet"
    }

    async fn append_row(&self, fields: &[String]) -> Result<(), ChatError> {
        let response = self
            .client
            .post(&self.url)
            .json(&webhook_payload(fields))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        tracing::debug!(target: "iip::skills", columns = fields.len(), "Lead row posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(question: &str) -> Vec<String> {
        vec![
            question.to_string(),
            "0912345678".to_string(),
            "Lan".to_string(),
            "2025-03-09 14:05:00".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_sled_sheet_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = SledLeadSheet::open_path(dir.path().join("leads")).unwrap();
        assert!(sheet.is_empty());
        for q in ["giá đất?", "tuyển dụng?", "đầu tư?"] {
            sheet.append_row(&row(q)).await.unwrap();
        }
        let rows = sheet.rows().unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(rows[0][0], "giá đất?");
        assert_eq!(rows[2][0], "đầu tư?");
        assert_eq!(rows[1][3], "2025-03-09 14:05:00");
    }

    #[tokio::test]
    async fn test_sled_sheet_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = SledLeadSheet::open_path(dir.path().join("leads")).unwrap();
        assert_eq!(sheet.header().unwrap(), None);

        sheet.append_row(&row("giá đất?")).await.unwrap();
        sheet.append_row(&row("đầu tư?")).await.unwrap();
        assert_eq!(sheet.header().unwrap().unwrap(), LEAD_SHEET_HEADER.to_vec());
        assert_eq!(sheet.rows().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_row_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = SledLeadSheet::open_path(dir.path().join("leads")).unwrap();
        sheet.append_row(&row("giá đất?")).await.unwrap();
        sheet.tree.insert(u64::MAX.to_be_bytes(), b"not json".to_vec()).unwrap();
        let err = sheet.rows().unwrap_err();
        assert_eq!(err.category(), "internal");
    }

    #[test]
    fn test_webhook_payload_carries_header() {
        let payload = webhook_payload(&row("giá đất?"));
        assert_eq!(payload["header"][0], "Câu Hỏi Khách Hàng");
        assert_eq!(payload["header"][3], "Thời Gian Ghi Nhận");
        assert_eq!(payload["values"][0], "giá đất?");
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_an_error() {
        let sheet = WebhookLeadSheet::new("http://127.0.0.1:9/append");
        assert!(sheet.append_row(&row("giá đất?")).await.is_err());
    }
}
