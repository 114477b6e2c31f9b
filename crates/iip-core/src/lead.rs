//! Lead capture: contact details collected after the contact-request reply.

use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row written once at the top of an empty lead sheet.
pub const LEAD_SHEET_HEADER: [&str; 4] = [
    "Câu Hỏi Khách Hàng",
    "Số Điện Thoại",
    "Tên",
    "Thời Gian Ghi Nhận",
];

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\s-]{7,}$").expect("static phone pattern"))
}

/// Digits, spaces and hyphens only, at least 7 characters after trimming.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_re().is_match(phone.trim())
}

/// Contact details for one out-of-scope question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    /// The question that triggered the contact request.
    pub question: String,
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Page the user was on, when the request came through the web widget.
    #[serde(default)]
    pub url: Option<String>,
}

impl LeadRecord {
    pub fn new(question: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            phone: phone.into().trim().to_string(),
            name: None,
            url: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        self
    }

    /// Sheet columns: question, phone, name, timestamp, then the url when present.
    pub fn to_row(&self, at: DateTime<Local>) -> Vec<String> {
        let mut row = vec![
            self.question.clone(),
            self.phone.clone(),
            self.name.clone().unwrap_or_default(),
            at.format(TIMESTAMP_FORMAT).to_string(),
        ];
        if let Some(url) = &self.url {
            row.push(url.clone());
        }
        row
    }
}
