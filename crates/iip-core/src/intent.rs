//! Keyword/pattern intent classification over normalized questions.
//!
//! Vietnamese terms come from the indexed corpus; English equivalents cover
//! users who ask in English. All predicates lower-case their input first.

use crate::memory::count_prior_detail_answers;
use crate::shared::ChatMessage;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const LEGAL_KEYWORDS: &[&str] = &[
    "luật",
    "nghị định",
    "thông tư",
    "quyết định",
    "điều",
    "khoản",
    "văn bản",
    "quy định",
    "quy hoạch",
    "khu công nghiệp",
    "cụm công nghiệp",
    "kcn",
    "ccn",
    "hợp đồng lao động",
    "sa thải",
    "bảo hiểm xã hội",
    "nghỉ phép",
    "lương",
    "phúc lợi",
    "chế độ",
    "quyền và nghĩa vụ",
    "tranh chấp",
    "pháp luật",
    "law",
    "decree",
    "circular",
    "decision",
    "article",
    "clause",
    "regulation",
    "industrial zone",
    "industrial cluster",
    "labor contract",
    "labour contract",
    "termination",
    "social insurance",
    "leave",
    "salary",
    "benefits",
    "dispute",
];

/// Citation numbering such as `45/2019/QH14`, "nghị định số", "article 12".
const LEGAL_PATTERNS: &[&str] = &[
    r"\d+/\d{4}/",
    r"nghị định số",
    r"thông tư số",
    r"quyết định số",
    r"điều \d+",
    r"decree number",
    r"circular number",
    r"decision number",
    r"article \d+",
];

const DETAIL_KEYWORDS: &[&str] = &[
    "nêu chi tiết",
    "chi tiết về",
    "thông tin chi tiết",
    "cụm công nghiệp",
    "khu công nghiệp",
    "detail",
    "details about",
    "detailed information",
    "industrial cluster",
    "industrial zone",
];

/// A statistics question is never a detail query.
const STATISTICS_MARKERS: &[&str] = &["thống kê", "statistics"];

const GREETING_PATTERN: &str = r"^(?:xin chào|chào bạn|chào|hello|hi|hey|bạn làm được gì|bạn có thể làm gì|giúp tôi với|what can you do)(?:\s+(?:bạn|ạ|nhé|there))?[\s!.?,]*$";

fn legal_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        LEGAL_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("static legal pattern"))
            .collect()
    })
}

fn greeting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(GREETING_PATTERN).expect("static greeting pattern"))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// True when the question concerns laws, decrees, labour rights or industrial zones.
pub fn is_legal(text: &str) -> bool {
    let lower = text.to_lowercase();
    contains_any(&lower, LEGAL_KEYWORDS) || legal_res().iter().any(|re| re.is_match(&lower))
}

/// True for an itemized question about a specific industrial zone/cluster.
pub fn is_detail_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    contains_any(&lower, DETAIL_KEYWORDS) && !contains_any(&lower, STATISTICS_MARKERS)
}

/// True when the whole message is a greeting or a "what can you do" meta question.
pub fn is_greeting(text: &str) -> bool {
    greeting_re().is_match(text.trim().to_lowercase().as_str())
}

/// Path chosen for one turn. Computed fresh from the question and history, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Greeting,
    DeflectDetail,
    LegalAnswer,
    GeneralAnswer,
}

impl Route {
    /// Transition function over a normalized question and the session history so far.
    ///
    /// Precedence: greeting, then detail (deflect once a substantive detail answer exists,
    /// otherwise treat as legal), then legal, then general.
    pub fn select(normalized: &str, history: &[ChatMessage]) -> Self {
        if is_greeting(normalized) {
            return Route::Greeting;
        }
        if is_detail_query(normalized) {
            if count_prior_detail_answers(history) >= 1 {
                return Route::DeflectDetail;
            }
            return Route::LegalAnswer;
        }
        if is_legal(normalized) {
            Route::LegalAnswer
        } else {
            Route::GeneralAnswer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Greeting => "greeting",
            Route::DeflectDetail => "deflect_detail",
            Route::LegalAnswer => "legal_answer",
            Route::GeneralAnswer => "general_answer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{ReplyKind, DEFLECTION_TEXT};

    #[test]
    fn test_legal_keywords_and_patterns() {
        assert!(is_legal("Thời gian nghỉ phép năm theo Bộ luật Lao động?"));
        assert!(is_legal("Nội dung Nghị định số 145 là gì"));
        assert!(is_legal("văn bản 45/2019/QH14 quy định gì"));
        assert!(is_legal("What does Article 12 say about overtime?"));
        assert!(is_legal("How is SALARY paid during probation?"));
        assert!(!is_legal("what skills are good for a CV"));
        assert!(!is_legal("làm sao để viết CV ấn tượng"));
    }

    #[test]
    fn test_detail_query_keywords() {
        assert!(is_detail_query("Nêu chi tiết về khu công nghiệp VSIP 1"));
        assert!(is_detail_query("details about Song Than industrial zone"));
        assert!(!is_detail_query("mức lương tối thiểu vùng"));
    }

    #[test]
    fn test_statistics_overrides_detail() {
        assert!(!is_detail_query("industrial cluster statistics for province X"));
        assert!(!is_detail_query("Thống kê các khu công nghiệp ở Bắc Ninh"));
        // still legal: the predicates are independent
        assert!(is_legal("industrial cluster statistics for province X"));
    }

    #[test]
    fn test_greeting_is_whole_message_match() {
        assert!(is_greeting("xin chào"));
        assert!(is_greeting("Xin chào!"));
        assert!(is_greeting("Hello there"));
        assert!(is_greeting("bạn làm được gì?"));
        assert!(!is_greeting("xin chào, cho hỏi về luật lao động"));
        assert!(!is_greeting("history of hiring"));
    }

    #[test]
    fn test_route_precedence() {
        assert_eq!(Route::select("xin chào", &[]), Route::Greeting);
        assert_eq!(Route::select("chi tiết về khu công nghiệp Sóng Thần", &[]), Route::LegalAnswer);
        assert_eq!(Route::select("what skills are good for a CV", &[]), Route::GeneralAnswer);

        let history = vec![
            ChatMessage::user("chi tiết về khu công nghiệp Sóng Thần"),
            ChatMessage::assistant("Khu công nghiệp Sóng Thần 1 nằm tại Dĩ An...", ReplyKind::Answer),
        ];
        assert_eq!(Route::select("thông tin chi tiết cụm công nghiệp Phú Chánh", &history), Route::DeflectDetail);
    }

    #[test]
    fn test_route_after_deflection_only_history() {
        let history = vec![
            ChatMessage::user("chi tiết về khu công nghiệp A"),
            ChatMessage::assistant(DEFLECTION_TEXT, ReplyKind::Deflect),
        ];
        assert_eq!(Route::select("chi tiết về khu công nghiệp B", &history), Route::LegalAnswer);
    }
}
