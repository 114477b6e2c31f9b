//! Question cleanup applied before classification and generation.

use regex::Regex;
use std::sync::OnceLock;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)https?://\S+").expect("static url pattern"))
}

/// Removes URLs and `.pdf` filename tokens, collapsing whitespace. Never fails.
pub fn normalize(raw: &str) -> String {
    let without_urls = url_re().replace_all(raw, " ");
    without_urls
        .split_whitespace()
        .filter(|tok| !tok.to_lowercase().ends_with(".pdf"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_urls() {
        let out = normalize("xem https://thuvienphapluat.vn/van-ban/abc?x=1 và HTTP://EXAMPLE.COM nhé");
        assert_eq!(out, "xem và nhé");
        assert!(!out.to_lowercase().contains("http"));
    }

    #[test]
    fn test_drops_pdf_tokens_any_case() {
        let out = normalize("theo file NghiDinh145.PDF và luat.pdf điều 5");
        assert_eq!(out, "theo file và điều 5");
    }

    #[test]
    fn test_collapses_whitespace_and_trims() {
        assert_eq!(normalize("  luật \t lao   động \n"), "luật lao động");
    }

    #[test]
    fn test_empty_and_url_only_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("https://iipmap.com/"), "");
    }

    #[test]
    fn test_pdf_inside_word_is_kept() {
        assert_eq!(normalize("pdfs are fine"), "pdfs are fine");
    }
}
