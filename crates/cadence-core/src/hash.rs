use time::Date;

use crate::period::format_date;
use crate::types::SourceType;

/// Stable id for an item the collector did not name:
/// `blake3(source|title|date)` → first 16 hex chars.
pub fn item_id(source: SourceType, title: &str, date: Date) -> String {
    let key = format!("{}|{}|{}", source, title.trim(), format_date(date));
    let hash = blake3::hash(key.as_bytes());
    hash.to_hex()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::parse_date;

    #[test]
    fn item_id_is_deterministic() {
        let date = parse_date("2025-01-15").unwrap();
        let a = item_id(SourceType::Github, "Merge PR #12", date);
        let b = item_id(SourceType::Github, "Merge PR #12 ", date);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn item_id_differs_per_source_and_date() {
        let date = parse_date("2025-01-15").unwrap();
        let next = parse_date("2025-01-16").unwrap();
        let a = item_id(SourceType::Github, "Deploy", date);
        assert_ne!(a, item_id(SourceType::Slack, "Deploy", date));
        assert_ne!(a, item_id(SourceType::Github, "Deploy", next));
    }
}
