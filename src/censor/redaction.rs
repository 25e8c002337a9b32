use tracing::warn;

use crate::types::{CensoredText, RedactionKind, RedactionResult};
use super::Finding;

/// Every non-overlapping occurrence of `needle` in `text`.
pub fn find_occurrences(text: &str, needle: &str, kind: &RedactionKind) -> Vec<Finding> {
    if needle.is_empty() {
        return Vec::new();
    }
    text.match_indices(needle)
        .map(|(start, m)| Finding {
            start,
            end: start + m.len(),
            kind: kind.clone(),
        })
        .collect()
}

/// Convert a `[start, end)` range counted in Unicode scalar values into byte
/// offsets. `None` when the range falls outside the text.
pub fn char_range_to_bytes(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    if start > end {
        return None;
    }
    let mut byte_start = None;
    for (i, (offset, _)) in text.char_indices().enumerate() {
        if i == start {
            byte_start = Some(offset);
        }
        if i == end {
            return byte_start.map(|s| (s, offset));
        }
    }
    let char_count = text.chars().count();
    if end == char_count {
        let s = if start == char_count { text.len() } else { byte_start? };
        return Some((s, text.len()));
    }
    None
}

/// Drop invalid findings, sort, and coalesce overlaps. The first finding of
/// an overlapping group decides the kind.
pub fn merge_findings(text: &str, mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.retain(|f| {
        let valid = f.start < f.end
            && f.end <= text.len()
            && text.is_char_boundary(f.start)
            && text.is_char_boundary(f.end);
        if !valid {
            warn!("Discarding out-of-range {} finding at {}..{}", f.kind, f.start, f.end);
        }
        valid
    });
    findings.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut merged: Vec<Finding> = Vec::with_capacity(findings.len());
    for f in findings {
        match merged.last_mut() {
            Some(last) if f.start < last.end => {
                last.end = last.end.max(f.end);
            }
            _ => merged.push(f),
        }
    }
    merged
}

/// Replace every finding in `text` with `replacement`.
pub fn redact(text: &str, findings: Vec<Finding>, replacement: &str) -> CensoredText {
    let merged = merge_findings(text, findings);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut redactions = Vec::with_capacity(merged.len());

    for f in merged {
        out.push_str(&text[cursor..f.start]);
        out.push_str(replacement);
        cursor = f.end;
        redactions.push(RedactionResult {
            start: f.start,
            end: f.end,
            kind: f.kind,
            replacement: replacement.to_string(),
        });
    }
    out.push_str(&text[cursor..]);

    CensoredText { text: out, redactions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pii(entity: &str, start: usize, end: usize) -> Finding {
        Finding { start, end, kind: RedactionKind::Pii(entity.to_string()) }
    }

    #[test]
    fn test_find_occurrences() {
        let kind = RedactionKind::Secret("AWS".to_string());
        let found = find_occurrences("key=abc other=abc", "abc", &kind);
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].start, found[0].end), (4, 7));
        assert_eq!((found[1].start, found[1].end), (14, 17));
        assert!(find_occurrences("abc", "", &kind).is_empty());
    }

    #[test]
    fn test_char_range_to_bytes() {
        let text = "héllo wörld";
        // "wörld" starts at char 6, ends at 11 (end of text)
        assert_eq!(char_range_to_bytes(text, 6, 11), Some((7, 13)));
        assert_eq!(char_range_to_bytes(text, 0, 2), Some((0, 3)));
        assert_eq!(char_range_to_bytes(text, 11, 11), Some((13, 13)));
        assert_eq!(char_range_to_bytes(text, 5, 20), None);
        assert_eq!(char_range_to_bytes(text, 4, 2), None);
    }

    #[test]
    fn test_merge_overlapping_and_nested() {
        let text = "0123456789abcdef";
        let merged = merge_findings(text, vec![pii("B", 6, 10), pii("A", 2, 8), pii("C", 3, 4), pii("D", 12, 14)]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start, merged[0].end), (2, 10));
        assert_eq!(merged[0].kind, RedactionKind::Pii("A".to_string()));
        assert_eq!((merged[1].start, merged[1].end), (12, 14));
    }

    #[test]
    fn test_merge_discards_invalid_spans() {
        let text = "ünïcode";
        // byte 1 is inside 'ü'
        let merged = merge_findings(text, vec![pii("A", 1, 3), pii("B", 5, 5), pii("C", 0, 99), pii("D", 0, 2)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, RedactionKind::Pii("D".to_string()));
    }

    #[test]
    fn test_redact_replaces_spans() {
        let text = "user=bob@example.com token=s3cr3t";
        let findings = vec![
            pii("EMAIL_ADDRESS", 5, 20),
            Finding { start: 27, end: 33, kind: RedactionKind::Secret("Generic".to_string()) },
        ];
        let censored = redact(text, findings, "******");
        assert_eq!(censored.text, "user=****** token=******");
        assert_eq!(censored.redactions.len(), 2);
        assert_eq!(censored.redactions[0].replacement, "******");
        assert_eq!(censored.redactions[1].start, 27);
    }

    #[test]
    fn test_redact_without_findings_is_identity() {
        let censored = redact("nothing to see", Vec::new(), "***");
        assert_eq!(censored.text, "nothing to see");
        assert!(censored.redactions.is_empty());
    }
}
