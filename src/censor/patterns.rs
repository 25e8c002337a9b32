use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use crate::error::CensorError;
use crate::types::RedactionKind;
use super::{Censor, Finding};

/// One regex recognizer with an optional checksum validator.
pub struct PatternDetector {
    pub entity: &'static str,
    regex: Regex,
    validate: fn(&str) -> bool,
    // reject matches that are one group of a longer dotted number
    standalone: bool,
}

impl PatternDetector {
    fn new(entity: &'static str, pattern: &str, validate: fn(&str) -> bool) -> Self {
        Self {
            entity,
            regex: Regex::new(pattern).expect("built-in PII pattern must compile"),
            validate,
            standalone: false,
        }
    }

    fn standalone(mut self) -> Self {
        self.standalone = true;
        self
    }

    pub fn for_entity(entity: &str) -> Option<Self> {
        let detector = match entity {
            "CREDIT_CARD" => Self::new("CREDIT_CARD", r"\b(?:\d[ -]?){12,18}\d\b", luhn_valid),
            "CRYPTO" => Self::new(
                "CRYPTO",
                r"\b(?:bc1[ac-hj-np-z02-9]{25,87}|[13][a-km-zA-HJ-NP-Z1-9]{25,34})\b",
                any_match,
            ),
            "EMAIL_ADDRESS" => Self::new(
                "EMAIL_ADDRESS",
                r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}\b",
                any_match,
            ),
            "IBAN_CODE" => Self::new("IBAN_CODE", r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]){11,30}\b", iban_valid),
            "PHONE_NUMBER" => Self::new(
                "PHONE_NUMBER",
                r"(?:\+\d{1,3}[ .-]?)?(?:\(\d{2,4}\)|\b\d{2,4})[ .-]\d{3,4}[ .-]?\d{3,4}\b",
                phone_valid,
            )
            .standalone(),
            "MEDICAL_LICENSE" => Self::new("MEDICAL_LICENSE", r"\b[ABCDEFGHJKLMPRSTUXabcdefghjklmprstux][A-Za-z9]\d{7}\b", dea_valid),
            _ => return None,
        };
        Some(detector)
    }

    pub fn find(&self, text: &str) -> Vec<Finding> {
        self.regex
            .find_iter(text)
            .filter(|m| (self.validate)(m.as_str()))
            .filter(|m| !(self.standalone && dotted_number_neighbor(text, m.start(), m.end())))
            .map(|m| Finding {
                start: m.start(),
                end: m.end(),
                kind: RedactionKind::Pii(self.entity.to_string()),
            })
            .collect()
    }
}

/// Built-in PII recognizers for the entities Presidio is usually asked for.
pub struct PatternCensor {
    detectors: Vec<PatternDetector>,
}

impl PatternCensor {
    pub fn for_entities(entities: &[String]) -> Self {
        let detectors = entities
            .iter()
            .filter_map(|e| {
                let detector = PatternDetector::for_entity(e);
                if detector.is_none() {
                    warn!("No built-in recognizer for entity {}, it will not be redacted", e);
                }
                detector
            })
            .collect();
        Self { detectors }
    }

    pub fn entities(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.entity).collect()
    }

    pub fn find_all(&self, text: &str) -> Vec<Finding> {
        self.detectors.iter().flat_map(|d| d.find(text)).collect()
    }
}

#[async_trait]
impl Censor for PatternCensor {
    fn name(&self) -> &'static str {
        "patterns"
    }

    async fn detect(&self, text: &str) -> Result<Vec<Finding>, CensorError> {
        Ok(self.find_all(text))
    }
}

fn any_match(_: &str) -> bool {
    true
}

fn digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

pub fn luhn_valid(candidate: &str) -> bool {
    let digits = digits(candidate);
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

pub fn iban_valid(candidate: &str) -> bool {
    let compact: Vec<char> = candidate.chars().filter(|c| !c.is_whitespace()).collect();
    if !(15..=34).contains(&compact.len()) {
        return false;
    }
    let rearranged = compact[4..].iter().chain(compact[..4].iter()).copied();
    let mut remainder: u32 = 0;
    for c in rearranged {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        // letters expand to two digits
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}

fn phone_valid(candidate: &str) -> bool {
    (9..=15).contains(&digits(candidate).len())
}

/// True when `text[start..end]` continues as `.<digit>` on either side,
/// as the groups of an IPv4 address or a version string do.
fn dotted_number_neighbor(text: &str, start: usize, end: usize) -> bool {
    let mut before = text[..start].chars().rev();
    let mut after = text[end..].chars();
    let joined_before = matches!((before.next(), before.next()), (Some('.'), Some(c)) if c.is_ascii_digit());
    let joined_after = matches!((after.next(), after.next()), (Some('.'), Some(c)) if c.is_ascii_digit());
    joined_before || joined_after
}

/// DEA registration number checksum.
pub fn dea_valid(candidate: &str) -> bool {
    let d: Vec<u32> = candidate.chars().skip(2).filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 7 {
        return false;
    }
    let check = (d[0] + d[2] + d[4]) + 2 * (d[1] + d[3] + d[5]);
    check % 10 == d[6]
}
