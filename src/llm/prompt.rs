use std::fmt::Write;

use crate::models::{RegistryRecord, SourceRecord};
use crate::normalize::{normalize_identifier, normalize_postcode};

pub const SYSTEM_PROMPT: &str = "You are an expert in Australian business entity resolution. \
Answer with a single registry identifier or the word None.";

const GUIDELINES: &str = r#"Your task is to determine if web data and official business register data refer to the same company.

CONTEXT:
- Web data is extracted from company websites (may have informal names, abbreviations)
- Register data comes from the Australian Business Register (official legal names, may be formal)
- Australian companies often trade under different names than their legal registration
- Consider common variations: "Pty Ltd" vs "Proprietary Limited", abbreviations, "The" prefix

MATCHING GUIDELINES:
1. Strong match indicators:
- Identifier found on website matches a register record exactly
- Domain name clearly derives from entity name
- Same suburb/postcode
- Trading name matches the website name

2. Weak match indicators:
- Similar industry only
- Similar name but different legal structure
- Geographic proximity only

3. Non-match indicators:
- Completely different business activities
- Different states with no connection
- Name similarity is coincidental (e.g. "Smith Consulting" is common)

EXAMPLE (MATCH):
Website: "acmewidgets.com.au", Name: "Acme Widgets", Location: "Sydney NSW"
Register: ABN 12345678901, Name: "ACME WIDGETS PTY LTD", Location: "Sydney NSW 2000"
Reasoning: domain matches entity name closely, same city; the website uses an informal trading name.
Answer: 12345678901
"#;

/// Candidates shown to the model: same-postcode entries first, then the
/// rest in register order, at most `max` in total.
pub fn select_candidates<'a>(record: &SourceRecord, candidates: &'a [RegistryRecord], max: usize) -> Vec<&'a RegistryRecord> {
    let postcode = normalize_postcode(&record.postcode);
    let (mut near, far): (Vec<&RegistryRecord>, Vec<&RegistryRecord>) = candidates
        .iter()
        .partition(|c| !postcode.is_empty() && normalize_postcode(&c.postcode) == postcode);
    near.extend(far);
    near.truncate(max);
    near
}

pub fn build_user_prompt(record: &SourceRecord, candidates: &[&RegistryRecord]) -> String {
    let mut out = String::with_capacity(GUIDELINES.len() + candidates.len() * 64);
    out.push_str(GUIDELINES);
    out.push_str("\nHere are the details.\n\n");
    let _ = writeln!(out, "Website: {}", record.domain);
    let _ = writeln!(out, "Company: {}", record.name);
    let _ = writeln!(out, "Postcode: {}", record.postcode);
    if let Some(id) = &record.id_candidate {
        let _ = writeln!(out, "Identifier seen on website: {}", id);
    }
    out.push_str("\nRegister options (id | name | state | postcode):\n");
    for c in candidates {
        let _ = writeln!(out, "{} | {} | {} | {}", c.registry_id, c.name, c.state, c.postcode);
    }
    out.push_str("\nReturn only the id of the best matching register record if confident, otherwise return None.");
    out
}

/// Reads the model's answer: `None` (any case, optionally quoted or
/// punctuated) means no match, anything else is taken as an identifier.
pub fn parse_answer(content: &str) -> Option<String> {
    let trimmed = content
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c.is_whitespace());
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    let id = trimmed
        .strip_prefix("ABN")
        .or_else(|| trimmed.strip_prefix("abn"))
        .unwrap_or(trimmed)
        .trim_start_matches(':');
    let id = normalize_identifier(id);
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: &str, pc: &str) -> RegistryRecord {
        RegistryRecord { registry_id: id.into(), name: format!("ENTITY {id}"), entity_type: "T".into(), state: "NSW".into(), postcode: pc.into() }
    }

    fn src() -> SourceRecord {
        SourceRecord { domain: "acme.com.au".into(), name: "Acme Widgets".into(), id_candidate: None, postcode: "2000".into() }
    }

    #[test]
    fn same_postcode_candidates_come_first() {
        let cands = vec![r("1", "3000"), r("2", "2000"), r("3", "4000"), r("4", "2000")];
        let picked = select_candidates(&src(), &cands, 3);
        assert_eq!(picked.iter().map(|c| c.registry_id.as_str()).collect::<Vec<_>>(), vec!["2", "4", "1"]);
    }

    #[test]
    fn prompt_lists_record_and_candidates() {
        let cands = vec![r("11000000948", "2000")];
        let refs: Vec<&RegistryRecord> = cands.iter().collect();
        let p = build_user_prompt(&src(), &refs);
        assert!(p.contains("Company: Acme Widgets"));
        assert!(p.contains("11000000948 | ENTITY 11000000948 | NSW | 2000"));
        assert!(p.ends_with("otherwise return None."));
    }

    #[test]
    fn answers_are_parsed() {
        assert_eq!(parse_answer("None"), None);
        assert_eq!(parse_answer(" \"none\". "), None);
        assert_eq!(parse_answer("11000000948"), Some("11000000948".into()));
        assert_eq!(parse_answer("ABN: 11 000 000 948"), Some("11000000948".into()));
        assert_eq!(parse_answer("`123-456`"), Some("123456".into()));
        assert_eq!(parse_answer("   "), None);
    }
}
