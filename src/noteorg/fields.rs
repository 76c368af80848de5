//! Template field analysis: which fields a template reads, whether a
//! note's fields produce a card, and what to fill on a fresh note.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::collection::Collection;
use crate::note::{NoteId, NotetypeId};

fn field_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{[^#/^}]+?\}\}").expect("field reference pattern"))
}

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{#([^}]+)\}\}").expect("section pattern"))
}

/// Field names referenced on a template, in order of first use.
///
/// Filters such as `{{text:Front}}` are stripped and `FrontSide` is skipped.
pub fn fields_on_template(fmt: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut result = vec![];
    for m in field_ref_regex().find_iter(fmt) {
        let inner = m.as_str().trim_matches(|c| c == '{' || c == '}');
        let name = inner.rsplit(':').next().unwrap_or(inner).trim();
        if name.is_empty() || name == "FrontSide" {
            continue;
        }
        if seen.insert(name.to_string()) {
            result.push(name.to_string());
        }
    }
    result
}

/// Whether a template front renders to something for these field values.
///
/// Every `{{#Field}}` section on the front must be non-empty and at least
/// one plainly referenced field must have content.
pub fn template_generates(front: &str, names: &[String], values: &[String]) -> bool {
    let value_of = |name: &str| -> &str {
        names.iter()
             .position(|n| n == name)
             .and_then(|i| values.get(i))
             .map(|v| v.trim())
             .unwrap_or("")
    };
    for cap in section_regex().captures_iter(front) {
        if value_of(cap[1].trim()).is_empty() {
            return false;
        }
    }
    fields_on_template(front).iter().any(|name| !value_of(name).is_empty())
}

/// Indices of the fields a new note of `ntid` should have filled so that it
/// generates at least its first card.
///
/// Looks at existing notes of the type whose only card is the first-template
/// card and copies the filled-field pattern of the leanest one: fewest filled
/// fields, then the oldest. `None` means no guidance, either because no such
/// note exists or because its pattern is empty.
pub fn fields_to_fill<C: Collection + ?Sized>(col: &C, ntid: NotetypeId) -> Option<Vec<usize>> {
    let mut best: Option<((usize, NoteId), Vec<usize>)> = None;
    for nid in col.notes_of_notetype(ntid) {
        let cards = col.cards_of_note(nid);
        if cards.len() != 1 || cards[0].ord != 0 {
            continue;
        }
        let note = match col.get_note(nid) {
            Ok(n) => n,
            Err(_) => continue,
        };
        let key = (note.filled_field_count(), nid);
        if best.as_ref().map_or(true, |(k, _)| key < *k) {
            let filled = note.fields
                             .iter()
                             .enumerate()
                             .filter(|(_, f)| !f.is_empty())
                             .map(|(i, _)| i)
                             .collect();
            best = Some((key, filled));
        }
    }
    match best {
        Some((_, filled)) if !filled.is_empty() => Some(filled),
        _ => None,
    }
}
