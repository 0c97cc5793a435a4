//! Recover movie fields from the service's free-form answer.
//!
//! The model is asked to answer with `Label: value` lines but nothing forces it
//! to. Each field is described once in [`FIELD_RULES`] and matched against the
//! whole text, so extra prose, reordering and missing lines are all tolerated.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ExtractionResult, NO_MATCH_SYNOPSIS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Year,
    Actors,
    Synopsis,
}

impl Field {
    fn assign(self, result: &mut ExtractionResult, value: String) {
        match self {
            Field::Title => result.title = value,
            Field::Year => result.release_year = value,
            Field::Actors => result.main_actors = value,
            Field::Synopsis => result.synopsis = value,
        }
    }
}

/// One extractable field: where to look and how to clean what was found.
struct FieldRule {
    field: Field,
    pattern: Regex,
    postprocess: fn(&str) -> Option<String>,
}

impl FieldRule {
    /// Builds a case-insensitive `label: value` matcher scoped to one line.
    /// The label must open its line, after optional whitespace, emphasis or
    /// bullet markers. Markers between the colon and the value are skipped.
    fn new(field: Field, label: &str, value: &str, postprocess: fn(&str) -> Option<String>) -> Self {
        let pattern = format!(r"(?im)^[ \t*-]*{}:[ \t*]*({})", regex::escape(label), value);
        Self {
            field,
            pattern: Regex::new(&pattern).expect("Invalid field rule regex"),
            postprocess,
        }
    }

    fn find(&self, text: &str) -> Option<String> {
        let captured = self.pattern.captures(text)?.get(1)?.as_str();
        (self.postprocess)(captured)
    }
}

static FIELD_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::new(Field::Title, "Title", ".*", clean_line),
        FieldRule::new(Field::Year, "Year", r"\d{4}\b", |year| Some(year.to_string())),
        FieldRule::new(Field::Actors, "Actors", ".*", clean_line),
        FieldRule::new(Field::Synopsis, "Synopsis", ".*", clean_line),
    ]
});

/// Strip surrounding whitespace and `*` emphasis markers. Empty results count
/// as "not found".
fn clean_line(raw: &str) -> Option<String> {
    let cleaned = raw.replace('*', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// First line of `text` with any content, markers stripped.
fn first_line(text: &str) -> Option<String> {
    text.lines().find_map(clean_line)
}

/// Map response text to structured fields.
///
/// Never fails. Without a `Title:` line the result is the default record with
/// `success == false`, even if other labels were present.
pub fn extract(text: &str) -> ExtractionResult {
    let mut result = ExtractionResult::default();

    let found: Vec<(Field, String)> = FIELD_RULES
        .iter()
        .filter_map(|rule| rule.find(text).map(|value| (rule.field, value)))
        .collect();

    if !found.iter().any(|(field, _)| *field == Field::Title) {
        return result;
    }

    let mut has_synopsis = false;
    for (field, value) in found {
        has_synopsis |= field == Field::Synopsis;
        field.assign(&mut result, value);
    }
    result.success = true;

    if !has_synopsis {
        if let Some(line) = first_line(text) {
            result.synopsis = line;
        }
    }

    result
}

/// Message to show when [`extract`] found no title.
///
/// The service usually explains itself on the first line ("Identification
/// Failed. ..."), so that line is preferred over the generic placeholder.
pub fn no_match_message(text: &str) -> String {
    first_line(text).unwrap_or_else(|| NO_MATCH_SYNOPSIS.to_string())
}
