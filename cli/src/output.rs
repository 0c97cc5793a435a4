//! Plain-text rendering of an identification outcome.

use std::fmt::Write;

use reelscan_core::IdentificationOutcome;

/// Result card: title and year, cast, synopsis, then any sources.
pub fn render_outcome(outcome: &IdentificationOutcome) -> String {
    let result = &outcome.result;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", result.title, result.release_year);
    let _ = writeln!(out, "Starring: {}", result.main_actors);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", result.synopsis);

    if !outcome.sources.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Sources:");
        for source in &outcome.sources {
            let _ = writeln!(out, "  - {} <{}>", source.title, source.uri);
        }
    }

    out
}
