//! Ariadne-based rendering of diagnostics.
//!
//! Turns a [`Diagnostic`] into a formatted, labeled report over the original
//! source text. Output is colorless so renders are stable across terminals
//! and usable as test snapshots.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::diag::{Diagnostic, Severity};

fn report_kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Note => ReportKind::Advice,
    }
}

/// Render one diagnostic against its source text.
///
/// Highlight ranges become labels; a diagnostic with no ranges renders as a
/// bare report at its primary location (or offset zero when synthesized).
pub fn render_diagnostic(diag: &Diagnostic, source: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp a range to be valid and non-empty within source bounds;
    // ariadne needs at least a 1-byte span.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len.saturating_sub(1));
        let e = r.end.min(source_len).max(s + 1);
        s..e
    };

    let primary = diag
        .highlights
        .first()
        .map(|h| clamp(h.byte_range()))
        .unwrap_or_else(|| {
            let at = diag
                .location
                .as_ref()
                .map(|l| l.offset as usize)
                .unwrap_or(0);
            clamp(at..at + 1)
        });

    let mut builder = Report::build(report_kind(diag.severity), primary.clone())
        .with_message(&diag.message)
        .with_config(config);

    if diag.highlights.is_empty() {
        builder.add_label(Label::new(primary));
    }
    for highlight in &diag.highlights {
        builder.add_label(Label::new(clamp(highlight.byte_range())));
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("writing to an in-memory buffer cannot fail");
    String::from_utf8(buf).expect("ariadne output is UTF-8")
}

/// Render every diagnostic in emission order, separated by blank lines.
pub fn render_all(diags: &[Diagnostic], source: &str) -> String {
    diags
        .iter()
        .map(|d| render_diagnostic(d, source))
        .collect::<Vec<_>>()
        .join("\n")
}
