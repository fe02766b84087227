//! Formatted terminal output.
//!
//! Formatting lives in one place so the fitting code stays free of
//! presentation concerns. Nothing here computes fit quantities; everything
//! printed is read off a result or histogram.

use crate::domain::{Axis, FitResult};
use crate::fit::selection::FitSelection;
use crate::hist::Histogram1D;

/// Parameter table plus goodness-of-fit line.
pub fn format_fit_report(fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Model: {} | range=[{}, {}] | bins={} | iterations={}\n",
        fit.model.name(),
        fit.range.lo,
        fit.range.hi,
        fit.bins_used,
        fit.iterations
    ));

    out.push_str(format!("{:<16} {:>14} {:>14}", "parameter", "value", "error").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<14} {:-<14}", "", "", "").trim_end());
    out.push('\n');
    for p in &fit.params {
        out.push_str(
            format!("{:<16} {:>14} {:>14}", truncate(&p.name, 16), fmt_num(p.value), fmt_num(p.error)).trim_end(),
        );
        out.push('\n');
    }

    out.push_str(&format!(
        "chi2/ndf = {:.4} / {} = {:.4} | prob = {:.4}\n",
        fit.chi2,
        fit.ndf,
        fit.chi2_per_ndf(),
        fit.probability
    ));

    out
}

/// Entries, moments and dropped fills of a 1D histogram.
pub fn format_histogram_summary(hist: &Histogram1D) -> String {
    let b = hist.binning();
    let mean = hist.mean(Axis::X).unwrap_or(f64::NAN);
    let rms = hist.rms(Axis::X).unwrap_or(f64::NAN);
    let mut out = String::new();
    let name = if hist.name().is_empty() { "hist" } else { hist.name() };
    out.push_str(&format!("{name}: {} bins over [{}, {})\n", b.n_bins(), b.lo(), b.hi()));
    out.push_str(&format!(
        "entries={} | integral={:.1} | mean={} | rms={} | dropped={}\n",
        hist.entries(),
        hist.integral(),
        fmt_num(mean),
        fmt_num(rms),
        hist.dropped()
    ));
    out
}

/// One line per candidate, the selected model marked with `*`.
pub fn format_comparison(selection: &FitSelection) -> String {
    let mut out = String::new();
    out.push_str("Model comparison:\n");
    for (i, fit) in selection.fits.iter().enumerate() {
        let chosen = if i == selection.best_index { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<12} chi2/ndf={:.4} ({:.2}/{}) prob={:.4}\n",
            fit.model.name(),
            fit.chi2_per_ndf(),
            fit.chi2,
            fit.ndf,
            fit.probability
        ));
    }
    for (name, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {name}) {reason}\n"));
    }
    out
}

fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if v == 0.0 || (1e-3..1e5).contains(&a) {
        format!("{v:.6}")
    } else {
        format!("{v:.6e}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
