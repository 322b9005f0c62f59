use crate::baseline::SummaryDiff;

fn pct(r: f64) -> String {
    if r.is_infinite() {
        "new cost".to_string()
    } else {
        format!("{:+.1}%", r * 100.0)
    }
}

pub fn print_compare_summary(diff: &SummaryDiff) {
    eprintln!(
        "\nComparing warm runtimes (tolerance {:.1}%)...",
        diff.tolerance * 100.0
    );

    for c in &diff.regressions {
        eprintln!(
            "❌ {:<24} {:>10.3} -> {:>10.3} ms  {}",
            c.query,
            c.baseline_ms,
            c.candidate_ms,
            pct(c.relative)
        );
    }
    for c in &diff.improvements {
        eprintln!(
            "✅ {:<24} {:>10.3} -> {:>10.3} ms  {}",
            c.query,
            c.baseline_ms,
            c.candidate_ms,
            pct(c.relative)
        );
    }
    for q in &diff.new_queries {
        eprintln!("➕ {:<24} NEW", q);
    }
    for q in &diff.missing_queries {
        eprintln!("➖ {:<24} MISSING", q);
    }
    for q in &diff.unmeasured {
        eprintln!("⚠️  {:<24} no warm runtime", q);
    }

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Summary: {} regressions, {} improvements, {} new, {} missing, {} unmeasured",
        diff.regressions.len(),
        diff.improvements.len(),
        diff.new_queries.len(),
        diff.missing_queries.len(),
        diff.unmeasured.len()
    );
}
