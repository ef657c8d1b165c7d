//! Reporting and export — CSV, Markdown, and JSON artifacts for a
//! walk-forward run, plus the per-bar timeline of a single run.
//!
//! - **CSV**: one row per window, chosen parameters then `OutOfSample_*` metrics
//! - **Markdown**: one section per window with the out-of-sample statistics
//! - **JSON**: the full `WfoReport`; unknown schema versions are rejected on load

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use revertlab_core::domain::{Direction, PriceSeries};
use revertlab_core::engine::StrategyRun;

use crate::backtest::PortfolioStats;
use crate::runner::SCHEMA_VERSION;
use crate::walk_forward::{WfoReport, WindowOutcome};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &WfoReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize WfoReport to JSON")
}

pub fn import_json(json: &str) -> Result<WfoReport> {
    let report: WfoReport =
        serde_json::from_str(json).context("failed to deserialize WfoReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

const OOS_COLUMNS: [&str; 10] = [
    "OutOfSample_Start",
    "OutOfSample_End",
    "OutOfSample_TotalReturnPct",
    "OutOfSample_BenchmarkReturnPct",
    "OutOfSample_MaxDrawdownPct",
    "OutOfSample_WinRatePct",
    "OutOfSample_Sharpe",
    "OutOfSample_Sortino",
    "OutOfSample_Calmar",
    "OutOfSample_TotalTrades",
];

fn oos_fields(s: &PortfolioStats) -> [String; 10] {
    [
        s.start.to_string(),
        s.end.to_string(),
        format!("{:.4}", s.total_return_pct),
        format!("{:.4}", s.benchmark_return_pct),
        format!("{:.4}", s.max_drawdown_pct),
        s.win_rate_pct.map(|w| format!("{w:.4}")).unwrap_or_default(),
        format!("{:.6}", s.sharpe),
        format!("{:.6}", s.sortino),
        format!("{:.6}", s.calmar),
        s.total_trades.to_string(),
    ]
}

fn status_label(outcome: &WindowOutcome) -> &'static str {
    match outcome {
        WindowOutcome::Validated { .. } => "validated",
        WindowOutcome::NoAdmissibleParameters => "no_admissible_parameters",
        WindowOutcome::ValidationFailed { .. } => "validation_failed",
    }
}

/// One row per window. Windows without a validated result keep their row
/// with empty metric cells and a status.
pub fn export_windows_csv(report: &WfoReport) -> Result<String> {
    let param_names: BTreeSet<&str> = report
        .windows
        .iter()
        .filter_map(|w| w.outcome.chosen())
        .flat_map(|p| p.names())
        .collect();

    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = vec!["Window"];
    header.extend(param_names.iter().copied());
    header.extend(OOS_COLUMNS);
    header.push("Status");
    wtr.write_record(&header)?;

    for w in &report.windows {
        let mut row = vec![(w.split.window_index + 1).to_string()];
        let chosen = w.outcome.chosen();
        row.extend(param_names.iter().map(|name| {
            chosen
                .and_then(|p| p.get(name))
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        match w.outcome.out_of_sample() {
            Some(stats) => row.extend(oos_fields(stats)),
            None => row.extend(std::iter::repeat(String::new()).take(OOS_COLUMNS.len())),
        }
        row.push(status_label(&w.outcome).to_string());
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn direction_label(d: Direction) -> &'static str {
    match d {
        Direction::Flat => "flat",
        Direction::Long => "long",
        Direction::Short => "short",
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Per-bar timeline of one strategy run: bars, signals, and trade state.
pub fn export_timeline_csv(series: &PriceSeries, run: &StrategyRun) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bar_index",
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "bullish",
        "bearish",
        "direction",
        "in_trade",
        "stop_level",
        "entry_price",
        "exit_price",
    ])?;

    let states = run.timeline.states();
    for (i, bar) in series.bars().iter().enumerate() {
        let signal = run.signals.get(i).copied().unwrap_or_default();
        let state = states.get(i).copied().unwrap_or_default();
        let fields: [String; 13] = [
            i.to_string(),
            bar.timestamp.to_string(),
            format!("{:.6}", bar.open),
            format!("{:.6}", bar.high),
            format!("{:.6}", bar.low),
            format!("{:.6}", bar.close),
            signal.bullish.to_string(),
            signal.bearish.to_string(),
            direction_label(state.direction).to_string(),
            state.in_trade.to_string(),
            opt(state.stop_level),
            opt(state.entry_price),
            opt(state.exit_price),
        ];
        wtr.write_record(&fields)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown report ────────────────────────────────────────────────

fn pct(v: f64) -> String {
    format!("{v:.2}%")
}

fn ratio(v: f64) -> String {
    format!("{v:.4}")
}

pub fn generate_report(report: &WfoReport) -> String {
    let mut md = String::with_capacity(1024 + report.windows.len() * 512);

    md.push_str("# Walk-Forward Optimization Results\n\n");
    md.push_str(&format!("- Run: `{}`\n", report.run_id));
    md.push_str(&format!("- Dataset: `{}` ({} bars)\n", report.dataset_hash, report.bar_count));
    md.push_str(&format!(
        "- Windows: {} ({} validated)\n\n",
        report.windows.len(),
        report.validated().count()
    ));

    for w in &report.windows {
        let s = &w.split;
        md.push_str(&format!("## Window {}\n\n", s.window_index + 1));
        md.push_str(&format!(
            "In-sample bars {}..{}, out-of-sample bars {}..{}. {} combinations evaluated, {} without trades, {} failed.\n\n",
            s.is_start,
            s.is_end,
            s.oos_start,
            s.oos_end,
            w.evaluated,
            w.zero_trade,
            w.failures.len()
        ));

        match &w.outcome {
            WindowOutcome::NoAdmissibleParameters => {
                md.push_str("No admissible parameter set: every combination failed or produced no trades.\n\n");
            }
            WindowOutcome::ValidationFailed { chosen, reason } => {
                push_chosen(&mut md, chosen.values().iter());
                md.push_str(&format!("### Out-of-Sample Results\n\nEvaluation failed: {reason}\n\n"));
            }
            WindowOutcome::Validated {
                chosen,
                out_of_sample: o,
            } => {
                push_chosen(&mut md, chosen.values().iter());
                md.push_str("### Out-of-Sample Results\n\n");
                md.push_str("| Metric | Value |\n");
                md.push_str("| --- | --- |\n");
                md.push_str(&format!("| Start | {} |\n", o.start));
                md.push_str(&format!("| End | {} |\n", o.end));
                md.push_str(&format!("| Total Return | {} |\n", pct(o.total_return_pct)));
                md.push_str(&format!("| Benchmark Return | {} |\n", pct(o.benchmark_return_pct)));
                md.push_str(&format!("| Max Drawdown | {} |\n", pct(o.max_drawdown_pct)));
                md.push_str(&format!(
                    "| Win Rate | {} |\n",
                    o.win_rate_pct.map(pct).unwrap_or_else(|| "n/a".to_string())
                ));
                md.push_str(&format!("| Sharpe Ratio | {} |\n", ratio(o.sharpe)));
                md.push_str(&format!("| Sortino Ratio | {} |\n", ratio(o.sortino)));
                md.push_str(&format!("| Calmar Ratio | {} |\n", ratio(o.calmar)));
                md.push_str(&format!("| Total Trades | {} |\n\n", o.total_trades));
            }
        }

        if !w.failures.is_empty() {
            md.push_str("Failed combinations:\n\n");
            for f in &w.failures {
                md.push_str(&format!("- {}: {}\n", f.params, f.reason));
            }
            md.push('\n');
        }
    }

    md
}

fn push_chosen<'a>(md: &mut String, params: impl Iterator<Item = (&'a String, &'a f64)>) {
    md.push_str("### Chosen Parameters for Out-of-Sample Test\n\n");
    for (name, value) in params {
        md.push_str(&format!("- {name}: {value}\n"));
    }
    md.push('\n');
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `wfo_results.csv`, `wfo_results.md`, and `wfo_report.json` into
/// `output_dir`, creating it if needed. Returns the written paths.
pub fn write_reports(report: &WfoReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let files = [
        ("wfo_results.csv", export_windows_csv(report)?),
        ("wfo_results.md", generate_report(report)),
        ("wfo_report.json", export_json(report)?),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Load a report written by `write_reports`.
pub fn load_report(dir: &Path) -> Result<WfoReport> {
    let path = dir.join("wfo_report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
