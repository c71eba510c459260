use std::fmt::Write;

use serde::Serialize;

use crate::analysis::Analysis;
use crate::config::AnalysisConfig;
use crate::models::{AgentSummary, HourMatrix, MatrixRow};

/// Minutes as `HH:MM`, rounded to the second and clamped at zero.
pub fn fmt_hhmm(minutes: f64) -> String {
    let secs = ((minutes * 60.0).round() as i64).max(0);
    format!("{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

/// Matrix column label, e.g. `09a10`.
pub fn hour_label(hour: u32) -> String {
    format!("{:02}a{:02}", hour, hour + 1)
}

/// Summaries ordered by idle minutes, highest first; ties by agent id.
pub fn ranked(summaries: &[AgentSummary]) -> Vec<&AgentSummary> {
    let mut ranked: Vec<&AgentSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_idle_minutes
            .total_cmp(&a.total_idle_minutes)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    ranked
}

pub fn render_summary(analysis: &Analysis, limit: usize) -> String {
    let mut output = String::new();
    let kpis = &analysis.kpis;

    let _ = writeln!(output, "Total idle time: {} h", fmt_hhmm(kpis.total_idle_minutes));
    let _ = writeln!(
        output,
        "Mean per agent: {} h",
        fmt_hhmm(kpis.mean_idle_minutes_per_agent)
    );
    let _ = writeln!(
        output,
        "Agent with most idle time: {}",
        kpis.top_agent.as_deref().unwrap_or("-")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Idle time by agent:");
    for summary in ranked(&analysis.summaries).into_iter().take(limit) {
        let _ = writeln!(
            output,
            "- {}: {} h ({:.2} min) across {} NC/IN attempts",
            summary.agent_id,
            fmt_hhmm(summary.total_idle_minutes),
            summary.total_idle_minutes,
            summary.attempt_count
        );
    }
    output
}

pub fn render_detail(analysis: &Analysis) -> String {
    let mut output = String::new();
    if analysis.intervals.is_empty() {
        let _ = writeln!(output, "No intervals meet the threshold.");
        return output;
    }
    for interval in &analysis.intervals {
        let _ = writeln!(
            output,
            "{}  {} -> {}  {:<12} {}  {:.2}",
            interval.agent_id,
            interval.previous_timestamp.format("%Y-%m-%d %H:%M:%S"),
            interval.current_timestamp.format("%Y-%m-%d %H:%M:%S"),
            interval.status_code,
            fmt_hhmm(interval.net_minutes),
            interval.net_minutes
        );
    }
    output
}

pub fn render_heatmap(analysis: &Analysis) -> String {
    let mut output = String::new();
    if analysis.heatmap.is_empty() {
        let _ = writeln!(output, "No intervals meet the threshold.");
        return output;
    }
    for cell in &analysis.heatmap {
        let _ = writeln!(
            output,
            "{} {:02}h  {}  {:.2}",
            cell.weekday_label,
            cell.hour,
            fmt_hhmm(cell.minutes),
            cell.minutes
        );
    }
    output
}

pub fn render_matrix(matrix: &HourMatrix) -> String {
    let mut output = String::new();
    if matrix.rows.is_empty() {
        let _ = writeln!(output, "No minutes accumulated in the selected hour range.");
        return output;
    }

    let width = matrix
        .rows
        .iter()
        .map(|row| row.agent_id.len())
        .chain(std::iter::once(matrix.total.agent_id.len()))
        .max()
        .unwrap_or(0);

    let _ = write!(output, "{:width$}", "");
    for hour in matrix.start_hour..matrix.end_hour {
        let _ = write!(output, " {}", hour_label(hour));
    }
    let _ = writeln!(output, " Total");

    for row in matrix.rows.iter().chain(std::iter::once(&matrix.total)) {
        let _ = write!(output, "{:width$}", row.agent_id);
        for minutes in row.minutes_by_hour.values() {
            let _ = write!(output, " {:>5}", fmt_hhmm(*minutes));
        }
        let _ = writeln!(output, " {}", fmt_hhmm(row.total_minutes));
    }
    output
}

pub fn build_report(source: &str, config: &AnalysisConfig, analysis: &Analysis) -> String {
    let mut output = String::new();
    let breaks = if config.breaks.is_empty() {
        "none".to_string()
    } else {
        config
            .breaks
            .iter()
            .map(|window| window.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let _ = writeln!(output, "# Idle Time Report");
    let _ = writeln!(
        output,
        "Generated from {} (threshold {} min, breaks excluded: {})",
        source, config.min_interval_minutes, breaks
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Figures");
    let _ = writeln!(
        output,
        "- Total: {} h",
        fmt_hhmm(analysis.kpis.total_idle_minutes)
    );
    let _ = writeln!(
        output,
        "- Mean per agent: {} h",
        fmt_hhmm(analysis.kpis.mean_idle_minutes_per_agent)
    );
    let _ = writeln!(
        output,
        "- Agent with most idle time: {}",
        analysis.kpis.top_agent.as_deref().unwrap_or("-")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Idle Time by Agent");
    let _ = writeln!(output, "| Agent | NC/IN attempts | Minutes | HH:MM |");
    let _ = writeln!(output, "|---|---:|---:|---:|");
    for summary in ranked(&analysis.summaries) {
        let _ = writeln!(
            output,
            "| {} | {} | {:.2} | {} |",
            summary.agent_id,
            summary.attempt_count,
            summary.total_idle_minutes,
            fmt_hhmm(summary.total_idle_minutes)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Hour by Weekday");
    if analysis.heatmap.is_empty() {
        let _ = writeln!(output, "No intervals meet the threshold.");
    } else {
        let _ = writeln!(output, "| Day | Hour | Minutes | HH:MM |");
        let _ = writeln!(output, "|---|---:|---:|---:|");
        for cell in &analysis.heatmap {
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} | {} |",
                cell.weekday_label,
                cell.hour,
                cell.minutes,
                fmt_hhmm(cell.minutes)
            );
        }
    }

    let _ = writeln!(output);
    let matrix = &analysis.matrix;
    let _ = writeln!(
        output,
        "## Agent by Hour ({})",
        if matrix.exact_overlap {
            "exact overlap"
        } else {
            "closing hour"
        }
    );
    if matrix.rows.is_empty() {
        let _ = writeln!(output, "No minutes accumulated in the selected hour range.");
    } else {
        let labels: Vec<String> = (matrix.start_hour..matrix.end_hour).map(hour_label).collect();
        let _ = writeln!(output, "| Agent | {} | Total |", labels.join(" | "));
        let _ = writeln!(output, "|---|{}---:|", "---:|".repeat(labels.len()));
        for row in matrix.rows.iter().chain(std::iter::once(&matrix.total)) {
            let _ = writeln!(output, "{}", markdown_matrix_row(row));
        }
    }

    output
}

fn markdown_matrix_row(row: &MatrixRow) -> String {
    let cells: Vec<String> = row.minutes_by_hour.values().map(|m| fmt_hhmm(*m)).collect();
    format!(
        "| {} | {} | {} |",
        row.agent_id,
        cells.join(" | "),
        fmt_hhmm(row.total_minutes)
    )
}

#[derive(Serialize)]
struct JsonExport<'a> {
    min_interval_minutes: f64,
    breaks: Vec<String>,
    qualifying_codes: Vec<&'a str>,
    #[serde(flatten)]
    analysis: &'a Analysis,
}

pub fn to_json(config: &AnalysisConfig, analysis: &Analysis) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonExport {
        min_interval_minutes: config.min_interval_minutes,
        breaks: config.breaks.iter().map(|w| w.to_string()).collect(),
        qualifying_codes: config.qualifying_codes.iter().map(String::as_str).collect(),
        analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{run, AnalysisOutcome};
    use crate::ingest::parse_row;

    fn sample_analysis() -> Analysis {
        let events = vec![
            parse_row("2024-03-04", "09:00", "A1", "Contacto").unwrap(),
            parse_row("2024-03-04", "09:10", "A1", "NoContacto").unwrap(),
            parse_row("2024-03-04", "13:50", "A1", "Inubicado").unwrap(),
            parse_row("2024-03-04", "10:00", "B2", "Contacto").unwrap(),
            parse_row("2024-03-04", "10:20", "B2", "NoContacto").unwrap(),
        ];
        match run(events, &AnalysisConfig::default()).unwrap() {
            AnalysisOutcome::Ready(analysis) => *analysis,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn formats_minutes_as_hours_and_minutes() {
        assert_eq!(fmt_hhmm(0.0), "00:00");
        assert_eq!(fmt_hhmm(230.0), "03:50");
        assert_eq!(fmt_hhmm(59.999), "01:00");
        assert_eq!(fmt_hhmm(-5.0), "00:00");
        assert_eq!(fmt_hhmm(f64::NAN), "00:00");
        assert_eq!(fmt_hhmm(6000.0), "100:00");
    }

    #[test]
    fn labels_hour_columns() {
        assert_eq!(hour_label(9), "09a10");
        assert_eq!(hour_label(23), "23a24");
    }

    #[test]
    fn ranks_by_idle_minutes() {
        let analysis = sample_analysis();
        let order: Vec<&str> = ranked(&analysis.summaries)
            .iter()
            .map(|s| s.agent_id.as_str())
            .collect();
        assert_eq!(order, vec!["A1", "B2"]);
    }

    #[test]
    fn ranking_breaks_ties_by_agent_id() {
        let summary = |agent: &str, minutes: f64| AgentSummary {
            agent_id: agent.to_string(),
            attempt_count: 1,
            total_idle_minutes: minutes,
        };
        let summaries = vec![
            summary("C3", 15.0),
            summary("B2", 30.0),
            summary("A1", 15.0),
            summary("D4", 0.0),
        ];
        let order: Vec<&str> = ranked(&summaries)
            .iter()
            .map(|s| s.agent_id.as_str())
            .collect();
        assert_eq!(order, vec!["B2", "A1", "C3", "D4"]);
    }

    #[test]
    fn summary_lists_agents() {
        let text = render_summary(&sample_analysis(), 10);
        assert!(text.contains("Total idle time: 04:20 h"));
        assert!(text.contains("- A1: 04:00 h (240.00 min) across 2 NC/IN attempts"));
        assert!(text.contains("- B2: 00:20 h"));
    }

    #[test]
    fn report_has_every_section() {
        let report = build_report("log.csv", &AnalysisConfig::default(), &sample_analysis());
        assert!(report.starts_with("# Idle Time Report"));
        assert!(report.contains("breaks excluded: 13:00-14:30"));
        assert!(report.contains("## Idle Time by Agent"));
        assert!(report.contains("| Lun | 13 | 230.00 | 03:50 |"));
        assert!(report.contains("## Agent by Hour (exact overlap)"));
        assert!(report.contains("| TOTAL |"));
    }

    #[test]
    fn matrix_text_has_total_row() {
        let analysis = sample_analysis();
        let text = render_matrix(&analysis.matrix);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("06a07"));
        assert!(lines[0].ends_with("Total"));
        assert!(lines[3].starts_with("TOTAL"));
        assert!(lines[3].ends_with("04:20"));
    }

    #[test]
    fn json_export_carries_aggregates() {
        let analysis = sample_analysis();
        let json = to_json(&AnalysisConfig::default(), &analysis).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["breaks"][0], "13:00-14:30");
        assert_eq!(value["summaries"][0]["agent_id"], "A1");
        assert_eq!(value["matrix"]["total"]["total_minutes"], 260.0);
        assert_eq!(value["intervals"].as_array().unwrap().len(), 3);
    }
}
