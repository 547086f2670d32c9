use colored::Colorize;
use querylens_core::explain::BatchReport;
use querylens_core::{
    ComparisonResult, IndexAnalysis, Priority, QueryStats, Statement,
};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

const QUERY_WIDTH: usize = 80;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn heading(title: &str) {
    println!("\n{}", title.cyan().bold());
}

fn print_table(builder: Builder) {
    println!("{}", builder.build().with(Style::rounded()));
}

/// Shortens a query to one line of at most `width` characters.
pub fn truncate(query: &str, width: usize) -> String {
    let one_line = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if one_line.chars().count() <= width {
        return one_line;
    }
    let mut short: String = one_line.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

pub fn format_pct(pct: f64) -> String {
    format!("{pct:+.1}%")
}

fn colored_pct(pct: f64) -> String {
    let text = format_pct(pct);
    if pct > 0.0 {
        text.red().to_string()
    } else if pct < 0.0 {
        text.green().to_string()
    } else {
        text
    }
}

fn colored_priority(priority: Priority) -> String {
    match priority {
        Priority::High => "high".red().bold().to_string(),
        Priority::Medium => "medium".yellow().to_string(),
        Priority::Low => "low".normal().to_string(),
    }
}

pub fn print_statements(statements: &[Statement]) {
    if statements.is_empty() {
        println!("No SQL statements found.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["#", "Hash", "Duration (ms)", "Table", "Op", "Query"]);
    for (i, s) in statements.iter().enumerate() {
        builder.push_record([
            (i + 1).to_string(),
            s.query_hash.get(..12).unwrap_or(&s.query_hash).to_string(),
            format!("{:.2}", s.duration_ms),
            s.table.clone(),
            s.operation.clone(),
            truncate(&s.raw_query, QUERY_WIDTH),
        ]);
    }
    print_table(builder);
    println!("Total: {}", statements.len());
}

pub fn print_stats(stats: &[QueryStats]) {
    if stats.is_empty() {
        println!("No SQL statements found.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Count", "Total (ms)", "Avg", "Min", "Max", "Tables", "Query"]);
    for s in stats {
        let count = if s.repeated {
            format!("{} {}", s.count, "N+1?".yellow())
        } else {
            s.count.to_string()
        };
        builder.push_record([
            count,
            format!("{:.2}", s.total_duration_ms),
            format!("{:.2}", s.avg_duration_ms),
            format!("{:.2}", s.min_duration_ms),
            format!("{:.2}", s.max_duration_ms),
            s.tables.join(", "),
            truncate(&s.normalized_query, QUERY_WIDTH),
        ]);
    }
    print_table(builder);
}

pub fn print_comparison(result: &ComparisonResult, top: usize) {
    let s = &result.summary;
    heading("Summary");
    let mut builder = Builder::default();
    builder.push_record(["", "Before", "After"]);
    builder.push_record([
        "Queries".to_string(),
        s.total_queries1.to_string(),
        s.total_queries2.to_string(),
    ]);
    builder.push_record([
        "Unique queries".to_string(),
        s.unique_queries1.to_string(),
        s.unique_queries2.to_string(),
    ]);
    builder.push_record([
        "Avg duration (ms)".to_string(),
        format!("{:.2}", s.avg_duration1),
        format!("{:.2}", s.avg_duration2),
    ]);
    print_table(builder);
    println!(
        "Common queries: {}   Plan changes: {}",
        s.common_queries, s.queries_with_plan_change
    );

    if !result.performance_differences.is_empty() {
        heading("Largest changes");
        let mut builder = Builder::default();
        builder.push_record(["Change", "Before (ms)", "After (ms)", "Count", "Plan", "Query"]);
        for d in result.performance_differences.iter().take(top) {
            builder.push_record([
                colored_pct(d.duration_diff_pct),
                format!("{:.2}", d.avg_duration1),
                format!("{:.2}", d.avg_duration2),
                format!("{} → {}", d.count1, d.count2),
                if d.plan_changed { "changed".yellow().to_string() } else { String::new() },
                truncate(&d.normalized_query, QUERY_WIDTH),
            ]);
        }
        print_table(builder);
    }

    print_exclusive("Only before", &result.only_in_set1);
    print_exclusive("Only after", &result.only_in_set2);
}

fn print_exclusive(title: &str, statements: &[Statement]) {
    if statements.is_empty() {
        return;
    }
    heading(title);
    for s in statements {
        println!("  {:>9.2} ms  {}", s.duration_ms, truncate(&s.normalized_query, QUERY_WIDTH));
    }
}

pub fn print_batch_report(report: &BatchReport, statements: &[Statement]) {
    heading("EXPLAIN");
    println!(
        "Explained {} of {} candidate statements ({} below threshold or already explained)",
        report.explained, report.attempted, report.skipped
    );
    for failure in &report.failures {
        let query = statements
            .get(failure.index)
            .map(|s| truncate(&s.raw_query, QUERY_WIDTH))
            .unwrap_or_default();
        println!(
            "  {} no plan ({}): {}\n    {}",
            "✗".red(),
            failure.error.kind,
            failure.error.message,
            query.dimmed()
        );
    }
}

pub fn print_index_analysis(analysis: &IndexAnalysis) {
    heading("Index usage");
    println!(
        "Plans walked: {}   Sequential scans: {}   Index scans: {}",
        analysis.statements_with_plan, analysis.total_seq_scans, analysis.total_index_scans
    );

    if !analysis.sequential_scans.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Table", "Scans", "Avg cost", "Duration (ms)", "Filter"]);
        for issue in &analysis.sequential_scans {
            builder.push_record([
                issue.table.clone(),
                issue.occurrences.to_string(),
                format!("{:.2}", issue.avg_cost),
                format!("{:.2}", issue.duration_ms),
                issue.filter_condition.clone().unwrap_or_default(),
            ]);
        }
        print_table(builder);
    }

    if analysis.recommendations.is_empty() {
        print_success("No index recommendations.");
        return;
    }

    heading(&format!(
        "Recommendations ({} total, {} high priority)",
        analysis.total_recommendations, analysis.high_priority_recommendations
    ));
    for rec in &analysis.recommendations {
        println!("  [{}] {}", colored_priority(rec.priority), rec.reason);
        println!("      {}", rec.estimated_impact);
        if !rec.sql_command.is_empty() {
            println!("      {}", rec.sql_command.green());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("SELECT  *\n FROM t", 80), "SELECT * FROM t");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("abcde", 5), "abcde");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(-50.0), "-50.0%");
        assert_eq!(format_pct(12.345), "+12.3%");
        assert_eq!(format_pct(0.0), "+0.0%");
    }
}
