use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "querylens")]
#[command(about = "QueryLens: analyze SQL statements captured from service logs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config profile name
    #[arg(short, long, global = true, env = "QUERYLENS_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the normalized shape and hash of a SQL statement
    Normalize(NormalizeArgs),
    /// List the SQL statements found in a log file
    Extract(LogFileArgs),
    /// Per-query duration statistics and repeated-query (N+1) detection
    Stats(StatsArgs),
    /// Compare the statements of two traced executions
    Compare(CompareArgs),
    /// Run EXPLAIN for slow statements and recommend indexes
    Explain(ExplainArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct NormalizeArgs {
    /// SQL text
    pub sql: String,
}

#[derive(clap::Args)]
pub struct LogFileArgs {
    /// JSON-lines log file ("-" for stdin)
    pub file: String,
}

#[derive(clap::Args)]
pub struct StatsArgs {
    /// JSON-lines log file ("-" for stdin)
    pub file: String,
    /// Occurrences at which a query is flagged as repeated
    #[arg(long)]
    pub repeat_threshold: Option<usize>,
    /// Only show the N most expensive queries
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(clap::Args)]
pub struct CompareArgs {
    /// Log file of the baseline execution
    pub before: String,
    /// Log file of the execution to compare against the baseline
    pub after: String,
    /// Number of performance differences to show
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(clap::Args)]
pub struct ExplainArgs {
    /// JSON-lines log file ("-" for stdin)
    pub file: String,
    /// Database to run EXPLAIN against
    #[arg(long, env = "QUERYLENS_DATABASE_URL")]
    pub database_url: Option<String>,
    /// Only explain statements at least this slow
    #[arg(long)]
    pub min_duration_ms: Option<f64>,
    /// Deadline for each EXPLAIN call
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// EXPLAIN calls in flight
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Plan without executing the statements (no ANALYZE)
    #[arg(long)]
    pub plan_only: bool,
    /// Write plan records (query hash, normalized query, plan) to this JSON file
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (database_url, format, min_duration_ms, timeout_ms, concurrency,
    /// repeat_threshold, advisor.frequent_scan_count, advisor.expensive_avg_cost)
    pub key: String,
    /// Value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explain_flags() {
        let cli = Cli::try_parse_from([
            "querylens",
            "--format",
            "json",
            "explain",
            "trace.jsonl",
            "--database-url",
            "postgres://localhost/app",
            "--min-duration-ms",
            "50",
            "--plan-only",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        let Commands::Explain(args) = cli.command else {
            panic!("expected explain");
        };
        assert_eq!(args.file, "trace.jsonl");
        assert_eq!(args.min_duration_ms, Some(50.0));
        assert!(args.plan_only);
        assert_eq!(args.timeout_ms, None);
    }

    #[test]
    fn test_compare_default_top() {
        let cli = Cli::try_parse_from(["querylens", "compare", "a.jsonl", "b.jsonl"]).unwrap();
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.top, 10);
        assert_eq!(cli.log_level, "warn");
    }
}
