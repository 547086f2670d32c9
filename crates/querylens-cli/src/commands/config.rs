use anyhow::Result;
use colored::Colorize;
use querylens_db_postgres::mask_password;

use crate::cli::{ConfigSetArgs, OutputFormat};
use crate::config::{self, ProfileConfig};
use crate::output::{print_json, print_success};

pub fn show(profile: &str, format: OutputFormat) -> Result<()> {
    let cfg = config::load_profile(profile)?;
    if format == OutputFormat::Json {
        let masked = ProfileConfig {
            database_url: cfg.database_url.as_deref().map(mask_password),
            ..cfg
        };
        return print_json(&masked);
    }

    let advisor = cfg.advisor_config();
    let batch = querylens_core::BatchOptions::default();
    println!("{}: {}", "Profile".cyan(), profile);
    println!(
        "{}: {}",
        "Database".cyan(),
        cfg.database_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!(
        "{}: {}",
        "Format".cyan(),
        cfg.format.as_deref().unwrap_or("table")
    );
    println!(
        "{}: {} ms",
        "Min duration".cyan(),
        cfg.min_duration_ms.unwrap_or(batch.min_duration_ms)
    );
    println!(
        "{}: {} ms",
        "EXPLAIN timeout".cyan(),
        cfg.timeout_ms.unwrap_or(batch.timeout_ms)
    );
    println!(
        "{}: {}",
        "Concurrency".cyan(),
        cfg.concurrency.unwrap_or(batch.concurrency)
    );
    println!("{}: {}", "Repeat threshold".cyan(), cfg.repeat_threshold(None));
    println!(
        "{}: {} scans / avg cost {}",
        "Advisor".cyan(),
        advisor.frequent_scan_count,
        advisor.expensive_avg_cost
    );
    Ok(())
}

pub fn set(profile: &str, args: &ConfigSetArgs) -> Result<()> {
    let mut cfg = config::load_profile(profile)?;
    config::set_value(&mut cfg, &args.key, &args.value)?;
    config::save_profile(profile, &cfg)?;
    print_success(&format!("Set {} = {}", args.key, args.value));
    Ok(())
}
