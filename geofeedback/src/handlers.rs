use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use geofeedback_core::config::{AppConfig, resolve_config_path, write_default_config};
use geofeedback_core::load::{LoadOptions, LoadProgressCallback, execute_load};
use geofeedback_core::report::{
    ReportFormat, gather_report_data, generate_report, save_report,
};
use geofeedback_core::search::{MIN_QUERY_LEN, SearchRow, search};
use geofeedback_core::stats::{CategoryBreakdown, RiskStatistics, StatisticsPanel};
use geofeedback_core::style::risk_style;
use geofeedback_core::{CategoryFilter, FilterState, RiskFilter};
use geofeedback_loader::{DataOrigin, Dataset, LoadOutcome, RiskLevel};
use geofeedback_tui::{LoadMessage, alert_text, create_load_channel};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{debug, info};

// Helper functions shared by the handlers

/// Read the configuration file and apply `--local` / `--api` overrides.
pub fn read_config(
    config_path: Option<&str>,
    local: Option<&str>,
    api: Option<&str>,
) -> Result<AppConfig> {
    let path = resolve_config_path(config_path);
    let mut config = AppConfig::load_or_default(&path)?;
    config.override_source(local, api);
    Ok(config)
}

/// Parse `--risk` and `--category` values into a filter state
pub fn parse_filters(risk: Option<&str>, category: Option<&str>) -> Result<FilterState, String> {
    let risk = risk.unwrap_or("all").parse::<RiskFilter>()?;
    let category = category.unwrap_or("all").parse::<CategoryFilter>()?;
    Ok(FilterState::new(risk, category))
}

/// Risk counts over the facilities that pass `filters`
pub fn filtered_statistics(dataset: &Dataset, filters: &FilterState) -> RiskStatistics {
    RiskStatistics::from_facilities(
        filters
            .apply(dataset)
            .into_iter()
            .filter_map(|idx| dataset.get(idx)),
    )
}

/// One display line per search row
pub fn format_search_rows(rows: &[SearchRow]) -> Vec<String> {
    rows.iter()
        .map(|row| match row.as_hit() {
            Some(hit) => format!(
                "{}  {}  ({:.5}, {:.5})",
                hit.name, hit.subtitle, hit.coordinates.lat, hit.coordinates.lon
            ),
            None => row.label(),
        })
        .collect()
}

pub fn is_affirmative(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí")
}

/// Path `init` writes to: the positional argument, then `--config`, then the default.
pub fn init_target(path: Option<&str>, config_path: Option<&str>) -> PathBuf {
    resolve_config_path(path.or(config_path))
}

fn init_logging(quiet: bool) {
    let level = if quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

fn filters_or_exit(args: &ArgMatches) -> FilterState {
    let risk = args.get_one::<String>("risk").map(String::as_str);
    let category = args.get_one::<String>("category").map(String::as_str);
    parse_filters(risk, category).unwrap_or_else(|e| fail(e))
}

/// Load the configuration for a data command, exiting on error
pub fn load_config(config_path: Option<&str>, args: &ArgMatches) -> AppConfig {
    let local = args.get_one::<String>("local").map(String::as_str);
    let api = args.get_one::<String>("api").map(String::as_str);
    read_config(config_path, local, api).unwrap_or_else(|e| fail(format!("{:#}", e)))
}

async fn load_dataset(config: &AppConfig, quiet: bool) -> LoadOutcome {
    let source = config
        .source
        .to_data_source()
        .unwrap_or_else(|e| fail(format!("{:#}", e)));

    if !quiet {
        println!("{} Source: {}", "→".blue(), source.describe().bright_white());
    }

    let mut options = LoadOptions::new(source);
    options.show_progress_bars = !quiet;

    match execute_load(options, None).await {
        Ok(outcome) => {
            info!(
                "Loaded {} facilities ({})",
                outcome.dataset.len(),
                outcome.origin.as_str()
            );
            if !quiet {
                print_origin(&outcome);
            }
            outcome
        }
        Err(e) => {
            debug!("Load failed: {}", e);
            fail(alert_text(&e))
        }
    }
}

fn print_origin(outcome: &LoadOutcome) {
    let line = format!(
        "Loaded {} facilities from {}",
        outcome.dataset.len(),
        outcome.origin.as_str()
    );
    match outcome.origin {
        DataOrigin::LocalFallback => println!("{} {}", "⚠".yellow().bold(), line.yellow()),
        _ => println!("{} {}", "✓".green().bold(), line),
    }
    println!();
}

fn colored_label(level: RiskLevel, text: &str) -> colored::ColoredString {
    match level {
        RiskLevel::High => text.red().bold(),
        RiskLevel::Medium => text.truecolor(0xff, 0x98, 0x00).bold(),
        RiskLevel::Low => text.green().bold(),
        RiskLevel::NoData => text.dimmed(),
    }
}

fn print_statistics(stats: &RiskStatistics) {
    let panel = StatisticsPanel::from(stats);
    println!(
        "  {:<12} {}",
        "Total".bright_white().bold(),
        panel.total.to_string().bright_white().bold()
    );
    for (level, count) in [
        (RiskLevel::High, panel.high),
        (RiskLevel::Medium, panel.medium),
        (RiskLevel::Low, panel.low),
        (RiskLevel::NoData, stats.no_data),
    ] {
        let label = risk_style(level).label;
        println!(
            "  {:<12} {:>4}  {}",
            colored_label(level, label),
            count,
            format!("{:5.1}%", stats.percentage(level)).dimmed()
        );
    }
}

// Command handlers

pub async fn handle_view(config: AppConfig) {
    let source = config
        .source
        .to_data_source()
        .unwrap_or_else(|e| fail(format!("{:#}", e)));

    let (tx, rx) = create_load_channel();
    let progress_tx = tx.clone();
    let load_task = tokio::spawn(async move {
        let callback: LoadProgressCallback = Arc::new(move |msg: String| {
            let _ = progress_tx.send(LoadMessage::Progress(msg));
        });
        let message = match execute_load(LoadOptions::new(source), Some(callback)).await {
            Ok(outcome) => LoadMessage::Loaded(outcome),
            Err(e) => LoadMessage::Failed(e),
        };
        // the UI may already be gone
        let _ = tx.send(message);
    });

    let should_exit = Arc::new(AtomicBool::new(false));
    let result =
        tokio::task::spawn_blocking(move || geofeedback_tui::run(config, rx, should_exit)).await;
    load_task.abort();

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => fail(format!("Error running TUI: {:#}", e)),
        Err(e) => fail(format!("TUI task failed: {}", e)),
    }
}

pub async fn handle_stats(config: AppConfig, args: &ArgMatches, quiet: bool) {
    init_logging(quiet);
    let filters = filters_or_exit(args);
    let outcome = load_dataset(&config, quiet).await;
    let dataset = &outcome.dataset;

    let stats = filtered_statistics(dataset, &filters);

    print_divider();
    println!("{}", "  ESTADÍSTICAS".bright_white().bold());
    print_divider();
    if !filters.is_unfiltered() {
        println!(
            "{} Filters: risk={} category={}",
            "→".blue(),
            filters.risk.to_string().bright_white(),
            filters.category.to_string().bright_white()
        );
    }
    println!();
    print_statistics(&stats);

    let breakdown = CategoryBreakdown::from_facilities(
        filters
            .apply(dataset)
            .into_iter()
            .filter_map(|idx| dataset.get(idx)),
    );
    if !breakdown.is_empty() {
        println!();
        println!("{}", "BY CATEGORY".bright_blue().bold());
        for row in &breakdown.rows {
            println!(
                "  {:<14} {:>4}   {} {}  {} {}  {} {}",
                row.category.to_string().bright_white(),
                row.stats.total,
                colored_label(RiskLevel::High, "A"),
                row.stats.high,
                colored_label(RiskLevel::Medium, "M"),
                row.stats.medium,
                colored_label(RiskLevel::Low, "B"),
                row.stats.low
            );
        }
    }
    println!();
}

pub async fn handle_search(config: AppConfig, args: &ArgMatches, quiet: bool) {
    init_logging(quiet);
    let query = args
        .get_one::<String>("QUERY")
        .map(String::as_str)
        .unwrap_or_default();

    if query.trim().chars().count() < MIN_QUERY_LEN {
        fail(format!(
            "Search query must be at least {} characters",
            MIN_QUERY_LEN
        ));
    }

    let outcome = load_dataset(&config, quiet).await;
    let rows = search(&outcome.dataset, query).unwrap_or_default();

    for (row, line) in rows.iter().zip(format_search_rows(&rows)) {
        if row.as_hit().is_some() {
            println!("  {} {}", "•".cyan(), line);
        } else {
            println!("  {}", line.dimmed());
        }
    }
}

pub async fn handle_report(config: AppConfig, args: &ArgMatches, quiet: bool) {
    init_logging(quiet);
    let filters = filters_or_exit(args);
    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .unwrap_or_else(|| fail(format!("Unknown report format '{}'", format_name)));
    let output = args.get_one::<PathBuf>("output");

    let outcome = load_dataset(&config, quiet).await;
    let data = gather_report_data(&outcome.dataset, &filters).with_origin(outcome.origin);
    let report = generate_report(&data, format)
        .unwrap_or_else(|e| fail(format!("Failed to render report: {}", e)));

    match output {
        Some(path) => {
            if let Err(e) = save_report(&report, path) {
                fail(format!("Failed to write {}: {}", path.display(), e));
            }
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }
}

pub fn handle_init(config_path: Option<&str>, args: &ArgMatches) {
    print_divider();
    println!("{}", "  GEOFEEDBACK INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let force = args.get_flag("force");
    let target = init_target(args.get_one::<String>("PATH").map(String::as_str), config_path);

    println!(
        "{} Target: {}",
        "→".blue(),
        target.display().to_string().bright_white()
    );
    println!();

    if target.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration file already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            target.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Do you want to overwrite it? [y/N]:");
        println!();

        if !is_affirmative(&response) {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return;
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    if let Err(e) = create_configuration(&target) {
        fail(format!("{:#}", e));
    }

    println!("{} GeoFeedback initialization complete!", "✓".green().bold());
    println!(
        "{} Edit {} to point at your API or local dataset.",
        "ℹ".blue(),
        target.display().to_string().bright_white()
    );
}

fn create_configuration(target: &Path) -> Result<()> {
    write_default_config(target)
        .with_context(|| format!("Failed to initialize {}", target.display()))
}
