//! eventdoc.
//!
//! Resolves an AsyncAPI service catalog and writes the data set of its
//! documentation site.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use eventdoc_lib::check_catalog;
use eventdoc_resolver::Resolver;
use eventdoc_site::SiteGenerator;
use eventdoc_telemetry::{log_run_completed, log_run_started, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "eventdoc", about = "AsyncAPI service catalog documentation", version)]
struct Cli {
    /// Log level (RUST_LOG takes precedence).
    #[arg(long, global = true, env = "EVENTDOC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (pretty or json).
    #[arg(long, global = true, env = "EVENTDOC_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate graph data and JSON snapshots.
    Generate {
        /// Catalog root containing services/, channels/ and messages/.
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Only generate this service.
        #[arg(short, long)]
        service: Option<String>,

        /// Layout config (default: <input>/eventdoc.yaml when present).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Resolve every service and event without writing anything.
    ///
    /// Fails when a service cannot be resolved. Events that no document
    /// declares are reported as soft misses.
    Check {
        /// Catalog root.
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,

        /// Layout config.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List every declared event as `<type> <title>`.
    Events {
        /// Catalog root.
        #[arg(short, long)]
        input: PathBuf,

        /// Layout config.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn open(input: &Path, config: Option<&Path>) -> Result<Resolver, ExitCode> {
    Resolver::open(input, config).map_err(|e| {
        eprintln!("error: {}", e);
        ExitCode::from(1)
    })
}

/// Run the generate command.
fn run_generate(
    input: &Path,
    output: &Path,
    service: Option<&str>,
    config: Option<&Path>,
) -> ExitCode {
    let resolver = match open(input, config) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };

    log_run_started!(
        command = "generate",
        input = %input.display(),
        output = %output.display()
    );
    let mut generator = SiteGenerator::new(resolver.layout().clone(), output);

    if let Some(name) = service {
        return match generator.generate_service(name) {
            Ok(summary) => {
                for key in &summary.soft_misses {
                    eprintln!("  {} is not declared by any document (placeholder used)", key);
                }
                eprintln!(
                    "generated {} ({} received, {} sent) into {}",
                    summary.id,
                    summary.received,
                    summary.sent,
                    output.display()
                );
                log_run_completed!(command = "generate", services = 1);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::from(1)
            }
        };
    }

    match generator.generate_all() {
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("✗ {}: {}", failure.service, failure.message);
            }
            for key in &report.soft_misses {
                eprintln!("  {} is not declared by any document (placeholder used)", key);
            }
            eprintln!(
                "generated {} service(s) and {} event(s) into {} ({} files, {} skipped)",
                report.services.len(),
                report.events,
                output.display(),
                report.files_written,
                report.failures.len()
            );
            log_run_completed!(
                command = "generate",
                services = report.services.len(),
                skipped = report.failures.len(),
                events = report.events
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: generation failed: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Run the check command.
fn run_check(input: &Path, output_format: &str, config: Option<&Path>) -> ExitCode {
    let resolver = match open(input, config) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };

    log_run_started!(command = "check", input = %input.display());
    let report = check_catalog(&resolver);

    if output_format == "json" {
        let output = serde_json::json!({
            "results": report.services,
            "soft_misses": report.soft_misses,
            "summary": {
                "total": report.services.len(),
                "valid": report.valid_count(),
                "invalid": report.invalid_count(),
                "events": report.events,
            }
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        for result in &report.services {
            match &result.error {
                None if result.soft_misses.is_empty() => {
                    eprintln!("✓ {} is valid", result.service)
                }
                None => eprintln!(
                    "✓ {} is valid (with {} soft miss(es))",
                    result.service,
                    result.soft_misses.len()
                ),
                Some(err) => eprintln!("✗ {}: {}", result.service, err.message),
            }
            for key in &result.soft_misses {
                eprintln!("  {} is not declared by any document", key);
            }
        }

        eprintln!();
        eprintln!(
            "checked {} service(s): {} valid, {} invalid; {} event(s) declared",
            report.services.len(),
            report.valid_count(),
            report.invalid_count(),
            report.events
        );
    }

    log_run_completed!(command = "check", invalid = report.invalid_count());
    if report.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Run the events command.
fn run_events(input: &Path, config: Option<&Path>) -> ExitCode {
    let resolver = match open(input, config) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };

    for key in resolver.list_events() {
        println!("{}", key);
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(log_format) = LogFormat::parse(&cli.log_format) else {
        eprintln!("error: unknown log format '{}' (expected pretty or json)", cli.log_format);
        return ExitCode::from(1);
    };
    let telemetry = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(log_format);
    if let Err(e) = eventdoc_telemetry::init(&telemetry) {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }

    match cli.command {
        Commands::Generate {
            input,
            output,
            service,
            config,
        } => run_generate(&input, &output, service.as_deref(), config.as_deref()),
        Commands::Check {
            input,
            format,
            config,
        } => run_check(&input, &format, config.as_deref()),
        Commands::Events { input, config } => run_events(&input, config.as_deref()),
    }
}
