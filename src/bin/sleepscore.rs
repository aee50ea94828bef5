//! sleepscore CLI - Command-line interface for the sleepscore engine
//!
//! Commands:
//! - score: Score one sleep day
//! - week: Scores for the Monday-Sunday week containing a date
//! - range: Scores for the days before a date
//! - report: Daily JSON reports
//! - hypnogram: Stage levels and hour labels for one night
//! - validate: Check samples without scoring
//! - doctor: Diagnose configuration and environment

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sleepscore::adapters::{HealthExportAdapter, SampleSource};
use sleepscore::aggregate::format_duration;
use sleepscore::config::EngineConfig;
use sleepscore::pipeline::{DayScore, SleepProcessor};
use sleepscore::types::{parse_timestamp, DateObject};
use sleepscore::{ComputeError, PRODUCER_NAME, SLEEPSCORE_VERSION};

/// sleepscore - Sleep stage aggregation and quality scoring
#[derive(Parser)]
#[command(name = "sleepscore")]
#[command(version = SLEEPSCORE_VERSION)]
#[command(about = "Score sleep from health store samples", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Engine configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// User timezone (IANA format, e.g., "America/New_York"); overrides the config file
    #[arg(long)]
    timezone: Option<String>,

    /// Local hour at which a sleep day starts; overrides the config file
    #[arg(long)]
    day_boundary_hour: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one sleep day
    Score {
        #[command(flatten)]
        engine: EngineArgs,

        /// Sleep day (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scores for the Monday-Sunday week containing a date
    Week {
        #[command(flatten)]
        engine: EngineArgs,

        /// Any day of the week (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scores for the days before a date, oldest first
    Range {
        #[command(flatten)]
        engine: EngineArgs,

        /// Day after the last scored day (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// Number of days
        #[arg(long, default_value = "7")]
        days: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Daily JSON reports
    Report {
        #[command(flatten)]
        engine: EngineArgs,

        /// Sleep days to report (YYYY-MM-DD); every day with data when omitted
        #[arg(short, long)]
        date: Vec<String>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Stage levels and hour labels for one night
    Hypnogram {
        #[command(flatten)]
        engine: EngineArgs,

        /// Sleep day (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
    },

    /// Check samples without scoring
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON array
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SleepCliError> {
    match cli.command {
        Commands::Score { engine, date, json } => cmd_score(&engine, &date, json),
        Commands::Week { engine, date, json } => cmd_week(&engine, &date, json),
        Commands::Range {
            engine,
            start,
            days,
            json,
        } => cmd_range(&engine, &start, days, json),
        Commands::Report {
            engine,
            date,
            output,
            output_format,
        } => cmd_report(&engine, &date, &output, output_format),
        Commands::Hypnogram { engine, date } => cmd_hypnogram(&engine, &date),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, SleepCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(args: &EngineArgs) -> Result<EngineConfig, SleepCliError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(timezone) = &args.timezone {
        config.timezone = timezone.clone();
    }
    if let Some(hour) = args.day_boundary_hour {
        config.day_boundary_hour = hour;
    }
    config.validate()?;
    Ok(config)
}

fn load_processor(args: &EngineArgs) -> Result<SleepProcessor, SleepCliError> {
    let mut processor = SleepProcessor::with_config(load_config(args)?)?;
    let source = HealthExportAdapter::from_json(&read_input(&args.input)?)?;
    if source.sleep_samples()?.is_empty() {
        return Err(SleepCliError::NoSamples);
    }
    processor.load_from_source(&source)?;
    Ok(processor)
}

fn cmd_score(args: &EngineArgs, date: &str, json: bool) -> Result<(), SleepCliError> {
    let processor = load_processor(args)?;
    let day = DateObject::parse(date)?;
    let analysis = processor.analyze_day(&day)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis.score)?);
        return Ok(());
    }

    let score = &analysis.score;
    let durations = &analysis.durations;
    println!("Sleep Score {}", day);
    println!("=========================");
    println!("Score:        {} / 1000", score.display);
    println!("Total sleep:  {}", format_duration(durations.total_sleep()));
    println!("Efficiency:   {:.1}%", score.efficiency * 100.0);
    println!("\nSub-scores:");
    println!("  efficiency   {:.3}", score.efficiency_score);
    println!("  sleep time   {:.3}", score.sleep_time_score);
    println!("  deep sleep   {:.3}", score.deep_sleep_score);
    println!("  REM sleep    {:.3}", score.rem_sleep_score);
    println!("  consistency  {:.3}", score.consistency_score);
    if let Some(hr) = &analysis.heart_rate {
        println!(
            "\nHeart rate: {:.0}-{:.0} bpm, average {:.0} bpm",
            hr.min, hr.max, hr.average
        );
    }
    Ok(())
}

fn print_scores(title: &str, scores: &[DayScore]) {
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    for score in scores {
        println!("  {}  {:>4}", score.day, score.display);
    }
}

fn cmd_week(args: &EngineArgs, date: &str, json: bool) -> Result<(), SleepCliError> {
    let processor = load_processor(args)?;
    let day = DateObject::parse(date)?;
    let scores = processor.week_scores(day.date())?;
    let total = processor.week_total(day.date())?;

    if json {
        let report = WeekReport { scores, total };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scores(&format!("Week of {}", day), &scores);
        println!("\nWeek total: {}", total);
    }
    Ok(())
}

fn cmd_range(args: &EngineArgs, start: &str, days: u32, json: bool) -> Result<(), SleepCliError> {
    let processor = load_processor(args)?;
    let start = DateObject::parse(start)?;
    let scores = processor.range_scores(days, start.date())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    } else {
        print_scores(&format!("{} days before {}", days, start), &scores);
    }
    Ok(())
}

fn cmd_report(
    args: &EngineArgs,
    dates: &[String],
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), SleepCliError> {
    let processor = load_processor(args)?;
    let days = if dates.is_empty() {
        processor.sleep_days()
    } else {
        dates
            .iter()
            .map(|date| DateObject::parse(date))
            .collect::<Result<Vec<_>, _>>()?
    };

    let reports = processor
        .reports(&days)?
        .iter()
        .map(|report| serde_json::from_str::<serde_json::Value>(report))
        .collect::<Result<Vec<_>, _>>()?;

    let output_data = format_output(&reports, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }
    Ok(())
}

fn cmd_hypnogram(args: &EngineArgs, date: &str) -> Result<(), SleepCliError> {
    let processor = load_processor(args)?;
    let hypnogram = processor.hypnogram_day(&DateObject::parse(date)?)?;
    println!("{}", serde_json::to_string_pretty(&hypnogram)?);
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), SleepCliError> {
    let source = HealthExportAdapter::from_json(&read_input(input)?)?;
    let sleep = source.sleep_samples()?;
    let heart_rate = source.heart_rate_samples()?;

    let mut errors: Vec<ValidationErrorDetail> = Vec::new();
    for (index, sample) in sleep.iter().enumerate() {
        if let Err(e) = sample.interval() {
            errors.push(ValidationErrorDetail {
                kind: "sleep".to_string(),
                index,
                label: sample.value.to_string(),
                error: e.to_string(),
            });
        }
    }
    for (index, sample) in heart_rate.iter().enumerate() {
        let problem = if !sample.value.is_finite() || sample.value < 0.0 {
            Some(format!("bpm {} out of range", sample.value))
        } else {
            parse_timestamp(&sample.start_date).err().map(|e| e.to_string())
        };
        if let Some(error) = problem {
            errors.push(ValidationErrorDetail {
                kind: "heart_rate".to_string(),
                index,
                label: "HEART_RATE".to_string(),
                error,
            });
        }
    }

    let total = sleep.len() + heart_rate.len();
    let report = ValidationReport {
        total_samples: total,
        valid_samples: total - errors.len(),
        invalid_samples: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Valid samples:   {}", report.valid_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - {} sample {} ({}): {}",
                    err.kind, err.index, err.label, err.error
                );
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(SleepCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), SleepCliError> {
    let mut checks: Vec<DoctorCheck> = vec![DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("sleepscore version {}", SLEEPSCORE_VERSION),
    }];

    if let Some(path) = config {
        let check = match fs::read_to_string(path) {
            Ok(content) => match EngineConfig::from_json(&content) {
                Ok(config) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (timezone {}, day starts {:02}:00)",
                        config.timezone, config.day_boundary_hour
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                },
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            },
        };
        checks.push(check);
    }

    let tz_check = match std::env::var("TZ") {
        Ok(tz) if tz.parse::<chrono_tz::Tz>().is_err() => DoctorCheck {
            name: "timezone".to_string(),
            status: CheckStatus::Warning,
            message: format!("TZ={} is not an IANA timezone; pass --timezone", tz),
        },
        _ => DoctorCheck {
            name: "timezone".to_string(),
            status: CheckStatus::Ok,
            message: "Sleep days default to UTC unless --timezone is given".to_string(),
        },
    };
    checks.push(tz_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Warning,
            message: "stdin is a TTY; pass --input or pipe an export".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready to read an export)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: SLEEPSCORE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("sleepscore Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SleepCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output(
    reports: &[serde_json::Value],
    format: &OutputFormat,
) -> Result<String, SleepCliError> {
    match format {
        OutputFormat::Ndjson => {
            let lines = reports
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)?),
    }
}

// Error types

#[derive(Debug)]
enum SleepCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoSamples,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for SleepCliError {
    fn from(e: io::Error) -> Self {
        SleepCliError::Io(e)
    }
}

impl From<ComputeError> for SleepCliError {
    fn from(e: ComputeError) -> Self {
        SleepCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SleepCliError {
    fn from(e: serde_json::Error) -> Self {
        SleepCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SleepCliError> for CliError {
    fn from(e: SleepCliError) -> Self {
        match e {
            SleepCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SleepCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidTimezone(_) => (
                        "INVALID_TIMEZONE",
                        "Use an IANA name such as Europe/Berlin",
                    ),
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'sleepscore doctor --config <file>'")
                    }
                    ComputeError::DateParseError(_) => {
                        ("DATE_ERROR", "Dates are YYYY-MM-DD; timestamps need an offset")
                    }
                    ComputeError::InvalidInterval { .. } | ComputeError::InvalidSample { .. } => {
                        ("INVALID_SAMPLE", "Run 'sleepscore validate' for details")
                    }
                    _ => ("PARSE_ERROR", "Ensure input is a health store export"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SleepCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SleepCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No sleep samples found in input".to_string(),
                hint: Some("Ensure the export contains a \"sleep\" array".to_string()),
            },
            SleepCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            SleepCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct WeekReport {
    scores: Vec<DayScore>,
    total: u32,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_samples: usize,
    valid_samples: usize,
    invalid_samples: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    kind: String,
    index: usize,
    label: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
