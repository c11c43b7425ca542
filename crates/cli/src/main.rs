// sdash - sales analytics from the command line
//
// Runs one analysis over exports on disk, prints the result tables (or a
// JSON document) and optionally writes the report workbook.

mod exit_codes;
mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use salesdash_analytics::{AnalysisRequest, InputFile, InputKind, Pipeline, PipelineError, Variant};
use salesdash_config::{LoadedConfig, PipelineSettings};

use exit_codes::{pipeline_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE, EXIT_WRITE};

#[derive(Parser)]
#[command(name = "sdash")]
#[command(about = "Call-center sales analytics: agent performance, daily sales, campaigns, promotions")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/salesdash/settings.toml)
    #[arg(long, global = true, env = "SALESDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Log pipeline stages to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Output flags shared by every analysis.
#[derive(clap::Args)]
struct OutputArgs {
    /// Print one JSON document instead of tables
    #[arg(long)]
    json: bool,

    /// Write the report workbook (.xlsx) here
    #[arg(long, short = 'o', value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-agent performance from contract exports, joined with call time
    #[command(after_help = "\
Examples:
  sdash agents --contract contracts.xlsx --calls calltime.xls
  sdash agents --contract jan.xlsx --contract feb.xlsx --json")]
    Agents {
        /// Contract/consultation export (repeatable)
        #[arg(long, required = true, value_name = "FILE")]
        contract: Vec<PathBuf>,

        /// Call-time export (repeatable)
        #[arg(long, value_name = "FILE")]
        calls: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Daily and month-to-date sales by product and channel
    #[command(after_help = "\
Examples:
  sdash daily --sales approved.xlsx
  sdash daily --sales approved.xlsx --installation installed.xlsx --date 2024-03-08 -o report.xlsx")]
    Daily {
        /// Approval/sales export (repeatable)
        #[arg(long, required = true, value_name = "FILE")]
        sales: Vec<PathBuf>,

        /// Installation export (repeatable)
        #[arg(long, value_name = "FILE")]
        installation: Vec<PathBuf>,

        /// Report date (YYYY-MM-DD); default is the latest business day in the data
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Consultation status counts per campaign round
    Campaign {
        /// Contract/consultation export (repeatable)
        #[arg(long, required = true, value_name = "FILE")]
        contract: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Promotion ranking under the configured promotion rules
    Promotion {
        /// Approval/sales export (repeatable)
        #[arg(long, required = true, value_name = "FILE")]
        sales: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// New-lead (신규) counts per agent and campaign kind
    #[command(name = "new-db")]
    NewDb {
        /// Contract/consultation export (repeatable)
        #[arg(long, required = true, value_name = "FILE")]
        contract: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Load settings and every referenced file, reporting problems
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Print the default settings file path
    Path,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Agents { contract, calls, output } => {
            let inputs = [(InputKind::Contract, contract), (InputKind::CallTime, calls)];
            cmd_analyze(config, Variant::AgentPerformance, &inputs, None, &output)
        }
        Commands::Daily { sales, installation, date, output } => {
            let inputs = [(InputKind::Sales, sales), (InputKind::Installation, installation)];
            cmd_analyze(config, Variant::DailySales, &inputs, date, &output)
        }
        Commands::Campaign { contract, output } => {
            cmd_analyze(config, Variant::CampaignStatus, &[(InputKind::Contract, contract)], None, &output)
        }
        Commands::Promotion { sales, output } => {
            cmd_analyze(config, Variant::Promotion, &[(InputKind::Sales, sales)], None, &output)
        }
        Commands::NewDb { contract, output } => {
            cmd_analyze(config, Variant::NewDb, &[(InputKind::Contract, contract)], None, &output)
        }
        Commands::Config(ConfigCommands::Check { json }) => cmd_config_check(config, json),
        Commands::Config(ConfigCommands::Path) => cmd_config_path(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Map a pipeline error to its exit code, with a hint where the fix is
    /// usually obvious.
    pub fn pipeline(err: PipelineError) -> Self {
        use salesdash_analytics::ErrorKind;

        let hint = match &err.kind {
            ErrorKind::MissingRequiredColumn { kind, .. } => Some(format!(
                "check header_rows.{kind} in the settings; the header may not be on that row"
            )),
            ErrorKind::ReadFailure { .. } => Some("save the export as .xlsx and retry".to_string()),
            ErrorKind::ConfigInvalid(_) => Some("run `sdash config check` for details".to_string()),
            ErrorKind::MissingInput(_) => None,
        };
        Self { code: pipeline_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// analyses
// ============================================================================

fn read_inputs(groups: &[(InputKind, Vec<PathBuf>)]) -> Result<Vec<InputFile>, CliError> {
    let mut inputs = Vec::new();
    for (kind, paths) in groups {
        for path in paths {
            let file = InputFile::from_path(*kind, path)
                .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?;
            inputs.push(file);
        }
    }
    Ok(inputs)
}

fn cmd_analyze(
    config: Option<&Path>,
    variant: Variant,
    groups: &[(InputKind, Vec<PathBuf>)],
    date: Option<NaiveDate>,
    output: &OutputArgs,
) -> Result<(), CliError> {
    let mut pipeline = Pipeline::load(config).map_err(CliError::pipeline)?;
    let mut request = AnalysisRequest::new(variant, read_inputs(groups)?);
    request.date = date;

    let report = pipeline.run(&request).map_err(CliError::pipeline)?;

    if let Some(path) = &output.out {
        let summary = salesdash_io::writer::save_plan(&report.plan, path).map_err(|e| CliError {
            code: EXIT_WRITE,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        log::info!("wrote {} sheet(s) to {}", summary.sheets_written, path.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if output.json {
        let workbook = output.out.as_ref().map(|p| p.display().to_string());
        let doc = render::report_json(&report, workbook.as_deref());
        writeln!(out, "{doc}").map_err(|e| CliError::io(e.to_string()))?;
        return Ok(());
    }

    for table in &report.tables {
        writeln!(out, "{}", render::table_text(table)).map_err(|e| CliError::io(e.to_string()))?;
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(path) = &output.out {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

fn cmd_config_check(config: Option<&Path>, json: bool) -> Result<(), CliError> {
    let settings = match config {
        Some(p) => PipelineSettings::load(p),
        None => PipelineSettings::load_default(),
    }
    .map_err(|e| CliError { code: EXIT_CONFIG, message: e.to_string(), hint: None })?;

    let loaded = LoadedConfig::load(&settings);
    let problems: Vec<String> = loaded.problems.iter().map(|p| p.to_string()).collect();
    let crm = loaded.roster.crm.len();
    let online = loaded.roster.online.len();

    if json {
        let doc = serde_json::json!({
            "ok": problems.is_empty(),
            "roster": { "crm": crm, "online": online },
            "excluded_managers": loaded.excluded_managers.len(),
            "promotion_mode": loaded.promotion.analysis_mode,
            "problems": problems,
        });
        println!("{doc}");
    } else {
        println!("roster:            {crm} CRM, {online} online");
        println!("excluded managers: {}", loaded.excluded_managers.len());
        println!("vat rate:          {}", settings.vat_rate);
        println!("raw row cap:       {}", settings.raw_row_cap);
        for problem in &problems {
            println!("problem: {problem}");
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CliError {
            code: EXIT_CONFIG,
            message: format!("{} configuration file(s) could not be used", problems.len()),
            hint: None,
        }
        .with_hint("affected files fall back to defaults during analysis"))
    }
}

fn cmd_config_path() -> Result<(), CliError> {
    println!("{}", PipelineSettings::config_path().display());
    Ok(())
}
