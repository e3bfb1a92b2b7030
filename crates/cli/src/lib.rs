pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use applypilot_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "applypilot",
    about = "Applypilot operator CLI",
    long_about = "Operate the application decision engine: tailor resumes, resolve form \
                  questions, evaluate the submit gate, and inspect configuration.",
    after_help = "Examples:\n  applypilot tailor --job-id 4242 --title \"Backend Intern\" --company Acme\n  applypilot answer --prompt \"Are you willing to relocate?\" --kind single_choice --choices \"Yes|No\"\n  applypilot decide --all-required-answered\n  applypilot doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the config file (defaults to applypilot.toml)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Render a tailored resume artifact for one job posting")]
    Tailor {
        #[arg(long)]
        job_id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, help = "Read the job description from a file instead of --description")]
        description_file: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Resolve one application question to an answer or an escalation")]
    Answer {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "free_text", help = "free_text|single_choice|multi_choice|boolean")]
        kind: String,
        #[arg(long, default_value = "", help = "Pipe-separated choice labels, e.g. \"Yes|No\"")]
        choices: String,
        #[arg(long, default_value = "Software Engineer Intern")]
        title: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Evaluate the submit safety gate for the current config")]
    Decide {
        #[arg(long, help = "Treat every required field as answered")]
        all_required_answered: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and run per-component readiness checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let load = load_options(cli.config.clone());
    init_tracing(&load);

    let result = match cli.command {
        Command::Tailor {
            job_id,
            title,
            company,
            location,
            url,
            description,
            description_file,
            json,
        } => commands::tailor::run(
            load,
            commands::tailor::TailorArgs {
                job_id,
                title,
                company,
                location,
                url,
                description,
                description_file,
            },
            json,
        ),
        Command::Answer { prompt, kind, choices, title, company, json } => commands::answer::run(
            load,
            commands::answer::AnswerArgs { prompt, kind, choices, title, company },
            json,
        ),
        Command::Decide { all_required_answered, json } => {
            commands::decide::run(load, all_required_answered, json)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(load) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(load, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn load_options(config_path: Option<PathBuf>) -> LoadOptions {
    let require_file = config_path.is_some();
    LoadOptions { config_path, require_file, ..LoadOptions::default() }
}

/// Best effort: honor the configured level/format when the config loads,
/// stay on compact info logging otherwise. Command-level config errors are
/// reported by the commands themselves.
fn init_tracing(load: &LoadOptions) {
    let (level, format) = match AppConfig::load(load.clone()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("info".to_string(), LogFormat::Compact),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let init_result = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // A second init in the same process (tests) is harmless.
    let _ = init_result;
}
