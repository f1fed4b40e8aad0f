use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;
use std::io::{self, BufRead};
use tasktable_cli::cli::{
    Cli, build_overrides, expand_alias, scan_config_overrides, split_command_line,
};
use tasktable_cli::session::Session;
use tasktable_core::AppError;
use tasktable_core::config::{Config, load_config_with_fallback, merge_overrides};
use tasktable_core::storage::json_store;
use tracing::Level;

const LOG_ENV_VAR: &str = "TASKTABLE_LOG";

fn init_logging() {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|raw| raw.trim().parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

/// Expands aliases (including ones given via `--config-override`) and parses
/// the arguments, without the program name. Returns `None` when clap printed
/// help or version output instead.
fn parse_args(args: Vec<String>, config: &Config) -> Result<Option<Cli>, AppError> {
    let overrides =
        build_overrides(&scan_config_overrides(&args)).map_err(AppError::validation)?;
    let aliases = merge_overrides(config, &overrides).aliases;
    let args = expand_alias(args, &aliases).map_err(AppError::validation)?;

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("tasktable".to_string());
    argv.extend(args);

    match Cli::try_parse_from(argv) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print().map_err(|err| AppError::io(err.to_string()))?;
            Ok(None)
        }
        Err(err) => Err(normalize_parse_error(err)),
    }
}

fn run_line(session: &mut Session, line: &str) -> Result<(), AppError> {
    let args = split_command_line(line).map_err(AppError::validation)?;
    if args.is_empty() {
        return Ok(());
    }

    if let Some(cli) = parse_args(args, session.config())? {
        let output = session.run(cli)?;
        println!("{output}");
    }
    Ok(())
}

fn run_interactive(session: &mut Session) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        if let Err(err) = run_line(session, line) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn load_config() -> Config {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        eprintln!("WARNING: {}", err);
    }
    loaded.config
}

fn run() -> Result<(), AppError> {
    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let config = load_config();

    if args.is_empty() {
        let mut session = Session::open(json_store::store_path()?, config)?;
        return run_interactive(&mut session);
    }

    let Some(cli) = parse_args(args, &config)? else {
        return Ok(());
    };
    let mut session = Session::open(json_store::store_path()?, config)?;
    let output = session.run(cli)?;
    println!("{output}");
    Ok(())
}

fn main() {
    init_logging();

    if let Err(err) = run() {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
