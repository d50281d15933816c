//! split-ledger CLI
//!
//! Replay scripted group sessions and generate random ones.
//!
//! # Usage
//!
//! ```bash
//! # Replay a session and print balances
//! split-ledger replay --input session.json
//!
//! # Output as JSON
//! split-ledger replay --input session.json --format json
//!
//! # Suggest settlements that clear the final balances
//! split-ledger suggest --input session.json --asset native
//!
//! # Generate a random session for testing
//! split-ledger generate --participants 6 --operations 40
//! ```

use split_ledger::config::EngineConfig;
use split_ledger::core::asset::AssetId;
use split_ledger::engine::settlement::suggest_settlements;
use split_ledger::session::{ReplayReport, Session};
use split_ledger::simulation::activity::{generate_session, ActivityConfig};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"split-ledger: shared expense ledger with weighted splitting

USAGE:
    split-ledger <COMMAND> [OPTIONS]

COMMANDS:
    replay      Replay a session file and print the resulting balances
    suggest     Replay a session file and suggest settlements
    generate    Generate a random session (for testing)
    help        Show this message

OPTIONS (replay, suggest):
    --input <FILE>      Path to JSON session file
    --config <FILE>     Path to JSON engine config
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (suggest):
    --asset <ASSET>     Asset to settle (default: native)

OPTIONS (generate):
    --participants <N>  Number of participants (default: 5)
    --operations <N>    Number of operations (default: 50)
    --assets <LIST>     Comma-separated asset ids (default: native)
    --output <FILE>     Write to file instead of stdout

ENVIRONMENT:
    RUST_LOG                     Log level (e.g. info, debug)
    SPLIT_LEDGER_MAX_INVOLVED    Override max participants per expense

EXAMPLES:
    split-ledger replay --input session.json
    split-ledger replay --input session.json --format json
    split-ledger suggest --input session.json --asset USDC
    split-ledger generate --participants 4 --assets native,USDC --output test.json"#
    );
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} requires a value", flag))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    match value {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(format!("unknown format: {} (expected text or json)", other)),
    }
}

#[derive(Debug)]
struct ReplayArgs {
    input: String,
    config: Option<String>,
    format: OutputFormat,
    asset: AssetId,
}

/// Parse options for `replay`, or for `suggest` when `accepts_asset` is set.
fn parse_replay_args(args: &[String], accepts_asset: bool) -> Result<ReplayArgs, String> {
    let mut input = None;
    let mut config = None;
    let mut format = OutputFormat::Text;
    let mut asset = AssetId::Native;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input = Some(take_value(args, &mut i, "--input")?),
            "--config" => config = Some(take_value(args, &mut i, "--config")?),
            "--format" => format = parse_format(&take_value(args, &mut i, "--format")?)?,
            "--asset" if accepts_asset => {
                asset = AssetId::token(take_value(args, &mut i, "--asset")?)
            }
            other => return Err(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    Ok(ReplayArgs {
        input: input.ok_or("--input <FILE> is required")?,
        config,
        format,
        asset,
    })
}

fn load_config(path: Option<&str>) -> EngineConfig {
    let base = match path {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| fail(e)),
        None => EngineConfig::default(),
    };
    base.with_env_overrides().unwrap_or_else(|e| fail(e))
}

fn run_replay(args: &ReplayArgs) -> ReplayReport {
    let config = load_config(args.config.as_deref());
    let session = Session::from_file(&args.input).unwrap_or_else(|e| fail(e));
    session.replay(&config)
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e))
}

fn cmd_replay(args: &[String]) {
    let args = parse_replay_args(args, false).unwrap_or_else(|e| fail(e));
    let report = run_replay(&args);

    if args.format == OutputFormat::Json {
        println!("{}", to_json(&report));
    } else {
        print!("{}", report);
    }

    if !report.balanced {
        fail("ledger is not balanced");
    }
}

fn cmd_suggest(args: &[String]) {
    let args = parse_replay_args(args, true).unwrap_or_else(|e| fail(e));
    let report = run_replay(&args);
    let suggestions = suggest_settlements(&report.ledger, &args.asset);

    if args.format == OutputFormat::Json {
        println!("{}", to_json(&suggestions));
    } else if suggestions.is_empty() {
        println!("All {} balances are settled.", args.asset);
    } else {
        for (i, s) in suggestions.iter().enumerate() {
            println!(
                "  {}: {} pays {} {} to {}",
                i, s.debtor, s.amount, s.asset, s.creditor
            );
        }
        println!("\nTotal transfers: {}", suggestions.len());
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = ActivityConfig {
        max_involved: load_config(None).max_involved,
        ..ActivityConfig::default()
    };
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--participants" => {
                config.participant_count = take_value(args, &mut i, "--participants")
                    .unwrap_or_else(|e| fail(e))
                    .parse()
                    .unwrap_or_else(|_| fail("--participants requires a number"));
            }
            "--operations" => {
                config.operation_count = take_value(args, &mut i, "--operations")
                    .unwrap_or_else(|e| fail(e))
                    .parse()
                    .unwrap_or_else(|_| fail("--operations requires a number"));
            }
            "--assets" => {
                config.assets = take_value(args, &mut i, "--assets")
                    .unwrap_or_else(|e| fail(e))
                    .split(',')
                    .map(|s| AssetId::token(s.trim()))
                    .collect();
            }
            "--output" => {
                output_path = Some(take_value(args, &mut i, "--output").unwrap_or_else(|e| fail(e)))
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let session = generate_session(&config)
        .unwrap_or_else(|| fail("need at least one participant and one asset"));
    let json = to_json(&session);

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| fail(format!("writing '{}': {}", path, e)));
        eprintln!(
            "Generated {} operations across {} participants → {}",
            session.operations.len(),
            session.participants.len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "replay" => cmd_replay(rest),
        "suggest" => cmd_suggest(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
