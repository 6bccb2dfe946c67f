//! Aegis CLI - run red-team payload suites against a policy preset, or
//! scan a single message, from the command line.

mod suites;

use std::path::PathBuf;

use clap::Parser;

use aegis_core::Policy;
use aegis_scanner::InputScanner;

#[derive(Parser)]
#[command(name = "aegis")]
#[command(about = "Aegis - defense-in-depth against prompt injection and LLM abuse")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run built-in red-team payload suites against a policy and report the detection rate.
    Test {
        /// Policy preset: strict, balanced, permissive, customer-support, code-assistant, paranoid.
        #[arg(short, long, default_value = "balanced")]
        policy: String,
        /// Comma-separated suite names to run. Defaults to all built-in suites.
        #[arg(long, value_delimiter = ',')]
        suites: Option<Vec<String>>,
        /// Emit machine-readable JSON instead of a text report.
        #[arg(long)]
        json: bool,
    },
    /// Scan a single message, inline or from a file.
    Scan {
        /// Policy preset: strict, balanced, permissive, customer-support, code-assistant, paranoid.
        #[arg(short, long, default_value = "balanced")]
        policy: String,
        /// Inline message text to scan.
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Path to a file whose contents are scanned.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Emit machine-readable JSON instead of a text report.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let color = std::env::var_os("NO_COLOR").is_none();

    let exit_code = match cli.command {
        Commands::Test { policy, suites, json } => run_test(&policy, suites, json, color)?,
        Commands::Scan { policy, text, file, json } => run_scan(&policy, text, file, json, color)?,
    };

    std::process::exit(exit_code);
}

fn load_scanner(policy_name: &str) -> anyhow::Result<InputScanner> {
    let policy = Policy::preset(policy_name)?;
    Ok(InputScanner::with_config(policy.input.scanner)?)
}

fn run_test(policy_name: &str, suite_names: Option<Vec<String>>, json: bool, color: bool) -> anyhow::Result<i32> {
    let scanner = load_scanner(policy_name)?;

    let selected: Vec<&suites::Suite> = match &suite_names {
        Some(names) => names
            .iter()
            .map(|name| {
                suites::suite_by_name(name).ok_or_else(|| anyhow::anyhow!("unknown suite `{name}`"))
            })
            .collect::<anyhow::Result<_>>()?,
        None => suites::SUITES.iter().collect(),
    };

    let mut total = 0usize;
    let mut caught = 0usize;
    let mut rows = Vec::new();

    for suite in &selected {
        for payload in suite.payloads {
            total += 1;
            let result = scanner.scan_str(payload.text);
            if !result.safe {
                caught += 1;
            }
            rows.push((suite.name, payload.id, result.safe, result.score));
        }
    }

    let detection_rate = if total == 0 { 1.0 } else { caught as f64 / total as f64 };
    let passed = detection_rate >= 0.95;

    if json {
        let report = serde_json::json!({
            "policy": policy_name,
            "total": total,
            "caught": caught,
            "detection_rate": detection_rate,
            "passed": passed,
            "results": rows.iter().map(|(suite, id, safe, score)| {
                serde_json::json!({ "suite": suite, "id": id, "flagged": !safe, "score": score })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (suite, id, safe, score) in &rows {
            let marker = if *safe { paint("MISS", 33, color) } else { paint("CAUGHT", 32, color) };
            println!("[{marker}] {suite}/{id} (score {score:.2})");
        }
        println!();
        let summary = format!("{caught}/{total} caught ({:.1}% detection rate)", detection_rate * 100.0);
        if passed {
            println!("{}", paint(&summary, 32, color));
        } else {
            println!("{}", paint(&summary, 31, color));
        }
    }

    Ok(if passed { 0 } else { 1 })
}

fn run_scan(
    policy_name: &str,
    text: Option<String>,
    file: Option<PathBuf>,
    json: bool,
    color: bool,
) -> anyhow::Result<i32> {
    let content = match (text, file) {
        (Some(t), None) => t,
        (None, Some(path)) => std::fs::read_to_string(&path)?,
        (Some(_), Some(_)) => anyhow::bail!("pass only one of --text or --file"),
        (None, None) => anyhow::bail!("pass one of --text or --file"),
    };

    let scanner = load_scanner(policy_name)?;
    let result = scanner.scan_str(&content);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.safe {
        println!("{}", paint("SAFE", 32, color));
    } else {
        println!("{}", paint(&format!("BLOCKED: score {:.2}", result.score), 31, color));
        for detection in &result.detections {
            println!("  - {:?} ({:?}): {}", detection.kind, detection.severity, detection.description);
        }
    }

    Ok(if result.safe { 0 } else { 1 })
}

fn paint(text: &str, ansi_code: u8, color: bool) -> String {
    if color {
        format!("\x1b[{ansi_code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}
