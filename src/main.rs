//! mule-detector CLI
//!
//! Run the detection pipeline from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a transaction batch and print a summary
//! mule-detector analyze --input transactions.csv
//!
//! # Emit the downloadable JSON report
//! mule-detector analyze --input transactions.csv --format json
//!
//! # Write the report to a file instead of stdout
//! mule-detector analyze --input transactions.csv --output report.json
//!
//! # Generate a synthetic dataset for testing
//! mule-detector generate --transactions 10000 --output dataset.csv
//! ```

use mule_detector::engine::analyze;
use mule_detector::report::Report;
use mule_detector::simulation::dataset::{generate_dataset, DatasetConfig};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"mule-detector — offline graph-based money-muling detection

USAGE:
    mule-detector <COMMAND> [OPTIONS]

COMMANDS:
    analyze     Run the detection pipeline on a transaction CSV
    generate    Generate a synthetic transaction dataset (for testing)
    help        Show this message

OPTIONS (analyze):
    --input <FILE>      Path to the transactions CSV (required)
    --format <FORMAT>   Output format: text (default) or json
    --output <FILE>     Write the downloadable JSON report to a file

OPTIONS (generate):
    --transactions <N>  Number of transactions (default: 10000)
    --accounts <N>      Size of the account pool (default: 5000)
    --seed <N>          RNG seed (default: 42)
    --output <FILE>     Write CSV to file instead of stdout
    --truth <FILE>      Also write the ground-truth answer key as JSON

EXAMPLES:
    mule-detector analyze --input transactions.csv
    mule-detector analyze --input transactions.csv --format json
    mule-detector generate --transactions 5000 --output dataset.csv --truth key.json"#
    );
}

fn cmd_analyze(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let report = analyze(&path).unwrap_or_else(|e| {
        eprintln!("Error analyzing '{}': {}", path, e);
        process::exit(1);
    });

    if let Some(output) = output_path {
        let json = serde_json::to_string_pretty(&report.download_view()).unwrap_or_default();
        fs::write(&output, json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", output, e);
            process::exit(1);
        });
        eprintln!("Report written to {}", output);
    }

    if format == "json" {
        match serde_json::to_string_pretty(&report.download_view()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_text_report(&report);
    }
}

fn print_text_report(report: &Report) {
    println!("=== Analysis Summary ===");
    println!(
        "Accounts analyzed:  {}",
        report.summary.total_accounts_analyzed
    );
    println!(
        "Suspicious flagged: {}",
        report.summary.suspicious_accounts_flagged
    );
    println!(
        "Fraud rings found:  {}",
        report.summary.fraud_rings_detected
    );
    println!(
        "Processing time:    {}s",
        report.summary.processing_time_seconds
    );

    if !report.suspicious_accounts.is_empty() {
        println!("\nTop suspicious accounts:");
        for account in report.suspicious_accounts.iter().take(20) {
            let patterns: Vec<String> = account
                .detected_patterns
                .iter()
                .map(|p| p.to_string())
                .collect();
            println!(
                "  {:<12} score {:>6.2}  ring {:<10}  [{}]",
                account.account_id,
                account.suspicion_score,
                account.ring_id,
                patterns.join(", ")
            );
        }
    }

    if !report.fraud_rings.is_empty() {
        println!("\nFraud rings:");
        for ring in &report.fraud_rings {
            let members: Vec<String> =
                ring.member_accounts.iter().map(|m| m.to_string()).collect();
            println!(
                "  {:<10} {:<11} risk {:>6.2}  {}",
                ring.ring_id,
                ring.pattern_type,
                ring.risk_score,
                members.join(" → ")
            );
        }
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = DatasetConfig::default();
    let mut output_path: Option<String> = None;
    let mut truth_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--transactions" => {
                i += 1;
                config.transaction_count =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--transactions requires a number");
                        process::exit(1);
                    });
            }
            "--accounts" => {
                i += 1;
                config.account_pool =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--accounts requires a number");
                        process::exit(1);
                    });
            }
            "--seed" => {
                i += 1;
                config.seed = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a number");
                    process::exit(1);
                });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            "--truth" => {
                i += 1;
                truth_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--truth requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let (table, truth) = generate_dataset(&config);

    let mut csv = String::from("transaction_id,sender_id,receiver_id,amount,timestamp\n");
    for txn in table.rows() {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            txn.id(),
            txn.sender(),
            txn.receiver(),
            txn.amount(),
            txn.timestamp().format("%Y-%m-%d %H:%M:%S")
        ));
    }

    if let Some(path) = output_path {
        fs::write(&path, &csv).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} transactions across {} accounts → {}",
            table.len(),
            config.account_pool,
            path
        );
    } else {
        print!("{}", csv);
    }

    if let Some(path) = truth_path {
        let json = serde_json::to_string_pretty(&truth).unwrap_or_default();
        fs::write(&path, json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Ground truth written to {}", path);
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
        "analyze" => cmd_analyze(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
