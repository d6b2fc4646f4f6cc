use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use serde::Serialize;
use vox_sim::scenarios::{all, EditScenario};
use vox_sim::workload::run_scenario;

#[derive(Debug, Clone, Serialize)]
struct FloodResult {
    case: String,
    seed: u64,
    edits: usize,
    delivered_records: usize,
    packets: usize,
    bytes: u64,
    mean_packet_bytes: f64,
    fill_ratio: f64,
    captured: u64,
    evicted: u64,
    replayed: u64,
    send_failures: u64,
    elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
struct FloodReport {
    generated_at_unix_seconds: u64,
    results: Vec<FloodResult>,
}

fn run_case(seed: u64, scenario: EditScenario) -> Result<FloodResult, String> {
    let start = Instant::now();
    let run = run_scenario(seed, &scenario).map_err(|err| err.to_string())?;
    let elapsed = start.elapsed();
    let delivered_records = run.delivered_records().map_err(|err| err.to_string())?;
    let packets = run.packets.len();
    let mean_packet_bytes = if packets == 0 {
        0.0
    } else {
        run.stats.bytes_released as f64 / packets as f64
    };
    Ok(FloodResult {
        case: scenario.name.to_string(),
        seed,
        edits: run.queued_edits,
        delivered_records,
        packets,
        bytes: run.stats.bytes_released,
        mean_packet_bytes,
        fill_ratio: mean_packet_bytes / scenario.max_packet_size as f64,
        captured: run.stats.captured,
        evicted: run.stats.evicted,
        replayed: run.stats.replayed,
        send_failures: run.stats.send_failures,
        elapsed_ms: elapsed.as_millis(),
    })
}

fn parse_arg_u64(args: &[String], key: &str, default: u64) -> u64 {
    args.windows(2)
        .find(|w| w[0] == key)
        .and_then(|w| w[1].parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_arg_path(args: &[String], key: &str, default: &str) -> PathBuf {
    args.windows(2)
        .find(|w| w[0] == key)
        .map(|w| PathBuf::from(&w[1]))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn write_outputs(output_dir: &Path, report: &FloodReport) -> std::io::Result<()> {
    fs::create_dir_all(output_dir)?;
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    fs::write(output_dir.join("flood_report.json"), json)?;

    let mut csv = String::from(
        "case,seed,edits,delivered_records,packets,bytes,mean_packet_bytes,fill_ratio,captured,evicted,replayed,send_failures,elapsed_ms\n",
    );
    for row in &report.results {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{:.2},{:.4},{},{},{},{},{}\n",
            row.case,
            row.seed,
            row.edits,
            row.delivered_records,
            row.packets,
            row.bytes,
            row.mean_packet_bytes,
            row.fill_ratio,
            row.captured,
            row.evicted,
            row.replayed,
            row.send_failures,
            row.elapsed_ms
        ));
    }
    fs::write(output_dir.join("flood_report.csv"), csv)?;
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") {
        println!(
            "Usage: cargo run -p vox-sim --bin edit_flood -- [--seed N] [--out-dir DIR] [--quick]\n\
             --quick runs smaller edit counts for fast local checks."
        );
        return ExitCode::SUCCESS;
    }

    let seed = parse_arg_u64(&args, "--seed", 0xED17_F100);
    let out_dir = parse_arg_path(&args, "--out-dir", "target/benchmarks/vox-sim");
    let quick = has_flag(&args, "--quick");

    let mut results = Vec::new();
    for (i, scenario) in all().into_iter().enumerate() {
        let scenario = if quick { scenario.quick() } else { scenario };
        match run_case(seed ^ i as u64, scenario) {
            Ok(result) => results.push(result),
            Err(err) => {
                eprintln!("scenario {} failed: {err}", scenario.name);
                return ExitCode::FAILURE;
            }
        }
    }

    let report = FloodReport {
        generated_at_unix_seconds: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        results,
    };
    if let Err(err) = write_outputs(&out_dir, &report) {
        eprintln!("writing flood report failed: {err}");
        return ExitCode::FAILURE;
    }

    println!("Wrote flood report to {}", out_dir.display());
    for row in &report.results {
        println!(
            "- {}: {} packets, fill {:.1}%, evicted={}, delivered={}",
            row.case,
            row.packets,
            row.fill_ratio * 100.0,
            row.evicted,
            row.delivered_records
        );
    }
    ExitCode::SUCCESS
}
