//! Reproduce AFL crashes without AFL instrumentation
//!
//! Usage: cargo run --features oracle --bin repro_crash -- <crash_file>

use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <crash_file>", args[0]);
        process::exit(1);
    }
    let data = match fs::read(&args[1]) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read {}: {}", args[1], e);
            process::exit(1);
        }
    };

    eprintln!("Input: {} bytes", data.len());
    eprintln!("Hex: {}", data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" "));
    if let Some(mode) = data.first() {
        eprintln!("compact_on_read: {}", mode & 1 == 0);
    }

    lineage::fuzz::run(&data, |step, op| {
        eprintln!("Op {}: {:?}", step + 1, op);
    });

    eprintln!("\nAll checks passed!");
}
