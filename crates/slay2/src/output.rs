use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// Result of one `bench` run.
#[derive(Serialize)]
pub struct BenchReport {
    /// Number of daisy-chained channels.
    pub channels: u8,
    /// Bytes injected on the first channel.
    pub payload_bytes: usize,
    /// Total bytes carried across all hops.
    pub relayed_bytes: usize,
    /// Simulated wall time for the whole chain.
    pub elapsed_ms: u32,
    /// Kilobits of relayed payload per simulated second.
    pub throughput_kbps: f64,
    /// Retransmissions still outstanding at the end (0 in a clean run).
    pub nack_count: u32,
}

pub fn print_bench_report(report: &BenchReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Text => {
            println!("channels:        {}", report.channels);
            println!("payload:         {} bytes", report.payload_bytes);
            println!("relayed:         {} bytes", report.relayed_bytes);
            println!("elapsed:         {} ms (simulated)", report.elapsed_ms);
            println!("throughput:      {:.1} kbps", report.throughput_kbps);
            println!("nack count:      {}", report.nack_count);
        }
    }
}

#[derive(Serialize)]
struct PayloadOutput<'a> {
    channel: u8,
    size: usize,
    payload: &'a str,
}

/// Print one received payload, UTF-8 text inline, binary as a summary.
pub fn print_payload(channel: u8, payload: &[u8], format: OutputFormat) {
    let preview = match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    };
    match format {
        OutputFormat::Json => {
            let out = PayloadOutput {
                channel,
                size: payload.len(),
                payload: &preview,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Text => {
            println!("[ch {channel}] {} bytes: {preview}", payload.len());
        }
    }
    let _ = std::io::stdout().flush();
}
