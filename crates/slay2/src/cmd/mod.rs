use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod bench;
pub mod monitor;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the loopback daisy-chain benchmark.
    Bench(BenchArgs),
    /// Attach to a serial device and print received payloads.
    Monitor(MonitorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bench(args) => bench::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Number of channels to daisy-chain.
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u8).range(2..=8))]
    pub channels: u8,

    /// Repeat the chain this many times.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial device to open, e.g. /dev/ttyUSB0.
    pub device: PathBuf,

    /// Baud rate.
    #[arg(long, default_value = "115200")]
    pub baud: u32,

    /// Channel to listen on.
    #[arg(long, short = 'c', default_value = "0", value_parser = clap::value_parser!(u8).range(0..8))]
    pub channel: u8,

    /// Send every received payload back on the same channel.
    #[arg(long)]
    pub echo: bool,
}
