//! Loopback daisy-chain benchmark.
//!
//! One engine on a self-loop nullmodem opens N channels; every channel
//! forwards what it receives to the next one, so a payload injected on
//! channel 0 crosses the link N-1 times before it arrives on the last
//! channel. Time is simulated, so the result measures protocol overhead,
//! not host speed.

use std::sync::{Arc, Mutex, PoisonError};

use slay2_link::{ChannelId, Link};
use slay2_transport::{Nullmodem, SimClock};
use tracing::{debug, info};

use crate::cmd::BenchArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_bench_report, BenchReport, OutputFormat};

const PAYLOAD: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipisici elit, \
sed eiusmod tempor incidunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquid ex ea commodi consequat. \
sed eiusmod tempor incidunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquid ex ea commodi consequat. \
sed eiusmod tempor incidunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquid ex ea commodi consequat. \
Quis aute iure reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. \
Excepteur sint obcaecat cupiditat non proident, \
sunt in culpa qui officia deserunt mollit anim id est laborum.";

/// Task cap per round; well beyond what a healthy chain needs.
const MAX_TASKS_PER_ROUND: u32 = 1_000_000;

pub fn run(args: BenchArgs, format: OutputFormat) -> CliResult<i32> {
    let clock = SimClock::new();
    let mut link = Link::new(Nullmodem::new(clock.clone()));

    let ids = open_chain(&mut link, args.channels)?;
    let sink = Arc::new(Mutex::new(Vec::<u8>::new()));

    // Channel n forwards to n+1; the last channel collects.
    for hop in 0..ids.len() - 1 {
        let next = ids[hop + 1];
        link.set_receiver(ids[hop], move |channels, payload| {
            channels.send(next, payload, false);
        });
    }
    let collected = Arc::clone(&sink);
    link.set_receiver(ids[ids.len() - 1], move |_, payload| {
        collected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(payload);
    });

    info!(
        channels = args.channels,
        payload = PAYLOAD.len(),
        repeat = args.repeat,
        "starting daisy-chain benchmark"
    );
    let start = clock.peek();
    for round in 0..args.repeat {
        sink.lock().unwrap_or_else(PoisonError::into_inner).clear();

        let sent = link.send(ids[0], PAYLOAD, false);
        if sent != PAYLOAD.len() {
            return Err(CliError::new(
                INTERNAL,
                format!("channel queue accepted only {sent} of {} bytes", PAYLOAD.len()),
            ));
        }

        let mut done = false;
        for _ in 0..MAX_TASKS_PER_ROUND {
            link.task();
            if sink.lock().unwrap_or_else(PoisonError::into_inner).len() >= PAYLOAD.len() {
                done = true;
                break;
            }
        }
        if !done {
            return Err(CliError::new(INTERNAL, "benchmark did not converge"));
        }
        let received = sink.lock().unwrap_or_else(PoisonError::into_inner);
        if received.as_slice() != PAYLOAD {
            return Err(CliError::new(INTERNAL, "relayed payload does not match"));
        }
        debug!(round, "round complete");
    }
    let elapsed_ms = clock.peek().wrapping_sub(start).max(1);

    let hops = usize::from(args.channels) - 1;
    let relayed_bytes = PAYLOAD.len() * hops * args.repeat as usize;
    let report = BenchReport {
        channels: args.channels,
        payload_bytes: PAYLOAD.len(),
        relayed_bytes,
        elapsed_ms,
        // bits per simulated millisecond == kilobits per second
        throughput_kbps: (relayed_bytes * 8) as f64 / f64::from(elapsed_ms),
        nack_count: link.nack_count(),
    };
    print_bench_report(&report, format);
    Ok(SUCCESS)
}

fn open_chain(link: &mut Link<Nullmodem>, channels: u8) -> CliResult<Vec<ChannelId>> {
    (0..channels)
        .map(|i| {
            link.open(i)
                .map_err(|err| CliError::new(INTERNAL, format!("cannot open channel {i}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_fits_one_channel_queue() {
        assert!(PAYLOAD.len() <= Link::<Nullmodem>::tx_buffer_size());
    }

    #[test]
    fn two_channel_chain_converges() {
        let args = BenchArgs {
            channels: 2,
            repeat: 1,
        };
        assert_eq!(run(args, OutputFormat::Text).unwrap(), SUCCESS);
    }

    #[test]
    fn full_chain_converges() {
        let args = BenchArgs {
            channels: 8,
            repeat: 1,
        };
        assert_eq!(run(args, OutputFormat::Json).unwrap(), SUCCESS);
    }
}
