//! Attach to a serial device and print whatever arrives on one channel.

use crate::cmd::MonitorArgs;
use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(unix)]
pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    use std::time::Duration;

    use slay2_link::Link;
    use slay2_transport::SerialPort;
    use tracing::info;

    use crate::exit::{transport_error, CliError, INTERNAL};
    use crate::output::print_payload;

    let port = SerialPort::open(&args.device, args.baud)
        .map_err(|err| transport_error("cannot open serial device", err))?;
    let mut link = Link::new(port);

    let id = link
        .open(args.channel)
        .map_err(|err| CliError::new(INTERNAL, err.to_string()))?;
    let channel = args.channel;
    let echo = args.echo;
    link.set_receiver(id, move |channels, payload| {
        print_payload(channel, payload, format);
        if echo {
            channels.send(id, payload, false);
        }
    });

    info!(device = ?args.device, baud = args.baud, channel, echo, "monitoring");
    loop {
        link.task();
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[cfg(not(unix))]
pub fn run(_args: MonitorArgs, _format: OutputFormat) -> CliResult<i32> {
    use crate::exit::{CliError, USAGE};
    Err(CliError::new(
        USAGE,
        "the serial monitor is only available on unix",
    ))
}
