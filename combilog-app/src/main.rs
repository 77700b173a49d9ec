// combilog-app -- CLI tool for exercising the COMBILOG driver against real
// hardware or a scripted mock transport.
//
// Usage:
//   combilog-app --port /dev/ttyUSB0 info
//   combilog-app --port /dev/ttyUSB0 --address 03 time get
//   combilog-app --port /dev/ttyUSB0 --password 12345678 time set
//   combilog-app --port /dev/ttyUSB0 logs --pointer 2 --from-start --verbose
//   combilog-app --port /dev/ttyUSB0 channel read 05
//   combilog-app --mock channel info 01
//   combilog-app --mock --password 12345678 rate set 5 60

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::RecvError};

use combilog::builder::LoggerBuilder;
use combilog::{CombilogLogger, LogData, OutputFormat};
use combilog_core::{Address, LoggerEvent, LoggerDate};
use combilog_test_harness::MockTransport;
use combilog_transport::parse_timeout;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// combilog test application -- talks to a COMBILOG logger from the command line.
#[derive(Parser)]
#[command(name = "combilog-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Bus address of the logger (two digits).
    #[arg(long, default_value = "01")]
    address: Address,

    /// Baud rate: 2400, 4800, 9600, 19200 or 38400.
    #[arg(long)]
    baud: Option<u32>,

    /// Response timeout in seconds (e.g. 1.5).
    #[arg(long, value_parser = parse_timeout_arg)]
    timeout: Option<Duration>,

    /// Authenticate with this password before running the command.
    /// Required by commands that change the logger's state.
    #[arg(long)]
    password: Option<String>,

    /// Use a scripted mock transport instead of a real serial port.
    /// Useful for verifying CLI parsing and builder wiring without hardware.
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

fn parse_timeout_arg(s: &str) -> std::result::Result<Duration, String> {
    parse_timeout(s).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
enum Command {
    /// Print device identity, site info, status and rates.
    Info,

    /// Logger clock operations.
    Time {
        #[command(subcommand)]
        action: TimeAction,
    },

    /// Download stored events.
    Logs {
        /// Read pointer to use (1 or 2).
        #[arg(long, default_value = "1")]
        pointer: String,

        /// Rewind the pointer to the oldest event first.
        #[arg(long)]
        from_start: bool,

        /// Report progress while reading.
        #[arg(long)]
        verbose: bool,
    },

    /// Channel operations.
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },

    /// Measuring rate operations.
    Rate {
        #[command(subcommand)]
        action: RateAction,
    },
}

#[derive(Subcommand)]
enum TimeAction {
    /// Read the logger clock.
    Get,
    /// Set the logger clock (default: host local time).
    Set {
        /// Timestamp as YYMMDDHHMMSS.
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum ChannelAction {
    /// Read the current value of a channel.
    Read {
        /// Channel number (e.g. 05).
        nr: String,
    },
    /// Print the configuration of a channel.
    Info {
        /// Channel number (e.g. 01).
        nr: String,
    },
}

#[derive(Subcommand)]
enum RateAction {
    /// Set measuring rate and averaging interval in seconds.
    Set { measuring: u32, averaging: u32 },
}

// ---------------------------------------------------------------------------
// Mock transport script
// ---------------------------------------------------------------------------

/// Build a mock transport that answers exactly the telegrams `cli` will send.
fn demo_transport(cli: &Cli) -> MockTransport {
    let addr = cli.address.as_str();
    let tg = |body: &str| format!("${addr}{body}\r").into_bytes();
    let mut mock = MockTransport::new();

    if let Some(pw) = &cli.password {
        mock.expect_ack(&tg(&format!("P{pw}")));
    }

    match &cli.command {
        Command::Info => {
            mock.expect(&tg("V"), b"$FriedrichsCOMBI1022V2.0 2.26\r");
            mock.expect(&tg("S"), b"$DachSoni            010000502\r");
            mock.expect(&tg("Z"), b"$000000000000\r");
            mock.expect(&tg("X"), b"$0500060\r");
        }
        Command::Time { action } => match action {
            TimeAction::Get => mock.expect(&tg("H"), b"$200904172000\r"),
            TimeAction::Set { date } => {
                mock.expect_ack(&tg(&format!("G{}", date.as_deref().unwrap_or_default())));
            }
        },
        Command::Logs {
            pointer,
            from_start,
            ..
        } => {
            let lower = pointer.trim() == "2";
            let letter = |c: char| {
                if lower {
                    c.to_ascii_lowercase()
                } else {
                    c
                }
            };
            if *from_start {
                mock.expect_ack(&tg(&letter('C').to_string()));
            }
            mock.expect(&tg(&letter('N').to_string()), b"$2\r");
            mock.expect(
                &tg(&letter('E').to_string()),
                b"$1200904172000;42493CD3;00000000;\r",
            );
            mock.expect(
                &tg(&letter('E').to_string()),
                b"$1200904172010;42493CD3;3F800000;\r",
            );
        }
        Command::Channel { action } => match action {
            ChannelAction::Read { nr } => mock.expect(&tg(&format!("R{nr}")), b"$2.6\r"),
            ChannelAction::Info { nr } => mock.expect(
                &tg(&format!("B{nr}")),
                b"$01Lufttemp Mittel     030401\xB0C    0100\r",
            ),
        },
        Command::Rate { action } => match action {
            RateAction::Set {
                measuring,
                averaging,
            } => mock.expect_ack(&tg(&format!("Y{measuring:02}{averaging:05}"))),
        },
    }

    mock
}

// ---------------------------------------------------------------------------
// Logger creation
// ---------------------------------------------------------------------------

async fn create_logger(cli: &Cli) -> Result<CombilogLogger> {
    let mut builder = LoggerBuilder::new().address(cli.address.clone());
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }
    if let Some(timeout) = cli.timeout {
        builder = builder.command_timeout(timeout);
    }

    let logger = if cli.mock {
        let logger = builder
            .build_with_transport(Box::new(demo_transport(cli)))
            .await
            .context("failed to build logger with mock transport")?;
        println!("Connected (mock transport) -- logger {}", cli.address);
        logger
    } else {
        let port = cli
            .port
            .as_deref()
            .context("--port is required when not using --mock")?;
        let logger = builder
            .serial_port(port)
            .build()
            .await
            .with_context(|| format!("failed to open logger on {port}"))?;
        println!("Connected to {port} -- logger {}", cli.address);
        logger
    };

    if let Some(pw) = &cli.password {
        if !logger.authenticate(pw).await? {
            bail!("authentication failed: the logger rejected the password");
        }
    }

    Ok(logger)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_info(logger: &CombilogLogger) -> Result<()> {
    let id = logger.device_id().await?;
    let info = logger.device_info().await?;
    let status = logger.device_status().await?;
    let rate = logger.get_rate().await?;

    println!("Device");
    println!("  Vendor:         {}", id.vendor);
    println!("  Model:          {}", id.model);
    println!("  Hardware:       {}", id.hardware_revision);
    println!("  Software:       {}", id.software_revision);
    println!();
    println!("Site");
    println!("  Location:       {}", info.location);
    println!("  Serial number:  {}", info.serial_number);
    println!("  Channels:       {}", info.channel_count);
    println!();
    println!("Status");
    println!("  Channels:       {}", status.channel_status);
    println!("  Modules:        {}", status.module_status);
    println!();
    println!("Rates");
    println!("  Measuring:      {} s", rate.measuring_rate);
    println!("  Averaging:      {} s", rate.averaging_interval);
    Ok(())
}

async fn cmd_time_get(logger: &CombilogLogger) -> Result<()> {
    let now = logger.read_datetime().await?;
    println!("Logger clock: {now}");
    Ok(())
}

async fn cmd_time_set(logger: &CombilogLogger, date: Option<&str>) -> Result<()> {
    match date {
        Some(date) => logger.set_datetime(date).await?,
        None => logger.set_datetime_now().await?,
    }
    println!("Logger clock set.");
    Ok(())
}

/// Print download progress until the final record is reported or the
/// channel closes. Returns the number of progress lines printed.
async fn print_progress(mut event_rx: broadcast::Receiver<LoggerEvent>) -> u32 {
    let mut printed = 0;
    loop {
        match event_rx.recv().await {
            Ok(LoggerEvent::ReadProgress { current, total, .. }) => {
                eprintln!("[progress] {current}/{total}");
                printed += 1;
                if current >= total {
                    break;
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => {
                eprintln!("[warning] missed {n} events (consumer too slow)");
            }
            Err(RecvError::Closed) => break,
        }
    }
    printed
}

async fn cmd_logs(
    logger: &mut CombilogLogger,
    pointer: &str,
    from_start: bool,
    verbose: bool,
) -> Result<()> {
    if from_start {
        logger.pointer_to_start(pointer).await?;
    }

    let progress = verbose.then(|| tokio::spawn(print_progress(logger.subscribe())));

    let result = logger
        .read_logger(pointer, verbose, OutputFormat::List)
        .await;

    if let Some(handle) = progress {
        // After a non-empty read the final progress event is already queued.
        match &result {
            Ok(data) if !data.is_empty() => {
                handle.await.ok();
            }
            _ => handle.abort(),
        }
    }

    let data = result?;
    let LogData::List(records) = data else {
        bail!("expected a list of records");
    };
    println!("{} event(s)", records.len());
    for record in &records {
        let values = record
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("  ");
        println!("  {}  [{}]  {values}", record.timestamp, record.name);
    }
    Ok(())
}

async fn cmd_channel_read(logger: &CombilogLogger, nr: &str) -> Result<()> {
    let value = logger.read_channel(nr).await?;
    println!("Channel {nr}: {value}");
    Ok(())
}

async fn cmd_channel_info(logger: &CombilogLogger, nr: &str) -> Result<()> {
    let info = logger.channel_info(nr).await?;
    let host_input = match info.host_input.is_possible() {
        Some(true) => "possible",
        Some(false) => "not possible",
        None => "unknown",
    };

    println!("Channel {nr}");
    println!("  Notation:       {}", info.notation);
    println!("  Type:           {}", info.channel_type);
    println!("  Data format:    {}", info.data_format);
    println!("  Field length:   {}", info.field_length);
    println!("  Decimals:       {}", info.decimals);
    println!("  Unit:           {}", info.unit);
    println!("  Host input:     {host_input}");
    println!("  Calculation:    {}", info.calculation);
    Ok(())
}

async fn cmd_rate_set(logger: &CombilogLogger, measuring: u32, averaging: u32) -> Result<()> {
    logger.set_rate(measuring, averaging).await?;
    println!("Rates set: measuring {measuring} s, averaging {averaging} s");
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!("combilog-app v{}", env!("CARGO_PKG_VERSION"));

    let mut cli = Cli::parse();

    if cli.mock && cli.port.is_some() {
        bail!("--port and --mock are mutually exclusive");
    }

    // The mock script must know the exact timestamp that will be sent.
    if cli.mock {
        if let Command::Time {
            action: TimeAction::Set { date: date @ None },
        } = &mut cli.command
        {
            *date = Some(chrono::Local::now().to_logger_date()?);
        }
    }

    let mut logger = create_logger(&cli).await?;

    let result = match &cli.command {
        Command::Info => cmd_info(&logger).await,
        Command::Time { action } => match action {
            TimeAction::Get => cmd_time_get(&logger).await,
            TimeAction::Set { date } => cmd_time_set(&logger, date.as_deref()).await,
        },
        Command::Logs {
            pointer,
            from_start,
            verbose,
        } => cmd_logs(&mut logger, pointer, *from_start, *verbose).await,
        Command::Channel { action } => match action {
            ChannelAction::Read { nr } => cmd_channel_read(&logger, nr).await,
            ChannelAction::Info { nr } => cmd_channel_info(&logger, nr).await,
        },
        Command::Rate { action } => match action {
            RateAction::Set {
                measuring,
                averaging,
            } => cmd_rate_set(&logger, *measuring, *averaging).await,
        },
    };

    logger.close().await.ok();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use combilog_core::Pointer;

    fn progress(current: u32, total: u32) -> LoggerEvent {
        LoggerEvent::ReadProgress {
            pointer: Pointer::One,
            current,
            total,
        }
    }

    #[tokio::test]
    async fn print_progress_drains_queued_events() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(progress(1, 2)).unwrap();
        tx.send(LoggerEvent::PointerMoved {
            pointer: Pointer::One,
        })
        .unwrap();
        tx.send(progress(2, 2)).unwrap();

        // Sender still alive: the printer must stop on the final record.
        let printed = tokio::spawn(print_progress(rx)).await.unwrap();
        assert_eq!(printed, 2);
        drop(tx);
    }

    #[tokio::test]
    async fn print_progress_stops_when_channel_closes() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(progress(1, 3)).unwrap();
        drop(tx);
        assert_eq!(print_progress(rx).await, 1);
    }
}
