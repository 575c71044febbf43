//! Emuterm - Serial terminal with pluggable emulations
//!
//! Headless command-line front end: list ports, list emulations, or open a
//! connection and stream received bytes to stdout until interrupted.

use anyhow::Context;
use clap::{Parser, Subcommand};
use emuterm_core::{
    AppConfig, EmulationRegistry, HeadlessUi, Mode, SerialDriver, SerialFlowControl,
    SerialParity, SerialSettings, Session, SessionMessage,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Emuterm CLI
#[derive(Parser, Debug)]
#[command(
    name = "emuterm",
    version,
    about = "Serial terminal with pluggable emulations",
    long_about = None
)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// List registered emulations (built-in plus discovered plugins)
    ListEmulations {
        /// Plugin directory to scan instead of the default
        #[arg(long)]
        plugin_dir: Option<PathBuf>,
    },

    /// Connect to a serial port and stream received data to stdout
    Connect {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        port: String,

        /// Baud rate
        #[arg(short, long, default_value = "115200")]
        baud: u32,

        /// Data bits (5-8)
        #[arg(long, default_value = "8")]
        data_bits: u8,

        /// Parity (none, odd, even)
        #[arg(long, default_value = "none")]
        parity: String,

        /// Stop bits (1, 2)
        #[arg(long, default_value = "1")]
        stop_bits: u8,

        /// Flow control (none, hw, sw)
        #[arg(long, default_value = "none")]
        flow: String,

        /// Emulation to activate, by name
        #[arg(short, long)]
        emulation: Option<String>,

        /// Send a command after connecting
        #[arg(short = 'c', long)]
        command: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        AppConfig::default()
    });

    match cli.command {
        Commands::ListPorts => list_ports(&config),
        Commands::ListEmulations { plugin_dir } => list_emulations(&config, plugin_dir),
        Commands::Connect {
            port,
            baud,
            data_bits,
            parity,
            stop_bits,
            flow,
            emulation,
            command,
        } => {
            let settings = SerialSettings::new(baud)
                .data_bits(data_bits)
                .stop_bits(stop_bits)
                .parity(parity.parse::<SerialParity>().unwrap_or_default())
                .flow_control(flow.parse::<SerialFlowControl>().unwrap_or_default());
            connect(&config, &port, settings, emulation, command)
        }
    }
}

fn plugin_dir(config: &AppConfig, override_dir: Option<PathBuf>) -> Option<PathBuf> {
    override_dir
        .or_else(|| config.plugin_dir.clone())
        .or_else(EmulationRegistry::default_plugin_dir)
}

fn list_ports(config: &AppConfig) -> anyhow::Result<()> {
    use emuterm_core::PortDriver;

    let driver = SerialDriver::new(config.serial.clone());
    let ports = driver.list_ports().context("port enumeration failed")?;

    if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for port in ports {
            println!("{port}");
        }
    }
    Ok(())
}

fn list_emulations(config: &AppConfig, override_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut registry = EmulationRegistry::new();
    if let Some(dir) = plugin_dir(config, override_dir) {
        registry.discover(&dir);
    }

    for (index, name) in registry.names().iter().enumerate() {
        let marker = if index == registry.active_index() {
            "*"
        } else {
            " "
        };
        println!("{marker} [{index}] {name}");
    }
    Ok(())
}

fn connect(
    config: &AppConfig,
    port: &str,
    settings: SerialSettings,
    emulation: Option<String>,
    command: Option<String>,
) -> anyhow::Result<()> {
    let driver = SerialDriver::new(settings);
    let mut session = Session::new(Box::new(driver), Arc::new(HeadlessUi));

    if let Some(dir) = plugin_dir(config, None) {
        session.discover_plugins(&dir);
    }

    if let Some(wanted) = emulation {
        let index = session
            .emulations()
            .names()
            .iter()
            .position(|n| n.eq_ignore_ascii_case(&wanted))
            .with_context(|| format!("no emulation named {wanted:?}"))?;
        session.select_emulation(index);
    }

    session.enter_command();

    let rx = session.messages();
    session.enter_connect(port);
    if session.mode() != Mode::Connect {
        // The failure was already shown; only the exit status is left to us.
        anyhow::bail!("could not connect to {port}");
    }

    if let Some(cmd) = command {
        session.send(format!("{cmd}\r\n").as_bytes())?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("failed to install interrupt handler")?;
    }

    tracing::info!(port, "connected, streaming (press Ctrl-C to disconnect)");

    let mut stdout = std::io::stdout();
    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(SessionMessage::RxData(data)) => {
                stdout.write_all(&data)?;
                stdout.flush()?;
            }
            Ok(SessionMessage::TxData(_)) => {}
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    session.enter_command();
    Ok(())
}
