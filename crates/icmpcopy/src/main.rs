//! icmpcopy — copy files via ICMP Echo Request packets.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use icmpcopy_core::config::IcmpcopyConfig;
use icmpcopy_services::{
    receive_stream, resolve_ipv4, send_stream, RawIcmpSocket, ReceiveOptions,
};

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Usage,
    Receive { output: PathBuf },
    Send { host: String, input: PathBuf },
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    command: Command,
    config_path: Option<PathBuf>,
    chunk_size: Option<usize>,
    timeout_ms: Option<u64>,
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path: Option<PathBuf> = None;
    let mut chunk_size: Option<usize> = None;
    let mut timeout_ms: Option<u64> = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(
                    args.get(i).context("--config requires a path")?,
                ));
            }
            "--chunk-size" => {
                i += 1;
                chunk_size = Some(
                    args.get(i)
                        .context("--chunk-size requires a value")?
                        .parse::<usize>()
                        .context("--chunk-size must be a number")?,
                );
            }
            "--timeout" => {
                i += 1;
                timeout_ms = Some(
                    args.get(i)
                        .context("--timeout requires a value")?
                        .parse::<u64>()
                        .context("--timeout must be a number of milliseconds")?,
                );
            }
            "-h" | "--help" => {
                return Ok(Invocation {
                    command: Command::Usage,
                    config_path,
                    chunk_size,
                    timeout_ms,
                })
            }
            other if other.len() > 1 && other.starts_with('-') => {
                bail!("unknown option: {other}")
            }
            other => positional.push(other),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        [] => Command::Usage,
        [output] => Command::Receive {
            output: PathBuf::from(output),
        },
        [host, input] => Command::Send {
            host: host.to_string(),
            input: PathBuf::from(input),
        },
        other => bail!("unexpected arguments: {}", other.join(" ")),
    };

    Ok(Invocation {
        command,
        config_path,
        chunk_size,
        timeout_ms,
    })
}

fn print_usage() {
    println!("icmpcopy - copy files via icmp");
    println!();
    println!("Usage:");
    println!("  Receive data and place to file:");
    println!("    icmpcopy [options] <filename>");
    println!();
    println!("  Read from file and send via icmp:");
    println!("    icmpcopy [options] <address> <filename>");
    println!();
    println!("Options:");
    println!("  --config <path>      TOML settings file");
    println!("  --chunk-size <n>     Bytes per packet when sending (default: 256)");
    println!("  --timeout <ms>       Receive poll interval (default: 1000)");
    println!();
    println!("Raw sockets require root or CAP_NET_RAW. Set RUST_LOG=debug for per-packet logs.");
}

// ── Configuration ─────────────────────────────────────────────────────────────

fn load_config(invocation: &Invocation) -> Result<IcmpcopyConfig> {
    let mut config = match &invocation.config_path {
        Some(path) => IcmpcopyConfig::load_from(path)?,
        None => IcmpcopyConfig::default(),
    };
    if let Some(chunk_size) = invocation.chunk_size {
        config.transfer.chunk_size = chunk_size;
    }
    if let Some(timeout_ms) = invocation.timeout_ms {
        config.socket.recv_timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

// ── Modes ─────────────────────────────────────────────────────────────────────

fn run_receive(output: &Path, config: &IcmpcopyConfig) -> Result<()> {
    let mut socket =
        RawIcmpSocket::open(&config.socket).context("failed to open receive socket")?;

    // Unbuffered: every accepted payload reaches the file before the next
    // receive, so Ctrl-C keeps what arrived.
    let file = File::create(output)
        .with_context(|| format!("failed to create output file: {}", output.display()))?;

    let report = receive_stream(
        &mut socket,
        file,
        &ReceiveOptions::from(&config.socket),
    )
    .with_context(|| format!("receive into {} failed", output.display()))?;

    tracing::info!(
        path = %output.display(),
        bytes = report.bytes,
        data_packets = report.data_packets,
        ignored = report.ignored,
        "file received"
    );
    Ok(())
}

fn run_send(host: &str, input: &Path, config: &IcmpcopyConfig) -> Result<()> {
    let file = File::open(input)
        .with_context(|| format!("failed to open input file: {}", input.display()))?;

    let dest = resolve_ipv4(host).with_context(|| format!("failed to resolve {host}"))?;

    let mut socket =
        RawIcmpSocket::open(&config.socket).context("failed to open send socket")?;

    let report = send_stream(
        &mut socket,
        dest,
        BufReader::new(file),
        config.transfer.chunk_size,
    )
    .with_context(|| format!("send to {dest} failed"))?;

    tracing::info!(
        path = %input.display(),
        %dest,
        bytes = report.bytes,
        data_packets = report.data_packets,
        "file sent"
    );
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let invocation = match parse_args(&args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{e:#}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    match &invocation.command {
        Command::Usage => {
            print_usage();
            Ok(())
        }
        Command::Receive { output } => run_receive(output, &load_config(&invocation)?),
        Command::Send { host, input } => run_send(host, input, &load_config(&invocation)?),
    }
}
