//! Beamcast command-line host.
//!
//! A batch-mode stand-in for the real visual channel: `send` encodes a file
//! into a packet-stream file (each packet prefixed by a u32 BE length), and
//! `recv` replays such a stream into the decoder and writes the verified
//! reconstruction. Piping one into the other, optionally with simulated
//! loss, exercises the full codec over the same opaque-packet contract a
//! screen-and-camera deployment uses.
//!
//! # Usage
//!
//! ```bash
//! # Encode with 1.5x overshoot and 20% simulated frame loss
//! beamcast send report.pdf --out stream.bcast --loss 0.2
//!
//! # Reconstruct and verify
//! beamcast recv stream.bcast --out ./received
//! ```

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use beamcast_core::{Decoder, Encoder, Receive, SymbolSchedule};
use beamcast_harness::{ChannelConfig, LossyChannel};
use beamcast_proto::ChannelHint;

/// Beamcast one-way file transfer
#[derive(Parser, Debug)]
#[command(name = "beamcast")]
#[command(about = "One-way file transfer over lossy symbol streams")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a file into a packet-stream file
    Send {
        /// File to transfer
        file: PathBuf,

        /// Packet-stream output path
        #[arg(short, long)]
        out: PathBuf,

        /// Payload block size in bytes
        #[arg(long, default_value = "200")]
        block_size: u16,

        /// Total frames emitted, as a multiple of the intermediate count
        #[arg(long, default_value = "1.5")]
        overshoot: f64,

        /// Frames between metadata retransmissions (0 = only frame zero)
        #[arg(long, default_value = "10")]
        metadata_interval: u32,

        /// Simulated frame-loss rate applied to the written stream
        #[arg(long, default_value = "0.0")]
        loss: f64,

        /// Seed for the simulated loss channel
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Decode a packet-stream file and reconstruct the original
    Recv {
        /// Packet-stream input path
        stream: PathBuf,

        /// Directory the reconstructed file is written into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match args.command {
        Command::Send { file, out, block_size, overshoot, metadata_interval, loss, seed } => {
            send(&file, &out, block_size, overshoot, metadata_interval, loss, seed)
        },
        Command::Recv { stream, out } => recv(&stream, &out),
    }
}

fn send(
    file: &Path,
    out: &Path,
    block_size: u16,
    overshoot: f64,
    metadata_interval: u32,
    loss: f64,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(file)?;
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    let filename = file.file_name().and_then(|n| n.to_str()).unwrap_or("payload.bin");

    let encoder =
        Encoder::new(&bytes, filename, guess_mime(file), digest, block_size, ChannelHint::Mono)?;

    tracing::info!(
        session_id = format_args!("{:#010x}", encoder.session_id()),
        k = encoder.k(),
        k_prime = encoder.k_prime(),
        block_size,
        "staged {filename} ({} bytes)",
        bytes.len()
    );

    let total_frames = (overshoot * f64::from(encoder.k_prime())).ceil().max(1.0) as usize;
    let schedule =
        SymbolSchedule::endless(encoder.k_prime()).with_metadata_interval(metadata_interval);
    let frames: Vec<Vec<u8>> =
        schedule.take(total_frames).map(|id| encoder.emit(id).to_vec()).collect();

    let delivered = if loss > 0.0 {
        let mut channel = LossyChannel::new(
            ChannelConfig { loss_rate: loss, duplicate_rate: 0.0, shuffle: false },
            seed,
        );
        channel.transmit(frames)
    } else {
        frames
    };

    let mut writer = io::BufWriter::new(fs::File::create(out)?);
    for frame in &delivered {
        writer.write_all(&(frame.len() as u32).to_be_bytes())?;
        writer.write_all(frame)?;
    }
    writer.flush()?;

    tracing::info!(
        emitted = total_frames,
        written = delivered.len(),
        "packet stream written to {}",
        out.display()
    );
    Ok(())
}

fn recv(stream: &Path, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(stream)?;
    let mut decoder = Decoder::new();

    let mut cursor = 0usize;
    let mut frames = 0usize;
    while cursor + 4 <= data.len() {
        let len = u32::from_be_bytes(data[cursor..cursor + 4].try_into()?) as usize;
        cursor += 4;
        let end = cursor
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or("packet stream is truncated mid-frame")?;

        let frame = &data[cursor..end];
        cursor = end;
        frames += 1;

        if decoder.receive(frame) == Receive::NewSession {
            tracing::info!("sender restarted; rebinding to the new session");
            decoder.reset();
            decoder.receive(frame);
        }
    }

    let stats = decoder.stats();
    tracing::info!(
        frames,
        unique = decoder.unique_symbol_count(),
        duplicates = stats.duplicates,
        rejected = stats.parse_failures,
        "stream replayed"
    );

    if !decoder.is_complete() {
        return Err(format!(
            "incomplete transfer: {:.1}% of source blocks after {frames} frames",
            decoder.progress() * 100.0
        )
        .into());
    }
    if !decoder.verify() {
        return Err("digest mismatch; reconstruction discarded".into());
    }

    let metadata = decoder.metadata().ok_or("no metadata in stream")?;
    let name = Path::new(&metadata.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("payload.bin");

    fs::create_dir_all(out)?;
    let path = out.join(name);
    fs::write(&path, decoder.reconstruct()?)?;

    tracing::info!(
        bytes = metadata.file_size,
        mime = %metadata.mime,
        "transfer verified; wrote {}",
        path.display()
    );
    Ok(())
}

/// Best-effort MIME guess from the file extension.
fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("txt" | "md" | "log") => "text/plain",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        Some("gz" | "tgz") => "application/gzip",
        Some("html" | "htm") => "text/html",
        _ => "application/octet-stream",
    }
}
