// rdpdsp Check Tool
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use rdpdsp::core::format::AudioFormat;
use rdpdsp::core::format::well_known::{FORMAT_TAG_ALAW, FORMAT_TAG_MULAW};

mod check;

use check::{CheckOptions, CheckReport, run_check, sine_sweep};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Codec {
    Pcm,
    Ima,
    Ms,
    Alaw,
    Mulaw,
}

/// Round-trip PCM through an rdpdsp encoder and decoder and report the deviation.
#[derive(Parser, Debug)]
#[command(name = "rdpdsp Check", version, about, long_about = None)]
struct Args {
    /// The wire format to round-trip through
    #[arg(long, value_enum, default_value_t = Codec::Ima)]
    codec: Codec,

    /// Raw 16-bit little-endian PCM input. A sine sweep is generated if not set
    #[arg(long)]
    input: Option<PathBuf>,

    /// Number of channels of the input
    #[arg(long, default_value_t = 2)]
    channels: u16,

    /// Sample rate of the input
    #[arg(long, default_value_t = 22050)]
    rate: u32,

    /// Sample rate of the wire format. Defaults to the input rate
    #[arg(long)]
    target_rate: Option<u32>,

    /// Block alignment of ADPCM wire formats. Defaults to 512 bytes per channel
    #[arg(long)]
    block_align: Option<u16>,

    /// Number of PCM frames passed to each encode call, rounded down to a multiple of 8
    #[arg(long, default_value_t = 1024)]
    packet_frames: usize,

    /// Number of frames of sine sweep to generate
    #[arg(long, default_value_t = 88200)]
    frames: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

enum CheckError {
    Io(std::io::Error),
    Dsp(rdpdsp::core::errors::Error),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Io(err) => write!(f, "io error: {}", err),
            CheckError::Dsp(err) => write!(f, "{}", err),
        }
    }
}

impl From<std::io::Error> for CheckError {
    fn from(err: std::io::Error) -> CheckError {
        CheckError::Io(err)
    }
}

impl From<rdpdsp::core::errors::Error> for CheckError {
    fn from(err: rdpdsp::core::errors::Error) -> CheckError {
        CheckError::Dsp(err)
    }
}

fn target_format(args: &Args) -> AudioFormat {
    let channels = args.channels;
    let rate = args.target_rate.unwrap_or(args.rate);
    let block_align = args.block_align.unwrap_or(512u16.saturating_mul(channels));

    // G.711 carries one byte per sample.
    let g711 = AudioFormat::pcm(channels, rate, 8);

    match args.codec {
        Codec::Pcm => AudioFormat::pcm(channels, rate, 16),
        Codec::Ima => AudioFormat::adpcm_ima(channels, rate, block_align),
        Codec::Ms => AudioFormat::adpcm_ms(channels, rate, block_align),
        Codec::Alaw => AudioFormat { tag: FORMAT_TAG_ALAW, ..g711 },
        Codec::Mulaw => AudioFormat { tag: FORMAT_TAG_MULAW, ..g711 },
    }
}

fn run(args: &Args) -> Result<CheckReport, CheckError> {
    let source = AudioFormat::pcm(args.channels, args.rate, 16);
    let target = target_format(args);

    let pcm = match &args.input {
        Some(path) => {
            info!("reading pcm from {}", path.display());
            std::fs::read(path)?
        }
        None => sine_sweep(args.frames, args.channels, args.rate),
    };

    let opts = CheckOptions { source, target, packet_frames: args.packet_frames };

    Ok(run_check(&pcm, &opts)?)
}

fn print_report(report: &CheckReport) {
    println!("Check Results");
    println!("=================================================");
    println!();
    println!("  Codec:                       {:>12}", report.codec);
    println!("  Packets:                     {:>12}", report.packets);
    println!("  Frames In/Out:               {:>12}/{:>12}", report.frames_in, report.frames_out);
    println!(
        "  PCM/Compressed Bytes:        {:>12}/{:>12}",
        report.pcm_bytes, report.compressed_bytes
    );
    println!("  Compression Ratio:           {:>12.3}", report.compression_ratio);
    println!();

    match (report.abs_max_delta, report.rms_delta) {
        (Some(abs_max), Some(rms)) => {
            println!("  Absolute Maximum Sample Delta: {:>10}", abs_max);
            println!("  RMS Sample Delta:              {:>10.3}", rms);
        }
        _ => println!("  Sample deltas not computed for a resampled stream."),
    }
    println!();
}

fn main() {
    pretty_env_logger::init();

    let args = Args::parse();

    let report = match run(&args) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Check interrupted by error: {}", err);
            std::process::exit(2);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("Could not serialize report: {}", err);
                std::process::exit(2);
            }
        }
    }
    else {
        print_report(&report);
    }
}
