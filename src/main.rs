// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::info;

use tinylap::metrics::plane_psnr;
use tinylap::y4m::{Y4MReader, Y4MWriter};
use tinylap::{BlockSize, Decoder, Encoder, EncoderConfig, PartitionMode};

#[derive(Parser)]
#[command(override_usage = "tinylap <INPUT> [-o <OUTPUT>] [--quantizer <Q>] [--lambda <L>] [--block-size <SIZE>] [--frames <N>]")]
struct CommandlineArgs {
  /// Input file, must end in .y4m
  input: PathBuf,
  /// Where to write the decoded frames, must end in .y4m
  #[arg(short, long)]
  output: Option<PathBuf>,
  /// Quantizer step size. 0 and 1 are lossless
  #[arg(short, long, default_value_t = 0)]
  quantizer: u32,
  /// Rate weight for intra mode decisions
  #[arg(short, long, default_value_t = 4)]
  lambda: i32,
  /// Block size: 4, 8 or 16, or 0 to decide per macroblock
  #[arg(short, long, default_value_t = 0)]
  block_size: usize,
  /// Maximum number of frames to code [default: all]
  #[arg(short, long)]
  frames: Option<usize>,
}

fn check_y4m_extension(path: &PathBuf, what: &str) {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some("y4m") => {},
    _ => {
      println!("Error: {} file must end in .y4m", what);
      exit(2);
    }
  }
}

fn fail<E: std::fmt::Display>(e: E) -> ! {
  println!("Error: {}", e);
  exit(1);
}

fn main() {
  env_logger::init();
  let args = CommandlineArgs::parse();

  check_y4m_extension(&args.input, "Input");
  if let Some(output) = &args.output {
    check_y4m_extension(output, "Output");
  }

  let partition = match args.block_size {
    0 => EncoderConfig::default().partition,
    len => match BlockSize::from_len(len) {
      Some(size) => PartitionMode::Fixed(size),
      None => {
        println!("Error: block size must be 0, 4, 8 or 16");
        exit(2);
      }
    }
  };
  let config = EncoderConfig {
    quantizer: args.quantizer,
    lambda: args.lambda,
    partition: partition
  };

  let input = File::open(&args.input).unwrap_or_else(|e| fail(e));
  let mut y4m = Y4MReader::new(BufReader::new(input)).unwrap_or_else(|e| fail(e));
  let info = y4m.info().clone();

  let mut writer = args.output.as_ref().map(|path| {
    let file = File::create(path).unwrap_or_else(|e| fail(e));
    Y4MWriter::new(BufWriter::new(file), &info).unwrap_or_else(|e| fail(e))
  });

  let mut encoder = Encoder::new(&info, config).unwrap_or_else(|e| fail(e));
  let mut decoder = Decoder::new();
  let header = encoder.header_out().unwrap_or_else(|e| fail(e));
  decoder.header_in(&header).unwrap_or_else(|e| fail(e));
  let mut total_bytes = header.data.len();

  let max_frames = args.frames.unwrap_or(usize::MAX);
  let mut next = if max_frames > 0 { y4m.read_frame().unwrap_or_else(|e| fail(e)) } else { None };
  let mut count = 0;
  while let Some(source) = next.take() {
    count += 1;
    encoder.encode_frame(&source).unwrap_or_else(|e| fail(e));
    if count < max_frames {
      next = y4m.read_frame().unwrap_or_else(|e| fail(e));
    }

    let packet = match encoder.packet_out(next.is_none()).unwrap_or_else(|e| fail(e)) {
      Some(packet) => packet,
      None => fail("Encoder produced no packet")
    };
    total_bytes += packet.data.len();
    let decoded = decoder.decode_packet(&packet).unwrap_or_else(|e| fail(e));

    if Some(&decoded) != encoder.recon() {
      fail(format!("Decoder output does not match the encoder's reconstruction in frame {}", count - 1));
    }

    let psnrs: Vec<String> = source.planes().iter().zip(decoded.planes())
                                   .map(|(s, d)| format!("{:.2}", plane_psnr(s, d)))
                                   .collect();
    println!("Frame {}: {} bytes, PSNR {} dB", count - 1, packet.data.len(), psnrs.join(" / "));

    if let Some(writer) = writer.as_mut() {
      writer.write_frame(&decoded).unwrap_or_else(|e| fail(e));
    }
  }

  info!("{} frames, {} bytes in total", count, total_bytes);
}
