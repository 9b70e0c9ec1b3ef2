// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

mod common;

use common::*;
use tinylap::metrics::plane_psnr;
use tinylap::{BlockSize, EncoderConfig, PartitionMode, StreamInfo};

fn check_lossless(info: &StreamInfo, config: EncoderConfig) {
  let frames = vec![test_frame(info, 1), test_frame(info, 2)];
  let stream = encode_frames(info, config, &frames);
  let (_, decoded) = decode_packets(&stream.header, &stream.packets);
  for ((source, recon), output) in frames.iter().zip(&stream.recons).zip(&decoded) {
    assert_eq!(output, recon);
    assert_eq!(output, source);
  }
}

#[test]
fn lossless_420() {
  check_lossless(&StreamInfo::yuv420(48, 32), lossless());
  check_lossless(&StreamInfo::yuv420(37, 21), lossless());
}

#[test]
fn lossless_444() {
  check_lossless(&StreamInfo::yuv444(40, 24), lossless());
}

#[test]
fn lossless_mono() {
  check_lossless(&StreamInfo::mono(33, 47), lossless());
}

#[test]
fn lossless_with_fixed_block_sizes() {
  for size in BlockSize::ALL {
    let config = EncoderConfig {
      partition: PartitionMode::Fixed(size),
      ..lossless()
    };
    check_lossless(&StreamInfo::yuv420(32, 32), config);
  }
}

#[test]
fn lossy_decoder_mirrors_encoder() {
  let info = StreamInfo::yuv420(64, 48);
  let frames: Vec<_> = (0..3).map(|i| test_frame(&info, 10 + i)).collect();
  let config = EncoderConfig {
    quantizer: 12,
    lambda: 20,
    ..EncoderConfig::default()
  };
  let stream = encode_frames(&info, config, &frames);
  let (decoder, decoded) = decode_packets(&stream.header, &stream.packets);

  assert_eq!(decoded, stream.recons);
  assert_ne!(decoded[0], frames[0]);
  for (source, output) in frames.iter().zip(&decoded) {
    assert!(plane_psnr(source.y(), output.y()) > 25.0);
  }

  // Both sides end up in the same adaptation and mode state
  let enc = stream.encoder.traversal();
  let dec = decoder.traversal().unwrap();
  for pli in 0..3 {
    assert_eq!(enc.adapt(pli), dec.adapt(pli));
  }
  assert_eq!(enc.modes(), dec.modes());
}

#[test]
fn encoding_is_deterministic() {
  let info = StreamInfo::yuv444(48, 48);
  let frames: Vec<_> = (0..2).map(|i| test_frame(&info, 20 + i)).collect();
  let config = EncoderConfig {
    quantizer: 5,
    ..EncoderConfig::default()
  };
  let a = encode_frames(&info, config, &frames);
  let b = encode_frames(&info, config, &frames);
  assert_eq!(a.packets, b.packets);
  assert_eq!(a.recons, b.recons);
  for pli in 0..3 {
    assert_eq!(a.encoder.traversal().adapt(pli), b.encoder.traversal().adapt(pli));
  }
  assert_eq!(a.encoder.traversal().modes(), b.encoder.traversal().modes());
}

#[test]
fn packets_are_numbered_and_timed() {
  let mut info = StreamInfo::mono(16, 16);
  info.frame_duration = 3;
  let frames: Vec<_> = (0..3).map(|i| test_frame(&info, i)).collect();
  let stream = encode_frames(&info, lossless(), &frames);

  assert_eq!(stream.header.packetno, 0);
  let numbers: Vec<_> = stream.packets.iter().map(|p| (p.packetno, p.granulepos, p.eos)).collect();
  assert_eq!(numbers, vec![(1, 3, false), (2, 6, false), (3, 9, true)]);
}

#[test]
fn quantizer_changes_between_frames() {
  let info = StreamInfo::yuv420(32, 32);
  let frames: Vec<_> = (0..2).map(|i| test_frame(&info, 30 + i)).collect();
  let mut encoder = tinylap::Encoder::new(&info, lossless()).unwrap();
  let header = encoder.header_out().unwrap();

  encoder.encode_frame(&frames[0]).unwrap();
  let first = encoder.packet_out(false).unwrap().unwrap();
  encoder.ctl(tinylap::EncoderControl::SetQuantizer(20)).unwrap();
  encoder.encode_frame(&frames[1]).unwrap();
  let second = encoder.packet_out(true).unwrap().unwrap();
  let recon = encoder.recon().unwrap().clone();

  let (_, decoded) = decode_packets(&header, &[first, second]);
  assert_eq!(decoded[0], frames[0]);
  assert_eq!(decoded[1], recon);
}
