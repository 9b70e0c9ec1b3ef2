// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Shared helpers for the integration tests

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tinylap::{Decoder, Encoder, EncoderConfig, Frame, Packet, StreamInfo};

// A frame with smooth gradients, a sharp diagonal edge and some noise, so
// that every block size and most intra modes get used
pub fn test_frame(info: &StreamInfo, seed: u64) -> Frame {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut frame = Frame::new(info);
  for pli in 0 .. frame.num_planes() {
    let plane = frame.plane_mut(pli);
    let (w, h) = (plane.crop_width(), plane.crop_height());
    let base = 40 + 60 * pli as i32;
    for row in 0..h {
      for col in 0..w {
        let mut v = base + (2 * row + col) as i32;
        if row + w / 2 > col + h / 2 {
          v += 70;
        }
        v += rng.gen_range(-6 ..= 6);
        plane.pixels_mut()[row][col] = v.clamp(0, 255) as u8;
      }
    }
    plane.fill_padding();
  }
  return frame;
}

pub struct EncodedStream {
  pub header: Packet,
  pub packets: Vec<Packet>,
  // The encoder's reconstruction of each frame
  pub recons: Vec<Frame>,
  pub encoder: Encoder
}

pub fn encode_frames(info: &StreamInfo, config: EncoderConfig, frames: &[Frame]) -> EncodedStream {
  let mut encoder = Encoder::new(info, config).unwrap();
  let header = encoder.header_out().unwrap();
  let mut packets = Vec::new();
  let mut recons = Vec::new();
  for (i, frame) in frames.iter().enumerate() {
    encoder.encode_frame(frame).unwrap();
    packets.push(encoder.packet_out(i + 1 == frames.len()).unwrap().unwrap());
    recons.push(encoder.recon().unwrap().clone());
  }
  EncodedStream {
    header: header,
    packets: packets,
    recons: recons,
    encoder: encoder
  }
}

pub fn decode_packets(header: &Packet, packets: &[Packet]) -> (Decoder, Vec<Frame>) {
  let mut decoder = Decoder::new();
  decoder.header_in(header).unwrap();
  let frames = packets.iter().map(|p| decoder.decode_packet(p).unwrap()).collect();
  (decoder, frames)
}

pub fn lossless() -> EncoderConfig {
  EncoderConfig {
    quantizer: 0,
    ..EncoderConfig::default()
  }
}
