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
use tinylap::*;

#[test]
fn geometry_mismatch_leaves_encoder_untouched() {
  let info = StreamInfo::yuv420(32, 32);
  let frame = test_frame(&info, 5);

  let mut encoder = Encoder::new(&info, lossless()).unwrap();
  encoder.header_out().unwrap();
  for wrong in [StreamInfo::yuv420(48, 32), StreamInfo::yuv444(32, 32), StreamInfo::mono(32, 32)] {
    let bad = test_frame(&wrong, 5);
    assert!(matches!(encoder.encode_frame(&bad), Err(Error::InvalidArgument(_))));
  }
  encoder.encode_frame(&frame).unwrap();
  let packet = encoder.packet_out(true).unwrap().unwrap();

  // Same bytes as from an encoder which never saw the bad frames
  let clean = encode_frames(&info, lossless(), &[frame]);
  assert_eq!(packet, clean.packets[0]);
}

#[test]
fn unsupported_layouts() {
  let mut info = StreamInfo::yuv420(16, 16);
  info.planes[1].ydec = 0;
  assert!(matches!(Encoder::new(&info, lossless()), Err(Error::NotImplemented(_))));
  assert!(matches!(Encoder::new(&StreamInfo::yuv420(0, 16), lossless()), Err(Error::InvalidArgument(_))));
  assert!(matches!(Encoder::new(&StreamInfo::mono(16, 70000), lossless()), Err(Error::InvalidArgument(_))));
}

#[test]
fn packet_state_machine() {
  let info = StreamInfo::mono(16, 16);
  let frame = test_frame(&info, 1);
  let stream = encode_frames(&info, lossless(), &[frame.clone()]);

  let mut encoder = Encoder::new(&info, lossless()).unwrap();
  assert_eq!(encoder.state(), PacketState::AwaitingHeader);
  assert!(matches!(encoder.encode_frame(&frame), Err(Error::InvalidState(_))));
  encoder.header_out().unwrap();
  assert_eq!(encoder.state(), PacketState::AwaitingData);
  encoder.encode_frame(&frame).unwrap();
  encoder.packet_out(true).unwrap();
  assert_eq!(encoder.state(), PacketState::Done);
  assert!(matches!(encoder.packet_out(false), Err(Error::InvalidState(_))));
  assert!(matches!(encoder.header_out(), Err(Error::InvalidState(_))));

  let mut decoder = Decoder::new();
  assert_eq!(decoder.state(), PacketState::AwaitingHeader);
  assert!(matches!(decoder.decode_packet(&stream.packets[0]), Err(Error::InvalidState(_))));
  decoder.header_in(&stream.header).unwrap();
  decoder.decode_packet(&stream.packets[0]).unwrap();
  assert_eq!(decoder.state(), PacketState::Done);
}

// Variants of a packet which must all be rejected
fn corrupt_variants(packet: &Packet) -> Vec<Packet> {
  let mut truncated = packet.clone();
  truncated.data = truncated.data[.. truncated.data.len() - 1].into();

  // Only the trailing data check at the end of the frame catches this one
  let mut extended = packet.clone();
  let mut data = extended.data.to_vec();
  data.push(0);
  extended.data = data.into_boxed_slice();

  let empty = Packet { data: Vec::new().into_boxed_slice(), ..packet.clone() };
  vec![truncated, extended, empty]
}

#[test]
fn corrupt_packets_are_dropped() {
  let info = StreamInfo::yuv420(32, 16);
  let frames: Vec<_> = (0..3).map(|i| test_frame(&info, 40 + i)).collect();
  let stream = encode_frames(&info, lossless(), &frames);

  let mut decoder = Decoder::new();
  decoder.header_in(&stream.header).unwrap();

  for bad in corrupt_variants(&stream.packets[0]) {
    assert!(matches!(decoder.decode_packet(&bad), Err(Error::CorruptInput(_))));
  }
  assert_eq!(decoder.decode_packet(&stream.packets[0]).unwrap(), frames[0]);

  // Once a frame has been decoded, rejected packets must not disturb the
  // state it left behind
  let traversal = decoder.traversal().unwrap();
  let adapt: Vec<_> = (0..3).map(|pli| traversal.adapt(pli).clone()).collect();
  let modes = traversal.modes().clone();
  for bad in corrupt_variants(&stream.packets[1]) {
    assert!(matches!(decoder.decode_packet(&bad), Err(Error::CorruptInput(_))));
    let traversal = decoder.traversal().unwrap();
    for pli in 0..3 {
      assert_eq!(traversal.adapt(pli), &adapt[pli]);
    }
    assert_eq!(traversal.modes(), &modes);
  }

  assert_eq!(decoder.state(), PacketState::AwaitingData);
  assert_eq!(decoder.decode_packet(&stream.packets[1]).unwrap(), frames[1]);
  assert_eq!(decoder.decode_packet(&stream.packets[2]).unwrap(), frames[2]);
  assert_eq!(decoder.state(), PacketState::Done);
}

#[test]
fn lossy_stream_survives_a_rejected_packet() {
  let info = StreamInfo::yuv444(32, 32);
  let frames: Vec<_> = (0..2).map(|i| test_frame(&info, 50 + i)).collect();
  let config = EncoderConfig { quantizer: 9, ..EncoderConfig::default() };
  let stream = encode_frames(&info, config, &frames);

  let mut decoder = Decoder::new();
  decoder.header_in(&stream.header).unwrap();
  assert_eq!(decoder.decode_packet(&stream.packets[0]).unwrap(), stream.recons[0]);
  for bad in corrupt_variants(&stream.packets[1]) {
    assert!(decoder.decode_packet(&bad).is_err());
  }
  assert_eq!(decoder.decode_packet(&stream.packets[1]).unwrap(), stream.recons[1]);
}

#[test]
fn control_requests() {
  let info = StreamInfo::yuv420(16, 16);
  let mut encoder = Encoder::new(&info, lossless()).unwrap();
  assert!(matches!(encoder.ctl(EncoderControl::Reserved(0)), Err(Error::NotImplemented(_))));
  assert!(matches!(encoder.ctl(EncoderControl::SetQuantizer(1 << 16)), Err(Error::InvalidArgument(_))));
  encoder.ctl(EncoderControl::SetQuantizer(8)).unwrap();
  assert_eq!(encoder.config().quantizer, 8);
}
