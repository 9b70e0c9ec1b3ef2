// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use log::debug;

use crate::adapt::AdaptSnapshot;
use crate::array2d::Array2D;
use crate::config::{EncoderConfig, StreamInfo};
use crate::entropycode::{SymbolStream, SymbolWriter};
use crate::enums::{IntraMode, PacketState};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::header::write_header;
use crate::intra::{select_mode, Neighbors};
use crate::lapping::pre_filter_plane;
use crate::metrics::psnr;
use crate::partition::{decide_partition, BlockPos, BlockSizeGrid};
use crate::quantizer::{PulseQuantizer, QuantizedBlock, ScalarQuantizer};
use crate::traversal::{BlockCoder, Traversal};
use crate::txfm::forward_transform;

// Each frame packet starts with the quantizer step, in this many bits
pub const QUANTIZER_BITS: u32 = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
  pub data: Box<[u8]>,
  // Index of this packet in the stream, the header being packet 0
  pub packetno: u64,
  // Sum of the durations of all frames up to and including this one
  pub granulepos: u64,
  // Set on the last packet of the stream
  pub eos: bool
}

// Settings which may be changed between frames
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderControl {
  SetQuantizer(u32),
  SetLambda(i32),
  // Request codes with no meaning to this encoder
  Reserved(u32)
}

// Top-level encoder state
pub struct Encoder {
  config: EncoderConfig,
  traversal: Traversal,
  state: PacketState,
  packetno: u64,
  granulepos: u64,
  frames: u64,
  // Coded frame waiting for packet_out()
  pending: Option<Box<[u8]>>,
  recon: Option<Frame>
}

// Mutable state used while encoding a single frame
struct FrameEncoder<'a> {
  config: &'a EncoderConfig,
  quantizer: ScalarQuantizer,
  grid: BlockSizeGrid,
  // Pre-filtered, forward transformed source of each plane
  source: Vec<Array2D<i32>>,
  bitstream: SymbolStream
}

impl Encoder {
  pub fn new(info: &StreamInfo, config: EncoderConfig) -> Result<Self> {
    check_quantizer(config.quantizer)?;
    check_lambda(config.lambda)?;
    Ok(Self {
      config: config,
      traversal: Traversal::new(info)?,
      state: PacketState::AwaitingHeader,
      packetno: 0,
      granulepos: 0,
      frames: 0,
      pending: None,
      recon: None
    })
  }

  pub fn info(&self) -> &StreamInfo {
    self.traversal.info()
  }

  pub fn config(&self) -> &EncoderConfig {
    &self.config
  }

  pub fn state(&self) -> PacketState {
    self.state
  }

  pub fn traversal(&self) -> &Traversal {
    &self.traversal
  }

  // Reconstruction of the last frame encoded, as the decoder will see it
  pub fn recon(&self) -> Option<&Frame> {
    self.recon.as_ref()
  }

  pub fn ctl(&mut self, request: EncoderControl) -> Result<()> {
    match request {
      EncoderControl::SetQuantizer(quantizer) => {
        check_quantizer(quantizer)?;
        self.config.quantizer = quantizer;
      },
      EncoderControl::SetLambda(lambda) => {
        check_lambda(lambda)?;
        self.config.lambda = lambda;
      },
      EncoderControl::Reserved(code) => {
        return Err(Error::not_implemented(format!("Encoder control request {}", code)));
      }
    }
    Ok(())
  }

  // Emit the stream header packet. Must come before any frame
  pub fn header_out(&mut self) -> Result<Packet> {
    if self.state != PacketState::AwaitingHeader {
      return Err(Error::invalid_state("Stream header has already been written"));
    }
    let packet = Packet {
      data: write_header(self.info())?,
      packetno: self.packetno,
      granulepos: 0,
      eos: false
    };
    self.packetno += 1;
    self.state = PacketState::AwaitingData;
    return Ok(packet);
  }

  pub fn encode_frame(&mut self, source: &Frame) -> Result<()> {
    match self.state {
      PacketState::AwaitingHeader => return Err(Error::invalid_state("Frame submitted before the stream header")),
      PacketState::Done => return Err(Error::invalid_state("Frame submitted after the end of the stream")),
      PacketState::AwaitingData => {}
    }
    if self.pending.is_some() {
      return Err(Error::invalid_state("Previous frame has not been taken with packet_out()"));
    }
    source.check_geometry(self.info())?;

    let grid = decide_partition(source.y().pixels(), self.config.partition);
    let mut bitstream = SymbolStream::new();
    bitstream.encode_bits(self.config.quantizer, QUANTIZER_BITS);
    let mut frame_encoder = FrameEncoder {
      config: &self.config,
      quantizer: ScalarQuantizer::new(self.config.quantizer),
      source: source_coeffs(source, &grid)?,
      grid: grid,
      bitstream: bitstream
    };
    let recon = self.traversal.run_frame(&mut frame_encoder)?;
    let bits = frame_encoder.bitstream.estimated_bits();
    let data = frame_encoder.bitstream.finalize();

    debug!("Frame {}: {} bytes, ~{} bits estimated", self.frames, data.len(), bits);
    for (pli, (src, rec)) in source.planes().iter().zip(recon.planes()).enumerate() {
      let sse = src.squared_error(rec);
      debug!("  Plane {}: SSE {}, PSNR {:.2} dB", pli, sse, psnr(sse, src.crop_width() * src.crop_height()));
    }

    self.frames += 1;
    self.granulepos += self.info().frame_duration as u64;
    self.pending = Some(data);
    self.recon = Some(recon);
    Ok(())
  }

  // Take the packet for the last frame encoded, if any. Passing `last` marks
  // it as the end of the stream, after which no more frames are accepted
  pub fn packet_out(&mut self, last: bool) -> Result<Option<Packet>> {
    if self.state != PacketState::AwaitingData {
      return Err(Error::invalid_state(format!("No data packets in state {:?}", self.state)));
    }
    let data = match self.pending.take() {
      Some(data) => data,
      None => return Ok(None)
    };
    let packet = Packet {
      data: data,
      packetno: self.packetno,
      granulepos: self.granulepos,
      eos: last
    };
    self.packetno += 1;
    if last {
      self.state = PacketState::Done;
    }
    Ok(Some(packet))
  }
}

fn check_quantizer(quantizer: u32) -> Result<()> {
  if quantizer >= (1 << QUANTIZER_BITS) {
    return Err(Error::invalid_argument(format!("Quantizer {} out of range", quantizer)));
  }
  Ok(())
}

fn check_lambda(lambda: i32) -> Result<()> {
  if lambda < 0 {
    return Err(Error::invalid_argument(format!("Negative lambda {}", lambda)));
  }
  Ok(())
}

// Pre-filter each source plane and transform it with the block sizes of `grid`
fn source_coeffs(source: &Frame, grid: &BlockSizeGrid) -> Result<Vec<Array2D<i32>>> {
  let mut planes = Vec::with_capacity(source.num_planes());
  for plane in source.planes() {
    let dec = plane.xdec();
    let pixels = plane.pixels();
    let mut coeffs = Array2D::try_zeroed(pixels.rows(), pixels.cols())?;
    coeffs.fill_with(|i, j| pixels[i][j] as i32 - 128);
    pre_filter_plane(&mut coeffs, grid, dec);
    for mb_row in 0 .. grid.mb_rows() {
      for mb_col in 0 .. grid.mb_cols() {
        for block in grid.mb_blocks(dec, mb_row, mb_col) {
          let n = block.size.len();
          forward_transform(block.size, &mut coeffs.block_mut(block.row4 * 4, block.col4 * 4, n, n));
        }
      }
    }
    planes.push(coeffs);
  }
  return Ok(planes);
}

impl<'a> FrameEncoder<'a> {
  fn source_block(&self, pli: usize, block: BlockPos) -> Vec<i32> {
    let n = block.size.len();
    self.source[pli].block(block.row4 * 4, block.col4 * 4, n, n).to_vec()
  }
}

impl<'a> BlockCoder for FrameEncoder<'a> {
  fn code_partition(&mut self, rows4: usize, cols4: usize) -> Result<BlockSizeGrid> {
    assert!(self.grid.rows4() == rows4 && self.grid.cols4() == cols4);
    self.grid.encode(&mut self.bitstream);
    Ok(self.grid.clone())
  }

  fn code_mode(&mut self, block: BlockPos, neighbors: &Neighbors, cdf: &[u32]) -> Result<IntraMode> {
    let src = self.source_block(0, block);
    let (mode, _) = select_mode(&src, block.size, neighbors, cdf, self.config.lambda);
    self.bitstream.encode_symbol(mode.index(), cdf);
    Ok(mode)
  }

  fn code_residual(&mut self, pli: usize, block: BlockPos, pred: &[i32],
                   snapshot: &AdaptSnapshot) -> Result<QuantizedBlock> {
    let src = self.source_block(pli, block);
    let residual: Vec<i32> = src.iter().zip(pred).map(|(&s, &p)| s - p).collect();
    Ok(self.quantizer.encode_block(&mut self.bitstream, block.size, &residual, snapshot))
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}
