// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use log::{debug, warn};

use crate::adapt::AdaptSnapshot;
use crate::config::StreamInfo;
use crate::encoder::{Packet, QUANTIZER_BITS};
use crate::entropycode::{SymbolReader, SymbolStreamReader};
use crate::enums::{IntraMode, PacketState};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::header::read_header;
use crate::intra::Neighbors;
use crate::partition::{BlockPos, BlockSizeGrid};
use crate::quantizer::{PulseQuantizer, QuantizedBlock, ScalarQuantizer};
use crate::traversal::{BlockCoder, Traversal};

pub struct Decoder {
  traversal: Option<Traversal>,
  state: PacketState,
  frames: u64
}

// Mutable state used while decoding a single frame
struct FrameDecoder<'a> {
  quantizer: ScalarQuantizer,
  bitstream: SymbolStreamReader<'a>
}

impl Decoder {
  pub fn new() -> Self {
    Self {
      traversal: None,
      state: PacketState::AwaitingHeader,
      frames: 0
    }
  }

  pub fn state(&self) -> PacketState {
    self.state
  }

  pub fn info(&self) -> Option<&StreamInfo> {
    self.traversal.as_ref().map(|t| t.info())
  }

  pub fn traversal(&self) -> Option<&Traversal> {
    self.traversal.as_ref()
  }

  pub fn header_in(&mut self, packet: &Packet) -> Result<StreamInfo> {
    if self.state != PacketState::AwaitingHeader {
      return Err(Error::invalid_state("Stream header has already been read"));
    }
    let info = read_header(&packet.data)?;
    debug!("Stream header: {}x{}, {} planes", info.width, info.height, info.planes.len());
    self.traversal = Some(Traversal::new(&info)?);
    self.state = PacketState::AwaitingData;
    Ok(info)
  }

  // Decode one frame packet
  // A corrupt packet produces no frame and leaves the decoder ready for the
  // next one
  pub fn decode_packet(&mut self, packet: &Packet) -> Result<Frame> {
    let traversal = match (self.state, self.traversal.as_mut()) {
      (PacketState::AwaitingData, Some(traversal)) => traversal,
      _ => return Err(Error::invalid_state(format!("Cannot decode data in state {:?}", self.state)))
    };

    match decode_frame(traversal, &packet.data) {
      Ok(frame) => {
        debug!("Decoded frame {} from packet {}", self.frames, packet.packetno);
        self.frames += 1;
        if packet.eos {
          self.state = PacketState::Done;
        }
        Ok(frame)
      },
      Err(e) => {
        warn!("Dropping packet {}: {}", packet.packetno, e);
        Err(e)
      }
    }
  }
}

fn decode_frame(traversal: &mut Traversal, data: &[u8]) -> Result<Frame> {
  let mut bitstream = SymbolStreamReader::new(data);
  let quantizer = bitstream.decode_bits(QUANTIZER_BITS)?;
  let mut frame_decoder = FrameDecoder {
    quantizer: ScalarQuantizer::new(quantizer),
    bitstream: bitstream
  };
  traversal.run_frame(&mut frame_decoder)
}

impl<'a> BlockCoder for FrameDecoder<'a> {
  fn code_partition(&mut self, rows4: usize, cols4: usize) -> Result<BlockSizeGrid> {
    BlockSizeGrid::decode(&mut self.bitstream, rows4, cols4)
  }

  fn code_mode(&mut self, _block: BlockPos, _neighbors: &Neighbors, cdf: &[u32]) -> Result<IntraMode> {
    let index = self.bitstream.decode_symbol(cdf)?;
    IntraMode::from_index(index).ok_or_else(|| Error::corrupt(format!("Intra mode {} out of range", index)))
  }

  fn code_residual(&mut self, _pli: usize, block: BlockPos, _pred: &[i32],
                   snapshot: &AdaptSnapshot) -> Result<QuantizedBlock> {
    self.quantizer.decode_block(&mut self.bitstream, block.size, snapshot)
  }

  // Trailing data means the packet was not what we decoded it as
  fn finish(&mut self) -> Result<()> {
    self.bitstream.finish()
  }
}
