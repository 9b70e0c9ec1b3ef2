// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Block traversal shared by the encoder and the decoder
//
// Both sides walk a frame in the same order: planes in order, macroblocks in
// raster order, and the blocks of each macroblock in z-order. Everything that
// depends on previously coded data (predictions, mode CDFs, adaptation
// snapshots, lapping) is computed here, and the only difference between the
// two sides is hidden behind the BlockCoder trait: the encoder makes a choice
// and writes it, the decoder reads it back.

use log::trace;

use crate::adapt::{AdaptContext, AdaptSnapshot};
use crate::array2d::Array2D;
use crate::cfl::{predict_cfl, LumaCache};
use crate::config::StreamInfo;
use crate::enums::IntraMode;
use crate::error::Result;
use crate::frame::Frame;
use crate::intra::*;
use crate::lapping::LapFrontier;
use crate::partition::{BlockPos, BlockSizeGrid, MB_CELLS};
use crate::quantizer::QuantizedBlock;
use crate::txfm::inverse_transform;
use crate::util::clamp;

pub trait BlockCoder {
  // Block sizes for a frame of rows4 x cols4 luma cells
  fn code_partition(&mut self, rows4: usize, cols4: usize) -> Result<BlockSizeGrid>;

  // Intra mode of a luma block which has at least one usable neighbour
  fn code_mode(&mut self, block: BlockPos, neighbors: &Neighbors, cdf: &[u32]) -> Result<IntraMode>;

  // Residual of a block against `pred`, coded with the current adaptation
  // snapshot of plane `pli`
  fn code_residual(&mut self, pli: usize, block: BlockPos, pred: &[i32],
                   snapshot: &AdaptSnapshot) -> Result<QuantizedBlock>;

  // Called once every block has been coded, before any state is committed.
  // An error here discards the frame
  fn finish(&mut self) -> Result<()>;
}

// Reconstruction buffers for one plane of the frame being coded
struct PlaneRecon {
  dec: usize,
  // Reconstructed coefficients of every block, at the block's position
  coeffs: Array2D<i32>,
  // Inverse transformed samples, centred on zero
  spatial: Array2D<i32>,
  frontier: LapFrontier
}

impl PlaneRecon {
  fn try_new(grid: &BlockSizeGrid, dec: usize) -> Result<Self> {
    let rows4 = grid.rows4() >> dec;
    let cols4 = grid.cols4() >> dec;
    Ok(Self {
      dec: dec,
      coeffs: Array2D::try_zeroed(rows4 * 4, cols4 * 4)?,
      spatial: Array2D::try_zeroed(rows4 * 4, cols4 * 4)?,
      frontier: LapFrontier::new(rows4, cols4, dec)
    })
  }

  fn reconstruct(&mut self, block: BlockPos, pred: &[i32], residual: &[i32]) {
    let n = block.size.len();
    let y = block.row4 * 4;
    let x = block.col4 * 4;
    let recon: Vec<i32> = pred.iter().zip(residual).map(|(&p, &r)| p + r).collect();
    self.coeffs.block_mut(y, x, n, n).copy_from(&recon);

    let mut samples = self.spatial.block_mut(y, x, n, n);
    samples.copy_from(&recon);
    inverse_transform(block.size, &mut samples);
  }
}

// Per-stream traversal state
// Only the adaptation contexts live across frames. They and the mode map are
// committed at the end of a frame, so a frame which fails part way leaves
// them untouched
pub struct Traversal {
  info: StreamInfo,
  adapt: Vec<AdaptContext>,
  intra: IntraState
}

impl Traversal {
  pub fn new(info: &StreamInfo) -> Result<Self> {
    info.validate()?;
    let rows4 = info.padded_height() / 4;
    let cols4 = info.padded_width() / 4;
    let mb_cols = cols4 / MB_CELLS;
    Ok(Self {
      info: info.clone(),
      adapt: vec![AdaptContext::with_defaults(mb_cols); info.planes.len()],
      intra: IntraState::new(rows4, cols4)
    })
  }

  pub fn info(&self) -> &StreamInfo {
    &self.info
  }

  pub fn adapt(&self, pli: usize) -> &AdaptContext {
    &self.adapt[pli]
  }

  // Luma modes of the last frame coded
  pub fn modes(&self) -> &Array2D<IntraMode> {
    &self.intra.modes
  }

  // Code one frame, returning its reconstruction
  pub fn run_frame<C: BlockCoder>(&mut self, coder: &mut C) -> Result<Frame> {
    let rows4 = self.info.padded_height() / 4;
    let cols4 = self.info.padded_width() / 4;
    let grid = coder.code_partition(rows4, cols4)?;
    assert!(grid.rows4() == rows4 && grid.cols4() == cols4);

    let mut adapt = self.adapt.clone();
    for ctx in adapt.iter_mut() {
      ctx.begin_frame();
    }
    let mut intra = IntraState::new(rows4, cols4);

    let mut planes: Vec<PlaneRecon> = Vec::with_capacity(self.info.planes.len());
    let mut caches: Vec<LumaCache> = Vec::new();
    for pli in 0 .. self.info.planes.len() {
      let dec = self.info.planes[pli].xdec;
      let mut plane = PlaneRecon::try_new(&grid, dec)?;

      let cache = if pli == 0 {
        None
      } else {
        if !caches.iter().any(|c| c.dec() == dec) {
          caches.push(LumaCache::build(&planes[0].coeffs, &grid, dec)?);
        }
        caches.iter().find(|c| c.dec() == dec)
      };

      for mb_row in 0 .. grid.mb_rows() {
        adapt[pli].begin_row();
        for mb_col in 0 .. grid.mb_cols() {
          for block in grid.mb_blocks(dec, mb_row, mb_col) {
            let pred = match cache {
              None => predict_luma(&mut intra, coder, &plane, &grid, block)?,
              Some(cache) => predict_cfl(cache, &plane.coeffs, &intra.modes, &grid, block).0
            };
            let snapshot = adapt[pli].snapshot(mb_col);
            let coded = coder.code_residual(pli, block, &pred, &snapshot)?;
            adapt[pli].update(mb_col, &coded.stats);
            plane.reconstruct(block, &pred, &coded.residual);
          }
        }
        adapt[pli].end_row();
        plane.frontier.advance(&mut plane.spatial, &grid, mb_row);
        trace!("Plane {} macroblock row {} done", pli, mb_row);
      }
      debug_assert!(plane.frontier.is_complete(&grid));
      planes.push(plane);
    }

    let mut frame = Frame::try_new(&self.info)?;
    for (pli, plane) in planes.iter().enumerate() {
      debug_assert!(plane.dec == frame.plane(pli).xdec());
      let spatial = &plane.spatial;
      frame.plane_mut(pli).pixels_mut().fill_with(|i, j| clamp(spatial[i][j] + 128, 0, 255) as u8);
    }

    coder.finish()?;
    self.adapt = adapt;
    self.intra = intra;
    Ok(frame)
  }
}

// Predict a luma block, coding its mode when there is anything to predict
// from. Without neighbours the prediction is zero and no mode is coded
fn predict_luma<C: BlockCoder>(intra: &mut IntraState, coder: &mut C, plane: &PlaneRecon,
                               grid: &BlockSizeGrid, block: BlockPos) -> Result<Vec<i32>> {
  let neighbors = Neighbors::gather(&plane.coeffs, grid, 0, block);
  if neighbors.is_empty() {
    store_mode(&mut intra.modes, block, IntraMode::Dc);
    return Ok(vec![0; block.size.area()]);
  }

  let context = mode_neighbors(&intra.modes, block.row4, block.col4);
  let cdf = intra.model.cdf(&context);
  let mode = coder.code_mode(block, &neighbors, &cdf)?;
  intra.model.update(mode, &context);
  store_mode(&mut intra.modes, block, mode);
  Ok(predict(mode, block.size, &neighbors))
}
