// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Intra prediction in the transform domain
//
// Predictions are built directly from the reconstructed coefficients of the
// upper-left, upper and left neighbour blocks. A neighbour can only be used
// if it was coded as a single block of the same size as the current one;
// anything else reads as all zeros.

use crate::array2d::Array2D;
use crate::cdf::{ModeModel, ModeNeighbors};
use crate::consts::perceptual_weight;
use crate::entropycode::symbol_cost_q4;
use crate::enums::{BlockSize, IntraMode};
use crate::partition::{BlockPos, BlockSizeGrid};
use crate::util::*;

// Coefficients of the neighbouring blocks, row-major, when available
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighbors {
  pub upleft: Option<Vec<i32>>,
  pub up: Option<Vec<i32>>,
  pub left: Option<Vec<i32>>
}

impl Neighbors {
  // Collect the neighbours of `block` from a plane's coefficient buffer
  pub fn gather(coeffs: &Array2D<i32>, grid: &BlockSizeGrid, dec: usize, block: BlockPos) -> Self {
    let n = block.size.cells();
    let fetch = |row4: Option<usize>, col4: Option<usize>| -> Option<Vec<i32>> {
      let (row4, col4) = (row4?, col4?);
      if grid.size_at(dec, row4, col4) != block.size {
        return None;
      }
      let len = block.size.len();
      Some(coeffs.block(row4 * 4, col4 * 4, len, len).to_vec())
    };
    let up_row = block.row4.checked_sub(n);
    let left_col = block.col4.checked_sub(n);
    Self {
      upleft: fetch(up_row, left_col),
      up: fetch(up_row, Some(block.col4)),
      left: fetch(Some(block.row4), left_col)
    }
  }

  pub fn is_empty(&self) -> bool {
    self.upleft.is_none() && self.up.is_none() && self.left.is_none()
  }

  // Iterate over the available neighbours
  pub fn available(&self) -> impl Iterator<Item = &Vec<i32>> {
    [&self.upleft, &self.up, &self.left].into_iter().flatten()
  }
}

fn coeff(block: &Option<Vec<i32>>, idx: usize) -> i32 {
  block.as_ref().map_or(0, |b| b[idx])
}

// Build the prediction for one mode
pub fn predict(mode: IntraMode, size: BlockSize, neighbors: &Neighbors) -> Vec<i32> {
  let n = size.len();
  let ul = &neighbors.upleft;
  let u = &neighbors.up;
  let l = &neighbors.left;
  let mut pred = vec![0; n * n];

  match mode {
    IntraMode::Dc => {
      let dcs: Vec<i64> = neighbors.available().map(|b| b[0] as i64).collect();
      if !dcs.is_empty() {
        pred[0] = div_round(dcs.iter().sum(), dcs.len() as i64) as i32;
      }
    },
    IntraMode::Vertical => {
      for j in 0..n {
        pred[j] = coeff(u, j);
      }
    },
    IntraMode::Horizontal => {
      for i in 0..n {
        pred[i * n] = coeff(l, i * n);
      }
    },
    IntraMode::CopyUp => {
      for k in 0 .. n * n {
        pred[k] = coeff(u, k);
      }
    },
    IntraMode::CopyLeft => {
      for k in 0 .. n * n {
        pred[k] = coeff(l, k);
      }
    },
    IntraMode::CopyUpLeft => {
      for k in 0 .. n * n {
        pred[k] = coeff(ul, k);
      }
    },
    IntraMode::Average => {
      for k in 0 .. n * n {
        pred[k] = half(coeff(u, k) + coeff(l, k));
      }
    },
    IntraMode::Gradient => {
      for k in 0 .. n * n {
        pred[k] = coeff(u, k) + coeff(l, k) - coeff(ul, k);
      }
    },
    IntraMode::Cross => {
      for j in 1..n {
        pred[j] = coeff(u, j);
      }
      for i in 1..n {
        pred[i * n] = coeff(l, i * n);
      }
      pred[0] = half(coeff(u, 0) + coeff(l, 0));
    },
    IntraMode::Smooth => {
      for k in 0 .. n * n {
        pred[k] = round_shift(3 * coeff(u, k) + 3 * coeff(l, k) + 2 * coeff(ul, k), 3);
      }
    },
  }

  return pred;
}

// Perceptually weighted sum of absolute differences
pub fn weighted_distortion(size: BlockSize, src: &[i32], pred: &[i32]) -> i64 {
  let n = size.len();
  assert!(src.len() == n * n && pred.len() == n * n);
  let mut dist = 0i64;
  for i in 0..n {
    for j in 0..n {
      let diff = (src[i * n + j] - pred[i * n + j]).abs() as i64;
      dist += perceptual_weight(i, j, n) as i64 * diff;
    }
  }
  return dist;
}

// Pick the mode minimising distortion + lambda * rate
// With no neighbours every mode predicts zero, and the mode is not coded
pub fn select_mode(src: &[i32], size: BlockSize, neighbors: &Neighbors,
                   cdf: &[u32], lambda: i32) -> (IntraMode, Vec<i32>) {
  if neighbors.is_empty() {
    return (IntraMode::Dc, vec![0; size.area()]);
  }

  let mut best_cost = i64::MAX;
  let mut best_mode = IntraMode::Dc;
  let mut best_pred = Vec::new();
  for mode in IntraMode::ALL {
    let pred = predict(mode, size, neighbors);
    let rate = symbol_cost_q4(cdf, mode.index()) as i64;
    let cost = weighted_distortion(size, src, &pred) + lambda as i64 * rate;
    if cost < best_cost {
      best_cost = cost;
      best_mode = mode;
      best_pred = pred;
    }
  }

  return (best_mode, best_pred);
}

// Modes of the luma blocks adjacent to the top-left corner of the block at
// (row4, col4), read from a per-cell mode map
pub fn mode_neighbors(modes: &Array2D<IntraMode>, row4: usize, col4: usize) -> ModeNeighbors {
  let above = row4.checked_sub(1);
  let before = col4.checked_sub(1);
  let at = |r: Option<usize>, c: Option<usize>| modes.get(r?, c?).copied();
  ModeNeighbors {
    left: at(Some(row4), before),
    upleft: at(above, before),
    up: at(above, Some(col4))
  }
}

// Record a coded mode for every cell of a block
pub fn store_mode(modes: &mut Array2D<IntraMode>, block: BlockPos, mode: IntraMode) {
  let n = block.size.cells();
  modes.fill_region(block.row4, block.col4, n, n, &mode);
}

// Per-frame intra state shared by the encoder and decoder
pub struct IntraState {
  pub model: ModeModel,
  pub modes: Array2D<IntraMode>
}

impl IntraState {
  pub fn new(rows4: usize, cols4: usize) -> Self {
    Self {
      model: ModeModel::new(),
      modes: Array2D::filled(rows4, cols4, IntraMode::Dc)
    }
  }
}
