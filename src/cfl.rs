// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Chroma from luma prediction
//
// Chroma blocks are predicted as a scaled copy of the co-located luma
// coefficients: pred = alpha * luma, plus an offset beta on the DC
// coefficient. alpha and beta are not coded; both sides fit them to the
// already reconstructed neighbour blocks by weighted least squares over three
// taps (DC, first horizontal AC, first vertical AC). The tap weights depend on
// the luma modes under the block, which say which taps the luma predictor
// found reliable.

use log::trace;

use crate::array2d::Array2D;
use crate::consts::*;
use crate::enums::{BlockSize, IntraMode};
use crate::error::Result;
use crate::intra::Neighbors;
use crate::partition::{BlockPos, BlockSizeGrid, MB_CELLS};
use crate::txfm::*;
use crate::util::*;

// Luma coefficients re-expressed in the block structure of a subsampled
// plane. Built once per frame for each distinct chroma subsampling
pub struct LumaCache {
  dec: usize,
  coeffs: Array2D<i32>
}

impl LumaCache {
  // `luma` holds the reconstructed coefficients of every luma block
  pub fn build(luma: &Array2D<i32>, grid: &BlockSizeGrid, dec: usize) -> Result<Self> {
    assert!(luma.rows() == grid.rows4() * 4 && luma.cols() == grid.cols4() * 4);
    let mut spatial = luma.clone();
    for mb_row in 0 .. grid.mb_rows() {
      for mb_col in 0 .. grid.mb_cols() {
        for block in grid.mb_blocks(0, mb_row, mb_col) {
          let n = block.size.len();
          inverse_transform(block.size, &mut spatial.block_mut(block.row4 * 4, block.col4 * 4, n, n));
        }
      }
    }

    let rows = luma.rows() >> dec;
    let cols = luma.cols() >> dec;
    let mut coeffs = Array2D::<i32>::try_zeroed(rows, cols)?;
    if dec == 0 {
      coeffs.fill_with(|i, j| spatial[i][j]);
    } else {
      coeffs.fill_with(|i, j| {
        let sum = spatial[2 * i][2 * j] + spatial[2 * i][2 * j + 1]
                + spatial[2 * i + 1][2 * j] + spatial[2 * i + 1][2 * j + 1];
        round_shift(sum, 2)
      });
    }

    let cells = MB_CELLS >> dec;
    for mb_row in 0 .. grid.mb_rows() {
      for mb_col in 0 .. grid.mb_cols() {
        for block in grid.mb_blocks(dec, mb_row, mb_col) {
          debug_assert!(block.row4 / cells == mb_row && block.col4 / cells == mb_col);
          let n = block.size.len();
          forward_transform(block.size, &mut coeffs.block_mut(block.row4 * 4, block.col4 * 4, n, n));
        }
      }
    }

    Ok(Self {
      dec: dec,
      coeffs: coeffs
    })
  }

  pub fn dec(&self) -> usize {
    self.dec
  }

  pub fn coeffs(&self) -> &Array2D<i32> {
    &self.coeffs
  }

  fn block(&self, block: BlockPos) -> Vec<i32> {
    let n = block.size.len();
    self.coeffs.block(block.row4 * 4, block.col4 * 4, n, n).to_vec()
  }
}

// Slope (Q8) and DC offset of a chroma from luma prediction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CflParams {
  pub alpha_q8: i32,
  pub beta: i32
}

const NUM_TAPS: usize = 3;

fn tap_indices(size: BlockSize) -> [usize; NUM_TAPS] {
  [0, 1, size.len()]
}

// Sum of the tap weights of the four luma modes at the quadrants of the luma
// area under a chroma block
pub fn cfl_weights(modes: &Array2D<IntraMode>, dec: usize, block: BlockPos) -> [i64; NUM_TAPS] {
  let row4 = block.row4 << dec;
  let col4 = block.col4 << dec;
  let half = (block.size.cells() << dec) / 2;
  let mut weights = [0i64; NUM_TAPS];
  for (dy, dx) in [(0, 0), (0, half), (half, 0), (half, half)] {
    let mode = modes[row4 + dy][col4 + dx];
    for t in 0 .. NUM_TAPS {
      weights[t] += CFL_WEIGHTS[mode.index()][t] as i64;
    }
  }
  return weights;
}

// Weighted least squares fit of chroma = alpha * luma + beta * [tap is DC]
// `pairs` holds, for each usable neighbour, its (luma, chroma) tap values
pub fn fit(pairs: &[([i32; NUM_TAPS], [i32; NUM_TAPS])], weights: &[i64; NUM_TAPS]) -> CflParams {
  if pairs.is_empty() {
    return CflParams::default();
  }

  let mut sll = 0i64;
  let mut sl1 = 0i64;
  let mut s11 = 0i64;
  let mut slc = 0i64;
  let mut s1c = 0i64;
  let mut wsum = 0i64;
  for (l, c) in pairs {
    for t in 0 .. NUM_TAPS {
      let (lt, ct) = (l[t] as i64, c[t] as i64);
      sll += weights[t] * lt * lt;
      slc += weights[t] * lt * ct;
      wsum += weights[t];
    }
    sl1 += weights[0] * l[0] as i64;
    s1c += weights[0] * c[0] as i64;
    s11 += weights[0];
  }

  // The determinant is S11 times the weighted luma variance
  let det = sll * s11 - sl1 * sl1;
  if det <= CFL_MIN_VARIANCE * s11 * wsum {
    return CflParams {
      alpha_q8: 0,
      beta: div_round(s1c, s11) as i32
    };
  }

  let alpha = div_round((slc * s11 - sl1 * s1c) << CFL_ALPHA_BITS, det);
  let alpha = clamp(alpha, -CFL_ALPHA_MAX, CFL_ALPHA_MAX);
  let beta = div_round((s1c << CFL_ALPHA_BITS) - alpha * sl1, s11 << CFL_ALPHA_BITS);
  CflParams {
    alpha_q8: alpha as i32,
    beta: beta as i32
  }
}

// Predict one chroma block from the luma cache, fitting the parameters to
// the neighbouring chroma blocks already reconstructed in `chroma`
pub fn predict_cfl(cache: &LumaCache, chroma: &Array2D<i32>, modes: &Array2D<IntraMode>,
                   grid: &BlockSizeGrid, block: BlockPos) -> (Vec<i32>, CflParams) {
  let dec = cache.dec();
  let size = block.size;
  let chroma_nb = Neighbors::gather(chroma, grid, dec, block);
  if chroma_nb.is_empty() {
    return (vec![0; size.area()], CflParams::default());
  }
  let luma_nb = Neighbors::gather(cache.coeffs(), grid, dec, block);
  let taps = tap_indices(size);

  let mut pairs = Vec::with_capacity(3);
  for (l, c) in [(&luma_nb.upleft, &chroma_nb.upleft), (&luma_nb.up, &chroma_nb.up), (&luma_nb.left, &chroma_nb.left)] {
    if let (Some(l), Some(c)) = (l, c) {
      pairs.push((taps.map(|k| l[k]), taps.map(|k| c[k])));
    }
  }
  let params = fit(&pairs, &cfl_weights(modes, dec, block));

  let mut pred = cache.block(block);
  for v in pred.iter_mut() {
    *v = round_shift(params.alpha_q8 * *v, CFL_ALPHA_BITS);
  }
  pred[0] += params.beta;
  trace!("CfL at ({}, {}): alpha {} beta {}", block.row4, block.col4, params.alpha_q8, params.beta);
  return (pred, params);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::intra::store_mode;

  fn mixed_grid() -> BlockSizeGrid {
    let mut grid = BlockSizeGrid::new(8, 8);
    grid.set_block(0, 4, BlockSize::Size8);
    grid.set_block(0, 6, BlockSize::Size8);
    grid.set_block(2, 4, BlockSize::Size8);
    for (r, c) in [(2, 6), (2, 7), (3, 6), (3, 7)] {
      grid.set_block(r, c, BlockSize::Size4);
    }
    grid
  }

  fn transformed_plane(grid: &BlockSizeGrid, dec: usize, f: impl Fn(usize, usize) -> i32) -> Array2D<i32> {
    let mut plane = Array2D::new_with((grid.rows4() * 4) >> dec, (grid.cols4() * 4) >> dec, f);
    for mb_row in 0 .. grid.mb_rows() {
      for mb_col in 0 .. grid.mb_cols() {
        for block in grid.mb_blocks(dec, mb_row, mb_col) {
          let n = block.size.len();
          forward_transform(block.size, &mut plane.block_mut(block.row4 * 4, block.col4 * 4, n, n));
        }
      }
    }
    plane
  }

  #[test]
  fn cache_of_flat_luma_is_flat() {
    let grid = mixed_grid();
    let luma = transformed_plane(&grid, 0, |_, _| 5);
    let cache = LumaCache::build(&luma, &grid, 1).unwrap();
    assert_eq!(cache.coeffs().rows(), 16);
    let coeffs = cache.coeffs();
    // A single 8x8 chroma block under a 16x16 luma block
    assert_eq!(coeffs[0][0], 5 * 64);
    assert_eq!(coeffs[0][1], 0);
    // 4x4 chroma blocks under split luma
    assert_eq!(coeffs[0][8], 5 * 16);
    assert_eq!(coeffs[4][12], 5 * 16);
    assert_eq!(coeffs[1][13], 0);

    // Without subsampling the cache is just the luma coefficients
    let cache = LumaCache::build(&luma, &grid, 0).unwrap();
    assert_eq!(cache.coeffs(), &luma);
  }

  #[test]
  fn fit_recovers_linear_relation() {
    let weights = [8, 2, 2];
    let pairs = [
      ([100, 20, -30], [240, 40, -60]),
      ([-50, 10, 5], [-60, 20, 10]),
      ([300, -7, 12], [640, -14, 24]),
    ];
    assert_eq!(fit(&pairs, &weights), CflParams { alpha_q8: 512, beta: 40 });

    // Steeper slopes are clamped
    let pairs = [([10, 20, 30], [100, 200, 300]), ([-40, 5, 9], [-400, 50, 90])];
    assert_eq!(fit(&pairs, &weights).alpha_q8, CFL_ALPHA_MAX as i32);
  }

  #[test]
  fn flat_luma_falls_back_to_dc_offset() {
    let weights = [8, 1, 1];
    let pairs = [([64, 0, 0], [30, 5, 5]), ([64, 0, 0], [50, -5, 0])];
    assert_eq!(fit(&pairs, &weights), CflParams { alpha_q8: 0, beta: 40 });
    assert_eq!(fit(&[], &weights), CflParams::default());
  }

  #[test]
  fn prediction_uses_neighbours() {
    let grid = BlockSizeGrid::new(4, 8);
    let luma = transformed_plane(&grid, 0, |i, j| (j * 8 + i * 3) as i32 - 80);
    let cache = LumaCache::build(&luma, &grid, 0).unwrap();
    let modes = Array2D::filled(4, 8, IntraMode::Dc);

    // Chroma is exactly the luma coefficients, with DC raised by 100
    let mut chroma = luma.clone();
    chroma[0][0] += 100;
    chroma[0][16] += 100;

    let first = BlockPos { row4: 0, col4: 0, size: BlockSize::Size16 };
    let (pred, params) = predict_cfl(&cache, &chroma, &modes, &grid, first);
    assert_eq!(params, CflParams::default());
    assert_eq!(pred, vec![0; 256]);

    let second = BlockPos { row4: 0, col4: 4, size: BlockSize::Size16 };
    let (pred, params) = predict_cfl(&cache, &chroma, &modes, &grid, second);
    assert_eq!(params, CflParams { alpha_q8: 256, beta: 100 });
    assert_eq!(pred[0], luma[0][16] + 100);
    assert_eq!(pred[1], luma[0][17]);
  }

  #[test]
  fn weights_sum_quadrant_modes() {
    let mut modes = Array2D::filled(4, 4, IntraMode::Dc);
    store_mode(&mut modes, BlockPos { row4: 0, col4: 2, size: BlockSize::Size8 }, IntraMode::Vertical);
    store_mode(&mut modes, BlockPos { row4: 2, col4: 2, size: BlockSize::Size4 }, IntraMode::Horizontal);
    let w = cfl_weights(&modes, 1, BlockPos { row4: 0, col4: 0, size: BlockSize::Size8 });
    assert_eq!(w, [8 + 3 + 8 + 3, 1 + 6 + 1 + 1, 1 + 1 + 1 + 6]);
  }
}
