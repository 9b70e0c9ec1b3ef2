// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Block size selection and signalling
//
// Sizes are stored per luma 4x4 cell. Each 16x16 luma macroblock is either a
// single 16x16 block, or is split into four 8x8 quadrants, each of which is
// either a single 8x8 block or four 4x4 blocks. Subsampled planes use the
// co-located luma size halved (but never below 4x4), so their blocks always
// line up with the luma blocks.

use log::debug;

use crate::array2d::Array2D;
use crate::config::PartitionMode;
use crate::consts::*;
use crate::entropycode::{SymbolReader, SymbolWriter};
use crate::enums::BlockSize;
use crate::error::Result;

// Macroblock size in luma samples, and in luma 4x4 cells
pub const MB_SIZE: usize = 16;
pub const MB_CELLS: usize = 4;

// One plane cell's position and the size of the block starting there
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPos {
  pub row4: usize,
  pub col4: usize,
  pub size: BlockSize
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockSizeGrid {
  // Includes a one cell border on each side, which always reads as 16x16
  cells: Array2D<BlockSize>,
  rows4: usize,
  cols4: usize
}

impl BlockSizeGrid {
  // A grid of 16x16 blocks covering rows4 x cols4 luma cells
  // Both dimensions must be whole macroblocks
  pub fn new(rows4: usize, cols4: usize) -> Self {
    assert!(rows4 % MB_CELLS == 0 && cols4 % MB_CELLS == 0);
    Self {
      cells: Array2D::filled(rows4 + 2, cols4 + 2, BlockSize::Size16),
      rows4: rows4,
      cols4: cols4
    }
  }

  pub fn rows4(&self) -> usize {
    self.rows4
  }

  pub fn cols4(&self) -> usize {
    self.cols4
  }

  pub fn mb_rows(&self) -> usize {
    self.rows4 / MB_CELLS
  }

  pub fn mb_cols(&self) -> usize {
    self.cols4 / MB_CELLS
  }

  // Size of the luma block covering cell (row4, col4)
  // Positions one cell outside the grid are valid and read as 16x16
  pub fn luma_size(&self, row4: isize, col4: isize) -> BlockSize {
    assert!(row4 >= -1 && col4 >= -1);
    self.cells[(row4 + 1) as usize][(col4 + 1) as usize]
  }

  // Size of the block covering cell (row4, col4) of a plane which is
  // subsampled by `dec` in both directions
  pub fn size_at(&self, dec: usize, row4: usize, col4: usize) -> BlockSize {
    self.cells[(row4 << dec) + 1][(col4 << dec) + 1].subsampled(dec)
  }

  pub fn set_block(&mut self, row4: usize, col4: usize, size: BlockSize) {
    let n = size.cells();
    assert!(row4 % n == 0 && col4 % n == 0);
    self.cells.fill_region(row4 + 1, col4 + 1, n, n, &size);
  }

  // The blocks of one macroblock in a plane subsampled by `dec`, in the order
  // they are coded: a z-order walk through the quadtree
  pub fn mb_blocks(&self, dec: usize, mb_row: usize, mb_col: usize) -> Vec<BlockPos> {
    let cells = MB_CELLS >> dec;
    let mut out = Vec::with_capacity(cells * cells);
    self.collect_blocks(dec, mb_row * cells, mb_col * cells, BlockSize::Size16.subsampled(dec), &mut out);
    return out;
  }

  fn collect_blocks(&self, dec: usize, row4: usize, col4: usize, size: BlockSize, out: &mut Vec<BlockPos>) {
    if self.size_at(dec, row4, col4) >= size {
      out.push(BlockPos { row4: row4, col4: col4, size: size });
      return;
    }
    let half = size.cells() / 2;
    let sub = size.split();
    for (dy, dx) in [(0, 0), (0, half), (half, 0), (half, half)] {
      self.collect_blocks(dec, row4 + dy, col4 + dx, sub, out);
    }
  }

  // Number of luma blocks of each size
  pub fn histogram(&self) -> [usize; 3] {
    let mut counts = [0; 3];
    for mb_row in 0 .. self.mb_rows() {
      for mb_col in 0 .. self.mb_cols() {
        for block in self.mb_blocks(0, mb_row, mb_col) {
          counts[block.size as usize] += 1;
        }
      }
    }
    return counts;
  }

  pub fn encode<W: SymbolWriter>(&self, w: &mut W) {
    for mb_row in 0 .. self.mb_rows() {
      for mb_col in 0 .. self.mb_cols() {
        let row4 = mb_row * MB_CELLS;
        let col4 = mb_col * MB_CELLS;
        let split16 = self.size_at(0, row4, col4) != BlockSize::Size16;
        w.encode_symbol(split16 as usize, &SPLIT16_CDF);
        if !split16 {
          continue;
        }
        for (dy, dx) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
          let split8 = self.size_at(0, row4 + dy, col4 + dx) == BlockSize::Size4;
          w.encode_symbol(split8 as usize, &SPLIT8_CDF);
        }
      }
    }
  }

  pub fn decode<R: SymbolReader>(r: &mut R, rows4: usize, cols4: usize) -> Result<Self> {
    let mut grid = Self::new(rows4, cols4);
    for mb_row in 0 .. grid.mb_rows() {
      for mb_col in 0 .. grid.mb_cols() {
        let row4 = mb_row * MB_CELLS;
        let col4 = mb_col * MB_CELLS;
        if r.decode_symbol(&SPLIT16_CDF)? == 0 {
          continue;
        }
        for (dy, dx) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
          if r.decode_symbol(&SPLIT8_CDF)? == 0 {
            grid.set_block(row4 + dy, col4 + dx, BlockSize::Size8);
          } else {
            for (ey, ex) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
              grid.set_block(row4 + dy + ey, col4 + dx + ex, BlockSize::Size4);
            }
          }
        }
      }
    }
    Ok(grid)
  }
}

// Sample variance of an n x n region, rounded down
fn region_variance(pixels: &Array2D<u8>, y0: usize, x0: usize, n: usize) -> u32 {
  let mut sum = 0u32;
  let mut sum_sq = 0u32;
  for i in 0..n {
    for &p in &pixels[y0 + i][x0 .. x0 + n] {
      sum += p as u32;
      sum_sq += (p as u32) * (p as u32);
    }
  }
  let count = (n * n) as u32;
  (sum_sq - sum * sum / count) / count
}

// Choose block sizes for a padded luma plane
pub fn decide_partition(luma: &Array2D<u8>, mode: PartitionMode) -> BlockSizeGrid {
  let mut grid = BlockSizeGrid::new(luma.rows() / 4, luma.cols() / 4);

  for mb_row in 0 .. grid.mb_rows() {
    for mb_col in 0 .. grid.mb_cols() {
      let row4 = mb_row * MB_CELLS;
      let col4 = mb_col * MB_CELLS;
      match mode {
        PartitionMode::Fixed(BlockSize::Size16) => {}
        PartitionMode::Fixed(size) => {
          let n = size.cells();
          for dy in (0 .. MB_CELLS).step_by(n) {
            for dx in (0 .. MB_CELLS).step_by(n) {
              grid.set_block(row4 + dy, col4 + dx, size);
            }
          }
        }
        PartitionMode::Adaptive { split16, split8 } => {
          if region_variance(luma, row4 * 4, col4 * 4, MB_SIZE) <= split16 {
            continue;
          }
          for (dy, dx) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
            let (r, c) = (row4 + dy, col4 + dx);
            if region_variance(luma, r * 4, c * 4, 8) <= split8 {
              grid.set_block(r, c, BlockSize::Size8);
            } else {
              for (ey, ex) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                grid.set_block(r + ey, c + ex, BlockSize::Size4);
              }
            }
          }
        }
      }
    }
  }

  let counts = grid.histogram();
  debug!("Partition: {} blocks of 16x16, {} of 8x8, {} of 4x4", counts[2], counts[1], counts[0]);
  return grid;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entropycode::{SymbolStream, SymbolStreamReader};

  fn mixed_grid() -> BlockSizeGrid {
    // MB (0, 0): 16x16
    // MB (0, 1): quadrants 8, 4x4, 8, 8
    let mut grid = BlockSizeGrid::new(4, 8);
    grid.set_block(0, 4, BlockSize::Size8);
    for (r, c) in [(0, 6), (0, 7), (1, 6), (1, 7)] {
      grid.set_block(r, c, BlockSize::Size4);
    }
    grid.set_block(2, 4, BlockSize::Size8);
    grid.set_block(2, 6, BlockSize::Size8);
    grid
  }

  #[test]
  fn blocks_are_listed_in_z_order() {
    let grid = mixed_grid();
    assert_eq!(grid.mb_blocks(0, 0, 0), vec![BlockPos { row4: 0, col4: 0, size: BlockSize::Size16 }]);

    let sizes: Vec<(usize, usize, usize)> = grid.mb_blocks(0, 0, 1).iter()
      .map(|b| (b.row4, b.col4, b.size.len())).collect();
    assert_eq!(sizes, vec![(0, 4, 8), (0, 6, 4), (0, 7, 4), (1, 6, 4), (1, 7, 4), (2, 4, 8), (2, 6, 8)]);
  }

  #[test]
  fn subsampled_planes_follow_luma() {
    let grid = mixed_grid();
    assert_eq!(grid.size_at(1, 0, 0), BlockSize::Size8);
    assert_eq!(grid.size_at(1, 0, 2), BlockSize::Size4);
    assert_eq!(grid.size_at(1, 0, 3), BlockSize::Size4);
    assert_eq!(grid.mb_blocks(1, 0, 0).len(), 1);
    assert_eq!(grid.mb_blocks(1, 0, 1).len(), 4);
    // The border reads as the largest size
    assert_eq!(grid.luma_size(-1, 5), BlockSize::Size16);
    assert_eq!(grid.luma_size(4, 8), BlockSize::Size16);
    assert_eq!(grid.histogram(), [4, 3, 1]);
  }

  #[test]
  fn sizes_survive_coding() {
    let grid = mixed_grid();
    let mut w = SymbolStream::new();
    grid.encode(&mut w);
    // One split flag per macroblock, plus four quadrant flags for the split one
    assert_eq!(w.num_values(), 6);
    let data = w.finalize();

    let mut r = SymbolStreamReader::new(&data);
    let decoded = BlockSizeGrid::decode(&mut r, 4, 8).unwrap();
    assert!(r.finish().is_ok());
    assert_eq!(decoded, grid);
  }

  #[test]
  fn flat_areas_keep_large_blocks() {
    let mut luma = Array2D::<u8>::filled(32, 32, 100);
    // Noise in the lower right macroblock only
    luma.fill_with(|i, j| if i >= 16 && j >= 16 { ((i * 37 + j * 91) % 7 * 30) as u8 } else { 100 });
    let grid = decide_partition(&luma, PartitionMode::Adaptive { split16: 40, split8: 40 });
    assert_eq!(grid.size_at(0, 0, 0), BlockSize::Size16);
    assert_eq!(grid.size_at(0, 0, 4), BlockSize::Size16);
    assert_eq!(grid.size_at(0, 4, 0), BlockSize::Size16);
    assert_eq!(grid.size_at(0, 4, 4), BlockSize::Size4);

    let fixed = decide_partition(&luma, PartitionMode::Fixed(BlockSize::Size8));
    assert_eq!(fixed.histogram(), [0, 16, 0]);
  }
}
