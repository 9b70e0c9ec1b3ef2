// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Lapped transform pre- and post-filters
//
// Before the forward transform, every internal block edge is run through a
// pre-filter which straddles the edge: N/2 samples from each side for a
// filter of size N. After the inverse transform the matching post-filter
// undoes it exactly, which hides blocking artifacts in the reconstruction.
//
// Each filter is: a +/-1 butterfly; a diagonal scaling of the odd half,
// where the pre-filter rounds (value * mul) >> shift away from zero and the
// post-filter divides back; a chain of lifting steps over the odd half; and a
// closing butterfly. Every stage is invertible on integers, so
// post_filter(pre_filter(x)) == x. Intermediates stay below 2^26 for inputs
// below 2^20 in magnitude.

use log::trace;

use crate::array2d::Array2D;
use crate::enums::BlockSize;
use crate::partition::{BlockSizeGrid, MB_SIZE};
use crate::util::*;

// t[target] += sign * round_shift(t[source] * mul, shift)
struct Lift {
  target: usize,
  source: usize,
  mul: i32,
  shift: u32,
  negate: bool
}

const fn sub(target: usize, source: usize, mul: i32, shift: u32) -> Lift {
  Lift { target: target, source: source, mul: mul, shift: shift, negate: true }
}

const fn add(target: usize, source: usize, mul: i32, shift: u32) -> Lift {
  Lift { target: target, source: source, mul: mul, shift: shift, negate: false }
}

struct LapFilter {
  // (mul, shift) applied to t[N/2 + k]. Each factor lies in (1, 2)
  scales: &'static [(i32, u32)],
  // Applied in order by the pre-filter, in reverse by the post-filter
  lifts: &'static [Lift]
}

const LAP4: LapFilter = LapFilter {
  scales: &[(5, 2), (23, 4)],
  lifts: &[sub(3, 2, 1, 2), add(2, 3, 11, 4)]
};

const LAP8: LapFilter = LapFilter {
  scales: &[(3, 1), (19, 4), (19, 4), (19, 4)],
  lifts: &[
    sub(5, 4, 3, 3), sub(6, 5, 5, 4), sub(7, 6, 1, 4),
    add(6, 7, 3, 3), add(5, 6, 5, 3), add(4, 5, 13, 4),
  ]
};

const LAP16: LapFilter = LapFilter {
  scales: &[(89, 6), (71, 6), (17, 4), (17, 4), (17, 4), (17, 4), (69, 6), (71, 6)],
  lifts: &[
    sub(15, 14, 3, 5), add(14, 15, 13, 6),
    sub(14, 13, 15, 6), add(13, 14, 3, 3),
    sub(13, 12, 23, 6), add(12, 13, 1, 1),
    sub(12, 11, 15, 5), add(11, 12, 19, 5),
    sub(11, 10, 17, 5), add(10, 11, 43, 6),
    sub(10, 9, 9, 4), add(9, 10, 47, 6),
    sub(9, 8, 15, 5), add(8, 9, 55, 6),
  ]
};

fn lap_filter(size: BlockSize) -> &'static LapFilter {
  match size {
    BlockSize::Size4 => &LAP4,
    BlockSize::Size8 => &LAP8,
    BlockSize::Size16 => &LAP16,
  }
}

// Split x into a low half t[0..n/2] and a high half t[n/2..n]
fn butterfly_in(x: &[i32], t: &mut [i32]) {
  let n = x.len();
  let h = n / 2;
  for i in 0..h {
    t[n - 1 - i] = x[i] - x[n - 1 - i];
  }
  for i in 0..h {
    t[i] = x[i] - floor_half(t[n - 1 - i]);
  }
}

fn butterfly_out(t: &mut [i32], y: &mut [i32]) {
  let n = y.len();
  let h = n / 2;
  for i in 0..h {
    t[i] += floor_half(t[n - 1 - i]);
  }
  for i in 0..h {
    y[i] = t[i];
    y[h + i] = t[h - 1 - i] - t[h + i];
  }
}

fn lift_term(t: &[i32], step: &Lift) -> i32 {
  let term = lift(t[step.source], step.mul, step.shift);
  if step.negate { -term } else { term }
}

// Pre-filter the N samples straddling an edge, in place
pub fn pre_filter(size: BlockSize, x: &mut [i32]) {
  let n = size.len();
  assert!(x.len() == n);
  let filter = lap_filter(size);
  let mut t = [0i32; 16];
  let t = &mut t[.. n];

  butterfly_in(x, t);
  for (k, &(mul, shift)) in filter.scales.iter().enumerate() {
    t[n / 2 + k] = scale_up(t[n / 2 + k], mul, shift);
  }
  for step in filter.lifts {
    let term = lift_term(t, step);
    t[step.target] += term;
  }
  butterfly_out(t, x);
}

// Exact inverse of pre_filter()
pub fn post_filter(size: BlockSize, y: &mut [i32]) {
  let n = size.len();
  assert!(y.len() == n);
  let filter = lap_filter(size);
  let mut t = [0i32; 16];
  let t = &mut t[.. n];

  butterfly_in(y, t);
  for step in filter.lifts.iter().rev() {
    let term = lift_term(t, step);
    t[step.target] -= term;
  }
  for (k, &(mul, shift)) in filter.scales.iter().enumerate() {
    t[n / 2 + k] = unscale(t[n / 2 + k], mul, shift);
  }
  butterfly_out(t, y);
}

// Edge geometry
//
// Edges are handled in segments of one 4x4 cell side. Cell (row4, col4) owns
// the segment along its left side (a "vertical edge") and the one along its
// top (a "horizontal edge"). A segment is filtered if it lies on a block
// boundary and not on the plane boundary, with the smaller of the two
// adjoining block sizes. Blocks are aligned to their size, so no two filter
// windows can overlap.

pub fn vertical_edge(grid: &BlockSizeGrid, dec: usize, row4: usize, col4: usize) -> Option<BlockSize> {
  if col4 == 0 {
    return None;
  }
  let size = grid.size_at(dec, row4, col4);
  if col4 % size.cells() != 0 {
    return None;
  }
  Some(size.min(grid.size_at(dec, row4, col4 - 1)))
}

pub fn horizontal_edge(grid: &BlockSizeGrid, dec: usize, row4: usize, col4: usize) -> Option<BlockSize> {
  if row4 == 0 {
    return None;
  }
  let size = grid.size_at(dec, row4, col4);
  if row4 % size.cells() != 0 {
    return None;
  }
  Some(size.min(grid.size_at(dec, row4 - 1, col4)))
}

fn filter_vertical_edge(plane: &mut Array2D<i32>, row4: usize, col4: usize, size: BlockSize, post: bool) {
  let half = size.len() / 2;
  let x = col4 * 4;
  for y in row4 * 4 .. row4 * 4 + 4 {
    let window = &mut plane[y][x - half .. x + half];
    if post {
      post_filter(size, window);
    } else {
      pre_filter(size, window);
    }
  }
}

fn filter_horizontal_edge(plane: &mut Array2D<i32>, row4: usize, col4: usize, size: BlockSize, post: bool) {
  let n = size.len();
  let y = row4 * 4 - n / 2;
  let mut window = [0i32; 16];
  for x in col4 * 4 .. col4 * 4 + 4 {
    for i in 0..n {
      window[i] = plane[y + i][x];
    }
    if post {
      post_filter(size, &mut window[.. n]);
    } else {
      pre_filter(size, &mut window[.. n]);
    }
    for i in 0..n {
      plane[y + i][x] = window[i];
    }
  }
}

fn plane_cells(plane: &Array2D<i32>, grid: &BlockSizeGrid, dec: usize) -> (usize, usize) {
  let rows4 = plane.rows() / 4;
  let cols4 = plane.cols() / 4;
  assert!(rows4 == grid.rows4() >> dec && cols4 == grid.cols4() >> dec);
  (rows4, cols4)
}

// Pre-filter every block edge of a plane: vertical edges first, then
// horizontal edges
pub fn pre_filter_plane(plane: &mut Array2D<i32>, grid: &BlockSizeGrid, dec: usize) {
  let (rows4, cols4) = plane_cells(plane, grid, dec);
  for row4 in 0 .. rows4 {
    for col4 in 0 .. cols4 {
      if let Some(size) = vertical_edge(grid, dec, row4, col4) {
        filter_vertical_edge(plane, row4, col4, size, false);
      }
    }
  }
  for row4 in 0 .. rows4 {
    for col4 in 0 .. cols4 {
      if let Some(size) = horizontal_edge(grid, dec, row4, col4) {
        filter_horizontal_edge(plane, row4, col4, size, false);
      }
    }
  }
}

// Undo pre_filter_plane() on a whole plane at once
pub fn post_filter_plane(plane: &mut Array2D<i32>, grid: &BlockSizeGrid, dec: usize) {
  let (rows4, cols4) = plane_cells(plane, grid, dec);
  for row4 in 0 .. rows4 {
    for col4 in 0 .. cols4 {
      if let Some(size) = horizontal_edge(grid, dec, row4, col4) {
        filter_horizontal_edge(plane, row4, col4, size, true);
      }
    }
  }
  for row4 in 0 .. rows4 {
    for col4 in 0 .. cols4 {
      if let Some(size) = vertical_edge(grid, dec, row4, col4) {
        filter_vertical_edge(plane, row4, col4, size, true);
      }
    }
  }
}

const HORZ_DONE: u8 = 1;
const VERT_DONE: u8 = 2;

// Tracks how far the post-filter has got while a plane is reconstructed one
// macroblock row at a time
//
// Horizontal edges in a macroblock row can be undone as soon as that row is
// reconstructed, since the row above is already there. Vertical edges must
// wait until every horizontal edge touching their rows has been undone, and
// the next row's top edge reaches up to half a macroblock into this row.
pub struct LapFrontier {
  dec: usize,
  mb_size: usize,
  // Macroblock rows whose horizontal edges have been post-filtered
  inner: usize,
  // Sample rows whose vertical edges have been post-filtered
  outer: usize,
  flags: Array2D<u8>
}

impl LapFrontier {
  pub fn new(rows4: usize, cols4: usize, dec: usize) -> Self {
    Self {
      dec: dec,
      mb_size: MB_SIZE >> dec,
      inner: 0,
      outer: 0,
      flags: Array2D::zeroed(rows4, cols4)
    }
  }

  pub fn inner(&self) -> usize {
    self.inner
  }

  pub fn outer(&self) -> usize {
    self.outer
  }

  // Post-filter everything which has become possible now that macroblock row
  // `mb_row` of `plane` has been reconstructed
  pub fn advance(&mut self, plane: &mut Array2D<i32>, grid: &BlockSizeGrid, mb_row: usize) {
    let (rows4, cols4) = plane_cells(plane, grid, self.dec);
    assert!(self.flags.rows() == rows4 && self.flags.cols() == cols4);
    assert!(mb_row == self.inner, "Macroblock rows must be finished in order");
    let mb_cells = self.mb_size / 4;

    for row4 in mb_row * mb_cells .. (mb_row + 1) * mb_cells {
      for col4 in 0 .. cols4 {
        if let Some(size) = horizontal_edge(grid, self.dec, row4, col4) {
          self.mark(row4, col4, HORZ_DONE);
          filter_horizontal_edge(plane, row4, col4, size, true);
        }
      }
    }
    self.inner += 1;

    let end = if self.inner * mb_cells == rows4 {
      plane.rows()
    } else {
      self.inner * self.mb_size - self.mb_size / 2
    };
    for row4 in self.outer / 4 .. end / 4 {
      for col4 in 0 .. cols4 {
        if let Some(size) = vertical_edge(grid, self.dec, row4, col4) {
          self.mark(row4, col4, VERT_DONE);
          filter_vertical_edge(plane, row4, col4, size, true);
        }
      }
    }
    trace!("Lapping frontier: inner {} outer {} -> {}", self.inner, self.outer, end);
    self.outer = end;
  }

  fn mark(&mut self, row4: usize, col4: usize, flag: u8) {
    let flags = &mut self.flags[row4][col4];
    assert!(*flags & flag == 0, "Edge at cell ({}, {}) filtered twice", row4, col4);
    *flags |= flag;
  }

  // True once every edge of the plane has been post-filtered
  pub fn is_complete(&self, grid: &BlockSizeGrid) -> bool {
    for row4 in 0 .. self.flags.rows() {
      for col4 in 0 .. self.flags.cols() {
        let flags = self.flags[row4][col4];
        if horizontal_edge(grid, self.dec, row4, col4).is_some() && flags & HORZ_DONE == 0 {
          return false;
        }
        if vertical_edge(grid, self.dec, row4, col4).is_some() && flags & VERT_DONE == 0 {
          return false;
        }
      }
    }
    return true;
  }
}
