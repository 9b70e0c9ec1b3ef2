// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Intra mode probability model
//
// The probability of each mode is the product of a fixed table entry,
// selected by which of the left / upper-left / upper neighbours used that
// same mode, and a global per-mode prior p0 which adapts over the frame.
// The encoder and decoder build the CDF from the same neighbour modes and
// apply the same p0 update after every coded mode, so they stay in step.

use crate::consts::*;
use crate::enums::{IntraMode, INTRA_NMODES};

// Modes of the blocks touching the current block's top-left corner
// None where the neighbour is outside the plane
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeNeighbors {
  pub left: Option<IntraMode>,
  pub upleft: Option<IntraMode>,
  pub up: Option<IntraMode>
}

impl ModeNeighbors {
  // Context for mode `m`: bit 2 = left matches, bit 1 = upper-left matches,
  // bit 0 = upper matches
  pub fn context(&self, m: IntraMode) -> usize {
    4 * (self.left == Some(m)) as usize
      + 2 * (self.upleft == Some(m)) as usize
      + (self.up == Some(m)) as usize
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeModel {
  // Q15 global prior for each mode
  p0: [u16; INTRA_NMODES]
}

impl ModeModel {
  pub fn new() -> Self {
    Self {
      p0: [INTRA_P0_INIT; INTRA_NMODES]
    }
  }

  pub fn p0(&self) -> &[u16; INTRA_NMODES] {
    &self.p0
  }

  // Cumulative frequencies for the given neighbourhood
  // Every mode keeps a nonzero frequency
  pub fn cdf(&self, neighbors: &ModeNeighbors) -> [u32; INTRA_NMODES] {
    let mut cdf = [0u32; INTRA_NMODES];
    let mut total = 0u32;
    for m in IntraMode::ALL {
      let prob = INTRA_MODE_PROBS[m.index()][neighbors.context(m)] as u32;
      let freq = ((prob * self.p0[m.index()] as u32) >> 7).max(1);
      total += freq;
      cdf[m.index()] = total;
    }
    return cdf;
  }

  // Adapt the prior after coding `chosen`
  // A mode chosen without any neighbour support is evidence that it is
  // globally common, so its prior moves up; all other priors decay
  pub fn update(&mut self, chosen: IntraMode, neighbors: &ModeNeighbors) {
    for m in IntraMode::ALL {
      let target = if m == chosen && neighbors.context(m) == 0 { INTRA_P0_MAX } else { 0 };
      let p0 = self.p0[m.index()] as i32;
      let next = p0 + ((target as i32 - p0) >> INTRA_P0_RATE);
      self.p0[m.index()] = next.max(INTRA_P0_FLOOR as i32) as u16;
    }
  }
}
