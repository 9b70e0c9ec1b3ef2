// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Transform block sizes. Ordered from smallest to largest, so that
// min()/max() pick the finer/coarser size
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockSize {
  Size4 = 0,
  Size8 = 1,
  Size16 = 2
}

impl BlockSize {
  pub const ALL: [BlockSize; 3] = [BlockSize::Size4, BlockSize::Size8, BlockSize::Size16];

  // Width (= height) in samples
  pub fn len(self) -> usize {
    4 << (self as usize)
  }

  // Number of coefficients in a block
  pub fn area(self) -> usize {
    self.len() * self.len()
  }

  // Width in units of 4x4 cells
  pub fn cells(self) -> usize {
    1 << (self as usize)
  }

  pub fn from_len(len: usize) -> Option<BlockSize> {
    match len {
      4 => Some(BlockSize::Size4),
      8 => Some(BlockSize::Size8),
      16 => Some(BlockSize::Size16),
      _ => None
    }
  }

  // One size down, saturating at 4x4
  pub fn split(self) -> BlockSize {
    match self {
      BlockSize::Size16 => BlockSize::Size8,
      _ => BlockSize::Size4
    }
  }

  // The size covering the same area in a plane subsampled by `dec`
  // (0 or 1) in each direction, never smaller than 4x4
  pub fn subsampled(self, dec: usize) -> BlockSize {
    if dec == 0 { self } else { self.split() }
  }
}

// Luma intra prediction modes. Each one is a fixed linear rule over the
// reconstructed coefficients of the upper-left, upper and left neighbours
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntraMode {
  Dc = 0,
  Vertical = 1,
  Horizontal = 2,
  CopyUp = 3,
  CopyLeft = 4,
  CopyUpLeft = 5,
  Average = 6,
  Gradient = 7,
  Cross = 8,
  Smooth = 9
}

pub const INTRA_NMODES: usize = 10;

impl IntraMode {
  pub const ALL: [IntraMode; INTRA_NMODES] = [
    IntraMode::Dc, IntraMode::Vertical, IntraMode::Horizontal, IntraMode::CopyUp,
    IntraMode::CopyLeft, IntraMode::CopyUpLeft, IntraMode::Average, IntraMode::Gradient,
    IntraMode::Cross, IntraMode::Smooth
  ];

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn from_index(index: usize) -> Option<IntraMode> {
    IntraMode::ALL.get(index).copied()
  }
}

// Where a stream is in the header -> data -> end sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketState {
  AwaitingHeader,
  AwaitingData,
  Done
}
