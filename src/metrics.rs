// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Quality measurements, for logging and for the command line tool

use crate::enums::BlockSize;
use crate::frame::{Frame, Plane};
use crate::txfm::dct_scale;

// PSNR of 8-bit samples, infinite for identical inputs
pub fn psnr(sse: u64, num_samples: usize) -> f64 {
  if sse == 0 {
    return f64::INFINITY;
  }
  let peak = 255.0 * 255.0 * num_samples as f64;
  10.0 * (peak / sse as f64).log10()
}

pub fn plane_psnr(a: &Plane, b: &Plane) -> f64 {
  psnr(a.squared_error(b), a.crop_width() * a.crop_height())
}

// Squared error of each plane over its visible region
pub fn frame_sse(a: &Frame, b: &Frame) -> Vec<u64> {
  assert!(a.num_planes() == b.num_planes());
  a.planes().iter().zip(b.planes()).map(|(pa, pb)| pa.squared_error(pb)).collect()
}

// Energy of a block of transform coefficients, after scaling them to the
// orthonormal DCT basis
pub fn scaled_energy(size: BlockSize, coeffs: &[i32]) -> f64 {
  let n = size.len();
  assert!(coeffs.len() == n * n);
  let scale = dct_scale(size);
  let mut energy = 0.0;
  for i in 0..n {
    for j in 0..n {
      let c = coeffs[i * n + j] as f64 * scale[i] * scale[j];
      energy += c * c;
    }
  }
  return energy;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::StreamInfo;
  use crate::txfm::forward_transform_block;

  #[test]
  fn psnr_values() {
    assert_eq!(psnr(0, 100), f64::INFINITY);
    // Every sample off by one
    assert!((psnr(100, 100) - 48.1308).abs() < 1e-3);
  }

  #[test]
  fn frame_errors_are_per_plane() {
    let info = StreamInfo::yuv420(8, 8);
    let a = Frame::new(&info);
    let mut b = Frame::new(&info);
    b.plane_mut(1).pixels_mut()[0][0] = 3;
    assert_eq!(frame_sse(&a, &b), vec![0, 9, 0]);
    assert_eq!(plane_psnr(a.y(), b.y()), f64::INFINITY);
    assert!(plane_psnr(a.plane(1), b.plane(1)).is_finite());
  }

  #[test]
  fn scaled_energy_matches_sample_energy() {
    let mut block = vec![10; 16];
    forward_transform_block(BlockSize::Size4, &mut block);
    assert_eq!(block[0], 160);
    assert!((scaled_energy(BlockSize::Size4, &block) - 1600.0).abs() < 1e-6);

    let mut block = vec![-3; 256];
    forward_transform_block(BlockSize::Size16, &mut block);
    assert!((scaled_energy(BlockSize::Size16, &block) - 2304.0).abs() < 1.0);
  }
}
