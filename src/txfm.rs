// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Forward and inverse reversible DCT approximations of sizes 4, 8 and 16
//
// Every N-point transform starts with N/2 "half butterflies"
//   s[i] = x[i] + x[N-1-i],  h[i] = half(s[i]) - x[N-1-i]
// which are undone exactly by
//   x[N-1-i] = half(s[i]) - h[i],  x[i] = s[i] - x[N-1-i]
// The even outputs are the N/2-point transform of s, so the DC output is the
// exact sum of the inputs at every size. The odd outputs come from a network
// of lifting steps over h, each of the form
//   a += round_shift(b * K, shift)
// which the inverse undoes by subtracting the same term, in reverse order.
//
// Range: for inputs of magnitude below 2^20 no intermediate value exceeds
// 2^26 (each butterfly level at most doubles a lane, and the largest lifting
// constant is 41 < 2^6), so all products fit comfortably in an i32.
//
// The 1D functions read and write `buf[k * stride]` for k in 0..N, so the
// same code handles rows (stride 1) and columns (stride = array stride).

use crate::array2d::BlockViewMut;
use crate::consts::*;
use crate::enums::BlockSize;
use crate::util::*;

fn fdct4(buf: &mut [i32], stride: usize) {
  let x0 = buf[0];
  let x1 = buf[stride];
  let x2 = buf[2 * stride];
  let x3 = buf[3 * stride];

  let s0 = x0 + x3;
  let h0 = half(s0) - x3;
  let s1 = x1 + x2;
  let h1 = half(s1) - x2;

  // Embedded 2-point DCT-II of the sums
  let y0 = s0 + s1;
  let y2 = half(y0) - s1;

  // Embedded 2-point DCT-IV of the differences
  let y3 = lift(h0, 13, 5) - h1;
  let y1 = h0 - lift(y3, 11, 5);

  buf[0] = y0;
  buf[stride] = y1;
  buf[2 * stride] = y2;
  buf[3 * stride] = y3;
}

fn idct4(buf: &mut [i32], stride: usize) {
  let y0 = buf[0];
  let y1 = buf[stride];
  let y2 = buf[2 * stride];
  let y3 = buf[3 * stride];

  let h0 = y1 + lift(y3, 11, 5);
  let h1 = lift(h0, 13, 5) - y3;

  let s1 = half(y0) - y2;
  let s0 = y0 - s1;

  let x3 = half(s0) - h0;
  let x2 = half(s1) - h1;
  buf[0] = s0 - x3;
  buf[stride] = s1 - x2;
  buf[2 * stride] = x2;
  buf[3 * stride] = x3;
}

fn fdct8(buf: &mut [i32], stride: usize) {
  let mut s = [0i32; 4];
  let mut h = [0i32; 4];
  for i in 0..4 {
    let a = buf[i * stride];
    let b = buf[(7 - i) * stride];
    s[i] = a + b;
    h[i] = half(s[i]) - b;
  }

  fdct4(&mut s, 1);

  // Embedded 4-point DCT-IV
  let [mut t2, mut t10, mut t6, mut t14] = h;
  t2 -= lift(t14, 19, 6);
  t14 += lift(t2, 9, 4);
  t2 -= lift(t14, 19, 6);
  t10 -= lift(t6, 3, 5);
  t6 += lift(t10, 3, 4);
  t10 -= lift(t6, 3, 5);
  t10 = t14 - t10;
  t14 -= half(t10);
  t6 = t2 - t6;
  t2 -= half(t6);

  buf[0] = s[0];
  buf[stride] = t2 + t14;
  buf[2 * stride] = s[1];
  buf[3 * stride] = t6;
  buf[4 * stride] = s[2];
  buf[5 * stride] = t10;
  buf[6 * stride] = s[3];
  buf[7 * stride] = t2 - t14;
}

fn idct8(buf: &mut [i32], stride: usize) {
  let mut s = [buf[0], buf[2 * stride], buf[4 * stride], buf[6 * stride]];
  idct4(&mut s, 1);

  let y1 = buf[stride];
  let y7 = buf[7 * stride];
  // Exact for coefficients produced by fdct8, where y1 + y7 is even. Other
  // inputs (quantized or corrupt) are floored
  let mut t2 = floor_half(y1 + y7);
  let mut t14 = t2 - y7;
  let mut t6 = buf[3 * stride];
  t2 += half(t6);
  t6 = t2 - t6;
  let mut t10 = buf[5 * stride];
  t14 += half(t10);
  t10 = t14 - t10;
  t10 += lift(t6, 3, 5);
  t6 -= lift(t10, 3, 4);
  t10 += lift(t6, 3, 5);
  t2 += lift(t14, 19, 6);
  t14 -= lift(t2, 9, 4);
  t2 += lift(t14, 19, 6);

  let h = [t2, t10, t6, t14];
  for i in 0..4 {
    let b = half(s[i]) - h[i];
    buf[i * stride] = s[i] - b;
    buf[(7 - i) * stride] = b;
  }
}

fn fdct16(buf: &mut [i32], stride: usize) {
  let mut s = [0i32; 8];
  let mut h = [0i32; 8];
  for i in 0..8 {
    let a = buf[i * stride];
    let b = buf[(15 - i) * stride];
    s[i] = a + b;
    h[i] = half(s[i]) - b;
  }

  fdct8(&mut s, 1);

  // Embedded 8-point DCT-IV
  let [mut t11, mut t5, mut t7, mut t1, mut t15, mut t9, mut t3, mut t13] = h;
  t11 -= lift(t13, 23, 6);
  t13 += lift(t11, 41, 6);
  t11 -= lift(t13, 23, 6);
  t3 -= lift(t5, 19, 5);
  t5 += lift(t3, 7, 3);
  t3 -= lift(t5, 19, 5);
  t7 -= lift(t9, 9, 6);
  t9 += lift(t7, 19, 6);
  t7 -= lift(t9, 9, 6);
  t15 -= lift(t1, 29, 5);
  t1 += t15;
  t15 -= lift(t1, 29, 5);

  t15 = t13 - t15;
  t13 -= half(t15);
  t3 += t9;
  t9 = half(t3) - t9;
  t1 += t11;
  t11 = half(t1) - t11;
  t5 = t7 - t5;
  t7 -= half(t5);

  t13 += half(t5);
  t5 = t13 - t5;
  t11 = half(t3) - t11;
  t3 -= t11;

  t13 += lift(t3, 13, 5);
  let y13 = t13;
  let y3 = lift(t13, 11, 5) - t3;
  t9 += half(t15);
  let y9 = t9;
  t15 = t9 - t15;
  t7 = half(t1) - t7;
  t1 -= t7;
  t15 += t1;
  let y15 = t15;
  let y1 = t1 - half(t15);
  let y7 = t7;
  t5 += lift(t11, 13, 5);
  let y5 = t5;
  let y11 = t11 - lift(t5, 11, 5);

  let odd = [y1, y3, y5, y7, y9, y11, y13, y15];
  for k in 0..8 {
    buf[2 * k * stride] = s[k];
    buf[(2 * k + 1) * stride] = odd[k];
  }
}

fn idct16(buf: &mut [i32], stride: usize) {
  let mut s = [0i32; 8];
  let mut y = [0i32; 8];
  for k in 0..8 {
    s[k] = buf[2 * k * stride];
    y[k] = buf[(2 * k + 1) * stride];
  }
  let [y1, y3, y5, y7, y9, y11, y13, y15] = y;

  idct8(&mut s, 1);

  let mut t5 = y5;
  let mut t11 = y11 + lift(t5, 11, 5);
  t5 -= lift(t11, 13, 5);
  let mut t15 = y15;
  let mut t7 = y7;
  let mut t1 = y1 + half(t15);
  t15 -= t1;
  t1 += t7;
  t7 = half(t1) - t7;
  let mut t9 = y9;
  t15 = t9 - t15;
  t9 -= half(t15);
  let mut t13 = y13;
  let mut t3 = lift(t13, 11, 5) - y3;
  t13 -= lift(t3, 13, 5);

  t3 += t11;
  t11 = half(t3) - t11;
  t5 = t13 - t5;
  t13 -= half(t5);

  t7 += half(t5);
  t5 = t7 - t5;
  t11 = half(t1) - t11;
  t1 -= t11;
  t9 = half(t3) - t9;
  t3 -= t9;
  t13 += half(t15);
  t15 = t13 - t15;

  t15 += lift(t1, 29, 5);
  t1 -= t15;
  t15 += lift(t1, 29, 5);
  t7 += lift(t9, 9, 6);
  t9 -= lift(t7, 19, 6);
  t7 += lift(t9, 9, 6);
  t3 += lift(t5, 19, 5);
  t5 -= lift(t3, 7, 3);
  t3 += lift(t5, 19, 5);
  t11 += lift(t13, 23, 6);
  t13 -= lift(t11, 41, 6);
  t11 += lift(t13, 23, 6);

  let h = [t11, t5, t7, t1, t15, t9, t3, t13];
  for i in 0..8 {
    let b = half(s[i]) - h[i];
    buf[i * stride] = s[i] - b;
    buf[(15 - i) * stride] = b;
  }
}

// In-place 1D forward transform of buf[0], buf[stride], ..., buf[(N-1)*stride]
pub fn forward_transform_1d(size: BlockSize, buf: &mut [i32], stride: usize) {
  match size {
    BlockSize::Size4 => fdct4(buf, stride),
    BlockSize::Size8 => fdct8(buf, stride),
    BlockSize::Size16 => fdct16(buf, stride),
  }
}

pub fn inverse_transform_1d(size: BlockSize, buf: &mut [i32], stride: usize) {
  match size {
    BlockSize::Size4 => idct4(buf, stride),
    BlockSize::Size8 => idct8(buf, stride),
    BlockSize::Size16 => idct16(buf, stride),
  }
}

// 2D transforms over an N x N region whose rows are `stride` apart in `buf`
// Forward: columns, then rows. Inverse: rows, then columns
fn forward_2d(size: BlockSize, buf: &mut [i32], stride: usize) {
  let n = size.len();
  for j in 0..n {
    forward_transform_1d(size, &mut buf[j ..], stride);
  }
  for i in 0..n {
    forward_transform_1d(size, &mut buf[i * stride ..], 1);
  }
}

fn inverse_2d(size: BlockSize, buf: &mut [i32], stride: usize) {
  let n = size.len();
  for i in 0..n {
    inverse_transform_1d(size, &mut buf[i * stride ..], 1);
  }
  for j in 0..n {
    inverse_transform_1d(size, &mut buf[j ..], stride);
  }
}

// Transform a block in place inside a larger array
pub fn forward_transform(size: BlockSize, block: &mut BlockViewMut<i32>) {
  assert!(block.rows() == size.len() && block.cols() == size.len());
  let stride = block.stride();
  forward_2d(size, block.raw_mut(), stride);
}

pub fn inverse_transform(size: BlockSize, block: &mut BlockViewMut<i32>) {
  assert!(block.rows() == size.len() && block.cols() == size.len());
  let stride = block.stride();
  inverse_2d(size, block.raw_mut(), stride);
}

// Transform a contiguous row-major N x N block
pub fn forward_transform_block(size: BlockSize, coeffs: &mut [i32]) {
  assert!(coeffs.len() == size.area());
  forward_2d(size, coeffs, size.len());
}

pub fn inverse_transform_block(size: BlockSize, coeffs: &mut [i32]) {
  assert!(coeffs.len() == size.area());
  inverse_2d(size, coeffs, size.len());
}

pub fn zigzag(size: BlockSize) -> &'static [u8] {
  match size {
    BlockSize::Size4 => &ZIG4,
    BlockSize::Size8 => &ZIG8,
    BlockSize::Size16 => &ZIG16,
  }
}

// Reorder a row-major coefficient block into frequency scan order
pub fn to_scan_order(size: BlockSize, coeffs: &[i32]) -> Vec<i32> {
  assert!(coeffs.len() == size.area());
  let zig = zigzag(size);
  let mut out = vec![0; coeffs.len()];
  for (i, &c) in coeffs.iter().enumerate() {
    out[zig[i] as usize] = c;
  }
  return out;
}

pub fn from_scan_order(size: BlockSize, scanned: &[i32]) -> Vec<i32> {
  assert!(scanned.len() == size.area());
  let zig = zigzag(size);
  (0 .. scanned.len()).map(|i| scanned[zig[i] as usize]).collect()
}

pub fn dct_scale(size: BlockSize) -> &'static [f64] {
  match size {
    BlockSize::Size4 => &DCT4_SCALE,
    BlockSize::Size8 => &DCT8_SCALE,
    BlockSize::Size16 => &DCT16_SCALE,
  }
}
