// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Small integer helpers shared by the transform, filter and prediction code.
//
// The transform and filter code does its rounding through the helpers
// below, so that the behaviour for negative inputs is written down in one
// place. Rust's `>>` on signed integers is an arithmetic shift, ie. it
// rounds toward negative infinity.

use std::io;
use std::io::prelude::*;

use byteorder::{ReadBytesExt, WriteBytesExt};

pub fn clamp<T: PartialOrd>(value: T, low: T, high: T) -> T {
  if value < low {
    low
  } else if value > high {
    high
  } else {
    value
  }
}

// floor((value + 2^(shift-1)) / 2^shift), ie. round to nearest with halves
// rounded toward positive infinity. This holds for negative values too:
// round_shift(-3, 1) == -1, round_shift(-5, 1) == -2
pub fn round_shift(value: i32, shift: u32) -> i32 {
  debug_assert!(shift > 0 && shift < 31);
  (value + (1 << (shift - 1))) >> shift
}

// One lifting update term: round_shift(value * mul, shift)
pub fn lift(value: i32, mul: i32, shift: u32) -> i32 {
  round_shift(value * mul, shift)
}

// value / 2, rounding exact halves to the nearest even number.
// Unlike round_shift(value, 1), this has no bias between positive and
// negative inputs: half(1) == 0, half(3) == 2, half(-1) == 0, half(-3) == -2
pub fn half(value: i32) -> i32 {
  (value + ((value >> 1) & 1)) >> 1
}

// value / 2 rounded toward negative infinity
pub fn floor_half(value: i32) -> i32 {
  value >> 1
}

// Multiply by mul / 2^shift (rounding down), then add one to positive results.
// Paired with unscale() this is exactly invertible as long as mul < 2^shift * 2
// and mul > 2^shift, ie. the scale factor lies strictly between 1 and 2
pub fn scale_up(value: i32, mul: i32, shift: u32) -> i32 {
  let scaled = (value * mul) >> shift;
  if scaled > 0 { scaled + 1 } else { scaled }
}

// Inverse of scale_up(): multiply by 2^shift / mul, truncating toward zero
pub fn unscale(value: i32, mul: i32, shift: u32) -> i32 {
  (value << shift) / mul
}

// Integer division rounding to nearest, halves away from zero
pub fn div_round(num: i64, den: i64) -> i64 {
  assert!(den > 0);
  if num >= 0 {
    (num + den / 2) / den
  } else {
    -((-num + den / 2) / den)
  }
}

// Number of bits needed to represent `value`, ie. floor(log2(value)) + 1 for
// value > 0, and 0 for value == 0
pub fn ilog(value: u32) -> u32 {
  32 - value.leading_zeros()
}

// log2(value) in Q4 fixed point, using the top 4 fractional bits of the
// mantissa as a linear approximation. Returns 0 for value == 0
pub fn log2_q4(value: u32) -> u32 {
  if value == 0 {
    return 0;
  }
  let whole = ilog(value) - 1;
  let frac = if whole >= 4 {
    (value >> (whole - 4)) & 15
  } else {
    (value << (4 - whole)) & 15
  };
  return 16 * whole + frac;
}

// Write a value in LEB128 format: each byte carries 7 bits of the value plus
// a flag bit saying whether more bytes follow. Least significant group first
pub fn write_leb128<W: Write>(w: &mut W, mut value: u64) -> io::Result<()> {
  if value == 0 {
    return w.write_u8(0);
  }

  while value != 0 {
    let more_flag = if (value >> 7) > 0 { 0x80 } else { 0x00 };
    w.write_u8(more_flag | (value & 0x7F) as u8)?;
    value >>= 7;
  }
  Ok(())
}

// Read a LEB128 value written by write_leb128()
// Returns InvalidData if the value does not fit in 64 bits
pub fn read_leb128<R: Read>(r: &mut R) -> io::Result<u64> {
  let mut value = 0u64;
  let mut shift = 0;
  loop {
    let byte = r.read_u8()?;
    if shift >= 64 || (shift == 63 && (byte & 0x7E) != 0) {
      return Err(io::Error::new(io::ErrorKind::InvalidData, "LEB128 value overflows 64 bits"));
    }
    value |= ((byte & 0x7F) as u64) << shift;
    if byte & 0x80 == 0 {
      return Ok(value);
    }
    shift += 7;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_shift_rounds_halves_up() {
    assert_eq!(round_shift(3, 1), 2);
    assert_eq!(round_shift(-3, 1), -1);
    assert_eq!(round_shift(-5, 1), -2);
    assert_eq!(round_shift(-6, 2), -1);
    assert_eq!(round_shift(7, 3), 1);
    assert_eq!(round_shift(-12, 3), -1);
  }

  #[test]
  fn half_is_unbiased() {
    assert_eq!(half(1), 0);
    assert_eq!(half(3), 2);
    assert_eq!(half(-1), 0);
    assert_eq!(half(-3), -2);
    assert_eq!(half(10), 5);
    assert_eq!(half(-10), -5);
  }

  #[test]
  fn scale_up_is_inverted_by_unscale() {
    for value in -5000..5000 {
      for &(mul, shift) in &[(5, 2), (23, 4), (3, 1), (19, 4), (89, 6), (17, 4)] {
        assert_eq!(unscale(scale_up(value, mul, shift), mul, shift), value);
      }
    }
  }

  #[test]
  fn div_round_is_symmetric() {
    assert_eq!(div_round(5, 2), 3);
    assert_eq!(div_round(-5, 2), -3);
    assert_eq!(div_round(4, 3), 1);
    assert_eq!(div_round(-4, 3), -1);
  }

  #[test]
  fn log2_q4_matches_powers_of_two() {
    assert_eq!(log2_q4(1), 0);
    assert_eq!(log2_q4(2), 16);
    assert_eq!(log2_q4(3), 24);
    assert_eq!(log2_q4(1024), 160);
    assert_eq!(ilog(0), 0);
    assert_eq!(ilog(255), 8);
  }

  #[test]
  fn leb128_round_trip() {
    let values = [0u64, 1, 127, 128, 300, 1 << 35, u64::MAX];
    let mut buf = Vec::new();
    for &v in &values {
      write_leb128(&mut buf, v).unwrap();
    }
    let mut r = &buf[..];
    for &v in &values {
      assert_eq!(read_leb128(&mut r).unwrap(), v);
    }
    assert!(r.is_empty());
  }
}
