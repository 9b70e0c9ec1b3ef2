// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Residual coding
//
// A quantizer turns a residual coefficient block into symbols and back, and
// reports statistics of what it coded so that the adaptation context can
// predict the next block. Both directions must report identical statistics
// for the same block.

use crate::adapt::{AdaptSnapshot, BlockStats, NO_VALUE};
use crate::consts::*;
use crate::entropycode::{SymbolReader, SymbolWriter};
use crate::enums::BlockSize;
use crate::error::{Error, Result};
use crate::txfm::{from_scan_order, to_scan_order};

// The reconstructed (dequantized) residual, in natural order, and the
// statistics of the coded pulses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantizedBlock {
  pub residual: Vec<i32>,
  pub stats: BlockStats
}

pub trait PulseQuantizer {
  fn encode_block<W: SymbolWriter>(&self, w: &mut W, size: BlockSize, residual: &[i32],
                                   snapshot: &AdaptSnapshot) -> QuantizedBlock;
  fn decode_block<R: SymbolReader>(&self, r: &mut R, size: BlockSize,
                                   snapshot: &AdaptSnapshot) -> Result<QuantizedBlock>;
}

// Largest dequantized coefficient magnitude a stream may carry. Transformed
// 8-bit residuals stay far below this
pub const MAX_COEFF: u32 = 1 << 20;

// Uniform scalar quantizer, coding the total pulse count K followed by
// magnitudes and signs in zig-zag order until all K pulses are placed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarQuantizer {
  step: u32
}

impl ScalarQuantizer {
  pub fn new(step: u32) -> Self {
    assert!(step < (1 << 16));
    Self { step: step.max(1) }
  }

  pub fn step(&self) -> u32 {
    self.step
  }

  pub fn is_lossless(&self) -> bool {
    self.step == 1
  }

  // Round to nearest, halves away from zero
  fn quantize(&self, value: i32) -> i32 {
    if self.step == 1 {
      return value;
    }
    let step = self.step as i32;
    let q = (value.abs() + step / 2) / step;
    if value < 0 { -q } else { q }
  }

  fn dequantize(&self, q: i32) -> i32 {
    q * self.step as i32
  }

  // Largest pulse count of a single coefficient
  fn max_magnitude(&self) -> u32 {
    MAX_COEFF / self.step
  }
}

// Expected magnitude of each coefficient, given the pulse count and the
// expected scan extent
fn magnitude_expectation(k: u32, snapshot: &AdaptSnapshot) -> i32 {
  let extent_q8 = snapshot.count_ex_q8().max(256) as i64;
  (((k.min(1 << 20) as i64) << 16) / extent_q8) as i32
}

// Statistics of a block of quantized values in scan order
pub fn block_stats(scanned: &[i32]) -> BlockStats {
  let mut k = 0i64;
  let mut weighted_pos = 0i64;
  let mut count = 0i32;
  let mut last = None;
  for (pos, &q) in scanned.iter().enumerate() {
    if q != 0 {
      let m = q.abs() as i64;
      k += m;
      weighted_pos += m * pos as i64;
      count += 1;
      last = Some(pos);
    }
  }

  let mut stats = [0i32; ADAPT_NCTXS];
  stats[ADAPT_K_Q8] = (k.min(1 << 20) << 8) as i32;
  stats[ADAPT_SUM_EX_Q8] = if k == 0 { NO_VALUE } else { ((weighted_pos << 8) / k) as i32 };
  stats[ADAPT_COUNT_Q8] = count << 8;
  stats[ADAPT_COUNT_EX_Q8] = match last {
    Some(pos) => ((pos + 1) << 8) as i32,
    None => NO_VALUE
  };
  BlockStats(stats)
}

impl PulseQuantizer for ScalarQuantizer {
  fn encode_block<W: SymbolWriter>(&self, w: &mut W, size: BlockSize, residual: &[i32],
                                   snapshot: &AdaptSnapshot) -> QuantizedBlock {
    assert!(residual.len() == size.area());
    let scanned: Vec<i32> = to_scan_order(size, residual).iter().map(|&v| self.quantize(v)).collect();

    let k: u32 = scanned.iter().map(|q| q.unsigned_abs()).sum();
    let mut k_ex = snapshot.k_q8();
    w.encode_integer(k, &mut k_ex);

    let mut mag_ex = magnitude_expectation(k, snapshot);
    let mut remaining = k;
    for &q in &scanned {
      if remaining == 0 {
        break;
      }
      let m = q.unsigned_abs();
      w.encode_integer(m, &mut mag_ex);
      if m != 0 {
        w.encode_bits((q < 0) as u32, 1);
      }
      remaining -= m;
    }

    let dequantized: Vec<i32> = scanned.iter().map(|&q| self.dequantize(q)).collect();
    QuantizedBlock {
      residual: from_scan_order(size, &dequantized),
      stats: block_stats(&scanned)
    }
  }

  fn decode_block<R: SymbolReader>(&self, r: &mut R, size: BlockSize,
                                   snapshot: &AdaptSnapshot) -> Result<QuantizedBlock> {
    let mut k_ex = snapshot.k_q8();
    let k = r.decode_integer(&mut k_ex)?;
    let max_k = self.max_magnitude() * size.area() as u32;
    if k > max_k {
      return Err(Error::corrupt(format!("Pulse count {} exceeds {} for a {}x{} block", k, max_k, size.len(), size.len())));
    }

    let mut scanned = vec![0i32; size.area()];
    let mut mag_ex = magnitude_expectation(k, snapshot);
    let mut remaining = k;
    for q in scanned.iter_mut() {
      if remaining == 0 {
        break;
      }
      let m = r.decode_integer(&mut mag_ex)?;
      if m > self.max_magnitude() {
        return Err(Error::corrupt(format!("Coefficient magnitude {} out of range for step {}", m, self.step)));
      }
      if m > remaining {
        return Err(Error::corrupt(format!("Coefficient magnitude {} exceeds the {} remaining pulses", m, remaining)));
      }
      remaining -= m;
      if m != 0 {
        let negative = r.decode_bits(1)? != 0;
        *q = if negative { -(m as i32) } else { m as i32 };
      }
    }
    if remaining != 0 {
      return Err(Error::corrupt(format!("{} pulses left over at the end of a {}x{} block",
                                        remaining, size.len(), size.len())));
    }

    let dequantized: Vec<i32> = scanned.iter().map(|&q| self.dequantize(q)).collect();
    Ok(QuantizedBlock {
      residual: from_scan_order(size, &dequantized),
      stats: block_stats(&scanned)
    })
  }
}
