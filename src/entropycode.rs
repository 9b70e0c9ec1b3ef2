// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Entropy coder interface
//
// The traversal code only ever talks to the entropy coder through these two
// traits. Each call carries the full model used for that value (the CDF, the
// bit count or the running expectation), and the decoder side must be driven
// with exactly the same sequence of models as the encoder side.
//
// CDFs are cumulative frequencies: cdf[i] is the total frequency of symbols
// 0..=i, so the alphabet size is cdf.len() and the total is the last entry.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use crate::error::{Error, Result};
use crate::util::*;

pub trait SymbolWriter {
  fn encode_symbol(&mut self, symbol: usize, cdf: &[u32]);
  fn encode_bits(&mut self, value: u32, nbits: u32);
  // Code an unbounded integer whose expected value (Q8) is `ex_q8`.
  // The expectation is then moved towards `value`
  fn encode_integer(&mut self, value: u32, ex_q8: &mut i32);
}

pub trait SymbolReader {
  fn decode_symbol(&mut self, cdf: &[u32]) -> Result<usize>;
  fn decode_bits(&mut self, nbits: u32) -> Result<u32>;
  fn decode_integer(&mut self, ex_q8: &mut i32) -> Result<u32>;
}

// Frequency of `symbol` under a cumulative distribution
pub fn symbol_frequency(cdf: &[u32], symbol: usize) -> u32 {
  let low = if symbol == 0 { 0 } else { cdf[symbol - 1] };
  cdf[symbol] - low
}

// Approximate cost in 1/16ths of a bit of coding `symbol` with `cdf`
pub fn symbol_cost_q4(cdf: &[u32], symbol: usize) -> u32 {
  let total = cdf[cdf.len() - 1];
  log2_q4(total) - log2_q4(symbol_frequency(cdf, symbol))
}

// Shared expectation update for encode_integer() / decode_integer()
pub fn update_expectation(ex_q8: &mut i32, value: u32) {
  let target = (value.min(1 << 20) as i32) << 8;
  *ex_q8 += (target - *ex_q8) >> 2;
}

fn check_cdf(cdf: &[u32]) {
  assert!(!cdf.is_empty() && cdf.len() <= 256);
  assert!(cdf.windows(2).all(|w| w[0] <= w[1]));
  assert!(cdf[cdf.len() - 1] > 0);
}

const TAG_SYMBOL: u8 = 0;
const TAG_BITS: u8 = 1;
const TAG_INTEGER: u8 = 2;

// A lossless stand-in for an arithmetic coder
// Every value is stored verbatim next to the model it was coded with, so that
// the reader can detect any divergence between the two sides
pub struct SymbolStream {
  data: Vec<u8>,
  num_values: usize,
  cost_q4: u64
}

impl SymbolStream {
  pub fn new() -> Self {
    Self {
      data: Vec::new(),
      num_values: 0,
      cost_q4: 0
    }
  }

  pub fn num_values(&self) -> usize {
    self.num_values
  }

  // Estimated size in bits that a real entropy coder would need for the
  // values written so far
  pub fn estimated_bits(&self) -> u64 {
    (self.cost_q4 + 15) >> 4
  }

  pub fn finalize(self) -> Box<[u8]> {
    trace!("Symbol stream: {} values, {} bytes, ~{} bits estimated",
           self.num_values, self.data.len(), self.estimated_bits());
    self.data.into_boxed_slice()
  }

  // Writes into a Vec cannot fail
  fn put_u8(&mut self, value: u8) {
    self.data.push(value);
  }

  fn put_i32(&mut self, value: i32) {
    let _ = self.data.write_i32::<LittleEndian>(value);
  }

  fn put_leb128(&mut self, value: u64) {
    let _ = write_leb128(&mut self.data, value);
  }
}

impl SymbolWriter for SymbolStream {
  fn encode_symbol(&mut self, symbol: usize, cdf: &[u32]) {
    check_cdf(cdf);
    assert!(symbol < cdf.len() && symbol_frequency(cdf, symbol) > 0,
            "Symbol {} has no probability under the given CDF", symbol);

    self.put_u8(TAG_SYMBOL);
    self.put_u8((cdf.len() - 1) as u8);
    self.put_leb128(symbol as u64);
    self.num_values += 1;
    self.cost_q4 += symbol_cost_q4(cdf, symbol) as u64;
  }

  fn encode_bits(&mut self, value: u32, nbits: u32) {
    assert!(nbits <= 32);
    assert!(nbits == 32 || value < (1 << nbits));

    self.put_u8(TAG_BITS);
    self.put_u8(nbits as u8);
    self.put_leb128(value as u64);
    self.num_values += 1;
    self.cost_q4 += 16 * nbits as u64;
  }

  fn encode_integer(&mut self, value: u32, ex_q8: &mut i32) {
    self.put_u8(TAG_INTEGER);
    self.put_i32(*ex_q8);
    self.put_leb128(value as u64);
    self.num_values += 1;
    // Roughly an Exp-Golomb code scaled to the expectation
    let scale = ilog((*ex_q8).max(0) as u32 >> 8);
    let cost = 2 * ilog((value >> scale) + 1) + scale;
    self.cost_q4 += 16 * cost as u64;

    update_expectation(ex_q8, value);
  }
}

pub struct SymbolStreamReader<'a> {
  data: &'a [u8],
  num_values: usize
}

impl<'a> SymbolStreamReader<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self {
      data: data,
      num_values: 0
    }
  }

  pub fn num_values(&self) -> usize {
    self.num_values
  }

  // Check that every value in the stream has been consumed
  pub fn finish(&self) -> Result<()> {
    if !self.data.is_empty() {
      return Err(Error::corrupt(format!("{} trailing bytes after value {}", self.data.len(), self.num_values)));
    }
    Ok(())
  }

  fn expect_tag(&mut self, tag: u8) -> Result<()> {
    let found = self.data.read_u8().map_err(Error::from_read)?;
    if found != tag {
      return Err(Error::corrupt(format!("Value {}: expected tag {}, found {}", self.num_values, tag, found)));
    }
    Ok(())
  }

  fn read_value(&mut self) -> Result<u64> {
    read_leb128(&mut self.data).map_err(Error::from_read)
  }
}

impl<'a> SymbolReader for SymbolStreamReader<'a> {
  fn decode_symbol(&mut self, cdf: &[u32]) -> Result<usize> {
    check_cdf(cdf);
    self.expect_tag(TAG_SYMBOL)?;
    let nsyms = self.data.read_u8().map_err(Error::from_read)? as usize + 1;
    if nsyms != cdf.len() {
      return Err(Error::corrupt(format!("Value {}: alphabet size {} does not match {}", self.num_values, nsyms, cdf.len())));
    }
    let symbol = self.read_value()?;
    if symbol >= nsyms as u64 || symbol_frequency(cdf, symbol as usize) == 0 {
      return Err(Error::corrupt(format!("Value {}: impossible symbol {}", self.num_values, symbol)));
    }
    self.num_values += 1;
    Ok(symbol as usize)
  }

  fn decode_bits(&mut self, nbits: u32) -> Result<u32> {
    assert!(nbits <= 32);
    self.expect_tag(TAG_BITS)?;
    let coded_nbits = self.data.read_u8().map_err(Error::from_read)? as u32;
    if coded_nbits != nbits {
      return Err(Error::corrupt(format!("Value {}: bit count {} does not match {}", self.num_values, coded_nbits, nbits)));
    }
    let value = self.read_value()?;
    if value >= (1u64 << nbits) {
      return Err(Error::corrupt(format!("Value {}: {} does not fit in {} bits", self.num_values, value, nbits)));
    }
    self.num_values += 1;
    Ok(value as u32)
  }

  fn decode_integer(&mut self, ex_q8: &mut i32) -> Result<u32> {
    self.expect_tag(TAG_INTEGER)?;
    let coded_ex = self.data.read_i32::<LittleEndian>().map_err(Error::from_read)?;
    if coded_ex != *ex_q8 {
      return Err(Error::corrupt(format!("Value {}: expectation {} does not match {}", self.num_values, coded_ex, *ex_q8)));
    }
    let value = self.read_value()?;
    if value > u32::MAX as u64 {
      return Err(Error::corrupt(format!("Value {}: integer {} out of range", self.num_values, value)));
    }
    self.num_values += 1;
    update_expectation(ex_q8, value as u32);
    Ok(value as u32)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CDF3: [u32; 3] = [100, 100, 300];

  #[test]
  fn values_come_back_in_order() {
    let mut w = SymbolStream::new();
    let mut ex = 512;
    w.encode_symbol(2, &CDF3);
    w.encode_bits(0x2a, 6);
    w.encode_integer(17, &mut ex);
    w.encode_integer(0, &mut ex);
    w.encode_symbol(0, &CDF3);
    assert_eq!(w.num_values(), 5);
    let data = w.finalize();

    let mut r = SymbolStreamReader::new(&data);
    let mut ex = 512;
    assert_eq!(r.decode_symbol(&CDF3).unwrap(), 2);
    assert_eq!(r.decode_bits(6).unwrap(), 0x2a);
    assert_eq!(r.decode_integer(&mut ex).unwrap(), 17);
    assert_eq!(r.decode_integer(&mut ex).unwrap(), 0);
    assert_eq!(r.decode_symbol(&CDF3).unwrap(), 0);
    assert!(r.finish().is_ok());
  }

  #[test]
  fn integer_layout() {
    // Tag, expectation as little-endian i32, then the value as LEB128
    let mut w = SymbolStream::new();
    let mut ex = -2;
    w.encode_integer(300, &mut ex);
    assert_eq!(&w.finalize()[..], &[TAG_INTEGER, 0xfe, 0xff, 0xff, 0xff, 0xac, 0x02]);
  }

  #[test]
  fn model_mismatch_is_corrupt_input() {
    let mut w = SymbolStream::new();
    w.encode_bits(3, 2);
    let data = w.finalize();

    assert!(matches!(SymbolStreamReader::new(&data).decode_bits(3), Err(Error::CorruptInput(_))));
    assert!(matches!(SymbolStreamReader::new(&data).decode_symbol(&CDF3), Err(Error::CorruptInput(_))));

    let mut w = SymbolStream::new();
    let mut ex = 256;
    w.encode_integer(4, &mut ex);
    let data = w.finalize();
    let mut other_ex = 1024;
    assert!(matches!(SymbolStreamReader::new(&data).decode_integer(&mut other_ex), Err(Error::CorruptInput(_))));
  }

  #[test]
  fn truncation_and_trailing_data_are_detected() {
    let mut w = SymbolStream::new();
    w.encode_symbol(1, &[1, 2]);
    w.encode_bits(9, 4);
    let data = w.finalize();

    let mut r = SymbolStreamReader::new(&data[.. data.len() - 1]);
    assert_eq!(r.decode_symbol(&[1, 2]).unwrap(), 1);
    assert!(matches!(r.decode_bits(4), Err(Error::CorruptInput(_))));

    let mut r = SymbolStreamReader::new(&data);
    assert_eq!(r.decode_symbol(&[1, 2]).unwrap(), 1);
    assert!(matches!(r.finish(), Err(Error::CorruptInput(_))));
  }

  #[test]
  fn zero_frequency_symbol_is_rejected() {
    let mut w = SymbolStream::new();
    w.encode_symbol(0, &CDF3);
    let mut data = w.finalize().into_vec();
    // Patch the coded symbol to 1, which has zero frequency
    let last = data.len() - 1;
    data[last] = 1;
    assert!(matches!(SymbolStreamReader::new(&data).decode_symbol(&CDF3), Err(Error::CorruptInput(_))));
  }

  #[test]
  fn cost_estimate_follows_probabilities() {
    assert_eq!(symbol_cost_q4(&[16, 32], 0), 16);
    assert!(symbol_cost_q4(&CDF3, 2) < symbol_cost_q4(&CDF3, 0));

    let mut ex = 0;
    for _ in 0..20 {
      update_expectation(&mut ex, 10);
    }
    assert!((ex - (10 << 8)).abs() < 16);
  }
}
