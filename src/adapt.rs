// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Adaptation of the quantizer's statistics
//
// The expected value of each tracked block statistic is a 2D moving average
// over macroblock positions. For every row it combines:
// * a forward running average along the row (`hmean`),
// * a per-column average carried down from the rows above (`mean`),
// * a backward running average over the finished row, applied at row end,
// which together give a causal filter with a roughly symmetric response.
//
// Values are stored halved, so that an estimate built as
// mean + (hmean >> rate) comes out at full scale.
//
// A per-stream "frame mean" folds in the horizontal average of every finished
// row, and is used to seed the rows of the next frame.

use crate::consts::*;

// Marks a statistic which was not observed for a block
pub const NO_VALUE: i32 = i32::MIN;

// Statistics observed for one coded block, all in Q8
// Any entry may be NO_VALUE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockStats(pub [i32; ADAPT_NCTXS]);

impl BlockStats {
  pub fn none() -> Self {
    BlockStats([NO_VALUE; ADAPT_NCTXS])
  }
}

// Expected statistics for the next block, all in Q8
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdaptSnapshot(pub [i32; ADAPT_NCTXS]);

impl AdaptSnapshot {
  // The expected pulse count
  pub fn k_q8(&self) -> i32 {
    self.0[ADAPT_K_Q8]
  }

  pub fn sum_ex_q8(&self) -> i32 {
    self.0[ADAPT_SUM_EX_Q8]
  }

  pub fn count_q8(&self) -> i32 {
    self.0[ADAPT_COUNT_Q8]
  }

  pub fn count_ex_q8(&self) -> i32 {
    self.0[ADAPT_COUNT_EX_Q8]
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Column {
  // Halved observation from the current row, or NO_VALUE
  curr: i32,
  mean: i32
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdaptContext {
  rates: [u32; ADAPT_NCTXS],
  frame_mean: [i32; ADAPT_NCTXS],
  hmean: [i32; ADAPT_NCTXS],
  columns: Vec<[Column; ADAPT_NCTXS]>,
  row_observed: [bool; ADAPT_NCTXS]
}

impl AdaptContext {
  // `params` holds the adaptation rate of each statistic, followed by its
  // (halved) initial value. `nhv` is the number of positions in a row
  pub fn new(params: &[i32; 2 * ADAPT_NCTXS], nhv: usize) -> Self {
    assert!(nhv > 0);
    let mut rates = [0u32; ADAPT_NCTXS];
    let mut init = [0i32; ADAPT_NCTXS];
    for i in 0 .. ADAPT_NCTXS {
      assert!(params[i] > 0 && params[i] < 16);
      rates[i] = params[i] as u32;
      init[i] = params[ADAPT_NCTXS + i];
    }
    let mut ctx = Self {
      rates: rates,
      frame_mean: init,
      hmean: init,
      columns: vec![[Column { curr: NO_VALUE, mean: 0 }; ADAPT_NCTXS]; nhv],
      row_observed: [false; ADAPT_NCTXS]
    };
    ctx.begin_frame();
    return ctx;
  }

  pub fn with_defaults(nhv: usize) -> Self {
    Self::new(&ADAPT_PARAMS, nhv)
  }

  pub fn nhv(&self) -> usize {
    self.columns.len()
  }

  pub fn frame_mean(&self) -> [i32; ADAPT_NCTXS] {
    self.frame_mean
  }

  // Reset the column averages from the frame mean
  pub fn begin_frame(&mut self) {
    for column in self.columns.iter_mut() {
      for i in 0 .. ADAPT_NCTXS {
        let fm = self.frame_mean[i];
        column[i].mean = 2 * fm - (fm >> self.rates[i]);
        column[i].curr = NO_VALUE;
      }
    }
  }

  pub fn begin_row(&mut self) {
    self.hmean = self.frame_mean;
    self.row_observed = [false; ADAPT_NCTXS];
    for column in self.columns.iter_mut() {
      for cell in column.iter_mut() {
        cell.curr = NO_VALUE;
      }
    }
  }

  // Expected statistics at row position `xpos`
  pub fn snapshot(&self, xpos: usize) -> AdaptSnapshot {
    let column = &self.columns[xpos];
    let mut means = [0i32; ADAPT_NCTXS];
    for i in 0 .. ADAPT_NCTXS {
      means[i] = column[i].mean + (self.hmean[i] >> self.rates[i]);
    }
    AdaptSnapshot(means)
  }

  // Feed in the statistics of a block coded at row position `xpos`
  pub fn update(&mut self, xpos: usize, stats: &BlockStats) {
    let column = &mut self.columns[xpos];
    for i in 0 .. ADAPT_NCTXS {
      if stats.0[i] == NO_VALUE {
        continue;
      }
      let rate = self.rates[i];
      let curr = stats.0[i] >> 1;
      column[i].curr = curr;
      self.hmean[i] += (curr - self.hmean[i]) >> rate;
      column[i].mean += (self.hmean[i] - column[i].mean) >> rate;
      self.row_observed[i] = true;
    }
  }

  // Finish a row: fold it into the frame mean, then run the backward pass
  pub fn end_row(&mut self) {
    for i in 0 .. ADAPT_NCTXS {
      if self.row_observed[i] {
        self.frame_mean[i] += (self.hmean[i] - self.frame_mean[i]) >> ADAPT_FRAME_RATE;
      }
    }

    let mut bmean = self.frame_mean;
    for column in self.columns.iter_mut().rev() {
      for i in 0 .. ADAPT_NCTXS {
        if column[i].curr == NO_VALUE {
          continue;
        }
        let rate = self.rates[i];
        column[i].mean += (bmean[i] >> rate) - (bmean[i] >> (2 * rate));
        bmean[i] += (column[i].curr - bmean[i]) >> rate;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stats(v: i32) -> BlockStats {
    BlockStats([v; ADAPT_NCTXS])
  }

  #[test]
  fn initial_snapshot_is_twice_the_seed() {
    let ctx = AdaptContext::with_defaults(3);
    for xpos in 0..3 {
      let snap = ctx.snapshot(xpos);
      assert_eq!(snap.k_q8(), 512);
      assert_eq!(snap.sum_ex_q8(), 768);
      assert_eq!(snap.count_q8(), 512);
      assert_eq!(snap.count_ex_q8(), 1024);
    }
  }

  #[test]
  fn estimates_converge_to_observations() {
    let mut ctx = AdaptContext::with_defaults(4);
    for _ in 0..40 {
      ctx.begin_row();
      for xpos in 0..4 {
        ctx.update(xpos, &stats(3000));
      }
      ctx.end_row();
    }
    ctx.begin_row();
    let snap = ctx.snapshot(2);
    for v in snap.0 {
      assert!((v - 3000).abs() < 150, "estimate {} too far from 3000", v);
    }
  }

  #[test]
  fn missing_values_leave_state_alone() {
    let mut a = AdaptContext::with_defaults(2);
    let b = a.clone();
    a.begin_row();
    a.update(1, &BlockStats::none());
    a.end_row();
    assert_eq!(a.snapshot(0), b.snapshot(0));
    assert_eq!(a.snapshot(1), b.snapshot(1));
    assert_eq!(a.frame_mean(), b.frame_mean());

    let mut partial = BlockStats::none();
    partial.0[ADAPT_K_Q8] = 0;
    a.begin_row();
    a.update(0, &partial);
    assert!(a.snapshot(0).k_q8() < b.snapshot(0).k_q8());
    assert_eq!(a.snapshot(0).count_ex_q8(), b.snapshot(0).count_ex_q8());
  }

  #[test]
  fn identical_inputs_give_identical_state() {
    let mut a = AdaptContext::with_defaults(5);
    let mut b = AdaptContext::with_defaults(5);
    for row in 0..6 {
      a.begin_row();
      b.begin_row();
      for xpos in 0..5 {
        let s = BlockStats([row * 100 + xpos as i32 * 7, NO_VALUE, 256 * (xpos as i32 % 3), 1024]);
        assert_eq!(a.snapshot(xpos), b.snapshot(xpos));
        a.update(xpos, &s);
        b.update(xpos, &s);
      }
      a.end_row();
      b.end_row();
    }
    assert_eq!(a, b);

    // The frame mean carries over into the next frame
    let fresh = AdaptContext::with_defaults(5);
    a.begin_frame();
    assert_ne!(a.frame_mean(), fresh.frame_mean());
    assert_ne!(a.snapshot(0), fresh.snapshot(0));
  }
}
