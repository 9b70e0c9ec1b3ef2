// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::enums::INTRA_NMODES;

// Zig-zag scan tables
// The input to these is a natural (row * size + col) coefficient index,
// the output is the position of that coefficient in frequency scan order

pub const ZIG4: [u8; 16] = [
    0,   1,   5,   6,
    2,   4,   7,  12,
    3,   8,  11,  13,
    9,  10,  14,  15,
];

pub const ZIG8: [u8; 64] = [
    0,   1,   5,   6,  14,  15,  27,  28,
    2,   4,   7,  13,  16,  26,  29,  42,
    3,   8,  12,  17,  25,  30,  41,  43,
    9,  11,  18,  24,  31,  40,  44,  53,
   10,  19,  23,  32,  39,  45,  52,  54,
   20,  22,  33,  38,  46,  51,  55,  60,
   21,  34,  37,  47,  50,  56,  59,  61,
   35,  36,  48,  49,  57,  58,  62,  63,
];

pub const ZIG16: [u8; 256] = [
    0,   1,   5,   6,  14,  15,  27,  28,  44,  45,  65,  66,  90,  91, 119, 120,
    2,   4,   7,  13,  16,  26,  29,  43,  46,  64,  67,  89,  92, 118, 121, 150,
    3,   8,  12,  17,  25,  30,  42,  47,  63,  68,  88,  93, 117, 122, 149, 151,
    9,  11,  18,  24,  31,  41,  48,  62,  69,  87,  94, 116, 123, 148, 152, 177,
   10,  19,  23,  32,  40,  49,  61,  70,  86,  95, 115, 124, 147, 153, 176, 178,
   20,  22,  33,  39,  50,  60,  71,  85,  96, 114, 125, 146, 154, 175, 179, 200,
   21,  34,  38,  51,  59,  72,  84,  97, 113, 126, 145, 155, 174, 180, 199, 201,
   35,  37,  52,  58,  73,  83,  98, 112, 127, 144, 156, 173, 181, 198, 202, 219,
   36,  53,  57,  74,  82,  99, 111, 128, 143, 157, 172, 182, 197, 203, 218, 220,
   54,  56,  75,  81, 100, 110, 129, 142, 158, 171, 183, 196, 204, 217, 221, 234,
   55,  76,  80, 101, 109, 130, 141, 159, 170, 184, 195, 205, 216, 222, 233, 235,
   77,  79, 102, 108, 131, 140, 160, 169, 185, 194, 206, 215, 223, 232, 236, 245,
   78, 103, 107, 132, 139, 161, 168, 186, 193, 207, 214, 224, 231, 237, 244, 246,
  104, 106, 133, 138, 162, 167, 187, 192, 208, 213, 225, 230, 238, 243, 247, 252,
  105, 134, 137, 163, 166, 188, 191, 209, 212, 226, 229, 239, 242, 248, 251, 253,
  135, 136, 164, 165, 189, 190, 210, 211, 227, 228, 240, 241, 249, 250, 254, 255,
];

// Per-coefficient factors which convert the output of the 1D integer
// transforms into the orthonormal DCT-II basis. The 2D factor for
// coefficient (i, j) is SCALE[i] * SCALE[j]
// These are only for analysis, reconstruction never uses them
pub const DCT4_SCALE: [f64; 4] = [0.500000, 1.526434, 1.000000, 1.310222];
pub const DCT8_SCALE: [f64; 8] = [
  0.353553, 1.408222, 1.079352, 1.002425, 0.707107, 0.997509, 0.926467, 1.420161
];
pub const DCT16_SCALE: [f64; 16] = [
  0.250000, 1.993644, 0.995764, 1.526842, 0.763217, 1.314274, 0.708821, 1.414848,
  0.500000, 1.413478, 0.705345, 1.521655, 0.655111, 1.309730, 1.004205, 1.003136
];

// Base probabilities (out of 256) for each intra mode, indexed by
// [mode][context], where context bit 2 is set if the left neighbour used the
// same mode, bit 1 for the upper-left neighbour and bit 0 for the upper one
pub const INTRA_MODE_PROBS: [[u8; 8]; INTRA_NMODES] = [
  [ 90, 120, 110, 140, 120, 150, 140, 180], // Dc
  [ 40, 150,  60, 170,  50, 160,  70, 190], // Vertical
  [ 40,  60,  50,  70, 150, 170, 160, 190], // Horizontal
  [ 30, 130,  50, 150,  40, 140,  60, 170], // CopyUp
  [ 30,  40,  50,  60, 130, 140, 150, 170], // CopyLeft
  [ 20,  50, 120, 140,  50,  70, 140, 170], // CopyUpLeft
  [ 50, 100,  70, 120, 100, 150, 120, 180], // Average
  [ 40,  90,  80, 120,  90, 130, 120, 170], // Gradient
  [ 50, 110,  60, 130, 110, 160, 130, 190], // Cross
  [ 60, 100,  90, 130, 100, 140, 130, 180], // Smooth
];

// Global per-mode prior, Q15
pub const INTRA_P0_INIT: u16 = 4096;
pub const INTRA_P0_MAX: u16 = 32767;
pub const INTRA_P0_FLOOR: u16 = 256;
pub const INTRA_P0_RATE: u32 = 4;

// Chroma-from-luma tap weights for each luma mode:
// [DC, first horizontal AC (row 0, col 1), first vertical AC (row 1, col 0)]
pub const CFL_WEIGHTS: [[u8; 3]; INTRA_NMODES] = [
  [8, 1, 1], // Dc
  [3, 6, 1], // Vertical
  [3, 1, 6], // Horizontal
  [4, 4, 2], // CopyUp
  [4, 2, 4], // CopyLeft
  [4, 2, 2], // CopyUpLeft
  [5, 3, 3], // Average
  [3, 3, 3], // Gradient
  [4, 4, 4], // Cross
  [6, 2, 2], // Smooth
];

// Chroma-from-luma slope precision and limits
pub const CFL_ALPHA_BITS: u32 = 8;
pub const CFL_ALPHA_MAX: i64 = 2 << CFL_ALPHA_BITS;
// Below this weighted luma variance (per unit of total weight), the slope is
// not trusted and forced to zero
pub const CFL_MIN_VARIANCE: i64 = 16;

// Block size coding: symbol 0 keeps the size, symbol 1 splits
pub const SPLIT16_CDF: [u32; 2] = [18000, 32768];
pub const SPLIT8_CDF: [u32; 2] = [20000, 32768];

// Adaptation tracker parameters for the four tracked statistics
// (pulse count, mean pulse position, nonzero count, scan extent):
// first the right-shift adaptation rate of each, then its initial value.
// The initial values are half the expected statistic, in Q8
pub const ADAPT_NCTXS: usize = 4;
pub const ADAPT_K_Q8: usize = 0;
pub const ADAPT_SUM_EX_Q8: usize = 1;
pub const ADAPT_COUNT_Q8: usize = 2;
pub const ADAPT_COUNT_EX_Q8: usize = 3;
pub const ADAPT_PARAMS: [i32; 2 * ADAPT_NCTXS] = [
  2, 2, 2, 2,
  256, 384, 256, 512
];
// Shift used to fold finished row means into the per-frame mean
pub const ADAPT_FRAME_RATE: u32 = 2;

// Perceptual weight of coefficient (i, j) in an n x n block, used by intra
// mode decisions: 8 at DC falling to 1 at the highest frequencies
pub const fn perceptual_weight(i: usize, j: usize, n: usize) -> i32 {
  (8 - 4 * (i + j) / n) as i32
}
