// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use bytemuck::Zeroable;
use bytemuck::allocation::try_zeroed_slice_box;

use std::ops::{Index, IndexMut};

use crate::error::{Error, Result};

// Two-dimensional array type
// Rows are `stride` elements apart in `data`; only the first `cols` of each
// row are part of the array
#[derive(Clone, Debug, PartialEq)]
pub struct Array2D<T> {
  rows: usize,
  cols: usize,
  stride: usize,
  data: Box<[T]>,
}

impl<T> Array2D<T> {
  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn stride(&self) -> usize {
    self.stride
  }

  // Element (row, col), or None if either index is out of bounds
  pub fn get(&self, row: usize, col: usize) -> Option<&T> {
    if row < self.rows && col < self.cols {
      Some(&self.data[row * self.stride + col])
    } else {
      None
    }
  }

  pub fn fill_with<F: FnMut(usize, usize) -> T>(&mut self, mut f: F) {
    for i in 0..self.rows {
      for j in 0..self.cols {
        self[i][j] = f(i, j);
      }
    }
  }

  fn check_region(&self, row_start: usize, col_start: usize, rows: usize, cols: usize) {
    let row_end = row_start.saturating_add(rows);
    let col_end = col_start.saturating_add(cols);

    if row_end > self.rows {
      panic!("Array2D row indices out of bounds (index {}..{} vs. size {})", row_start, row_end, self.rows);
    }
    if col_end > self.cols {
      panic!("Array2D column indices out of bounds (index {}..{} vs. size {})", col_start, col_end, self.cols);
    }
  }

  // Borrow a rows x cols region starting at (row, col)
  pub fn block(&self, row: usize, col: usize, rows: usize, cols: usize) -> BlockView<'_, T> {
    self.check_region(row, col, rows, cols);
    BlockView {
      data: &self.data[row * self.stride + col ..],
      rows: rows,
      cols: cols,
      stride: self.stride
    }
  }

  pub fn block_mut(&mut self, row: usize, col: usize, rows: usize, cols: usize) -> BlockViewMut<'_, T> {
    self.check_region(row, col, rows, cols);
    let stride = self.stride;
    BlockViewMut {
      data: &mut self.data[row * stride + col ..],
      rows: rows,
      cols: cols,
      stride: stride
    }
  }
}

impl<T: Clone> Array2D<T> {
  pub fn filled(rows: usize, cols: usize, value: T) -> Self {
    let num_elements = rows.checked_mul(cols).unwrap_or_else(|| {
      panic!("Array2D size {}x{} overflows", rows, cols)
    });
    Self {
      rows: rows,
      cols: cols,
      stride: cols,
      data: vec![value; num_elements].into_boxed_slice()
    }
  }

  // Fill a region of a given size with (cloned) copies of `value`
  pub fn fill_region(&mut self, row_start: usize, col_start: usize, rows: usize, cols: usize, value: &T) {
    self.check_region(row_start, col_start, rows, cols);

    for row in row_start .. row_start + rows {
      self[row][col_start .. col_start + cols].fill(value.clone());
    }
  }
}

impl<T: Zeroable> Array2D<T> {
  pub fn zeroed(rows: usize, cols: usize) -> Self {
    Self::zeroed_with_stride(rows, cols, cols)
  }

  pub fn zeroed_with_stride(rows: usize, cols: usize, stride: usize) -> Self {
    match Self::try_zeroed_with_stride(rows, cols, stride) {
      Ok(array) => array,
      Err(_) => panic!("Failed to allocate {}x{} array", rows, cols)
    }
  }

  // Like zeroed(), but reports allocation failure instead of aborting
  pub fn try_zeroed(rows: usize, cols: usize) -> Result<Self> {
    Self::try_zeroed_with_stride(rows, cols, cols)
  }

  pub fn try_zeroed_with_stride(rows: usize, cols: usize, stride: usize) -> Result<Self> {
    assert!(stride >= cols);
    let num_elements = rows.checked_mul(stride).ok_or(Error::OutOfMemory)?;
    let data = try_zeroed_slice_box(num_elements).map_err(|_| Error::OutOfMemory)?;

    Ok(Self {
      rows: rows,
      cols: cols,
      stride: stride,
      data: data
    })
  }

  pub fn new_with<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, f: F) -> Self {
    let mut result = Array2D::zeroed(rows, cols);
    result.fill_with(f);
    return result;
  }
}

// Allow indexing by array[row][col]
// This is done by having array[row] return a normal slice which
// references the entire row in question. Then a normal slice index
// can pick out the desired element
impl<T> Index<usize> for Array2D<T> {
  type Output = [T];
  fn index(&self, index: usize) -> &[T] {
    if index >= self.rows {
      panic!("Array2D row index out of bounds (index {} vs. size {})", index, self.rows);
    }
    // Due to the above check, these calculations should never overflow
    let start_index = index * self.stride;
    let end_index = start_index + self.cols;
    &self.data[start_index .. end_index]
  }
}

impl<T> IndexMut<usize> for Array2D<T> {
  fn index_mut(&mut self, index: usize) -> &mut [T] {
    if index >= self.rows {
      panic!("Array2D row index out of bounds (index {} vs. size {})", index, self.rows);
    }
    // Due to the above check, these calculations should never overflow
    let start_index = index * self.stride;
    let end_index = start_index + self.cols;
    &mut self.data[start_index .. end_index]
  }
}

// A checked view of a rectangular region inside an Array2D
// `data` starts at the top-left element of the region and keeps the parent's
// stride, so rows and columns are addressed without copying
pub struct BlockView<'a, T> {
  data: &'a [T],
  rows: usize,
  cols: usize,
  stride: usize
}

pub struct BlockViewMut<'a, T> {
  data: &'a mut [T],
  rows: usize,
  cols: usize,
  stride: usize
}

impl<'a, T> BlockView<'a, T> {
  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }
}

impl<'a, T: Copy> BlockView<'a, T> {
  // Copy the region out in row-major order
  pub fn to_vec(&self) -> Vec<T> {
    let mut out = Vec::with_capacity(self.rows * self.cols);
    for i in 0..self.rows {
      out.extend_from_slice(&self[i]);
    }
    return out;
  }
}

impl<'a, T> BlockViewMut<'a, T> {
  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn stride(&self) -> usize {
    self.stride
  }

  // The underlying storage starting at the region's top-left element
  // Element (i, j) lives at index i * stride() + j
  pub fn raw_mut(&mut self) -> &mut [T] {
    let len = (self.rows - 1) * self.stride + self.cols;
    &mut self.data[.. len]
  }
}

impl<'a, T: Copy> BlockViewMut<'a, T> {
  pub fn to_vec(&self) -> Vec<T> {
    let mut out = Vec::with_capacity(self.rows * self.cols);
    for i in 0..self.rows {
      out.extend_from_slice(&self[i]);
    }
    return out;
  }

  // Overwrite the region from a row-major slice
  pub fn copy_from(&mut self, src: &[T]) {
    assert!(src.len() == self.rows * self.cols);
    let cols = self.cols;
    for i in 0..self.rows {
      self[i].copy_from_slice(&src[i * cols .. (i + 1) * cols]);
    }
  }
}

impl<'a, T> Index<usize> for BlockView<'a, T> {
  type Output = [T];
  fn index(&self, index: usize) -> &[T] {
    if index >= self.rows {
      panic!("BlockView row index out of bounds (index {} vs. size {})", index, self.rows);
    }
    let start_index = index * self.stride;
    &self.data[start_index .. start_index + self.cols]
  }
}

impl<'a, T> Index<usize> for BlockViewMut<'a, T> {
  type Output = [T];
  fn index(&self, index: usize) -> &[T] {
    if index >= self.rows {
      panic!("BlockView row index out of bounds (index {} vs. size {})", index, self.rows);
    }
    let start_index = index * self.stride;
    &self.data[start_index .. start_index + self.cols]
  }
}

impl<'a, T> IndexMut<usize> for BlockViewMut<'a, T> {
  fn index_mut(&mut self, index: usize) -> &mut [T] {
    if index >= self.rows {
      panic!("BlockView row index out of bounds (index {} vs. size {})", index, self.rows);
    }
    let start_index = index * self.stride;
    &mut self.data[start_index .. start_index + self.cols]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn block_views_address_the_right_region() {
    let mut arr = Array2D::<i32>::new_with(6, 5, |i, j| (10 * i + j) as i32);
    {
      let view = arr.block(2, 1, 3, 2);
      assert_eq!(view[0], [21, 22]);
      assert_eq!(view[2], [41, 42]);
      assert_eq!(view.to_vec(), vec![21, 22, 31, 32, 41, 42]);
    }

    let mut view = arr.block_mut(4, 3, 2, 2);
    view.copy_from(&[-1, -2, -3, -4]);
    // One row down in the parent's storage
    assert_eq!(view.raw_mut()[5], -3);
    assert_eq!(arr[4][3 ..], [-1, -2]);
    assert_eq!(arr[5][3 ..], [-3, -4]);
    assert_eq!(arr[5][2], 52);
  }

  #[test]
  fn strided_arrays_hide_the_padding() {
    let mut arr = Array2D::<u8>::zeroed_with_stride(3, 4, 7);
    arr.fill_region(0, 0, 3, 4, &9);
    assert_eq!(arr.stride(), 7);
    assert_eq!(arr[2], [9, 9, 9, 9]);
    assert_eq!(arr.get(2, 3), Some(&9));
    assert_eq!(arr.get(2, 4), None);
    assert_eq!(arr.get(3, 0), None);
  }

  #[test]
  #[should_panic]
  fn out_of_bounds_block_panics() {
    let arr = Array2D::<i32>::zeroed(8, 8);
    let _ = arr.block(4, 4, 8, 4);
  }

  #[test]
  fn filled_works_for_non_zeroable_types() {
    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Tag { A, B }
    let mut arr = Array2D::filled(2, 3, Tag::A);
    arr.fill_region(1, 1, 1, 2, &Tag::B);
    assert_eq!(arr[0], [Tag::A, Tag::A, Tag::A]);
    assert_eq!(arr[1], [Tag::A, Tag::B, Tag::B]);
  }
}
