// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use std::io;
use std::io::prelude::*;

use crate::array2d::Array2D;
use crate::config::StreamInfo;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
  // Pixel data
  // The width() / height() methods of this array give the padded size, which
  // is always a whole number of macroblocks.
  // For the real size, use the .crop_width / .crop_height members below
  pixels: Array2D<u8>,

  crop_width: usize,
  crop_height: usize,

  xdec: usize,
  ydec: usize
}

impl Plane {
  pub fn try_new(width: usize, height: usize, crop_width: usize, crop_height: usize,
                 xdec: usize, ydec: usize) -> Result<Self> {
    assert!(0 < crop_width && crop_width <= width);
    assert!(0 < crop_height && crop_height <= height);
    Ok(Self {
      pixels: Array2D::try_zeroed(height, width)?,
      crop_width: crop_width,
      crop_height: crop_height,
      xdec: xdec,
      ydec: ydec
    })
  }

  pub fn pixels(&self) -> &Array2D<u8> {
    &self.pixels
  }

  pub fn pixels_mut(&mut self) -> &mut Array2D<u8> {
    &mut self.pixels
  }

  pub fn width(&self) -> usize {
    self.pixels.cols()
  }

  pub fn height(&self) -> usize {
    self.pixels.rows()
  }

  pub fn stride(&self) -> usize {
    self.pixels.stride()
  }

  pub fn crop_width(&self) -> usize {
    self.crop_width
  }

  pub fn crop_height(&self) -> usize {
    self.crop_height
  }

  pub fn xdec(&self) -> usize {
    self.xdec
  }

  pub fn ydec(&self) -> usize {
    self.ydec
  }

  // Fill in the pixels outside the crop region, by copying the rightmost and
  // bottommost pixels from within the crop region
  // This *must* be called after any modification which may potentially affect
  // the last row/column of pixels, or which may disturb the padding region
  pub fn fill_padding(&mut self) {
    let crop_width = self.crop_width;
    let crop_height = self.crop_height;
    let width = self.width();
    let height = self.height();

    for row in 0 .. crop_height {
      let rightmost_pixel = self.pixels[row][crop_width - 1];
      self.pixels[row][crop_width .. width].fill(rightmost_pixel);
    }

    for row in crop_height .. height {
      for col in 0 .. width {
        self.pixels[row][col] = self.pixels[crop_height - 1][col];
      }
    }
  }

  // Sum of squared differences over the visible region
  pub fn squared_error(&self, other: &Plane) -> u64 {
    assert!(self.crop_width == other.crop_width && self.crop_height == other.crop_height);
    let mut sse = 0u64;
    for row in 0 .. self.crop_height {
      let a = &self.pixels[row][.. self.crop_width];
      let b = &other.pixels[row][.. self.crop_width];
      for (&x, &y) in a.iter().zip(b) {
        let d = x as i64 - y as i64;
        sse += (d * d) as u64;
      }
    }
    return sse;
  }

  pub fn read_from<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
    for row in 0 .. self.crop_height {
      r.read_exact(&mut self.pixels[row][0 .. self.crop_width])?;
    }
    self.fill_padding();
    Ok(())
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
    for row in 0 .. self.crop_height {
      w.write_all(&self.pixels[row][0 .. self.crop_width])?;
    }
    Ok(())
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
  planes: Vec<Plane>
}

impl Frame {
  // Allocate a frame laid out as described by `info`
  pub fn try_new(info: &StreamInfo) -> Result<Self> {
    info.validate()?;
    let mut planes = Vec::with_capacity(info.planes.len());
    for (pli, plane) in info.planes.iter().enumerate() {
      planes.push(Plane::try_new(
        info.padded_width() >> plane.xdec,
        info.padded_height() >> plane.ydec,
        info.plane_width(pli),
        info.plane_height(pli),
        plane.xdec,
        plane.ydec
      )?);
    }
    Ok(Self { planes: planes })
  }

  pub fn new(info: &StreamInfo) -> Self {
    match Self::try_new(info) {
      Ok(frame) => frame,
      Err(e) => panic!("Failed to allocate {}x{} frame: {}", info.width, info.height, e)
    }
  }

  pub fn num_planes(&self) -> usize {
    self.planes.len()
  }

  pub fn planes(&self) -> &[Plane] {
    &self.planes
  }

  pub fn plane(&self, idx: usize) -> &Plane {
    &self.planes[idx]
  }

  pub fn plane_mut(&mut self, idx: usize) -> &mut Plane {
    &mut self.planes[idx]
  }

  pub fn y(&self) -> &Plane {
    &self.planes[0]
  }

  pub fn y_mut(&mut self) -> &mut Plane {
    &mut self.planes[0]
  }

  pub fn fill_padding(&mut self) {
    for plane in self.planes.iter_mut() {
      plane.fill_padding();
    }
  }

  // Check that this frame has exactly the layout described by `info`
  pub fn check_geometry(&self, info: &StreamInfo) -> Result<()> {
    if self.planes.len() != info.planes.len() {
      return Err(Error::invalid_argument(format!("Frame has {} planes, stream has {}",
                                                 self.planes.len(), info.planes.len())));
    }
    for (pli, (plane, expected)) in self.planes.iter().zip(&info.planes).enumerate() {
      if plane.xdec != expected.xdec || plane.ydec != expected.ydec {
        return Err(Error::invalid_argument(format!("Plane {}: subsampling {}x{} does not match stream {}x{}",
                                                   pli, plane.xdec, plane.ydec, expected.xdec, expected.ydec)));
      }
      if plane.crop_width != info.plane_width(pli) || plane.crop_height != info.plane_height(pli) {
        return Err(Error::invalid_argument(format!("Plane {}: size {}x{} does not match stream {}x{}",
                                                   pli, plane.crop_width, plane.crop_height,
                                                   info.plane_width(pli), info.plane_height(pli))));
      }
      if plane.width() != info.padded_width() >> expected.xdec || plane.height() != info.padded_height() >> expected.ydec {
        return Err(Error::invalid_argument(format!("Plane {}: padded size {}x{} is not a whole number of macroblocks",
                                                   pli, plane.width(), plane.height())));
      }
    }
    Ok(())
  }
}
