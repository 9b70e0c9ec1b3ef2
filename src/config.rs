// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Stream geometry and encoder settings

use crate::enums::BlockSize;
use crate::error::{Error, Result};
use crate::partition::MB_SIZE;

pub const MAX_PLANES: usize = 3;
// Sizes are stored in 16 bits in the stream header
pub const MAX_DIMENSION: usize = 65535;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneInfo {
  // Horizontal and vertical subsampling shifts, each 0 or 1
  pub xdec: usize,
  pub ydec: usize
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamInfo {
  pub width: usize,
  pub height: usize,
  pub planes: Vec<PlaneInfo>,
  // Time units per frame, accumulated into each packet's granule position
  pub frame_duration: u32
}

impl StreamInfo {
  pub fn yuv420(width: usize, height: usize) -> Self {
    Self {
      width: width,
      height: height,
      planes: vec![
        PlaneInfo { xdec: 0, ydec: 0 },
        PlaneInfo { xdec: 1, ydec: 1 },
        PlaneInfo { xdec: 1, ydec: 1 },
      ],
      frame_duration: 1
    }
  }

  pub fn yuv444(width: usize, height: usize) -> Self {
    Self {
      width: width,
      height: height,
      planes: vec![PlaneInfo { xdec: 0, ydec: 0 }; 3],
      frame_duration: 1
    }
  }

  pub fn mono(width: usize, height: usize) -> Self {
    Self {
      width: width,
      height: height,
      planes: vec![PlaneInfo { xdec: 0, ydec: 0 }],
      frame_duration: 1
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.width == 0 || self.height == 0 || self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
      return Err(Error::invalid_argument(format!("Unsupported frame size {}x{}", self.width, self.height)));
    }
    if self.planes.is_empty() || self.planes.len() > MAX_PLANES {
      return Err(Error::invalid_argument(format!("Unsupported plane count {}", self.planes.len())));
    }
    if self.planes[0].xdec != 0 || self.planes[0].ydec != 0 {
      return Err(Error::invalid_argument("The first plane must not be subsampled"));
    }
    for (pli, plane) in self.planes.iter().enumerate() {
      if plane.xdec > 1 || plane.ydec > 1 {
        return Err(Error::invalid_argument(format!("Plane {}: subsampling must be 0 or 1", pli)));
      }
      if plane.xdec != plane.ydec {
        return Err(Error::not_implemented(format!("Plane {}: different horizontal and vertical subsampling", pli)));
      }
    }
    if self.frame_duration == 0 {
      return Err(Error::invalid_argument("Frame duration must be nonzero"));
    }
    Ok(())
  }

  // Luma size rounded up to whole macroblocks
  pub fn padded_width(&self) -> usize {
    self.width.next_multiple_of(MB_SIZE)
  }

  pub fn padded_height(&self) -> usize {
    self.height.next_multiple_of(MB_SIZE)
  }

  // Visible size of plane `pli`
  pub fn plane_width(&self, pli: usize) -> usize {
    let xdec = self.planes[pli].xdec;
    (self.width + xdec) >> xdec
  }

  pub fn plane_height(&self, pli: usize) -> usize {
    let ydec = self.planes[pli].ydec;
    (self.height + ydec) >> ydec
  }
}

// How the encoder picks block sizes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionMode {
  // Split a macroblock when its luma variance exceeds `split16`, and split an
  // 8x8 quadrant further when its variance exceeds `split8`
  Adaptive { split16: u32, split8: u32 },
  // Use one size everywhere
  Fixed(BlockSize)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
  // Quantizer step size; 0 and 1 are lossless
  pub quantizer: u32,
  // Rate weight used in intra mode decisions, in units of distortion per
  // 1/16th of a bit
  pub lambda: i32,
  pub partition: PartitionMode
}

impl Default for EncoderConfig {
  fn default() -> Self {
    Self {
      quantizer: 0,
      lambda: 4,
      partition: PartitionMode::Adaptive { split16: 100, split8: 250 }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn standard_layouts_validate() {
    assert!(StreamInfo::yuv420(33, 17).validate().is_ok());
    assert!(StreamInfo::yuv444(1, 1).validate().is_ok());
    assert!(StreamInfo::mono(640, 480).validate().is_ok());

    let info = StreamInfo::yuv420(33, 17);
    assert_eq!(info.plane_width(1), 17);
    assert_eq!(info.plane_height(2), 9);
    assert_eq!(info.padded_width(), 48);
    assert_eq!(info.padded_height(), 32);
  }

  #[test]
  fn bad_layouts_are_rejected() {
    assert!(matches!(StreamInfo::yuv420(0, 16).validate(), Err(Error::InvalidArgument(_))));
    assert!(matches!(StreamInfo::yuv420(70000, 16).validate(), Err(Error::InvalidArgument(_))));

    let mut info = StreamInfo::yuv420(16, 16);
    info.planes[1].ydec = 0;
    assert!(matches!(info.validate(), Err(Error::NotImplemented(_))));

    let mut info = StreamInfo::mono(16, 16);
    info.planes[0].xdec = 1;
    info.planes[0].ydec = 1;
    assert!(matches!(info.validate(), Err(Error::InvalidArgument(_))));

    let mut info = StreamInfo::mono(16, 16);
    info.planes.clear();
    assert!(info.validate().is_err());
  }
}
