// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Stream header packet
//
// Layout, all multi-byte fields big-endian:
//   4 bytes  magic "TLAP"
//   1 byte   version
//   2 bytes  width
//   2 bytes  height
//   4 bytes  frame duration
//   1 byte   plane count
//   per plane: 1 byte xdec, 1 byte ydec

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::config::{PlaneInfo, StreamInfo};
use crate::error::{Error, Result};

pub const MAGIC: &[u8; 4] = b"TLAP";
pub const VERSION: u8 = 1;

pub fn write_header(info: &StreamInfo) -> Result<Box<[u8]>> {
  info.validate()?;
  let mut data = Vec::with_capacity(14 + 2 * info.planes.len());
  data.extend_from_slice(MAGIC);
  data.write_u8(VERSION)?;
  data.write_u16::<BigEndian>(info.width as u16)?;
  data.write_u16::<BigEndian>(info.height as u16)?;
  data.write_u32::<BigEndian>(info.frame_duration)?;
  data.write_u8(info.planes.len() as u8)?;
  for plane in &info.planes {
    data.write_u8(plane.xdec as u8)?;
    data.write_u8(plane.ydec as u8)?;
  }
  return Ok(data.into_boxed_slice());
}

pub fn read_header(packet: &[u8]) -> Result<StreamInfo> {
  let mut r = packet;
  let mut magic = [0u8; 4];
  r.read_exact(&mut magic).map_err(Error::from_read)?;
  if &magic != MAGIC {
    return Err(Error::corrupt("Not a stream header"));
  }
  let version = r.read_u8().map_err(Error::from_read)?;
  if version != VERSION {
    return Err(Error::not_implemented(format!("Stream version {}", version)));
  }

  let width = r.read_u16::<BigEndian>().map_err(Error::from_read)? as usize;
  let height = r.read_u16::<BigEndian>().map_err(Error::from_read)? as usize;
  let frame_duration = r.read_u32::<BigEndian>().map_err(Error::from_read)?;
  let num_planes = r.read_u8().map_err(Error::from_read)? as usize;
  let mut planes = Vec::with_capacity(num_planes);
  for _ in 0 .. num_planes {
    let xdec = r.read_u8().map_err(Error::from_read)? as usize;
    let ydec = r.read_u8().map_err(Error::from_read)? as usize;
    planes.push(PlaneInfo { xdec: xdec, ydec: ydec });
  }
  if !r.is_empty() {
    return Err(Error::corrupt(format!("{} trailing bytes in stream header", r.len())));
  }

  let info = StreamInfo {
    width: width,
    height: height,
    planes: planes,
    frame_duration: frame_duration
  };
  // A header describing an impossible stream is corrupt, but one asking for
  // a layout we do not implement is reported as such
  match info.validate() {
    Ok(()) => Ok(info),
    Err(Error::InvalidArgument(msg)) => Err(Error::corrupt(msg)),
    Err(e) => Err(e)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_fields_survive() {
    let mut info = StreamInfo::yuv420(1920, 1080);
    info.frame_duration = 1001;
    let data = write_header(&info).unwrap();
    assert_eq!(&data[0..4], b"TLAP");
    assert_eq!(data.len(), 14 + 6);
    assert_eq!(read_header(&data).unwrap(), info);

    let mono = StreamInfo::mono(7, 3);
    assert_eq!(read_header(&write_header(&mono).unwrap()).unwrap(), mono);
  }

  #[test]
  fn bad_headers_are_rejected() {
    let data = write_header(&StreamInfo::yuv444(16, 16)).unwrap();
    assert!(matches!(read_header(&data[.. data.len() - 1]), Err(Error::CorruptInput(_))));

    let mut bad_magic = data.to_vec();
    bad_magic[0] = b'X';
    assert!(matches!(read_header(&bad_magic), Err(Error::CorruptInput(_))));

    let mut bad_version = data.to_vec();
    bad_version[4] = 9;
    assert!(matches!(read_header(&bad_version), Err(Error::NotImplemented(_))));

    // Zero width
    let mut zero = data.to_vec();
    zero[5] = 0;
    zero[6] = 0;
    assert!(matches!(read_header(&zero), Err(Error::CorruptInput(_))));

    let mut trailing = data.to_vec();
    trailing.push(0);
    assert!(matches!(read_header(&trailing), Err(Error::CorruptInput(_))));

    assert!(write_header(&StreamInfo::yuv420(0, 16)).is_err());
  }
}
