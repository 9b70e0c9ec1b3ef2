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

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::config::StreamInfo;
use crate::error::{Error, Result};
use crate::frame::Frame;

const Y4M_FILE_MAGIC: &str = "YUV4MPEG2 ";
const Y4M_FRAME_MAGIC: &str = "FRAME";

pub struct Y4MReader<R> {
  inner: R,
  info: StreamInfo
}

pub struct Y4MWriter<W> {
  inner: W,
  info: StreamInfo
}

fn is_whitespace(byte: u8) -> bool {
  byte == b' ' || byte == b'\t' || byte == b'\n'
}

fn read_byte<R: Read>(r: &mut R) -> Result<u8> {
  r.read_u8().map_err(Error::from_read)
}

// Read the rest of a header token, up to and including the next whitespace
// character. Returns the token and the whitespace character
fn read_token<R: Read>(r: &mut R) -> Result<(String, u8)> {
  let mut token = Vec::new();
  loop {
    let byte = read_byte(r)?;
    if is_whitespace(byte) {
      let token = String::from_utf8(token).map_err(|_| Error::corrupt("Non-ASCII Y4M header"))?;
      return Ok((token, byte));
    }
    token.push(byte);
  }
}

fn parse_size(token: &str) -> Result<usize> {
  token.parse().map_err(|_| Error::corrupt(format!("Invalid Y4M size {:?}", token)))
}

impl<R: Read> Y4MReader<R> {
  pub fn new(mut inner: R) -> Result<Self> {
    // Read header line
    let mut file_magic = [0u8; 10];
    inner.read_exact(&mut file_magic).map_err(Error::from_read)?;
    if file_magic != Y4M_FILE_MAGIC.as_bytes() {
      return Err(Error::corrupt("Invalid Y4M file header"));
    }

    let mut width = 0;
    let mut height = 0;
    let mut colorspace = String::from("420");

    // Parse parameter line
    loop {
      let tag = read_byte(&mut inner)?;
      if tag == b'\n' {
        break;
      }
      if tag == b' ' || tag == b'\t' {
        continue;
      }
      let (value, end) = read_token(&mut inner)?;
      match tag {
        b'W' => width = parse_size(&value)?,
        b'H' => height = parse_size(&value)?,
        b'C' => colorspace = value,
        // Frame rate, aspect ratio, interlacing and comments don't affect
        // the stored samples
        _ => {}
      }
      if end == b'\n' {
        break;
      }
    }

    let info = match colorspace.as_str() {
      "420" | "420jpeg" | "420paldv" | "420mpeg2" => StreamInfo::yuv420(width, height),
      "444" => StreamInfo::yuv444(width, height),
      "mono" => StreamInfo::mono(width, height),
      _ => return Err(Error::not_implemented(format!("Y4M colorspace {}", colorspace)))
    };
    info.validate()?;

    Ok(Y4MReader {
      inner: inner,
      info: info
    })
  }

  pub fn info(&self) -> &StreamInfo {
    &self.info
  }

  // Returns None at the end of the file
  pub fn read_frame(&mut self) -> Result<Option<Frame>> {
    // Read frame line
    // Technically this can have parameters, but they aren't useful to us.
    // So just check the magic number to ensure we're in the right place
    // and skip the rest of the line
    let mut frame_magic = [0u8; 5];
    match self.inner.read_exact(&mut frame_magic) {
      Ok(()) => {},
      Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
      Err(e) => return Err(Error::Io(e))
    }
    if frame_magic != Y4M_FRAME_MAGIC.as_bytes() {
      return Err(Error::corrupt("Invalid Y4M frame header"));
    }

    while read_byte(&mut self.inner)? != b'\n' {}

    let mut frame = Frame::try_new(&self.info)?;
    for pli in 0 .. frame.num_planes() {
      frame.plane_mut(pli).read_from(&mut self.inner).map_err(Error::from_read)?;
    }
    return Ok(Some(frame));
  }
}

impl<W: Write> Y4MWriter<W> {
  pub fn new(mut inner: W, info: &StreamInfo) -> Result<Self> {
    let colorspace = match info.planes.len() {
      1 => "mono",
      _ if info.planes[1].xdec == 1 => "420jpeg",
      _ => "444"
    };
    inner.write_all(Y4M_FILE_MAGIC.as_bytes())?;
    write!(inner, "W{} H{} F30:1 Ip C{}\n", info.width, info.height, colorspace)?;

    Ok(Y4MWriter {
      inner: inner,
      info: info.clone()
    })
  }

  pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
    frame.check_geometry(&self.info)?;

    self.inner.write_all(Y4M_FRAME_MAGIC.as_bytes())?;
    self.inner.write_u8(b'\n')?;
    for plane in frame.planes() {
      plane.write_to(&mut self.inner)?;
    }
    Ok(())
  }

  pub fn into_inner(self) -> W {
    self.inner
  }
}
