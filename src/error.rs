// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// Errors surfaced at the encoder/decoder call boundary
// Programming errors inside the numeric kernels (mismatched block sizes and
// the like) are not represented here, those panic
#[derive(Error, Debug)]
pub enum Error {
  // Mismatched buffers, unsupported plane geometry, wrong coefficient count
  // Always detected before any state is modified
  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  // A control request or stream feature that is not implemented
  #[error("Not implemented: {0}")]
  NotImplemented(String),

  #[error("Out of memory")]
  OutOfMemory,

  // The coded data contradicts itself, eg. more pulses than were announced
  #[error("Corrupt input: {0}")]
  CorruptInput(String),

  // Call made in the wrong packet state, eg. coding a frame after the end of
  // the stream
  #[error("Invalid state: {0}")]
  InvalidState(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
    Error::InvalidArgument(msg.into())
  }

  pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
    Error::NotImplemented(msg.into())
  }

  pub fn corrupt<S: Into<String>>(msg: S) -> Self {
    Error::CorruptInput(msg.into())
  }

  pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
    Error::InvalidState(msg.into())
  }

  // Truncated input is reported as corruption rather than as an IO problem
  pub fn from_read(err: std::io::Error) -> Self {
    if err.kind() == std::io::ErrorKind::UnexpectedEof || err.kind() == std::io::ErrorKind::InvalidData {
      Error::CorruptInput(err.to_string())
    } else {
      Error::Io(err)
    }
  }
}
