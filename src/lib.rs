// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Spatial core of a lapped transform intra codec

pub mod adapt;
pub mod array2d;
pub mod cdf;
pub mod cfl;
pub mod config;
pub mod consts;
pub mod decoder;
pub mod encoder;
pub mod entropycode;
pub mod enums;
pub mod error;
pub mod frame;
pub mod header;
pub mod intra;
pub mod lapping;
pub mod metrics;
pub mod partition;
pub mod quantizer;
pub mod traversal;
pub mod txfm;
pub mod util;
pub mod y4m;

pub use config::{EncoderConfig, PartitionMode, PlaneInfo, StreamInfo};
pub use decoder::Decoder;
pub use encoder::{Encoder, EncoderControl, Packet};
pub use enums::{BlockSize, IntraMode, PacketState};
pub use error::{Error, Result};
pub use frame::{Frame, Plane};
