// Copyright (c) 2015-2024 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Pickle opcode emission
//!
//! Each helper writes one complete value serialization, choosing the most
//! compact opcode framing for the value's magnitude.  The framing bytes are
//! assembled into a small stack buffer and written in one run.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::consts::*;
use crate::error::Result;
use crate::io::Writer;

/// Write the two-byte protocol prologue.
pub fn write_proto<W: Writer>(w: &mut W) -> Result<()> {
    w.write_char(PROTO)?;
    w.write_char(PROTOCOL)
}

/// Write the stream-terminating stop opcode.
pub fn write_stop<W: Writer>(w: &mut W) -> Result<()> {
    w.write_char(STOP)
}

/// Write a unicode string given its UTF-8 bytes.
///
/// Uses SHORT_BINUNICODE for up to 255 bytes, BINUNICODE up to 2**32-1,
/// and BINUNICODE8 beyond that.
pub fn write_str<W: Writer>(w: &mut W, data: &[u8]) -> Result<()> {
    let mut header = [0u8; 9];
    let size = data.len();
    let len = if size <= 0xff {
        header[0] = SHORT_BINUNICODE;
        header[1] = size as u8;
        2
    } else if size as u64 <= 0xffff_ffff {
        header[0] = BINUNICODE;
        LittleEndian::write_u32(&mut header[1..5], size as u32);
        5
    } else {
        header[0] = BINUNICODE8;
        LittleEndian::write_u64(&mut header[1..9], size as u64);
        9
    };
    w.write_data(&header[..len])?;
    w.write_data(data)
}

/// Write an integer using the smallest of BININT1/BININT2/BININT.
///
/// The width is chosen by inspecting the low four little-endian bytes, as
/// CPython's pickler does: any value whose third or fourth byte is nonzero
/// (including all negative values) takes the four-byte signed form.
pub fn write_int<W: Writer>(w: &mut W, value: i64) -> Result<()> {
    let mut data = [0u8; 5];
    LittleEndian::write_u32(&mut data[1..5], value as u32);
    if data[4] != 0 || data[3] != 0 {
        data[0] = BININT;
        w.write_data(&data[..5])
    } else if data[2] != 0 {
        data[0] = BININT2;
        w.write_data(&data[..3])
    } else {
        data[0] = BININT1;
        w.write_data(&data[..2])
    }
}

/// Write a float as BINFLOAT.
pub fn write_float<W: Writer>(w: &mut W, value: f64) -> Result<()> {
    let mut data = [0u8; 9];
    data[0] = BINFLOAT;
    // Yes, this one is big endian.
    BigEndian::write_f64(&mut data[1..9], value);
    w.write_data(&data)
}
