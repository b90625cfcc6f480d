// Copyright (c) 2015-2024 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Error objects and codes

use std::error;
use std::fmt;
use std::io;
use std::result;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ErrorCode {
    /// Unexpected byte (or end of input) in the given syntactic context
    Unexpected(&'static str, Option<u8>),
    /// Numeric literal that cannot be converted to an integer or float
    InvalidLiteral(Vec<u8>),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorCode::Unexpected(ctx, Some(ch)) =>
                write!(fmt, "{}: unexpected char {:?}", ctx, char::from(ch)),
            ErrorCode::Unexpected(ctx, None) =>
                write!(fmt, "{}: unexpected end of input", ctx),
            ErrorCode::InvalidLiteral(ref l) =>
                write!(fmt, "numeric literal is invalid: {}", String::from_utf8_lossy(l)),
        }
    }
}

/// This type represents all possible errors that can occur when transcoding
/// a literal into a pickle stream.
#[derive(Debug)]
pub enum Error {
    /// Some IO error occurred on the underlying reader or writer.
    Io(io::Error),
    /// The input could not be parsed; the offset is the reader position
    /// at which the error was raised.
    Parse(ErrorCode, usize),
    /// A bounded writer ran out of space (write offset, capacity).
    Overflow(usize, usize),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref error) => error.fmt(fmt),
            Error::Parse(ref code, offset) => write!(fmt, "parse error at offset {}: {}",
                                                     offset, code),
            Error::Overflow(pos, cap) => write!(fmt, "output overflow at offset {} \
                                                      (capacity {})", pos, cap),
        }
    }
}

impl error::Error for Error {}
