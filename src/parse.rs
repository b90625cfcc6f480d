// Copyright (c) 2015-2024 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The streaming parser/emitter
//!
//! A single forward pass over the input: every recognized leaf value is
//! emitted immediately, no syntax tree is built.  The only place the output
//! is revisited is the container header of `{...}`, which starts out as an
//! empty-dict opcode and is overwritten with the empty-set opcode once the
//! first separator shows the braces hold elements instead of key/value
//! pairs.
//!
//! The reader offers no push-back, so `parse` hands the byte that ended its
//! value recognition back to the caller; the container routines dispatch on
//! that byte to find separators and terminators.

use std::path::Path;

use tracing::debug;

use crate::consts::*;
use crate::error::{Error, ErrorCode, Result};
use crate::io::{FileReader, FileWriter, Reader, SliceReader, VecWriter, Writer};
use crate::ser;

/// Result of one `parse` call: the byte that terminated value recognition
/// (`None` at end of input), and whether one complete value was emitted.
type ParseRes = (Option<u8>, bool);

/// String escape decoding state.
enum Escape {
    Direct,
    Init,
    Hex,
}

/// Drives a [`Reader`] and emits the equivalent pickle stream to a
/// [`Writer`].
pub struct Transcoder<R, W> {
    reader: R,
    writer: W,
}

impl<R: Reader, W: Writer> Transcoder<R, W> {
    pub fn new(reader: R, writer: W) -> Transcoder<R, W> {
        Transcoder { reader, writer }
    }

    /// Unwrap the reader and writer from the `Transcoder`.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Run the full pass: protocol prologue, exactly one value, stop opcode.
    ///
    /// Input after the root value is ignored.
    pub fn transcode(&mut self) -> Result<()> {
        ser::write_proto(&mut self.writer)?;
        let (ch, parsed) = self.parse()?;
        if !parsed {
            return self.parse_error("root", ch);
        }
        ser::write_stop(&mut self.writer)
    }

    fn parse_error<T>(&self, ctx: &'static str, ch: Option<u8>) -> Result<T> {
        let pos = self.reader.pos();
        match ch {
            Some(ch) => debug!("parse error: {}: char {:?} in pos {}",
                               ctx, char::from(ch), pos),
            None => debug!("parse error: {}: end of input in pos {}", ctx, pos),
        }
        Err(Error::Parse(ErrorCode::Unexpected(ctx, ch), pos))
    }

    fn invalid_literal<T>(&self, buf: String) -> Result<T> {
        let pos = self.reader.pos();
        debug!("parse error: invalid numeric literal {:?} in pos {}", buf, pos);
        Err(Error::Parse(ErrorCode::InvalidLiteral(buf.into_bytes()), pos))
    }

    /// Consume input until one value has been recognized and emitted, or a
    /// byte that belongs to the enclosing container is hit.
    ///
    /// Whitespace between tokens is skipped.  Once a value has been parsed,
    /// the next non-whitespace byte ends the call and is returned; adjacent
    /// string literals are not concatenated, the enclosing routine rejects
    /// the leftover quote instead.
    fn parse(&mut self) -> Result<ParseRes> {
        let mut parsed = false;
        loop {
            let ch = match self.reader.read_next_char()? {
                None => return Ok((None, parsed)),
                Some(ch) => ch,
            };
            if ch.is_ascii_whitespace() {
                continue;
            }
            if parsed {
                return Ok((Some(ch), true));
            }
            match ch {
                b'\'' | b'"' => {
                    self.parse_str(ch)?;
                    parsed = true;
                }
                b'[' => {
                    self.parse_list()?;
                    parsed = true;
                }
                b'{' => {
                    self.parse_dict_or_set()?;
                    parsed = true;
                }
                b'0'..=b'9' | b'+' | b'-' | b'.' => {
                    // The number already consumed its terminating byte.
                    let term = self.parse_num(ch)?;
                    match term {
                        Some(t) if t.is_ascii_whitespace() => parsed = true,
                        _ => return Ok((term, true)),
                    }
                }
                _ => return Ok((Some(ch), false)),
            }
        }
    }

    fn parse_list(&mut self) -> Result<()> {
        self.writer.write_char(EMPTY_LIST)?;
        self.writer.write_char(MARK)?;
        loop {
            let (ch, _) = self.parse()?;
            match ch {
                Some(b',') => continue,
                Some(b']') => break,
                _ => return self.parse_error("list", ch),
            }
        }
        self.writer.write_char(APPENDS)
    }

    /// Parse the contents of `{...}`, which is a mapping when the items are
    /// `key: value` pairs and a set when they are plain elements.
    ///
    /// The empty-dict header is already committed when the first separator
    /// disambiguates the two shapes, so turning into a set means seeking
    /// back and overwriting that one header byte.  Demotion is only legal
    /// right after the first item, while no `:` has been seen.
    fn parse_dict_or_set(&mut self) -> Result<()> {
        let header_pos = self.writer.pos();
        self.writer.write_char(EMPTY_DICT)?;
        self.writer.write_char(MARK)?;
        let mut count = 0usize;
        let mut is_set = false;
        let mut at_key = true;
        loop {
            let (ch, item) = self.parse()?;
            if item {
                count += 1;
            }
            match ch {
                Some(b',') => {
                    if count == 1 && at_key {
                        self.make_set(header_pos, count, ch)?;
                        is_set = true;
                        at_key = false;
                    }
                    if at_key {
                        return self.parse_error("dict after parsing key", ch);
                    }
                    if !is_set {
                        at_key = true;
                    }
                }
                Some(b':') => {
                    if !at_key {
                        return self.parse_error("dict expected key before", ch);
                    }
                    if is_set {
                        return self.parse_error("set", ch);
                    }
                    at_key = false;
                }
                Some(b'}') => {
                    if count == 1 && at_key {
                        self.make_set(header_pos, count, ch)?;
                        is_set = true;
                    }
                    break;
                }
                _ => return self.parse_error("dict|set", ch),
            }
        }
        if !is_set && count % 2 != 0 {
            return self.parse_error("dict, uneven count", Some(b'}'));
        }
        self.writer.write_char(if is_set { ADDITEMS } else { SETITEMS })
    }

    /// Backpatch the open mapping frame into a set frame.
    fn make_set(&mut self, header_pos: usize, count: usize, ch: Option<u8>) -> Result<()> {
        if count != 1 {
            return self.parse_error("dict after parsing more than one entry", ch);
        }
        let end = self.writer.pos();
        self.writer.seek(header_pos)?;
        self.writer.write_char(EMPTY_SET)?;
        self.writer.seek(end)?;
        Ok(())
    }

    /// Decode a quoted literal into a scratch buffer, then emit it.
    ///
    /// The input is required to be UTF-8 already, so the decoded bytes are
    /// passed through unchanged.  Escapes cover `\r` `\t` `\n`, the quote
    /// characters, backslash, an escaped newline (line continuation), and
    /// `\xhh` with exactly two lower-case hex digits.
    fn parse_str(&mut self, quote: u8) -> Result<()> {
        let mut buf = Vec::new();
        let mut mode = Escape::Direct;
        let mut hex_pos = 0;
        let mut hex = 0u8;
        loop {
            let ch = match self.reader.read_next_char()? {
                None => return self.parse_error("str, got EOF", None),
                Some(ch) => ch,
            };
            match mode {
                Escape::Direct => {
                    if ch == quote {
                        break;
                    }
                    if ch == b'\\' {
                        mode = Escape::Init;
                    } else {
                        buf.push(ch);
                    }
                }
                Escape::Init => {
                    if ch == b'x' {
                        mode = Escape::Hex;
                        hex_pos = 0;
                        hex = 0;
                    } else {
                        buf.push(match ch {
                            b'r' => b'\r',
                            b't' => b'\t',
                            b'n' => b'\n',
                            b'\\' | b'"' | b'\'' | b'\n' => ch,
                            _ => return self.parse_error("str escaped", Some(ch)),
                        });
                        mode = Escape::Direct;
                    }
                }
                Escape::Hex => {
                    let digit = match ch {
                        b'0'..=b'9' => ch - b'0',
                        b'a'..=b'f' => ch - b'a' + 10,
                        _ => return self.parse_error("str hex escaped", Some(ch)),
                    };
                    hex = hex * 16 + digit;
                    hex_pos += 1;
                    if hex_pos == 2 {
                        buf.push(hex);
                        mode = Escape::Direct;
                    }
                }
            }
        }
        ser::write_str(&mut self.writer, &buf)
    }

    /// Accumulate a numeric literal and emit it as int or float.
    ///
    /// The character class is `[0-9+-.]` in any position; whatever it spells
    /// is decided by the full-token conversion, which is strict.  Returns
    /// the byte that ended the literal.
    fn parse_num(&mut self, first: u8) -> Result<Option<u8>> {
        let mut buf = String::new();
        let mut is_float = first == b'.';
        buf.push(char::from(first));

        let term = loop {
            match self.reader.read_next_char()? {
                None => break None,
                Some(ch) => match ch {
                    b'0'..=b'9' | b'+' | b'-' | b'.' => {
                        if ch == b'.' {
                            is_float = true;
                        }
                        buf.push(char::from(ch));
                    }
                    _ => break Some(ch),
                },
            }
        };

        if is_float {
            match buf.parse::<f64>() {
                Ok(val) => ser::write_float(&mut self.writer, val)?,
                Err(_) => return self.invalid_literal(buf),
            }
        } else {
            match buf.parse::<i64>() {
                Ok(val) => ser::write_int(&mut self.writer, val)?,
                Err(_) => return self.invalid_literal(buf),
            }
        }
        Ok(term)
    }
}

/// Transcode a literal held in a byte slice into a fresh output buffer.
pub fn transcode_slice(input: &[u8]) -> Result<Vec<u8>> {
    let mut transcoder = Transcoder::new(SliceReader::new(input), VecWriter::new());
    transcoder.transcode()?;
    let (_, writer) = transcoder.into_inner();
    Ok(writer.into_inner())
}

/// Transcode a literal held in a string into a fresh output buffer.
#[inline]
pub fn transcode_str(input: &str) -> Result<Vec<u8>> {
    transcode_slice(input.as_bytes())
}

/// Transcode the literal in the file at `src` into the file at `dest`.
pub fn transcode_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> Result<()> {
    let reader = FileReader::open(src)?;
    let writer = FileWriter::create(dest)?;
    let mut transcoder = Transcoder::new(reader, writer);
    transcoder.transcode()?;
    let (_, writer) = transcoder.into_inner();
    writer.into_inner()?;
    Ok(())
}
