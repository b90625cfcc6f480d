// Copyright (c) 2015-2024 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Byte sources and sinks for the transcoder.
//!
//! The parser consumes a [`Reader`] (a strictly forward, one-byte-at-a-time
//! source) and emits into a [`Writer`] (an append sink with absolute seek).
//! Seeking is the minimum surface needed for the single-byte container
//! header backpatch; apart from that, output is written strictly in order.

use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// A forward-only byte source with a byte offset for diagnostics.
pub trait Reader {
    /// Return the next input byte, or `None` at end of input.
    fn read_next_char(&mut self) -> Result<Option<u8>>;
    /// Number of bytes consumed so far.
    fn pos(&self) -> usize;
}

/// A positional byte sink.
///
/// Writes append at the current offset; [`seek`](Writer::seek) moves the
/// offset to an earlier position so a single byte can be overwritten, after
/// which the caller seeks forward to the previous end again.
pub trait Writer {
    fn write_char(&mut self, ch: u8) -> Result<()>;
    fn write_data(&mut self, data: &[u8]) -> Result<()>;
    /// Current append offset.
    fn pos(&self) -> usize;
    /// Reposition to an offset at or before the current end.
    fn seek(&mut self, pos: usize) -> Result<()>;
}

/// Reads from an in-memory byte slice.
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> SliceReader<'a> {
        SliceReader { data, pos: 0 }
    }
}

impl<'a> Reader for SliceReader<'a> {
    fn read_next_char(&mut self) -> Result<Option<u8>> {
        match self.data.get(self.pos) {
            Some(&ch) => {
                self.pos += 1;
                Ok(Some(ch))
            }
            None => Ok(None),
        }
    }

    fn pos(&self) -> usize {
        self.pos
    }
}

/// Reads from a file, buffered so the per-byte interface stays cheap.
pub struct FileReader {
    bytes: io::Bytes<BufReader<fs::File>>,
    pos: usize,
}

impl FileReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileReader> {
        let file = fs::File::open(path)?;
        Ok(FileReader { bytes: BufReader::new(file).bytes(), pos: 0 })
    }
}

impl Reader for FileReader {
    fn read_next_char(&mut self) -> Result<Option<u8>> {
        match self.bytes.next() {
            Some(Ok(ch)) => {
                self.pos += 1;
                Ok(Some(ch))
            }
            Some(Err(err)) => Err(Error::Io(err)),
            None => Ok(None),
        }
    }

    fn pos(&self) -> usize {
        self.pos
    }
}

/// Writes into a growable in-memory buffer.  Never overflows.
pub struct VecWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl VecWriter {
    pub fn new() -> VecWriter {
        VecWriter { buf: Vec::with_capacity(128), pos: 0 }
    }

    /// Unwrap the finished output buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for VecWriter {
    fn default() -> VecWriter {
        VecWriter::new()
    }
}

impl Writer for VecWriter {
    fn write_char(&mut self, ch: u8) -> Result<()> {
        if self.pos == self.buf.len() {
            self.buf.push(ch);
        } else {
            self.buf[self.pos] = ch;
        }
        self.pos += 1;
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if self.pos == self.buf.len() {
            self.buf.extend_from_slice(data);
        } else {
            // Overwrite what overlaps the existing tail, append the rest.
            let overlap = data.len().min(self.buf.len() - self.pos);
            self.buf[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
            self.buf.extend_from_slice(&data[overlap..]);
        }
        self.pos += data.len();
        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.pos = pos;
        Ok(())
    }
}

/// Writes into a caller-supplied buffer of fixed capacity.
///
/// The first write that would run past the end fails with
/// [`Error::Overflow`] and writes nothing; the output produced so far is an
/// incomplete stream and must be discarded.
pub struct BoundedWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BoundedWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> BoundedWriter<'a> {
        BoundedWriter { buf, pos: 0 }
    }

    fn overflow<T>(&self, more: usize) -> Result<T> {
        tracing::debug!(pos = self.pos, capacity = self.buf.len(), add = more,
                        "overflowing the output buffer");
        Err(Error::Overflow(self.pos, self.buf.len()))
    }
}

impl<'a> Writer for BoundedWriter<'a> {
    fn write_char(&mut self, ch: u8) -> Result<()> {
        if self.pos >= self.buf.len() {
            return self.overflow(1);
        }
        self.buf[self.pos] = ch;
        self.pos += 1;
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if self.pos + data.len() > self.buf.len() {
            return self.overflow(data.len());
        }
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.pos = pos;
        Ok(())
    }
}

/// Writes to any seekable byte stream, tracking the offset itself so that
/// `pos()` does not have to query the underlying stream.
pub struct FileWriter<W> {
    inner: W,
    pos: usize,
}

impl FileWriter<BufWriter<fs::File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::create(path)?;
        Ok(FileWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write + Seek> FileWriter<W> {
    pub fn new(inner: W) -> FileWriter<W> {
        FileWriter { inner, pos: 0 }
    }

    /// Flush and unwrap the underlying stream.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Seek> Writer for FileWriter<W> {
    fn write_char(&mut self, ch: u8) -> Result<()> {
        self.inner.write_all(&[ch])?;
        self.pos += 1;
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.pos += data.len();
        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos as u64))?;
        self.pos = pos;
        Ok(())
    }
}
