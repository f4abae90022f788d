//! Byte cursors feeding the decoder.
//!
//! A cursor owns its byte source and a position. Decoding only ever moves it
//! forward, and a read either yields exactly the requested bytes or fails
//! with [`DecodeError::EndOfInput`].

use std::io::{self, BufRead, Read};

use bytes::{Buf, Bytes};

use crate::error::DecodeError;

/// Sequential byte source for Avro datum decoding.
pub trait ByteCursor {
    /// Read a single byte.
    fn read_byte(&mut self) -> Result<u8, DecodeError>;

    /// Read exactly `n` bytes into a new buffer.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, DecodeError>;

    /// Fill `buf` completely.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError>;

    /// Advance past `n` bytes without materializing them.
    fn skip(&mut self, n: usize) -> Result<(), DecodeError>;

    /// Number of bytes consumed since the cursor was created.
    fn position(&self) -> u64;

    /// Whether the source has no more bytes.
    ///
    /// Streamed sources may need to fill their buffer to answer, so this
    /// takes `&mut self`.
    fn is_at_end(&mut self) -> Result<bool, DecodeError>;
}

impl<C: ByteCursor + ?Sized> ByteCursor for Box<C> {
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        (**self).read_byte()
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        (**self).read_exact(n)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        (**self).read_into(buf)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        (**self).skip(n)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn is_at_end(&mut self) -> Result<bool, DecodeError> {
        (**self).is_at_end()
    }
}

impl<C: ByteCursor + ?Sized> ByteCursor for &mut C {
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        (**self).read_byte()
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        (**self).read_exact(n)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        (**self).read_into(buf)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        (**self).skip(n)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn is_at_end(&mut self) -> Result<bool, DecodeError> {
        (**self).is_at_end()
    }
}

/// Cursor over an in-memory buffer.
///
/// Backed by [`Bytes`], so cloning a cursor or building one from a shared
/// buffer does not copy the data.
#[derive(Debug, Clone, Default)]
pub struct SliceCursor {
    data: Bytes,
    consumed: u64,
}

impl SliceCursor {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: Bytes) -> Self {
        Self { data, consumed: 0 }
    }

    /// Create a cursor over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// The unconsumed tail of the buffer.
    pub fn remaining_bytes(&self) -> &Bytes {
        &self.data
    }

    fn ensure(&self, n: usize) -> Result<(), DecodeError> {
        if n > self.data.len() {
            Err(DecodeError::EndOfInput)
        } else {
            Ok(())
        }
    }
}

impl From<Vec<u8>> for SliceCursor {
    fn from(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }
}

impl From<Bytes> for SliceCursor {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<&'static [u8]> for SliceCursor {
    fn from(data: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(data))
    }
}

impl ByteCursor for SliceCursor {
    #[inline]
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        self.consumed += 1;
        Ok(self.data.get_u8())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        self.ensure(n)?;
        self.consumed += n as u64;
        Ok(self.data.split_to(n).to_vec())
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.ensure(buf.len())?;
        self.consumed += buf.len() as u64;
        self.data.copy_to_slice(buf);
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.ensure(n)?;
        self.consumed += n as u64;
        self.data.advance(n);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.consumed
    }

    fn is_at_end(&mut self) -> Result<bool, DecodeError> {
        Ok(self.data.is_empty())
    }
}

/// Cursor over a blocking buffered reader such as a file or socket.
///
/// Lengths read from the data are not trusted for allocation: large reads
/// grow the output buffer as bytes actually arrive.
#[derive(Debug)]
pub struct ReadCursor<R> {
    inner: R,
    consumed: u64,
}

impl<R: BufRead> ReadCursor<R> {
    /// Wrap a buffered reader.
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the cursor, returning the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

fn map_io(err: io::Error) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::EndOfInput
    } else {
        DecodeError::Io(err)
    }
}

impl<R: BufRead> ByteCursor for ReadCursor<R> {
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = loop {
            match self.inner.fill_buf() {
                Ok([]) => return Err(DecodeError::EndOfInput),
                Ok(buf) => break buf[0],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e)),
            }
        };
        self.inner.consume(1);
        self.consumed += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::with_capacity(n.min(64 * 1024));
        let read = (&mut self.inner)
            .take(n as u64)
            .read_to_end(&mut out)
            .map_err(map_io)?;
        self.consumed += read as u64;
        if read < n {
            return Err(DecodeError::EndOfInput);
        }
        Ok(out)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.inner.read_exact(buf).map_err(map_io)?;
        self.consumed += buf.len() as u64;
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        let skipped = io::copy(&mut (&mut self.inner).take(n as u64), &mut io::sink())
            .map_err(map_io)?;
        self.consumed += skipped;
        if skipped < n as u64 {
            return Err(DecodeError::EndOfInput);
        }
        Ok(())
    }

    fn position(&self) -> u64 {
        self.consumed
    }

    fn is_at_end(&mut self) -> Result<bool, DecodeError> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.is_empty()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e)),
            }
        }
    }
}
