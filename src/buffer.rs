//! Defines [`HtmlBuffer`], the append-only string buffer every stage of HTML
//! assembly writes into, and [`BufferPool`], which recycles those buffers
//! across page renders.
//!
//! Growth goes through [`String::try_reserve`] so that an allocation failure
//! surfaces as [`Error::Exhausted`] instead of aborting the process.

use std::collections::TryReserveError;
use std::fmt;

/// The number of buffers a [`BufferPool`] keeps by default.
pub const DEFAULT_POOL_SIZE: usize = 32;

/// The initial capacity of pooled buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// An append-only, growable HTML buffer. Capacity grows geometrically (it is
/// backed by a [`String`]); every growth is fallible.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HtmlBuffer {
    buf: String,
}

impl HtmlBuffer {
    /// Creates an empty buffer without allocating.
    pub fn new() -> HtmlBuffer {
        HtmlBuffer { buf: String::new() }
    }

    /// Creates an empty buffer with room for at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<HtmlBuffer> {
        let mut buffer = HtmlBuffer::new();
        buffer.reserve(capacity)?;
        Ok(buffer)
    }

    /// Appends `s` to the end of the buffer.
    pub fn append(&mut self, s: &str) -> Result<()> {
        self.reserve(s.len())?;
        self.buf.push_str(s);
        Ok(())
    }

    /// Appends a single character.
    pub fn push(&mut self, c: char) -> Result<()> {
        self.reserve(c.len_utf8())?;
        self.buf.push(c);
        Ok(())
    }

    /// Clears the contents, keeping the allocation for reuse.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the buffer and returns its contents.
    pub fn into_string(self) -> String {
        self.buf
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.buf
            .try_reserve(additional)
            .map_err(|err| Error::Exhausted {
                requested: self.buf.len().saturating_add(additional),
                err,
            })
    }
}

impl fmt::Display for HtmlBuffer {
    /// Displays the buffer contents verbatim, which also gives us
    /// [`ToString::to_string`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

/// A fixed-size pool of reusable [`HtmlBuffer`]s. Checking out from an empty
/// pool never blocks or fails; it hands out a freshly allocated buffer
/// instead. Buffers checked back into a full pool are dropped.
#[derive(Debug)]
pub struct BufferPool {
    free: Vec<HtmlBuffer>,
    size: usize,
    buffer_capacity: usize,
}

impl BufferPool {
    /// Creates a pool holding `size` buffers of `buffer_capacity` bytes each.
    pub fn new(size: usize, buffer_capacity: usize) -> BufferPool {
        BufferPool {
            free: (0..size)
                .map(|_| HtmlBuffer {
                    buf: String::with_capacity(buffer_capacity),
                })
                .collect(),
            size,
            buffer_capacity,
        }
    }

    /// Takes a buffer out of the pool, or allocates a new one if every
    /// pooled buffer is checked out.
    pub fn checkout(&mut self) -> HtmlBuffer {
        match self.free.pop() {
            Some(buffer) => buffer,
            None => {
                log::debug!("buffer pool exhausted; allocating a fresh buffer");
                HtmlBuffer {
                    buf: String::with_capacity(self.buffer_capacity),
                }
            }
        }
    }

    /// Resets `buffer` and returns it to the pool.
    pub fn checkin(&mut self, mut buffer: HtmlBuffer) {
        if self.free.len() < self.size {
            buffer.reset();
            self.free.push(buffer);
        }
    }

    /// The number of buffers currently waiting in the pool.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(DEFAULT_POOL_SIZE, DEFAULT_BUFFER_CAPACITY)
    }
}

/// The result of a fallible buffer operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to grow an [`HtmlBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Returned when the allocator can't satisfy a growth request.
    Exhausted {
        requested: usize,
        err: TryReserveError,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Exhausted { requested, err } => write!(
                f,
                "out of memory growing HTML buffer to {} bytes: {}",
                requested, err
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Exhausted { requested: _, err } => Some(err),
        }
    }
}
