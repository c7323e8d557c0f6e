//! Chunked buffer for the bytes of the pending token
//!
//! Bytes are appended to fixed-capacity chunks, so growing the buffer never copies
//! already buffered bytes. The chunks are only concatenated once, when the token is
//! taken at a token boundary.

use crate::tree::arena::AllocError;

/// Default capacity in bytes of one chunk
pub(crate) const DEFAULT_CHUNK_CAPACITY: usize = 1000;

#[derive(Debug)]
pub(crate) struct Accumulator {
    chunk_capacity: usize,
    /// All chunks except the last one are full
    chunks: Vec<Vec<u8>>,
    len: usize,
    /// Length of the run of buffered whitespace at the end
    trailing_whitespace: usize,
    /// Whether the token has content, even if it is empty (`""`)
    has_content: bool,
}

impl Accumulator {
    pub(crate) fn new(chunk_capacity: usize) -> Self {
        Accumulator {
            chunk_capacity: chunk_capacity.max(1),
            chunks: Vec::new(),
            len: 0,
            trailing_whitespace: 0,
            has_content: false,
        }
    }

    /// Number of buffered bytes, including trailing whitespace
    #[cfg(test)]
    fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn has_content(&self) -> bool {
        self.has_content
    }

    fn append(&mut self, byte: u8) -> Result<(), AllocError> {
        let needs_chunk = match self.chunks.last() {
            Some(chunk) => chunk.len() >= self.chunk_capacity,
            None => true,
        };
        if needs_chunk {
            let mut chunk = Vec::new();
            chunk.try_reserve_exact(self.chunk_capacity)?;
            self.chunks.try_reserve(1)?;
            self.chunks.push(chunk);
        }
        match self.chunks.last_mut() {
            Some(chunk) => chunk.push(byte),
            None => panic!("Unexpected: No chunk after reserving one"),
        }
        self.len += 1;
        Ok(())
    }

    /// Buffers a significant byte
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), AllocError> {
        self.append(byte)?;
        self.trailing_whitespace = 0;
        self.has_content = true;
        Ok(())
    }

    pub(crate) fn push_all(&mut self, bytes: &[u8]) -> Result<(), AllocError> {
        for &byte in bytes {
            self.push(byte)?;
        }
        Ok(())
    }

    /// Buffers insignificant whitespace outside of quotes
    ///
    /// Leading whitespace is dropped. Whitespace following content is buffered
    /// because more content might follow, but a trailing run is excluded by
    /// [`take`](Self::take).
    pub(crate) fn push_whitespace(&mut self, byte: u8) -> Result<(), AllocError> {
        if self.len == 0 {
            return Ok(());
        }
        self.append(byte)?;
        self.trailing_whitespace += 1;
        Ok(())
    }

    /// Records a quote; the token has content from now on, and whitespace which
    /// was buffered before the quote is no longer trailing
    pub(crate) fn mark_quote(&mut self) {
        self.trailing_whitespace = 0;
        self.has_content = true;
    }

    /// Takes the token without its trailing whitespace run, and clears the buffer
    pub(crate) fn take(&mut self) -> Result<Box<[u8]>, AllocError> {
        let token_len = self.len - self.trailing_whitespace;
        let mut token = Vec::new();
        token.try_reserve_exact(token_len)?;
        for chunk in &self.chunks {
            let remaining = token_len - token.len();
            if remaining == 0 {
                break;
            }
            token.extend_from_slice(&chunk[..remaining.min(chunk.len())]);
        }
        self.clear();
        Ok(token.into_boxed_slice())
    }

    /// Discards the buffered token, keeping the first chunk allocated
    pub(crate) fn clear(&mut self) {
        self.chunks.truncate(1);
        if let Some(chunk) = self.chunks.first_mut() {
            chunk.clear();
        }
        self.len = 0;
        self.trailing_whitespace = 0;
        self.has_content = false;
    }
}
