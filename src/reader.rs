// $t@$h
use std::io::{self, BufRead};

/// Splits a byte stream into newline-terminated chunks no longer than
/// `buffer_size - 1` bytes. Longer lines come out as several chunks and only
/// the last one keeps the newline.
pub struct ChunkReader<R> {
    inner: R,
    max_chunk: usize,
}

impl<R: BufRead> ChunkReader<R> {
    pub fn new(inner: R, buffer_size: usize) -> Self {
        Self {
            inner,
            max_chunk: buffer_size.saturating_sub(1).max(1),
        }
    }

    /// Appends the next chunk to `buf` and returns its length. `Ok(0)` means
    /// end of input.
    pub fn read_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut read = 0;
        while read < self.max_chunk {
            let available = match self.inner.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }

            let window = &available[..available.len().min(self.max_chunk - read)];
            let (taken, done) = match window.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (window.len(), false),
            };
            buf.extend_from_slice(&window[..taken]);
            self.inner.consume(taken);
            read += taken;
            if done {
                break;
            }
        }
        Ok(read)
    }
}

/// Drops one trailing `\n` or `\r`.
pub fn strip_terminator(chunk: &[u8]) -> &[u8] {
    match chunk.last() {
        Some(b'\n') | Some(b'\r') => &chunk[..chunk.len() - 1],
        _ => chunk,
    }
}
