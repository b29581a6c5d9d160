// $t@$h
use crate::connection::{Backend, Connection};
use crate::reader::{strip_terminator, ChunkReader};
use log::{error, trace, warn};
use std::io::BufRead;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    pub published: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Publishes every non-empty line of `input` until end of input. A read
/// error ends the loop the same way.
pub fn line_processing_loop<B, R>(
    input: R,
    connection: &mut Connection<B>,
    buffer_size: usize,
) -> PublishStats
where
    B: Backend,
    R: BufRead,
{
    let mut reader = ChunkReader::new(input, buffer_size);
    let mut buffer = Vec::with_capacity(buffer_size);
    let mut stats = PublishStats::default();

    loop {
        match reader.read_chunk(&mut buffer) {
            Ok(0) => break,
            Ok(_) => handle_line(strip_terminator(&buffer), connection, &mut stats),
            Err(e) => {
                warn!("failed to read standard input: {}", e);
                break;
            }
        }
        buffer.fill(0);
        buffer.clear();
    }

    stats
}

fn handle_line<B: Backend>(line: &[u8], connection: &mut Connection<B>, stats: &mut PublishStats) {
    if line.is_empty() {
        stats.skipped += 1;
        return;
    }
    match connection.publish(line) {
        Ok(()) => {
            stats.published += 1;
            trace!("published {} bytes", line.len());
        }
        Err(e) => {
            stats.failed += 1;
            error!("failed to publish message: {:#}", e);
        }
    }
}
