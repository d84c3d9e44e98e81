// src/serial/feed.rs - Async line feeder from a console-like source
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::serial::SerialPort;

/// Reads `reader` line by line and appends each line, newline included,
/// to the port's receive buffer. Returns the total bytes fed once the
/// reader reaches EOF.
pub async fn feed_lines<R>(reader: R, port: &SerialPort) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut total = 0;
    while let Some(line) = lines.next_line().await? {
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        total += bytes.len();
        port.ingest(&bytes);
        tracing::debug!(bytes = bytes.len(), "fed console line to serial");
    }
    tracing::info!(total, "serial input source closed");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialConfig;
    use crate::serial::CaptureSink;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_feed_lines_appends_with_newlines() {
        let port = SerialPort::with_sink(&SerialConfig::default(), Box::new(CaptureSink::new()));
        let input: &[u8] = b"10\r\n20\nlast";
        let total = feed_lines(BufReader::new(input), &port).await.unwrap();
        assert_eq!(total, 11);
        assert_eq!(port.pending(), b"10\n20\nlast\n");
        assert_eq!(port.parse_int(), 10);
        assert_eq!(port.parse_int(), 20);
    }

    #[test]
    fn test_feed_lines_empty_source() {
        let port = SerialPort::with_sink(&SerialConfig::default(), Box::new(CaptureSink::new()));
        let input: &[u8] = b"";
        let total = tokio_test::block_on(feed_lines(BufReader::new(input), &port)).unwrap();
        assert_eq!(total, 0);
        assert_eq!(port.available(), 0);
    }
}
