//! NMEA Socket Stream
//!
//! Owns one TCP connection to the instrument source and yields raw sentence
//! lines. Any error ends the stream for good: the caller drops it (releasing
//! the socket handle) and reconnects, pacing attempts with [`Backoff`].

use crate::error::ConnectionError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// Buffered line reader over one TCP connection
pub struct SentenceStream {
    reader: BufReader<TcpStream>,
    peer: String,
    read_timeout: Duration,
}

impl SentenceStream {
    /// Connect to the NMEA source. One OS socket per call; dropping the
    /// returned stream closes it.
    pub async fn connect(
        host: &str,
        port: u16,
        read_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let peer = format!("{host}:{port}");
        let socket = TcpStream::connect(&peer)
            .await
            .map_err(|source| ConnectionError::Connect {
                peer: peer.clone(),
                source,
            })?;
        info!(%peer, ?read_timeout, "connected to NMEA source");
        Ok(Self {
            reader: BufReader::new(socket),
            peer,
            read_timeout,
        })
    }

    /// Remote address this stream reads from
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Read the next line, without its CR/LF terminator.
    ///
    /// The read timeout catches silently-dead peers; EOF surfaces as
    /// [`ConnectionError::Closed`]. After any error the stream must be
    /// dropped, not retried.
    pub async fn next_line(&mut self) -> Result<String, ConnectionError> {
        let mut line = String::new();
        let read = timeout(self.read_timeout, self.reader.read_line(&mut line))
            .await
            .map_err(|_| ConnectionError::ReadTimeout(self.read_timeout))??;
        if read == 0 {
            debug!(peer = %self.peer, "peer closed the connection");
            return Err(ConnectionError::Closed);
        }
        line.truncate(line.trim_end_matches(['\r', '\n']).len());
        Ok(line)
    }
}

/// Exponential reconnect backoff with a capped maximum delay and no attempt
/// limit; the source is assumed to become available eventually.
///
/// Pure delay arithmetic, nothing here sleeps. The caller decides when to
/// wait, which keeps reconnect behavior deterministic under test.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            next: initial,
        }
    }

    /// Delay before the upcoming attempt; doubles each call up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    /// Back to the initial delay, called after a successful connect.
    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}
