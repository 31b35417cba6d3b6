use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::lane::{Lane, LaneChannels};
use crate::line::{pong_reply, privmsg};
use crate::traits::LineSink;

/// Blocking line connection to a chat provider over TCP.
///
/// Each lane is bound to a provider channel; [`LineSink::send_line`] writes a
/// `PRIVMSG` to the lane's channel. Provider `PING`s seen while reading are
/// answered in place and never returned to the caller. Authentication and
/// channel joins are the caller's business (see [`send_raw`](Self::send_raw)).
pub struct TcpLineConnection {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
    channels: LaneChannels,
    peer: String,
}

impl TcpLineConnection {
    /// Connect to `addr` (e.g. `irc.example.net:6667`).
    pub fn connect(addr: &str, channels: LaneChannels) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        debug!(addr, "connected to chat provider");
        Self::from_stream(stream, channels)
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: TcpStream, channels: LaneChannels) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader,
            channels,
            peer,
        })
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.writer.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.writer.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Write one raw provider command, appending CRLF.
    pub fn send_raw(&mut self, command: &str) -> Result<()> {
        if let Some(position) = command.find(['\r', '\n']) {
            return Err(TransportError::LineBreak { position });
        }
        trace!(peer = %self.peer, command, "send");
        let mut wire = String::with_capacity(command.len() + 2);
        wire.push_str(command);
        wire.push_str("\r\n");

        let bytes = wire.as_bytes();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.writer.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Read the next inbound line (blocking), without its line terminator.
    ///
    /// Returns `Err(TransportError::ConnectionClosed)` at EOF.
    pub fn recv_line(&mut self) -> Result<String> {
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line)?;
            if read == 0 {
                return Err(TransportError::ConnectionClosed);
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            if let Some(reply) = pong_reply(line) {
                debug!(peer = %self.peer, "answering provider ping");
                self.send_raw(&reply)?;
                continue;
            }
            return Ok(line.to_string());
        }
    }

    /// Channel bindings for each lane.
    pub fn channels(&self) -> &LaneChannels {
        &self.channels
    }

    /// Remote address, for diagnostics.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl LineSink for TcpLineConnection {
    fn send_line(&mut self, lane: Lane, text: &str) -> Result<()> {
        let channel = self
            .channels
            .channel(lane)
            .ok_or(TransportError::UnboundLane(lane.name()))?;
        let command = privmsg(channel, text)?;
        self.send_raw(&command)
    }
}

impl std::fmt::Debug for TcpLineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLineConnection")
            .field("peer", &self.peer)
            .field("channels", &self.channels)
            .finish()
    }
}
