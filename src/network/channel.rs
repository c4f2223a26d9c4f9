//! Duplex message channel to one peer
//!
//! Frames are newline-delimited JSON envelopes. Writes go through a per-channel mutex so
//! two threads never interleave the bytes of two frames; reads happen on a separate handle
//! owned by the [`Inbound`] iterator, which is drained by exactly one worker thread.
//!
//! Frames are read as raw bytes so that a frame with invalid UTF-8 is a decode error for
//! that frame alone. A frame longer than [`MAX_FRAME_BYTES`] is skipped up to its newline
//! and reported the same way.

use crate::error::{BlockchainError, Result};
use crate::network::message::Message;
use log::{debug, warn};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Outbound half of a peer connection, as seen by the registry and the sync engine
pub trait Peer: Send + Sync {
    /// Identity that is unique for the lifetime of the process
    fn id(&self) -> Uuid;

    /// Stable label for logs and peer listings
    fn remote_identity(&self) -> &str;

    /// Write one whole message
    fn send(&self, message: &Message) -> Result<()>;

    /// Release the transport; calling it again is a no-op
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Upper bound on one inbound frame, newline excluded
pub const MAX_FRAME_BYTES: u64 = 32 * 1024 * 1024;

pub struct PeerChannel {
    id: Uuid,
    remote: String,
    writer: Mutex<TcpStream>,
    // Separate handle so close() never waits behind a blocked writer
    control: TcpStream,
    closed: AtomicBool,
}

impl PeerChannel {
    /// Wrap a connected stream, returning the shared outbound half and the inbound sequence
    pub fn open(stream: TcpStream) -> Result<(Arc<PeerChannel>, Inbound)> {
        let remote = stream
            .peer_addr()
            .map_err(|e| BlockchainError::Network(format!("Failed to get peer address: {e}")))?
            .to_string();
        let reader = stream
            .try_clone()
            .map_err(|e| BlockchainError::Network(format!("Failed to clone stream: {e}")))?;
        let control = stream
            .try_clone()
            .map_err(|e| BlockchainError::Network(format!("Failed to clone stream: {e}")))?;

        let channel = Arc::new(PeerChannel {
            id: Uuid::new_v4(),
            remote,
            writer: Mutex::new(stream),
            control,
            closed: AtomicBool::new(false),
        });
        let inbound = Inbound {
            channel: Arc::clone(&channel),
            reader: BufReader::new(reader),
            max_frame: MAX_FRAME_BYTES,
            done: false,
        };
        Ok((channel, inbound))
    }
}

impl Peer for PeerChannel {
    fn id(&self) -> Uuid {
        self.id
    }

    fn remote_identity(&self) -> &str {
        &self.remote
    }

    fn send(&self, message: &Message) -> Result<()> {
        if self.is_closed() {
            return Err(BlockchainError::ChannelClosed(self.remote.clone()));
        }
        let mut frame = message.to_frame()?;
        frame.push('\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire writer lock: {e}")))?;
        let written = writer
            .write_all(frame.as_bytes())
            .and_then(|_| writer.flush());
        drop(writer);

        written.map_err(|e| {
            warn!("Write to {} failed, closing channel: {e}", self.remote);
            self.close();
            BlockchainError::Network(format!("Failed to send to {}: {e}", self.remote))
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closing channel to {}", self.remote);
            let _ = self.control.shutdown(Shutdown::Both);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Lazy sequence of inbound messages.
///
/// Yields `Err` for a frame that could not be decoded and keeps going; ends when the
/// transport reaches EOF or fails, leaving the channel closed. Once it has returned
/// `None` it keeps returning `None`.
pub struct Inbound {
    channel: Arc<PeerChannel>,
    reader: BufReader<TcpStream>,
    max_frame: u64,
    done: bool,
}

/// Outcome of reading one newline-terminated frame
enum Frame {
    Complete(Vec<u8>),
    Oversized,
    Eof,
}

impl Inbound {
    pub fn channel(&self) -> &Arc<PeerChannel> {
        &self.channel
    }

    fn read_frame(&mut self) -> std::io::Result<Frame> {
        let mut buf = Vec::new();
        // One extra byte tells a frame of exactly max_frame bytes from a longer one
        let read = (&mut self.reader)
            .take(self.max_frame + 1)
            .read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(Frame::Eof);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            return Ok(Frame::Complete(buf));
        }
        if (buf.len() as u64) <= self.max_frame {
            // Final frame without a trailing newline
            return Ok(Frame::Complete(buf));
        }

        // Discard the rest of the oversized frame without buffering it
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(Frame::Oversized);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.reader.consume(pos + 1);
                    return Ok(Frame::Oversized);
                }
                None => {
                    let len = available.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    fn finish(&mut self) -> Option<Result<Message>> {
        self.done = true;
        self.channel.close();
        None
    }
}

impl Iterator for Inbound {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.read_frame() {
                Ok(Frame::Complete(frame)) => {
                    if frame.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(Message::from_frame(&frame));
                }
                Ok(Frame::Oversized) => {
                    return Some(Err(BlockchainError::Protocol(format!(
                        "frame exceeds {} bytes",
                        self.max_frame
                    ))));
                }
                Ok(Frame::Eof) => return self.finish(),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if !self.channel.is_closed() {
                        debug!("Read from {} failed: {e}", self.channel.remote);
                    }
                    return self.finish();
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Inbound {}
