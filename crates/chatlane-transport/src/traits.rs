use crate::error::Result;
use crate::lane::Lane;

/// The outbound send primitive of a chat transport.
///
/// Callers guarantee `text` already satisfies the provider's line-length
/// limit. Once `send_line` returns `Ok`, the line is considered sent; the
/// provider offers no delivery confirmation.
pub trait LineSink {
    /// Hand one line of text to the transport on `lane`.
    fn send_line(&mut self, lane: Lane, text: &str) -> Result<()>;
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn send_line(&mut self, lane: Lane, text: &str) -> Result<()> {
        (**self).send_line(lane, text)
    }
}

impl<S: LineSink + ?Sized> LineSink for Box<S> {
    fn send_line(&mut self, lane: Lane, text: &str) -> Result<()> {
        (**self).send_line(lane, text)
    }
}
