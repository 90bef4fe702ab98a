//! COBS-framed postcard encoding
//!
//! Every message leaving or entering the MCU over a UART is a postcard
//! payload wrapped in COBS, so a zero byte always ends a frame and a
//! receiver can resynchronise after noise by discarding up to the next zero.

use serde::{de::DeserializeOwned, Serialize};

/// Largest encoded frame, including the terminating zero
pub const MAX_FRAME_LEN: usize = 160;

/// Frame encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Message did not fit the output buffer
    Overflow,
    /// Bytes did not decode to the expected message
    Malformed,
}

/// Encode `msg` into `buf`, returning the frame including its zero delimiter
pub fn encode_frame<'a, T: Serialize>(msg: &T, buf: &'a mut [u8]) -> Result<&'a mut [u8], FrameError> {
    postcard::to_slice_cobs(msg, buf).map_err(|_| FrameError::Overflow)
}

/// Decode one frame in place
///
/// `frame` may or may not include the trailing zero.
pub fn decode_frame<T: DeserializeOwned>(frame: &mut [u8]) -> Result<T, FrameError> {
    postcard::from_bytes_cobs(frame).map_err(|_| FrameError::Malformed)
}

/// Accumulates bytes from a stream until a frame delimiter arrives
pub struct FrameReader<const CAP: usize> {
    buf: heapless::Vec<u8, CAP>,
    overflowed: bool,
}

impl<const CAP: usize> FrameReader<CAP> {
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte; on a delimiter, decode what was collected
    ///
    /// Returns `None` while a frame is still being collected. A frame that
    /// outgrew the buffer is dropped whole and reported as
    /// [`FrameError::Overflow`].
    pub fn push<T: DeserializeOwned>(&mut self, byte: u8) -> Option<Result<T, FrameError>> {
        if self.buf.push(byte).is_err() {
            self.overflowed = true;
        }
        if byte != 0 {
            return None;
        }

        let result = if self.overflowed {
            Some(Err(FrameError::Overflow))
        } else if self.buf.len() > 1 {
            Some(decode_frame(self.buf.as_mut_slice()))
        } else {
            None
        };

        self.buf.clear();
        self.overflowed = false;
        result
    }
}

impl<const CAP: usize> Default for FrameReader<CAP> {
    fn default() -> Self {
        Self::new()
    }
}
