use thiserror::Error;

use crate::{error_text, ffi, ErrorCode};

/// Failure raised by any operation that crosses into the native
/// library, plus the conditions the binding catches before native code
/// is reached.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The host API reported an error outside PortAudio's own code
    /// space.
    ///
    /// PortAudio keeps the details on its side; call
    /// [`last_host_error`](crate::last_host_error) to retrieve the
    /// host-specific code and message.
    #[error("unanticipated host error (see `last_host_error` for details)")]
    UnanticipatedHostError,

    /// Any other negative PortAudio status.
    ///
    /// The code resolves to a human-readable description through
    /// [`error_text`](crate::error_text), which is also what the
    /// `Display` impl renders.
    #[error("{}", error_text(*.code))]
    Backend { code: ErrorCode },

    /// The stream has already been closed and its native handle
    /// released.
    #[error("the stream has been closed")]
    StreamClosed,

    /// The per-channel buffer collection does not match the channel
    /// count negotiated when the stream was opened.
    #[error("expected {expected} channel buffers, found {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    /// `offset + frames` does not fit within one of the channel
    /// buffers.
    #[error("frame window {offset}+{frames} exceeds channel buffer length {len}")]
    OutOfBounds {
        offset: usize,
        frames: usize,
        len: usize,
    },
}

/// Translates a native status into the two-tier error taxonomy.
///
/// Non-negative values are meaningful results (often counts) and pass
/// through untouched.
pub(crate) fn check(code: ffi::PaError) -> Result<i32, Error> {
    if code >= 0 {
        Ok(code)
    } else if code == ffi::paUnanticipatedHostError {
        Err(Error::UnanticipatedHostError)
    } else {
        Err(Error::Backend { code })
    }
}
