//! # Safe bindings to the PortAudio blocking API
//!
//! PortAudio supplies the actual audio engine: host API discovery,
//! device scheduling and the sample clock all live in the native
//! library. This crate owns the boundary. It translates status codes,
//! builds native parameter structures, ties the lifetime of a native
//! stream to a [`Stream`] value, and moves multichannel sample data
//! across the FFI line.
//!
//! Here are the concepts the crate exposes:
//!
//! - The free functions ([`initialize`], [`device_count`],
//!   [`default_output_device`], ...) map one-to-one onto PortAudio's
//!   library-level entry points. Call [`initialize`] before anything
//!   else and [`terminate`] once you are done. The crate does not
//!   referee that pairing: the native contract tolerates redundant
//!   pairs but unmatched calls leak or crash, and that discipline is
//!   the application's.
//! - A [`Stream`] is an open native stream in blocking mode. Frames
//!   move through [`Stream::write`] and [`Stream::read`] as
//!   per-channel `f64` buffers; the stream interleaves them and
//!   narrows to the native 32-bit float layout on the way through.
//!   Closing is explicit via [`Stream::close`], with drop as the
//!   backstop for handles that escape.
//!
//! ```no_run
//! use paudio::{BufferSize, SampleFormat, Stream};
//!
//! paudio::initialize()?;
//! let mut stream = Stream::open_default(0, 2, SampleFormat::F32, 44_100.0, BufferSize::Default)?;
//! stream.start()?;
//! let silence = vec![vec![0.0f64; 1024]; 2];
//! stream.write(&silence, 0, 1024)?;
//! stream.close()?;
//! paudio::terminate()?;
//! # Ok::<(), paudio::Error>(())
//! ```
//!
//! A blocking [`Stream::write`] or [`Stream::read`] parks only the
//! calling thread in the native library; every other thread keeps
//! running. There is no cancellation: the call returns when the native
//! layer is done or fails.

pub use error::Error;
pub use samples_formats::SampleFormat;
pub use stream::Stream;

mod error;
mod ffi;
mod samples_formats;
mod stream;

use std::ffi::CStr;
use std::ptr;

use libc::{c_char, c_int};

use error::check;

/// Number of channels on one side of a stream.
pub type ChannelCount = u16;

/// The desired number of frames for the hardware buffer.
pub type FrameCount = u32;

/// Raw status code as returned by the native library.
pub type ErrorCode = i32;

/// Index of an audio device, as enumerated by the native library.
pub type DeviceIndex = i32;

/// Index of a host audio API (ALSA, CoreAudio, WASAPI, ...).
pub type HostApiIndex = i32;

/// The buffer size used by a stream.
///
/// [`Default`](BufferSize::Default) leaves the choice to the native
/// library. Note that the default may be surprisingly large; if low
/// latency matters, use [`Fixed`](BufferSize::Fixed).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BufferSize {
    #[default]
    Default,
    Fixed(FrameCount),
}

/// One side (input or output) of a stream to open.
///
/// Consumed by [`Stream::open`]; the native parameter structure built
/// from it only lives for the duration of the open call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamParameters {
    /// Device to open this side on.
    pub device: DeviceIndex,
    /// Number of channels on this side.
    pub channel_count: ChannelCount,
    /// Sample format negotiated with the native library.
    pub sample_format: SampleFormat,
    /// Suggested latency in seconds; the native library negotiates the
    /// value it actually uses.
    pub suggested_latency: f64,
}

impl StreamParameters {
    pub(crate) fn to_native(&self) -> ffi::PaStreamParameters {
        ffi::PaStreamParameters {
            device: self.device,
            channel_count: c_int::from(self.channel_count),
            sample_format: self.sample_format.to_native(),
            suggested_latency: self.suggested_latency,
            host_api_specific_stream_info: ptr::null_mut(),
        }
    }
}

/// Host-specific details behind an
/// [`UnanticipatedHostError`](Error::UnanticipatedHostError).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostErrorInfo {
    /// Error code as defined by the host API, not by PortAudio.
    pub code: i64,
    /// Host-provided description.
    pub text: String,
}

/// The native library's version number.
pub fn version() -> i32 {
    unsafe { ffi::Pa_GetVersion() }
}

/// The native library's version as displayable text.
pub fn version_text() -> String {
    unsafe { cstr_to_string(ffi::Pa_GetVersionText()) }
}

/// Human-readable text for a status code.
///
/// Always succeeds; an unrecognized code produces the native library's
/// placeholder label for it.
pub fn error_text(code: ErrorCode) -> String {
    unsafe { cstr_to_string(ffi::Pa_GetErrorText(code)) }
}

/// Initializes the native library.
///
/// Must complete successfully before any device or stream operation.
/// Every successful call must eventually be balanced by a
/// [`terminate`].
pub fn initialize() -> Result<(), Error> {
    check(unsafe { ffi::Pa_Initialize() })?;
    log::debug!("portaudio initialized");
    Ok(())
}

/// Releases the native library's resources, closing any streams still
/// open.
pub fn terminate() -> Result<(), Error> {
    check(unsafe { ffi::Pa_Terminate() })?;
    log::debug!("portaudio terminated");
    Ok(())
}

/// Number of host APIs available.
pub fn host_api_count() -> Result<u32, Error> {
    check(unsafe { ffi::Pa_GetHostApiCount() }).map(|n| n as u32)
}

/// Index of the default host API.
pub fn default_host_api() -> Result<HostApiIndex, Error> {
    check(unsafe { ffi::Pa_GetDefaultHostApi() })
}

/// Index of the default input device, or an error when the system has
/// none.
pub fn default_input_device() -> Result<DeviceIndex, Error> {
    check(unsafe { ffi::Pa_GetDefaultInputDevice() })
}

/// Index of the default output device, or an error when the system has
/// none.
pub fn default_output_device() -> Result<DeviceIndex, Error> {
    check(unsafe { ffi::Pa_GetDefaultOutputDevice() })
}

/// Number of devices available across all host APIs.
pub fn device_count() -> Result<u32, Error> {
    check(unsafe { ffi::Pa_GetDeviceCount() }).map(|n| n as u32)
}

/// Details of the last host-API error.
///
/// Only meaningful right after a call failed with
/// [`UnanticipatedHostError`](Error::UnanticipatedHostError); the
/// native library updates it as a side effect of its own calls.
pub fn last_host_error() -> HostErrorInfo {
    let info = unsafe { &*ffi::Pa_GetLastHostErrorInfo() };
    HostErrorInfo {
        code: info.error_code as i64,
        text: unsafe { cstr_to_string(info.error_text) },
    }
}

unsafe fn cstr_to_string(text: *const c_char) -> String {
    if text.is_null() {
        return String::new();
    }
    CStr::from_ptr(text).to_string_lossy().into_owned()
}
