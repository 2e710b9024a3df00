//! Raw FFI declarations for PortAudio.
//!
//! Types, constants and entry points match `portaudio.h` for the subset
//! the blocking API needs. Only the declarations live here; every call
//! site is in the safe layer above.
//!
//! When the crate itself is compiled for its unit tests the extern
//! block is replaced by the loopback double in [`fake`], so the suite
//! runs without the native library or any audio hardware.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]
#![allow(dead_code)]

use libc::{c_char, c_double, c_int, c_long, c_ulong, c_void};

pub type PaError = c_int;
pub type PaDeviceIndex = c_int;
pub type PaHostApiIndex = c_int;
pub type PaTime = c_double;
pub type PaSampleFormat = c_ulong;
pub type PaStreamFlags = c_ulong;

pub const paNoError: PaError = 0;

pub const paNotInitialized: PaError = -10000;
pub const paUnanticipatedHostError: PaError = -9999;
pub const paInvalidChannelCount: PaError = -9998;
pub const paInvalidSampleRate: PaError = -9997;
pub const paInvalidDevice: PaError = -9996;
pub const paSampleFormatNotSupported: PaError = -9994;
pub const paInsufficientMemory: PaError = -9992;
pub const paBadStreamPtr: PaError = -9988;
pub const paInputOverflowed: PaError = -9981;
pub const paOutputUnderflowed: PaError = -9980;

pub const paNoDevice: PaDeviceIndex = -1;

pub const paFloat32: PaSampleFormat = 0x0000_0001;
pub const paInt32: PaSampleFormat = 0x0000_0002;
pub const paInt24: PaSampleFormat = 0x0000_0004;
pub const paInt16: PaSampleFormat = 0x0000_0008;
pub const paInt8: PaSampleFormat = 0x0000_0010;

pub const paNoFlag: PaStreamFlags = 0;
pub const paFramesPerBufferUnspecified: c_ulong = 0;

/// Opaque native stream handle.
pub enum PaStream {}

#[repr(C)]
pub struct PaStreamParameters {
    pub device: PaDeviceIndex,
    pub channel_count: c_int,
    pub sample_format: PaSampleFormat,
    pub suggested_latency: PaTime,
    pub host_api_specific_stream_info: *mut c_void,
}

#[repr(C)]
pub struct PaHostErrorInfo {
    pub host_api_type: c_int,
    pub error_code: c_long,
    pub error_text: *const c_char,
}

#[cfg(not(test))]
#[link(name = "portaudio")]
extern "C" {
    pub fn Pa_GetVersion() -> c_int;
    pub fn Pa_GetVersionText() -> *const c_char;
    pub fn Pa_GetErrorText(error_code: PaError) -> *const c_char;

    pub fn Pa_Initialize() -> PaError;
    pub fn Pa_Terminate() -> PaError;

    pub fn Pa_GetHostApiCount() -> PaHostApiIndex;
    pub fn Pa_GetDefaultHostApi() -> PaHostApiIndex;
    pub fn Pa_GetDefaultInputDevice() -> PaDeviceIndex;
    pub fn Pa_GetDefaultOutputDevice() -> PaDeviceIndex;
    pub fn Pa_GetDeviceCount() -> PaDeviceIndex;
    pub fn Pa_GetLastHostErrorInfo() -> *const PaHostErrorInfo;

    pub fn Pa_OpenStream(
        stream: *mut *mut PaStream,
        input_parameters: *const PaStreamParameters,
        output_parameters: *const PaStreamParameters,
        sample_rate: c_double,
        frames_per_buffer: c_ulong,
        stream_flags: PaStreamFlags,
        stream_callback: *const c_void,
        user_data: *mut c_void,
    ) -> PaError;

    pub fn Pa_OpenDefaultStream(
        stream: *mut *mut PaStream,
        num_input_channels: c_int,
        num_output_channels: c_int,
        sample_format: PaSampleFormat,
        sample_rate: c_double,
        frames_per_buffer: c_ulong,
        stream_callback: *const c_void,
        user_data: *mut c_void,
    ) -> PaError;

    pub fn Pa_StartStream(stream: *mut PaStream) -> PaError;
    pub fn Pa_StopStream(stream: *mut PaStream) -> PaError;
    pub fn Pa_AbortStream(stream: *mut PaStream) -> PaError;
    pub fn Pa_CloseStream(stream: *mut PaStream) -> PaError;

    pub fn Pa_ReadStream(stream: *mut PaStream, buffer: *mut c_void, frames: c_ulong) -> PaError;
    pub fn Pa_WriteStream(stream: *mut PaStream, buffer: *const c_void, frames: c_ulong)
        -> PaError;
}

#[cfg(test)]
pub(crate) mod fake;
#[cfg(test)]
pub(crate) use self::fake::*;
