//! Loopback double for the native library, used by the unit tests.
//!
//! Streams opened through this module queue every frame they are given
//! and hand the queue back to reads on the same stream. A few extra
//! entry points let tests observe the exact interleaved image of the
//! last write, inject native status codes, and emulate a device that
//! takes a long time to accept a buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use libc::{c_char, c_double, c_int, c_ulong, c_void};

use super::{
    paBadStreamPtr, paInputOverflowed, paInvalidChannelCount, paInvalidDevice,
    paInvalidSampleRate, paNoError, paNotInitialized, paOutputUnderflowed,
    paUnanticipatedHostError, PaDeviceIndex, PaError, PaHostApiIndex, PaHostErrorInfo,
    PaSampleFormat, PaStream, PaStreamFlags, PaStreamParameters,
};

static LIVE_STREAMS: AtomicUsize = AtomicUsize::new(0);

struct FakeStream {
    inner: Mutex<Inner>,
}

struct Inner {
    input_channels: usize,
    output_channels: usize,
    started: bool,
    loopback: VecDeque<f32>,
    last_write: Vec<f32>,
    write_delay: Duration,
    next_status: PaError,
}

fn get<'a>(stream: *mut PaStream) -> &'a FakeStream {
    unsafe { &*(stream as *const FakeStream) }
}

fn lock(stream: *mut PaStream) -> std::sync::MutexGuard<'static, Inner> {
    get(stream).inner.lock().unwrap()
}

fn take_status(inner: &mut Inner) -> PaError {
    std::mem::replace(&mut inner.next_status, paNoError)
}

fn allocate(input_channels: usize, output_channels: usize) -> *mut PaStream {
    let stream = Box::new(FakeStream {
        inner: Mutex::new(Inner {
            input_channels,
            output_channels,
            started: false,
            loopback: VecDeque::new(),
            last_write: Vec::new(),
            write_delay: Duration::ZERO,
            next_status: paNoError,
        }),
    });
    LIVE_STREAMS.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(stream) as *mut PaStream
}

/// Number of fake streams currently open.
pub fn live_stream_count() -> usize {
    LIVE_STREAMS.load(Ordering::SeqCst)
}

/// The interleaved f32 image handed to the most recent write.
pub fn last_write(stream: *mut PaStream) -> Vec<f32> {
    lock(stream).last_write.clone()
}

/// Makes writes on this stream sleep, emulating a slow blocking device.
pub fn set_write_delay(stream: *mut PaStream, delay: Duration) {
    lock(stream).write_delay = delay;
}

/// The next status-returning call on this stream reports `status`.
pub fn fail_next(stream: *mut PaStream, status: PaError) {
    lock(stream).next_status = status;
}

pub unsafe fn Pa_GetVersion() -> c_int {
    1_246_976
}

pub unsafe fn Pa_GetVersionText() -> *const c_char {
    b"PortAudio V19.7.0-devel, revision unknown\0".as_ptr() as *const c_char
}

pub unsafe fn Pa_GetErrorText(error_code: PaError) -> *const c_char {
    let text: &'static [u8] = match error_code {
        paNoError => b"Success\0",
        paNotInitialized => b"PortAudio not initialized\0",
        paUnanticipatedHostError => b"Unanticipated host error\0",
        paInvalidChannelCount => b"Invalid number of channels\0",
        paInvalidSampleRate => b"Invalid sample rate\0",
        paInvalidDevice => b"Invalid device\0",
        paBadStreamPtr => b"Invalid stream pointer\0",
        paInputOverflowed => b"Input overflowed\0",
        paOutputUnderflowed => b"Output underflowed\0",
        _ => b"Invalid error code\0",
    };
    text.as_ptr() as *const c_char
}

pub unsafe fn Pa_Initialize() -> PaError {
    paNoError
}

pub unsafe fn Pa_Terminate() -> PaError {
    paNoError
}

pub unsafe fn Pa_GetHostApiCount() -> PaHostApiIndex {
    1
}

pub unsafe fn Pa_GetDefaultHostApi() -> PaHostApiIndex {
    0
}

pub unsafe fn Pa_GetDefaultInputDevice() -> PaDeviceIndex {
    0
}

pub unsafe fn Pa_GetDefaultOutputDevice() -> PaDeviceIndex {
    1
}

pub unsafe fn Pa_GetDeviceCount() -> PaDeviceIndex {
    2
}

pub unsafe fn Pa_GetLastHostErrorInfo() -> *const PaHostErrorInfo {
    struct SyncInfo(PaHostErrorInfo);
    unsafe impl Send for SyncInfo {}
    unsafe impl Sync for SyncInfo {}
    static INFO: OnceLock<SyncInfo> = OnceLock::new();
    &INFO
        .get_or_init(|| {
            SyncInfo(PaHostErrorInfo {
                host_api_type: 0,
                error_code: 0,
                error_text: b"no host error recorded\0".as_ptr() as *const c_char,
            })
        })
        .0
}

pub unsafe fn Pa_OpenStream(
    stream: *mut *mut PaStream,
    input_parameters: *const PaStreamParameters,
    output_parameters: *const PaStreamParameters,
    _sample_rate: c_double,
    _frames_per_buffer: c_ulong,
    _stream_flags: PaStreamFlags,
    _stream_callback: *const c_void,
    _user_data: *mut c_void,
) -> PaError {
    let input_channels = if input_parameters.is_null() {
        0
    } else {
        (*input_parameters).channel_count as usize
    };
    let output_channels = if output_parameters.is_null() {
        0
    } else {
        (*output_parameters).channel_count as usize
    };
    *stream = allocate(input_channels, output_channels);
    paNoError
}

pub unsafe fn Pa_OpenDefaultStream(
    stream: *mut *mut PaStream,
    num_input_channels: c_int,
    num_output_channels: c_int,
    _sample_format: PaSampleFormat,
    _sample_rate: c_double,
    _frames_per_buffer: c_ulong,
    _stream_callback: *const c_void,
    _user_data: *mut c_void,
) -> PaError {
    *stream = allocate(num_input_channels as usize, num_output_channels as usize);
    paNoError
}

pub unsafe fn Pa_StartStream(stream: *mut PaStream) -> PaError {
    let mut inner = lock(stream);
    let status = take_status(&mut inner);
    if status != paNoError {
        return status;
    }
    inner.started = true;
    paNoError
}

pub unsafe fn Pa_StopStream(stream: *mut PaStream) -> PaError {
    let mut inner = lock(stream);
    let status = take_status(&mut inner);
    if status != paNoError {
        return status;
    }
    inner.started = false;
    paNoError
}

pub unsafe fn Pa_AbortStream(stream: *mut PaStream) -> PaError {
    let mut inner = lock(stream);
    let status = take_status(&mut inner);
    if status != paNoError {
        return status;
    }
    inner.started = false;
    // Abort discards whatever was queued; stop would have drained it.
    inner.loopback.clear();
    paNoError
}

pub unsafe fn Pa_CloseStream(stream: *mut PaStream) -> PaError {
    drop(Box::from_raw(stream as *mut FakeStream));
    LIVE_STREAMS.fetch_sub(1, Ordering::SeqCst);
    paNoError
}

pub unsafe fn Pa_ReadStream(stream: *mut PaStream, buffer: *mut c_void, frames: c_ulong) -> PaError {
    let mut inner = lock(stream);
    let status = take_status(&mut inner);
    let samples = frames as usize * inner.input_channels;
    let out = std::slice::from_raw_parts_mut(buffer as *mut f32, samples);
    for sample in out.iter_mut() {
        *sample = inner.loopback.pop_front().unwrap_or(0.0);
    }
    status
}

pub unsafe fn Pa_WriteStream(
    stream: *mut PaStream,
    buffer: *const c_void,
    frames: c_ulong,
) -> PaError {
    let (delay, status) = {
        let mut inner = lock(stream);
        let status = take_status(&mut inner);
        let samples = frames as usize * inner.output_channels;
        let image = std::slice::from_raw_parts(buffer as *const f32, samples);
        inner.last_write = image.to_vec();
        if status == paNoError {
            inner.loopback.extend(image.iter().copied());
        }
        (inner.write_delay, status)
    };
    // The sleep happens with the stream unlocked, like a device wait.
    thread::sleep(delay);
    status
}
