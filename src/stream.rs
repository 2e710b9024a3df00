use std::ptr;

use dasp_sample::Sample;
use libc::{c_int, c_ulong, c_void};

use crate::error::check;
use crate::{ffi, BufferSize, ChannelCount, Error, SampleFormat, StreamParameters};

/// An open native stream in blocking mode.
///
/// The handle owns the native stream exclusively. [`close`](Stream::close)
/// releases it and leaves the handle permanently inert; dropping an
/// unclosed handle releases it as well, so a stream can never outlive
/// its owner. Operations take `&mut self`: the native stream has no
/// internal locking, and exclusive borrows are how the rule of one
/// operation at a time per handle is kept.
///
/// The channel counts used to size and interleave sample buffers are
/// the ones supplied to the open call; the native library does not
/// report them back from the handle.
#[derive(Debug)]
pub struct Stream {
    raw: *mut ffi::PaStream,
    input_channels: usize,
    output_channels: usize,
}

// The handle is exclusively owned and PortAudio allows a stream to be
// driven from a thread other than the one that opened it.
unsafe impl Send for Stream {}

impl Stream {
    /// Opens a stream on explicitly chosen devices.
    ///
    /// Pass `None` for a direction the stream does not have; at least
    /// one side must be present for the native open to succeed. The
    /// stream starts out stopped.
    pub fn open(
        input: Option<&StreamParameters>,
        output: Option<&StreamParameters>,
        sample_rate: f64,
        buffer_size: BufferSize,
    ) -> Result<Stream, Error> {
        let input_native = input.map(StreamParameters::to_native);
        let output_native = output.map(StreamParameters::to_native);
        let mut raw: *mut ffi::PaStream = ptr::null_mut();
        let status = unsafe {
            ffi::Pa_OpenStream(
                &mut raw,
                opt_params_ptr(&input_native),
                opt_params_ptr(&output_native),
                sample_rate,
                frames_per_buffer(buffer_size),
                ffi::paNoFlag,
                ptr::null(),
                ptr::null_mut(),
            )
        };
        check(status)?;
        let stream = Stream {
            raw,
            input_channels: input.map_or(0, |p| usize::from(p.channel_count)),
            output_channels: output.map_or(0, |p| usize::from(p.channel_count)),
        };
        log::debug!(
            "opened stream ({} in, {} out) at {} Hz",
            stream.input_channels,
            stream.output_channels,
            sample_rate
        );
        Ok(stream)
    }

    /// Opens a stream on the default devices, letting the native
    /// library pick the latency. Both directions share `sample_format`.
    pub fn open_default(
        input_channels: ChannelCount,
        output_channels: ChannelCount,
        sample_format: SampleFormat,
        sample_rate: f64,
        buffer_size: BufferSize,
    ) -> Result<Stream, Error> {
        let mut raw: *mut ffi::PaStream = ptr::null_mut();
        let status = unsafe {
            ffi::Pa_OpenDefaultStream(
                &mut raw,
                c_int::from(input_channels),
                c_int::from(output_channels),
                sample_format.to_native(),
                sample_rate,
                frames_per_buffer(buffer_size),
                ptr::null(),
                ptr::null_mut(),
            )
        };
        check(status)?;
        let stream = Stream {
            raw,
            input_channels: usize::from(input_channels),
            output_channels: usize::from(output_channels),
        };
        log::debug!(
            "opened default stream ({} in, {} out) at {} Hz",
            stream.input_channels,
            stream.output_channels,
            sample_rate
        );
        Ok(stream)
    }

    /// Starts audio processing.
    pub fn start(&mut self) -> Result<(), Error> {
        let raw = self.as_raw()?;
        check(unsafe { ffi::Pa_StartStream(raw) })?;
        Ok(())
    }

    /// Stops audio processing once pending buffers have played out.
    pub fn stop(&mut self) -> Result<(), Error> {
        let raw = self.as_raw()?;
        check(unsafe { ffi::Pa_StopStream(raw) })?;
        Ok(())
    }

    /// Stops audio processing immediately, discarding pending buffers.
    pub fn abort(&mut self) -> Result<(), Error> {
        let raw = self.as_raw()?;
        check(unsafe { ffi::Pa_AbortStream(raw) })?;
        Ok(())
    }

    /// Closes the native stream.
    ///
    /// The handle is permanently inert afterwards: every further
    /// operation, including a second `close`, fails with
    /// [`Error::StreamClosed`]. Dropping the handle later is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        let raw = self.as_raw()?;
        // Null the pointer before inspecting the status so that a close
        // the native side rejected can never run twice.
        self.raw = ptr::null_mut();
        let status = unsafe { ffi::Pa_CloseStream(raw) };
        log::debug!("closed stream");
        check(status)?;
        Ok(())
    }

    /// Writes `frames` frames taken from `channels[..][offset..offset + frames]`
    /// to the stream, blocking until the native library has accepted
    /// them all.
    ///
    /// `channels` holds one `f64` buffer per output channel. Samples
    /// are interleaved into a transient 32-bit float buffer before the
    /// native call; the calling thread blocks for the duration, other
    /// threads are unaffected.
    pub fn write<S>(&mut self, channels: &[S], offset: usize, frames: usize) -> Result<(), Error>
    where
        S: AsRef<[f64]>,
    {
        let raw = self.as_raw()?;
        if channels.len() != self.output_channels {
            return Err(Error::ChannelCountMismatch {
                expected: self.output_channels,
                actual: channels.len(),
            });
        }
        check_window(channels.iter().map(|c| c.as_ref().len()), offset, frames)?;

        let mut interleaved = Vec::with_capacity(self.output_channels * frames);
        for frame in 0..frames {
            for channel in channels {
                interleaved.push(channel.as_ref()[offset + frame].to_sample::<f32>());
            }
        }
        let status =
            unsafe { ffi::Pa_WriteStream(raw, interleaved.as_ptr() as *const c_void, frames as c_ulong) };
        check(status)?;
        Ok(())
    }

    /// Reads `frames` frames from the stream into
    /// `channels[..][offset..offset + frames]`, blocking until the
    /// native library has captured them all.
    ///
    /// `channels` holds one `f64` buffer per input channel. Captured
    /// samples are handed to the caller even when the native read also
    /// reports an error, as overflow statuses come with valid data.
    pub fn read<S>(&mut self, channels: &mut [S], offset: usize, frames: usize) -> Result<(), Error>
    where
        S: AsMut<[f64]>,
    {
        let raw = self.as_raw()?;
        if channels.len() != self.input_channels {
            return Err(Error::ChannelCountMismatch {
                expected: self.input_channels,
                actual: channels.len(),
            });
        }
        check_window(
            channels.iter_mut().map(|c| c.as_mut().len()),
            offset,
            frames,
        )?;

        let mut interleaved = vec![0.0f32; self.input_channels * frames];
        let status = unsafe {
            ffi::Pa_ReadStream(raw, interleaved.as_mut_ptr() as *mut c_void, frames as c_ulong)
        };
        for (index, channel) in channels.iter_mut().enumerate() {
            let samples = channel.as_mut();
            for frame in 0..frames {
                samples[offset + frame] =
                    interleaved[frame * self.input_channels + index].to_sample::<f64>();
            }
        }
        check(status)?;
        Ok(())
    }

    fn as_raw(&self) -> Result<*mut ffi::PaStream, Error> {
        if self.raw.is_null() {
            Err(Error::StreamClosed)
        } else {
            Ok(self.raw)
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // Backstop for handles that were never explicitly closed; an
        // earlier `close` has already nulled the pointer.
        if !self.raw.is_null() {
            let status = unsafe { ffi::Pa_CloseStream(self.raw) };
            self.raw = ptr::null_mut();
            if status != ffi::paNoError {
                log::warn!("closing dropped stream failed: {}", crate::error_text(status));
            }
        }
    }
}

fn frames_per_buffer(size: BufferSize) -> c_ulong {
    match size {
        BufferSize::Default => ffi::paFramesPerBufferUnspecified,
        BufferSize::Fixed(frames) => c_ulong::from(frames),
    }
}

fn opt_params_ptr(params: &Option<ffi::PaStreamParameters>) -> *const ffi::PaStreamParameters {
    params
        .as_ref()
        .map_or(ptr::null(), |p| p as *const ffi::PaStreamParameters)
}

/// Every channel buffer must cover `offset + frames` samples.
fn check_window<I>(lengths: I, offset: usize, frames: usize) -> Result<(), Error>
where
    I: Iterator<Item = usize>,
{
    for len in lengths {
        if offset.checked_add(frames).map_or(true, |end| end > len) {
            return Err(Error::OutOfBounds {
                offset,
                frames,
                len,
            });
        }
    }
    Ok(())
}
