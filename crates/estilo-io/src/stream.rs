//! Real-time audio output via cpal.
//!
//! [`OutputStream`] owns a cpal output stream whose callback renders a
//! shared [`Context`] and fans the mono mix out to every output channel.
//! The context lives behind a mutex: the control thread locks it to
//! schedule gestures, the audio callback locks it to render one buffer.
//! Render calls are short and allocation-free, so contention stays in the
//! microsecond range at interactive buffer sizes.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use estilo_graph::Context;

use crate::{Error, Result};

/// Settings for opening an output stream.
///
/// ## Fields
///
/// - `device_name`: Substring match against output device names (uses the
///   system default when `None`)
/// - `buffer_size`: Preferred buffer size in frames, when the device
///   supports requesting one
#[derive(Debug, Clone, Default)]
pub struct StreamSettings {
    /// Optional device name filter.
    pub device_name: Option<String>,
    /// Preferred buffer size in frames.
    pub buffer_size: Option<u32>,
}

/// A live audio output stream rendering a shared context.
///
/// Playback runs while this handle exists; dropping it stops the stream.
pub struct OutputStream {
    _stream: cpal::Stream,
    sample_rate: f32,
    channels: u16,
}

impl OutputStream {
    /// Open the output device and start rendering `ctx`.
    ///
    /// The device's native sample rate wins: the context is expected to
    /// have been created at the rate this returns via
    /// [`sample_rate`](Self::sample_rate), so query the device first with
    /// [`probe_sample_rate`](Self::probe_sample_rate) when building the
    /// context.
    pub fn open(settings: StreamSettings, ctx: Arc<Mutex<Context>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_output_device(&host, settings.device_name.as_deref())?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?;

        let sample_rate = config.sample_rate() as f32;
        let channels = config.channels();

        let mut stream_config: cpal::StreamConfig = config.into();
        if let Some(frames) = settings.buffer_size {
            stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        let device_name = device.name().unwrap_or_else(|_| "unknown".into());
        tracing::info!(
            device = %device_name,
            sample_rate,
            channels,
            "output stream starting"
        );

        let mut mono = Vec::new();
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / usize::from(channels);
                    mono.resize(frames, 0.0);
                    match ctx.lock() {
                        Ok(mut ctx) => ctx.render(&mut mono),
                        Err(_) => mono.fill(0.0),
                    }
                    for (frame, &sample) in
                        data.chunks_mut(usize::from(channels)).zip(mono.iter())
                    {
                        frame.fill(sample);
                    }
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    /// The sample rate the device opened at, in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The device's output channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// The default output device's native sample rate, without opening a
    /// stream. Build the context at this rate.
    pub fn probe_sample_rate(device_name: Option<&str>) -> Result<f32> {
        let host = cpal::default_host();
        let device = find_output_device(&host, device_name)?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(config.sample_rate() as f32)
    }
}

/// Find an output device by case-insensitive name fragment, or the default.
fn find_output_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        Some(search) => {
            let search_lower = search.to_lowercase();
            let devices = host
                .output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?;

            for device in devices {
                if let Ok(dev_name) = device.name()
                    && dev_name.to_lowercase().contains(&search_lower)
                {
                    return Ok(device);
                }
            }
            Err(Error::DeviceNotFound(format!(
                "no output device matching '{}'",
                search
            )))
        }
        None => host.default_output_device().ok_or(Error::NoDevice),
    }
}

/// Name of the system default output device, for status display.
pub fn default_output_device_name() -> Result<String> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(Error::NoDevice)?;
    device.name().map_err(|e| Error::Stream(e.to_string()))
}
