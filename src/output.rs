//! CPAL audio output wrapper.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::callback::{process_audio, AudioCallbackState};
use crate::{Error, Result};

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. This is safe
/// because the stream lives behind the `Mutex<AudioOutput>` in
/// `TactusSystem`, is never handed to another thread, and is dropped
/// with the output it belongs to.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: single-threaded access is guaranteed by the owning Mutex; the
// stream stays on the thread that created it until AudioOutput drops.
unsafe impl Send for StreamHandle {}

/// Realtime output boundary: owns the device stream and drives the
/// callback state once per period.
pub struct AudioOutput {
    sample_rate: u32,
    channels: usize,
    is_running: bool,
    device_index: Option<usize>,
    _stream: Option<StreamHandle>,
}

impl AudioOutput {
    pub fn new(device_index: Option<usize>) -> Result<Self> {
        let device = Self::get_device(device_index)?;
        let output_config = device.default_output_config()?;

        Ok(Self {
            sample_rate: output_config.sample_rate().0,
            channels: output_config.channels() as usize,
            is_running: false,
            device_index,
            _stream: None,
        })
    }

    pub fn start(&mut self, state: AudioCallbackState) -> Result<()> {
        if self.is_running {
            return Ok(());
        }

        let device = Self::get_device(self.device_index)?;
        let config = device.default_output_config()?;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &config.into(), state)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &config.into(), state)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &config.into(), state)?,
            format => {
                return Err(Error::InvalidConfig(format!(
                    "unsupported sample format: {:?}",
                    format
                )));
            }
        };

        stream.play()?;

        self._stream = Some(StreamHandle(stream));
        self.is_running = true;

        Ok(())
    }

    fn get_device(index: Option<usize>) -> Result<cpal::Device> {
        let host = cpal::default_host();

        if let Some(idx) = index {
            let devices: Vec<_> = host.output_devices()?.collect();
            let device_count = devices.len();
            devices.into_iter().nth(idx).ok_or_else(|| {
                Error::InvalidDevice(format!(
                    "output device index {} out of range (available: {})",
                    idx, device_count
                ))
            })
        } else {
            host.default_output_device()
                .ok_or_else(|| Error::InvalidDevice("no output device available".to_string()))
        }
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        state: AudioCallbackState,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut state = state;
        // Mono scratch window; grows once to the device period size.
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let frames = data.len() / channels;
                    if scratch.len() < frames {
                        scratch.resize(frames, 0.0);
                    }
                    process_audio(&mut state, &mut scratch[..frames]);

                    // Fan the mono click out to every device channel.
                    for (i, sample) in data.iter_mut().enumerate() {
                        *sample = T::from_sample(scratch[i / channels]);
                    }
                }));

                if result.is_err() {
                    // Panic in callback - output silence.
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0);
                    }
                }
            },
            |_err| {
                // Audio stream error - cannot log from callback.
            },
            None,
        )?;

        Ok(stream)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// List available output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        host.output_devices()?
            .enumerate()
            .map(|(idx, device)| Ok(format!("{}: {}", idx, device.name()?)))
            .collect()
    }

    /// Name of the configured output device.
    pub fn device_name(&self) -> Result<String> {
        let device = Self::get_device(self.device_index)?;
        Ok(device.name()?)
    }
}
