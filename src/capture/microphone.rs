//! Native microphone capture via `cpal`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::{Arc, Mutex};

use super::{wav, AudioBlob, CaptureError, Microphone, Recording};

/// The system default input device
#[derive(Default)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

struct CpalRecording {
    stream: cpal::Stream,
    samples: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
    channels: u16,
}

impl Microphone for CpalMicrophone {
    fn open(&mut self) -> Result<Box<dyn Recording>, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::PermissionDenied("no input device found".into()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

        let sample_format = supported.sample_format();
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let config: cpal::StreamConfig = supported.into();

        let samples = Arc::new(Mutex::new(Vec::new()));
        let on_error = |err: cpal::StreamError| tracing::error!("cpal stream error: {err}");

        let stream = match sample_format {
            SampleFormat::F32 => {
                let buffer = samples.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if let Ok(mut buffer) = buffer.lock() {
                            buffer.extend(wav::f32_to_pcm16(data));
                        }
                    },
                    on_error,
                    None,
                )
            }
            SampleFormat::I16 => {
                let buffer = samples.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if let Ok(mut buffer) = buffer.lock() {
                            buffer.extend_from_slice(data);
                        }
                    },
                    on_error,
                    None,
                )
            }
            other => {
                return Err(CaptureError::Stream(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        Ok(Box::new(CpalRecording {
            stream,
            samples,
            sample_rate,
            channels,
        }))
    }
}

impl Recording for CpalRecording {
    fn finish(self: Box<Self>) -> Result<AudioBlob, CaptureError> {
        let CpalRecording {
            stream,
            samples,
            sample_rate,
            channels,
        } = *self;

        // Dropping the stream releases the device
        drop(stream);

        let samples = samples
            .lock()
            .map_err(|_| CaptureError::Stream("sample buffer poisoned".into()))?;

        if samples.is_empty() {
            return Err(CaptureError::Stream("no audio was captured".into()));
        }

        let bytes = wav::encode_pcm16(&samples, sample_rate, channels)?;
        tracing::debug!("Recorded {} samples ({} bytes of WAV)", samples.len(), bytes.len());
        Ok(AudioBlob::new(wav::MIME_TYPE, bytes))
    }
}
