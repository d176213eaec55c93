//! WAV packaging for recorded instructions.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

use super::CaptureError;

pub const MIME_TYPE: &str = "audio/wav";

/// Wrap interleaved 16-bit samples in an in-memory WAV container
pub fn encode_pcm16(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
) -> Result<Vec<u8>, CaptureError> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec).map_err(encode_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(encode_error)?;
        }
        writer.finalize().map_err(encode_error)?;
    }

    Ok(buffer)
}

/// Convert `[-1.0, 1.0]` float samples to 16-bit PCM, clamping overshoot
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

fn encode_error(e: hound::Error) -> CaptureError {
    CaptureError::Stream(format!("cannot encode WAV: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    #[test]
    fn stereo_recording_keeps_its_format() {
        let wav = encode_pcm16(&[1, -1, 2, -2], 48_000, 2).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(reader.duration(), 2);
    }

    #[test]
    fn samples_survive_encoding() {
        let wav = encode_pcm16(&[0x0102, i16::MIN, i16::MAX], 16_000, 1).unwrap();
        let samples: Vec<i16> = WavReader::new(Cursor::new(wav))
            .unwrap()
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(samples, [0x0102, i16::MIN, i16::MAX]);
    }

    #[test]
    fn odd_sample_count_for_stereo_is_an_error() {
        assert!(matches!(
            encode_pcm16(&[1, 2, 3], 48_000, 2),
            Err(CaptureError::Stream(_))
        ));
    }

    #[test]
    fn float_conversion_clamps() {
        assert_eq!(f32_to_pcm16(&[0.0, 1.0, -1.0, 2.0]), vec![0, 32767, -32767, 32767]);
    }
}
