// Audio decoding module
// Reads WAV input from a path or byte buffer, normalizes samples,
// downmixes to mono, resamples to the pipeline rate and bounds duration

use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to read WAV data: {0}")]
    WavRead(#[from] hound::Error),

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio contains no samples")]
    EmptyAudio,
}

/// Classification input: a file on disk or an uploaded byte buffer
/// with its original filename as a format hint
#[derive(Debug, Clone)]
pub enum AudioSource {
    Path(PathBuf),
    Bytes { data: Vec<u8>, filename: String },
}

impl AudioSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        AudioSource::Path(path.into())
    }

    pub fn from_bytes(data: Vec<u8>, filename: impl Into<String>) -> Self {
        AudioSource::Bytes {
            data,
            filename: filename.into(),
        }
    }

    /// Display name used for logging and history records
    pub fn name(&self) -> String {
        match self {
            AudioSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            AudioSource::Bytes { filename, .. } => filename.clone(),
        }
    }
}

/// Configuration for decoding and normalization
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Sample rate every clip is resampled to (Hz)
    /// Must match the rate the MFCC transform assumes
    pub target_sample_rate: u32,

    /// Maximum clip duration in seconds; longer input is truncated
    /// Short clips are kept as-is, never padded
    pub max_duration_secs: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            target_sample_rate: 16_000,
            max_duration_secs: 10.0,
        }
    }
}

/// Decoded audio, mono f32 samples in [-1.0, 1.0]
/// Exists only for the duration of one extraction call
#[derive(Debug, Clone)]
pub struct AudioSample {
    pub samples: Vec<f32>,

    /// Sample rate in Hz after resampling
    pub sample_rate: u32,

    /// Duration in milliseconds
    pub duration_ms: i64,
}

impl AudioSample {
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Decode an audio source into a mono sample sequence at the target rate
pub fn decode(source: &AudioSource, config: &DecoderConfig) -> Result<AudioSample, DecodeError> {
    let (bytes, name) = match source {
        AudioSource::Path(path) => (std::fs::read(path)?, path.to_string_lossy().into_owned()),
        AudioSource::Bytes { data, filename } => (data.clone(), filename.clone()),
    };

    let hints_wav = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if !hints_wav {
        log::debug!("input {} does not hint .wav, attempting WAV parse anyway", name);
    }

    let (samples, sample_rate, channels) = read_wav(&bytes)?;

    if samples.is_empty() {
        return Err(DecodeError::EmptyAudio);
    }

    let mono = to_mono(&samples, channels);
    let resampled = if sample_rate != config.target_sample_rate {
        resample_linear(&mono, sample_rate, config.target_sample_rate)
    } else {
        mono
    };

    let max_samples = (config.max_duration_secs * config.target_sample_rate as f32) as usize;
    let mut samples = resampled;
    if samples.len() > max_samples {
        samples.truncate(max_samples);
    }

    if samples.is_empty() {
        return Err(DecodeError::EmptyAudio);
    }

    let duration_ms =
        (samples.len() as f64 / config.target_sample_rate as f64 * 1000.0) as i64;

    Ok(AudioSample {
        samples,
        sample_rate: config.target_sample_rate,
        duration_ms,
    })
}

/// Parse WAV bytes into interleaved f32 samples in [-1.0, 1.0]
fn read_wav(data: &[u8]) -> Result<(Vec<f32>, u32, u16), DecodeError> {
    let cursor = Cursor::new(data);
    let mut reader = WavReader::new(cursor)?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;

    if channels == 0 {
        return Err(DecodeError::UnsupportedFormat("zero channels".to_string()));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => {
            // 8-bit PCM: hound yields signed values, range [-128, 127] -> [-1.0, 1.0]
            reader
                .samples::<i32>()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| s as f32 / 128.0)
                .collect()
        }
        (SampleFormat::Int, 16) => {
            // 16-bit PCM: signed, range [-32768, 32767] -> [-1.0, 1.0]
            reader
                .samples::<i16>()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| s as f32 / 32768.0)
                .collect()
        }
        (SampleFormat::Int, 24) => {
            // 24-bit PCM: signed, range [-8388608, 8388607] -> [-1.0, 1.0]
            reader
                .samples::<i32>()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| s as f32 / 8388608.0)
                .collect()
        }
        (SampleFormat::Int, 32) => {
            // 32-bit PCM: signed, range [-2147483648, 2147483647] -> [-1.0, 1.0]
            reader
                .samples::<i32>()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| s as f32 / 2147483648.0)
                .collect()
        }
        (SampleFormat::Float, 32) => {
            // 32-bit float: already in [-1.0, 1.0] (typically)
            reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?
        }
        (format, bits) => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                format, bits
            )));
        }
    };

    Ok((samples, sample_rate, channels))
}

/// Downmix interleaved samples to mono by averaging channels
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let frame_count = samples.len() / channels;
    let mut mono = Vec::with_capacity(frame_count);

    for frame_idx in 0..frame_count {
        let mut sum = 0.0;
        for ch in 0..channels {
            sum += samples[frame_idx * channels + ch];
        }
        mono.push(sum / channels as f32);
    }

    mono
}

/// Linear-interpolation resampler
/// Adequate for speech-band feature extraction at 16 kHz
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wav_bytes(freq: f32, secs: f32, sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (secs * sample_rate as f32) as usize;
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let value = (2.0 * std::f32::consts::PI * freq * t).sin();
                let amp = (value * 0.5 * i16::MAX as f32) as i16;
                for _ in 0..channels {
                    writer.write_sample(amp).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_wav() {
        let bytes = sine_wav_bytes(440.0, 1.0, 16_000, 1);
        let source = AudioSource::from_bytes(bytes, "tone.wav");
        let sample = decode(&source, &DecoderConfig::default()).unwrap();

        assert_eq!(sample.sample_rate, 16_000);
        assert_eq!(sample.samples.len(), 16_000);
        assert_eq!(sample.duration_ms, 1000);
    }

    #[test]
    fn test_decode_downmixes_stereo() {
        let bytes = sine_wav_bytes(440.0, 1.0, 16_000, 2);
        let source = AudioSource::from_bytes(bytes, "stereo.wav");
        let sample = decode(&source, &DecoderConfig::default()).unwrap();

        // Stereo frames collapse to one mono sample each
        assert_eq!(sample.samples.len(), 16_000);
    }

    #[test]
    fn test_decode_8bit_is_centered_and_bounded() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..16_000 {
                let t = i as f32 / 16_000.0;
                let value = (2.0 * std::f32::consts::PI * 440.0 * t).sin();
                writer.write_sample((value * 127.0) as i8).unwrap();
            }
            writer.finalize().unwrap();
        }

        let source = AudioSource::from_bytes(cursor.into_inner(), "8bit.wav");
        let sample = decode(&source, &DecoderConfig::default()).unwrap();

        let min = sample.samples.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = sample.samples.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(min >= -1.0 && max <= 1.0, "out of range: [{}, {}]", min, max);
        assert!(min < -0.9 && max > 0.9, "full-scale sine lost amplitude");

        // A whole number of sine periods must average out to ~zero
        let mean: f32 = sample.samples.iter().sum::<f32>() / sample.samples.len() as f32;
        assert!(mean.abs() < 0.01, "DC offset in decoded samples: {}", mean);
    }

    #[test]
    fn test_decode_resamples_to_target_rate() {
        let bytes = sine_wav_bytes(440.0, 1.0, 48_000, 1);
        let source = AudioSource::from_bytes(bytes, "hi_rate.wav");
        let sample = decode(&source, &DecoderConfig::default()).unwrap();

        assert_eq!(sample.sample_rate, 16_000);
        assert_eq!(sample.samples.len(), 16_000);
    }

    #[test]
    fn test_decode_truncates_long_input() {
        let bytes = sine_wav_bytes(220.0, 12.0, 16_000, 1);
        let source = AudioSource::from_bytes(bytes, "long.wav");
        let sample = decode(&source, &DecoderConfig::default()).unwrap();

        assert_eq!(sample.samples.len(), 160_000); // capped at 10 s
        assert_eq!(sample.duration_ms, 10_000);
    }

    #[test]
    fn test_decode_keeps_short_input_short() {
        let bytes = sine_wav_bytes(220.0, 0.25, 16_000, 1);
        let source = AudioSource::from_bytes(bytes, "short.wav");
        let sample = decode(&source, &DecoderConfig::default()).unwrap();

        assert_eq!(sample.samples.len(), 4000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let source = AudioSource::from_bytes(vec![0u8; 64], "junk.wav");
        let result = decode(&source, &DecoderConfig::default());
        assert!(matches!(result, Err(DecodeError::WavRead(_))));
    }

    #[test]
    fn test_decode_rejects_empty_buffer() {
        let source = AudioSource::from_bytes(Vec::new(), "empty.wav");
        assert!(decode(&source, &DecoderConfig::default()).is_err());
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 100.0).sin()).collect();
        let out = resample_linear(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn test_source_name() {
        let source = AudioSource::from_path("/tmp/audio/clip.wav");
        assert_eq!(source.name(), "clip.wav");

        let source = AudioSource::from_bytes(vec![], "upload.wav");
        assert_eq!(source.name(), "upload.wav");
    }
}
