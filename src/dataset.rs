// Labeled dataset loading
// Walks the real/ and fake/ class directories in fixed order and turns
// every WAV file into a labeled feature vector

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::{decode, AudioSource, DecoderConfig, MfccExtractor};
use crate::classifier::types::{Label, LabeledExample};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Missing {label} class directory: {}", path.display())]
    MissingClassDir { label: &'static str, path: PathBuf },

    #[error("Class directory {} contains no .wav files", path.display())]
    EmptyClassDir { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: crate::audio::DecodeError,
    },
}

/// What to do when a file cannot be decoded or extracted
///
/// `ZeroFill` keeps corpus scans alive: an unreadable file contributes a
/// zero-valued vector and a warning instead of aborting the batch.
/// `Strict` propagates the failure and is what the serving path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    ZeroFill,
    Strict,
}

/// Load labeled examples from `root/real/*.wav` and `root/fake/*.wav`
///
/// Classes are enumerated REAL before FAKE and files are sorted by name,
/// so example order is stable across runs. Unreadable files follow the
/// ZeroFill policy; the zero-vector count is logged as a data-quality
/// signal.
pub fn load_dataset(
    root: &Path,
    decoder_config: &DecoderConfig,
    extractor: &MfccExtractor,
    policy: FailurePolicy,
) -> Result<Vec<LabeledExample>, DatasetError> {
    let mut examples = Vec::new();
    let mut zero_filled = 0usize;

    for label in Label::ALL {
        let class_dir = root.join(label.directory_name());
        if !class_dir.is_dir() {
            return Err(DatasetError::MissingClassDir {
                label: label.as_str(),
                path: class_dir,
            });
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&class_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_wav(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(DatasetError::EmptyClassDir { path: class_dir });
        }

        log::info!(
            "loading {} files from {}",
            files.len(),
            class_dir.display()
        );

        for path in files {
            let source = AudioSource::from_path(&path);
            let features = match decode(&source, decoder_config) {
                Ok(sample) => extractor.extract(&sample),
                Err(err) => match policy {
                    FailurePolicy::Strict => {
                        return Err(DatasetError::Decode { path, source: err });
                    }
                    FailurePolicy::ZeroFill => {
                        // Keep the scan alive, flag the file
                        log::warn!(
                            "failed to decode {}: {} (zero-filling example)",
                            path.display(),
                            err
                        );
                        zero_filled += 1;
                        extractor.zero_vector()
                    }
                },
            };
            examples.push(LabeledExample::new(features, label));
        }
    }

    if zero_filled > 0 {
        log::warn!(
            "{} of {} examples were zero-filled; audit the corpus for corrupt files",
            zero_filled,
            examples.len()
        );
    }

    Ok(examples)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MfccConfig;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn write_sine_wav(path: &Path, freq: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..16_000 {
                let t = i as f32 / 16_000.0;
                let value = (2.0 * std::f32::consts::PI * freq * t).sin();
                writer.write_sample((value * 0.5 * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        std::fs::write(path, cursor.into_inner()).unwrap();
    }

    fn extractor() -> MfccExtractor {
        MfccExtractor::new(MfccConfig::default(), 16_000)
    }

    fn build_corpus(root: &Path, real: usize, fake: usize) {
        let real_dir = root.join("real");
        let fake_dir = root.join("fake");
        std::fs::create_dir_all(&real_dir).unwrap();
        std::fs::create_dir_all(&fake_dir).unwrap();

        for i in 0..real {
            write_sine_wav(&real_dir.join(format!("r{}.wav", i)), 220.0 + i as f32 * 50.0);
        }
        for i in 0..fake {
            write_sine_wav(&fake_dir.join(format!("f{}.wav", i)), 2000.0 + i as f32 * 200.0);
        }
    }

    #[test]
    fn test_loads_three_plus_three() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path(), 3, 3);

        let examples = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::ZeroFill,
        ).unwrap();

        assert_eq!(examples.len(), 6);
        assert_eq!(examples.iter().filter(|e| e.label == Label::Real).count(), 3);
        assert_eq!(examples.iter().filter(|e| e.label == Label::Fake).count(), 3);

        // REAL examples come first (fixed class order)
        assert!(examples[..3].iter().all(|e| e.label == Label::Real));
        assert!(examples[3..].iter().all(|e| e.label == Label::Fake));
    }

    #[test]
    fn test_missing_class_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("real")).unwrap();
        write_sine_wav(&temp_dir.path().join("real/a.wav"), 440.0);

        let result = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::ZeroFill,
        );
        assert!(matches!(
            result,
            Err(DatasetError::MissingClassDir { label: "FAKE", .. })
        ));
    }

    #[test]
    fn test_empty_class_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path(), 2, 0);
        std::fs::create_dir_all(temp_dir.path().join("fake")).unwrap();

        let result = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::ZeroFill,
        );
        assert!(matches!(result, Err(DatasetError::EmptyClassDir { .. })));
    }

    #[test]
    fn test_corrupt_file_is_zero_filled() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path(), 2, 2);
        std::fs::write(temp_dir.path().join("real/broken.wav"), b"not audio").unwrap();

        let examples = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::ZeroFill,
        ).unwrap();

        assert_eq!(examples.len(), 5);
        let zero_vectors = examples
            .iter()
            .filter(|e| e.features.iter().all(|v| *v == 0.0))
            .count();
        assert_eq!(zero_vectors, 1);
    }

    #[test]
    fn test_strict_policy_propagates_decode_failure() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path(), 2, 2);
        std::fs::write(temp_dir.path().join("real/broken.wav"), b"not audio").unwrap();

        let result = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::Strict,
        );
        assert!(matches!(result, Err(DatasetError::Decode { .. })));
    }

    #[test]
    fn test_non_wav_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path(), 2, 2);
        std::fs::write(temp_dir.path().join("real/readme.txt"), b"notes").unwrap();

        let examples = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::ZeroFill,
        ).unwrap();
        assert_eq!(examples.len(), 4);
    }

    #[test]
    fn test_feature_length_matches_k() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path(), 1, 1);

        let examples = load_dataset(
            temp_dir.path(),
            &DecoderConfig::default(),
            &extractor(),
            FailurePolicy::ZeroFill,
        ).unwrap();
        assert!(examples.iter().all(|e| e.features.len() == 10));
    }
}
