// Prediction service
// Composition root for serving: decode -> extract -> predict, with strict
// failure propagation, plus the training-side composition

use std::path::Path;
use thiserror::Error;

use crate::audio::{decode, AudioSource, DecoderConfig, MfccConfig, MfccExtractor};
use crate::classifier::artifact::ModelArtifact;
use crate::classifier::trainer::{train, TrainerConfig, TrainingError};
use crate::classifier::types::{EvaluationReport, PredictionResult};
use crate::dataset::{load_dataset, DatasetError, FailurePolicy};
use crate::service::engine::{InferenceError, SharedEngine};

/// Structured error surface for the request layer
/// Every failure mode of the three pipeline stages maps to a typed variant
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Decode(#[from] crate::audio::DecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Errors from the training composition
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// End-to-end pipeline configuration
/// The decoder's target rate and the MFCC K are the two values that must
/// stay consistent between training and serving
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub decoder: DecoderConfig,
    pub mfcc: MfccConfig,
    pub trainer: TrainerConfig,
}

/// Serving-side composition root
///
/// Holds a decoder configuration, an extractor and a shared engine handle.
/// Stateless per call: identical input against the same installed model
/// yields an identical result. Serving uses the Strict failure policy —
/// a corrupt upload surfaces as `ClassifyError::Decode`, never as a
/// zero-vector score.
pub struct PredictionService {
    engine: SharedEngine,
    decoder_config: DecoderConfig,
    extractor: MfccExtractor,
}

impl PredictionService {
    pub fn new(engine: SharedEngine, config: &PipelineConfig) -> Self {
        let extractor =
            MfccExtractor::new(config.mfcc.clone(), config.decoder.target_sample_rate);
        PredictionService {
            engine,
            decoder_config: config.decoder.clone(),
            extractor,
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Classify a voice clip as REAL or FAKE
    pub fn classify(&self, source: &AudioSource) -> Result<PredictionResult, ClassifyError> {
        let sample = decode(source, &self.decoder_config)?;
        log::debug!(
            "decoded {} ({:.2}s at {} Hz)",
            source.name(),
            sample.duration_secs(),
            sample.sample_rate
        );

        let features = self.extractor.extract(&sample);
        let result = self.engine.predict(&features)?;

        log::info!(
            "classified {} as {} (confidence {:.3})",
            source.name(),
            result.label.as_str(),
            result.confidence
        );
        Ok(result)
    }
}

/// Training-side composition: load the labeled corpus, fit the ensemble
/// and return the artifact plus its held-out evaluation
///
/// Corpus scanning uses the ZeroFill policy so one corrupt file cannot
/// abort a long training run.
pub fn train_model(
    dataset_root: &Path,
    config: &PipelineConfig,
) -> Result<(ModelArtifact, EvaluationReport), TrainError> {
    let extractor = MfccExtractor::new(config.mfcc.clone(), config.decoder.target_sample_rate);
    let examples = load_dataset(
        dataset_root,
        &config.decoder,
        &extractor,
        FailurePolicy::ZeroFill,
    )?;

    log::info!("loaded {} labeled examples from {}", examples.len(), dataset_root.display());

    let (artifact, report) = train(&examples, extractor.coefficient_count(), &config.trainer)?;
    Ok((artifact, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::types::Label;
    use crate::service::engine::InferenceEngine;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_sine_wav(path: &Path, freq: f32, secs: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (secs * 16_000.0) as usize;
            for i in 0..frames {
                let t = i as f32 / 16_000.0;
                let value = (2.0 * std::f32::consts::PI * freq * t).sin();
                writer.write_sample((value * 0.5 * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        std::fs::write(path, cursor.into_inner()).unwrap();
    }

    fn build_corpus(root: &Path) {
        std::fs::create_dir_all(root.join("real")).unwrap();
        std::fs::create_dir_all(root.join("fake")).unwrap();
        for (i, freq) in [220.0f32, 330.0, 440.0, 550.0].iter().enumerate() {
            write_sine_wav(&root.join(format!("real/r{}.wav", i)), *freq, 1.0);
        }
        for (i, freq) in [3000.0f32, 3500.0, 4000.0, 4500.0].iter().enumerate() {
            write_sine_wav(&root.join(format!("fake/f{}.wav", i)), *freq, 1.0);
        }
    }

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.trainer.forest.n_trees = 15;
        config
    }

    #[test]
    fn test_train_then_classify() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path());

        let config = small_config();
        let (artifact, report) = train_model(temp_dir.path(), &config).unwrap();
        assert_eq!(artifact.coefficient_count, 10);
        assert!(report.held_out_count >= 1);

        let engine = SharedEngine::with_engine(InferenceEngine::from_artifact(artifact));
        let service = PredictionService::new(engine, &config);

        let probe = temp_dir.path().join("probe.wav");
        write_sine_wav(&probe, 440.0, 1.0);
        let result = service.classify(&AudioSource::from_path(&probe)).unwrap();

        assert_eq!(result.label, Label::Real);
        assert!(result.confidence > 0.5);
    }

    #[test]
    fn test_classify_without_model_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let probe = temp_dir.path().join("probe.wav");
        write_sine_wav(&probe, 440.0, 1.0);

        let service = PredictionService::new(SharedEngine::empty(), &PipelineConfig::default());
        let result = service.classify(&AudioSource::from_path(&probe));

        assert!(matches!(
            result,
            Err(ClassifyError::Inference(InferenceError::ModelUnavailable))
        ));
    }

    #[test]
    fn test_classify_corrupt_buffer_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path());
        let config = small_config();
        let (artifact, _) = train_model(temp_dir.path(), &config).unwrap();

        let engine = SharedEngine::with_engine(InferenceEngine::from_artifact(artifact));
        let service = PredictionService::new(engine, &config);

        let source = AudioSource::from_bytes(vec![0u8; 32], "junk.wav");
        let result = service.classify(&source);

        assert!(matches!(result, Err(ClassifyError::Decode(_))));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        build_corpus(temp_dir.path());
        let config = small_config();
        let (artifact, _) = train_model(temp_dir.path(), &config).unwrap();

        let engine = SharedEngine::with_engine(InferenceEngine::from_artifact(artifact));
        let service = PredictionService::new(engine, &config);

        let probe = temp_dir.path().join("probe.wav");
        write_sine_wav(&probe, 330.0, 1.0);
        let source = AudioSource::from_path(&probe);

        let first = service.classify(&source).unwrap();
        let second = service.classify(&source).unwrap();

        assert_eq!(first.label, second.label);
        assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
    }
}
