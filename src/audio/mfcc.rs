// MFCC feature extraction
// Short-time spectral transform over Hann-windowed frames, mel filterbank,
// log compression and DCT-II, reduced to a fixed-length mean vector

use realfft::RealFftPlanner;

use crate::audio::decode::AudioSample;

/// Floor applied before log compression to keep silent frames finite
const LOG_FLOOR: f32 = 1e-10;

/// Configuration for the MFCC transform
/// `coefficient_count` is the pipeline-wide K: every model is trained and
/// served against vectors of exactly this length, and changing it
/// invalidates previously trained artifacts
#[derive(Debug, Clone)]
pub struct MfccConfig {
    /// Number of cepstral coefficients kept (the feature vector length K)
    pub coefficient_count: usize,

    /// FFT window size in samples (power of 2)
    pub window_size: usize,

    /// Hop size in samples (advance between frames)
    pub hop_size: usize,

    /// Number of triangular mel filterbank bands
    pub mel_bands: usize,
}

impl Default for MfccConfig {
    fn default() -> Self {
        MfccConfig {
            coefficient_count: 10,
            window_size: 2048,
            hop_size: 512,
            mel_bands: 40,
        }
    }
}

/// Mean-MFCC extractor with precomputed window, filterbank and DCT basis
/// Pure and deterministic: identical samples always yield identical vectors
pub struct MfccExtractor {
    config: MfccConfig,
    sample_rate: u32,
    window: Vec<f32>,
    /// mel_bands rows of n_fft/2+1 filter weights
    filterbank: Vec<Vec<f32>>,
    /// coefficient_count rows of mel_bands orthonormal DCT-II weights
    dct_basis: Vec<Vec<f32>>,
}

impl MfccExtractor {
    /// Build an extractor for a fixed sample rate
    /// The filterbank spans 0 Hz to Nyquist for that rate, so the rate must
    /// match what the decoder produces
    pub fn new(config: MfccConfig, sample_rate: u32) -> Self {
        assert!(
            config.coefficient_count > 0 && config.coefficient_count <= config.mel_bands,
            "coefficient count must be in 1..=mel_bands"
        );
        assert!(config.hop_size > 0, "hop size must be non-zero");

        let window = hann_window(config.window_size);
        let filterbank = mel_filterbank(config.window_size, config.mel_bands, sample_rate);
        let dct_basis = dct_ii_basis(config.coefficient_count, config.mel_bands);

        MfccExtractor {
            config,
            sample_rate,
            window,
            filterbank,
            dct_basis,
        }
    }

    /// The configured feature vector length K
    pub fn coefficient_count(&self) -> usize {
        self.config.coefficient_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// A zero-valued vector of length K
    /// Used by the training-time ZeroFill policy for unreadable files
    pub fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.config.coefficient_count]
    }

    /// Extract the mean MFCC vector from a decoded sample
    /// Always returns exactly K values regardless of input length
    pub fn extract(&self, sample: &AudioSample) -> Vec<f32> {
        let frames = self.frame_mfccs(&sample.samples);

        // Mean across frames per coefficient index
        let k = self.config.coefficient_count;
        let mut mean = vec![0.0f32; k];
        for frame in &frames {
            for (i, value) in frame.iter().enumerate() {
                mean[i] += value;
            }
        }
        let count = frames.len() as f32;
        for value in &mut mean {
            *value /= count;
        }

        mean
    }

    /// Compute per-frame MFCC rows; at least one frame is always produced
    /// (short input is zero-padded to a single full window)
    fn frame_mfccs(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let window_size = self.config.window_size;
        let hop_size = self.config.hop_size;

        let num_frames = if samples.len() < window_size {
            1
        } else {
            (samples.len() - window_size) / hop_size + 1
        };

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_size);
        let mut spectrum = fft.make_output_vec();

        let mut frames = Vec::with_capacity(num_frames);
        for frame_idx in 0..num_frames {
            let start = frame_idx * hop_size;

            // Window the frame, zero-padding past the end of the signal
            let mut windowed = vec![0.0f32; window_size];
            let available = samples.len().saturating_sub(start).min(window_size);
            for i in 0..available {
                windowed[i] = samples[start + i] * self.window[i];
            }

            fft.process(&mut windowed, &mut spectrum).unwrap();

            // Power spectrum through the mel filterbank, log-compressed
            let log_mel: Vec<f32> = self
                .filterbank
                .iter()
                .map(|filter| {
                    let energy: f32 = filter
                        .iter()
                        .zip(spectrum.iter())
                        .map(|(w, c)| w * c.norm_sqr())
                        .sum();
                    (energy + LOG_FLOOR).ln()
                })
                .collect();

            // DCT-II down to the first K cepstral coefficients
            let mfcc: Vec<f32> = self
                .dct_basis
                .iter()
                .map(|row| row.iter().zip(log_mel.iter()).map(|(b, m)| b * m).sum())
                .collect();

            frames.push(mfcc);
        }

        frames
    }
}

/// Hann window of length n
fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Frequency in Hz to mel scale (HTK formula)
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Mel scale back to Hz
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank spanning 0 Hz to Nyquist
/// Returns `mel_bands` rows of `n_fft/2 + 1` weights
fn mel_filterbank(n_fft: usize, mel_bands: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;

    // Band edges evenly spaced on the mel scale, mapped back to FFT bins
    let mel_max = hz_to_mel(nyquist);
    let edges: Vec<f32> = (0..mel_bands + 2)
        .map(|i| {
            let mel = mel_max * i as f32 / (mel_bands + 1) as f32;
            mel_to_hz(mel) / nyquist * (n_bins - 1) as f32
        })
        .collect();

    let mut filters = Vec::with_capacity(mel_bands);
    for m in 0..mel_bands {
        let (lower, center, upper) = (edges[m], edges[m + 1], edges[m + 2]);
        let mut filter = vec![0.0f32; n_bins];

        for (bin, weight) in filter.iter_mut().enumerate() {
            let bin = bin as f32;
            if bin > lower && bin < center {
                *weight = (bin - lower) / (center - lower);
            } else if bin >= center && bin < upper {
                *weight = (upper - bin) / (upper - center);
            }
        }

        filters.push(filter);
    }

    filters
}

/// Orthonormal DCT-II basis: `coefficients` rows of `bands` weights
fn dct_ii_basis(coefficients: usize, bands: usize) -> Vec<Vec<f32>> {
    let n = bands as f32;
    (0..coefficients)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            (0..bands)
                .map(|m| {
                    let angle =
                        std::f32::consts::PI * k as f32 * (m as f32 + 0.5) / n;
                    scale * angle.cos()
                })
                .collect()
        })
        .collect()
}
