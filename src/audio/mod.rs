// Audio processing module
// WAV decoding/normalization and MFCC feature extraction

pub mod decode;
pub mod mfcc;

pub use decode::{decode, AudioSample, AudioSource, DecodeError, DecoderConfig};
pub use mfcc::{MfccConfig, MfccExtractor};
