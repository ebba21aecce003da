//! WAV container for raw PCM returned by speech synthesis.
//!
//! Providers return headerless little-endian PCM; browsers and standard decoders
//! need the canonical 44-byte RIFF/WAVE header in front of it.

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// Layout of a raw PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.channels) * u32::from(self.bits_per_sample) / 8
    }
}

impl Default for PcmFormat {
    /// 24kHz, mono, 16-bit: the speech output format of both vendors
    fn default() -> Self {
        Self::new(24_000, 1, 16)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("PCM payload of {0} bytes does not fit in a WAV file")]
    PayloadTooLarge(usize),
}

/// Prefix `pcm` with a WAV header describing `format`.
///
/// The RIFF chunk size is `36 + pcm.len()` and the data chunk size is `pcm.len()`.
pub fn encode_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, WavError> {
    let data_size = u32::try_from(pcm.len())
        .ok()
        .filter(|len| *len <= u32::MAX - 36)
        .ok_or(WavError::PayloadTooLarge(pcm.len()))?;
    let riff_size = 36 + data_size;

    let mut buffer = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    // RIFF header
    buffer.extend_from_slice(b"RIFF");
    buffer.extend_from_slice(&riff_size.to_le_bytes());
    buffer.extend_from_slice(b"WAVE");

    // fmt chunk
    buffer.extend_from_slice(b"fmt ");
    buffer.extend_from_slice(&16u32.to_le_bytes()); // chunk size (16 for PCM)
    buffer.extend_from_slice(&1u16.to_le_bytes()); // audio format (1 = PCM)
    buffer.extend_from_slice(&format.channels.to_le_bytes());
    buffer.extend_from_slice(&format.sample_rate.to_le_bytes());
    buffer.extend_from_slice(&format.byte_rate().to_le_bytes());
    buffer.extend_from_slice(&format.block_align().to_le_bytes());
    buffer.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data chunk
    buffer.extend_from_slice(b"data");
    buffer.extend_from_slice(&data_size.to_le_bytes());
    buffer.extend_from_slice(pcm);

    Ok(buffer)
}
