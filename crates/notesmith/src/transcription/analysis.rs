//! Loudness analysis of demuxed audio.

use crate::error::TranscriptionError;
use crate::Result;
use std::path::Path;

/// Summary statistics for a mono PCM WAV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioStats {
    pub sample_rate: u32,
    pub frames: u64,
    pub rms: f32,
    pub peak: f32,
}

impl AudioStats {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Whether the signal never rises above `threshold` RMS.
    pub fn is_silent(&self, threshold: f32) -> bool {
        self.frames == 0 || self.rms < threshold
    }
}

/// Read a WAV written by the demuxer and compute its statistics.
///
/// Multi-channel input is averaged to mono before measuring.
pub fn analyze_wav(path: &Path, filename: &str) -> Result<AudioStats> {
    let decode_error = |reason: String| TranscriptionError::Decode {
        filename: filename.to_string(),
        reason,
    };

    let mut reader = hound::WavReader::open(path).map_err(|e| decode_error(format!("unreadable audio: {}", e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error(format!("corrupt audio samples: {}", e)))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| decode_error(format!("corrupt audio samples: {}", e)))?
        }
    };

    let mono = downmix(&samples, channels);
    Ok(AudioStats {
        sample_rate: spec.sample_rate,
        frames: mono.len() as u64,
        rms: rms(&mono),
        peak: mono.iter().fold(0.0_f32, |acc, s| acc.max(s.abs())),
    })
}

/// Average interleaved channels into one.
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_rms_of_constant_signal() {
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_downmix_stereo() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.25], 1), vec![0.25]);
    }

    #[test]
    fn test_analyze_silence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(&path, 1, &vec![0; 16_000]);

        let stats = analyze_wav(&path, "silence.mp4").unwrap();
        assert_eq!(stats.frames, 16_000);
        assert!((stats.duration_secs() - 1.0).abs() < 1e-9);
        assert!(stats.is_silent(1e-4));
    }

    #[test]
    fn test_analyze_tone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..8_000)
            .flat_map(|i| {
                let v = ((i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 16_000.0).sin() * 8_000.0) as i16;
                [v, v]
            })
            .collect();
        write_wav(&path, 2, &samples);

        let stats = analyze_wav(&path, "tone.mov").unwrap();
        assert_eq!(stats.frames, 8_000);
        assert!(stats.rms > 0.1);
        assert!(stats.peak <= 1.0);
        assert!(!stats.is_silent(1e-4));
    }

    #[test]
    fn test_analyze_non_wav_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.wav");
        std::fs::write(&path, b"not a wav file").unwrap();

        let err = analyze_wav(&path, "bogus.mp4").unwrap_err();
        assert!(matches!(
            err,
            crate::NotesmithError::Transcription(TranscriptionError::Decode { .. })
        ));
    }
}
