//! Audio demuxing.
//!
//! Pulls the audio track out of a video container and writes it as a mono
//! 16-bit PCM WAV inside the request's scratch space. Two demuxers exist:
//!
//! - **ffmpeg**: a subprocess, used for every container ffmpeg understands
//! - **native**: symphonia in-process, for containers symphonia can probe
//!   (ISO-MP4 family, plain audio)
//!
//! [`DemuxerMode::Auto`] prefers ffmpeg when a binary can be located.

use crate::core::config::{DemuxerMode, TranscriptionConfig};
use crate::error::TranscriptionError;
use crate::transcription::scratch::ScratchSpace;
use crate::{NotesmithError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::collections::HashSet;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::process::Command;

/// Name of the demuxed audio file inside a scratch space.
pub const AUDIO_FILE_NAME: &str = "audio.wav";

const RESAMPLE_CHUNK_FRAMES: usize = 8192;

fn ffmpeg_install_message() -> String {
    "ffmpeg is required to demux this video. \
Install: macOS: 'brew install ffmpeg', \
Linux: 'apt install ffmpeg', \
Windows: 'winget install ffmpeg'. \
Set transcription.ffmpeg_path or the NOTESMITH_FFMPEG_PATH environment variable for custom locations, \
or use transcription.demuxer = \"native\"."
        .to_string()
}

fn ffmpeg_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    let mut push_candidate = |path: PathBuf| {
        if seen.insert(path.clone()) {
            candidates.push(path);
        }
    };

    if let Some(path) = explicit {
        push_candidate(path.to_path_buf());
    }

    for var in ["NOTESMITH_FFMPEG_PATH", "FFMPEG_PATH"] {
        if let Some(value) = env::var_os(var).filter(|v| !v.is_empty()) {
            push_candidate(PathBuf::from(value));
        }
    }

    if let Some(path_env) = env::var_os("PATH") {
        for dir in env::split_paths(&path_env) {
            push_candidate(dir.join("ffmpeg"));
            push_candidate(dir.join("ffmpeg.exe"));
        }
    }

    if let Some(prefix) = env::var_os("HOMEBREW_PREFIX") {
        push_candidate(PathBuf::from(prefix).join("bin/ffmpeg"));
    }

    candidates
}

/// Find an ffmpeg executable, checking `explicit` first.
pub fn locate_ffmpeg(explicit: Option<&Path>) -> Option<PathBuf> {
    ffmpeg_candidates(explicit)
        .into_iter()
        .find(|candidate| std::fs::metadata(candidate).map(|m| m.is_file()).unwrap_or(false))
}

/// A resolved demuxing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Demuxer {
    Ffmpeg(PathBuf),
    Native,
}

/// Converts uploaded video into a mono WAV.
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    mode: DemuxerMode,
    ffmpeg_path: Option<PathBuf>,
    sample_rate: u32,
    timeout: Duration,
}

impl AudioExtractor {
    pub fn new(config: &TranscriptionConfig, timeout: Duration) -> Self {
        Self {
            mode: config.demuxer,
            ffmpeg_path: config.ffmpeg_path.clone(),
            sample_rate: config.sample_rate,
            timeout,
        }
    }

    /// Resolve the configured mode into a concrete backend.
    ///
    /// # Errors
    ///
    /// `NotesmithError::MissingDependency` when ffmpeg is required but cannot be found.
    pub fn demuxer(&self) -> Result<Demuxer> {
        match self.mode {
            DemuxerMode::Native => Ok(Demuxer::Native),
            DemuxerMode::Ffmpeg => locate_ffmpeg(self.ffmpeg_path.as_deref())
                .map(Demuxer::Ffmpeg)
                .ok_or_else(|| NotesmithError::MissingDependency(ffmpeg_install_message())),
            DemuxerMode::Auto => Ok(locate_ffmpeg(self.ffmpeg_path.as_deref())
                .map(Demuxer::Ffmpeg)
                .unwrap_or(Demuxer::Native)),
        }
    }

    /// Demux `input` into [`AUDIO_FILE_NAME`] inside `space`.
    pub async fn extract(&self, space: &ScratchSpace, input: &Path, filename: &str) -> Result<PathBuf> {
        let output = space.file(AUDIO_FILE_NAME);

        match self.demuxer()? {
            Demuxer::Ffmpeg(binary) => {
                tracing::debug!(filename, ffmpeg = %binary.display(), "Demuxing audio with ffmpeg");
                self.run_ffmpeg(&binary, input, &output, filename).await?;
            }
            Demuxer::Native => {
                tracing::debug!(filename, "Demuxing audio natively");
                let held = space.clone();
                let input = input.to_path_buf();
                let task_output = output.clone();
                let name = filename.to_string();
                let sample_rate = self.sample_rate;

                tokio::task::spawn_blocking(move || {
                    let _held = held;
                    decode_to_wav(&input, &task_output, &name, sample_rate)
                })
                .await
                .map_err(|e| NotesmithError::Other(format!("Audio decode task failed: {}", e)))??;
            }
        }

        Ok(output)
    }

    async fn run_ffmpeg(&self, binary: &Path, input: &Path, output: &Path, filename: &str) -> Result<()> {
        let child = Command::new(binary)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar"])
            .arg(self.sample_rate.to_string())
            .args(["-c:a", "pcm_s16le", "-f", "wav"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                NotesmithError::MissingDependency(format!(
                    "Failed to execute ffmpeg at '{}': {}. {}",
                    binary.display(),
                    e,
                    ffmpeg_install_message()
                ))
            })?;

        let output_result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(NotesmithError::Io(e)),
            Err(_) => {
                // The child was dropped with the future and is killed on drop.
                return Err(NotesmithError::Timeout {
                    filename: filename.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output_result.status.success() {
            let stderr = String::from_utf8_lossy(&output_result.stderr);
            let reason = classify_ffmpeg_failure(&stderr, output_result.status.code());
            return Err(TranscriptionError::Decode {
                filename: filename.to_string(),
                reason,
            }
            .into());
        }

        Ok(())
    }
}

fn classify_ffmpeg_failure(stderr: &str, code: Option<i32>) -> String {
    let lower = stderr.to_lowercase();
    let detail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim();

    if lower.contains("does not contain any stream") || lower.contains("matches no streams") {
        "no audio track found".to_string()
    } else if lower.contains("invalid data found") || lower.contains("could not find codec") {
        format!("unsupported or corrupt container: {}", detail)
    } else {
        format!("ffmpeg exited with code {}: {}", code.unwrap_or(-1), detail)
    }
}

/// Decode the first audio track of `input` with symphonia and write a mono WAV.
pub fn decode_to_wav(input: &Path, output: &Path, filename: &str, target_rate: u32) -> Result<()> {
    let decode_error = |reason: String| -> NotesmithError {
        TranscriptionError::Decode {
            filename: filename.to_string(),
            reason,
        }
        .into()
    };

    let file = File::open(input)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = input.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_error(format!("unsupported container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| decode_error("no audio track found".to_string()))?;

    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_error("sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(format!("unsupported codec: {}", e)))?;

    let mut sink = MonoWavSink::create(output, source_rate, target_rate)?;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                tracing::warn!(filename, error = %e, "Stopping demux on packet read error");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(filename, error = e, "Skipping undecodable audio packet");
                continue;
            }
            Err(e) => return Err(decode_error(format!("decode failed: {}", e))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let needed = decoded.capacity() * channels;
        if sample_buf.as_ref().is_none_or(|buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        let mono = super::analysis::downmix(buf.samples(), channels);
        sink.push(&mono)?;
    }

    let frames = sink.finish()?;
    if frames == 0 {
        return Err(decode_error("audio track contained no samples".to_string()));
    }

    tracing::debug!(filename, source_rate, target_rate, frames, "Decoded audio track");
    Ok(())
}

/// Streams mono samples into a 16-bit WAV, resampling to the target rate.
struct MonoWavSink {
    writer: hound::WavWriter<BufWriter<File>>,
    resampler: Option<FastFixedIn<f32>>,
    pending: Vec<f32>,
    frames: u64,
}

impl MonoWavSink {
    fn create(path: &Path, source_rate: u32, target_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: target_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec).map_err(hound_error)?;

        let resampler = if source_rate == target_rate {
            None
        } else {
            Some(
                FastFixedIn::<f32>::new(
                    target_rate as f64 / source_rate as f64,
                    1.0,
                    PolynomialDegree::Cubic,
                    RESAMPLE_CHUNK_FRAMES,
                    1,
                )
                .map_err(|e| NotesmithError::Other(format!("Failed to create resampler: {}", e)))?,
            )
        };

        Ok(Self {
            writer,
            resampler,
            pending: Vec::new(),
            frames: 0,
        })
    }

    fn push(&mut self, samples: &[f32]) -> Result<()> {
        if self.resampler.is_none() {
            return self.write(samples);
        }

        self.pending.extend_from_slice(samples);
        while self.pending.len() >= RESAMPLE_CHUNK_FRAMES {
            let block: Vec<f32> = self.pending.drain(..RESAMPLE_CHUNK_FRAMES).collect();
            let resampled = self.resample(block)?;
            self.write(&resampled)?;
        }
        Ok(())
    }

    fn resample(&mut self, block: Vec<f32>) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(block);
        };

        let full = block.len() == RESAMPLE_CHUNK_FRAMES;
        let input = [block];
        let result = if full {
            resampler.process(&input[..], None)
        } else {
            resampler.process_partial(Some(&input[..]), None)
        };

        let mut channels = result.map_err(|e| NotesmithError::Other(format!("Resampling failed: {}", e)))?;
        Ok(channels.pop().unwrap_or_default())
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        for sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            self.writer.write_sample(value).map_err(hound_error)?;
        }
        self.frames += samples.len() as u64;
        Ok(())
    }

    /// Flush buffered samples and finalize the header. Returns frames written.
    fn finish(mut self) -> Result<u64> {
        if self.resampler.is_some() && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let resampled = self.resample(rest)?;
            self.write(&resampled)?;
        }
        let frames = self.frames;
        self.writer.finalize().map_err(hound_error)?;
        Ok(frames)
    }
}

fn hound_error(err: hound::Error) -> NotesmithError {
    match err {
        hound::Error::IoError(e) => NotesmithError::Io(e),
        other => NotesmithError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::analysis::analyze_wav;
    use crate::transcription::scratch::ScratchArea;
    use tempfile::tempdir;

    fn write_tone(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as u32;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let v = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 10_000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn native_config() -> TranscriptionConfig {
        TranscriptionConfig {
            demuxer: DemuxerMode::Native,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_to_wav_same_rate() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.mov");
        let output = dir.path().join("audio.wav");
        write_tone(&input, 16_000, 1, 0.5);

        decode_to_wav(&input, &output, "clip.mov", 16_000).unwrap();

        let stats = analyze_wav(&output, "clip.mov").unwrap();
        assert_eq!(stats.sample_rate, 16_000);
        assert_eq!(stats.frames, 8_000);
        assert!(stats.rms > 0.1);
    }

    #[test]
    fn test_decode_to_wav_resamples_and_downmixes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("audio.wav");
        write_tone(&input, 48_000, 2, 1.0);

        decode_to_wav(&input, &output, "clip.mp4", 16_000).unwrap();

        let reader = hound::WavReader::open(&output).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16_000);

        let stats = analyze_wav(&output, "clip.mp4").unwrap();
        let expected = 16_000.0;
        assert!((stats.frames as f64 - expected).abs() < expected * 0.1, "frames = {}", stats.frames);
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.avi");
        std::fs::write(&input, b"definitely not a media container").unwrap();

        let err = decode_to_wav(&input, &dir.path().join("audio.wav"), "clip.avi", 16_000).unwrap_err();
        assert!(matches!(
            err,
            NotesmithError::Transcription(TranscriptionError::Decode { .. })
        ));
    }

    #[test]
    fn test_native_mode_never_needs_ffmpeg() {
        let extractor = AudioExtractor::new(&native_config(), Duration::from_secs(5));
        assert_eq!(extractor.demuxer().unwrap(), Demuxer::Native);
    }

    #[test]
    fn test_ffmpeg_mode_with_missing_binary() {
        let config = TranscriptionConfig {
            demuxer: DemuxerMode::Ffmpeg,
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ..Default::default()
        };
        let extractor = AudioExtractor::new(&config, Duration::from_secs(5));

        // Only meaningful when no ffmpeg is installed anywhere on PATH.
        if locate_ffmpeg(None).is_none() {
            assert!(matches!(
                extractor.demuxer(),
                Err(NotesmithError::MissingDependency(_))
            ));
        }
    }

    #[test]
    fn test_classify_ffmpeg_failure() {
        assert_eq!(
            classify_ffmpeg_failure("Output file #0 does not contain any stream\n", Some(1)),
            "no audio track found"
        );
        assert!(
            classify_ffmpeg_failure("input.mp4: Invalid data found when processing input\n", Some(1))
                .starts_with("unsupported or corrupt container")
        );
        assert!(classify_ffmpeg_failure("boom", Some(3)).contains("code 3"));
    }

    #[tokio::test]
    async fn test_extract_native_writes_into_space() {
        let root = tempdir().unwrap();
        let area = ScratchArea::new(root.path()).unwrap();
        let space = area.acquire().unwrap();

        let input = space.file("input.mov");
        write_tone(&input, 16_000, 1, 0.25);

        let extractor = AudioExtractor::new(&native_config(), Duration::from_secs(30));
        let output = extractor.extract(&space, &input, "clip.mov").await.unwrap();
        assert_eq!(output.parent().unwrap(), space.path());
        assert!(output.exists());

        drop(space);
        assert!(!output.exists());
    }
}
