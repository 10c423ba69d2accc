//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use notesmith::core::config::DemuxerMode;
use notesmith::transcription::{SpeechRecognition, SpeechRequest, SpeechToText};
use notesmith::{Normalizer, NotesmithError, PipelineConfig, PipelineObserver, PipelineStage, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

/// Build a PDF with one Helvetica text line per page.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// 16 kHz mono 16-bit WAV containing a 220 Hz tone.
pub fn tone_wav(amplitude: f32, seconds: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for i in 0..(16_000.0 * seconds) as u32 {
            let t = i as f32 / 16_000.0;
            let v = (t * 220.0 * 2.0 * std::f32::consts::PI).sin() * amplitude * i16::MAX as f32;
            writer.write_sample(v as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf
}

/// Speech-to-text double returning a canned transcript.
pub struct StubEngine {
    pub text: String,
    pub language: Option<String>,
    pub calls: AtomicUsize,
}

impl StubEngine {
    pub fn new(text: &str, language: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            language: language.map(str::to_string),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn transcribe(&self, _request: &SpeechRequest) -> Result<SpeechRecognition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SpeechRecognition {
            text: self.text.clone(),
            segments: Vec::new(),
            language: self.language.clone(),
        })
    }
}

/// Observer recording every transition and failure.
#[derive(Default)]
pub struct RecordingObserver {
    pub transitions: Mutex<Vec<(PipelineStage, PipelineStage)>>,
    pub failures: Mutex<Vec<(PipelineStage, String)>>,
}

impl RecordingObserver {
    pub fn transitions(&self) -> Vec<(PipelineStage, PipelineStage)> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn reached(&self, stage: PipelineStage) -> bool {
        self.transitions().iter().any(|(_, to)| *to == stage)
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_transition(&self, _request_id: Uuid, from: PipelineStage, to: PipelineStage) {
        self.transitions.lock().unwrap().push((from, to));
    }

    fn on_failure(&self, _request_id: Uuid, stage: PipelineStage, error: &NotesmithError) {
        self.failures.lock().unwrap().push((stage, error.to_string()));
    }
}

/// Configuration with a private scratch root and the native demuxer.
pub fn test_config(scratch: &TempDir) -> PipelineConfig {
    let mut config = PipelineConfig {
        scratch_dir: Some(scratch.path().to_path_buf()),
        ..Default::default()
    };
    config.transcription.demuxer = DemuxerMode::Native;
    config
}

pub fn normalizer_with(config: PipelineConfig, engine: Arc<dyn SpeechToText>) -> (Normalizer, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let normalizer = Normalizer::new(config, engine).unwrap().with_observer(observer.clone());
    (normalizer, observer)
}
