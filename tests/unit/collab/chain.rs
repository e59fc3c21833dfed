use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::foundation::core::Millis;

struct Voice {
    name: &'static str,
    fail: bool,
    calls: AtomicUsize,
}

impl Voice {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            calls: AtomicUsize::new(0),
        })
    }
}

impl SpeechSynthesizer for Voice {
    fn name(&self) -> &str {
        self.name
    }

    fn synthesize(&self, text: &str, _language: &str) -> GrimResult<Narration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GrimError::unavailable(self.name, "quota exhausted"));
        }
        Ok(Narration {
            handle: format!("{}:{}", self.name, text.len()),
            duration: Millis(1_000),
        })
    }
}

fn chain(voices: &[Arc<Voice>]) -> FallbackChain<dyn SpeechSynthesizer> {
    FallbackChain::new(
        "tts",
        voices
            .iter()
            .map(|v| Arc::clone(v) as Arc<dyn SpeechSynthesizer>)
            .collect(),
    )
}

#[test]
fn first_healthy_provider_wins() {
    let a = Voice::new("a", true);
    let b = Voice::new("b", false);
    let c = Voice::new("c", false);
    let out = chain(&[a.clone(), b.clone(), c.clone()])
        .synthesize("hello", "en")
        .unwrap();
    assert_eq!(out.handle, "b:5");
    assert_eq!(a.calls.load(Ordering::SeqCst), 1);
    assert_eq!(c.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn exhausted_chain_names_every_attempt() {
    let err = chain(&[Voice::new("a", true), Voice::new("b", true)])
        .synthesize("x", "en")
        .unwrap_err();
    let msg = err.to_string();
    assert!(err.is_retryable());
    assert!(msg.contains("tts"), "{msg}");
    assert!(msg.contains("a: ") && msg.contains("b: "), "{msg}");
}

#[test]
fn empty_chain_is_unavailable() {
    let err = chain(&[]).synthesize("x", "en").unwrap_err();
    assert!(matches!(err, GrimError::ProviderUnavailable { .. }));
}

struct Upper;

impl Translator for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn translate(&self, text: &str, _target: &str) -> GrimResult<String> {
        Ok(text.to_uppercase())
    }
}

#[test]
fn translator_chain_resolves() {
    let chain: FallbackChain<dyn Translator> = FallbackChain::new("tr", vec![Arc::new(Upper)]);
    assert_eq!(chain.translate("boo", "es").unwrap(), "BOO");
    assert_eq!(Translator::name(&chain), "tr");
}
