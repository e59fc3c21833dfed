use std::sync::Arc;

use crate::collab::provider::{Narration, SpeechSynthesizer, Translator};
use crate::foundation::error::{GrimError, GrimResult};

/// Ordered providers tried one after another until one succeeds.
///
/// The chain is itself a provider, so callers never branch on provider identity.
pub struct FallbackChain<P: ?Sized> {
    name: String,
    providers: Vec<Arc<P>>,
}

impl<P: ?Sized> FallbackChain<P> {
    pub fn new(name: impl Into<String>, providers: Vec<Arc<P>>) -> Self {
        Self {
            name: name.into(),
            providers,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn try_each<T>(
        &self,
        label: impl Fn(&P) -> String,
        call: impl Fn(&P) -> GrimResult<T>,
    ) -> GrimResult<T> {
        if self.providers.is_empty() {
            return Err(GrimError::unavailable(&self.name, "no providers configured"));
        }
        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider: &P = provider;
            let who = label(provider);
            match call(provider) {
                Ok(v) => {
                    if !failures.is_empty() {
                        tracing::info!(chain = %self.name, provider = %who, "fallback provider succeeded");
                    }
                    return Ok(v);
                }
                Err(e @ GrimError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(chain = %self.name, provider = %who, error = %e, "provider failed, trying next");
                    failures.push(format!("{who}: {e}"));
                }
            }
        }
        Err(GrimError::unavailable(
            &self.name,
            format!("all providers failed ({})", failures.join("; ")),
        ))
    }
}

impl SpeechSynthesizer for FallbackChain<dyn SpeechSynthesizer> {
    fn name(&self) -> &str {
        &self.name
    }

    fn synthesize(&self, text: &str, language: &str) -> GrimResult<Narration> {
        self.try_each(|p| p.name().to_string(), |p| p.synthesize(text, language))
    }
}

impl Translator for FallbackChain<dyn Translator> {
    fn name(&self) -> &str {
        &self.name
    }

    fn translate(&self, text: &str, target_language: &str) -> GrimResult<String> {
        self.try_each(|p| p.name().to_string(), |p| p.translate(text, target_language))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/chain.rs"]
mod tests;
