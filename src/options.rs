//! Sampling options and their per-provider mapping.
//!
//! Only fields the caller actually supplied are carried across. An unset
//! field stays `None` all the way to the SDK request so the backend applies
//! its own default; nothing here synthesises a value.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// Generic sampling options supplied with a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingOptions {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Presence penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl SamplingOptions {
    /// Sets the temperature.
    #[must_use]
    pub const fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    /// Sets the maximum tokens to generate.
    #[must_use]
    pub const fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    /// Sets the nucleus sampling cutoff.
    #[must_use]
    pub const fn top_p(mut self, value: f32) -> Self {
        self.top_p = Some(value);
        self
    }

    /// Sets the presence penalty.
    #[must_use]
    pub const fn presence_penalty(mut self, value: f32) -> Self {
        self.presence_penalty = Some(value);
        self
    }
}

/// Option surface of the API-hosted provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OpenAiOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Presence penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl OpenAiOptions {
    /// Maps generic options; all four fields have a destination.
    #[must_use]
    pub const fn from_sampling(options: &SamplingOptions) -> Self {
        Self {
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            presence_penalty: options.presence_penalty,
        }
    }
}

/// Option surface of the local-runtime provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OllamaOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Maximum tokens to predict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

impl OllamaOptions {
    /// Maps generic options. Presence penalty has no destination and is dropped.
    #[must_use]
    pub fn from_sampling(options: &SamplingOptions) -> Self {
        Self {
            temperature: options.temperature,
            top_p: options.top_p,
            num_predict: options
                .max_tokens
                .map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
        }
    }

    /// Returns `true` when no field was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.num_predict.is_none()
    }
}

/// Provider-specific options for one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderOptions {
    /// Options for the API-hosted provider.
    OpenAi(OpenAiOptions),
    /// Options for the local-runtime provider.
    Ollama(OllamaOptions),
}

/// Maps generic sampling options onto the option surface of `provider`.
#[must_use]
pub fn map_options(provider: ProviderKind, options: &SamplingOptions) -> ProviderOptions {
    match provider {
        ProviderKind::PrimaryApi => ProviderOptions::OpenAi(OpenAiOptions::from_sampling(options)),
        ProviderKind::LocalRuntime => {
            ProviderOptions::Ollama(OllamaOptions::from_sampling(options))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_temperature_only_leaves_other_fields_absent() {
        let options = SamplingOptions::default().temperature(0.7);
        let mapped = OpenAiOptions::from_sampling(&options);
        assert_eq!(mapped.temperature, Some(0.7));
        assert!(mapped.max_tokens.is_none());
        assert!(mapped.top_p.is_none());
        assert!(mapped.presence_penalty.is_none());

        let json = serde_json::to_value(mapped).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"temperature": 0.7_f32}));
    }

    #[test]
    fn test_zero_temperature_is_kept() {
        let options = SamplingOptions::default().temperature(0.0);
        let mapped = map_options(ProviderKind::PrimaryApi, &options);
        assert_eq!(
            mapped,
            ProviderOptions::OpenAi(OpenAiOptions {
                temperature: Some(0.0),
                ..OpenAiOptions::default()
            })
        );
    }

    #[test]
    fn test_ollama_drops_presence_penalty() {
        let options = SamplingOptions::default()
            .presence_penalty(1.5)
            .max_tokens(256);
        let mapped = OllamaOptions::from_sampling(&options);
        assert_eq!(mapped.num_predict, Some(256));
        assert!(mapped.temperature.is_none());
        assert!(mapped.top_p.is_none());

        let json = serde_json::to_value(mapped).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"num_predict": 256}));
    }

    #[test]
    fn test_ollama_max_tokens_saturates() {
        let options = SamplingOptions::default().max_tokens(u32::MAX);
        assert_eq!(
            OllamaOptions::from_sampling(&options).num_predict,
            Some(i32::MAX)
        );
    }

    #[test]
    fn test_empty_options_map_to_empty_surface() {
        let options = SamplingOptions::default();
        assert_eq!(OpenAiOptions::from_sampling(&options), OpenAiOptions::default());
        assert!(OllamaOptions::from_sampling(&options).is_empty());
    }

    #[test]
    fn test_sampling_options_deserialization() {
        let options: SamplingOptions =
            serde_json::from_str(r#"{"temperature": 0.2, "maxTokens": 50, "stream": true}"#)
                .unwrap_or_default();
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(50));
        assert!(options.top_p.is_none());
    }

    proptest! {
        #[test]
        fn prop_fields_map_independently(
            temperature in proptest::option::of(0.0_f32..2.0),
            max_tokens in proptest::option::of(1_u32..100_000),
            top_p in proptest::option::of(0.0_f32..1.0),
            presence_penalty in proptest::option::of(-2.0_f32..2.0),
        ) {
            let options = SamplingOptions { temperature, max_tokens, top_p, presence_penalty };

            let api = OpenAiOptions::from_sampling(&options);
            prop_assert_eq!(api.temperature, temperature);
            prop_assert_eq!(api.max_tokens, max_tokens);
            prop_assert_eq!(api.top_p, top_p);
            prop_assert_eq!(api.presence_penalty, presence_penalty);

            let local = OllamaOptions::from_sampling(&options);
            prop_assert_eq!(local.temperature, temperature);
            prop_assert_eq!(local.top_p, top_p);
            prop_assert_eq!(local.num_predict.is_some(), max_tokens.is_some());
        }
    }
}
