use anyhow::Result;
use tracing::{info, warn};

use crate::ai::{AiProvider, build_providers};
use crate::config::AiConfig;
use crate::error::GenerationError;
use crate::fallback;
use crate::models::{GeneratedScript, GenerationOptions, ScriptSource};

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub script: GeneratedScript,
    pub source: ScriptSource,
}

/// Writes scripts with the configured AI providers, falling back to the
/// local synthesizer when none is available or all of them fail.
pub struct ScriptGenerator {
    providers: Vec<AiProvider>,
    max_content_chars: usize,
}

impl ScriptGenerator {
    pub fn new(providers: Vec<AiProvider>, max_content_chars: usize) -> Self {
        Self {
            providers,
            max_content_chars,
        }
    }

    pub fn from_config(config: &AiConfig) -> Result<Self> {
        Ok(Self::new(build_providers(config)?, config.max_content_chars))
    }

    /// A generator that never calls out.
    pub fn offline() -> Self {
        Self::new(Vec::new(), usize::MAX)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.kind().name()).collect()
    }

    /// Produce a script. Provider failures are logged, never returned.
    pub async fn generate(&self, content: &str, options: &GenerationOptions) -> GenerationOutcome {
        if !self.providers.is_empty() {
            let prompt = build_prompt(truncate_chars(content, self.max_content_chars), options);
            for provider in &self.providers {
                let name = provider.kind().name();
                match self.try_provider(provider, &prompt).await {
                    Ok(script) => {
                        info!(provider = name, "script generated");
                        return GenerationOutcome {
                            script,
                            source: provider.kind().source(),
                        };
                    }
                    Err(e) => warn!(provider = name, error = %e, "provider failed, trying next"),
                }
            }
        }

        info!(style = %options.style, duration = %options.duration, "using local fallback generator");
        GenerationOutcome {
            script: fallback::synthesize(content, options),
            source: ScriptSource::Fallback,
        }
    }

    async fn try_provider(&self, provider: &AiProvider, prompt: &str) -> Result<GeneratedScript, GenerationError> {
        let text = provider.complete(prompt).await?;
        parse_script(provider.kind().name(), &text)
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(content: &str, options: &GenerationOptions) -> String {
    format!(
        r#"You are a professional podcast script writer. Create an engaging, well-structured podcast script based on the provided content.

Style: {style}
Target Duration: {duration} minutes
Show Name: {show}

The script should include:
1. A compelling intro that hooks the audience
2. Well-structured main content with natural transitions
3. A strong outro with call-to-action
4. Comprehensive show notes

Content to convert:
{content}

Format the response as JSON with this exact structure:
{{
  "intro": "Complete intro segment with host dialogue and music cues",
  "mainContent": "Main content with segments and transitions",
  "outro": "Outro segment with wrap-up and next episode teaser",
  "showNotes": {{
    "keyTopics": ["topic1", "topic2"],
    "resources": ["resource1", "resource2"],
    "timestamps": [{{"time": "0:00", "topic": "Introduction"}}],
    "episodeDetails": {{
      "duration": "~20 minutes",
      "category": "Technology",
      "format": "Solo Commentary"
    }}
  }}
}}

Make the script conversational, engaging, and professional. Include music cues like [INTRO MUSIC FADES IN] and [TRANSITION MUSIC]. Ensure natural flow between segments."#,
        style = options.style,
        duration = options.duration,
        show = options.show_name,
    )
}

/// Parse the JSON object embedded in a model response.
///
/// Models often wrap the object in prose or code fences, so the text between
/// the first `{` and the last `}` is taken.
pub fn parse_script(provider: &'static str, text: &str) -> Result<GeneratedScript, GenerationError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(GenerationError::NoJson { provider });
    };
    if end <= start {
        return Err(GenerationError::NoJson { provider });
    }

    let script: GeneratedScript =
        serde_json::from_str(&text[start..=end]).map_err(|e| GenerationError::Schema {
            provider,
            message: e.to_string(),
        })?;

    if !script.is_complete() {
        return Err(GenerationError::Schema {
            provider,
            message: "intro, mainContent and outro must be non-empty".to_string(),
        });
    }
    Ok(script)
}
