use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::InputError;

/// Minimum trimmed content length accepted for generation.
pub const MIN_CONTENT_CHARS: usize = 10;

pub const DEFAULT_SHOW_NAME: &str = "The Show";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodcastStyle {
    #[default]
    Conversational,
    Professional,
    Educational,
    Interview,
}

impl PodcastStyle {
    pub const ALL: [PodcastStyle; 4] = [
        PodcastStyle::Conversational,
        PodcastStyle::Professional,
        PodcastStyle::Educational,
        PodcastStyle::Interview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PodcastStyle::Conversational => "conversational",
            PodcastStyle::Professional => "professional",
            PodcastStyle::Educational => "educational",
            PodcastStyle::Interview => "interview",
        }
    }

    /// Unrecognized values are treated as conversational.
    pub fn parse_lenient(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for PodcastStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse target episode length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationBucket {
    #[serde(rename = "5-10")]
    FiveToTen,
    #[default]
    #[serde(rename = "10-20")]
    TenToTwenty,
    #[serde(rename = "20-30")]
    TwentyToThirty,
    #[serde(rename = "30+")]
    ThirtyPlus,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 4] = [
        DurationBucket::FiveToTen,
        DurationBucket::TenToTwenty,
        DurationBucket::TwentyToThirty,
        DurationBucket::ThirtyPlus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DurationBucket::FiveToTen => "5-10",
            DurationBucket::TenToTwenty => "10-20",
            DurationBucket::TwentyToThirty => "20-30",
            DurationBucket::ThirtyPlus => "30+",
        }
    }

    /// Unrecognized values are treated as 10-20.
    pub fn parse_lenient(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == value)
            .unwrap_or_default()
    }

    /// Representative episode length used for timestamp estimates.
    pub fn estimated_minutes(self) -> u32 {
        match self {
            DurationBucket::FiveToTen => 8,
            DurationBucket::TenToTwenty => 15,
            DurationBucket::TwentyToThirty => 25,
            DurationBucket::ThirtyPlus => 35,
        }
    }
}

impl std::fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub style: PodcastStyle,
    pub duration: DurationBucket,
    pub show_name: String,
}

impl GenerationOptions {
    pub fn new(style: PodcastStyle, duration: DurationBucket, show_name: Option<&str>) -> Self {
        let show_name = show_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SHOW_NAME)
            .to_string();
        Self {
            style,
            duration,
            show_name,
        }
    }

    /// Build options from loosely-typed request values.
    pub fn from_raw(style: Option<&str>, duration: Option<&str>, show_name: Option<&str>) -> Self {
        Self::new(
            style.map(PodcastStyle::parse_lenient).unwrap_or_default(),
            duration.map(DurationBucket::parse_lenient).unwrap_or_default(),
            show_name,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedContent {
    pub title: String,
    pub content: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Url,
}

impl InputType {
    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Url => "url",
        }
    }
}

/// Text submitted for generation, either pasted or fetched from a URL.
#[derive(Debug, Clone)]
pub struct ContentInput {
    pub text: String,
    pub input_type: InputType,
    pub source_url: Option<String>,
    pub title: Option<String>,
}

impl ContentInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_type: InputType::Text,
            source_url: None,
            title: None,
        }
    }

    pub fn from_fetched(url: &str, fetched: FetchedContent) -> Self {
        Self {
            text: fetched.content,
            input_type: InputType::Url,
            source_url: Some(url.to_string()),
            title: Some(fetched.title),
        }
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.text)
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let actual = self.text.trim().chars().count();
        if actual < MIN_CONTENT_CHARS {
            return Err(InputError::ContentTooShort {
                min: MIN_CONTENT_CHARS,
                actual,
            });
        }
        Ok(())
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScript {
    pub intro: String,
    pub main_content: String,
    pub outro: String,
    pub show_notes: ShowNotes,
}

impl GeneratedScript {
    /// True when every narrated part has text.
    pub fn is_complete(&self) -> bool {
        [&self.intro, &self.main_content, &self.outro]
            .iter()
            .all(|part| !part.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowNotes {
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub timestamps: Vec<Timestamp>,
    pub episode_details: EpisodeDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub time: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDetails {
    pub duration: String,
    pub category: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
}

/// Which generator produced a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptSource {
    Gemini,
    OpenAi,
    Fallback,
}

impl ScriptSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptSource::Gemini => "gemini",
            ScriptSource::OpenAi => "openai",
            ScriptSource::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gemini" => Some(ScriptSource::Gemini),
            "openai" => Some(ScriptSource::OpenAi),
            "fallback" => Some(ScriptSource::Fallback),
            _ => None,
        }
    }
}

/// A generated script together with its input, ready to be stored or returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedScript {
    pub id: String,
    pub title: String,
    pub input_content: String,
    pub input_type: InputType,
    pub source_url: Option<String>,
    pub script: GeneratedScript,
    pub podcast_style: PodcastStyle,
    pub target_duration: DurationBucket,
    pub show_name: String,
    pub word_count: i64,
    pub char_count: i64,
    pub source: ScriptSource,
    pub created_at: DateTime<Utc>,
}

/// Read model for scripts from DB.
#[derive(Debug, Clone, FromRow)]
pub struct ScriptRow {
    pub id: String,
    pub title: String,
    pub input_content: String,
    pub input_type: String,
    pub source_url: Option<String>,
    pub script: String,
    pub podcast_style: String,
    pub target_duration: String,
    pub show_name: String,
    pub word_count: i64,
    pub char_count: i64,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl ScriptRow {
    pub fn into_script(self) -> Result<PersistedScript> {
        let script: GeneratedScript = serde_json::from_str(&self.script)
            .with_context(|| format!("decoding stored script {}", self.id))?;
        let input_type = match self.input_type.as_str() {
            "url" => InputType::Url,
            _ => InputType::Text,
        };
        let source = ScriptSource::parse(&self.source)
            .ok_or_else(|| anyhow::anyhow!("unknown script source '{}' on {}", self.source, self.id))?;

        Ok(PersistedScript {
            id: self.id,
            title: self.title,
            input_content: self.input_content,
            input_type,
            source_url: self.source_url,
            script,
            podcast_style: PodcastStyle::parse_lenient(&self.podcast_style),
            target_duration: DurationBucket::parse_lenient(&self.target_duration),
            show_name: self.show_name,
            word_count: self.word_count,
            char_count: self.char_count,
            source,
            created_at: self.created_at,
        })
    }
}
