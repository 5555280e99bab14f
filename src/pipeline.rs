use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::generate::ScriptGenerator;
use crate::models::{ContentInput, GenerationOptions, PersistedScript};
use crate::store;

/// Generate a script for `input` and store it.
///
/// Input validation failures surface as [`crate::error::InputError`] inside
/// the returned error, so callers can downcast to tell them apart.
pub async fn create_script(
    pool: &SqlitePool,
    generator: &ScriptGenerator,
    input: ContentInput,
    options: GenerationOptions,
    timezone: Tz,
) -> Result<PersistedScript> {
    input.validate()?;

    let outcome = generator.generate(&input.text, &options).await;
    let created_at = Utc::now().trunc_subsecs(0);

    let script = PersistedScript {
        id: Uuid::new_v4().to_string(),
        title: script_title(input.title.as_deref(), &options.show_name, created_at, timezone),
        word_count: input.word_count() as i64,
        char_count: input.char_count() as i64,
        input_content: input.text,
        input_type: input.input_type,
        source_url: input.source_url,
        script: outcome.script,
        podcast_style: options.style,
        target_duration: options.duration,
        show_name: options.show_name,
        source: outcome.source,
        created_at,
    };

    store::insert_script(pool, &script)
        .await
        .context("saving generated script")?;

    info!(
        id = %script.id,
        title = %script.title,
        source = script.source.as_str(),
        words = script.word_count,
        "podcast script created"
    );
    Ok(script)
}

/// Fetched pages keep their own title; pasted text is named after the show and day.
fn script_title(title: Option<&str>, show_name: &str, created_at: DateTime<Utc>, timezone: Tz) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.to_string(),
        None => format!("{} - {}", show_name, created_at.with_timezone(&timezone).format("%Y-%m-%d")),
    }
}
