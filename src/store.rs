use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

use crate::models::{PersistedScript, ScriptRow};

/// All script columns in SELECT order (must match ScriptRow field order).
const SCRIPT_COLUMNS: &str = "id, title, input_content, input_type, source_url, script,
    podcast_style, target_duration, show_name, word_count, char_count, source, created_at";

pub async fn insert_script(pool: &SqlitePool, script: &PersistedScript) -> Result<()> {
    let script_json = serde_json::to_string(&script.script).context("serializing script body")?;

    sqlx::query(
        "INSERT INTO podcast_scripts (id, title, input_content, input_type, source_url, script,
         podcast_style, target_duration, show_name, word_count, char_count, source, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&script.id)
    .bind(&script.title)
    .bind(&script.input_content)
    .bind(script.input_type.as_str())
    .bind(&script.source_url)
    .bind(&script_json)
    .bind(script.podcast_style.as_str())
    .bind(script.target_duration.as_str())
    .bind(&script.show_name)
    .bind(script.word_count)
    .bind(script.char_count)
    .bind(script.source.as_str())
    .bind(script.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    .execute(pool)
    .await
    .context("inserting podcast script")?;

    debug!(id = %script.id, title = %script.title, "stored podcast script");
    Ok(())
}

pub async fn get_script(pool: &SqlitePool, id: &str) -> Result<Option<PersistedScript>> {
    let query = format!("SELECT {SCRIPT_COLUMNS} FROM podcast_scripts WHERE id = ?");
    let row = sqlx::query_as::<_, ScriptRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetching podcast script")?;

    row.map(ScriptRow::into_script).transpose()
}

/// Most recent scripts first. Rows created within the same second keep
/// insertion order reversed.
pub async fn list_scripts(pool: &SqlitePool, limit: i64) -> Result<Vec<PersistedScript>> {
    let query = format!("SELECT {SCRIPT_COLUMNS} FROM podcast_scripts ORDER BY created_at DESC, rowid DESC LIMIT ?");
    let rows = sqlx::query_as::<_, ScriptRow>(&query)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("listing podcast scripts")?;

    rows.into_iter().map(ScriptRow::into_script).collect()
}

pub async fn count_scripts(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM podcast_scripts")
        .fetch_one(pool)
        .await
        .context("counting podcast scripts")?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::fallback;
    use crate::models::{DurationBucket, GenerationOptions, InputType, PodcastStyle, ScriptSource};
    use chrono::{Duration, TimeZone, Utc};

    fn sample(id: &str, minutes_ago: i64) -> PersistedScript {
        let content = "Renewable energy adoption is accelerating across the world. Solar panels are cheaper than ever.";
        let options = GenerationOptions::new(PodcastStyle::Educational, DurationBucket::FiveToTen, Some("Green Hour"));
        PersistedScript {
            id: id.to_string(),
            title: format!("Episode {id}"),
            input_content: content.to_string(),
            input_type: InputType::Url,
            source_url: Some("https://example.com/energy".to_string()),
            script: fallback::synthesize(content, &options),
            podcast_style: options.style,
            target_duration: options.duration,
            show_name: options.show_name,
            word_count: 15,
            char_count: content.chars().count() as i64,
            source: ScriptSource::Fallback,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_script() {
        let pool = memory_pool().await;
        let script = sample("a", 0);
        insert_script(&pool, &script).await.unwrap();

        let loaded = get_script(&pool, "a").await.unwrap().unwrap();
        assert_eq!(loaded.title, script.title);
        assert_eq!(loaded.script, script.script);
        assert_eq!(loaded.input_type, InputType::Url);
        assert_eq!(loaded.source_url, script.source_url);
        assert_eq!(loaded.podcast_style, PodcastStyle::Educational);
        assert_eq!(loaded.target_duration, DurationBucket::FiveToTen);
        assert_eq!(loaded.source, ScriptSource::Fallback);
        assert_eq!(loaded.created_at, script.created_at);
    }

    #[tokio::test]
    async fn missing_script_is_none() {
        let pool = memory_pool().await;
        assert!(get_script(&pool, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_limited() {
        let pool = memory_pool().await;
        for (id, age) in [("old", 30), ("new", 1), ("mid", 10)] {
            insert_script(&pool, &sample(id, age)).await.unwrap();
        }

        let ids: Vec<_> = list_scripts(&pool, 10).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["new", "mid", "old"]);

        let limited = list_scripts(&pool, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(count_scripts(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let pool = memory_pool().await;
        insert_script(&pool, &sample("dup", 0)).await.unwrap();
        assert!(insert_script(&pool, &sample("dup", 5)).await.is_err());
    }
}
