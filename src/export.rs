//! Downloadable renderings of a stored script.

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{Context, Result};
use pulldown_cmark::{Event, Options, Parser, html};
use pulldown_cmark_escape::escape_html;

use crate::models::{GeneratedScript, PersistedScript};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Txt,
    Markdown,
    Html,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain; charset=utf-8",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{other}' (expected txt, markdown, html or json)")),
        }
    }
}

pub fn render(script: &PersistedScript, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Txt => Ok(render_text(&script.title, &script.script)),
        ExportFormat::Markdown => Ok(render_markdown(script)),
        ExportFormat::Html => Ok(render_html(script)),
        ExportFormat::Json => serde_json::to_string_pretty(script).context("serializing script export"),
    }
}

/// Download name: the title reduced to lowercase ASCII words joined by `_`.
pub fn file_name(script: &PersistedScript, format: ExportFormat) -> String {
    let mut stem = String::new();
    for word in script
        .title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !stem.is_empty() {
            stem.push('_');
        }
        stem.push_str(&word.to_ascii_lowercase());
    }
    if stem.is_empty() {
        stem.push_str("podcast_script");
    }
    format!("{stem}.{}", format.extension())
}

/// Plain text with the same section layout as the Markdown export and `•` bullets.
pub fn render_text(title: &str, script: &GeneratedScript) -> String {
    let notes = &script.show_notes;
    let details = &notes.episode_details;
    let mut out = String::new();

    let _ = writeln!(out, "# {title}\n");
    let _ = writeln!(out, "## Intro\n{}\n", script.intro);
    let _ = writeln!(out, "## Main Content\n{}\n", script.main_content);
    let _ = writeln!(out, "## Outro\n{}\n", script.outro);

    out.push_str("## Show Notes\n### Key Topics\n");
    for topic in &notes.key_topics {
        let _ = writeln!(out, "• {topic}");
    }
    out.push_str("\n### Timestamps\n");
    for ts in &notes.timestamps {
        let _ = writeln!(out, "• {} - {}", ts.time, ts.topic);
    }
    out.push_str("\n### Episode Details\n");
    let _ = writeln!(out, "• Duration: {}", details.duration);
    let _ = writeln!(out, "• Category: {}", details.category);
    let _ = writeln!(out, "• Format: {}", details.format);

    if !notes.resources.is_empty() {
        out.push_str("\n### Resources\n");
        for resource in &notes.resources {
            let _ = writeln!(out, "• {resource}");
        }
    }
    out
}

fn render_markdown(script: &PersistedScript) -> String {
    let body = &script.script;
    let notes = &body.show_notes;
    let details = &notes.episode_details;
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", script.title);
    let _ = writeln!(
        out,
        "*{} · {} style · {} minutes · generated {} by {}*\n",
        script.show_name,
        script.podcast_style,
        script.target_duration,
        script.created_at.format("%Y-%m-%d %H:%M UTC"),
        script.source.as_str(),
    );
    if let Some(url) = &script.source_url {
        let _ = writeln!(out, "Source: <{url}>\n");
    }

    for (heading, text) in [
        ("Intro", &body.intro),
        ("Main Content", &body.main_content),
        ("Outro", &body.outro),
    ] {
        let _ = writeln!(out, "## {heading}\n");
        // Hard line breaks so cue lines survive rendering.
        for line in text.lines() {
            let _ = writeln!(out, "{line}  ");
        }
        out.push('\n');
    }

    out.push_str("## Show Notes\n\n### Key Topics\n\n");
    for topic in &notes.key_topics {
        let _ = writeln!(out, "- {topic}");
    }
    out.push_str("\n### Timestamps\n\n");
    for ts in &notes.timestamps {
        let _ = writeln!(out, "- **{}** - {}", ts.time, ts.topic);
    }
    out.push_str("\n### Episode Details\n\n");
    let _ = writeln!(out, "- **Duration:** {}", details.duration);
    let _ = writeln!(out, "- **Category:** {}", details.category);
    let _ = writeln!(out, "- **Format:** {}", details.format);
    if let Some(season) = &details.season {
        let _ = writeln!(out, "- **Season:** {season}");
    }
    if let Some(episode) = &details.episode {
        let _ = writeln!(out, "- **Episode:** {episode}");
    }
    if !notes.resources.is_empty() {
        out.push_str("\n### Resources\n\n");
        for resource in &notes.resources {
            let _ = writeln!(out, "- {resource}");
        }
    }
    out
}

/// Raw HTML in script text is rendered as literal text, never as markup.
fn render_html(script: &PersistedScript) -> String {
    let markdown = render_markdown(script);
    let parser = Parser::new_ext(&markdown, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut body = String::new();
    html::push_html(&mut body, parser);

    let mut title = String::new();
    let _ = escape_html(&mut title, &script.title);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::models::{DurationBucket, GenerationOptions, InputType, PodcastStyle, ScriptSource};
    use chrono::{TimeZone, Utc};

    fn sample() -> PersistedScript {
        let content = "Quantum computing research is advancing quickly. Scientists have built processors \
                       with hundreds of qubits. Error correction remains the biggest challenge for the field.";
        let options = GenerationOptions::new(PodcastStyle::Interview, DurationBucket::TwentyToThirty, Some("Lab Notes"));
        PersistedScript {
            id: "0b6f".to_string(),
            title: "Quantum <Leap> & Beyond".to_string(),
            input_content: content.to_string(),
            input_type: InputType::Text,
            source_url: None,
            script: fallback::synthesize(content, &options),
            podcast_style: options.style,
            target_duration: options.duration,
            show_name: options.show_name,
            word_count: 24,
            char_count: content.len() as i64,
            source: ScriptSource::Fallback,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap(),
        }
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Txt);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn text_export_has_every_section() {
        let script = sample();
        let text = render(&script, ExportFormat::Txt).unwrap();
        for heading in [
            "# Quantum <Leap> & Beyond",
            "## Intro",
            "## Main Content",
            "## Outro",
            "### Key Topics",
            "### Timestamps",
            "### Episode Details",
            "• Format: Interview Style",
            "• Duration: ~20-30 minutes",
        ] {
            assert!(text.contains(heading), "missing {heading:?}");
        }
        assert!(text.contains("• 0:00 - Introduction"));
        assert!(text.contains(&script.script.intro));
    }

    #[test]
    fn markdown_export_lists_notes() {
        let script = sample();
        let md = render(&script, ExportFormat::Markdown).unwrap();
        assert!(md.starts_with("# Quantum <Leap> & Beyond\n"));
        assert!(md.contains("Lab Notes · interview style · 20-30 minutes"));
        assert!(md.contains("- **0:00** - Introduction"));
        for topic in &script.script.show_notes.key_topics {
            assert!(md.contains(&format!("- {topic}")));
        }
    }

    #[test]
    fn html_export_escapes_title() {
        let html = render(&sample(), ExportFormat::Html).unwrap();
        assert!(html.contains("<title>Quantum &lt;Leap&gt; &amp; Beyond</title>"));
        assert!(html.contains("<h2>Intro</h2>"));
        assert!(html.contains("<li><strong>0:00</strong> - Introduction</li>"));
    }

    #[test]
    fn html_export_neutralizes_markup_in_script_text() {
        let mut script = sample();
        script.script.intro = "Hello <script>alert(1)</script> <img src=x onerror=alert(2)>".to_string();
        script.script.main_content = "<script>alert(3)</script>\n<div onclick=\"steal()\">click</div>".to_string();

        let html = render(&script, ExportFormat::Html).unwrap();
        assert!(!html.contains("<script"), "{html}");
        assert!(!html.contains("<img"), "{html}");
        assert!(!html.contains("<div"), "{html}");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;img src=x onerror=alert(2)&gt;"));
        assert!(html.contains("&lt;script&gt;alert(3)&lt;/script&gt;"));
    }

    #[test]
    fn json_export_is_the_full_record() {
        let json = render(&sample(), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], "0b6f");
        assert_eq!(value["podcastStyle"], "interview");
        assert_eq!(value["targetDuration"], "20-30");
        assert!(value["script"]["showNotes"]["timestamps"].is_array());
    }

    #[test]
    fn file_names_are_slugged() {
        let script = sample();
        assert_eq!(file_name(&script, ExportFormat::Markdown), "quantum_leap_beyond.md");
        let mut untitled = sample();
        untitled.title = "???".to_string();
        assert_eq!(file_name(&untitled, ExportFormat::Txt), "podcast_script.txt");
    }
}
