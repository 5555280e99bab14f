//! Deterministic script synthesis.
//!
//! Used when no AI provider produces a usable script, and directly by
//! `podscript generate --offline`. Every step has a placeholder so the
//! result is always a complete [`GeneratedScript`], however sparse the input.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::models::{
    DurationBucket, EpisodeDetails, GeneratedScript, GenerationOptions, PodcastStyle, ShowNotes, Timestamp,
};

/// Sentences at or below this many characters are treated as fragments.
const MIN_SENTENCE_CHARS: usize = 10;
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
/// Main content draws on sentences 2 through 8.
const MAX_MAIN_CHUNKS: usize = 7;
const MAX_TOPICS: usize = 5;
const MIN_TOPICS: usize = 3;
/// Tokens at or below this many characters never become topics.
const MIN_TOPIC_CHARS: usize = 4;

const GENERAL_CATEGORY: &str = "General";

const HOOK_PLACEHOLDER: &str = "Welcome to today's discussion";

const TOPIC_PLACEHOLDERS: [&str; 3] = ["Analysis", "Discussion", "Insights"];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Keyword sets checked in priority order; the first set with a hit wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Technology",
        &["technology", "tech", "digital", "software", "computer", "computing"],
    ),
    ("Business", &["business", "market", "company", "finance", "economy"]),
    (
        "Health",
        &[
            "health",
            "healthcare",
            "medical",
            "medicine",
            "wellness",
            "fitness",
            "doctors",
            "patients",
        ],
    ),
    ("Education", &["education", "learning", "school", "university"]),
    ("Science", &["science", "research", "study", "discovery"]),
];

/// Indexed by main-content chunk position.
const CHUNK_PLACEHOLDERS: [&str; MAX_MAIN_CHUNKS] = [
    "We're looking at a development that has significant implications",
    "The details are quite compelling when you examine them closely",
    "The patterns are becoming clearer as more information emerges",
    "The immediate effects are already visible to anyone paying attention",
    "Different groups stand to be affected in very different ways",
    "The long-term consequences are still taking shape",
    "The trajectory suggests several possible outcomes that are worth monitoring",
];

const RESOURCES: [&str; 3] = [
    "Episode transcript available on our website",
    "Follow us on social media for updates",
    "Submit topic suggestions via our contact form",
];

const TIMESTAMP_TOPICS: [&str; 6] = [
    "Introduction",
    "Topic Overview",
    "Key Points Analysis",
    "Main Discussion",
    "Implications & Takeaways",
    "Wrap-up & Next Episode",
];

const TRANSITION_CUE: &str = "[TRANSITION MUSIC - 3 SECONDS]";

struct StyleVoice {
    tone: &'static str,
    transition: &'static str,
    host_voice: &'static str,
}

fn style_voice(style: PodcastStyle) -> StyleVoice {
    match style {
        PodcastStyle::Conversational => StyleVoice {
            tone: "friendly and welcoming",
            transition: "So let's dive in",
            host_voice: "relaxed and chatty",
        },
        PodcastStyle::Professional => StyleVoice {
            tone: "authoritative and polished",
            transition: "Let's examine this in detail",
            host_voice: "measured and precise",
        },
        PodcastStyle::Educational => StyleVoice {
            tone: "knowledgeable and approachable",
            transition: "Today we'll learn about this together",
            host_voice: "patient and clear",
        },
        PodcastStyle::Interview => StyleVoice {
            tone: "curious and engaging",
            transition: "Our guest today brings unique insights",
            host_voice: "inquisitive and warm",
        },
    }
}

/// Produce a complete script from plain text without any network call.
pub fn synthesize(content: &str, options: &GenerationOptions) -> GeneratedScript {
    let sentences = split_sentences(content);
    let tokens = tokenize(content);
    let category = infer_category(&tokens);
    let key_topics = extract_key_topics(&tokens);
    let voice = style_voice(options.style);

    let hook = sentences.first().copied().unwrap_or(HOOK_PLACEHOLDER);
    let chunks: Vec<&str> = sentences.iter().skip(1).take(MAX_MAIN_CHUNKS).copied().collect();

    let intro = build_intro(&options.show_name, hook, &voice);
    let main_content = build_main_content(&chunks, category);
    let outro = build_outro(&options.show_name, &key_topics);

    let format = if options.style == PodcastStyle::Interview {
        "Interview Style"
    } else {
        "Solo Commentary"
    };

    GeneratedScript {
        intro,
        main_content,
        outro,
        show_notes: ShowNotes {
            key_topics,
            resources: RESOURCES.iter().map(|r| r.to_string()).collect(),
            timestamps: build_timestamps(options.duration),
            episode_details: EpisodeDetails {
                duration: format!("~{} minutes", options.duration.as_str().replace('+', "")),
                category: category.to_string(),
                format: format.to_string(),
                season: None,
                episode: None,
            },
        },
    }
}

/// Split after sentence-terminal punctuation, dropping short fragments.
/// Each sentence keeps its own terminator.
fn split_sentences(content: &str) -> Vec<&str> {
    content
        .split_inclusive(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| s.trim_end_matches(SENTENCE_TERMINATORS).trim_end().chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// The sentence with a terminal `.` added when it has none.
fn terminated(sentence: &str) -> Cow<'_, str> {
    if sentence.ends_with(SENTENCE_TERMINATORS) {
        Cow::Borrowed(sentence)
    } else {
        Cow::Owned(format!("{sentence}."))
    }
}

/// Lower-cased whitespace tokens with surrounding punctuation removed.
fn tokenize(content: &str) -> Vec<String> {
    content
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn infer_category(tokens: &[String]) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(_, keywords)| tokens.iter().any(|t| keywords.contains(&t.as_str())))
        .map(|(name, _)| *name)
        .unwrap_or(GENERAL_CATEGORY)
}

fn extract_key_topics(tokens: &[String]) -> Vec<String> {
    // (word, count) in first-seen order
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for token in tokens {
        let word = token.as_str();
        if word.chars().count() <= MIN_TOPIC_CHARS || STOP_WORDS.contains(&word) {
            continue;
        }
        match positions.get(word) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push((word, 1));
            }
        }
    }

    // Stable: equal counts keep first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut topics: Vec<String> = counts
        .into_iter()
        .take(MAX_TOPICS)
        .map(|(word, _)| capitalize(word))
        .collect();

    for placeholder in TOPIC_PLACEHOLDERS {
        if topics.len() >= MIN_TOPICS {
            break;
        }
        if !topics.iter().any(|t| t == placeholder) {
            topics.push(placeholder.to_string());
        }
    }

    topics
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn build_intro(show_name: &str, hook: &str, voice: &StyleVoice) -> String {
    [
        "[INTRO MUSIC FADES IN]".to_string(),
        format!(
            "Welcome to {show_name}! I'm your host, and today we're diving into a fascinating topic \
             that's sure to capture your attention."
        ),
        format!("[MUSIC FADES TO BACKGROUND]\n[HOST DELIVERY: {}, {}]", voice.host_voice, voice.tone),
        format!(
            "{} This is exactly the kind of story that deserves our attention, and I'm excited to \
             break it down for you in today's episode.",
            terminated(hook)
        ),
        "[MUSIC FADES OUT]".to_string(),
        format!(
            "{}, and explore what this means for all of us. Grab your coffee, settle in, and let's get started.",
            voice.transition
        ),
    ]
    .join("\n\n")
}

fn build_main_content(chunks: &[&str], category: &str) -> String {
    let chunk = |i: usize| terminated(chunks.get(i).copied().unwrap_or(CHUNK_PLACEHOLDERS[i]));

    let implications = (3..6)
        .enumerate()
        .map(|(n, i)| format!("{}. {}", n + 1, chunk(i)))
        .collect::<Vec<_>>()
        .join("\n");

    [
        "Now, let me walk you through the key points of this story.".to_string(),
        format!("{TRANSITION_CUE}\n[SEGMENT: {}]", category.to_uppercase()),
        format!("First, let's establish the context. {}", chunk(0)),
        format!(
            "{} This brings us to an important consideration that affects how we should interpret these findings.",
            chunk(1)
        ),
        TRANSITION_CUE.to_string(),
        format!(
            "What's particularly interesting is how this connects to broader trends we've been seeing. {}",
            chunk(2)
        ),
        "Let me break down the key implications:".to_string(),
        implications,
        TRANSITION_CUE.to_string(),
        format!("Now, you might be wondering what this means for the future. {}", chunk(6)),
        "This is where things get really interesting, and why I wanted to share this story with you today."
            .to_string(),
    ]
    .join("\n\n")
}

fn build_outro(show_name: &str, key_topics: &[String]) -> String {
    let first = key_topics.first().map(String::as_str).unwrap_or("this topic");
    let second = key_topics.get(1).map(String::as_str).unwrap_or("related matters");

    [
        "[OUTRO MUSIC FADES IN]".to_string(),
        format!(
            "So, what's the takeaway from all of this? I think the key insight is that {first} continues \
             to evolve in ways that demand our attention."
        ),
        format!(
            "As we wrap up today's episode, I encourage you to think about how this might impact your own \
             perspective on {second}."
        ),
        "[MUSIC BUILDS]".to_string(),
        format!(
            "Thanks for joining me on {show_name}. If you enjoyed today's discussion, don't forget to \
             subscribe and share this episode with friends who might find it interesting."
        ),
        "Next time, we'll be exploring another compelling story, so make sure you're subscribed so you \
         don't miss it."
            .to_string(),
        "Until then, keep questioning, keep learning, and I'll see you in the next episode.".to_string(),
        "[OUTRO MUSIC FADES OUT]".to_string(),
    ]
    .join("\n\n")
}

/// Six fixed markers spread over the bucket's estimated length.
/// Offsets never run backwards, even for the shortest bucket.
fn build_timestamps(duration: DurationBucket) -> Vec<Timestamp> {
    let total = duration.estimated_minutes() * 60;
    let whole_minutes_at = |percent: u32| total * percent / 100 / 60 * 60;
    let offsets = [
        0,
        90,
        whole_minutes_at(20),
        whole_minutes_at(50),
        whole_minutes_at(80),
        total.saturating_sub(120),
    ];

    let mut previous = 0;
    TIMESTAMP_TOPICS
        .iter()
        .zip(offsets)
        .map(|(topic, seconds)| {
            let seconds = seconds.max(previous);
            previous = seconds;
            Timestamp {
                time: format_clock(seconds),
                topic: topic.to_string(),
            }
        })
        .collect()
}

fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEDTECH: &str = "Artificial intelligence is transforming healthcare. Doctors now use AI diagnostic \
                           tools daily. Patient outcomes have improved significantly. This represents a major \
                           shift in medicine.";

    fn opts(style: PodcastStyle, duration: DurationBucket) -> GenerationOptions {
        GenerationOptions::new(style, duration, None)
    }

    fn infer_category_of(content: &str) -> &'static str {
        infer_category(&tokenize(content))
    }

    fn key_topics_of(content: &str) -> Vec<String> {
        extract_key_topics(&tokenize(content))
    }

    fn clock_seconds(time: &str) -> u32 {
        let (m, s) = time.split_once(':').unwrap();
        m.parse::<u32>().unwrap() * 60 + s.parse::<u32>().unwrap()
    }

    #[test]
    fn medtech_scenario() {
        let options = GenerationOptions::new(
            PodcastStyle::Educational,
            DurationBucket::TenToTwenty,
            Some("MedTech Weekly"),
        );
        let script = synthesize(MEDTECH, &options);

        let details = &script.show_notes.episode_details;
        assert_eq!(details.category, "Health");
        assert_eq!(details.format, "Solo Commentary");
        assert_eq!(details.duration, "~10-20 minutes");

        let timestamps = &script.show_notes.timestamps;
        assert_eq!(timestamps.len(), 6);
        assert_eq!(timestamps[0].time, "0:00");
        assert_eq!(timestamps[0].topic, "Introduction");

        assert!(script.intro.contains("MedTech Weekly"));
        assert!(script.intro.contains("Artificial intelligence is transforming healthcare."));
        assert!(script.outro.contains("MedTech Weekly"));
        assert!(script.main_content.contains("Doctors now use AI diagnostic tools daily."));
    }

    #[test]
    fn category_defaults_to_general() {
        assert_eq!(infer_category_of("The weather was lovely along the coast yesterday."), "General");
        assert_eq!(infer_category_of("AI is good."), "General");
    }

    #[test]
    fn each_keyword_set_maps_to_its_category() {
        let cases = [
            ("We shipped new software this week.", "Technology"),
            ("The market closed early on Friday.", "Business"),
            ("Regular fitness routines pay off later.", "Health"),
            ("Her university years shaped her outlook.", "Education"),
            ("A surprising discovery was announced today.", "Science"),
        ];
        for (content, expected) in cases {
            assert_eq!(infer_category_of(content), expected, "content: {content}");
        }
    }

    #[test]
    fn category_priority_order_wins() {
        assert_eq!(infer_category_of("research on digital tools"), "Technology");
        assert_eq!(infer_category_of("health of the economy"), "Business");
        assert_eq!(infer_category_of("school wellness programs"), "Health");
        assert_eq!(infer_category_of("study about learning"), "Education");
    }

    #[test]
    fn category_ignores_surrounding_punctuation() {
        assert_eq!(infer_category_of("Everyone talks about (healthcare)."), "Health");
        assert_eq!(infer_category_of("\"Technology,\" she said."), "Technology");
    }

    #[test]
    fn topics_ranked_by_frequency_with_first_seen_ties() {
        let topics = key_topics_of(
            "banana cherry apple cherry apple grape melon lemon mango grape",
        );
        // apple: 2, cherry: 2, grape: 2 -> first-seen order is cherry, apple, grape
        assert_eq!(topics[..3], ["Cherry", "Apple", "Grape"]);
        assert_eq!(topics.len(), 5);
        assert_eq!(topics[3], "Banana");
        assert_eq!(topics[4], "Melon");
    }

    #[test]
    fn topics_skip_stop_words_and_short_tokens() {
        let topics = key_topics_of("the cat and the dog with a bird by an owl");
        assert_eq!(topics, ["Analysis", "Discussion", "Insights"]);
    }

    #[test]
    fn longer_common_words_still_rank_as_topics() {
        let topics = key_topics_of(
            "Their approach changed things. Their other teams would follow their lead because things moved.",
        );
        assert_eq!(topics, ["Their", "Things", "Approach", "Changed", "Other"]);
    }

    #[test]
    fn topics_padded_without_duplicates() {
        let topics = key_topics_of("analysis analysis");
        assert_eq!(topics, ["Analysis", "Discussion", "Insights"]);

        let topics = key_topics_of("quantum quantum entanglement");
        assert_eq!(topics, ["Quantum", "Entanglement", "Analysis"]);
    }

    #[test]
    fn topic_count_is_always_between_three_and_five() {
        let inputs = [
            "",
            "tiny",
            "AI is good.",
            MEDTECH,
            "alpha bravo charlie delta echoes foxtrot golfer hotel india juliet kilos lima",
        ];
        for input in inputs {
            let n = key_topics_of(input).len();
            assert!((3..=5).contains(&n), "{n} topics for {input:?}");
        }
    }

    #[test]
    fn timestamps_are_six_and_non_decreasing_for_every_bucket() {
        for duration in DurationBucket::ALL {
            let timestamps = build_timestamps(duration);
            assert_eq!(timestamps.len(), 6);
            let seconds: Vec<u32> = timestamps.iter().map(|t| clock_seconds(&t.time)).collect();
            assert!(
                seconds.windows(2).all(|w| w[0] <= w[1]),
                "{duration}: {seconds:?}"
            );
            let topics: Vec<&str> = timestamps.iter().map(|t| t.topic.as_str()).collect();
            assert_eq!(topics, TIMESTAMP_TOPICS);
        }
    }

    #[test]
    fn timestamps_for_fifteen_minutes() {
        let times: Vec<String> = build_timestamps(DurationBucket::TenToTwenty)
            .into_iter()
            .map(|t| t.time)
            .collect();
        assert_eq!(times, ["0:00", "1:30", "3:00", "7:00", "12:00", "13:00"]);
    }

    #[test]
    fn timestamps_for_shortest_bucket_are_clamped() {
        let times: Vec<String> = build_timestamps(DurationBucket::FiveToTen)
            .into_iter()
            .map(|t| t.time)
            .collect();
        assert_eq!(times, ["0:00", "1:30", "1:30", "4:00", "6:00", "6:00"]);
    }

    #[test]
    fn duration_label_strips_plus() {
        let script = synthesize(MEDTECH, &opts(PodcastStyle::Conversational, DurationBucket::ThirtyPlus));
        assert_eq!(script.show_notes.episode_details.duration, "~30 minutes");
    }

    #[test]
    fn interview_style_sets_format() {
        let script = synthesize(MEDTECH, &opts(PodcastStyle::Interview, DurationBucket::TenToTwenty));
        assert_eq!(script.show_notes.episode_details.format, "Interview Style");
        assert!(script.intro.contains("Our guest today brings unique insights"));
    }

    #[test]
    fn sparse_input_still_produces_complete_script() {
        let script = synthesize("AI is good.", &opts(PodcastStyle::Conversational, DurationBucket::FiveToTen));
        assert!(script.is_complete());
        assert!(script.intro.contains("Welcome to today's discussion."));
        assert!(script.intro.contains("The Show"));
        assert!(script.main_content.contains("1. "));
        assert!(script.main_content.contains("3. "));
        assert_eq!(script.show_notes.key_topics, ["Analysis", "Discussion", "Insights"]);
        assert_eq!(script.show_notes.resources.len(), 3);
        assert_eq!(script.show_notes.episode_details.category, "General");
    }

    #[test]
    fn script_carries_stage_directions() {
        let script = synthesize(MEDTECH, &opts(PodcastStyle::Professional, DurationBucket::TwentyToThirty));
        assert!(script.intro.starts_with("[INTRO MUSIC FADES IN]"));
        assert!(script.intro.contains("[HOST DELIVERY: measured and precise, authoritative and polished]"));
        assert!(script.main_content.contains("[TRANSITION MUSIC"));
        assert!(script.main_content.contains("[SEGMENT: HEALTH]"));
        assert!(script.outro.ends_with("[OUTRO MUSIC FADES OUT]"));
    }

    #[test]
    fn sentences_drop_short_fragments() {
        let sentences = split_sentences("Hi. Ok! This sentence is long enough? Yes. And this one also counts.");
        assert_eq!(sentences, ["This sentence is long enough?", "And this one also counts."]);
    }

    #[test]
    fn sentences_keep_their_own_terminator() {
        let content = "Can machines really think for themselves? Researchers remain deeply divided on this! \
                       The debate is far from settled";
        let script = synthesize(content, &opts(PodcastStyle::Conversational, DurationBucket::TenToTwenty));
        assert!(script.intro.contains("Can machines really think for themselves? This is exactly"));
        assert!(!script.intro.contains("themselves."));
        assert!(script.main_content.contains("the context. Researchers remain deeply divided on this!\n\n"));
        assert!(script.main_content.contains("The debate is far from settled. This brings us"));
    }

    #[test]
    fn elaboration_points_come_from_sentences_five_to_seven() {
        let content = "Sentence number one is here. Sentence number two is here. Sentence number three is here. \
                       Sentence number four is here. Sentence number five is here. Sentence number six is here. \
                       Sentence number seven is here. Sentence number eight is here. Sentence number nine is here.";
        let script = synthesize(content, &opts(PodcastStyle::Conversational, DurationBucket::TenToTwenty));
        assert!(script.main_content.contains("1. Sentence number five is here."));
        assert!(script.main_content.contains("2. Sentence number six is here."));
        assert!(script.main_content.contains("3. Sentence number seven is here."));
        assert!(script.main_content.contains("the future. Sentence number eight is here."));
        assert!(!script.main_content.contains("nine"));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let options = GenerationOptions::new(PodcastStyle::Educational, DurationBucket::ThirtyPlus, Some("Repeat"));
        let first = serde_json::to_string(&synthesize(MEDTECH, &options)).unwrap();
        for _ in 0..5 {
            assert_eq!(serde_json::to_string(&synthesize(MEDTECH, &options)).unwrap(), first);
        }
    }
}
