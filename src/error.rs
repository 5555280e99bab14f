use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("content must be at least {min} characters (got {actual})")]
    ContentTooShort { min: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("HTTP request failed for {url}: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("{url} responded with HTTP {status} {status_text}")]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not extract meaningful content from {url} ({chars} characters found)")]
    NoContent { url: String, chars: usize },
}

/// Failure while turning a URL into article text.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        source: reqwest::Error,
    },
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },
    #[error("{provider} response contained no JSON object")]
    NoJson { provider: &'static str },
    #[error("{provider} response did not match the script schema: {message}")]
    Schema { provider: &'static str, message: String },
}
