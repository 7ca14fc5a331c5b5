use std::fmt;
use thiserror::Error;

/// Upper bound on raw text carried inside an error for diagnostics.
pub const SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{provider} request failed: {}", provider_detail(*status, *timed_out, detail))]
    Provider {
        provider: String,
        status: Option<u16>,
        detail: String,
        timed_out: bool,
    },

    #[error("could not decode workout plan: {message} (raw: {snippet:?})")]
    Parse { message: String, snippet: String },
}

fn provider_detail(status: Option<u16>, timed_out: bool, detail: &str) -> String {
    match (timed_out, status) {
        (true, _) => format!("timed out ({})", detail),
        (false, Some(code)) => format!("HTTP {} - {}", code, detail),
        (false, None) => detail.to_string(),
    }
}

impl PlanError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn provider(provider: &str, status: Option<u16>, detail: impl AsRef<str>) -> Self {
        PlanError::Provider {
            provider: provider.to_string(),
            status,
            detail: snippet(detail.as_ref()),
            timed_out: false,
        }
    }

    /// The request never produced an HTTP response (connect, TLS, reset).
    pub fn transport(provider: &str, err: impl fmt::Display) -> Self {
        PlanError::Provider {
            provider: provider.to_string(),
            status: None,
            detail: format!("transport: {}", err),
            timed_out: false,
        }
    }

    pub fn timeout(provider: &str, detail: impl Into<String>) -> Self {
        PlanError::Provider {
            provider: provider.to_string(),
            status: None,
            detail: detail.into(),
            timed_out: true,
        }
    }

    pub fn parse(message: impl Into<String>, raw: &str) -> Self {
        PlanError::Parse {
            message: message.into(),
            snippet: snippet(raw),
        }
    }

    /// Failures worth another attempt against the same backend.
    pub fn is_transient(&self) -> bool {
        match self {
            PlanError::Provider {
                timed_out: true, ..
            } => true,
            PlanError::Provider {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            PlanError::Provider {
                status: None,
                detail,
                ..
            } => detail.starts_with("transport:"),
            _ => false,
        }
    }
}

/// Truncates on a char boundary.
pub fn snippet(raw: &str) -> String {
    match raw.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Translate,
    BuildPrompt,
    Generate,
    Parse,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Translate => "translate",
            Stage::BuildPrompt => "build_prompt",
            Stage::Generate => "generate",
            Stage::Parse => "parse",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First failure of the pipeline, tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("workout plan generation failed during {stage}: {source}")]
pub struct GenerationError {
    pub stage: Stage,
    #[source]
    pub source: PlanError,
}

impl GenerationError {
    pub fn at(stage: Stage) -> impl FnOnce(PlanError) -> Self {
        move |source| GenerationError { stage, source }
    }
}
