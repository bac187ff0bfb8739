//! Data carried between the suggestion service and the overlay controller.

use serde::{Deserialize, Serialize};

/// Sentence used whenever a reply carries no usable suggestion.
pub const GENERIC_FALLBACK: &str = "Please provide more specific details for better code generation.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementRequest {
    pub raw_prompt: String,
}

impl RefinementRequest {
    pub fn new(raw_prompt: impl Into<String>) -> Self {
        Self {
            raw_prompt: raw_prompt.into(),
        }
    }
}

/// Canonical shape every provider reply is normalized into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub suggestion: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl RefinementResult {
    pub fn new(suggestion: impl Into<String>) -> Self {
        Self {
            suggestion: suggestion.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// The result used when the reply contained nothing usable.
    pub fn generic_fallback() -> Self {
        Self::new(GENERIC_FALLBACK)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsResult {
    #[serde(default)]
    pub options: Vec<String>,
}

/// A configured phrase that can be swapped for a more specific alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovableWordEntry {
    pub match_text: String,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_asset_url: Option<String>,
}

impl Alternative {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            preview_asset_url: None,
        }
    }
}

/// Word entries shipped with the extension.
pub fn default_word_entries() -> Vec<ImprovableWordEntry> {
    vec![
        ImprovableWordEntry {
            match_text: "flow infinitely".to_string(),
            alternatives: vec![
                Alternative {
                    text: "scroll continuously in a seamless loop".to_string(),
                    preview_asset_url: Some("assets/previews/marquee-loop.gif".to_string()),
                },
                Alternative {
                    text: "move from right to left at a constant speed, repeating without gaps"
                        .to_string(),
                    preview_asset_url: Some("assets/previews/marquee-linear.gif".to_string()),
                },
                Alternative::new("drift slowly with a gentle fade at both edges"),
            ],
        },
        ImprovableWordEntry {
            match_text: "pop up".to_string(),
            alternatives: vec![
                Alternative::new("scale in from 0.9 to 1.0 with a 0.2s ease-out"),
                Alternative::new("slide up 16px while fading in"),
            ],
        },
        ImprovableWordEntry {
            match_text: "look nice".to_string(),
            alternatives: vec![
                Alternative::new("use consistent 8px spacing and rounded corners"),
                Alternative::new("follow a clean, minimal style with a single accent color"),
            ],
        },
    ]
}
