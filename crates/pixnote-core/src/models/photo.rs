//! Photo model

use serde::{Deserialize, Serialize};

use super::record::Payload;
use crate::error::{Error, Result};

const SUMMARY_LABEL_CONFIDENCE: f32 = 0.5;

/// A label produced by image labeling, with the detector's confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLabel {
    pub text: String,
    pub confidence: f32,
}

impl ImageLabel {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A captured or picked image plus whatever detection produced for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Object-storage key or URL of the image bytes
    pub media_ref: String,
    /// User-facing title
    #[serde(default)]
    pub title: String,
    /// Output of text recognition
    #[serde(default)]
    pub recognized_text: Option<String>,
    /// Output of image labeling
    #[serde(default)]
    pub labels: Vec<ImageLabel>,
    /// Output of image description
    #[serde(default)]
    pub description: Option<String>,
}

impl Photo {
    pub fn new(media_ref: impl Into<String>) -> Self {
        Self {
            media_ref: media_ref.into(),
            title: String::new(),
            recognized_text: None,
            labels: Vec::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_recognized_text(mut self, text: impl Into<String>) -> Self {
        self.recognized_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: Vec<ImageLabel>) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Labels at or above `min_confidence`, most confident first.
    #[must_use]
    pub fn confident_labels(&self, min_confidence: f32) -> Vec<&ImageLabel> {
        let mut labels = self
            .labels
            .iter()
            .filter(|label| label.confidence >= min_confidence)
            .collect::<Vec<_>>();
        labels.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        labels
    }
}

impl Payload for Photo {
    const FAMILY: &'static str = "photos";

    fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("title", self.title.clone())];
        if let Some(text) = &self.recognized_text {
            fields.push(("recognized_text", text.clone()));
        }
        if let Some(description) = &self.description {
            fields.push(("description", description.clone()));
        }
        if !self.labels.is_empty() {
            let joined = self
                .labels
                .iter()
                .map(|label| label.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            fields.push(("labels", joined));
        }
        fields
    }

    /// Title or detected text, else confident labels, else the media reference.
    fn summary(&self) -> String {
        let text = self
            .text_fields()
            .into_iter()
            .filter(|(name, _)| *name != "labels")
            .find_map(|(_, text)| {
                text.lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
            });
        if let Some(text) = text {
            return text;
        }
        let labels = self
            .confident_labels(SUMMARY_LABEL_CONFIDENCE)
            .into_iter()
            .map(|label| label.text.as_str())
            .collect::<Vec<_>>();
        if labels.is_empty() {
            self.media_ref.clone()
        } else {
            labels.join(", ")
        }
    }

    fn validate(&self) -> Result<()> {
        if self.media_ref.trim().is_empty() {
            return Err(Error::InvalidInput("photo media reference cannot be empty".into()));
        }
        Ok(())
    }
}
