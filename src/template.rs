//! The constraint-model template sent along with every instance.
//!
//! The template is a versioned artifact: it is loaded as-is and never
//! edited per call.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::TemplateError;

const BUNDLED_TEMPLATE: &str = include_str!("../resources/tsp.mzn");

/// Where to read the template from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// The template compiled into this crate.
    #[default]
    Bundled,
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTemplate {
    /// Human-readable origin, used in logs and errors.
    pub name: String,
    pub text: String,
}

impl ModelTemplate {
    pub fn bundled() -> Self {
        Self {
            name: "bundled:tsp.mzn".to_string(),
            text: BUNDLED_TEMPLATE.to_string(),
        }
    }

    /// Loads the template. URLs are fetched with `timeout`.
    pub fn load(source: &TemplateSource, timeout: Duration) -> Result<Self, TemplateError> {
        let template = match source {
            TemplateSource::Bundled => Self::bundled(),
            TemplateSource::File(path) => {
                let text = fs::read_to_string(path).map_err(|source| TemplateError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self {
                    name: path.display().to_string(),
                    text,
                }
            }
            TemplateSource::Url(url) => Self {
                name: url.clone(),
                text: fetch(url, timeout)?,
            },
        };

        if template.text.trim().is_empty() {
            return Err(TemplateError::Empty(template.name));
        }

        info!(template = %template.name, version = ?template.version(), "loaded model template");
        Ok(template)
    }

    /// Value of the `template-version:` marker comment, if present.
    pub fn version(&self) -> Option<&str> {
        self.text.lines().find_map(|line| {
            line.trim_start_matches('%')
                .trim()
                .strip_prefix("template-version:")
                .map(str::trim)
        })
    }
}

fn fetch(url: &str, timeout: Duration) -> Result<String, TemplateError> {
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let text = client.get(url).send()?.error_for_status()?.text()?;
    Ok(text)
}
