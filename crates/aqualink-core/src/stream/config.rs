use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::error::UnknownDialect;
use crate::protocol::layout;
use crate::protocol::parser::Dialect;
use crate::sensor::{SensorKind, SensorSpec, SpecTable};

/// Highest precision accepted in limit overrides.
pub const MAX_PRECISION: u32 = 6;

/// Errors returned while loading or validating decoder configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Dialect(#[from] UnknownDialect),
    #[error("terminator must not be empty")]
    EmptyTerminator,
    #[error("unsupported escape sequence '{sequence}' in terminator")]
    InvalidEscape { sequence: String },
    #[error("max_frame_len must be greater than zero")]
    InvalidMaxFrameLen,
    #[error("invalid limits for {kind}: min {min}, max {max}")]
    InvalidLimits { kind: SensorKind, min: f64, max: f64 },
    #[error("invalid precision for {kind}: {precision} (max {max})")]
    InvalidPrecision {
        kind: SensorKind,
        precision: u32,
        max: u32,
    },
}

/// Per-kind replacement for the default bounds or precision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
}

/// Construction-time options of a `StreamDecoder`.
///
/// # Examples
/// ```
/// use aqualink_core::{DecoderConfig, Dialect};
///
/// let config = DecoderConfig::from_json(r#"{"dialect": "keyvalue", "terminator": null}"#)?;
/// assert_eq!(config.dialect, Dialect::KeyValue);
/// assert_eq!(config.terminator(), None);
/// assert_eq!(config.max_frame_len, 256);
/// # Ok::<(), aqualink_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    /// Field layout within a frame.
    #[serde(default)]
    pub dialect: Dialect,
    /// Frame terminator; `None` treats every chunk as one frame.
    #[serde(default = "default_terminator")]
    pub terminator: Option<String>,
    /// Longest accepted frame in bytes, terminator excluded.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Bound/precision overrides keyed by sensor kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<SensorKind, SpecOverride>,
}

fn default_terminator() -> Option<String> {
    Some(layout::DEFAULT_TERMINATOR.to_string())
}

fn default_max_frame_len() -> usize {
    layout::DEFAULT_MAX_FRAME_LEN
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            terminator: default_terminator(),
            max_frame_len: default_max_frame_len(),
            limits: BTreeMap::new(),
        }
    }
}

impl DecoderConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn with_terminator(mut self, terminator: Option<&str>) -> Self {
        self.terminator = terminator.map(str::to_string);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn terminator(&self) -> Option<&str> {
        self.terminator.as_deref()
    }

    /// Check terminator, frame length and limit overrides.
    ///
    /// # Errors
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminator.as_deref() == Some("") {
            return Err(ConfigError::EmptyTerminator);
        }
        if self.max_frame_len == 0 {
            return Err(ConfigError::InvalidMaxFrameLen);
        }
        self.spec_table().map(|_| ())
    }

    /// Default specs with the configured overrides applied.
    pub fn spec_table(&self) -> Result<SpecTable, ConfigError> {
        let mut table = SpecTable::default();
        for (kind, limits) in &self.limits {
            let base = table.get(*kind);
            let spec = SensorSpec::new(
                limits.min.unwrap_or(base.min),
                limits.max.unwrap_or(base.max),
                limits.precision.unwrap_or(base.precision),
                base.unit,
            );
            if !spec.min.is_finite() || !spec.max.is_finite() || spec.min > spec.max {
                return Err(ConfigError::InvalidLimits {
                    kind: *kind,
                    min: spec.min,
                    max: spec.max,
                });
            }
            if spec.precision > MAX_PRECISION {
                return Err(ConfigError::InvalidPrecision {
                    kind: *kind,
                    precision: spec.precision,
                    max: MAX_PRECISION,
                });
            }
            table.set(*kind, spec);
        }
        Ok(table)
    }
}

/// Resolve `\n`, `\r`, `\t` and `\\` escapes in a terminator given as text.
///
/// # Examples
/// ```
/// use aqualink_core::parse_terminator;
///
/// assert_eq!(parse_terminator(r"\r\n")?, "\r\n");
/// assert_eq!(parse_terminator(";")?, ";");
/// # Ok::<(), aqualink_core::ConfigError>(())
/// ```
///
/// # Errors
/// Returns `ConfigError::EmptyTerminator` for empty input and
/// `ConfigError::InvalidEscape` for unknown escapes.
pub fn parse_terminator(text: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            other => {
                let mut sequence = String::from('\\');
                sequence.extend(other);
                return Err(ConfigError::InvalidEscape { sequence });
            }
        }
    }
    if out.is_empty() {
        return Err(ConfigError::EmptyTerminator);
    }
    Ok(out)
}
