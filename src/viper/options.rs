use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::viper::ScoreError;

/// Per-gene transform applied across cells before enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMethod {
    Scale,
    Rank,
    Mad,
    None,
}

impl SignatureMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureMethod::Scale => "scale",
            SignatureMethod::Rank => "rank",
            SignatureMethod::Mad => "mad",
            SignatureMethod::None => "none",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scale" => Ok(SignatureMethod::Scale),
            "rank" => Ok(SignatureMethod::Rank),
            "mad" => Ok(SignatureMethod::Mad),
            "none" => Ok(SignatureMethod::None),
            _ => Err(ScoreError::InvalidOption {
                key: "method".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Options recognized by the scorer. The expression matrix and the
/// regulon are never part of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreOptions {
    pub method: SignatureMethod,
    pub minsize: usize,
    pub eset_filter: bool,
    pub cores: usize,
    pub verbose: bool,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            method: SignatureMethod::Scale,
            minsize: 4,
            eset_filter: false,
            cores: 1,
            verbose: false,
        }
    }
}

const STRUCTURAL_KEYS: &[&str] = &["eset", "expression", "regulon"];

impl ScoreOptions {
    pub fn validate(&self) -> Result<(), ScoreError> {
        if self.minsize == 0 {
            return Err(ScoreError::InvalidOption {
                key: "minsize".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cores == 0 {
            return Err(ScoreError::InvalidOption {
                key: "cores".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Applies one `key=value` pass-through option.
    pub fn apply_pair(&mut self, key: &str, value: &str) -> Result<(), ScoreError> {
        let norm = key.trim().to_ascii_lowercase();
        if STRUCTURAL_KEYS.contains(&norm.as_str()) {
            return Err(ScoreError::StructuralOption(key.to_string()));
        }
        let invalid = || ScoreError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        };
        match norm.as_str() {
            "method" => self.method = value.parse()?,
            "minsize" => self.minsize = value.trim().parse().map_err(|_| invalid())?,
            "eset.filter" | "eset_filter" => {
                self.eset_filter = parse_flag(value).ok_or_else(invalid)?
            }
            "cores" => self.cores = value.trim().parse().map_err(|_| invalid())?,
            "verbose" => self.verbose = parse_flag(value).ok_or_else(invalid)?,
            _ => return Err(ScoreError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Parses `key=value` strings on top of the current values.
    pub fn with_pairs<'a, I>(mut self, pairs: I) -> Result<Self, ScoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ScoreError::InvalidOption {
                    key: pair.to_string(),
                    value: String::new(),
                })?;
            self.apply_pair(key, value)?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Allowance for the data shipped to worker threads; replaces a
/// process-wide setting with an explicit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParallelConfig {
    pub max_globals_bytes: usize,
}

impl ParallelConfig {
    pub fn from_megabytes(mb: usize) -> Self {
        Self {
            max_globals_bytes: mb.saturating_mul(1024 * 1024),
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::from_megabytes(8000)
    }
}
