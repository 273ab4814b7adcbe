//! TF → target interaction tables and the regulons built from them.
//!
//! A regulon maps every transcription factor to its targets, the signed
//! mode of regulation (`mor`) of each target and a likelihood weight kept
//! in the same order as the targets.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::input::InputError;

pub mod builder;
pub mod mapping;
pub mod table;

pub use builder::{build_regulon, filter_by_confidence};
pub use table::read_interactions;

#[derive(Debug, Error)]
pub enum RegulonError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interaction table is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("interaction table line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("invalid confidence filter '{0}' (expected tiers A-E, e.g. A,B,C)")]
    InvalidFilter(String),
}

/// Curation tier of an interaction, A being the best supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    A,
    B,
    C,
    D,
    E,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::A => "A",
            Confidence::B => "B",
            Confidence::C => "C",
            Confidence::D => "D",
            Confidence::E => "E",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Confidence::A),
            "B" => Ok(Confidence::B),
            "C" => Ok(Confidence::C),
            "D" => Ok(Confidence::D),
            "E" => Ok(Confidence::E),
            other => Err(format!("unknown confidence tier '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidenceFilter {
    tiers: BTreeSet<Confidence>,
}

impl ConfidenceFilter {
    pub fn new(tiers: impl IntoIterator<Item = Confidence>) -> Self {
        Self {
            tiers: tiers.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new([
            Confidence::A,
            Confidence::B,
            Confidence::C,
            Confidence::D,
            Confidence::E,
        ])
    }

    /// Rows without a curated tier are never excluded.
    pub fn allows(&self, confidence: Option<Confidence>) -> bool {
        match confidence {
            Some(c) => self.tiers.contains(&c),
            None => true,
        }
    }

    pub fn is_subset(&self, other: &ConfidenceFilter) -> bool {
        self.tiers.is_subset(&other.tiers)
    }
}

impl Default for ConfidenceFilter {
    fn default() -> Self {
        Self::new([Confidence::A, Confidence::B, Confidence::C])
    }
}

impl FromStr for ConfidenceFilter {
    type Err = RegulonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = BTreeSet::new();
        for token in s.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let tier = token
                .parse::<Confidence>()
                .map_err(|_| RegulonError::InvalidFilter(s.to_string()))?;
            tiers.insert(tier);
        }
        if tiers.is_empty() {
            return Err(RegulonError::InvalidFilter(s.to_string()));
        }
        Ok(Self { tiers })
    }
}

impl fmt::Display for ConfidenceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.tiers.iter().map(|c| c.as_str()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// One row of the interaction table.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub tf: String,
    pub target: String,
    pub mor: f32,
    pub confidence: Option<Confidence>,
    pub likelihood: f32,
}

/// Targets of a single TF. `mor` and `likelihood` are positionally aligned
/// with `targets`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TfProfile {
    targets: Vec<String>,
    mor: Vec<f32>,
    likelihood: Vec<f32>,
    position: HashMap<String, usize>,
}

impl TfProfile {
    /// Adds a target, or overwrites `mor` and `likelihood` in place when the
    /// target is already present. Returns `true` on overwrite.
    pub fn upsert(&mut self, target: &str, mor: f32, likelihood: f32) -> bool {
        if let Some(&pos) = self.position.get(target) {
            self.mor[pos] = mor;
            self.likelihood[pos] = likelihood;
            return true;
        }
        self.position.insert(target.to_string(), self.targets.len());
        self.targets.push(target.to_string());
        self.mor.push(mor);
        self.likelihood.push(likelihood);
        false
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn mor(&self) -> &[f32] {
        &self.mor
    }

    pub fn likelihood(&self) -> &[f32] {
        &self.likelihood
    }

    pub fn mor_of(&self, target: &str) -> Option<f32> {
        self.position.get(target).map(|&pos| self.mor[pos])
    }

    /// target → mode of regulation, in target order.
    pub fn tfmode(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.targets
            .iter()
            .map(String::as_str)
            .zip(self.mor.iter().copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Regulon {
    profiles: BTreeMap<String, TfProfile>,
}

impl Regulon {
    pub fn from_profiles(profiles: BTreeMap<String, TfProfile>) -> Self {
        Self { profiles }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, tf: &str) -> Option<&TfProfile> {
        self.profiles.get(tf)
    }

    pub fn tf_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TfProfile)> + '_ {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Union of all target symbols.
    pub fn target_universe(&self) -> BTreeSet<&str> {
        self.profiles
            .values()
            .flat_map(|p| p.targets.iter().map(String::as_str))
            .collect()
    }

    pub fn n_interactions(&self) -> usize {
        self.profiles.values().map(TfProfile::len).sum()
    }
}
