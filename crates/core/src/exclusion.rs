//! Windows the engine must leave alone.
//!
//! Exclusions are regex patterns on the window class and, optionally, the
//! title. Patterns are anchored and case-insensitive, so a literal class
//! name such as `Progman` only matches that exact class.

use crate::platform::WindowIdentity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One user exclusion entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    /// Pattern for the window class name.
    pub class: String,
    /// Pattern for the window title; `None` matches any title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Exclusion {
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug)]
struct CompiledExclusion {
    class: Regex,
    title: Option<Regex>,
}

impl CompiledExclusion {
    fn matches(&self, identity: &WindowIdentity) -> bool {
        self.class.is_match(&identity.class)
            && self
                .title
                .as_ref()
                .map_or(true, |title| title.is_match(&identity.title))
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i)^(?:{})$", pattern))
}

/// Compiled exclusion list.
#[derive(Debug, Default)]
pub struct ExclusionFilter {
    compiled: Vec<CompiledExclusion>,
}

impl ExclusionFilter {
    /// Compile `exclusions`. Entries with an invalid pattern are logged and
    /// skipped.
    pub fn new(exclusions: &[Exclusion]) -> Self {
        let mut filter = Self::default();
        for exclusion in exclusions {
            filter.push(exclusion);
        }
        filter
    }

    /// Add one entry, returning whether it compiled.
    pub fn push(&mut self, exclusion: &Exclusion) -> bool {
        let class = match compile(&exclusion.class) {
            Ok(re) => re,
            Err(_) => {
                warn!("Invalid regex in exclusion class: {}", exclusion.class);
                return false;
            }
        };
        let title = match exclusion.title.as_deref().map(compile) {
            None => None,
            Some(Ok(re)) => Some(re),
            Some(Err(_)) => {
                warn!(
                    "Invalid regex in exclusion title: {}",
                    exclusion.title.as_deref().unwrap_or_default()
                );
                return false;
            }
        };
        self.compiled.push(CompiledExclusion { class, title });
        true
    }

    pub fn is_excluded(&self, identity: &WindowIdentity) -> bool {
        self.compiled.iter().any(|c| c.matches(identity))
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Turns windows picked in detect mode into exclusion entries.
#[derive(Debug, Default)]
pub struct ExclusionDetector {
    known: Vec<Exclusion>,
    pending: Vec<Exclusion>,
}

impl ExclusionDetector {
    /// `known` is the configured list; windows already on it are not
    /// recorded again.
    pub fn new(known: &[Exclusion]) -> Self {
        Self {
            known: known.to_vec(),
            pending: Vec::new(),
        }
    }

    /// Record `identity` as a literal exclusion. Returns the new entry, or
    /// `None` if it is already known.
    pub fn record(&mut self, identity: &WindowIdentity) -> Option<Exclusion> {
        let title = (!identity.title.is_empty()).then(|| regex::escape(&identity.title));
        let exclusion = Exclusion {
            class: regex::escape(&identity.class),
            title,
        };
        if self.known.contains(&exclusion) {
            return None;
        }
        info!(
            "Recorded exclusion for class {:?} title {:?}",
            identity.class,
            identity.title
        );
        self.known.push(exclusion.clone());
        self.pending.push(exclusion.clone());
        Some(exclusion)
    }

    /// Replace the known list, keeping entries not yet taken.
    pub fn set_known(&mut self, known: &[Exclusion]) {
        self.known = known.to_vec();
        for pending in &self.pending {
            if !self.known.contains(pending) {
                self.known.push(pending.clone());
            }
        }
    }

    /// Entries recorded since the last call.
    pub fn take_pending(&mut self) -> Vec<Exclusion> {
        std::mem::take(&mut self.pending)
    }

    pub fn known(&self) -> &[Exclusion] {
        &self.known
    }
}
