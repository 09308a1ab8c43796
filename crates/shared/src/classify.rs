use anyhow::Result;
use log::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{Candidate, Config, OWNER_SENTINEL};

bitflags::bitflags! {
    /// The set of detectors the classifier is allowed to use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Detectors: u8 {
        /// The host's pet owner field.
        const Owner = 0b001;

        /// A keyword in the entity's name.
        const Name = 0b010;

        /// The host's tags.
        const Tag = 0b100;
    }
}

impl Default for Detectors {
    fn default() -> Self {
        Detectors::all()
    }
}

/// Which detector decided a candidate's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The candidate has a real owner ID.
    PrimaryAttribute,

    /// The candidate's name contains the pet keyword.
    NameHeuristic,

    /// The candidate carries one of the pet tags.
    TagHeuristic,

    /// No detector matched.
    None,
}

/// The result of classifying a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Whether the candidate is a pet.
    pub is_member: bool,

    /// The candidate's owner, if the owner field identified it.
    pub owner_id: Option<i32>,

    /// Which detector matched.
    pub reason: Reason,
}

impl Classification {
    /// The classification of a candidate that isn't a pet.
    pub const NONE: Classification = Classification {
        is_member: false,
        owner_id: None,
        reason: Reason::None,
    };

    fn owned_by(owner_id: i32) -> Self {
        Self {
            is_member: true,
            owner_id: Some(owner_id),
            reason: Reason::PrimaryAttribute,
        }
    }

    fn heuristic(reason: Reason) -> Self {
        Self {
            is_member: true,
            owner_id: None,
            reason,
        }
    }
}

/// Decides whether candidates are pets.
///
/// Classification only looks at the candidate's attributes as they are right
/// now, so the same candidate always classifies the same way until the host
/// changes it.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// A case-insensitive matcher for the pet keyword, or `None` if the
    /// keyword is empty.
    keyword: Option<Regex>,

    target_tags: Vec<Ustr>,

    detectors: Detectors,
}

impl Classifier {
    pub fn new(
        keyword: &str,
        target_tags: impl IntoIterator<Item = Ustr>,
        detectors: Detectors,
    ) -> Result<Self> {
        let keyword = if keyword.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&regex::escape(keyword))
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(Self {
            keyword,
            target_tags: target_tags.into_iter().collect(),
            detectors,
        })
    }

    /// Creates a classifier from the user's configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.keyword(),
            config.target_tags().iter().copied(),
            config.detectors(),
        )
    }

    /// Classifies `candidate`. The first detector that matches wins, and the
    /// owner field always takes priority over the heuristics.
    pub fn classify(&self, candidate: &impl Candidate) -> Classification {
        if let Some(owner_id) = self.owner(candidate) {
            Classification::owned_by(owner_id)
        } else if self.name_matches(candidate) {
            Classification::heuristic(Reason::NameHeuristic)
        } else if self.tag_matches(candidate) {
            Classification::heuristic(Reason::TagHeuristic)
        } else {
            Classification::NONE
        }
    }

    /// Returns the candidate's owner, if it has one and the owner detector is
    /// enabled.
    fn owner(&self, candidate: &impl Candidate) -> Option<i32> {
        if !self.detectors.contains(Detectors::Owner) {
            return None;
        }

        match candidate.owner_id() {
            Ok(OWNER_SENTINEL) => None,
            Ok(id) => Some(id),
            Err(err) => {
                debug!("  {}: {}", candidate.id(), err);
                None
            }
        }
    }

    fn name_matches(&self, candidate: &impl Candidate) -> bool {
        let Some(keyword) = &self.keyword else {
            return false;
        };
        if !self.detectors.contains(Detectors::Name) {
            return false;
        }

        [candidate.name(), candidate.display_name()]
            .into_iter()
            .any(|name| match name {
                Ok(name) => keyword.is_match(&name),
                Err(err) => {
                    debug!("  {}: {}", candidate.id(), err);
                    false
                }
            })
    }

    fn tag_matches(&self, candidate: &impl Candidate) -> bool {
        if !self.detectors.contains(Detectors::Tag) {
            return false;
        }

        self.target_tags
            .iter()
            .any(|tag| match candidate.has_tag(tag) {
                Ok(result) => {
                    trace!("    HasTag({tag}) = {result}");
                    result
                }
                Err(err) => {
                    debug!("  {}: {}", candidate.id(), err);
                    false
                }
            })
    }
}
