use std::time::Duration;

use log::*;

use crate::{
    Actor, Candidate, CandidateId, Classification, Interaction, InteractionSettings, OnInteract,
    World,
};

/// What happened when a pet was augmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The interaction was attached.
    Added,

    /// The pet already had the interaction.
    AlreadyPresent,

    /// The interaction couldn't be attached.
    Failed,
}

/// A record of a single augmentation attempt. These are never modified once
/// they're created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentationRecord {
    pub candidate_id: CandidateId,

    /// The host time of the scan that produced this record.
    pub at: Duration,

    pub outcome: Outcome,
}

/// Attaches the petting interaction to pets.
#[derive(Clone)]
pub struct Augmenter {
    settings: InteractionSettings,

    /// The callback for every interaction this attaches. If `None`, each
    /// interaction logs when it's used.
    on_interact: Option<OnInteract>,
}

impl Augmenter {
    pub fn new(settings: InteractionSettings) -> Self {
        Self {
            settings,
            on_interact: None,
        }
    }

    /// Uses `on_interact` for every interaction this attaches from now on.
    pub fn with_callback(mut self, on_interact: OnInteract) -> Self {
        self.on_interact = Some(on_interact);
        self
    }

    /// The parameters of the interactions this attaches.
    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    /// Attaches the petting interaction to `candidate` unless it already has
    /// one. Returns `None` if `classification` says it isn't a pet.
    ///
    /// Whether the interaction already exists is always read from the
    /// candidate itself, so a pet that's been recreated by the host gets a new
    /// interaction.
    pub fn augment<W: World>(
        &self,
        world: &W,
        candidate: &W::Candidate,
        classification: &Classification,
        actor: &Actor,
        at: Duration,
    ) -> Option<AugmentationRecord> {
        if !classification.is_member {
            return None;
        }

        let id = candidate.id();
        let record = |outcome| AugmentationRecord {
            candidate_id: id,
            at,
            outcome,
        };

        match candidate.has_interaction(&self.settings.label) {
            Ok(true) => return Some(record(Outcome::AlreadyPresent)),
            Ok(false) => {}
            Err(err) => {
                error!("Error checking existing interaction for {}: {}", id, err);
                return Some(record(Outcome::Failed));
            }
        }

        let name = candidate.name().unwrap_or_else(|_| id.to_string());
        let owner = classification.owner_id.or(actor.id);
        debug!(
            "Found pet {} ({}, {:?}, owner: {:?})",
            name, id, classification.reason, owner
        );

        let mut interaction = Interaction::new(self.settings.clone(), id, name, owner);
        if let Some(on_interact) = &self.on_interact {
            interaction = interaction.with_callback(on_interact.clone());
        }

        match world.attach(candidate, interaction) {
            Ok(()) => {
                debug!("Added pet interaction to {} owned by player {:?}", id, owner);
                Some(record(Outcome::Added))
            }
            Err(err) => {
                error!("Error adding pet interaction to {}: {}", id, err);
                Some(record(Outcome::Failed))
            }
        }
    }
}
