use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;
use ustr::Ustr;

use crate::CandidateId;

/// How an interaction may be reused after it's been triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum RepeatType {
    /// The interaction can only be used once.
    Once = 0,

    /// A single cooldown is shared by everyone who uses the interaction.
    GlobalCooldown = 1,

    /// Each actor who uses the interaction gets their own cooldown.
    OwnerCooldown = 2,
}

/// The kind of prompt the host shows for an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum InteractType {
    /// A one-shot action.
    Action = 0,

    /// A conversation.
    Dialogue = 1,
}

/// The fixed parameters of the interaction attached to every pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionSettings {
    /// The prompt text. This also identifies our interaction on an entity, so
    /// changing it between runs means old interactions won't be recognized.
    pub label: Ustr,

    /// How close, in world units, an actor must be to use the interaction.
    pub interact_distance: f32,

    /// How the interaction may be reused.
    pub interactivity: RepeatType,

    /// The cooldown in seconds between uses.
    pub cooldown: f32,

    /// Whether only the pet's owner may use the interaction.
    pub owner_only: bool,

    /// The kind of prompt to show.
    pub act: InteractType,
}

impl InteractionSettings {
    /// Returns [Self::cooldown] as a [Duration]. A cooldown too long to
    /// represent never expires.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f32(self.cooldown.max(0.)).unwrap_or(Duration::MAX)
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            label: Ustr::from("Pet Inkling"),
            interact_distance: 5.,
            interactivity: RepeatType::OwnerCooldown,
            cooldown: 3.,
            owner_only: true,
            act: InteractType::Action,
        }
    }
}

/// A single successful use of an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Interacted {
    /// The entity that was interacted with.
    pub target: CandidateId,

    /// The entity's name at the time the interaction was attached.
    pub target_name: String,

    /// The actor who used the interaction.
    pub actor: i32,

    /// The host time of the interaction.
    pub at: Duration,
}

/// A callback fired every time an interaction is used.
pub type OnInteract = Arc<dyn Fn(&Interacted) + Send + Sync>;

/// The callback used when none is provided.
fn log_petting(event: &Interacted) {
    info!("{} has been pet!", event.target_name);
}

/// An interaction bound to a specific entity.
#[derive(Clone)]
pub struct Interaction {
    /// The interaction's parameters.
    pub settings: InteractionSettings,

    /// The entity this is attached to.
    pub target: CandidateId,

    /// The entity's name, used for diagnostics.
    pub target_name: String,

    /// The only actor allowed to use this if [InteractionSettings::owner_only]
    /// is set. If this is `None`, nobody could be identified as the owner and
    /// the restriction isn't enforced.
    pub owner: Option<i32>,

    on_interact: OnInteract,
}

impl Interaction {
    /// Creates an interaction which logs each time it's used.
    pub fn new(
        settings: InteractionSettings,
        target: CandidateId,
        target_name: impl Into<String>,
        owner: Option<i32>,
    ) -> Self {
        Self {
            settings,
            target,
            target_name: target_name.into(),
            owner,
            on_interact: Arc::new(log_petting),
        }
    }

    /// Replaces the callback fired when this interaction is used.
    pub fn with_callback(mut self, on_interact: OnInteract) -> Self {
        self.on_interact = on_interact;
        self
    }

    /// Fires the interaction callback. A panicking callback is logged and
    /// otherwise ignored so it can't take down the host's frame.
    pub fn fire(&self, actor: i32, at: Duration) {
        let event = Interacted {
            target: self.target,
            target_name: self.target_name.clone(),
            actor,
            at,
        };
        if panic::catch_unwind(AssertUnwindSafe(|| (self.on_interact)(&event))).is_err() {
            warn!("Interaction callback for {} panicked", self.target_name);
        }
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("settings", &self.settings)
            .field("target", &self.target)
            .field("target_name", &self.target_name)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Why an actor's attempt to use an interaction was turned down.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Refusal {
    #[error("actor is {distance:.2} away, but must be within {max:.2}")]
    TooFar { distance: f32, max: f32 },

    #[error("only the owner ({owner}) may use this")]
    NotOwner { owner: i32 },

    #[error("still cooling down for {remaining:?}")]
    CoolingDown { remaining: Duration },

    #[error("this can only be used once")]
    Spent,
}

/// The live state of an attached interaction: who has used it and when.
#[derive(Debug)]
pub struct Behavior {
    interaction: Interaction,

    /// The last use by anyone.
    last_use: Option<Duration>,

    /// The last use by each actor. Only tracked for
    /// [RepeatType::OwnerCooldown].
    last_use_by: HashMap<i32, Duration>,
}

impl Behavior {
    pub fn new(interaction: Interaction) -> Self {
        Self {
            interaction,
            last_use: None,
            last_use_by: HashMap::new(),
        }
    }

    /// The interaction this tracks.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Handles `actor` selecting this interaction from `distance` away at host
    /// time `now`. Fires the callback if the selection is allowed.
    pub fn select(&mut self, actor: i32, distance: f32, now: Duration) -> Result<(), Refusal> {
        let settings = &self.interaction.settings;
        // NaN distances compare false both ways, so they're refused too.
        if !(distance <= settings.interact_distance) {
            return Err(Refusal::TooFar {
                distance,
                max: settings.interact_distance,
            });
        }

        if settings.owner_only
            && let Some(owner) = self.interaction.owner
            && owner != actor
        {
            return Err(Refusal::NotOwner { owner });
        }

        let last = match settings.interactivity {
            RepeatType::Once if self.last_use.is_some() => return Err(Refusal::Spent),
            RepeatType::Once => None,
            RepeatType::GlobalCooldown => self.last_use,
            RepeatType::OwnerCooldown => self.last_use_by.get(&actor).copied(),
        };
        if let Some(last) = last {
            let ready = last.saturating_add(settings.cooldown());
            if now < ready {
                return Err(Refusal::CoolingDown {
                    remaining: ready - now,
                });
            }
        }

        self.last_use = Some(now);
        if settings.interactivity == RepeatType::OwnerCooldown {
            self.last_use_by.insert(actor, now);
        }
        self.interaction.fire(actor, now);
        Ok(())
    }
}
