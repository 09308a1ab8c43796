use std::fmt;

use mint::Vector3;

use crate::{Interaction, ProbeError};

/// The owner ID the host uses for creatures that don't belong to anyone.
pub const OWNER_SENTINEL: i32 = -1;

/// The host's stable identifier for a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The local player's represented entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actor {
    /// The player's network view ID, which is what pet owner IDs refer to.
    /// `None` if the host couldn't resolve it.
    pub id: Option<i32>,

    /// Where the player is standing, if known.
    pub position: Option<Vector3<f32>>,
}

/// A handle to a single entity in the host world which might be a pet.
///
/// Every attribute read can fail independently, since the host may not expose
/// the member at all in the running game version.
pub trait Candidate {
    /// The entity's stable identifier.
    fn id(&self) -> CandidateId;

    /// The entity's object name.
    fn name(&self) -> Result<String, ProbeError>;

    /// The name the game shows for this entity, which may differ from its
    /// object name.
    fn display_name(&self) -> Result<String, ProbeError>;

    /// The raw owner ID, which is [OWNER_SENTINEL] if the entity has no owner.
    fn owner_id(&self) -> Result<i32, ProbeError>;

    /// Returns whether the host considers this entity to carry `tag`.
    fn has_tag(&self, tag: &str) -> Result<bool, ProbeError>;

    /// Returns whether the entity already carries an interaction with the
    /// given label.
    fn has_interaction(&self, label: &str) -> Result<bool, ProbeError>;

    /// The entity's world position, if known.
    ///
    /// By default, positions are unknown.
    fn position(&self) -> Option<Vector3<f32>> {
        None
    }
}

/// The host game's world state. We try to keep this minimal: it only needs to
/// list candidates, say who the player is, and attach interactions.
pub trait World {
    /// The handle type for this world's entities.
    type Candidate: Candidate;

    /// The iterator returned by [World::candidates].
    type Candidates: Iterator<Item = Self::Candidate>;

    /// Returns every entity that could currently be a pet.
    ///
    /// Returns [ProbeError::ProviderUnavailable] when there's no active
    /// session to enumerate.
    fn candidates(&self) -> Result<Self::Candidates, ProbeError>;

    /// Returns the local player, or `None` if they haven't spawned yet.
    fn primary_actor(&self) -> Option<Actor>;

    /// Attaches `interaction` to `candidate`.
    fn attach(&self, candidate: &Self::Candidate, interaction: Interaction)
    -> Result<(), ProbeError>;
}
