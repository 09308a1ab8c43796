use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use std::vec;

use log::*;
use mint::Vector3;
use shared::{
    Actor, Behavior, Candidate, CandidateId, Interaction, OWNER_SENTINEL, ProbeError, Refusal,
    World,
};

/// The host's handle for a single entity. This is stable for as long as the
/// entity exists.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityHandle(pub u64);

/// What the host knows about the local player.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInfo {
    /// The player's network view ID. Only meaningful if `has_view_id` is set.
    pub view_id: i32,
    pub has_view_id: bool,

    /// The player's world position. Only meaningful if `has_position` is set.
    pub position: [f32; 3],
    pub has_position: bool,
}

/// The interaction the host should attach to an entity.
///
/// `label` is only valid for the duration of the call it's passed to.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InteractionDesc {
    /// UTF-8 prompt text. Not NUL-terminated.
    pub label: *const u8,
    pub label_len: usize,
    pub interact_distance: f32,

    /// A [shared::RepeatType] discriminant.
    pub interactivity: u8,
    pub cooldown: f32,
    pub owner_only: bool,

    /// The owner's view ID, or -1 if the owner is unknown.
    pub owner_id: i32,

    /// A [shared::InteractType] discriminant.
    pub act: u8,
}

/// Reads a string attribute into `buf`, returning the string's full length in
/// bytes (which may be more than `capacity`) or -1 on failure.
pub type StringReader =
    unsafe extern "C" fn(entity: EntityHandle, buf: *mut u8, capacity: usize) -> isize;

/// The functions the host makes available to this mod.
///
/// Every function is called on the host's main thread, from within one of the
/// `inkling_pets_*` entry points. Functions that write through an `out`
/// pointer return `false` if they failed, in which case `out` is untouched.
///
/// The optional functions are for members that not every version of the game
/// has. The host passes null for any it couldn't find.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostApi {
    /// Writes up to `capacity` handles for the AI controllers in the loaded
    /// scenes and returns how many there are in total, or -1 if no scene is
    /// active.
    pub find_ai_controls: unsafe extern "C" fn(out: *mut EntityHandle, capacity: usize) -> isize,

    /// Describes the local player. Returns `false` if they haven't spawned.
    pub local_player: unsafe extern "C" fn(out: *mut PlayerInfo) -> bool,

    /// The entity's object name.
    pub object_name: StringReader,

    /// The entity's AI name, as shown in game.
    pub ai_name: StringReader,

    /// Reads the entity's pet owner ID, which is -1 for unowned entities.
    pub pet_owner_id: Option<unsafe extern "C" fn(entity: EntityHandle, out: *mut i32) -> bool>,

    /// Checks whether the entity has a tag.
    pub has_tag: Option<
        unsafe extern "C" fn(
            entity: EntityHandle,
            tag: *const u8,
            tag_len: usize,
            out: *mut bool,
        ) -> bool,
    >,

    /// Reads the entity's world position.
    pub position: unsafe extern "C" fn(entity: EntityHandle, out: *mut [f32; 3]) -> bool,

    /// Checks whether the entity or any of its children has an interaction
    /// with the given label.
    pub find_interaction: unsafe extern "C" fn(
        entity: EntityHandle,
        label: *const u8,
        label_len: usize,
        out: *mut bool,
    ) -> bool,

    /// Attaches an interaction to the entity's first child. Returns `false` if
    /// the host couldn't.
    pub add_interaction:
        unsafe extern "C" fn(entity: EntityHandle, desc: *const InteractionDesc) -> bool,

    /// Returns whether the entity still exists.
    pub is_alive: unsafe extern "C" fn(entity: EntityHandle) -> bool,
}

impl HostApi {
    /// Logs which optional members the host provides.
    pub fn log_capabilities(&self) {
        if self.pet_owner_id.is_some() {
            info!("Successfully found PetOwnerID field");
        } else {
            warn!("PetOwnerID field not found, falling back to name and tag checks");
        }

        if self.has_tag.is_some() {
            info!("Successfully found HasTag method");
        } else {
            warn!("HasTag method not found, matching tags against names instead");
        }
    }

    /// Returns every AI controller handle in the loaded scenes.
    fn find_ai_controls(&self) -> Result<Vec<EntityHandle>, ProbeError> {
        let mut handles = vec![EntityHandle::default(); 64];
        // The population can grow between calls, so retry a few times with a
        // bigger buffer before settling for a partial list.
        let mut attempts = 0;
        loop {
            // Safety: `handles` is valid for `handles.len()` writes.
            let count = unsafe { (self.find_ai_controls)(handles.as_mut_ptr(), handles.len()) };
            let Ok(count) = usize::try_from(count) else {
                return Err(ProbeError::ProviderUnavailable);
            };
            if count <= handles.len() {
                handles.truncate(count);
                return Ok(handles);
            }

            attempts += 1;
            if attempts == 3 {
                warn!("AI population kept changing, scanning {} of {}", handles.len(), count);
                return Ok(handles);
            }
            handles.resize(count, EntityHandle::default());
        }
    }

    fn local_player(&self) -> Option<PlayerInfo> {
        let mut info = PlayerInfo::default();
        // Safety: `info` is a valid place to write a `PlayerInfo`.
        unsafe { (self.local_player)(&mut info) }.then_some(info)
    }

    /// Reads a string attribute of `entity` with `reader`.
    fn read_string(
        &self,
        reader: StringReader,
        entity: EntityHandle,
        attribute: &'static str,
    ) -> Result<String, ProbeError> {
        let mut buf = vec![0u8; 128];
        for _ in 0..2 {
            // Safety: `buf` is valid for `buf.len()` writes.
            let len = unsafe { reader(entity, buf.as_mut_ptr(), buf.len()) };
            let Ok(len) = usize::try_from(len) else {
                return Err(ProbeError::unavailable(attribute, "host couldn't read it"));
            };
            if len <= buf.len() {
                buf.truncate(len);
                return Ok(String::from_utf8_lossy(&buf).into_owned());
            }
            buf.resize(len, 0);
        }
        Err(ProbeError::unavailable(attribute, "host kept changing its length"))
    }
}

/// A single AI controller in the host world.
#[derive(Clone, Copy)]
pub struct HostCandidate {
    api: HostApi,
    handle: EntityHandle,
}

impl HostCandidate {
    /// The tag check used when the host doesn't expose its own: whether the
    /// object or AI name contains the tag.
    fn has_tag_by_name(&self, tag: &str) -> Result<bool, ProbeError> {
        let tag = tag.to_lowercase();
        let names = [self.name(), self.display_name()];
        if names.iter().all(Result::is_err) {
            return Err(ProbeError::unavailable("HasTag", "no names to match against"));
        }

        Ok(names
            .into_iter()
            .flatten()
            .any(|name| name.to_lowercase().contains(&tag)))
    }
}

impl Candidate for HostCandidate {
    fn id(&self) -> CandidateId {
        CandidateId(self.handle.0)
    }

    fn name(&self) -> Result<String, ProbeError> {
        self.api
            .read_string(self.api.object_name, self.handle, "name")
    }

    fn display_name(&self) -> Result<String, ProbeError> {
        self.api.read_string(self.api.ai_name, self.handle, "AIName")
    }

    fn owner_id(&self) -> Result<i32, ProbeError> {
        let Some(pet_owner_id) = self.api.pet_owner_id else {
            return Err(ProbeError::unavailable("PetOwnerID", "not exposed by the host"));
        };

        let mut owner = OWNER_SENTINEL;
        // Safety: `owner` is a valid place to write an `i32`.
        if unsafe { pet_owner_id(self.handle, &mut owner) } {
            Ok(owner)
        } else {
            Err(ProbeError::unavailable("PetOwnerID", "host couldn't read it"))
        }
    }

    fn has_tag(&self, tag: &str) -> Result<bool, ProbeError> {
        let Some(has_tag) = self.api.has_tag else {
            return self.has_tag_by_name(tag);
        };

        let mut result = false;
        // Safety: `tag` is valid for `tag.len()` reads and `result` is a valid
        // place to write a `bool`.
        if unsafe { has_tag(self.handle, tag.as_ptr(), tag.len(), &mut result) } {
            Ok(result)
        } else {
            Err(ProbeError::unavailable("HasTag", "host couldn't check it"))
        }
    }

    fn has_interaction(&self, label: &str) -> Result<bool, ProbeError> {
        let mut result = false;
        // Safety: `label` is valid for `label.len()` reads and `result` is a
        // valid place to write a `bool`.
        if unsafe {
            (self.api.find_interaction)(self.handle, label.as_ptr(), label.len(), &mut result)
        } {
            Ok(result)
        } else {
            Err(ProbeError::unavailable(
                "AIDiageticInteraction",
                "host couldn't search for it",
            ))
        }
    }

    fn position(&self) -> Option<Vector3<f32>> {
        let mut position = [0.; 3];
        // Safety: `position` is a valid place to write three floats.
        unsafe { (self.api.position)(self.handle, &mut position) }.then(|| position.into())
    }
}

/// The host world, as seen through [HostApi].
pub struct HostWorld {
    api: HostApi,

    /// The interactions we've attached, by entity. These are what enforce
    /// ownership and cooldowns when the host reports that a player selected
    /// one.
    behaviors: RefCell<HashMap<EntityHandle, Behavior>>,
}

impl HostWorld {
    /// Creates a world backed by `api`.
    ///
    /// ## Safety
    ///
    /// Every function in `api` must be safe to call from the thread that uses
    /// this world, with the pointer arguments described on [HostApi], for as
    /// long as this world exists.
    pub unsafe fn new(api: HostApi) -> Self {
        Self {
            api,
            behaviors: Default::default(),
        }
    }

    /// Handles the player `actor` selecting the interaction on `entity` from
    /// `distance` away. Returns `None` if we never attached an interaction to
    /// `entity`.
    pub fn select(
        &self,
        entity: EntityHandle,
        actor: i32,
        distance: f32,
        now: Duration,
    ) -> Option<Result<(), Refusal>> {
        self.behaviors
            .borrow_mut()
            .get_mut(&entity)
            .map(|behavior| behavior.select(actor, distance, now))
    }

    /// Forgets the interactions of entities the host has destroyed.
    pub fn prune_destroyed(&self) {
        let api = self.api;
        self.behaviors.borrow_mut().retain(|handle, behavior| {
            // Safety: `is_alive` takes no pointers.
            let alive = unsafe { (api.is_alive)(*handle) };
            if !alive {
                trace!("Forgetting interaction on destroyed {}", behavior.interaction().target);
            }
            alive
        });
    }

    /// The number of interactions we're tracking.
    pub fn tracked(&self) -> usize {
        self.behaviors.borrow().len()
    }
}

impl World for HostWorld {
    type Candidate = HostCandidate;
    type Candidates = vec::IntoIter<HostCandidate>;

    fn candidates(&self) -> Result<Self::Candidates, ProbeError> {
        // Entities can be destroyed and respawned under new handles without a
        // scene load, so forget the dead ones on every check.
        self.prune_destroyed();

        let api = self.api;
        Ok(api
            .find_ai_controls()?
            .into_iter()
            .map(|handle| HostCandidate { api, handle })
            .collect::<Vec<_>>()
            .into_iter())
    }

    fn primary_actor(&self) -> Option<Actor> {
        let info = self.api.local_player()?;
        Some(Actor {
            id: info.has_view_id.then_some(info.view_id),
            position: info.has_position.then(|| info.position.into()),
        })
    }

    fn attach(
        &self,
        candidate: &HostCandidate,
        interaction: Interaction,
    ) -> Result<(), ProbeError> {
        let settings = &interaction.settings;
        let label = settings.label.as_str();
        let desc = InteractionDesc {
            label: label.as_ptr(),
            label_len: label.len(),
            interact_distance: settings.interact_distance,
            interactivity: settings.interactivity as u8,
            cooldown: settings.cooldown,
            owner_only: settings.owner_only,
            owner_id: interaction.owner.unwrap_or(OWNER_SENTINEL),
            act: settings.act as u8,
        };

        // Safety: `desc` and the label it points to live until the call
        // returns.
        if !unsafe { (self.api.add_interaction)(candidate.handle, &desc) } {
            return Err(ProbeError::AttachFailed(format!(
                "host rejected the interaction for {}",
                candidate.id()
            )));
        }

        debug!("Pet interaction configured for {}", interaction.target_name);
        self.behaviors
            .borrow_mut()
            .insert(candidate.handle, Behavior::new(interaction));
        Ok(())
    }
}
