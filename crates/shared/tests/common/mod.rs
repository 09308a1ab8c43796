//! An in-memory host world for driving the pet check end to end.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::vec;

use log::{Level, LevelFilter, Log, Metadata, Record};
use mint::Vector3;
use shared::*;

/// A single entity in a [MockWorld].
#[derive(Debug, Default)]
pub struct Entity {
    pub name: String,
    pub display_name: String,
    pub owner: i32,
    pub tags: HashSet<String>,
    pub position: Option<Vector3<f32>>,

    /// Every attribute read fails.
    pub broken: bool,

    /// The host refuses to attach interactions to this entity.
    pub reject_attach: bool,

    /// The interactions attached so far.
    pub interactions: Vec<Interaction>,
}

impl Entity {
    pub fn new(name: &str, owner: i32) -> Self {
        Self {
            name: name.into(),
            owner,
            ..Default::default()
        }
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Some(Vector3 { x, y, z });
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MockCandidate {
    id: CandidateId,
    entity: Rc<RefCell<Entity>>,
}

impl MockCandidate {
    fn read<T>(
        &self,
        attribute: &'static str,
        f: impl FnOnce(&Entity) -> T,
    ) -> Result<T, ProbeError> {
        let entity = self.entity.borrow();
        if entity.broken {
            Err(ProbeError::unavailable(attribute, "entity is broken"))
        } else {
            Ok(f(&entity))
        }
    }
}

impl Candidate for MockCandidate {
    fn id(&self) -> CandidateId {
        self.id
    }

    fn name(&self) -> Result<String, ProbeError> {
        self.read("name", |e| e.name.clone())
    }

    fn display_name(&self) -> Result<String, ProbeError> {
        self.read("AIName", |e| e.display_name.clone())
    }

    fn owner_id(&self) -> Result<i32, ProbeError> {
        self.read("PetOwnerID", |e| e.owner)
    }

    fn has_tag(&self, tag: &str) -> Result<bool, ProbeError> {
        self.read("HasTag", |e| e.tags.contains(tag))
    }

    fn has_interaction(&self, label: &str) -> Result<bool, ProbeError> {
        self.read("interactions", |e| {
            e.interactions.iter().any(|i| i.settings.label.as_str() == label)
        })
    }

    fn position(&self) -> Option<Vector3<f32>> {
        self.entity.borrow().position
    }
}

/// A world whose entities and player are set up directly by the test.
#[derive(Debug)]
pub struct MockWorld {
    pub entities: Vec<Rc<RefCell<Entity>>>,
    /// The player, which tests may change between checks.
    pub actor: Cell<Option<Actor>>,

    /// The error to return when enumerating candidates, if any.
    pub enumerate_error: Option<ProbeError>,
}

/// The player's view ID in every test world.
pub const PLAYER: i32 = 7;

/// The player in every test world, standing at the origin.
pub fn player() -> Actor {
    Actor {
        id: Some(PLAYER),
        position: Some(Vector3 {
            x: 0.,
            y: 0.,
            z: 0.,
        }),
    }
}

impl MockWorld {
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities
                .into_iter()
                .map(|e| Rc::new(RefCell::new(e)))
                .collect(),
            actor: Cell::new(Some(player())),
            enumerate_error: None,
        }
    }

    /// Returns the entity at `index`.
    pub fn entity(&self, index: usize) -> std::cell::Ref<'_, Entity> {
        self.entities[index].borrow()
    }

    /// Returns a candidate handle for the entity at `index`.
    pub fn candidate(&self, index: usize) -> MockCandidate {
        MockCandidate {
            id: CandidateId(index as u64 + 1),
            entity: self.entities[index].clone(),
        }
    }
}

impl World for MockWorld {
    type Candidate = MockCandidate;
    type Candidates = vec::IntoIter<MockCandidate>;

    fn candidates(&self) -> Result<Self::Candidates, ProbeError> {
        if let Some(err) = &self.enumerate_error {
            return Err(err.clone());
        }

        Ok((0..self.entities.len())
            .map(|i| self.candidate(i))
            .collect::<Vec<_>>()
            .into_iter())
    }

    fn primary_actor(&self) -> Option<Actor> {
        self.actor.get()
    }

    fn attach(
        &self,
        candidate: &MockCandidate,
        interaction: Interaction,
    ) -> Result<(), ProbeError> {
        let mut entity = candidate.entity.borrow_mut();
        if entity.reject_attach {
            return Err(ProbeError::AttachFailed("entity is being destroyed".into()));
        }
        entity.interactions.push(interaction);
        Ok(())
    }
}

/// A logger that keeps each test thread's records to itself.
struct Capture;

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|captured| {
            if let Some(logs) = captured.borrow_mut().as_mut() {
                logs.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;

/// Runs `f` and returns everything it logged on this thread.
pub fn capture_logs(f: impl FnOnce()) -> Vec<(Level, String)> {
    let _ = log::set_logger(&CAPTURE);
    log::set_max_level(LevelFilter::Trace);
    CAPTURED.with(|captured| *captured.borrow_mut() = Some(vec![]));
    f();
    CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default())
}
