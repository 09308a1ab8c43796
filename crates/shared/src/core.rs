use std::collections::VecDeque;
use std::iter::ExactSizeIterator;
use std::time::Duration;

use anyhow::Result;
use log::*;

use crate::config::Config;
#[cfg(feature = "profile")]
use crate::profile::Profiler;
use crate::{
    Actor, AugmentationRecord, Augmenter, Candidate, Classifier, Nearby, OnInteract, Outcome,
    ProbeError, Reporter, Scanner, Summary, World, utils,
};

/// The maximum number of augmentation records to keep for the current run.
///
/// Every known pet produces a record on every check, so without a limit this
/// would grow for as long as the game is running.
pub const RECORD_BUFFER_LIMIT: usize = 200;

/// The stage of a pet check that's currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No check is running.
    Idle,
    Scanning,
    Classifying,
    Augmenting,
    Reporting,
}

/// The core of the mod. This owns the host world and runs a pet check each
/// time the check interval elapses.
///
/// A `Core` is created once when the mod starts and lives for the rest of the
/// session. The only state carried from one check to the next is the time of
/// the last check and the record history; whether a pet has already been
/// handled is always read back from the pet itself.
pub struct Core<W: World> {
    /// The host game's world state.
    world: W,

    scanner: Scanner,
    classifier: Classifier,
    augmenter: Augmenter,
    reporter: Reporter,

    /// The time between checks.
    interval: Duration,

    /// How close a pet must be to the player to appear in nearby-pet
    /// diagnostics.
    nearby_radius: f32,

    /// The host time of the last check, or `None` if a check should run on the
    /// next update.
    last_check: Option<Duration>,

    phase: Phase,

    /// The most recent augmentation records from this run, oldest first.
    records: VecDeque<AugmentationRecord>,

    #[cfg(feature = "profile")]
    profiler: Profiler,
}

impl<W: World> Core<W> {
    /// Creates a new instance of [Core] for `world`.
    pub fn new(world: W, config: &Config) -> Result<Self> {
        Ok(Self {
            world,
            scanner: Scanner,
            classifier: Classifier::from_config(config)?,
            augmenter: Augmenter::new(config.interaction().clone()),
            reporter: Reporter,
            interval: config.check_interval(),
            nearby_radius: config.nearby_radius(),
            last_check: None,
            phase: Phase::Idle,
            records: Default::default(),
            #[cfg(feature = "profile")]
            profiler: Default::default(),
        })
    }

    /// Uses `on_interact` as the callback for every interaction attached from
    /// now on.
    pub fn with_callback(mut self, on_interact: OnInteract) -> Self {
        self.augmenter = self.augmenter.with_callback(on_interact);
        self
    }

    /// Returns the host world.
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Returns the stage of the check that's currently running.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the augmentation records from this run, oldest first.
    pub fn records(&self) -> impl ExactSizeIterator<Item = &AugmentationRecord> {
        self.records.iter()
    }

    /// Forces a check on the next update. Called whenever the host loads a new
    /// scene, since that's when new pets show up.
    pub fn reset_interval(&mut self) {
        self.last_check = None;
    }

    /// Runs a pet check if the check interval has elapsed since the last one,
    /// where `now` is the host's current time. Returns the check's summary, or
    /// `None` if no check ran.
    ///
    /// If the host clock moves backwards (for example because a new session
    /// started) a check runs immediately.
    pub fn update(&mut self, now: Duration) -> Option<Summary> {
        if self.phase != Phase::Idle {
            return None;
        }

        if let Some(last) = self.last_check
            && now.checked_sub(last).is_some_and(|elapsed| elapsed < self.interval)
        {
            return None;
        }

        self.last_check = Some(now);
        let result = self.run_check(now);
        self.enter(Phase::Idle);
        match result {
            Ok(summary) => Some(summary),
            Err(err) => {
                error!("Error in pet check, skipping until the next one: {err}");
                None
            }
        }
    }

    /// Runs a single pet check from start to finish.
    fn run_check(&mut self, now: Duration) -> Result<Summary, ProbeError> {
        self.enter(Phase::Scanning);
        let scan = self.scanner.scan(&self.world)?;
        let actor = scan.actor();

        self.enter(Phase::Classifying);
        let candidates = scan
            .map(|candidate| {
                let classification = self.classifier.classify(&candidate);
                trace!("Checked {}: {:?}", candidate.id(), classification);
                (candidate, classification)
            })
            .collect::<Vec<_>>();
        if !candidates.is_empty() {
            debug!("Found {} candidates, checking for pets...", candidates.len());
        }

        self.enter(Phase::Augmenting);
        let mut records = Vec::new();
        let mut nearby = Vec::new();
        if let Some(actor) = actor {
            let track_nearby = log_enabled!(Level::Debug);
            for (candidate, classification) in &candidates {
                let Some(record) =
                    self.augmenter
                        .augment(&self.world, candidate, classification, &actor, now)
                else {
                    continue;
                };

                if track_nearby
                    && record.outcome != Outcome::Failed
                    && let Some(pet) = self.nearby(&actor, candidate)
                {
                    nearby.push(pet);
                }
                records.push(record);
            }
        }

        self.enter(Phase::Reporting);
        let summary = self.reporter.report(&records);
        self.reporter.report_nearby(&nearby);
        for record in records {
            if self.records.len() >= RECORD_BUFFER_LIMIT {
                self.records.pop_front();
            }
            self.records.push_back(record);
        }

        Ok(summary)
    }

    /// Returns `candidate` as a [Nearby] pet if it's within
    /// [Self::nearby_radius] of `actor`.
    fn nearby(&self, actor: &Actor, candidate: &W::Candidate) -> Option<Nearby> {
        let distance = utils::distance(actor.position?, candidate.position()?);
        if distance >= self.nearby_radius {
            return None;
        }

        Some(Nearby {
            candidate_id: candidate.id(),
            name: candidate
                .name()
                .unwrap_or_else(|_| candidate.id().to_string()),
            distance,
        })
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        #[cfg(feature = "profile")]
        self.profiler.transition(phase);
    }
}
