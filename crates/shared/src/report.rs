use log::*;

use crate::{AugmentationRecord, CandidateId, Outcome};

/// The per-outcome counts for a single scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub added: usize,
    pub already_present: usize,
    pub failed: usize,
}

impl Summary {
    /// The total number of augmentation attempts.
    pub fn total(&self) -> usize {
        self.added + self.already_present + self.failed
    }
}

/// A pet with our interaction that's close to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct Nearby {
    pub candidate_id: CandidateId,
    pub name: String,
    pub distance: f32,
}

/// Writes scan results to the log.
///
/// Nothing is logged at info level unless something actually changed, since
/// scans run every couple of seconds for the whole session.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reporter;

impl Reporter {
    /// Logs `records` and returns their counts.
    pub fn report(&self, records: &[AugmentationRecord]) -> Summary {
        let mut summary = Summary::default();
        for record in records {
            debug!("  {} -> {:?}", record.candidate_id, record.outcome);
            match record.outcome {
                Outcome::Added => summary.added += 1,
                Outcome::AlreadyPresent => summary.already_present += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }

        if summary.added > 0 {
            info!("Added {} new pet interactions this check.", summary.added);
        }
        summary
    }

    /// Logs the pets close enough to the player to be worth checking on.
    pub fn report_nearby(&self, nearby: &[Nearby]) {
        if nearby.is_empty() {
            return;
        }

        debug!("Found {} nearby pet interactions:", nearby.len());
        for pet in nearby {
            debug!(
                "  - {} ({}) at distance {:.2}",
                pet.name, pet.candidate_id, pet.distance
            );
        }
    }
}
