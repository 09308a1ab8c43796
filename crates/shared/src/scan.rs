use log::*;

use crate::{Actor, ProbeError, World};

/// Enumerates the candidates in the current world.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scanner;

impl Scanner {
    /// Starts a new scan of `world`.
    ///
    /// If there's no active session or the player hasn't spawned yet, this
    /// returns an empty scan rather than an error. Any other enumeration error
    /// is returned, since it means the scan can't run at all.
    pub fn scan<W: World>(&self, world: &W) -> Result<Scan<W::Candidates>, ProbeError> {
        let Some(actor) = world.primary_actor() else {
            trace!("No player yet, skipping scan");
            return Ok(Scan::empty());
        };

        match world.candidates() {
            Ok(candidates) => Ok(Scan {
                actor: Some(actor),
                candidates: Some(candidates),
            }),
            Err(ProbeError::ProviderUnavailable) => {
                trace!("World unavailable, skipping scan");
                Ok(Scan::empty())
            }
            Err(err) => Err(err),
        }
    }
}

/// The candidates found by a single [Scanner::scan].
#[derive(Debug)]
pub struct Scan<I> {
    actor: Option<Actor>,
    candidates: Option<I>,
}

impl<I> Scan<I> {
    fn empty() -> Self {
        Self {
            actor: None,
            candidates: None,
        }
    }

    /// The player at the time of the scan. Always `Some` unless the scan is
    /// empty.
    pub fn actor(&self) -> Option<Actor> {
        self.actor
    }
}

impl<I: Iterator> Iterator for Scan<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.candidates.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates
            .as_ref()
            .map_or((0, Some(0)), Iterator::size_hint)
    }
}
