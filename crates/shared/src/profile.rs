use std::time::{Duration, Instant};

use indexmap::IndexMap;
use log::*;

use crate::Phase;

/// How many cycles to collect before logging the average time per phase.
const REPORT_EVERY: u32 = 100;

/// Measures how long each phase of the pet check takes.
#[derive(Debug, Default)]
pub(crate) struct Profiler {
    /// The phase currently running and when it started.
    current: Option<(Phase, Instant)>,

    /// Total time spent in each phase since the last report, in the order the
    /// phases first ran.
    totals: IndexMap<Phase, Duration>,

    cycles: u32,
}

impl Profiler {
    /// Records that the scheduler is moving into `phase`.
    pub fn transition(&mut self, phase: Phase) {
        let now = Instant::now();
        if let Some((previous, start)) = self.current.take() {
            *self.totals.entry(previous).or_default() += now - start;
        }

        if phase == Phase::Idle {
            self.finish_cycle();
        } else {
            self.current = Some((phase, now));
        }
    }

    fn finish_cycle(&mut self) {
        self.cycles += 1;
        if self.cycles < REPORT_EVERY {
            return;
        }

        info!("Average pet check timings over {} cycles:", self.cycles);
        for (phase, total) in &self.totals {
            info!("  {:?}: {:?}", phase, *total / self.cycles);
        }
        self.totals.clear();
        self.cycles = 0;
    }
}
