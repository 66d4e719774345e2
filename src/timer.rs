use std::time::{Duration, Instant};

use log::info;

/// Wall-clock time of consecutive stages of one computation.
#[derive(Debug, Clone)]
pub struct StageTimer {
    stages: Vec<(&'static str, Duration)>,
    lap_start: Instant,
}

impl StageTimer {
    pub fn start() -> Self {
        StageTimer {
            stages: Vec::new(),
            lap_start: Instant::now(),
        }
    }

    /// Closes the running stage under `name` and starts the next one.
    pub fn lap(&mut self, name: &'static str) -> Duration {
        let duration = self.lap_start.elapsed();
        info!("{} took {}ms.", name, duration.as_millis());
        self.stages.push((name, duration));
        self.lap_start = Instant::now();
        duration
    }

    pub fn stages(&self) -> &[(&'static str, Duration)] {
        &self.stages
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, duration)| *duration).sum()
    }
}
