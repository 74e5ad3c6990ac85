use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: &'static str,
    pub total: Duration,
    pub count: u64,
}

/// Per-session counters: time spent per decode step and pacing lag.
///
/// Continuous playback never drops frames, so when decoding outruns the frame
/// interval the delivery falls behind and `total_lag` grows monotonically.
#[derive(Debug, Clone, Default)]
pub struct PlaybackStats {
    pub frames_delivered: u64,
    pub late_frames: u64,
    pub total_lag: Duration,
    pub max_lag: Duration,
    steps: Vec<StepTiming>,
    step_map: HashMap<&'static str, usize>,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: &'static str, duration: Duration) {
        let slot = match self.step_map.get(name) {
            Some(&slot) => slot,
            None => {
                self.steps.push(StepTiming {
                    name,
                    total: Duration::ZERO,
                    count: 0,
                });
                let slot = self.steps.len() - 1;
                self.step_map.insert(name, slot);
                slot
            }
        };
        let step = &mut self.steps[slot];
        step.total += duration;
        step.count += 1;
    }

    pub fn record_lag(&mut self, lag: Duration) {
        self.late_frames += 1;
        self.total_lag += lag;
        self.max_lag = self.max_lag.max(lag);
    }

    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).map(|&slot| self.steps[slot].total)
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn busy_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.total).sum()
    }

    pub fn print_summary(&self) {
        let total = self.busy_duration();
        println!("\nPlayback Timing Summary:");
        println!("{:-<60}", "");
        for step in &self.steps {
            let percentage = if total.as_secs_f64() > 0.0 {
                (step.total.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            let average = if step.count > 0 {
                step.total.as_secs_f64() * 1000.0 / step.count as f64
            } else {
                0.0
            };
            println!(
                "{:<14} {:>12.3}ms ({:>5.1}%) avg {:>8.3}ms",
                step.name,
                step.total.as_secs_f64() * 1000.0,
                percentage,
                average
            );
        }
        println!("{:-<60}", "");
        println!("{:<14} {:>12}", "Frames", self.frames_delivered);
        println!(
            "{:<14} {:>12} (total {:.3}ms, max {:.3}ms)",
            "Late",
            self.late_frames,
            self.total_lag.as_secs_f64() * 1000.0,
            self.max_lag.as_secs_f64() * 1000.0
        );
    }
}

pub struct Timer {
    start: Instant,
    name: &'static str,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    pub fn stop(self) -> (&'static str, Duration) {
        (self.name, self.start.elapsed())
    }
}
