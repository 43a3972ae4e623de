//! Per-frame timing of the scene pipeline.

use smallvec::SmallVec;
use std::{
    collections::VecDeque,
    fmt::Debug,
    mem,
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    /// Start hooks and the first destruction flush.
    Start,
    Messages,
    Systems,
    Commands,
}

#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub label: &'static str,
    pub duration: Duration,
}

#[derive(Default, Clone)]
pub struct FrameTiming {
    /// Index of the frame, counted from 0.
    pub frame: u64,
    pub total: Duration,
    pub stages: SmallVec<[(FrameStage, Duration); 4]>,
    /// Time spent in each system's `process`, in registration order.
    pub system_timings: SmallVec<[SystemTiming; 8]>,
}

impl FrameTiming {
    pub fn stage_time(&self, stage: FrameStage) -> Duration {
        self.stages
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, duration)| *duration)
            .sum()
    }
}

impl Debug for FrameTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTiming")
            .field("frame", &self.frame)
            .field("total", &self.total)
            .field("stages", &self.stages)
            .field("system_timings", &self.system_timings)
            .finish()
    }
}

/// Collects [`FrameTiming`]s into a bounded history.
pub struct FrameProfiler {
    pub max_history_size: usize,
    history: VecDeque<FrameTiming>,
    pending: FrameTiming,
    frame_start: Instant,
    current_stage: Option<(FrameStage, Instant)>,
    next_frame: u64,
}

impl FrameProfiler {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            max_history_size,
            history: VecDeque::with_capacity(max_history_size.min(1024)),
            pending: FrameTiming::default(),
            frame_start: Instant::now(),
            current_stage: None,
            next_frame: 0,
        }
    }

    /// Starts timing a new frame. Anything recorded for an unfinished frame is discarded.
    pub fn begin_frame(&mut self) {
        self.pending = FrameTiming {
            frame: self.next_frame,
            ..Default::default()
        };
        self.next_frame += 1;
        self.frame_start = Instant::now();
        self.current_stage = None;
    }

    pub fn next_stage(&mut self, stage: FrameStage) {
        self.finish_stage();
        self.current_stage = Some((stage, Instant::now()));
    }

    /// Runs `f`, recording its duration under the system's label.
    pub fn time_system<R>(&mut self, label: &'static str, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.pending.system_timings.push(SystemTiming {
            label,
            duration: start.elapsed(),
        });
        result
    }

    pub fn finish_frame(&mut self) {
        self.finish_stage();

        let mut timing = mem::take(&mut self.pending);
        timing.total = self.frame_start.elapsed();

        if self.max_history_size == 0 {
            return;
        }
        if self.history.len() >= self.max_history_size {
            self.history.pop_front();
        }
        self.history.push_back(timing);
    }

    pub fn last_frame(&self) -> Option<&FrameTiming> {
        self.history.back()
    }

    /// Finished frames, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &FrameTiming> {
        self.history.iter()
    }

    fn finish_stage(&mut self) {
        if let Some((stage, start)) = self.current_stage.take() {
            self.pending.stages.push((stage, start.elapsed()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded() {
        let mut profiler = FrameProfiler::new(3);
        for _ in 0..5 {
            profiler.begin_frame();
            profiler.next_stage(FrameStage::Start);
            profiler.next_stage(FrameStage::Systems);
            profiler.time_system("test", || ());
            profiler.finish_frame();
        }

        let frames: Vec<_> = profiler.history().map(|timing| timing.frame).collect();
        assert_eq!(frames, vec![2, 3, 4]);

        let last = profiler.last_frame().unwrap();
        assert_eq!(last.stages.len(), 2);
        assert_eq!(last.system_timings.len(), 1);
        assert_eq!(last.system_timings[0].label, "test");
        assert!(last.stage_time(FrameStage::Systems) <= last.total);
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let mut profiler = FrameProfiler::new(0);
        profiler.begin_frame();
        profiler.finish_frame();
        assert!(profiler.last_frame().is_none());
    }
}
