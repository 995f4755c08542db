//! Progress notifications for long pixel loops.
//!
//! Reports carry counts only, never the working buffer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    AntiAlias,
    Apply,
    Feather,
    Sample,
    Fill,
    Recolor,
    Render,
    Cut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub stage: Stage,
    pub done: u64,
    pub total: u64,
}

pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Sink that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&mut self, _progress: Progress) {}
}

/// Rows between reports for row-major passes
pub(crate) const ROW_INTERVAL: u32 = 64;

/// Throttles reports for one stage and guarantees a final `done == total`.
pub(crate) struct StageReporter<'a> {
    sink: &'a mut dyn ProgressSink,
    stage: Stage,
    total: u64,
    interval: u64,
    last: u64,
}

impl<'a> StageReporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink, stage: Stage, total: u64, interval: u64) -> Self {
        Self {
            sink,
            stage,
            total,
            interval: interval.max(1),
            last: 0,
        }
    }

    pub(crate) fn rows(sink: &'a mut dyn ProgressSink, stage: Stage, height: u32) -> Self {
        Self::new(sink, stage, height as u64, ROW_INTERVAL as u64)
    }

    #[inline]
    pub(crate) fn tick(&mut self, done: u64) {
        if done >= self.last + self.interval && done < self.total {
            self.last = done;
            self.sink.report(Progress {
                stage: self.stage,
                done,
                total: self.total,
            });
        }
    }

    pub(crate) fn finish(self) {
        self.sink.report(Progress {
            stage: self.stage,
            done: self.total,
            total: self.total,
        });
    }
}
