use serde::Serialize;
use tracing::debug;

/// One checkpoint of a long-running separation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Percent complete, 0..=100.
    pub phase: u8,
    pub message: String,
}

/// Fixed semantic checkpoints of the separator pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    Init,
    ModelLoad,
    DeviceSelect,
    LoadAudio,
    Inference,
    ProcessStems,
    SaveStems,
    Done,
}

impl Milestone {
    pub fn percent(self) -> u8 {
        match self {
            Milestone::Init => 0,
            Milestone::ModelLoad => 10,
            Milestone::DeviceSelect => 12,
            Milestone::LoadAudio => 20,
            Milestone::Inference => 30,
            Milestone::ProcessStems => 70,
            Milestone::SaveStems => 80,
            Milestone::Done => 100,
        }
    }
}

type Sink<'a> = Box<dyn FnMut(&ProgressEvent) + 'a>;

/// Ordered, single-direction progress channel from a pipeline to its caller.
///
/// Percentages never go backwards: a lower value than the last one emitted is
/// raised to it, and an exact repeat of the previous event is dropped.
pub struct ProgressReporter<'a> {
    sink: Option<Sink<'a>>,
    last: Option<ProgressEvent>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: impl FnMut(&ProgressEvent) + 'a) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            last: None,
        }
    }

    pub fn silent() -> Self {
        Self {
            sink: None,
            last: None,
        }
    }

    pub fn report(&mut self, percent: u8, message: impl Into<String>) {
        let floor = self.last_phase().unwrap_or(0);
        let event = ProgressEvent {
            phase: percent.min(100).max(floor),
            message: message.into(),
        };
        if self.last.as_ref() == Some(&event) {
            return;
        }
        debug!(phase = event.phase, message = %event.message, "progress");
        if let Some(sink) = self.sink.as_mut() {
            sink(&event);
        }
        self.last = Some(event);
    }

    pub fn milestone(&mut self, milestone: Milestone, message: impl Into<String>) {
        self.report(milestone.percent(), message);
    }

    pub fn last_phase(&self) -> Option<u8> {
        self.last.as_ref().map(|e| e.phase)
    }
}

impl Default for ProgressReporter<'_> {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_percent_is_raised_to_previous() {
        let mut seen = Vec::new();
        {
            let mut r = ProgressReporter::new(|e| seen.push(e.phase));
            r.report(30, "a");
            r.report(10, "b");
            r.report(150, "c");
        }
        assert_eq!(seen, vec![30, 30, 100]);
    }

    #[test]
    fn exact_duplicate_is_dropped() {
        let mut count = 0;
        {
            let mut r = ProgressReporter::new(|_| count += 1);
            r.milestone(Milestone::Init, "start");
            r.milestone(Milestone::Init, "start");
        }
        assert_eq!(count, 1);
    }
}
