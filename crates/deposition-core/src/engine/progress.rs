#[derive(Debug, Clone)]
pub enum Progress {
    /// Emitted once before the loop starts; `completed` counts iterations
    /// already recorded in the checkpoint.
    RunStart { completed: u64, total: u64 },
    IterationStart { id: u64 },
    StageStart { name: &'static str },
    IterationFinish { id: u64, success: bool },
    RunFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new().report(Progress::RunFinish);
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen = Mutex::new(Vec::new());
        {
            let reporter = ProgressReporter::with_callback(Box::new(|event| {
                if let Progress::IterationStart { id } = event {
                    seen.lock().unwrap().push(id);
                }
            }));
            reporter.report(Progress::IterationStart { id: 4 });
            reporter.report(Progress::StageStart { name: "relaxation" });
            reporter.report(Progress::IterationStart { id: 5 });
        }
        assert_eq!(seen.into_inner().unwrap(), vec![4, 5]);
    }
}
