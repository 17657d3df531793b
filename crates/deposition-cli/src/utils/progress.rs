use depokit::engine::layout::iteration_label;
use depokit::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

struct BarState {
    pb: ProgressBar,
    iteration: Option<u64>,
}

#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::bar_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState {
                pb,
                iteration: None,
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut guard) = state.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::RunStart { completed, total } => {
                    guard.pb.reset();
                    guard.pb.set_style(Self::bar_style());
                    guard.pb.set_length(total);
                    guard.pb.set_position(completed.min(total));
                    guard.pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    guard.pb.set_message("Starting");
                }
                Progress::IterationStart { id } => {
                    guard.iteration = Some(id);
                    guard
                        .pb
                        .set_message(format!("Iteration {}", iteration_label(id)));
                }
                Progress::StageStart { name } => {
                    let message = match guard.iteration {
                        Some(id) => format!("Iteration {}: {}", iteration_label(id), name),
                        None => name.to_string(),
                    };
                    guard.pb.set_message(message);
                }
                Progress::IterationFinish { id, success } => {
                    guard.pb.inc(1);
                    if !success {
                        guard
                            .pb
                            .println(format!("  Iteration {} failed", iteration_label(id)));
                    }
                    guard.iteration = None;
                }
                Progress::RunFinish => {
                    guard.pb.disable_steady_tick();
                    guard.pb.finish_with_message("✓ Done");
                }
                Progress::Message(msg) => {
                    if !guard.pb.is_finished() {
                        guard.pb.println(format!("  {}", msg));
                    } else {
                        guard.pb.set_message(msg);
                    }
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} {msg:<28} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "elapsed",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.0}s", state.elapsed().as_secs_f64());
            },
        )
        .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let guard = handler.state.lock().unwrap();
        assert_eq!(guard.pb.length(), Some(0));
        assert!(guard.pb.is_finished());
        assert_eq!(guard.iteration, None);
    }

    #[test]
    fn callback_tracks_iterations_and_stages() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::RunStart {
            completed: 2,
            total: 10,
        });
        {
            let guard = handler.state.lock().unwrap();
            assert_eq!(guard.pb.length(), Some(10));
            assert_eq!(guard.pb.position(), 2);
            assert!(!guard.pb.is_finished());
        }

        callback(Progress::IterationStart { id: 3 });
        callback(Progress::StageStart { name: "Deposition" });
        {
            let guard = handler.state.lock().unwrap();
            assert_eq!(guard.pb.message(), "Iteration 003: Deposition");
        }

        callback(Progress::IterationFinish {
            id: 3,
            success: false,
        });
        {
            let guard = handler.state.lock().unwrap();
            assert_eq!(guard.pb.position(), 3);
            assert_eq!(guard.iteration, None);
        }

        callback(Progress::RunFinish);
        {
            let guard = handler.state.lock().unwrap();
            assert!(guard.pb.is_finished());
            assert_eq!(guard.pb.message(), "✓ Done");
        }
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::RunStart {
                completed: 0,
                total: 1,
            });
            callback(Progress::IterationStart { id: 1 });
            callback(Progress::IterationFinish {
                id: 1,
                success: true,
            });
            callback(Progress::RunFinish);
        })
        .join()
        .unwrap();

        let guard = handler.state.lock().unwrap();
        assert!(guard.pb.is_finished());
        assert_eq!(guard.pb.position(), 1);
    }
}
