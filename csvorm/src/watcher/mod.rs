use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Quiet period after the last model file event before a batch is delivered.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// A batch of model file changes, delivered once the directories go quiet.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChange {
    pub paths: Vec<PathBuf>,
}

/// Watches model directories and reports debounced changes to model files,
/// so that generated code can be refreshed.
pub struct ModelWatcher {
    _watcher: RecommendedWatcher,
    _thread: std::thread::JoinHandle<()>,
    /// Receiver for debounced model changes
    pub changes: mpsc::Receiver<ModelChange>,
}

impl ModelWatcher {
    /// Start watching `dirs` recursively. Directories that do not exist are skipped.
    pub fn start(dirs: &[&Path]) -> Result<Self, notify::Error> {
        let (notify_tx, notify_rx) = mpsc::channel::<notify::Result<Event>>();
        let (change_tx, changes) = mpsc::channel::<ModelChange>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )?;

        for dir in dirs {
            if dir.is_dir() {
                watcher.watch(dir, RecursiveMode::Recursive)?;
                log::info!("Watching {} for model changes", dir.display());
            } else {
                log::warn!("Not watching {}: directory does not exist", dir.display());
            }
        }

        let thread = std::thread::spawn(move || {
            let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
            let mut last_event = Instant::now();

            loop {
                match notify_rx.recv_timeout(DEBOUNCE) {
                    Ok(Ok(event)) => {
                        if is_relevant(&event.kind) {
                            for path in event.paths.into_iter().filter(|p| is_model_file(p)) {
                                pending.insert(path);
                            }
                        }
                        last_event = Instant::now();
                    }
                    Ok(Err(e)) => {
                        log::warn!("Model watcher error: {e}");
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if !pending.is_empty() && last_event.elapsed() >= DEBOUNCE {
                            let paths = std::mem::take(&mut pending).into_iter().collect();
                            if change_tx.send(ModelChange { paths }).is_err() {
                                return;
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Ok(ModelWatcher {
            _watcher: watcher,
            _thread: thread,
            changes,
        })
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Check if a path looks like a model file.
pub fn is_model_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_model_file() {
        assert!(is_model_file(Path::new("models/car.yaml")));
        assert!(is_model_file(Path::new("models/user.yml")));
        assert!(!is_model_file(Path::new("models/car.yaml.swp")));
        assert!(!is_model_file(Path::new("data/car.csv")));
    }

    #[test]
    fn test_relevant_kinds() {
        assert!(is_relevant(&EventKind::Create(notify::event::CreateKind::File)));
        assert!(!is_relevant(&EventKind::Access(notify::event::AccessKind::Any)));
    }
}
