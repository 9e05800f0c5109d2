//! Summary of transfers still running in the background.

use std::path::PathBuf;

use crate::worker::WorkerHandle;

/// Unfinished transfers, as shown in a status line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundActivities {
    pub loaders: usize,
    pub storers: usize,
    pub total_work: u64,
    pub total_progress: u64,
    /// Path of the last counted transfer
    pub last_path: Option<PathBuf>,
}

impl BackgroundActivities {
    pub fn is_idle(&self) -> bool {
        self.loaders == 0 && self.storers == 0
    }

    /// Overall completion in percent
    pub fn percent(&self) -> u64 {
        if self.total_work == 0 {
            return 100;
        }
        self.total_progress.saturating_mul(100) / self.total_work
    }
}

/// Count unfinished workers. Silent stores are left out.
pub fn count_background_activities<'a, I>(handles: I) -> BackgroundActivities
where
    I: IntoIterator<Item = &'a WorkerHandle>,
{
    let mut activities = BackgroundActivities::default();
    for handle in handles {
        if handle.finished_job() {
            continue;
        }
        if handle.is_loading() {
            activities.loaders += 1;
        } else if handle.visible_progress() {
            activities.storers += 1;
        } else {
            continue;
        }
        activities.last_path = Some(handle.path_buf());
        activities.total_work += handle.size_job();
        activities.total_progress += handle.progress_made();
    }
    activities
}

/// Whether any store, visible or silent, is still running
pub fn saving_in_background<'a, I>(handles: I) -> bool
where
    I: IntoIterator<Item = &'a WorkerHandle>,
{
    handles
        .into_iter()
        .any(|handle| !handle.is_loading() && !handle.finished_job())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerKind;
    use std::path::Path;

    #[test]
    fn test_counts_unfinished_visible_workers() {
        let loader = WorkerHandle::new(WorkerKind::Loading, Path::new("a.txt"), 100, true);
        loader.state().increment_progress(25);
        let storer = WorkerHandle::new(WorkerKind::Storing, Path::new("b.txt"), 300, true);
        storer.state().increment_progress(75);
        let silent = WorkerHandle::new(WorkerKind::Storing, Path::new("c.txt"), 50, false);
        let done = WorkerHandle::new(WorkerKind::Loading, Path::new("d.txt"), 10, true);
        done.state().set_completed();

        let handles = [loader, storer, silent, done];
        let activities = count_background_activities(&handles);
        assert_eq!(activities.loaders, 1);
        assert_eq!(activities.storers, 1);
        assert_eq!(activities.total_work, 400);
        assert_eq!(activities.total_progress, 100);
        assert_eq!(activities.percent(), 25);
        assert_eq!(activities.last_path.as_deref(), Some(Path::new("b.txt")));
        assert!(saving_in_background(&handles));
    }

    #[test]
    fn test_silent_store_still_counts_as_saving() {
        let silent = WorkerHandle::new(WorkerKind::Storing, Path::new("c.txt"), 50, false);
        let handles = vec![silent];
        assert!(count_background_activities(&handles).is_idle());
        assert!(saving_in_background(&handles));

        handles[0].state().set_completed();
        assert!(!saving_in_background(&handles));
    }
}
