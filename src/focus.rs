// Focus mode: work through the tomorrow list one task at a time

use crate::backend::Backend;
use crate::store::TaskStore;
use crate::task::Task;
use tracing::debug;

/// Play/pause state of a focus run
///
/// While playing, the current task is always the head of the tomorrow list,
/// so finishing or dismissing one surfaces the next without further input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FocusSession {
    playing: bool,
}

impl FocusSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start the run; stays paused when there is nothing to work on
    pub fn play<B: Backend>(&mut self, store: &TaskStore<B>) -> bool {
        self.playing = store.first_active_tomorrow_task().is_some();
        self.playing
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Task under focus, only while playing
    pub fn current<'s, B: Backend>(&self, store: &'s TaskStore<B>) -> Option<&'s Task> {
        if !self.playing {
            return None;
        }
        store.first_active_tomorrow_task()
    }

    /// Complete the task under focus and move on to the next one
    pub fn complete_current<B: Backend>(&self, store: &mut TaskStore<B>) -> Option<Task> {
        let task = self.current(store)?.clone();
        debug!(id = %task.id, "focus: completing");
        store.complete(&task.id);
        Some(task)
    }

    /// Soft-delete the task under focus and move on to the next one
    pub fn dismiss_current<B: Backend>(&self, store: &mut TaskStore<B>) -> Option<Task> {
        let task = self.current(store)?.clone();
        debug!(id = %task.id, "focus: dismissing");
        store.delete(&task.id);
        Some(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::filter::Filter;
    use crate::store::DEFAULT_STORAGE_KEY;
    use crate::task::TaskStatus;

    fn store() -> TaskStore<MemoryBackend> {
        TaskStore::open(MemoryBackend::new(), DEFAULT_STORAGE_KEY).unwrap()
    }

    #[test]
    fn test_play_needs_a_task() {
        let mut store = store();
        let mut session = FocusSession::new();

        store.add("later only", "", None, Filter::Later);
        assert!(!session.play(&store));
        assert!(session.current(&store).is_none());

        store.add("tomorrow", "", None, Filter::Tomorrow);
        assert!(session.play(&store));
        assert_eq!(session.current(&store).unwrap().title, "tomorrow");
    }

    #[test]
    fn test_paused_session_shows_nothing() {
        let mut store = store();
        store.add("t", "", None, Filter::Tomorrow);
        let mut session = FocusSession::new();
        session.play(&store);

        session.pause();
        assert!(!session.is_playing());
        assert!(session.current(&store).is_none());
        assert!(session.complete_current(&mut store).is_none());
    }

    #[test]
    fn test_complete_and_dismiss_advance() {
        let mut store = store();
        let third = store.add("third", "", None, Filter::Tomorrow);
        let second = store.add("second", "", None, Filter::Tomorrow);
        store.add("first", "", None, Filter::Tomorrow);
        let mut session = FocusSession::new();
        session.play(&store);

        let done = session.complete_current(&mut store).unwrap();
        assert_eq!(done.title, "first");
        assert_eq!(store.get(&done.id).unwrap().status, TaskStatus::Completed);
        assert_eq!(session.current(&store).unwrap().id, second.id);

        let dismissed = session.dismiss_current(&mut store).unwrap();
        assert_eq!(dismissed.id, second.id);
        assert_eq!(store.get(&second.id).unwrap().status, TaskStatus::Deleted);
        assert_eq!(session.current(&store).unwrap().id, third.id);
        assert!(session.is_playing());

        session.complete_current(&mut store);
        assert!(session.current(&store).is_none());
    }
}
