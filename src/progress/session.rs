use super::tracker::ProgressTracker;

/// Owns the tracker of the episode currently playing. Opening another episode
/// flushes the previous tracker before the new one exists.
pub struct SessionManager<F>
where
    F: FnMut(&str) -> ProgressTracker,
{
    make_tracker: F,
    current: Option<ProgressTracker>,
}

impl<F> SessionManager<F>
where
    F: FnMut(&str) -> ProgressTracker,
{
    pub fn new(make_tracker: F) -> Self {
        Self {
            make_tracker,
            current: None,
        }
    }

    pub fn open(&mut self, episode_id: &str) -> &mut ProgressTracker {
        self.close();
        self.current.insert((self.make_tracker)(episode_id))
    }

    pub fn current(&mut self) -> Option<&mut ProgressTracker> {
        self.current.as_mut()
    }

    /// Flushes and discards the current tracker. In-flight saves keep running.
    pub fn close(&mut self) {
        if let Some(mut previous) = self.current.take() {
            previous.teardown();
        }
    }
}

impl<F> Drop for SessionManager<F>
where
    F: FnMut(&str) -> ProgressTracker,
{
    fn drop(&mut self) {
        self.close();
    }
}
