//! Periodic tasks driven by the draw cycle
//!
//! [`crate::scene::Graph::post_draw`] calls [`TimingHandler::handle`] once
//! per cycle. Every started task whose period has elapsed since its last run
//! executes then, so task resolution is bounded by the frame rate.

use std::time::{Duration, Instant};

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a registered task
    pub struct TaskId;
}

/// Work run periodically by a [`TimingHandler`]
pub trait TimingTask {
    /// Run the task once
    fn execute(&mut self);
}

impl<F: FnMut()> TimingTask for F {
    fn execute(&mut self) {
        self();
    }
}

/// Default animation period, 25 runs per second
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(40);

struct Entry {
    task: Box<dyn TimingTask>,
    period: Duration,
    started: bool,
    last_run: Instant,
    runs: u64,
}

/// Registry of periodic tasks plus frame rate bookkeeping
pub struct TimingHandler {
    tasks: SlotMap<TaskId, Entry>,
    last_frame: Option<Instant>,
    frame_rate: f32,
    frame_count: u64,
}

impl std::fmt::Debug for TimingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingHandler")
            .field("tasks", &self.tasks.len())
            .field("frame_rate", &self.frame_rate)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl Default for TimingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingHandler {
    /// Create an empty handler
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            last_frame: None,
            frame_rate: 0.0,
            frame_count: 0,
        }
    }

    fn register(&mut self, period: Duration, started: bool, task: Box<dyn TimingTask>) -> TaskId {
        self.tasks.insert(Entry {
            task,
            period,
            started,
            last_run: Instant::now(),
            runs: 0,
        })
    }

    /// Register a task that starts running right away
    ///
    /// A zero period runs the task on every cycle.
    pub fn register_task(&mut self, period: Duration, task: impl TimingTask + 'static) -> TaskId {
        self.register(period, true, Box::new(task))
    }

    /// Register an animation task that stays idle until [`TimingHandler::start`]
    pub fn register_animator(&mut self, task: impl TimingTask + 'static) -> TaskId {
        self.register(DEFAULT_PERIOD, false, Box::new(task))
    }

    /// Remove a task; returns whether it was registered
    pub fn unregister_task(&mut self, id: TaskId) -> bool {
        self.tasks.remove(id).is_some()
    }

    /// Whether the task is registered
    pub fn is_task_registered(&self, id: TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Number of registered tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Start a task; its first run happens one period from now
    pub fn start(&mut self, id: TaskId) -> bool {
        self.start_at(id, Instant::now())
    }

    /// [`TimingHandler::start`] with an explicit clock reading
    pub fn start_at(&mut self, id: TaskId, now: Instant) -> bool {
        let Some(entry) = self.tasks.get_mut(id) else {
            return false;
        };
        entry.started = true;
        entry.last_run = now;
        true
    }

    /// Stop a task without unregistering it
    pub fn stop(&mut self, id: TaskId) -> bool {
        let Some(entry) = self.tasks.get_mut(id) else {
            return false;
        };
        entry.started = false;
        true
    }

    /// Stop a started task or start a stopped one
    pub fn toggle(&mut self, id: TaskId) -> bool {
        match self.is_started(id) {
            Some(true) => self.stop(id),
            Some(false) => self.start(id),
            None => false,
        }
    }

    /// Stop and start again, resetting the period
    pub fn restart(&mut self, id: TaskId) -> bool {
        self.stop(id) && self.start(id)
    }

    /// Whether the task is started; `None` if unregistered
    pub fn is_started(&self, id: TaskId) -> Option<bool> {
        self.tasks.get(id).map(|entry| entry.started)
    }

    /// Task period
    pub fn period(&self, id: TaskId) -> Option<Duration> {
        self.tasks.get(id).map(|entry| entry.period)
    }

    /// Change a task period; zero periods are rejected
    ///
    /// A started task is restarted so the new period counts from now.
    pub fn set_period(&mut self, id: TaskId, period: Duration) -> bool {
        if period.is_zero() {
            log::warn!("Rejected zero period for task {:?}", id);
            return false;
        }
        let Some(entry) = self.tasks.get_mut(id) else {
            return false;
        };
        entry.period = period;
        if entry.started {
            self.restart(id);
        }
        true
    }

    /// How many times the task has run
    pub fn run_count(&self, id: TaskId) -> Option<u64> {
        self.tasks.get(id).map(|entry| entry.runs)
    }

    /// Run due tasks now; returns how many ran
    pub fn handle(&mut self) -> usize {
        self.handle_at(Instant::now())
    }

    /// Run every started task whose period has elapsed at `now`
    pub fn handle_at(&mut self, now: Instant) -> usize {
        if let Some(last) = self.last_frame {
            let elapsed = now.saturating_duration_since(last).as_secs_f32();
            if elapsed > 0.0 {
                self.frame_rate = 1.0 / elapsed;
            }
        }
        self.last_frame = Some(now);
        self.frame_count += 1;

        let mut ran = 0;
        for (id, entry) in &mut self.tasks {
            if !entry.started || now.saturating_duration_since(entry.last_run) < entry.period {
                continue;
            }
            entry.last_run = now;
            entry.runs += 1;
            entry.task.execute();
            log::trace!("Timing task {:?} ran ({} total)", id, entry.runs);
            ran += 1;
        }
        ran
    }

    /// Frame rate measured between the last two calls to `handle`
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Number of calls to `handle`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnMut()) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn test_task_runs_once_per_elapsed_period() {
        let mut timing = TimingHandler::new();
        let (count, task) = counter();
        let id = timing.register_task(Duration::from_millis(40), task);
        let start = Instant::now();
        timing.start_at(id, start);

        assert_eq!(timing.handle_at(start + Duration::from_millis(10)), 0);
        assert_eq!(timing.handle_at(start + Duration::from_millis(40)), 1);
        assert_eq!(timing.handle_at(start + Duration::from_millis(60)), 0);
        assert_eq!(timing.handle_at(start + Duration::from_millis(85)), 1);
        assert_eq!(count.get(), 2);
        assert_eq!(timing.run_count(id), Some(2));
        assert_eq!(timing.frame_count(), 4);
    }

    #[test]
    fn test_animator_is_idle_until_started() {
        let mut timing = TimingHandler::new();
        let (count, task) = counter();
        let id = timing.register_animator(task);
        assert_eq!(timing.is_started(id), Some(false));
        assert_eq!(timing.period(id), Some(DEFAULT_PERIOD));

        let later = Instant::now() + Duration::from_secs(1);
        timing.handle_at(later);
        assert_eq!(count.get(), 0);

        assert!(timing.toggle(id));
        assert_eq!(timing.is_started(id), Some(true));
        assert!(timing.toggle(id));
        assert_eq!(timing.is_started(id), Some(false));
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let mut timing = TimingHandler::new();
        let (_, task) = counter();
        let id = timing.register_task(Duration::from_millis(10), task);
        assert!(!timing.set_period(id, Duration::ZERO));
        assert_eq!(timing.period(id), Some(Duration::from_millis(10)));
        assert!(timing.set_period(id, Duration::from_millis(20)));
        assert_eq!(timing.period(id), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_unregistered_task_is_gone() {
        let mut timing = TimingHandler::new();
        let (_, task) = counter();
        let id = timing.register_task(Duration::from_millis(10), task);
        assert!(timing.unregister_task(id));
        assert!(!timing.is_task_registered(id));
        assert!(!timing.start(id));
        assert_eq!(timing.task_count(), 0);
    }
}
