use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::Error;
use crate::geo::Position;

struct FixState {
    best: Option<Position>,
    finished: bool,
    active_providers: usize,
}

/// Collects provider updates for one blocking position request.
///
/// Compare-and-update: a candidate replaces the best fix only when at least
/// as accurate; a candidate meeting the desired accuracy finishes the request
/// immediately. Losing the last active provider finishes it too, with
/// whatever was seen so far.
pub struct SingleFixListener {
    desired_accuracy: f64,
    state: Mutex<FixState>,
    done: Condvar,
}

fn accuracy_of(position: &Position) -> f64 {
    position.accuracy.unwrap_or(f64::MAX)
}

impl SingleFixListener {
    pub fn new(desired_accuracy: f64, active_providers: usize) -> Self {
        Self {
            desired_accuracy,
            state: Mutex::new(FixState { best: None, finished: false, active_providers }),
            done: Condvar::new(),
        }
    }

    /// Offer one candidate fix.
    pub fn offer(&self, position: Position) {
        let mut state = self.state.lock().unwrap();
        if state.finished {
            return;
        }

        let accuracy = accuracy_of(&position);
        let keep = match &state.best {
            None => true,
            Some(best) => accuracy <= accuracy_of(best),
        };
        if keep {
            trace!(accuracy, "retaining candidate fix");
            state.best = Some(position);
        }
        if accuracy <= self.desired_accuracy {
            state.finished = true;
            self.done.notify_all();
        }
    }

    /// A provider stopped delivering. The last one going away ends the wait.
    pub fn provider_disabled(&self) {
        let mut state = self.state.lock().unwrap();
        state.active_providers = state.active_providers.saturating_sub(1);
        if state.active_providers == 0 {
            state.finished = true;
            self.done.notify_all();
        }
    }

    /// Block until the request finishes or the deadline passes; either way
    /// the best fix seen wins, and seeing none is `Unavailable`.
    pub fn wait(&self, timeout: Duration) -> Result<Position, Error> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while !state.finished {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let (next, _) = self.done.wait_timeout(state, remaining).unwrap();
            state = next;
        }
        state.best.take().ok_or(Error::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use std::thread;

    fn fix(accuracy: f64) -> Position {
        Position::new(52.0, 13.0, Utc::now()).with_accuracy(accuracy)
    }

    #[test]
    fn candidate_meeting_desired_accuracy_finishes_immediately() {
        let listener = SingleFixListener::new(50.0, 1);
        listener.offer(fix(20.0));
        let got = listener.wait(Duration::from_millis(1)).unwrap();
        assert_eq!(got.accuracy, Some(20.0));
    }

    #[test]
    fn less_accurate_candidates_never_replace_the_best_fix() {
        let listener = SingleFixListener::new(1.0, 1);
        listener.offer(fix(40.0));
        listener.offer(fix(90.0));
        listener.offer(fix(30.0));
        let got = listener.wait(Duration::from_millis(1)).unwrap();
        assert_eq!(got.accuracy, Some(30.0));
    }

    #[test]
    fn deadline_with_no_fix_is_unavailable() {
        let listener = SingleFixListener::new(1.0, 1);
        assert_eq!(listener.wait(Duration::from_millis(5)), Err(Error::Unavailable));
    }

    #[test]
    fn losing_the_last_provider_ends_the_wait() {
        let listener = Arc::new(SingleFixListener::new(1.0, 2));
        let remote = Arc::clone(&listener);
        let handle = thread::spawn(move || {
            remote.provider_disabled();
            remote.provider_disabled();
        });
        assert_eq!(listener.wait(Duration::from_secs(5)), Err(Error::Unavailable));
        handle.join().unwrap();
    }

    #[test]
    fn updates_after_finish_are_ignored() {
        let listener = SingleFixListener::new(50.0, 1);
        listener.offer(fix(10.0));
        listener.offer(fix(1.0));
        let got = listener.wait(Duration::from_millis(1)).unwrap();
        assert_eq!(got.accuracy, Some(10.0));
    }

    #[test]
    fn cross_thread_fix_wakes_the_waiter() {
        let listener = Arc::new(SingleFixListener::new(50.0, 1));
        let remote = Arc::clone(&listener);
        let handle = thread::spawn(move || remote.offer(fix(5.0)));
        let got = listener.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(got.accuracy, Some(5.0));
        handle.join().unwrap();
    }
}
