//! Millisecond timer queue
//!
//! One-shot and repeating timers carrying a payload. The owner advances the
//! clock once per frame and handles whatever fired. Timers due at the same
//! instant fire in registration order.

/// Handle used to cancel a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    due: f64,
    /// Some for repeating timers
    interval: Option<f64>,
    payload: T,
}

/// Timer queue with its own clock
#[derive(Debug, Clone)]
pub struct Timers<T> {
    now: f64,
    next_id: u64,
    timers: Vec<Timer<T>>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 1,
            timers: Vec::new(),
        }
    }

    /// Current clock (ms since creation)
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn push(&mut self, delay_ms: u32, interval: Option<f64>, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + f64::from(delay_ms),
            interval,
            payload,
        });
        id
    }

    /// Fire once after `delay_ms`
    pub fn once(&mut self, delay_ms: u32, payload: T) -> TimerId {
        self.push(delay_ms, None, payload)
    }

    /// Fire every `interval_ms`, first after one interval
    pub fn repeat(&mut self, interval_ms: u32, payload: T) -> TimerId {
        let interval_ms = interval_ms.max(1);
        self.push(interval_ms, Some(f64::from(interval_ms)), payload)
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Milliseconds until the timer next fires, if it is pending
    pub fn due_in(&self, id: TimerId) -> Option<f64> {
        self.timers
            .iter()
            .find(|t| t.id == id)
            .map(|t| (t.due - self.now).max(0.0))
    }
}

impl<T: Clone> Timers<T> {
    /// Advance the clock and return fired payloads in firing order
    pub fn advance(&mut self, dt_ms: f64) -> Vec<T> {
        self.now += dt_ms.max(0.0);
        let mut fired = Vec::new();

        loop {
            // Earliest due timer; ties resolve to the lowest id (registration order)
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= self.now)
                .min_by(|(_, a), (_, b)| {
                    a.due
                        .partial_cmp(&b.due)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.id.0.cmp(&b.id.0))
                })
                .map(|(i, _)| i);

            let Some(i) = next else { break };
            match self.timers[i].interval {
                Some(interval) => {
                    fired.push(self.timers[i].payload.clone());
                    self.timers[i].due += interval;
                }
                None => {
                    let timer = self.timers.swap_remove(i);
                    fired.push(timer.payload);
                }
            }
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_fires_once() {
        let mut timers = Timers::new();
        timers.once(100, "a");
        assert!(timers.advance(99.0).is_empty());
        assert_eq!(timers.advance(1.0), vec!["a"]);
        assert!(timers.advance(1000.0).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_repeat_catches_up() {
        let mut timers = Timers::new();
        timers.repeat(1500, "spawn");
        assert_eq!(timers.advance(4600.0), vec!["spawn", "spawn", "spawn"]);
        assert_eq!(timers.advance(1400.0), vec!["spawn"]);
    }

    #[test]
    fn test_same_instant_fifo() {
        let mut timers = Timers::new();
        timers.once(50, 2);
        timers.once(10, 1);
        timers.once(50, 3);
        assert_eq!(timers.advance(50.0), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel() {
        let mut timers = Timers::new();
        let id = timers.repeat(10, ());
        assert!(timers.is_pending(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(timers.advance(100.0).is_empty());
        assert_eq!(timers.due_in(id), None);
    }

    #[test]
    fn test_due_in_tracks_repeats() {
        let mut timers = Timers::new();
        let id = timers.repeat(1000, ());
        timers.advance(400.0);
        assert_eq!(timers.due_in(id), Some(600.0));
        timers.advance(600.0);
        assert_eq!(timers.due_in(id), Some(1000.0));
    }
}
