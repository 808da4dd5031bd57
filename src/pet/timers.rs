/// Opaque handle to an armed timer. Comparing handles is the only way to
/// tell whose timer fired; a handle never recurs within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
struct Entry {
    deadline_ms: u64,
    id: TimerId,
}

/// Cancellable one-shot timers on a virtual millisecond clock.
///
/// The queue never reads wall time: the owner advances the clock (by the
/// fixed tick period in production, by arbitrary amounts in tests) and
/// drains whatever came due. A fired or cancelled id never fires again.
/// Entries are kept sorted by (deadline, arm order), so draining preserves
/// expiry order.
pub struct TimerQueue {
    now_ms: u64,
    next_id: u64,
    entries: Vec<Entry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            entries: Vec::with_capacity(8),
        }
    }

    /// Current virtual time in milliseconds since construction.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Arm a one-shot timer `delay_ms` from now.
    pub fn arm(&mut self, delay_ms: u64) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline_ms = self.now_ms + delay_ms;
        let at = self
            .entries
            .partition_point(|e| (e.deadline_ms, e.id.0) <= (deadline_ms, id.0));
        self.entries.insert(at, Entry { deadline_ms, id });
        id
    }

    /// Cancel an armed timer. Safe to call with an already fired or
    /// cancelled id.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Advance the clock by `dt_ms` and append every timer that came due to
    /// `fired`, in expiry order. The buffer is caller-owned so the hot path
    /// reuses one allocation.
    pub fn advance(&mut self, dt_ms: u64, fired: &mut Vec<TimerId>) {
        self.now_ms += dt_ms;
        while self
            .entries
            .first()
            .is_some_and(|e| e.deadline_ms <= self.now_ms)
        {
            fired.push(self.entries.remove(0).id);
        }
    }

    /// Number of currently armed timers.
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(q: &mut TimerQueue, dt_ms: u64) -> Vec<TimerId> {
        let mut fired = Vec::new();
        q.advance(dt_ms, &mut fired);
        fired
    }

    #[test]
    fn fires_in_expiry_order() {
        let mut q = TimerQueue::new();
        let slow = q.arm(100);
        let fast = q.arm(50);
        let slow_second = q.arm(100);

        assert_eq!(drain(&mut q, 49), vec![]);
        assert_eq!(drain(&mut q, 1), vec![fast]);
        // Equal deadlines fire in arm order.
        assert_eq!(drain(&mut q, 50), vec![slow, slow_second]);
        assert_eq!(q.live_count(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let a = q.arm(30);
        let b = q.arm(30);
        q.cancel(a);
        assert_eq!(drain(&mut q, 100), vec![b]);
        // Double-cancel and cancel-after-fire are no-ops.
        q.cancel(a);
        q.cancel(b);
        assert_eq!(q.live_count(), 0);
    }

    #[test]
    fn clock_accumulates_across_advances() {
        let mut q = TimerQueue::new();
        let id = q.arm(90);
        assert!(drain(&mut q, 30).is_empty());
        assert!(drain(&mut q, 30).is_empty());
        assert_eq!(drain(&mut q, 30), vec![id]);
        assert_eq!(q.now_ms(), 90);
    }

    #[test]
    fn rearming_yields_fresh_ids() {
        let mut q = TimerQueue::new();
        let first = q.arm(10);
        q.cancel(first);
        let second = q.arm(10);
        assert_ne!(first, second);
        assert_eq!(drain(&mut q, 10), vec![second]);
    }
}
