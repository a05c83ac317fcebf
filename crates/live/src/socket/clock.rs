// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::socket::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// One-shot timers. A fired timer is reported as [`Signal::Timer`].
pub trait Clock: Send {
    fn set_timer(&mut self, delay: Duration) -> TimerId;
    fn cancel_timer(&mut self, id: TimerId);
}

/// Timers backed by `tokio::time::sleep`.
pub struct TokioClock {
    next_id: u64,
    timers: HashMap<TimerId, AbortHandle>,
    signals: mpsc::UnboundedSender<Signal>,
}

impl TokioClock {
    pub fn new(signals: mpsc::UnboundedSender<Signal>) -> Self {
        Self { next_id: 0, timers: HashMap::new(), signals }
    }
}

impl Clock for TokioClock {
    fn set_timer(&mut self, delay: Duration) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let signals = self.signals.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(Signal::Timer(id));
        });
        self.timers.insert(id, task.abort_handle());
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for handle in self.timers.values() {
            handle.abort();
        }
    }
}
