use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

/// Which end `pop` takes messages from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueOrder {
    /// Oldest message first.
    #[default]
    Fifo,
    /// Most recently pushed message first. Matches the legacy feed.
    Lifo,
}

impl FromStr for QueueOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(QueueOrder::Fifo),
            "lifo" => Ok(QueueOrder::Lifo),
            other => Err(format!("unknown queue order: {}", other)),
        }
    }
}

/// Bounded buffer of progress messages.
///
/// Producers never block: once `capacity` is reached the oldest message is
/// discarded to make room, whatever the pop order.
#[derive(Debug)]
pub struct ProgressQueue {
    messages: Mutex<VecDeque<String>>,
    capacity: usize,
    order: QueueOrder,
}

impl ProgressQueue {
    pub fn new(capacity: usize, order: QueueOrder) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            order,
        }
    }

    /// Appends a message. Returns `true` when an old message was dropped.
    pub fn push(&self, message: impl Into<String>) -> bool {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);

        let mut dropped = false;
        if messages.len() >= self.capacity {
            messages.pop_front();
            dropped = true;
        }
        messages.push_back(message.into());
        drop(messages);

        if dropped {
            warn!("Progress queue full (capacity {}), dropped oldest message", self.capacity);
        }
        dropped
    }

    pub fn pop(&self) -> Option<String> {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        match self.order {
            QueueOrder::Fifo => messages.pop_front(),
            QueueOrder::Lifo => messages.pop_back(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
