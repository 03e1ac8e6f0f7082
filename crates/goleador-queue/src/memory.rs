//! In-process broker.
//!
//! Keeps the same delivery semantics as the Redis broker (durable until
//! acknowledged, redelivered after a reconnect) without a server. Clones
//! share state, so a clone behaves like a second connection to the same
//! broker.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::broker::{Broker, Delivery};
use crate::error::{QueueError, QueueResult};

#[derive(Debug, Default)]
struct MemoryQueue {
    ready: VecDeque<Delivery>,
    in_flight: HashMap<String, Vec<u8>>,
    published: Vec<Vec<u8>>,
    acked: usize,
    seq: u64,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, MemoryQueue>,
    failing_publishes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        // A poisoned lock only means a test thread panicked mid-operation.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `count` publishes fail.
    pub fn fail_next_publishes(&self, count: usize) {
        self.state().failing_publishes = count;
    }

    /// Every body ever published to `queue`, in order.
    pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        self.state()
            .queues
            .get(queue)
            .map(|q| q.published.clone())
            .unwrap_or_default()
    }

    /// Number of acknowledged deliveries on `queue`.
    pub fn acked(&self, queue: &str) -> usize {
        self.state().queues.get(queue).map(|q| q.acked).unwrap_or(0)
    }

    /// Number of fetched but unacknowledged deliveries on `queue`.
    pub fn in_flight(&self, queue: &str) -> usize {
        self.state()
            .queues
            .get(queue)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }

    pub fn is_declared(&self, queue: &str) -> bool {
        self.state().queues.contains_key(queue)
    }

    /// Put every unacknowledged delivery back at the front of its queue,
    /// as happens when a consumer reconnects.
    pub fn requeue_in_flight(&self) {
        let mut state = self.state();
        for queue in state.queues.values_mut() {
            let mut pending: Vec<Delivery> = queue
                .in_flight
                .drain()
                .map(|(tag, body)| Delivery::new(tag, body))
                .collect();
            pending.sort_by(|a, b| b.tag.cmp(&a.tag));
            for delivery in pending {
                queue.ready.push_front(delivery);
            }
        }
    }
}

fn queue_mut<'a>(state: &'a mut BrokerState, queue: &str) -> QueueResult<&'a mut MemoryQueue> {
    state
        .queues
        .get_mut(queue)
        .ok_or_else(|| QueueError::QueueNotDeclared(queue.to_string()))
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_queue(&mut self, queue: &str) -> QueueResult<()> {
        self.state().queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn publish(&mut self, queue: &str, body: &[u8]) -> QueueResult<String> {
        let mut state = self.state();
        if state.failing_publishes > 0 {
            state.failing_publishes -= 1;
            return Err(QueueError::publish_failed(format!("injected failure on {}", queue)));
        }
        let q = queue_mut(&mut state, queue)?;
        q.seq += 1;
        let tag = format!("{:020}", q.seq);
        q.ready.push_back(Delivery::new(tag.clone(), body));
        q.published.push(body.to_vec());
        Ok(tag)
    }

    async fn fetch(&mut self, queue: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let mut state = self.state();
        let q = queue_mut(&mut state, queue)?;
        let mut out = Vec::new();
        while out.len() < max {
            let Some(delivery) = q.ready.pop_front() else {
                break;
            };
            q.in_flight.insert(delivery.tag.clone(), delivery.body.clone());
            out.push(delivery);
        }
        Ok(out)
    }

    async fn ack(&mut self, queue: &str, tag: &str) -> QueueResult<()> {
        let mut state = self.state();
        let q = queue_mut(&mut state, queue)?;
        if q.in_flight.remove(tag).is_none() {
            return Err(QueueError::UnknownDelivery {
                queue: queue.to_string(),
                tag: tag.to_string(),
            });
        }
        q.acked += 1;
        Ok(())
    }
}
