//! Broker on Redis Streams.
//!
//! A queue is a stream with one consumer group. Publishing appends an entry
//! with a single `body` field, consuming reads through the group, and
//! acknowledging both acks and deletes the entry so the stream does not
//! grow without bound.
//!
//! Entries a consumer fetched but never acknowledged stay in the group's
//! pending list. A consumer drains its own pending entries once after
//! connecting, and any consumer claims entries that have been idle for
//! `claim_min_idle`, which covers workers that crashed and restarted under
//! a new name.

use std::collections::HashSet;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use tracing::{debug, info, warn};

use crate::broker::{Broker, Delivery};
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};

/// Stream field holding the raw message body.
const BODY_FIELD: &str = "body";

pub struct RedisBroker {
    conn: MultiplexedConnection,
    consumer_group: String,
    consumer_name: String,
    claim_min_idle_ms: u64,
    /// Queues whose pending entries for this consumer have been drained.
    recovered: HashSet<String>,
}

impl RedisBroker {
    /// Open a connection. Fails fast; wrap in [`crate::connect_with_retry`]
    /// to wait for the broker.
    pub async fn connect(config: &QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            consumer_group: config.consumer_group.clone(),
            consumer_name: config.consumer_name.clone(),
            claim_min_idle_ms: config.claim_min_idle.as_millis() as u64,
            recovered: HashSet::new(),
        })
    }

    async fn read_group(&mut self, queue: &str, start: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.consumer_group)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(max)
            .arg("STREAMS")
            .arg(queue)
            .arg(start)
            .query_async(&mut self.conn)
            .await?;

        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        let entries = reply.keys.into_iter().flat_map(|key| key.ids).collect();
        self.deliveries(queue, entries).await
    }

    /// Take over pending entries that no consumer acknowledged within
    /// `claim_min_idle`.
    async fn claim_idle(&mut self, queue: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(queue)
            .arg(&self.consumer_group)
            .arg("IDLE")
            .arg(self.claim_min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(max)
            .query_async(&mut self.conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        for entry in &pending.ids {
            debug!(
                queue = %queue,
                message_id = %entry.id,
                consumer = %entry.consumer,
                deliveries = entry.times_delivered,
                "Claiming idle message"
            );
        }
        let ids: Vec<String> = pending.ids.into_iter().map(|entry| entry.id).collect();

        // XCLAIM checks the idle time again, so a concurrent claim wins once
        let claimed: StreamClaimReply = redis::cmd("XCLAIM")
            .arg(queue)
            .arg(&self.consumer_group)
            .arg(&self.consumer_name)
            .arg(self.claim_min_idle_ms)
            .arg(&ids)
            .query_async(&mut self.conn)
            .await?;

        let deliveries = self.deliveries(queue, claimed.ids).await?;
        if !deliveries.is_empty() {
            info!("Claimed {} idle messages from {}", deliveries.len(), queue);
        }
        Ok(deliveries)
    }

    async fn deliveries(&mut self, queue: &str, entries: Vec<StreamId>) -> QueueResult<Vec<Delivery>> {
        let mut deliveries = Vec::new();
        for entry in entries {
            match entry.map.get(BODY_FIELD) {
                Some(redis::Value::BulkString(body)) => {
                    deliveries.push(Delivery::new(entry.id.clone(), body.clone()));
                }
                _ => {
                    // Deleted or foreign entry: ack it so it is not read again
                    warn!(queue = %queue, message_id = %entry.id, "Dropping stream entry without body");
                    self.ack(queue, &entry.id).await?;
                }
            }
        }
        Ok(deliveries)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn declare_queue(&mut self, queue: &str) -> QueueResult<()> {
        // Start the group at 0 so entries published before the declare are kept
        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(queue)
            .arg(&self.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut self.conn)
            .await;

        match result {
            Ok(_) => info!("Declared queue {} (group {})", queue, self.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Queue {} already declared", queue);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    async fn publish(&mut self, queue: &str, body: &[u8]) -> QueueResult<String> {
        let message_id: String = redis::cmd("XADD")
            .arg(queue)
            .arg("*")
            .arg(BODY_FIELD)
            .arg(body)
            .query_async(&mut self.conn)
            .await?;
        Ok(message_id)
    }

    async fn fetch(&mut self, queue: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        // After a restart, finish what this consumer had taken but not acked
        if !self.recovered.contains(queue) {
            let pending = self.read_group(queue, "0", max).await?;
            if !pending.is_empty() {
                info!("Recovered {} pending messages from {}", pending.len(), queue);
                return Ok(pending);
            }
            self.recovered.insert(queue.to_string());
        }

        let claimed = self.claim_idle(queue, max).await?;
        if !claimed.is_empty() {
            return Ok(claimed);
        }

        self.read_group(queue, ">", max).await
    }

    async fn ack(&mut self, queue: &str, tag: &str) -> QueueResult<()> {
        redis::cmd("XACK")
            .arg(queue)
            .arg(&self.consumer_group)
            .arg(tag)
            .query_async::<()>(&mut self.conn)
            .await?;

        redis::cmd("XDEL")
            .arg(queue)
            .arg(tag)
            .query_async::<()>(&mut self.conn)
            .await?;

        debug!(queue = %queue, message_id = %tag, "Acknowledged message");
        Ok(())
    }
}
