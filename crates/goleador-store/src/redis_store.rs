//! Redis-backed video store.
//!
//! Layout:
//! - `<prefix>:video:<id>` hash with `processing_started_at` (epoch millis),
//!   `times` (comma separated) and `error`
//! - `<prefix>:videos:unprocessed` sorted set of unfinished video ids scored
//!   by processing start (0 when never started)
//!
//! A terminal write removes the id from the sorted set in the same
//! transaction, and start-time updates only touch ids still in it, so a
//! result racing a re-dispatch never resurrects a finished video.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redis::aio::MultiplexedConnection;
use tracing::debug;

use goleador_models::{format_times, parse_times, VideoId, VideoJob};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::VideoStore;

const FIELD_STARTED_AT: &str = "processing_started_at";
const FIELD_TIMES: &str = "times";
const FIELD_ERROR: &str = "error";

#[derive(Clone)]
pub struct RedisVideoStore {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisVideoStore {
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn video_key(&self, video_id: &VideoId) -> String {
        format!("{}:video:{}", self.key_prefix, video_id)
    }

    fn unprocessed_key(&self) -> String {
        format!("{}:videos:unprocessed", self.key_prefix)
    }
}

fn job_from_fields(video_id: &VideoId, fields: HashMap<String, String>) -> StoreResult<VideoJob> {
    let mut job = VideoJob::new(video_id.clone());

    if let Some(raw) = fields.get(FIELD_STARTED_AT) {
        let millis: i64 = raw
            .parse()
            .map_err(|_| StoreError::invalid_record(video_id.as_str(), format!("bad start time '{}'", raw)))?;
        let at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| StoreError::invalid_record(video_id.as_str(), "start time out of range"))?;
        job.mark_dispatched(at);
    }

    if let Some(error) = fields.get(FIELD_ERROR) {
        job.fail(error.clone());
    } else if let Some(raw) = fields.get(FIELD_TIMES) {
        // Stored in the same comma format the workers report
        let times = parse_times(raw).map_err(|e| StoreError::invalid_record(video_id.as_str(), e.to_string()))?;
        job.complete(times);
    }

    Ok(job)
}

#[async_trait]
impl VideoStore for RedisVideoStore {
    async fn register_video(&self, video_id: &VideoId) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let key = self.video_key(video_id);
        let exists: bool = redis::cmd("EXISTS").arg(&key).query_async(&mut conn).await?;
        if exists {
            return Ok(());
        }
        redis::cmd("ZADD")
            .arg(self.unprocessed_key())
            .arg("NX")
            .arg(0)
            .arg(video_id.as_str())
            .query_async::<()>(&mut conn)
            .await?;
        debug!(video_id = %video_id, "Registered video");
        Ok(())
    }

    async fn get(&self, video_id: &VideoId) -> StoreResult<Option<VideoJob>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.video_key(video_id))
            .query_async(&mut conn)
            .await?;

        if fields.is_empty() {
            let score: Option<f64> = redis::cmd("ZSCORE")
                .arg(self.unprocessed_key())
                .arg(video_id.as_str())
                .query_async(&mut conn)
                .await?;
            return Ok(score.map(|_| VideoJob::new(video_id.clone())));
        }

        job_from_fields(video_id, fields).map(Some)
    }

    async fn update_video_times(&self, video_id: &VideoId, times: &[i64]) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let key = self.video_key(video_id);
        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&key)
            .arg(FIELD_TIMES)
            .arg(format_times(times))
            .ignore()
            .cmd("HDEL")
            .arg(&key)
            .arg(FIELD_ERROR)
            .ignore()
            .cmd("ZREM")
            .arg(self.unprocessed_key())
            .arg(video_id.as_str())
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_error(&self, video_id: &VideoId, message: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let key = self.video_key(video_id);
        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&key)
            .arg(FIELD_ERROR)
            .arg(message)
            .ignore()
            .cmd("HDEL")
            .arg(&key)
            .arg(FIELD_TIMES)
            .ignore()
            .cmd("ZREM")
            .arg(self.unprocessed_key())
            .arg(video_id.as_str())
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn unprocessed_videos(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<VideoId>> {
        let mut conn = self.conn.clone();
        // Exclusive upper bound: started strictly before the cutoff
        let ids: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.unprocessed_key())
            .arg("-inf")
            .arg(format!("({}", cutoff.timestamp_millis()))
            .query_async(&mut conn)
            .await?;
        Ok(ids.into_iter().map(VideoId::from).collect())
    }

    async fn update_processing_start_time(
        &self,
        video_id: &VideoId,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let millis = at.timestamp_millis();
        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(self.video_key(video_id))
            .arg(FIELD_STARTED_AT)
            .arg(millis)
            .ignore()
            .cmd("ZADD")
            .arg(self.unprocessed_key())
            .arg("XX")
            .arg(millis)
            .arg(video_id.as_str())
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}
