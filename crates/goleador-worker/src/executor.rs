//! Task executor.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn, Instrument};

use goleador_models::{ResultMessage, TaskMessage, VideoId};
use goleador_queue::{Broker, Delivery, SharedChannel, RESULT_QUEUE_NAME, TASK_QUEUE_NAME};
use goleador_score::{
    FrameDirectory, FrameRateFormatter, GoalReport, GoalTimestampExtractor, ScoreParser,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::VideoLogger;
use crate::pipeline::FramePipeline;

/// Consumes task messages one at a time and publishes a result for each.
pub struct JobExecutor<B, P> {
    config: WorkerConfig,
    channel: SharedChannel<B>,
    pipeline: Arc<P>,
    parser: ScoreParser,
    extractor: GoalTimestampExtractor<FrameRateFormatter>,
}

impl<B: Broker, P: FramePipeline> JobExecutor<B, P> {
    pub fn new(config: WorkerConfig, channel: SharedChannel<B>, pipeline: Arc<P>) -> Self {
        let extractor = GoalTimestampExtractor::with_formatter(
            config.offsets,
            FrameRateFormatter::new(config.fps),
        );
        Self {
            config,
            channel,
            pipeline,
            parser: ScoreParser::default(),
            extractor,
        }
    }

    /// Declare both queues and consume tasks forever.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(consumer = %self.config.consumer_name, "Starting job executor");

        self.channel.declare_queue(TASK_QUEUE_NAME).await?;
        self.channel.declare_queue(RESULT_QUEUE_NAME).await?;

        loop {
            match self.poll_once().await {
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    error!("Error consuming tasks: {}", e);
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Take one task, if any, and execute it. Returns the number handled.
    pub async fn poll_once(&self) -> WorkerResult<usize> {
        let deliveries = self.channel.fetch(TASK_QUEUE_NAME, 1).await?;
        let count = deliveries.len();
        for delivery in deliveries {
            self.execute(delivery).await;
        }
        Ok(count)
    }

    /// Process one task and publish its result.
    ///
    /// The task is acknowledged once the result is published. If publishing
    /// fails the task stays pending and is delivered again after the worker
    /// reconnects.
    pub async fn execute(&self, delivery: Delivery) {
        let task = match TaskMessage::parse(&delivery.body) {
            Ok(task) => task,
            Err(e) => {
                // No video id to report against
                error!(tag = %delivery.tag, "Dropping malformed task: {}", e);
                self.ack(&delivery).await;
                return;
            }
        };

        let logger = VideoLogger::new(&task.video_id);
        let result = self
            .process_video(&task.video_id, &logger)
            .instrument(logger.span())
            .await;

        let message = match result {
            Ok(report) => {
                logger.goals_found(&report);
                ResultMessage::ok(task.video_id.clone(), &report.display_offsets())
            }
            Err(e) => {
                logger.failed(&e);
                ResultMessage::error(task.video_id.clone(), e.to_string())
            }
        };

        match self.channel.publish(RESULT_QUEUE_NAME, &message.to_bytes()).await {
            Ok(_) => {
                debug!(result = %message, "Published result");
                self.ack(&delivery).await;
            }
            Err(e) => {
                error!(video_id = %task.video_id, "Failed to publish result: {}", e);
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) {
        if let Err(e) = self.channel.ack(TASK_QUEUE_NAME, &delivery.tag).await {
            error!(tag = %delivery.tag, "Failed to ack task: {}", e);
        }
    }

    async fn process_video(&self, video_id: &VideoId, logger: &VideoLogger) -> WorkerResult<GoalReport> {
        let frames_dir = self.frames_dir(video_id)?;
        logger.extracting_frames(&frames_dir);

        tokio::fs::create_dir_all(&frames_dir).await?;
        let result = self.extract(video_id, &frames_dir, logger).await;

        if !self.config.keep_frames {
            if let Err(e) = tokio::fs::remove_dir_all(&frames_dir).await {
                warn!(dir = %frames_dir.display(), "Failed to remove frame directory: {}", e);
            }
        }

        result
    }

    async fn extract(
        &self,
        video_id: &VideoId,
        frames_dir: &Path,
        logger: &VideoLogger,
    ) -> WorkerResult<GoalReport> {
        self.pipeline.extract_frames(video_id, frames_dir).await?;
        logger.frames_extracted(frames_dir);

        let report = FrameDirectory::new(frames_dir, self.config.frame_suffix.as_str())
            .process(&self.parser, &self.extractor, &self.config.out_file_name)
            .await?;
        Ok(report)
    }

    /// Frame directory for `video_id`. Ids that would escape the work
    /// directory are rejected.
    fn frames_dir(&self, video_id: &VideoId) -> WorkerResult<PathBuf> {
        let id = Path::new(video_id.as_str());
        let mut components = id.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.config.work_dir.join(id)),
            _ => Err(WorkerError::InvalidVideoId(video_id.to_string())),
        }
    }
}
