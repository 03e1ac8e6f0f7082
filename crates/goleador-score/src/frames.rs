//! Frame directories produced by the OCR stage.
//!
//! The OCR stage leaves one text file per analyzed frame, named
//! `<frame><suffix>.txt`. Processing a directory writes two artifacts next
//! to the frame files: [`SCORE_FRAMES_FILE`] with the goal frames, and a
//! caller-named file with one timestamp per line.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info, warn};

use goleador_models::FrameReading;

use crate::error::{ScoreError, ScoreResult};
use crate::extractor::{GoalReport, GoalTimestampExtractor};
use crate::parser::ScoreParser;
use crate::timeline::{FrameOffsets, TimestampFormatter};

/// Goal frames, one per line.
pub const SCORE_FRAMES_FILE: &str = "score-frames.txt";

const FRAME_EXTENSION: &str = ".txt";

/// What a directory entry is, judged by its name.
#[derive(Debug, PartialEq, Eq)]
enum EntryKind {
    Frame(u32),
    /// A file written by [`FrameDirectory::process`]
    Output,
    /// Frame file pattern with a non-numeric prefix
    Unnumbered(String),
    Ignored,
}

/// A directory of per-frame OCR text files.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    dir: PathBuf,
    suffix: String,
}

impl FrameDirectory {
    /// Directory `dir` whose frame files are named `<frame><suffix>.txt`.
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    /// Classify a directory entry by name. `outputs` are the files this
    /// module writes into the directory.
    fn classify(&self, file_name: &str, outputs: &[&str]) -> EntryKind {
        if outputs.contains(&file_name) {
            return EntryKind::Output;
        }
        let Some(stem) = file_name
            .strip_suffix(FRAME_EXTENSION)
            .and_then(|s| s.strip_suffix(self.suffix.as_str()))
        else {
            return EntryKind::Ignored;
        };
        match stem.parse::<u32>() {
            Ok(frame) => EntryKind::Frame(frame),
            Err(_) => EntryKind::Unnumbered(stem.to_string()),
        }
    }

    /// Read every frame file and parse its score, ordered by frame.
    ///
    /// Files whose prefix is not a frame number are skipped with a warning.
    /// [`SCORE_FRAMES_FILE`] is skipped silently.
    pub async fn load_readings(&self, parser: &ScoreParser) -> ScoreResult<Vec<FrameReading>> {
        self.read_frames(parser, &[SCORE_FRAMES_FILE]).await
    }

    async fn read_frames(
        &self,
        parser: &ScoreParser,
        outputs: &[&str],
    ) -> ScoreResult<Vec<FrameReading>> {
        match fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ScoreError::DirectoryNotFound(self.dir.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScoreError::DirectoryNotFound(self.dir.clone()))
            }
            Err(e) => return Err(ScoreError::io(&self.dir, e)),
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| ScoreError::io(&self.dir, e))?;
        let mut readings = BTreeMap::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let frame = match self.classify(file_name, outputs) {
                EntryKind::Frame(frame) => frame,
                EntryKind::Unnumbered(prefix) => {
                    warn!(file = %path.display(), prefix = %prefix, "Skipping file without frame number");
                    continue;
                }
                EntryKind::Output | EntryKind::Ignored => continue,
            };

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ScoreError::io(&path, e))?;
            if !file_type.is_file() {
                continue;
            }

            let bytes = fs::read(&path).await.map_err(|e| ScoreError::io(&path, e))?;
            let text = String::from_utf8_lossy(&bytes);
            let score = parser.find(&text);
            if let Some(score) = &score {
                debug!(frame, score = %score, "Frame score");
            }
            readings.insert(frame, FrameReading::new(frame, score));
        }

        Ok(readings.into_values().collect())
    }

    /// Load the frames, extract goal timestamps and write both output
    /// files.
    ///
    /// [`SCORE_FRAMES_FILE`] is written only when at least one frame file was
    /// found. `out_file_name` is always written, empty when there are no
    /// goals, so a rerun over the same directory sees the same frames.
    pub async fn process<F: TimestampFormatter>(
        &self,
        parser: &ScoreParser,
        extractor: &GoalTimestampExtractor<F>,
        out_file_name: &str,
    ) -> ScoreResult<GoalReport> {
        info!(dir = %self.dir.display(), "Loading scores");
        let readings = self
            .read_frames(parser, &[SCORE_FRAMES_FILE, out_file_name])
            .await?;

        let report = if readings.is_empty() {
            info!(dir = %self.dir.display(), "No scores found");
            GoalReport::default()
        } else {
            let frame_count = readings.len();
            let report = extractor.extract(readings);
            info!(
                dir = %self.dir.display(),
                frames = frame_count,
                goals = report.goal_frames.len(),
                "Found goal timestamps"
            );
            self.write_lines(SCORE_FRAMES_FILE, report.goal_frames.iter())
                .await?;
            report
        };

        self.write_lines(out_file_name, report.timestamps.iter())
            .await?;
        Ok(report)
    }

    async fn write_lines<T: ToString>(
        &self,
        file_name: &str,
        lines: impl Iterator<Item = T>,
    ) -> ScoreResult<()> {
        let body: String = lines.map(|line| line.to_string() + "\n").collect();
        let path = self.dir.join(file_name);
        fs::write(&path, body)
            .await
            .map_err(|e| ScoreError::io(&path, e))
    }
}

/// Process `dir` with the default parser, offsets and one frame per second.
pub async fn process_directory(
    dir: impl Into<PathBuf>,
    suffix: &str,
    out_file_name: &str,
) -> ScoreResult<GoalReport> {
    FrameDirectory::new(dir, suffix)
        .process(
            &ScoreParser::default(),
            &GoalTimestampExtractor::new(FrameOffsets::default()),
            out_file_name,
        )
        .await
}
