// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/pipeline.rs - 单帧处理流水线
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{
  frame::{FormatError, RgbNhwcFrame, VideoFrame},
  model::{DetectResult, InferenceError, Model, ModelLoadError, ModelLoader},
  output::draw::{Draw, DrawDetectionOnFrame},
  threshold::ConfidenceThreshold,
};

/// 单帧处理的默认时间预算
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_millis(100);

/// 流水线计数器，可在任意线程读取
#[derive(Debug, Default)]
pub struct PipelineStats {
  frames: AtomicU64,
  annotated: AtomicU64,
  detections: AtomicU64,
  inference_failures: AtomicU64,
  format_failures: AtomicU64,
  over_budget: AtomicU64,
  last_latency_us: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
  pub frames: u64,
  pub annotated: u64,
  pub detections: u64,
  pub inference_failures: u64,
  pub format_failures: u64,
  pub over_budget: u64,
  pub last_latency: Duration,
}

impl PipelineStats {
  pub fn snapshot(&self) -> StatsSnapshot {
    StatsSnapshot {
      frames: self.frames.load(Ordering::Relaxed),
      annotated: self.annotated.load(Ordering::Relaxed),
      detections: self.detections.load(Ordering::Relaxed),
      inference_failures: self.inference_failures.load(Ordering::Relaxed),
      format_failures: self.format_failures.load(Ordering::Relaxed),
      over_budget: self.over_budget.load(Ordering::Relaxed),
      last_latency: Duration::from_micros(self.last_latency_us.load(Ordering::Relaxed)),
    }
  }

  fn bump(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
  }
}

/// 检测并标注一帧：传输格式 -> 内部 RGB -> 推理 -> 绘制 -> 传输格式
///
/// 模型在构造前已经加载完成，流水线本身不持有可变状态，
/// `process_frame` 可以从多个线程同时调用。
pub struct FramePipeline<M> {
  model: Arc<M>,
  draw: Draw,
  frame_budget: Duration,
  stats: PipelineStats,
}

impl<M> FramePipeline<M>
where
  M: Model<Input = RgbNhwcFrame, Output = DetectResult, Error = InferenceError>,
{
  pub fn new(model: Arc<M>, draw: Draw) -> Self {
    Self {
      model,
      draw,
      frame_budget: DEFAULT_FRAME_BUDGET,
      stats: PipelineStats::default(),
    }
  }

  /// 加载模型后构造流水线，加载失败时不会产生流水线
  pub fn load<L>(loader: L, draw: Draw) -> Result<Self, ModelLoadError>
  where
    L: ModelLoader<Model = M>,
  {
    let model = loader.load()?;
    Ok(Self::new(Arc::new(model), draw))
  }

  pub fn with_frame_budget(mut self, frame_budget: Duration) -> Self {
    self.frame_budget = frame_budget;
    self
  }

  pub fn model(&self) -> &Arc<M> {
    &self.model
  }

  pub fn frame_budget(&self) -> Duration {
    self.frame_budget
  }

  pub fn stats(&self) -> &PipelineStats {
    &self.stats
  }

  pub fn process_frame(
    &self,
    raw: &VideoFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<VideoFrame, FormatError> {
    self
      .process_frame_with_detections(raw, threshold)
      .map(|(frame, _)| frame)
  }

  /// 与 `process_frame` 相同，同时返回实际绘制的检测结果
  ///
  /// 推理失败时记录警告并返回未标注的帧，检测结果为空；
  /// 帧格式无法处理时返回 `FormatError`。
  pub fn process_frame_with_detections(
    &self,
    raw: &VideoFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<(VideoFrame, DetectResult), FormatError> {
    let start = Instant::now();
    PipelineStats::bump(&self.stats.frames, 1);

    let frame = match RgbNhwcFrame::try_from(raw) {
      Ok(frame) => frame,
      Err(e) => {
        PipelineStats::bump(&self.stats.format_failures, 1);
        return Err(e);
      }
    };

    let result = match self.model.infer(&frame, threshold) {
      Ok(result) => result.filtered(threshold),
      Err(e) => {
        PipelineStats::bump(&self.stats.inference_failures, 1);
        warn!("推理失败, 输出未标注的帧: {}", e);
        DetectResult::empty()
      }
    };

    let frame = if result.is_empty() {
      frame
    } else {
      PipelineStats::bump(&self.stats.annotated, 1);
      PipelineStats::bump(&self.stats.detections, result.len() as u64);
      self.draw.draw_detection(frame, &result)
    };

    let output = VideoFrame::from_rgb(&frame, raw.format())?;

    let elapsed = start.elapsed();
    self
      .stats
      .last_latency_us
      .store(elapsed.as_micros() as u64, Ordering::Relaxed);
    if elapsed > self.frame_budget {
      PipelineStats::bump(&self.stats.over_budget, 1);
      warn!(
        "单帧处理超出预算: {:.2?} > {:.2?}",
        elapsed, self.frame_budget
      );
    } else {
      debug!("单帧处理完成, 耗时: {:.2?}, 检测 {} 个", elapsed, result.len());
    }

    Ok((output, result))
  }
}
