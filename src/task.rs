// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/task.rs - 任务驱动
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
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::{
  frame::{RgbNhwcFrame, VideoFrame},
  model::{DetectResult, InferenceError, Model},
  output::Render,
  pipeline::{FramePipeline, StatsSnapshot},
  threshold::SharedThreshold,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 取帧结果
#[derive(Debug)]
pub enum SlotTake {
  Frame(VideoFrame),
  Timeout,
  Closed,
}

/// 只保存最新一帧的信箱（接收端）
///
/// 容量为 1 的通道。处理跟不上时，旧帧在进入流水线之前被新帧替换，不排队。
#[derive(Debug)]
pub struct LatestFrameSlot {
  rx: Receiver<VideoFrame>,
  dropped: Arc<AtomicU64>,
}

/// 信箱的发送端，丢弃即关闭
#[derive(Debug)]
pub struct FrameProducer {
  tx: Sender<VideoFrame>,
  // 用于取出尚未被处理的旧帧
  stale: Receiver<VideoFrame>,
  dropped: Arc<AtomicU64>,
}

impl LatestFrameSlot {
  pub fn channel() -> (FrameProducer, LatestFrameSlot) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let dropped = Arc::new(AtomicU64::new(0));
    (
      FrameProducer {
        tx,
        stale: rx.clone(),
        dropped: dropped.clone(),
      },
      LatestFrameSlot { rx, dropped },
    )
  }

  /// 等待最多 `timeout` 取走最新帧；关闭前放入的帧仍然可以取出
  pub fn take_timeout(&self, timeout: Duration) -> SlotTake {
    match self.rx.recv_timeout(timeout) {
      Ok(frame) => SlotTake::Frame(frame),
      Err(RecvTimeoutError::Timeout) => SlotTake::Timeout,
      Err(RecvTimeoutError::Disconnected) => SlotTake::Closed,
    }
  }

  /// 未进入流水线就被丢弃的帧数
  pub fn dropped(&self) -> u64 {
    self.dropped.load(Ordering::Relaxed)
  }
}

impl FrameProducer {
  /// 放入一帧，返回是否替换了尚未取走的旧帧
  pub fn offer(&self, frame: VideoFrame) -> bool {
    let mut frame = frame;
    let mut replaced = false;
    loop {
      match self.tx.try_send(frame) {
        Ok(()) => return replaced,
        Err(TrySendError::Full(back)) => {
          // 旧帧可能刚被处理线程取走，此时无需丢弃
          if self.stale.try_recv().is_ok() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            replaced = true;
          }
          frame = back;
        }
        Err(TrySendError::Disconnected(_)) => {
          self.dropped.fetch_add(1, Ordering::Relaxed);
          return true;
        }
      }
    }
  }

  /// 不再放入新帧，已放入的帧仍可被取出
  pub fn close(self) {}
}

/// 任务结束时的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSummary {
  /// 已输出的帧
  pub rendered: u64,
  /// 因格式错误跳过的帧
  pub skipped: u64,
  /// 进入流水线之前被丢弃的帧
  pub dropped: u64,
  pub stats: StatsSnapshot,
}

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    pipeline: &FramePipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error>;
}

/// 只处理输入的第一帧
#[derive(Debug, Default)]
pub struct OneShotTask {
  threshold: SharedThreshold,
}

impl OneShotTask {
  pub fn with_threshold(mut self, threshold: SharedThreshold) -> Self {
    self.threshold = threshold;
    self
  }
}

impl<I, M, O, RE> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = VideoFrame>,
  M: Model<Input = RgbNhwcFrame, Output = DetectResult, Error = InferenceError>,
  O: Render<Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: &FramePipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!(
      "输入帧获取成功 ({}x{}, {})，开始推理...",
      frame.width(),
      frame.height(),
      frame.format()
    );
    let now = Instant::now();
    let (annotated, result) =
      pipeline.process_frame_with_detections(&frame, self.threshold.snapshot())?;
    info!("推理完成，检测到 {} 个物体，耗时: {:.2?}", result.len(), now.elapsed());
    for item in result.iter() {
      info!(
        "  - {}: {:.2} at [{:.0}, {:.0}, {:.0}, {:.0}]",
        item.label, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
      );
    }
    output.render_frame(&annotated)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(TaskSummary {
      rendered: 1,
      skipped: 0,
      dropped: 0,
      stats: pipeline.stats().snapshot(),
    })
  }
}

/// 持续处理输入流，始终只处理最新的一帧
///
/// 输入在独立线程中读取。
/// 输入耗尽、达到指定帧数或停止标志被置位时结束。
#[derive(Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  stop: Arc<AtomicBool>,
  threshold: SharedThreshold,
  poll_interval: Duration,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      stop: Arc::new(AtomicBool::new(false)),
      threshold: SharedThreshold::default(),
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = stop;
    self
  }

  pub fn with_threshold(mut self, threshold: SharedThreshold) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn stop_flag(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }

  fn should_stop(&self) -> bool {
    self.stop.load(Ordering::Relaxed)
  }
}

impl<I, M, O, RE> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = VideoFrame> + Send,
  M: Model<Input = RgbNhwcFrame, Output = DetectResult, Error = InferenceError>,
  O: Render<Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    pipeline: &FramePipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let (producer, slot) = LatestFrameSlot::channel();
    let finished = AtomicBool::new(false);
    let mut summary = TaskSummary::default();

    let result = thread::scope(|scope| {
      scope.spawn(|| {
        for frame in input {
          if finished.load(Ordering::Relaxed) || self.should_stop() {
            break;
          }
          if producer.offer(frame) {
            debug!("处理未跟上, 丢弃旧帧");
          }
        }
        producer.close();
        debug!("输入结束");
      });

      let result = self.process_loop(&slot, pipeline, &output, &mut summary);
      // 通知读取线程退出，避免 scope 等待
      finished.store(true, Ordering::Relaxed);
      result
    });

    summary.dropped = slot.dropped();
    summary.stats = pipeline.stats().snapshot();
    info!(
      "任务完成，输出 {} 帧，跳过 {} 帧，丢弃 {} 帧",
      summary.rendered, summary.skipped, summary.dropped
    );
    result.map(|_| summary)
  }
}

impl ContinuousTask {
  fn process_loop<M, O, RE>(
    &self,
    slot: &LatestFrameSlot,
    pipeline: &FramePipeline<M>,
    output: &O,
    summary: &mut TaskSummary,
  ) -> anyhow::Result<()>
  where
    M: Model<Input = RgbNhwcFrame, Output = DetectResult, Error = InferenceError>,
    O: Render<Error = RE>,
    RE: std::error::Error + Send + Sync + 'static,
  {
    let mut frame_index = 0usize;
    loop {
      if self.should_stop() {
        warn!("中断信号接收，退出任务循环");
        return Ok(());
      }

      let frame = match slot.take_timeout(self.poll_interval) {
        SlotTake::Frame(frame) => frame,
        SlotTake::Timeout => continue,
        SlotTake::Closed => return Ok(()),
      };
      frame_index += 1;

      // 每帧只读取一次阈值
      let threshold = self.threshold.snapshot();
      let now = Instant::now();
      match pipeline.process_frame_with_detections(&frame, threshold) {
        Ok((annotated, result)) => {
          let elapsed_a = now.elapsed();
          output.render_frame(&annotated)?;
          summary.rendered += 1;
          info!(
            "第 {} 帧: 检测 {} 个 (阈值 {})，耗时: {:.2?} / {:.2?}",
            frame_index,
            result.len(),
            threshold,
            elapsed_a,
            now.elapsed()
          );
        }
        Err(e) => {
          summary.skipped += 1;
          warn!("第 {} 帧格式错误, 跳过: {}", frame_index, e);
        }
      }

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        return Ok(());
      }
    }
  }
}
