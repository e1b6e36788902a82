// 该文件是 Shanan Live （山南西风） 项目的一部分。
// tests/common/mod.rs - 测试用模型与输出
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

#![allow(dead_code)]

use std::{
  collections::HashSet,
  convert::Infallible,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use shanan_live::{
  frame::{PixelFormat, RgbNhwcFrame, VideoFrame},
  model::{DetectItem, DetectResult, InferenceError, Model, ModelLoadError, ModelLoader},
  output::{Render, draw::Draw},
  pipeline::FramePipeline,
  threshold::ConfidenceThreshold,
};

pub const CUP_CLASS: u32 = 41;

pub fn cup(score: f32, bbox: [f32; 4]) -> DetectItem {
  DetectItem {
    class_id: CUP_CLASS,
    label: "cup".to_string(),
    score,
    bbox,
  }
}

/// 每次推理返回同一组检测，指定序号的调用返回推理错误
#[derive(Default)]
pub struct ScriptedModel {
  items: Vec<DetectItem>,
  fail_on: HashSet<usize>,
  calls: AtomicUsize,
}

impl ScriptedModel {
  pub fn new(items: Vec<DetectItem>) -> Self {
    Self {
      items,
      ..Default::default()
    }
  }

  /// 第 `call` 次调用（从 1 开始）失败
  pub fn failing_on(mut self, call: usize) -> Self {
    self.fail_on.insert(call);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Model for ScriptedModel {
  type Input = RgbNhwcFrame;
  type Output = DetectResult;
  type Error = InferenceError;

  fn infer(
    &self,
    _input: &RgbNhwcFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<DetectResult, InferenceError> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if self.fail_on.contains(&call) {
      return Err(InferenceError::Runtime(format!("scripted failure on call {}", call)));
    }
    Ok(
      self
        .items
        .iter()
        .filter(|item| threshold.accepts(item.score))
        .cloned()
        .collect(),
    )
  }
}

/// 总是失败的加载器，同时记录是否被调用
pub struct FailingLoader {
  pub attempted: Arc<AtomicUsize>,
}

impl ModelLoader for FailingLoader {
  type Model = ScriptedModel;

  fn load(self) -> Result<ScriptedModel, ModelLoadError> {
    self.attempted.fetch_add(1, Ordering::SeqCst);
    Err(ModelLoadError::Missing("/models/missing.onnx".into()))
  }
}

pub fn pipeline(model: ScriptedModel) -> FramePipeline<ScriptedModel> {
  FramePipeline::new(Arc::new(model), Draw::default())
}

pub fn black(width: u32, height: u32) -> VideoFrame {
  VideoFrame::filled(width, height, PixelFormat::Bgr24, &[0, 0, 0]).unwrap()
}

/// 把每一帧收集到内存中
#[derive(Default)]
pub struct CollectSink {
  pub frames: Mutex<Vec<VideoFrame>>,
}

impl CollectSink {
  pub fn frames(&self) -> Vec<VideoFrame> {
    self.frames.lock().unwrap().clone()
  }
}

impl Render for CollectSink {
  type Error = Infallible;

  fn render_frame(&self, frame: &VideoFrame) -> Result<(), Infallible> {
    self.frames.lock().unwrap().push(frame.clone());
    Ok(())
  }
}

/// BGR 帧中 (x, y) 处的 RGB 颜色
pub fn rgb_at(frame: &VideoFrame, x: u32, y: u32) -> [u8; 3] {
  let p = frame.pixel(x, y).unwrap();
  match frame.format() {
    PixelFormat::Bgr24 => [p[2], p[1], p[0]],
    _ => [p[0], p[1], p[2]],
  }
}
