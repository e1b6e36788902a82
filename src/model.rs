// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/model.rs - 检测模型
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

use std::path::PathBuf;

use thiserror::Error;

use crate::threshold::ConfidenceThreshold;

/// 已加载的检测模型
///
/// `infer` 只读访问模型，实现必须可以在多个线程上并发调用。
pub trait Model: Send + Sync {
  type Input;
  type Output;
  type Error;

  fn infer(
    &self,
    input: &Self::Input,
    threshold: ConfidenceThreshold,
  ) -> Result<Self::Output, Self::Error>;
}

/// 进程启动时一次性加载模型
pub trait ModelLoader {
  type Model: Model;

  fn load(self) -> Result<Self::Model, ModelLoadError>;
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型文件不存在: {}", .0.display())]
  Missing(PathBuf),
  #[error("模型加载错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("模型无效: {path}, 错误: {reason}")]
  Invalid { path: PathBuf, reason: String },
  #[error("不支持的模型输出形状: {0:?}")]
  UnsupportedOutput(Vec<usize>),
  #[error("标签文件错误: {0}")]
  Labels(String),
  #[error("模型 URL 方案错误: {0}")]
  SchemeMismatch(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
  #[error("输入尺寸与模型不兼容: {width}x{height}")]
  InputShape { width: usize, height: usize },
  #[error("推理执行失败: {0}")]
  Runtime(String),
  #[error("模型输出形状异常: {0:?}")]
  OutputShape(Vec<usize>),
}

/// 一个检测到的目标，bbox 为帧像素坐标 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4],
}

impl DetectItem {
  pub fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
  }

  pub fn iou(&self, other: &DetectItem) -> f32 {
    let x1 = self.bbox[0].max(other.bbox[0]);
    let y1 = self.bbox[1].max(other.bbox[1]);
    let x2 = self.bbox[2].min(other.bbox[2]);
    let y2 = self.bbox[3].min(other.bbox[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

/// 一帧的检测结果，顺序仅用于确定绘制顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }

  /// 丢弃置信度严格小于阈值的检测
  pub fn filtered(&self, threshold: ConfidenceThreshold) -> Self {
    self
      .items
      .iter()
      .filter(|item| threshold.accepts(item.score))
      .cloned()
      .collect()
  }
}

impl FromIterator<DetectItem> for DetectResult {
  fn from_iter<I: IntoIterator<Item = DetectItem>>(iter: I) -> Self {
    Self {
      items: iter.into_iter().collect(),
    }
  }
}

/// 按类别的贪心非极大值抑制
///
/// 结果按置信度降序排列，置信度相同时保持输入顺序。
pub fn nms(
  mut candidates: Vec<DetectItem>,
  iou_threshold: f32,
  max_detections: usize,
) -> Vec<DetectItem> {
  // sort_by 为稳定排序
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<DetectItem> = Vec::new();
  for candidate in candidates {
    if kept.len() >= max_detections {
      break;
    }
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) >= iou_threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

pub mod labels;
pub use self::labels::LabelSet;

#[cfg(feature = "model_yolo")]
mod yolo;
#[cfg(feature = "model_yolo")]
pub use self::yolo::{Letterbox, OutputLayout, YoloBuilder, YoloDetector, decode_predictions};

#[cfg(test)]
mod tests {
  use super::*;

  fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id,
      label: format!("class{}", class_id),
      score,
      bbox,
    }
  }

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(0, 0.9, [20.0, 20.0, 30.0, 30.0]);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn nms_suppresses_same_class_overlap() {
    let kept = nms(
      vec![
        item(1, 0.6, [1.0, 1.0, 11.0, 11.0]),
        item(1, 0.9, [0.0, 0.0, 10.0, 10.0]),
      ],
      0.45,
      10,
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].score, 0.9);
  }

  #[test]
  fn nms_keeps_other_classes() {
    let kept = nms(
      vec![
        item(1, 0.9, [0.0, 0.0, 10.0, 10.0]),
        item(2, 0.8, [0.0, 0.0, 10.0, 10.0]),
      ],
      0.45,
      10,
    );
    assert_eq!(kept.len(), 2);
  }

  #[test]
  fn nms_respects_cap() {
    let candidates = (0..5)
      .map(|i| item(0, 0.5, [i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0]))
      .collect();
    assert_eq!(nms(candidates, 0.45, 3).len(), 3);
  }

  #[test]
  fn filtered_drops_strictly_below() {
    let result: DetectResult = vec![
      item(0, 0.5, [0.0, 0.0, 1.0, 1.0]),
      item(0, 0.49, [0.0, 0.0, 1.0, 1.0]),
    ]
    .into_iter()
    .collect();
    let kept = result.filtered(ConfidenceThreshold::new(0.5).unwrap());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept.items[0].score, 0.5);
  }
}
