// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/model/labels.rs - 类别标签
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

use std::{path::Path, sync::Arc};

use tracing::debug;

use super::ModelLoadError;

/// COCO 数据集类别名称
const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 模型定义的类别名称表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  names: Arc<[String]>,
}

impl LabelSet {
  pub fn coco() -> Self {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
  }

  /// 从文本文件读取标签，每行一个类别，忽略空行与 `#` 注释
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelLoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|e| ModelLoadError::Labels(format!("{}: {}", path.display(), e)))?;
    let labels = Self::parse(&content);
    if labels.is_empty() {
      return Err(ModelLoadError::Labels(format!(
        "{}: 标签文件为空",
        path.display()
      )));
    }
    debug!("从 {} 读取 {} 个类别标签", path.display(), labels.len());
    Ok(labels)
  }

  pub fn parse(content: &str) -> Self {
    content
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty() && !line.starts_with('#'))
      .map(str::to_string)
      .collect()
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 类别名称；表中没有的类别使用 `class{id}`
  pub fn name(&self, class_id: u32) -> String {
    self
      .names
      .get(class_id as usize)
      .cloned()
      .unwrap_or_else(|| format!("class{}", class_id))
  }
}

impl Default for LabelSet {
  fn default() -> Self {
    Self::coco()
  }
}

impl FromIterator<String> for LabelSet {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().collect(),
    }
  }
}
