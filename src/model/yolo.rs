// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/model/yolo.rs - 基于 tract 的 YOLO ONNX 检测器
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
  fmt::Display,
  path::{Path, PathBuf},
};

use image::{ImageBuffer, Rgb, RgbImage, imageops};
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNhwcFrame, RgbNhwcFrame},
  model::{
    DetectItem, DetectResult, InferenceError, LabelSet, Model, ModelLoadError, ModelLoader, nms,
  },
  threshold::ConfidenceThreshold,
};

const YOLO_DEFAULT_INPUT_SIZE: u32 = 640;
const YOLO_DEFAULT_IOU_THRESH: f32 = 0.45;
const YOLO_DEFAULT_MAX_DETECTIONS: usize = 300;
const YOLO_PAD_VALUE: u8 = 114;
const YOLO_BOX_ROWS: usize = 4;
/// 端到端输出每行为 x1, y1, x2, y2, score, class
const YOLO_END_TO_END_ROWS: usize = 6;
const YOLO_MAX_FRAME_SIDE: usize = 16384;

type YoloPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn invalid(path: &Path, err: impl Display) -> ModelLoadError {
  ModelLoadError::Invalid {
    path: path.to_path_buf(),
    reason: format!("{:#}", err),
  }
}

/// 输出张量布局
///
/// Ultralytics 导出的 YOLOv8/YOLO11 默认为 `[1, 4 + C, N]`，
/// 部分转换工具会输出转置后的 `[1, N, 4 + C]`。
/// YOLOv10 等免 NMS 模型输出 `[1, N, 6]`，按端到端布局解码。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
  pub rows: usize,
  pub anchors: usize,
  pub transposed: bool,
  pub end_to_end: bool,
}

impl OutputLayout {
  pub fn from_shape(shape: &[usize]) -> Option<Self> {
    if shape.len() != 3 || shape[0] != 1 {
      return None;
    }
    let (a, b) = (shape[1], shape[2]);
    // 候选框数量总是远多于类别数
    let (rows, anchors, transposed) = if a <= b { (a, b, false) } else { (b, a, true) };
    if rows <= YOLO_BOX_ROWS || anchors == 0 {
      return None;
    }
    Some(Self {
      rows,
      anchors,
      transposed,
      end_to_end: transposed && rows == YOLO_END_TO_END_ROWS,
    })
  }

  /// 端到端布局不携带类别分数，返回 `None`
  pub fn num_classes(&self) -> Option<usize> {
    if self.end_to_end {
      None
    } else {
      Some(self.rows - YOLO_BOX_ROWS)
    }
  }

  fn len(&self) -> usize {
    self.rows * self.anchors
  }

  #[inline]
  fn value(&self, data: &[f32], row: usize, anchor: usize) -> f32 {
    if self.transposed {
      data[anchor * self.rows + row]
    } else {
      data[row * self.anchors + anchor]
    }
  }
}

/// 等比缩放并居中填充到正方形模型输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub input_size: u32,
  pub resized_width: u32,
  pub resized_height: u32,
  pub offset_x: u32,
  pub offset_y: u32,
  frame_width: f32,
  frame_height: f32,
}

impl Letterbox {
  pub fn new(frame_width: usize, frame_height: usize, input_size: u32) -> Self {
    let size = input_size as f32;
    let scale = (size / frame_width as f32).min(size / frame_height as f32);
    let resized_width = ((frame_width as f32 * scale).round() as u32).clamp(1, input_size);
    let resized_height = ((frame_height as f32 * scale).round() as u32).clamp(1, input_size);

    Self {
      input_size,
      resized_width,
      resized_height,
      offset_x: (input_size - resized_width) / 2,
      offset_y: (input_size - resized_height) / 2,
      frame_width: frame_width as f32,
      frame_height: frame_height as f32,
    }
  }

  /// 模型输入坐标映射回帧像素坐标，并截断到帧内
  pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
    let scale_x = self.resized_width as f32 / self.frame_width;
    let scale_y = self.resized_height as f32 / self.frame_height;
    let fx = (x - self.offset_x as f32) / scale_x;
    let fy = (y - self.offset_y as f32) / scale_y;
    (
      fx.clamp(0.0, self.frame_width),
      fy.clamp(0.0, self.frame_height),
    )
  }
}

/// 解码 YOLO 输出：每个候选框取最高类别分数，丢弃严格低于阈值的候选，
/// 并把 (cx, cy, w, h) 转为帧像素坐标下的 [x_min, y_min, x_max, y_max]
pub fn decode_predictions(
  data: &[f32],
  layout: OutputLayout,
  letterbox: &Letterbox,
  threshold: ConfidenceThreshold,
  labels: &LabelSet,
) -> Vec<DetectItem> {
  if data.len() < layout.len() {
    warn!(
      "输出数据长度不足: 期望 {}, 实际 {}",
      layout.len(),
      data.len()
    );
    return Vec::new();
  }

  if layout.end_to_end {
    return decode_end_to_end(data, layout, letterbox, threshold, labels);
  }

  let num_classes = layout.rows - YOLO_BOX_ROWS;
  let mut items = Vec::new();
  for anchor in 0..layout.anchors {
    let (score, class_id) = {
      let mut max_score = f32::MIN;
      let mut cls_idx = 0usize;
      for c in 0..num_classes {
        let s = layout.value(data, YOLO_BOX_ROWS + c, anchor);
        if s > max_score {
          max_score = s;
          cls_idx = c;
        }
      }
      (max_score, cls_idx as u32)
    };

    if !valid_score(score) || !threshold.accepts(score) {
      continue;
    }

    let cx = layout.value(data, 0, anchor);
    let cy = layout.value(data, 1, anchor);
    let w = layout.value(data, 2, anchor);
    let h = layout.value(data, 3, anchor);

    let (x_min, y_min) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
    let (x_max, y_max) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

    if x_max <= x_min || y_max <= y_min {
      continue;
    }

    items.push(DetectItem {
      class_id,
      label: labels.name(class_id),
      score,
      bbox: [x_min, y_min, x_max, y_max],
    });
  }

  items
}

fn valid_score(score: f32) -> bool {
  (0.0..=1.0).contains(&score)
}

// 每行已是模型输入坐标下的 [x1, y1, x2, y2, score, class]
fn decode_end_to_end(
  data: &[f32],
  layout: OutputLayout,
  letterbox: &Letterbox,
  threshold: ConfidenceThreshold,
  labels: &LabelSet,
) -> Vec<DetectItem> {
  let mut items = Vec::new();
  for anchor in 0..layout.anchors {
    let score = layout.value(data, 4, anchor);
    let class = layout.value(data, 5, anchor);
    if !valid_score(score) || !threshold.accepts(score) || !class.is_finite() || class < 0.0 {
      continue;
    }

    let corner = |x_row: usize, y_row: usize| {
      letterbox.to_frame(layout.value(data, x_row, anchor), layout.value(data, y_row, anchor))
    };
    let (x_min, y_min) = corner(0, 1);
    let (x_max, y_max) = corner(2, 3);
    if x_max <= x_min || y_max <= y_min {
      continue;
    }

    let class_id = class.round() as u32;
    items.push(DetectItem {
      class_id,
      label: labels.name(class_id),
      score,
      bbox: [x_min, y_min, x_max, y_max],
    });
  }
  items
}

/// 把帧等比缩放、居中填充后打包为 NCHW、归一化到 [0, 1] 的张量
pub fn letterbox_tensor<C>(
  view: &ImageBuffer<Rgb<u8>, C>,
  letterbox: &Letterbox,
) -> tract_ndarray::Array4<f32>
where
  C: std::ops::Deref<Target = [u8]>,
{
  let resized = imageops::resize(
    view,
    letterbox.resized_width,
    letterbox.resized_height,
    imageops::FilterType::Triangle,
  );
  let mut canvas = RgbImage::from_pixel(
    letterbox.input_size,
    letterbox.input_size,
    Rgb([YOLO_PAD_VALUE; 3]),
  );
  imageops::overlay(
    &mut canvas,
    &resized,
    letterbox.offset_x as i64,
    letterbox.offset_y as i64,
  );

  let size = letterbox.input_size as usize;
  let pixels = canvas.as_raw();
  tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
    let idx = (y * size + x) * 3 + channel;
    pixels[idx] as f32 / 255.0
  })
}

pub struct YoloDetector {
  plan: YoloPlan,
  input_size: u32,
  iou_threshold: f32,
  max_detections: usize,
  labels: LabelSet,
}

pub struct YoloBuilder {
  model_path: PathBuf,
  input_size: u32,
  iou_threshold: f32,
  max_detections: usize,
  labels: LabelSet,
}

impl FromUrlWithScheme for YoloBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for YoloBuilder {
  type Error = ModelLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelLoadError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let path = url.to_file_path().map_err(|_| {
      ModelLoadError::SchemeMismatch(format!("无法解析为本地文件路径: {}", url))
    })?;
    Ok(YoloBuilder::new(path))
  }
}

impl YoloBuilder {
  pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
    Self {
      model_path: model_path.into(),
      input_size: YOLO_DEFAULT_INPUT_SIZE,
      iou_threshold: YOLO_DEFAULT_IOU_THRESH,
      max_detections: YOLO_DEFAULT_MAX_DETECTIONS,
      labels: LabelSet::coco(),
    }
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.max_detections = max_detections;
    self
  }

  pub fn labels(mut self, labels: LabelSet) -> Self {
    self.labels = labels;
    self
  }

  pub fn build(self) -> Result<YoloDetector, ModelLoadError> {
    let path = self.model_path;
    info!("加载模型文件: {}", path.display());
    if !path.is_file() {
      return Err(ModelLoadError::Missing(path));
    }
    if self.input_size == 0 {
      return Err(ModelLoadError::Invalid {
        path,
        reason: "模型输入尺寸不能为 0".to_string(),
      });
    }

    let size = self.input_size as usize;
    let plan = tract_onnx::onnx()
      .model_for_path(&path)
      .map_err(|e| invalid(&path, e))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )
      .map_err(|e| invalid(&path, e))?
      .into_optimized()
      .map_err(|e| invalid(&path, e))?
      .into_runnable()
      .map_err(|e| invalid(&path, e))?;
    info!("模型加载完成");

    let output_fact = plan.model().output_fact(0).map_err(|e| invalid(&path, e))?;
    match output_fact.shape.as_concrete() {
      Some(shape) => {
        let layout = OutputLayout::from_shape(shape)
          .ok_or_else(|| ModelLoadError::UnsupportedOutput(shape.to_vec()))?;
        match layout.num_classes() {
          Some(classes) => {
            debug!("模型输出形状: {:?}, 类别数: {}", shape, classes);
            if classes != self.labels.len() {
              warn!(
                "模型类别数 {} 与标签数 {} 不一致, 缺失的类别以编号显示",
                classes,
                self.labels.len()
              );
            }
          }
          None => debug!("模型输出形状: {:?}, 端到端输出, 不执行 NMS", shape),
        }
      }
      None => debug!("模型输出形状未知, 推理时校验"),
    }

    Ok(YoloDetector {
      plan,
      input_size: self.input_size,
      iou_threshold: self.iou_threshold,
      max_detections: self.max_detections,
      labels: self.labels,
    })
  }
}

impl ModelLoader for YoloBuilder {
  type Model = YoloDetector;

  fn load(self) -> Result<Self::Model, ModelLoadError> {
    self.build()
  }
}

impl YoloDetector {
  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn input_size(&self) -> u32 {
    self.input_size
  }

  fn preprocess(&self, frame: &RgbNhwcFrame) -> Result<(Tensor, Letterbox), InferenceError> {
    let (width, height) = (frame.width(), frame.height());
    let shape_error = InferenceError::InputShape { width, height };
    if width == 0 || height == 0 || width > YOLO_MAX_FRAME_SIDE || height > YOLO_MAX_FRAME_SIDE {
      return Err(shape_error);
    }

    let view: ImageBuffer<Rgb<u8>, &[u8]> =
      ImageBuffer::from_raw(width as u32, height as u32, frame.as_nhwc()).ok_or(shape_error)?;

    let letterbox = Letterbox::new(width, height, self.input_size);
    let input = letterbox_tensor(&view, &letterbox);
    Ok((input.into_tensor(), letterbox))
  }
}

impl Model for YoloDetector {
  type Input = RgbNhwcFrame;
  type Output = DetectResult;
  type Error = InferenceError;

  fn infer(
    &self,
    input: &Self::Input,
    threshold: ConfidenceThreshold,
  ) -> Result<Self::Output, Self::Error> {
    let (tensor, letterbox) = self.preprocess(input)?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| InferenceError::Runtime(format!("{:#}", e)))?;

    let output = outputs
      .first()
      .ok_or_else(|| InferenceError::OutputShape(Vec::new()))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(|e| InferenceError::Runtime(format!("{:#}", e)))?;
    let shape = view.shape().to_vec();
    let layout =
      OutputLayout::from_shape(&shape).ok_or_else(|| InferenceError::OutputShape(shape.clone()))?;
    let data: Vec<f32> = view.iter().copied().collect();

    let mut candidates = decode_predictions(&data, layout, &letterbox, threshold, &self.labels);
    let items = if layout.end_to_end {
      candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
      candidates.truncate(self.max_detections);
      candidates
    } else {
      nms(candidates, self.iou_threshold, self.max_detections)
    };
    debug!("检测到 {} 个物体", items.len());

    Ok(items.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  /// 构造 `[1, 4 + C, N]` 布局的输出
  fn channels_first(anchors: &[([f32; 4], Vec<f32>)]) -> (Vec<f32>, OutputLayout) {
    let classes = anchors[0].1.len();
    let rows = YOLO_BOX_ROWS + classes;
    let n = anchors.len();
    let mut data = vec![0.0f32; rows * n];
    for (i, (bbox, scores)) in anchors.iter().enumerate() {
      for r in 0..4 {
        data[r * n + i] = bbox[r];
      }
      for (c, s) in scores.iter().enumerate() {
        data[(YOLO_BOX_ROWS + c) * n + i] = *s;
      }
    }
    // 候选框少于行数时形状推断会判为转置，这里直接指定布局
    let layout = OutputLayout {
      rows,
      anchors: n,
      transposed: false,
      end_to_end: false,
    };
    (data, layout)
  }

  fn identity_letterbox() -> Letterbox {
    Letterbox::new(640, 640, 640)
  }

  #[test]
  fn layout_detection() {
    let layout = OutputLayout::from_shape(&[1, 84, 8400]).unwrap();
    assert!(!layout.transposed);
    assert_eq!(layout.num_classes(), Some(80));

    let layout = OutputLayout::from_shape(&[1, 8400, 84]).unwrap();
    assert!(layout.transposed);
    assert_eq!(layout.num_classes(), Some(80));

    assert!(OutputLayout::from_shape(&[1, 4, 8400]).is_none());
    assert!(OutputLayout::from_shape(&[2, 84, 8400]).is_none());
    assert!(OutputLayout::from_shape(&[84, 8400]).is_none());
  }

  #[test]
  fn letterbox_maps_back_to_frame() {
    // 1280x720 -> 640x360, 上下各填充 140
    let lb = Letterbox::new(1280, 720, 640);
    assert_eq!((lb.resized_width, lb.resized_height), (640, 360));
    assert_eq!((lb.offset_x, lb.offset_y), (0, 140));

    let (x, y) = lb.to_frame(320.0, 320.0);
    assert!((x - 640.0).abs() < 1e-3);
    assert!((y - 360.0).abs() < 1e-3);

    // 填充区域截断到帧边界
    let (_, y) = lb.to_frame(0.0, 10.0);
    assert_eq!(y, 0.0);
  }

  #[test]
  fn decode_picks_best_class_and_converts_box() {
    let (data, layout) = channels_first(&[([100.0, 100.0, 40.0, 20.0], vec![0.1, 0.8, 0.3])]);
    let labels = LabelSet::parse("a\nb\nc");
    let items = decode_predictions(
      &data,
      layout,
      &identity_letterbox(),
      ConfidenceThreshold::new(0.5).unwrap(),
      &labels,
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].class_id, 1);
    assert_eq!(items[0].label, "b");
    assert_eq!(items[0].bbox, [80.0, 90.0, 120.0, 110.0]);
  }

  #[test]
  fn decode_handles_transposed_layout() {
    // [1, N, 4 + C], N = 6, C = 1
    let mut data = vec![0.0f32; 6 * 5];
    data[..5].copy_from_slice(&[100.0, 100.0, 40.0, 20.0, 0.9]);
    data[5..10].copy_from_slice(&[300.0, 300.0, 10.0, 10.0, 0.2]);
    let layout = OutputLayout::from_shape(&[1, 6, 5]).unwrap();
    assert!(layout.transposed);
    let items = decode_predictions(
      &data,
      layout,
      &identity_letterbox(),
      ConfidenceThreshold::new(0.5).unwrap(),
      &LabelSet::coco(),
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "person");
    assert_eq!(items[0].bbox, [80.0, 90.0, 120.0, 110.0]);
  }

  #[test]
  fn higher_threshold_yields_subset() {
    let (data, layout) = channels_first(&[
      ([50.0, 50.0, 20.0, 20.0], vec![0.95, 0.0]),
      ([150.0, 50.0, 20.0, 20.0], vec![0.0, 0.6]),
      ([250.0, 50.0, 20.0, 20.0], vec![0.3, 0.0]),
      ([350.0, 50.0, 20.0, 20.0], vec![0.0, 0.1]),
    ]);
    let labels = LabelSet::coco();
    let lb = identity_letterbox();
    let mut previous: Option<Vec<DetectItem>> = None;
    for t in [0.0, 0.1, 0.3, 0.5, 0.6, 0.9, 1.0] {
      let threshold = ConfidenceThreshold::new(t).unwrap();
      let items = nms(decode_predictions(&data, layout, &lb, threshold, &labels), 0.45, 300);
      assert!(items.iter().all(|i| i.score >= t));
      if let Some(prev) = &previous {
        assert!(items.iter().all(|i| prev.contains(i)));
      }
      previous = Some(items);
    }
  }

  #[test]
  fn end_to_end_output_is_decoded_without_class_scores() {
    let layout = OutputLayout::from_shape(&[1, 300, 6]).unwrap();
    assert!(layout.end_to_end);
    assert_eq!(layout.num_classes(), None);

    let mut data = vec![0.0f32; 300 * 6];
    data[..6].copy_from_slice(&[100.0, 100.0, 200.0, 200.0, 0.9, 41.0]);
    data[6..12].copy_from_slice(&[10.0, 10.0, 20.0, 20.0, 0.1, 0.0]);
    let items = decode_predictions(
      &data,
      layout,
      &identity_letterbox(),
      ConfidenceThreshold::new(0.5).unwrap(),
      &LabelSet::coco(),
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].class_id, 41);
    assert_eq!(items[0].label, "cup");
    assert_eq!(items[0].score, 0.9);
    assert_eq!(items[0].bbox, [100.0, 100.0, 200.0, 200.0]);
  }

  #[test]
  fn scores_outside_unit_range_are_skipped() {
    let (data, layout) = channels_first(&[
      ([100.0, 100.0, 40.0, 20.0], vec![41.0]),
      ([300.0, 300.0, 40.0, 20.0], vec![0.7]),
    ]);
    let items = decode_predictions(
      &data,
      layout,
      &identity_letterbox(),
      ConfidenceThreshold::MIN,
      &LabelSet::coco(),
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].score, 0.7);
  }

  #[test]
  fn letterbox_tensor_is_nchw_with_gray_padding() {
    // 4x2 的纯色帧放入 4x4 输入，上下各填充一行
    let image = RgbImage::from_pixel(4, 2, Rgb([200, 10, 20]));
    let letterbox = Letterbox::new(4, 2, 4);
    assert_eq!((letterbox.offset_x, letterbox.offset_y), (0, 1));

    let tensor = letterbox_tensor(&image, &letterbox);
    assert_eq!(tensor.shape(), &[1, 3, 4, 4]);

    let close = |value: f32, expected: u8| (value - expected as f32 / 255.0).abs() < 1.5 / 255.0;
    for x in 0..4 {
      for channel in 0..3 {
        assert!(close(tensor[[0, channel, 0, x]], YOLO_PAD_VALUE));
        assert!(close(tensor[[0, channel, 3, x]], YOLO_PAD_VALUE));
      }
      assert!(close(tensor[[0, 0, 1, x]], 200));
      assert!(close(tensor[[0, 1, 1, x]], 10));
      assert!(close(tensor[[0, 2, 2, x]], 20));
    }
  }

  #[test]
  fn short_output_decodes_to_nothing() {
    let layout = OutputLayout::from_shape(&[1, 6, 10]).unwrap();
    let items = decode_predictions(
      &[0.0; 5],
      layout,
      &identity_letterbox(),
      ConfidenceThreshold::MIN,
      &LabelSet::coco(),
    );
    assert!(items.is_empty());
  }

  #[test]
  fn missing_model_file() {
    let err = YoloBuilder::new("/nonexistent/dailyobjects.onnx")
      .build()
      .err()
      .unwrap();
    assert!(matches!(err, ModelLoadError::Missing(_)));
  }

  #[test]
  fn corrupted_model_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not an onnx model at all").unwrap();
    let err = YoloBuilder::new(file.path()).build().err().unwrap();
    assert!(matches!(err, ModelLoadError::Invalid { .. }));
  }

  #[test]
  fn from_url_requires_scheme() {
    let url = Url::parse("onnx:///models/dailyobjects.onnx").unwrap();
    let builder = YoloBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, PathBuf::from("/models/dailyobjects.onnx"));

    let url = Url::parse("file:///models/dailyobjects.onnx").unwrap();
    assert!(matches!(
      YoloBuilder::from_url(&url),
      Err(ModelLoadError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn from_url_decodes_escaped_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("日常 物品").join("my model.onnx");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not an onnx model at all").unwrap();

    let url = Url::parse(&format!("onnx://{}", path.display())).unwrap();
    assert!(url.path().contains("%20"));
    let builder = YoloBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, path);
    // 文件存在，失败原因是内容无效而不是路径不存在
    assert!(matches!(builder.build(), Err(ModelLoadError::Invalid { .. })));
  }
}
