// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::info;

use crate::{
  frame::RgbNhwcFrame,
  model::{DetectItem, DetectResult},
  output::glyph,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_GLYPH_SCALE: u32 = 2;
const LABEL_TEXT_PADDING: i32 = 2;
const BOX_THICKNESS: u32 = 2;
const PALETTE_SIZE: usize = 80;
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色文本

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  FontIo(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(String),
}

enum LabelFont {
  /// 内置点阵字体
  Builtin { scale: u32 },
  TrueType { font: FontArc, scale: PxScale },
}

impl LabelFont {
  fn text_size(&self, text: &str) -> (u32, u32) {
    match self {
      LabelFont::Builtin { scale } => glyph::text_size(text, *scale),
      LabelFont::TrueType { font, scale } => text_size(*scale, font, text),
    }
  }

  fn draw(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    match self {
      LabelFont::Builtin { scale } => glyph::draw_text(image, color, x, y, *scale, text),
      LabelFont::TrueType { font, scale } => draw_text_mut(image, color, x, y, *scale, font, text),
    }
  }
}

/// 把检测框与标签绘制到 RGB 图像上
pub struct Draw {
  font: LabelFont,
  box_thickness: u32,
  palette: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    // 每个类别一种颜色
    let palette = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font: LabelFont::Builtin {
        scale: LABEL_GLYPH_SCALE,
      },
      box_thickness: BOX_THICKNESS,
      palette,
    }
  }
}

impl Draw {
  /// 使用 TrueType 字体绘制标签
  pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let font = FontVec::try_from_vec(data).map_err(|e| DrawError::InvalidFont(e.to_string()))?;
    info!("加载标签字体: {}", path.display());
    self.font = LabelFont::TrueType {
      font: FontArc::new(font),
      scale: PxScale::from(LABEL_FONT_SIZE),
    };
    Ok(self)
  }

  pub fn with_font_size(mut self, size: f32) -> Self {
    match &mut self.font {
      LabelFont::Builtin { scale } => {
        *scale = (size / glyph::GLYPH_HEIGHT as f32).round().max(1.0) as u32;
      }
      LabelFont::TrueType { scale, .. } => *scale = PxScale::from(size),
    }
    self
  }

  pub fn with_box_thickness(mut self, thickness: u32) -> Self {
    self.box_thickness = thickness.max(1);
    self
  }

  /// 标签文本：类别名与两位小数的置信度
  pub fn label_text(item: &DetectItem) -> String {
    format!("{} {:.2}", item.label, item.score)
  }

  pub fn color_for(&self, class_id: u32) -> Rgb<u8> {
    self.palette[class_id as usize % self.palette.len()]
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    // 先画所有框，再画标签，避免标签被相邻的框覆盖
    let mut labels = Vec::with_capacity(result.len());
    for item in result.iter() {
      let color = self.color_for(item.class_id);
      if let Some((x_min, y_min)) = self.draw_bbox(image, &item.bbox, color) {
        labels.push((x_min, y_min, Self::label_text(item), color));
      }
    }

    for (x_min, y_min, text, color) in labels {
      self.draw_label(image, x_min, y_min, &text, color);
    }
  }

  // bbox 为像素坐标 [x_min, y_min, x_max, y_max]，返回截断后的左上角
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[f32; 4], color: Rgb<u8>) -> Option<(i32, i32)> {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 || bbox.iter().any(|v| !v.is_finite()) {
      return None;
    }

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return None;
    }

    // 向内加粗
    for t in 0..self.box_thickness as i32 {
      let rect_w = x_max - x_min + 1 - 2 * t;
      let rect_h = y_max - y_min + 1 - 2 * t;
      if rect_w <= 0 || rect_h <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(rect_w as u32, rect_h as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    Some((x_min, y_min))
  }

  fn draw_label(&self, image: &mut RgbImage, x_min: i32, y_min: i32, text: &str, color: Rgb<u8>) {
    let w = image.width() as i32;
    let (text_width, text_height) = self.font.text_size(text);
    let label_height = text_height as i32 + 2 * LABEL_TEXT_PADDING;

    // 标签背景位于边框上方，空间不足时贴着图像顶部
    let label_x = x_min.max(0);
    let label_y = (y_min - label_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = (text_width as i32 + 2 * LABEL_TEXT_PADDING).min(max_width);

    if label_width <= 0 || label_height <= 0 {
      return;
    }

    let rect = Rect::at(label_x, label_y).of_size(label_width as u32, label_height as u32);
    draw_filled_rect_mut(image, rect, color);
    self.font.draw(
      image,
      Rgb(TEXT_COLOR),
      label_x + LABEL_TEXT_PADDING,
      label_y + LABEL_TEXT_PADDING,
      text,
    );
  }
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

pub trait ToRgbImage {
  fn to_rgb_image(self) -> RgbImage;
}

pub trait FromRgbImage {
  fn from_rgb_image(image: RgbImage) -> Self;
}

impl ToRgbImage for RgbNhwcFrame {
  fn to_rgb_image(self) -> RgbImage {
    let (width, height) = (self.width() as u32, self.height() as u32);
    // 内存布局一致，直接复用缓冲区
    match RgbImage::from_raw(width, height, self.into_raw()) {
      Some(image) => image,
      None => RgbImage::new(width, height),
    }
  }
}

impl FromRgbImage for RgbNhwcFrame {
  fn from_rgb_image(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    match RgbNhwcFrame::from_raw(width, height, image.into_raw()) {
      Ok(frame) => frame,
      Err(_) => RgbNhwcFrame::with_shape(height as usize, width as usize),
    }
  }
}

pub trait DrawDetectionOnFrame<Frame> {
  fn draw_detection(&self, frame: Frame, result: &DetectResult) -> Frame;
}

impl<F: ToRgbImage + FromRgbImage> DrawDetectionOnFrame<F> for Draw {
  fn draw_detection(&self, frame: F, result: &DetectResult) -> F {
    let mut image = frame.to_rgb_image();
    self.draw_detections_on_image(&mut image, result);
    F::from_rgb_image(image)
  }
}
