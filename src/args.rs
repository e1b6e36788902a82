// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use shanan_live::threshold::ConfidenceThreshold;

/// Shanan Live 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 onnx:///models/dailyobjects.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源，例如 image:///data/cup.jpg?repeat=100&fps=15
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径，例如 image:///tmp/annotated.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 初始置信度阈值 (0.0 - 1.0)，运行中可从标准输入调整
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: ConfidenceThreshold,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每帧最多保留的检测数
  #[arg(long, default_value = "300", value_name = "COUNT")]
  pub max_detections: usize,

  /// 模型输入边长
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub input_size: u32,

  /// 类别标签文件，每行一个；缺省为 COCO 80 类
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 标签字体（TTF/OTF）；缺省使用内置点阵字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 标签字号（像素）
  #[arg(long, value_name = "PIXELS")]
  pub font_size: Option<f32>,

  /// 检测框线宽（像素）
  #[arg(long, default_value = "2", value_name = "PIXELS")]
  pub box_thickness: u32,

  /// 单帧处理预算（毫秒），超出时输出警告
  #[arg(long, default_value = "100", value_name = "MS")]
  pub frame_budget_ms: u64,

  /// 最多处理的帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 只处理第一帧
  #[arg(long)]
  pub oneshot: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let args = Args::try_parse_from([
      "shanan-live",
      "--model",
      "onnx:///models/yolov8n.onnx",
      "--input",
      "image:///data/cup.jpg",
      "--output",
      "image:///tmp/out.png",
    ])
    .unwrap();
    assert_eq!(args.confidence.value(), 0.25);
    assert_eq!(args.iou, 0.45);
    assert_eq!(args.input_size, 640);
    assert_eq!(args.max_detections, 300);
    assert_eq!(args.box_thickness, 2);
    assert!(args.font_size.is_none());
    assert_eq!(args.frame_budget_ms, 100);
    assert!(!args.oneshot);
    assert!(args.labels.is_none());
  }

  #[test]
  fn out_of_range_confidence_is_rejected() {
    let err = Args::try_parse_from([
      "shanan-live",
      "--model",
      "onnx:///m.onnx",
      "--input",
      "image:///a.jpg",
      "--output",
      "image:///b.png",
      "--confidence",
      "1.5",
    ]);
    assert!(err.is_err());
  }
}
