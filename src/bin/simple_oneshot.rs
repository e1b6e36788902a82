// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图片推理
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_live::{
  FromUrl,
  frame::{RgbNhwcFrame, VideoFrame},
  model::{Model, YoloBuilder},
  output::{
    Render,
    draw::{Draw, DrawDetectionOnFrame},
  },
  threshold::ConfidenceThreshold,
};
use tracing::info;

/// 对单张图片执行检测并保存结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图片
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 置信度阈值
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: ConfidenceThreshold,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let model = YoloBuilder::from_url(&args.model)?.build()?;
  let input = shanan_live::input::ImageFileInput::from_url(&args.input)?;
  let output = shanan_live::output::SaveImageFileOutput::from_url(&args.output)?;
  let draw = Draw::default();

  for raw in input {
    let frame = RgbNhwcFrame::try_from(&raw)?;
    info!("开始推理...");
    let now = std::time::Instant::now();
    let result = model.infer(&frame, args.confidence)?;
    info!("推理完成，检测到 {} 个物体，耗时: {:.2?}", result.len(), now.elapsed());
    let annotated = draw.draw_detection(frame, &result);
    output.render_frame(&VideoFrame::from_rgb(&annotated, raw.format())?)?;
  }

  Ok(())
}
