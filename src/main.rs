// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{
  io::BufRead,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use shanan_live::{
  FromUrl,
  input::ImageFileInput,
  model::{LabelSet, ModelLoadError, YoloBuilder, YoloDetector},
  output::{SaveImageFileOutput, draw::Draw},
  pipeline::FramePipeline,
  task::{ContinuousTask, OneShotTask, Task},
  threshold::{ConfidenceThreshold, SharedThreshold},
};

fn load_model(args: &args::Args) -> Result<YoloDetector, ModelLoadError> {
  let mut builder = YoloBuilder::from_url(&args.model)?
    .input_size(args.input_size)
    .iou_threshold(args.iou)
    .max_detections(args.max_detections);
  if let Some(path) = &args.labels {
    builder = builder.labels(LabelSet::from_file(path)?);
  }
  builder.build()
}

/// 从标准输入调整阈值：`+` / `-` 步进，数字直接设置
fn spawn_threshold_control(threshold: SharedThreshold) {
  thread::spawn(move || {
    for line in std::io::stdin().lock().lines() {
      let Ok(line) = line else { break };
      let current = match line.trim() {
        "" => continue,
        "+" => threshold.step_up(),
        "-" => threshold.step_down(),
        value => match value.parse::<ConfidenceThreshold>() {
          Ok(t) => {
            threshold.set(t);
            t
          }
          Err(e) => {
            warn!("无法解析阈值 '{}': {}", value, e);
            continue;
          }
        },
      };
      info!("置信度阈值调整为 {}", current);
    }
  });
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence);

  // 模型加载失败时不打开任何输入
  let model = match load_model(&args) {
    Ok(model) => model,
    Err(e) => {
      error!("模型 {} 加载失败, 无法开始处理: {}", args.model, e);
      return Err(e.into());
    }
  };

  info!(
    "模型输入尺寸: {}, 类别数: {}",
    model.input_size(),
    model.labels().len()
  );

  let mut draw = Draw::default().with_box_thickness(args.box_thickness);
  if let Some(font) = &args.font {
    draw = draw.with_font_file(font)?;
  }
  if let Some(size) = args.font_size {
    draw = draw.with_font_size(size);
  }
  let pipeline = FramePipeline::new(Arc::new(model), draw)
    .with_frame_budget(Duration::from_millis(args.frame_budget_ms));

  let input = ImageFileInput::from_url(&args.input)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;
  let threshold = SharedThreshold::new(args.confidence);

  let summary = if args.oneshot {
    OneShotTask::default()
      .with_threshold(threshold)
      .run_task(input, &pipeline, output)?
  } else {
    let stop = Arc::new(AtomicBool::new(false));
    {
      let stop = stop.clone();
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        stop.store(true, Ordering::Relaxed);
      })?;
    }
    spawn_threshold_control(threshold.clone());

    ContinuousTask::default()
      .with_frame_number(args.frame_number)
      .with_stop_flag(stop)
      .with_threshold(threshold)
      .run_task(input, &pipeline, output)?
  };

  let stats = summary.stats;
  info!(
    "处理完成: {} 帧, 标注 {} 帧, 检测 {} 个, 推理失败 {} 次, 超出预算 {} 次",
    stats.frames, stats.annotated, stats.detections, stats.inference_failures, stats.over_budget
  );

  Ok(())
}
