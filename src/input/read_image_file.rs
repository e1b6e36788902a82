// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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
  path::Path,
  thread,
  time::{Duration, Instant},
};

use image::ImageReader;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FormatError, PixelFormat, VideoFrame},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Frame format error: {0}")]
  FormatError(#[from] FormatError),
  #[error("Invalid query parameter: {0}")]
  InvalidQuery(String),
  #[error("Not a local file path: {0}")]
  InvalidPath(String),
}

/// 把一张图片当作摄像头：按传输层格式重复产出同一帧
///
/// URL 形如 `image:///path/to/cup.jpg?repeat=30&format=bgr24&fps=15`，
/// `repeat` 缺省为 1，`format` 缺省为 `bgr24`，给出 `fps` 时按该帧率产出。
pub struct ImageFileInput {
  frame: VideoFrame,
  remaining: usize,
  interval: Option<Duration>,
  last: Option<Instant>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let mut repeat = 1usize;
    let mut format = PixelFormat::Bgr24;
    let mut fps = None;
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "repeat" => {
          repeat = value
            .parse()
            .map_err(|_| ImageFileInputError::InvalidQuery(format!("repeat={}", value)))?;
        }
        "fps" => {
          fps = match value.parse::<f32>() {
            Ok(v) if v.is_finite() && v > 0.0 => Some(v),
            _ => return Err(ImageFileInputError::InvalidQuery(format!("fps={}", value))),
          };
        }
        "format" => {
          format = match value.as_ref() {
            "bgr24" => PixelFormat::Bgr24,
            "rgb24" => PixelFormat::Rgb24,
            other => return Err(ImageFileInputError::InvalidQuery(format!("format={}", other))),
          };
        }
        _ => {}
      }
    }

    let path = url
      .to_file_path()
      .map_err(|_| ImageFileInputError::InvalidPath(url.to_string()))?;
    let input = Self::open(path, format, repeat)?;
    Ok(match fps {
      Some(fps) => input.with_fps(fps),
      None => input,
    })
  }
}

impl ImageFileInput {
  pub fn open<P: AsRef<Path>>(
    path: P,
    format: PixelFormat,
    repeat: usize,
  ) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let image = ImageReader::open(path)?.decode()?.to_rgb8();
    let (width, height) = image.dimensions();
    info!(
      "Image input opened: {} ({}x{}, {}, repeat {})",
      path.display(),
      width,
      height,
      format,
      repeat
    );

    let mut data = image.into_raw();
    if format == PixelFormat::Bgr24 {
      for pixel in data.chunks_exact_mut(3) {
        pixel.swap(0, 2);
      }
    }

    Ok(Self {
      frame: VideoFrame::new(width, height, format, data)?,
      remaining: repeat,
      interval: None,
      last: None,
    })
  }

  /// 模拟摄像头帧率
  pub fn with_fps(mut self, fps: f32) -> Self {
    self.interval = Some(Duration::from_secs_f32(1.0 / fps));
    self
  }

  pub fn width(&self) -> u32 {
    self.frame.width()
  }

  pub fn height(&self) -> u32 {
    self.frame.height()
  }
}

impl Iterator for ImageFileInput {
  type Item = VideoFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    if let (Some(interval), Some(last)) = (self.interval, self.last) {
      if let Some(wait) = interval.checked_sub(last.elapsed()) {
        thread::sleep(wait);
      }
    }
    self.last = Some(Instant::now());
    Some(self.frame.clone())
  }
}
