// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FormatError, RgbNhwcFrame, VideoFrame},
  output::{Render, draw::ToRgbImage},
};

/// 把每一帧写到同一个图像文件，文件始终是最新一帧
pub struct SaveImageFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("帧格式错误: {0}")]
  FormatError(#[from] FormatError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法解析为本地文件路径: {0}")]
  InvalidPath(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = uri
      .to_file_path()
      .map_err(|_| SaveImageFileError::InvalidPath(uri.to_string()))?;
    Ok(SaveImageFileOutput::new(path))
  }
}

impl SaveImageFileOutput {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_frame(&self, frame: &VideoFrame) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let image = RgbNhwcFrame::try_from(frame)?.to_rgb_image();
    image.save(&self.path)?;

    debug!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}
