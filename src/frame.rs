// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/frame.rs - 传输帧与内部 RGB 帧定义
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

use std::fmt;

use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// 传输层帧的像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
  /// 3 通道交错，字节顺序 B, G, R（浏览器摄像头流的默认格式）
  Bgr24,
  /// 3 通道交错，字节顺序 R, G, B
  Rgb24,
  Rgba32,
  Bgra32,
  Gray8,
}

impl PixelFormat {
  pub fn channels(&self) -> usize {
    match self {
      PixelFormat::Bgr24 | PixelFormat::Rgb24 => 3,
      PixelFormat::Rgba32 | PixelFormat::Bgra32 => 4,
      PixelFormat::Gray8 => 1,
    }
  }
}

impl fmt::Display for PixelFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      PixelFormat::Bgr24 => "bgr24",
      PixelFormat::Rgb24 => "rgb24",
      PixelFormat::Rgba32 => "rgba",
      PixelFormat::Bgra32 => "bgra",
      PixelFormat::Gray8 => "gray",
    };
    f.write_str(name)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
  #[error("帧尺寸为零: {width}x{height}")]
  EmptyFrame { width: u32, height: u32 },
  #[error("不支持的像素格式 {format}: {channels} 通道, 仅支持 3 通道交错格式")]
  UnsupportedChannels { format: PixelFormat, channels: usize },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("帧尺寸过大: {width}x{height}x{channels}")]
  DimensionOverflow {
    width: u32,
    height: u32,
    channels: usize,
  },
}

fn expected_len(width: u32, height: u32, channels: usize) -> Result<usize, FormatError> {
  if width == 0 || height == 0 {
    return Err(FormatError::EmptyFrame { width, height });
  }
  (width as usize)
    .checked_mul(height as usize)
    .and_then(|v| v.checked_mul(channels))
    .ok_or(FormatError::DimensionOverflow {
      width,
      height,
      channels,
    })
}

/// 传输层交付的一帧图像
///
/// 由传输层为每个摄像头采样创建，帧处理管线只读取它，从不修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
  width: u32,
  height: u32,
  format: PixelFormat,
  data: Box<[u8]>,
}

impl VideoFrame {
  /// 创建一帧并校验长度；不校验通道数，通道数由管线在转换时检查
  pub fn new(
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
  ) -> Result<Self, FormatError> {
    let expected = expected_len(width, height, format.channels())?;
    if data.len() != expected {
      return Err(FormatError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      format,
      data: data.into_boxed_slice(),
    })
  }

  /// 以单一颜色填充的帧，用于占位与测试
  pub fn filled(
    width: u32,
    height: u32,
    format: PixelFormat,
    pixel: &[u8],
  ) -> Result<Self, FormatError> {
    if pixel.len() != format.channels() {
      return Err(FormatError::UnsupportedChannels {
        format,
        channels: pixel.len(),
      });
    }
    let expected = expected_len(width, height, format.channels())?;
    let data = pixel.iter().copied().cycle().take(expected).collect();
    Self::new(width, height, format, data)
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn format(&self) -> PixelFormat {
    self.format
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// 读取 (x, y) 处的像素字节
  pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
    if x >= self.width || y >= self.height {
      return None;
    }
    let channels = self.format.channels();
    let idx = ((y as usize) * (self.width as usize) + (x as usize)) * channels;
    self.data.get(idx..idx + channels)
  }

  /// 转换回传输格式：与 `RgbNhwcFrame::try_from` 互逆
  pub fn from_rgb(frame: &RgbNhwcFrame, format: PixelFormat) -> Result<Self, FormatError> {
    let data = match format {
      PixelFormat::Rgb24 => frame.as_nhwc().to_vec(),
      PixelFormat::Bgr24 => swap_red_blue(frame.as_nhwc()),
      other => {
        return Err(FormatError::UnsupportedChannels {
          format: other,
          channels: other.channels(),
        });
      }
    };
    Self::new(frame.width, frame.height, format, data)
  }
}

fn swap_red_blue(data: &[u8]) -> Vec<u8> {
  let mut output = Vec::with_capacity(data.len());
  for chunk in data.chunks_exact(RGB_CHANNELS) {
    output.push(chunk[2]);
    output.push(chunk[1]);
    output.push(chunk[0]);
  }
  output
}

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

/// 检测器使用的内部表示：3 通道交错 RGB（NHWC, N = 1）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbNhwcFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let size = RGB_CHANNELS * width * height;
    Self {
      width: width as u32,
      height: height as u32,
      data: vec![0u8; size].into_boxed_slice(),
    }
  }

  pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FormatError> {
    let expected = expected_len(width, height, RGB_CHANNELS)?;
    if data.len() != expected {
      return Err(FormatError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn height(&self) -> usize {
    self.height as usize
  }

  pub fn width(&self) -> usize {
    self.width as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn into_raw(self) -> Vec<u8> {
    self.data.into_vec()
  }
}

impl AsMut<[u8]> for RgbNhwcFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

impl TryFrom<&VideoFrame> for RgbNhwcFrame {
  type Error = FormatError;

  /// 仅做通道顺序转换，不缩放、不裁剪
  fn try_from(frame: &VideoFrame) -> Result<Self, Self::Error> {
    let data = match frame.format {
      PixelFormat::Rgb24 => frame.data.to_vec(),
      PixelFormat::Bgr24 => swap_red_blue(&frame.data),
      other => {
        return Err(FormatError::UnsupportedChannels {
          format: other,
          channels: other.channels(),
        });
      }
    };
    Self::from_raw(frame.width, frame.height, data)
  }
}
