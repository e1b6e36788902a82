// 该文件是 Shanan Live （山南西风） 项目的一部分。
// src/threshold.rs - 置信度阈值
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
  fmt,
  str::FromStr,
  sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  },
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
  #[error("置信度阈值超出范围 [0, 1]: {0}")]
  OutOfRange(f32),
  #[error("无法解析置信度阈值: {0}")]
  Parse(String),
}

/// 置信度阈值，取值范围 [0, 1]
///
/// 置信度严格小于阈值的检测结果会被丢弃。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
  pub const DEFAULT: ConfidenceThreshold = ConfidenceThreshold(0.25);
  /// 控制面板滑块的步长
  pub const STEP: f32 = 0.05;
  pub const MIN: ConfidenceThreshold = ConfidenceThreshold(0.0);
  pub const MAX: ConfidenceThreshold = ConfidenceThreshold(1.0);

  pub fn new(value: f32) -> Result<Self, ThresholdError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
      return Err(ThresholdError::OutOfRange(value));
    }
    Ok(Self(value))
  }

  /// 超出范围的值截断到 [0, 1]，NaN 视为默认值
  pub fn clamped(value: f32) -> Self {
    if value.is_nan() {
      return Self::DEFAULT;
    }
    Self(value.clamp(Self::MIN.0, Self::MAX.0))
  }

  pub fn value(&self) -> f32 {
    self.0
  }

  pub fn accepts(&self, score: f32) -> bool {
    score >= self.0
  }

  pub fn step_up(&self) -> Self {
    Self::clamped(snap_to_step(self.0 + Self::STEP))
  }

  pub fn step_down(&self) -> Self {
    Self::clamped(snap_to_step(self.0 - Self::STEP))
  }
}

// 消除多次累加步长带来的浮点误差
fn snap_to_step(value: f32) -> f32 {
  (value / ConfidenceThreshold::STEP).round() * ConfidenceThreshold::STEP
}

impl Default for ConfidenceThreshold {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl fmt::Display for ConfidenceThreshold {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.2}", self.0)
  }
}

impl FromStr for ConfidenceThreshold {
  type Err = ThresholdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value: f32 = s
      .trim()
      .parse()
      .map_err(|_| ThresholdError::Parse(s.to_string()))?;
    Self::new(value)
  }
}

/// 进程级共享的置信度阈值
///
/// 控制面板随时写入，帧处理管线在每帧开始时读取一次快照。
/// 只要求最终可见，使用 Relaxed 顺序即可。
#[derive(Debug, Clone)]
pub struct SharedThreshold {
  bits: Arc<AtomicU32>,
}

impl SharedThreshold {
  pub fn new(initial: ConfidenceThreshold) -> Self {
    Self {
      bits: Arc::new(AtomicU32::new(initial.value().to_bits())),
    }
  }

  pub fn snapshot(&self) -> ConfidenceThreshold {
    ConfidenceThreshold(f32::from_bits(self.bits.load(Ordering::Relaxed)))
  }

  pub fn set(&self, threshold: ConfidenceThreshold) {
    self.bits.store(threshold.value().to_bits(), Ordering::Relaxed);
  }

  pub fn step_up(&self) -> ConfidenceThreshold {
    self.update(|t| t.step_up())
  }

  pub fn step_down(&self) -> ConfidenceThreshold {
    self.update(|t| t.step_down())
  }

  // 原子读改写，并发步进不会丢失更新
  fn update<F>(&self, f: F) -> ConfidenceThreshold
  where
    F: Fn(ConfidenceThreshold) -> ConfidenceThreshold,
  {
    let step = |bits: u32| Some(f(ConfidenceThreshold(f32::from_bits(bits))).value().to_bits());
    let previous = match self.bits.fetch_update(Ordering::Relaxed, Ordering::Relaxed, step) {
      Ok(bits) | Err(bits) => bits,
    };
    f(ConfidenceThreshold(f32::from_bits(previous)))
  }
}

impl Default for SharedThreshold {
  fn default() -> Self {
    Self::new(ConfidenceThreshold::DEFAULT)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_out_of_range() {
    assert!(ConfidenceThreshold::new(-0.01).is_err());
    assert!(ConfidenceThreshold::new(1.01).is_err());
    assert!(ConfidenceThreshold::new(f32::NAN).is_err());
    assert!(ConfidenceThreshold::new(0.0).is_ok());
    assert!(ConfidenceThreshold::new(1.0).is_ok());
  }

  #[test]
  fn default_is_quarter() {
    assert_eq!(ConfidenceThreshold::default().value(), 0.25);
    assert_eq!(SharedThreshold::default().snapshot().value(), 0.25);
  }

  #[test]
  fn accepts_equal_score() {
    let t = ConfidenceThreshold::new(0.5).unwrap();
    assert!(t.accepts(0.5));
    assert!(!t.accepts(0.49));
  }

  #[test]
  fn steps_are_clamped() {
    let mut t = ConfidenceThreshold::new(0.9).unwrap();
    for _ in 0..5 {
      t = t.step_up();
    }
    assert_eq!(t.value(), 1.0);

    let mut t = ConfidenceThreshold::new(0.1).unwrap();
    for _ in 0..5 {
      t = t.step_down();
    }
    assert_eq!(t.value(), 0.0);
  }

  #[test]
  fn step_lands_on_grid() {
    let t = ConfidenceThreshold::DEFAULT.step_up().step_up();
    assert!((t.value() - 0.35).abs() < 1e-6);
  }

  #[test]
  fn shared_updates_are_visible_to_clones() {
    let shared = SharedThreshold::default();
    let reader = shared.clone();
    shared.set(ConfidenceThreshold::new(0.7).unwrap());
    assert_eq!(reader.snapshot().value(), 0.7);
    reader.step_down();
    assert!((shared.snapshot().value() - 0.65).abs() < 1e-6);
  }

  #[test]
  fn concurrent_steps_are_not_lost() {
    let shared = SharedThreshold::new(ConfidenceThreshold::MIN);
    let workers: Vec<_> = (0..4)
      .map(|_| {
        let shared = shared.clone();
        std::thread::spawn(move || {
          for _ in 0..4 {
            shared.step_up();
          }
        })
      })
      .collect();
    for worker in workers {
      worker.join().unwrap();
    }
    assert!((shared.snapshot().value() - 0.8).abs() < 1e-6);
  }

  #[test]
  fn parses_from_str() {
    let t: ConfidenceThreshold = "0.45".parse().unwrap();
    assert_eq!(t.value(), 0.45);
    assert!("abc".parse::<ConfidenceThreshold>().is_err());
    assert!("2".parse::<ConfidenceThreshold>().is_err());
  }
}
