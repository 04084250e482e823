//! 索引构建与种子形状搜索的配置。

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// 永不从覆盖计数切换到缺额计数
pub const SWITCH_NEVER: usize = usize::MAX;

/// 派生表构建参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// 并行构建无依赖关系的表时使用的线程数（0 = 全部核心）
    pub num_threads: usize,
    /// 读写表文件时的缓冲区大小（字节）
    pub io_buffer_bytes: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { num_threads: 0, io_buffer_bytes: 1 << 16 }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        if self.io_buffer_bytes == 0 {
            return Err(IndexError::InvalidParameter("io_buffer_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn print(&self) {
        tracing::info!("Build configuration:");
        if self.num_threads == 0 {
            tracing::info!("  num_threads = all available cores");
        } else {
            tracing::info!("  num_threads = {}", self.num_threads);
        }
        tracing::debug!("  io_buffer_bytes = {}", self.io_buffer_bytes);
    }

    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
            .map_err(|e| IndexError::InvalidParameter(format!("failed to create thread pool: {e}")))
    }
}

/// 种子形状搜索参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 覆盖元组数达到该值后才考虑切换到缺额计数；[`SWITCH_NEVER`] 禁用切换
    pub switch_at: usize,
    /// 随机阶段评估的形状个数；`None` 表示 `C(q, d) / 100` 并夹在 `[1, max_samples]`
    pub samples: Option<usize>,
    pub max_samples: usize,
    /// 随机阶段与枚举顺序的种子
    pub seed: u64,
    /// 穷举阶段的线程数（0 = 全部核心）
    pub num_threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { switch_at: 500, samples: None, max_samples: 10, seed: 1717, num_threads: 0 }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_samples == 0 {
            return Err(IndexError::InvalidParameter("max_samples must be positive".into()));
        }
        Ok(())
    }

    /// 给定候选形状总数时随机阶段要评估的个数
    pub fn num_samples(&self, total: usize) -> usize {
        match self.samples {
            Some(n) => n.min(total),
            None => (total / 100).clamp(1, self.max_samples).min(total),
        }
    }

    pub fn print(&self) {
        tracing::info!("Search configuration:");
        if self.switch_at == SWITCH_NEVER {
            tracing::info!("  switch_at = never");
        } else {
            tracing::info!("  switch_at = {}", self.switch_at);
        }
        match self.samples {
            Some(n) => tracing::info!("  samples = {}", n),
            None => tracing::info!("  samples = auto (max {})", self.max_samples),
        }
        tracing::debug!("  seed = {}", self.seed);
        tracing::debug!("  num_threads = {}", self.num_threads);
    }

    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
            .map_err(|e| IndexError::InvalidParameter(format!("failed to create thread pool: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(BuildConfig::default().validate().is_ok());
        let s = SearchConfig::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.switch_at, 500);
        assert_eq!(s.seed, 1717);
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let c = BuildConfig { io_buffer_bytes: 0, ..BuildConfig::default() };
        assert!(matches!(c.validate(), Err(IndexError::InvalidParameter(_))));
    }

    #[test]
    fn automatic_sample_count_is_clamped() {
        let s = SearchConfig::default();
        assert_eq!(s.num_samples(5), 1);
        assert_eq!(s.num_samples(350), 3);
        assert_eq!(s.num_samples(100_000), 10);
        assert_eq!(s.num_samples(0), 0);

        let fixed = SearchConfig { samples: Some(4), ..SearchConfig::default() };
        assert_eq!(fixed.num_samples(2), 2);
        assert_eq!(fixed.num_samples(50), 4);
    }
}
