//! 间隔种子（spaced seed）形状优化。
//!
//! 形状由跨度 `q` 与一组内部通配位组成（两端总是关心位）。对给定的最大错误数
//! `maxk` 与覆盖要求 `mincov`，[`evaluate_one_shape`] 计算最小窗口长度 `m*_k`：
//! 长度为 `m*_k` 的窗口内任意 `k` 个错误位置，都至少有 `mincov` 个形状放置
//! 完全避开它们（这些放置仍能产生精确种子命中）。
//! [`evaluate_shapes_of_type`] 在给定权重/跨度的全部形状中搜索最优者。

mod counters;
pub mod evaluate;
pub mod matching;
pub mod search;
pub mod shape;

use thiserror::Error;

pub use evaluate::{critical_tuples, evaluate_one_shape, Outcome, ShapeResult, MAX_K, MAX_WINDOW};
pub use matching::min_matching_positions;
pub use search::{evaluate_all_shapes_with_weight, evaluate_shapes_of_type, representative_shape, TypeResult, WeightRow};
pub use shape::Shape;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("invalid shape '{0}': use '#' for care and '_' for wildcard positions, with care positions at both ends")]
    Malformed(String),

    #[error("wildcard offset {offset} is not an interior position of a span-{q} shape")]
    BadWildcard { q: usize, offset: usize },

    #[error("invalid search parameter: {0}")]
    InvalidParameter(String),

    #[error("no {w}/{q} shape converged within {limit} positions")]
    NoConvergence { w: usize, q: usize, limit: usize },
}

/// 二项式系数 C(n, k)；全程整数运算，不会产生浮点误差
pub fn binom(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut b: u128 = 1;
    for i in 0..k {
        b = b.saturating_mul((n - i) as u128) / (i as u128 + 1);
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomials() {
        assert_eq!(binom(5, 0), 1);
        assert_eq!(binom(5, 2), 10);
        assert_eq!(binom(10, 3), 120);
        assert_eq!(binom(3, 4), 0);
        assert_eq!(binom(52, 5), 2_598_960);
        assert!(binom(65_535, 8) > u64::MAX as u128);
    }
}
