use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SWITCH_NEVER;

use super::counters::{Counters, Mode};
use super::shape::Shape;
use super::{binom, ShapeError};

/// 支持的最大错误数（k 元组键为 8 × 16 位）
pub const MAX_K: usize = 8;

/// 最大窗口长度（位置需放进 16 位）
pub const MAX_WINDOW: usize = u16::MAX as usize;

/// 一个形状的评估结果。
///
/// 比较只看 `m*_maxK, …, m*_1`：先比大 k 的窗口，小 k 只用于打破平局。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeResult {
    /// mstars[k-1] = m*_k
    mstars: Vec<usize>,
    switched_at: usize,
    critical: Option<Vec<Vec<usize>>>,
}

impl ShapeResult {
    pub fn maxk(&self) -> usize {
        self.mstars.len()
    }

    /// `m*_maxK`
    pub fn mstar(&self) -> usize {
        self.mstars[self.mstars.len() - 1]
    }

    /// `m*_1 ..= m*_maxK`
    pub fn mstars(&self) -> &[usize] {
        &self.mstars
    }

    pub fn mstar_for(&self, k: usize) -> Option<usize> {
        k.checked_sub(1).and_then(|i| self.mstars.get(i)).copied()
    }

    /// 切换到缺额计数时已覆盖的 maxK 元组数；0 表示未切换
    pub fn switched_at(&self) -> usize {
        self.switched_at
    }

    /// 在 `m*` 处恰好被覆盖 `mincov` 次的 maxK 元组（仅在请求时计算）
    pub fn critical_tuples(&self) -> Option<&[Vec<usize>]> {
        self.critical.as_deref()
    }
}

impl PartialEq for ShapeResult {
    fn eq(&self, other: &Self) -> bool {
        self.mstars == other.mstars
    }
}

impl Eq for ShapeResult {}

impl PartialOrd for ShapeResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShapeResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mstars.iter().rev().cmp(other.mstars.iter().rev())
    }
}

/// 单个形状的评估结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Converged(ShapeResult),
    /// 在达到 `m*` 之前碰到了窗口上限 `last_m`（调用方给定的上限或 [`MAX_WINDOW`]）
    Indeterminate { last_m: usize },
}

impl Outcome {
    pub fn result(&self) -> Option<&ShapeResult> {
        match self {
            Outcome::Converged(r) => Some(r),
            Outcome::Indeterminate { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<ShapeResult> {
        match self {
            Outcome::Converged(r) => Some(r),
            Outcome::Indeterminate { .. } => None,
        }
    }
}

pub(crate) fn check_params(q: usize, maxk: usize, mincov: u32) -> Result<(), ShapeError> {
    if maxk == 0 || maxk > MAX_K {
        return Err(ShapeError::InvalidParameter(format!("maxk must be in 1..={}, got {}", MAX_K, maxk)));
    }
    if mincov == 0 {
        return Err(ShapeError::InvalidParameter("mincov must be positive".into()));
    }
    if q > MAX_WINDOW {
        return Err(ShapeError::InvalidParameter(format!("span {} exceeds the window limit {}", q, MAX_WINDOW)));
    }
    Ok(())
}

/// 逐步增大窗口 m（从 q 开始），求每个 k 的 `m*_k`。
///
/// `last_m` 为上限：到达它仍未收敛则返回 [`Outcome::Indeterminate`]。
/// 覆盖元组足够多（`>= switch_at`，超过总数一半，且不足元组不多于已覆盖元组）时，
/// 所有 k 一起切换到缺额计数；两种表示给出相同的 `m*_k`。
pub fn evaluate_one_shape(
    shape: &Shape,
    maxk: usize,
    mincov: u32,
    last_m: Option<usize>,
    switch_at: usize,
) -> Result<Outcome, ShapeError> {
    evaluate(shape, maxk, mincov, last_m, switch_at, false)
}

/// 不设上限地评估，并报告临界元组（强制使用覆盖计数）
pub fn critical_tuples(shape: &Shape, maxk: usize, mincov: u32) -> Result<Outcome, ShapeError> {
    evaluate(shape, maxk, mincov, None, SWITCH_NEVER, true)
}

fn evaluate(
    shape: &Shape,
    maxk: usize,
    mincov: u32,
    last_m: Option<usize>,
    switch_at: usize,
    report_critical: bool,
) -> Result<Outcome, ShapeError> {
    let q = shape.span();
    check_params(q, maxk, mincov)?;
    let cap = last_m.map_or(MAX_WINDOW, |l| l.min(MAX_WINDOW));

    let mut counters = Counters::new(q, shape.dontcares(), shape.dontcare_mask(), maxk, mincov);
    let mut mstars: Vec<Option<usize>> = vec![None; maxk + 1];
    let mut switched = 0usize;
    let mut m = q;
    loop {
        let minc = counters.advance(m);
        for k in 1..=maxk {
            if mstars[k].is_none() && minc[k] >= mincov {
                mstars[k] = Some(m);
            }
        }
        if mstars[maxk] == Some(m) {
            break;
        }
        if m >= cap {
            debug!(%shape, maxk, mincov, last_m = cap, "window limit reached");
            return Ok(Outcome::Indeterminate { last_m: cap });
        }

        if counters.mode() == Mode::Coverage && !report_critical {
            let covered = counters.len(maxk);
            if covered >= switch_at
                && covered as u128 > binom(m, maxk) / 2
                && counters.num_deficient(m) <= covered as u128
            {
                debug!(%shape, m, covered, "switching to deficiency counters");
                counters.switch_to_deficiency(m);
                switched = covered;
            }
        }
        m += 1;
    }

    let critical = report_critical.then(|| counters.critical());
    let mstars: Vec<usize> = mstars.into_iter().skip(1).map(|s| s.unwrap_or(m)).collect();
    debug!(%shape, ?mstars, switched, "shape evaluated");
    Ok(Outcome::Converged(ShapeResult { mstars, switched_at: switched, critical }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mstars(shape: &str, maxk: usize, mincov: u32, switch_at: usize) -> (Vec<usize>, usize) {
        let shape: Shape = shape.parse().unwrap();
        let r = evaluate_one_shape(&shape, maxk, mincov, None, switch_at)
            .unwrap()
            .into_result()
            .unwrap();
        (r.mstars().to_vec(), r.switched_at())
    }

    #[test]
    fn contiguous_shapes_need_k_plus_one_spans() {
        assert_eq!(mstars("####", 1, 1, SWITCH_NEVER).0, vec![8]);
        assert_eq!(mstars("###", 1, 1, SWITCH_NEVER).0, vec![6]);
        assert_eq!(mstars("###", 2, 1, SWITCH_NEVER).0, vec![6, 9]);
        assert_eq!(mstars("###", 3, 1, SWITCH_NEVER).0, vec![6, 9, 12]);
        assert_eq!(mstars("####", 1, 2, SWITCH_NEVER).0, vec![9]);
    }

    #[test]
    fn wildcard_never_increases_window() {
        let base = mstars("####", 1, 1, SWITCH_NEVER).0;
        for s in ["#_##", "##_#"] {
            let with_wildcard = mstars(s, 1, 1, SWITCH_NEVER).0;
            assert!(with_wildcard <= base, "{} gave {:?}", s, with_wildcard);
        }
        assert_eq!(mstars("#_##", 1, 1, SWITCH_NEVER).0, vec![6]);
        assert_eq!(mstars("##_#", 2, 1, SWITCH_NEVER).0, vec![6, 9]);
    }

    #[test]
    fn counter_switch_gives_identical_windows() {
        let cases: [(&str, usize, u32); 6] = [
            ("###", 2, 1),
            ("#_#_#", 3, 2),
            ("##__#", 3, 2),
            ("#_##_#", 2, 3),
            ("##_#_#", 3, 2),
            ("##_#__###_#__###_#", 2, 1),
        ];
        for (shape, maxk, mincov) in cases {
            let (plain, never) = mstars(shape, maxk, mincov, SWITCH_NEVER);
            assert_eq!(never, 0);
            for switch_at in [1usize, 3, 10, 500] {
                let (adaptive, _) = mstars(shape, maxk, mincov, switch_at);
                assert_eq!(adaptive, plain, "{} maxk={} mincov={} switch_at={}", shape, maxk, mincov, switch_at);
            }
            // 小阈值时确实发生了切换
            assert!(mstars(shape, maxk, mincov, 1).1 > 0, "{} never switched", shape);
        }
        assert_eq!(mstars("###", 2, 1, 1), (vec![6, 9], 9));
        assert_eq!(mstars("#_#_#", 3, 2, 1), (vec![8, 12, 14], 64));
        assert_eq!(mstars("#_##_#", 2, 3, 1).0, vec![12, 16]);
    }

    #[test]
    fn last_m_caps_the_search() {
        let shape: Shape = "#_##".parse().unwrap();
        assert_eq!(
            evaluate_one_shape(&shape, 1, 1, Some(5), 500).unwrap(),
            Outcome::Indeterminate { last_m: 5 }
        );
        let at_cap = evaluate_one_shape(&shape, 1, 1, Some(6), 500).unwrap();
        assert_eq!(at_cap.result().map(ShapeResult::mstar), Some(6));
    }

    #[test]
    fn critical_tuples_reported_on_request() {
        let shape = Shape::contiguous(3).unwrap();
        let r = critical_tuples(&shape, 2, 1).unwrap().into_result().unwrap();
        assert_eq!(r.mstars(), &[6, 9]);
        assert_eq!(r.switched_at(), 0);
        assert_eq!(
            r.critical_tuples().unwrap(),
            &[vec![2, 5], vec![2, 6], vec![3, 6]]
        );
        let plain = evaluate_one_shape(&shape, 2, 1, None, 500).unwrap().into_result().unwrap();
        assert!(plain.critical_tuples().is_none());
    }

    #[test]
    fn results_order_by_largest_k_first() {
        let r = |mstars: Vec<usize>| ShapeResult { mstars, switched_at: 0, critical: None };
        assert!(r(vec![9, 12]) < r(vec![6, 13]));
        assert!(r(vec![6, 12]) < r(vec![7, 12]));
        assert_eq!(r(vec![6, 12]), ShapeResult { mstars: vec![6, 12], switched_at: 5, critical: None });
    }

    #[test]
    fn windows_shorter_than_k_do_not_converge_early() {
        // 跨度 2，k = 3：窗口至少要放下 3 个错误
        assert_eq!(mstars("##", 3, 2, SWITCH_NEVER).0, vec![5, 7, 9]);
        assert_eq!(mstars("##", 3, 2, 1).0, vec![5, 7, 9]);
    }

    #[test]
    fn invalid_parameters() {
        let shape = Shape::contiguous(4).unwrap();
        assert!(evaluate_one_shape(&shape, 0, 1, None, 500).is_err());
        assert!(evaluate_one_shape(&shape, MAX_K + 1, 1, None, 500).is_err());
        assert!(evaluate_one_shape(&shape, 1, 0, None, 500).is_err());
    }
}
