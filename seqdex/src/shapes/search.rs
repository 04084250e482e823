//! 在给定权重 w 与跨度 q 的全部形状中搜索最优者。
//!
//! 先随机评估少量形状，得到 `lastM` 的初始上界；再以随机顺序穷举所有内部通配位组合，
//! 并行评估，共享上界只会通过 `fetch_min` 降低。超过上界的形状以 Indeterminate 提前结束。

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SearchConfig;

use super::evaluate::{check_params, evaluate_one_shape, Outcome, ShapeResult, MAX_WINDOW};
use super::matching::min_matching_positions;
use super::shape::Shape;
use super::{binom, ShapeError};

/// 某个形状类型 w/q 的搜索结果
#[derive(Debug, Clone)]
pub struct TypeResult {
    pub best: ShapeResult,
    /// 与 `best` 同等最优的全部形状（升序）
    pub shapes: Vec<Shape>,
    /// 穷举阶段在上界内收敛的形状数
    pub evaluated: usize,
    /// 其中切换过计数表示的形状数
    pub switches: usize,
}

fn unbounded(m: usize) -> Option<usize> {
    (m != usize::MAX).then_some(m)
}

fn check_type(w: usize, q: usize) -> Result<usize, ShapeError> {
    if w == 0 || w > q {
        return Err(ShapeError::InvalidParameter(format!("weight {} does not fit span {}", w, q)));
    }
    let d = q - w;
    if d > 0 && d + 2 > q {
        return Err(ShapeError::InvalidParameter(format!(
            "a span-{} shape has no room for {} interior wildcards",
            q, d
        )));
    }
    Ok(d)
}

/// 评估权重 w、跨度 q 的全部形状，返回最优结果与所有同等最优的形状
pub fn evaluate_shapes_of_type(
    w: usize,
    q: usize,
    maxk: usize,
    mincov: u32,
    config: &SearchConfig,
) -> Result<TypeResult, ShapeError> {
    let d = check_type(w, q)?;
    check_params(q, maxk, mincov)?;
    config.validate().map_err(|e| ShapeError::InvalidParameter(e.to_string()))?;

    let interior: Vec<usize> = (1..q.saturating_sub(1)).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);

    // 随机阶段：压低上界
    let total = usize::try_from(binom(q, d)).unwrap_or(usize::MAX);
    let samples = config.num_samples(total);
    let mut last_m: Option<usize> = None;
    for _ in 0..samples {
        let dontcares = rand::seq::index::sample(&mut rng, interior.len(), d).into_iter().map(|i| i + 1);
        let shape = Shape::new(q, dontcares)?;
        if let Outcome::Converged(r) = evaluate_one_shape(&shape, maxk, mincov, last_m, config.switch_at)? {
            last_m = Some(r.mstar());
        }
    }
    debug!(w, q, samples, ?last_m, "random phase finished");

    // 穷举阶段
    let mut order = interior;
    order.shuffle(&mut rng);
    let bound = AtomicUsize::new(last_m.unwrap_or(usize::MAX));
    let pool = config.thread_pool().map_err(|e| ShapeError::InvalidParameter(e.to_string()))?;
    let converged = pool.install(|| {
        order
            .iter()
            .copied()
            .combinations(d)
            .par_bridge()
            .map(|dontcares| {
                let shape = Shape::new(q, dontcares)?;
                let cap = unbounded(bound.load(Ordering::Relaxed));
                let outcome = evaluate_one_shape(&shape, maxk, mincov, cap, config.switch_at)?;
                Ok(outcome.into_result().map(|r| {
                    bound.fetch_min(r.mstar(), Ordering::Relaxed);
                    (shape, r)
                }))
            })
            .collect::<Result<Vec<Option<(Shape, ShapeResult)>>, ShapeError>>()
    })?;

    let mut best: Option<ShapeResult> = None;
    let mut shapes = Vec::new();
    let (mut evaluated, mut switches) = (0usize, 0usize);
    for (shape, r) in converged.into_iter().flatten() {
        evaluated += 1;
        if r.switched_at() != 0 {
            switches += 1;
        }
        match best.as_ref().map(|b| r.cmp(b)) {
            None | Some(CmpOrdering::Less) => {
                best = Some(r);
                shapes = vec![shape];
            }
            Some(CmpOrdering::Equal) => shapes.push(shape),
            Some(CmpOrdering::Greater) => {}
        }
    }
    let best = best.ok_or(ShapeError::NoConvergence { w, q, limit: MAX_WINDOW })?;
    shapes.sort();

    info!(
        "{}/{} maxk={} mincov={}: m*={:?}, {} optimal shapes ({} converged, {} switched)",
        w,
        q,
        maxk,
        mincov,
        best.mstars(),
        shapes.len(),
        evaluated,
        switches
    );
    Ok(TypeResult { best, shapes, evaluated, switches })
}

/// 同等最优形状中，命中 `mincov` 次时匹配位置最多的一个（并列时取最小者）
pub fn representative_shape(shapes: &[Shape], mincov: u32) -> Option<(Shape, usize)> {
    let occmax = mincov as usize;
    let mut chosen: Option<(Shape, usize)> = None;
    for shape in shapes.iter().sorted() {
        let matches = min_matching_positions(shape, occmax)[occmax];
        if chosen.as_ref().map_or(true, |&(_, most)| matches > most) {
            chosen = Some((shape.clone(), matches));
        }
    }
    chosen
}

/// 固定权重下某个跨度的一行结果
#[derive(Debug, Clone)]
pub struct WeightRow {
    pub w: usize,
    pub q: usize,
    pub maxk: usize,
    pub mincov: u32,
    pub best: ShapeResult,
    pub shapes: Vec<Shape>,
    pub representative: Shape,
    /// 代表形状命中 `mincov` 次时的最少匹配位置数
    pub matches: usize,
}

impl WeightRow {
    pub fn d(&self) -> usize {
        self.q - self.w
    }
}

impl fmt::Display for WeightRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mstars = self.best.mstars().iter().rev().join("  ");
        write!(
            f,
            "{}  {}  {}    {}  {}    {}  {}    {} shapes, {} matches",
            self.w,
            self.q,
            self.d(),
            self.maxk,
            self.mincov,
            mstars,
            self.representative,
            self.shapes.len(),
            self.matches
        )
    }
}

/// 依次评估跨度 `q = w + d`（`d = dstart..=dstop`）的形状类型
pub fn evaluate_all_shapes_with_weight(
    w: usize,
    maxk: usize,
    mincov: u32,
    dstart: usize,
    dstop: usize,
    config: &SearchConfig,
) -> Result<Vec<WeightRow>, ShapeError> {
    if dstart > dstop {
        return Err(ShapeError::InvalidParameter(format!("empty wildcard range {}..={}", dstart, dstop)));
    }
    let mut rows = Vec::with_capacity(dstop - dstart + 1);
    for d in dstart..=dstop {
        let q = w + d;
        let result = evaluate_shapes_of_type(w, q, maxk, mincov, config)?;
        let (representative, matches) = representative_shape(&result.shapes, mincov)
            .ok_or(ShapeError::NoConvergence { w, q, limit: MAX_WINDOW })?;
        let row = WeightRow {
            w,
            q,
            maxk,
            mincov,
            best: result.best,
            shapes: result.shapes,
            representative,
            matches,
        };
        info!("{}", row);
        rows.push(row);
    }
    Ok(rows)
}
