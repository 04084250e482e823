//! 每个 k 的 k 元组计数器，两种表示：
//! - 覆盖计数：元组 → 避开该元组的放置数（只存出现过的元组）
//! - 缺额计数：元组 → `mincov - 覆盖数`（只存仍然不足的元组，降到 0 即删除）
//!
//! k 元组以升序位置打包成 `u128` 键，每个位置 16 位。

use itertools::Itertools;
use rustc_hash::FxHashMap;

use super::binom;

#[inline]
fn push_pos(key: u128, pos: usize) -> u128 {
    (key << 16) | pos as u128
}

fn key_of(positions: &[usize]) -> u128 {
    positions.iter().fold(0u128, |key, &p| push_pos(key, p))
}

pub(crate) fn positions_of(key: u128, k: usize) -> Vec<usize> {
    let mut out: Vec<usize> = (0..k).map(|i| ((key >> (16 * i)) & 0xffff) as usize).collect();
    out.reverse();
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Coverage,
    Deficiency,
}

pub(crate) struct Counters {
    mode: Mode,
    q: usize,
    mincov: u32,
    dontcares: Vec<usize>,
    dc_mask: Vec<bool>,
    /// tables[k]，k = 1..=maxk；下标 0 不用
    tables: Vec<FxHashMap<u128, u32>>,
}

impl Counters {
    pub(crate) fn new(q: usize, dontcares: &[usize], dc_mask: Vec<bool>, maxk: usize, mincov: u32) -> Self {
        Self {
            mode: Mode::Coverage,
            q,
            mincov,
            dontcares: dontcares.to_vec(),
            dc_mask,
            tables: (0..=maxk).map(|_| FxHashMap::default()).collect(),
        }
    }

    fn maxk(&self) -> usize {
        self.tables.len() - 1
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    /// 覆盖模式下出现过的 k 元组个数
    pub(crate) fn len(&self, k: usize) -> usize {
        self.tables[k].len()
    }

    /// 窗口扩展到长度 m 后的每个 k 的最小覆盖数（下标 0 不用）
    pub(crate) fn advance(&mut self, m: usize) -> Vec<u32> {
        match self.mode {
            Mode::Coverage => self.advance_coverage(m),
            Mode::Deficiency => self.advance_deficiency(m),
        }
    }

    /// 最右放置（位移 m-q）避开的位置：它左侧的全部位置及其通配位
    fn avoided_by_last_shift(&self, m: usize) -> Vec<usize> {
        let shift = m - self.q;
        (0..shift).chain(self.dontcares.iter().map(|&d| d + shift)).collect()
    }

    #[inline]
    fn in_last_shift(&self, shift: usize, p: usize) -> bool {
        p < shift || self.dc_mask.get(p - shift).copied().unwrap_or(false)
    }

    /// 新位置 m-1 前的所有放置都避开它，因此 `T ∪ {m-1}` 的计数由 T 继承
    fn append_position(&mut self, m: usize, fill: impl Fn(u32) -> u32) {
        let maxk = self.maxk();
        for k in (2..=maxk).rev() {
            let (lower, upper) = self.tables.split_at_mut(k);
            let (prev, cur) = (&lower[k - 1], &mut upper[0]);
            for (&t, &v) in prev {
                cur.insert(push_pos(t, m - 1), fill(v));
            }
        }
    }

    fn advance_coverage(&mut self, m: usize) -> Vec<u32> {
        let maxk = self.maxk();
        let valm = (m - self.q) as u32;
        self.append_position(m, |v| v.min(valm));
        if valm > 0 {
            self.tables[1].insert((m - 1) as u128, valm);
        }

        let sdc = self.avoided_by_last_shift(m);
        for &p in &sdc {
            *self.tables[1].entry(p as u128).or_insert(0) += 1;
        }
        for k in 2..=maxk {
            let table = &mut self.tables[k];
            for combo in sdc.iter().copied().combinations(k) {
                *table.entry(key_of(&combo)).or_insert(0) += 1;
            }
        }

        let mut minc = vec![0u32; maxk + 1];
        for (k, slot) in minc.iter_mut().enumerate().skip(1) {
            let table = &self.tables[k];
            if !table.is_empty() && table.len() as u128 >= binom(m, k) {
                *slot = table.values().copied().min().unwrap_or(0);
            }
        }
        minc
    }

    fn advance_deficiency(&mut self, m: usize) -> Vec<u32> {
        let maxk = self.maxk();
        let mincov = self.mincov;
        let defim = mincov.saturating_sub((m - self.q) as u32);
        self.append_position(m, |v| v.max(defim));
        if defim > 0 {
            self.tables[1].insert((m - 1) as u128, defim);
        }

        let shift = m - self.q;
        let sdc = self.avoided_by_last_shift(m);
        let mut minc = vec![0u32; maxk + 1];
        for k in 1..=maxk {
            // 缺额元组少时遍历键，否则遍历 sdc 的 k 子集
            let to_reduce: Vec<u128> = if (k * self.tables[k].len()) as u128 <= binom(sdc.len(), k) {
                self.tables[k]
                    .keys()
                    .copied()
                    .filter(|&key| positions_of(key, k).into_iter().all(|p| self.in_last_shift(shift, p)))
                    .collect()
            } else {
                sdc.iter()
                    .copied()
                    .combinations(k)
                    .map(|combo| key_of(&combo))
                    .filter(|key| self.tables[k].contains_key(key))
                    .collect()
            };
            let table = &mut self.tables[k];
            for key in to_reduce {
                match table.get_mut(&key) {
                    Some(v) if *v > 1 => *v -= 1,
                    _ => {
                        table.remove(&key);
                    }
                }
            }
            minc[k] = mincov - table.values().copied().max().unwrap_or(0);
        }
        minc
    }

    /// 覆盖模式下 maxk 元组中仍不足 mincov 的个数（含从未出现的元组）
    pub(crate) fn num_deficient(&self, m: usize) -> u128 {
        let maxk = self.maxk();
        let table = &self.tables[maxk];
        let unseen = binom(m, maxk).saturating_sub(table.len() as u128);
        let low = table.values().filter(|&&v| v < self.mincov).count() as u128;
        unseen + low
    }

    /// 把所有 k 的覆盖计数转换为缺额计数（单向）
    pub(crate) fn switch_to_deficiency(&mut self, m: usize) {
        debug_assert_eq!(self.mode, Mode::Coverage);
        let mincov = self.mincov;
        for k in 1..self.tables.len() {
            let old = &self.tables[k];
            let mut defi = FxHashMap::default();
            for combo in (0..m).combinations(k) {
                let key = key_of(&combo);
                let covered = old.get(&key).copied().unwrap_or(0);
                if covered < mincov {
                    defi.insert(key, mincov - covered);
                }
            }
            self.tables[k] = defi;
        }
        self.mode = Mode::Deficiency;
    }

    /// 覆盖数恰为 mincov 的 maxk 元组（升序）
    pub(crate) fn critical(&self) -> Vec<Vec<usize>> {
        let maxk = self.maxk();
        let mut out: Vec<Vec<usize>> = self.tables[maxk]
            .iter()
            .filter(|&(_, &v)| v == self.mincov)
            .map(|(&key, _)| positions_of(key, maxk))
            .collect();
        out.sort();
        out
    }

    /// 当前表示下 k 元组的计数快照（排序后的 (元组, 值)）
    #[cfg(test)]
    pub(crate) fn snapshot(&self, k: usize) -> Vec<(Vec<usize>, u32)> {
        let mut out: Vec<(Vec<usize>, u32)> =
            self.tables[k].iter().map(|(&key, &v)| (positions_of(key, k), v)).collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Shape;

    fn counters(shape: &Shape, maxk: usize, mincov: u32) -> Counters {
        Counters::new(shape.span(), shape.dontcares(), shape.dontcare_mask(), maxk, mincov)
    }

    #[test]
    fn keys_pack_ascending_positions() {
        let key = key_of(&[3, 17, 65_535]);
        assert_eq!(positions_of(key, 3), vec![3, 17, 65_535]);
        assert_eq!(push_pos(key_of(&[3, 17]), 65_535), key);
        assert_eq!(positions_of(5, 1), vec![5]);
    }

    #[test]
    fn single_errors_of_contiguous_shape() {
        // "###"，m=5：位移 0/1/2 都命中位置 2，所以它不出现在计数中
        let shape = Shape::contiguous(3).unwrap();
        let mut c = counters(&shape, 1, 1);
        for m in 3..=5 {
            c.advance(m);
        }
        assert_eq!(c.snapshot(1), vec![(vec![0], 2), (vec![1], 1), (vec![3], 1), (vec![4], 2)]);
    }

    #[test]
    fn deficiency_tracks_coverage_after_switch() {
        let shape: Shape = "#_#_#".parse().unwrap();
        let (maxk, mincov) = (2usize, 2u32);
        let mut cov = counters(&shape, maxk, mincov);
        let mut defi = counters(&shape, maxk, mincov);
        for m in 5..=9 {
            assert_eq!(cov.advance(m), defi.advance(m));
        }
        defi.switch_to_deficiency(9);
        assert_eq!(defi.mode(), Mode::Deficiency);
        for m in 10..=13 {
            let a = cov.advance(m);
            let b = defi.advance(m);
            for k in 1..=maxk {
                assert_eq!(a[k].min(mincov), b[k], "m={} k={}", m, k);
                let deficient = cov.snapshot(k).iter().filter(|(_, v)| *v < mincov).count() as u128
                    + binom(m, k) - cov.len(k) as u128;
                assert_eq!(defi.len(k) as u128, deficient, "m={} k={}", m, k);
            }
        }
    }

    #[test]
    fn critical_tuples_of_contiguous_shape() {
        let shape = Shape::contiguous(3).unwrap();
        let mut c = counters(&shape, 2, 1);
        for m in 3..=9 {
            c.advance(m);
        }
        assert_eq!(c.critical(), vec![vec![2, 5], vec![2, 6], vec![3, 6]]);
    }
}
