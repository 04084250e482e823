use itertools::Itertools;

use super::shape::Shape;

/// 形状在窗口内命中 `r` 次（`r = 0..=occmax`）时至少匹配的文本位置数。
///
/// 放置之间可以重叠，重叠部分的关心位只算一次。枚举最多 `occmax` 个递增位移，
/// 当前匹配数已不优于已知最好结果时剪枝。
pub fn min_matching_positions(shape: &Shape, occmax: usize) -> Vec<usize> {
    let cares = shape.cares();
    let mut search = MatchSearch {
        cares: &cares,
        q: shape.span(),
        occmax,
        best: (0..=occmax).map(|r| r * cares.len()).collect(),
    };
    if occmax > 0 {
        search.visit(&cares, 1, 0);
    }
    search.best
}

struct MatchSearch<'a> {
    cares: &'a [usize],
    q: usize,
    occmax: usize,
    best: Vec<usize>,
}

impl MatchSearch<'_> {
    /// `matches` 升序且无重复，是前 `occs` 次放置（最后一次在 `last_shift`）的并集
    fn visit(&mut self, matches: &[usize], occs: usize, last_shift: usize) {
        let n = matches.len();
        if n < self.best[occs] {
            self.best[occs] = n;
        }
        if occs >= self.occmax || n >= self.best[occs + 1] {
            return;
        }
        // 不重叠的下一次放置不会比已知下界更好，只看 q-1 个重叠位移
        for shift in last_shift + 1..last_shift + self.q {
            let next: Vec<usize> = matches
                .iter()
                .copied()
                .merge(self.cares.iter().map(|&c| c + shift))
                .dedup()
                .collect();
            self.visit(&next, occs + 1, shift);
        }
    }
}
