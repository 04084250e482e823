//! 后缀排序：特殊字母感知的后缀比较、后继表，以及默认的倍增排序实现。
//!
//! 排序规则：逐符号比较编码；相同的常规字母继续比较；相同的特殊字母
//! （分隔符、N 等）按绝对位置排序，且公共前缀在此截止；先到达文本末尾的后缀更小。

use std::cmp::Ordering;
use std::path::Path;

use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};

use super::table_io;

/// 后继表中"没有后继"的标记
pub const NONE: u32 = u32::MAX;

/// 从偏移 `skip` 开始比较后缀 `p` 与 `q`，返回顺序与公共前缀长度。
///
/// 调用方需保证两个后缀的前 `skip` 个符号相同。
pub fn suffix_cmp(text: &[u8], alphabet: &Alphabet, p: usize, q: usize, skip: usize) -> (Ordering, usize) {
    let n = text.len();
    if p == q {
        return (Ordering::Equal, n.saturating_sub(p));
    }
    let mut l = skip;
    loop {
        let (i, j) = (p + l, q + l);
        match (i < n, j < n) {
            (false, false) => return (q.cmp(&p), l),
            (false, true) => return (Ordering::Less, l),
            (true, false) => return (Ordering::Greater, l),
            (true, true) => {}
        }
        let (a, b) = (text[i], text[j]);
        if a != b {
            return (a.cmp(&b), l);
        }
        if alphabet.is_special(a) {
            return (p.cmp(&q), l);
        }
        l += 1;
    }
}

/// 后继表：`next[p]` 是排在后缀 `p` 之后的后缀位置，最大的后缀为 [`NONE`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessorTable {
    next: Vec<u32>,
    first: u32,
}

impl SuccessorTable {
    pub fn from_suffix_array(sa: &[u32]) -> Self {
        let mut next = vec![NONE; sa.len()];
        for w in sa.windows(2) {
            next[w[0] as usize] = w[1];
        }
        let first = sa.first().copied().unwrap_or(NONE);
        Self { next, first }
    }

    /// 由外部排序器给出的原始后继数组构建，并检查它确实串起了全部位置
    pub fn from_parts(next: Vec<u32>, first: u32) -> Result<Self> {
        let n = next.len();
        if n == 0 {
            return Ok(Self { next, first: NONE });
        }
        if first as usize >= n {
            return Err(IndexError::format(format!("first suffix {} outside table of {}", first, n)));
        }
        let mut seen = vec![false; n];
        let mut cur = first;
        let mut visited = 0usize;
        while cur != NONE {
            let p = cur as usize;
            if p >= n || seen[p] {
                return Err(IndexError::format(format!(
                    "successor chain revisits or leaves the table at {}",
                    cur
                )));
            }
            seen[p] = true;
            visited += 1;
            cur = next[p];
        }
        if visited != n {
            return Err(IndexError::format(format!(
                "successor chain covers {} of {} positions",
                visited, n
            )));
        }
        Ok(Self { next, first })
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// 最小后缀的位置
    pub fn first(&self) -> Option<usize> {
        (self.first != NONE).then_some(self.first as usize)
    }

    #[inline]
    pub fn next(&self, p: usize) -> Option<usize> {
        match self.next[p] {
            NONE => None,
            v => Some(v as usize),
        }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.next
    }

    /// 按后缀顺序依次给出位置，即后缀数组
    pub fn walk(&self) -> Walk<'_> {
        Walk { table: self, cur: self.first, remaining: self.next.len() }
    }

    pub fn save(&self, path: &Path, capacity: usize) -> Result<()> {
        let mut w = table_io::create(path, capacity)?;
        table_io::write_u32s(&mut w, self.next.iter().copied())?;
        std::io::Write::flush(&mut w)?;
        Ok(())
    }

    /// 读取 `nextpos` 文件；最小后缀是唯一不作为任何人后继的位置
    pub fn load(path: &Path) -> Result<Self> {
        let next = table_io::read_u32s(path)?;
        let n = next.len() as u64;
        let total: u64 = n * n.saturating_sub(1) / 2;
        let linked: u64 = next.iter().filter(|&&v| v != NONE).map(|&v| v as u64).sum();
        let first = if n == 0 {
            NONE
        } else {
            let f = total.checked_sub(linked).filter(|&f| f < n).ok_or_else(|| {
                IndexError::format(format!("{} does not hold a successor chain", path.display()))
            })?;
            f as u32
        };
        Self::from_parts(next, first)
    }
}

pub struct Walk<'a> {
    table: &'a SuccessorTable,
    cur: u32,
    remaining: usize,
}

impl Iterator for Walk<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.cur == NONE || self.remaining == 0 {
            return None;
        }
        let p = self.cur;
        self.cur = self.table.next[p as usize];
        self.remaining -= 1;
        Some(p)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// 后缀排序器：计算后继表，并由后继表得到后缀数组
pub trait SuffixOrdering {
    fn successor_table(&self, text: &[u8], alphabet: &Alphabet) -> SuccessorTable;

    fn suffix_array(&self, succ: &SuccessorTable) -> Vec<u32> {
        succ.walk().collect()
    }
}

/// 基于倍增法的默认排序器，O(n log² n)
#[derive(Debug, Clone, Copy, Default)]
pub struct DoublingOrdering;

impl SuffixOrdering for DoublingOrdering {
    fn successor_table(&self, text: &[u8], alphabet: &Alphabet) -> SuccessorTable {
        SuccessorTable::from_suffix_array(&build_sa(text, alphabet))
    }
}

/// 初始秩：常规字母按编码取秩；特殊字母按 (编码, 位置) 各占一个秩。
/// 秩从 1 开始，0 留给"越过文本末尾"。
fn initial_ranks(text: &[u8], alphabet: &Alphabet) -> (Vec<usize>, Vec<u32>) {
    let n = text.len();
    let key = |i: usize| {
        let c = text[i];
        (c, if alphabet.is_special(c) { i + 1 } else { 0 })
    };
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_unstable_by_key(|&i| key(i));
    let mut rank = vec![0u32; n];
    let mut r = 1u32;
    for w in 0..n {
        if w > 0 && key(order[w]) != key(order[w - 1]) {
            r += 1;
        }
        rank[order[w]] = r;
    }
    (order, rank)
}

/// 构建后缀数组（倍增法）。文本中可以有多个分隔符。
pub fn build_sa(text: &[u8], alphabet: &Alphabet) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let (mut sa, mut rank) = initial_ranks(text, alphabet);
    let mut tmp = vec![0u32; n];

    let mut k = 1usize;
    while k < n && rank[sa[n - 1]] as usize != n {
        let key = |i: usize, rank: &[u32]| (rank[i], if i + k < n { rank[i + k] } else { 0 });
        sa.sort_unstable_by(|&i, &j| key(i, &rank).cmp(&key(j, &rank)));

        tmp[sa[0]] = 1;
        for i in 1..n {
            let (a, b) = (sa[i - 1], sa[i]);
            tmp[b] = tmp[a] + u32::from(key(a, &rank) != key(b, &rank));
        }
        std::mem::swap(&mut rank, &mut tmp);
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DNA: Alphabet = Alphabet::DNA;

    fn naive_sa(text: &[u8]) -> Vec<u32> {
        let mut sa: Vec<usize> = (0..text.len()).collect();
        sa.sort_by(|&p, &q| suffix_cmp(text, &DNA, p, q, 0).0);
        sa.into_iter().map(|i| i as u32).collect()
    }

    fn make_text(len: usize, seed: u32) -> Vec<u8> {
        let mut x: u32 = seed;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            v.push(((x >> 16) % 6) as u8);
        }
        v
    }

    #[test]
    fn cmp_orders_equal_specials_by_position() {
        // A N A N
        let text = [1u8, 5, 1, 5];
        assert_eq!(suffix_cmp(&text, &DNA, 0, 2, 0), (Ordering::Less, 1));
        assert_eq!(suffix_cmp(&text, &DNA, 3, 1, 0), (Ordering::Greater, 0));
        // "AC" 与 "ACAC"：先到末尾的更小
        let text = [1u8, 2, 1, 2];
        assert_eq!(suffix_cmp(&text, &DNA, 2, 0, 0), (Ordering::Less, 2));
        assert_eq!(suffix_cmp(&text, &DNA, 0, 2, 1), (Ordering::Greater, 2));
    }

    #[test]
    fn sa_basic() {
        // A C G T $
        let text = [1u8, 2, 3, 4, 0];
        assert_eq!(build_sa(&text, &DNA), vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn separators_order_by_position() {
        // A C $ G $：两个 '$' 后缀按位置排序，而不是按后续内容
        let text = [1u8, 2, 0, 3, 0];
        let sa = build_sa(&text, &DNA);
        assert_eq!(sa, vec![2, 4, 0, 1, 3]);
        assert_eq!(sa, naive_sa(&text));
    }

    #[test]
    fn sa_matches_naive_on_small_random_texts() {
        for len in 1..=40 {
            for seed in [1_234_567u32, 42, 7] {
                let text = make_text(len, seed);
                assert_eq!(build_sa(&text, &DNA), naive_sa(&text), "len={} seed={}", len, seed);
            }
        }
    }

    #[test]
    fn successor_table_walks_back_to_suffix_array() {
        let text = make_text(50, 99);
        let ordering = DoublingOrdering;
        let succ = ordering.successor_table(&text, &DNA);
        assert_eq!(succ.len(), 50);
        assert_eq!(ordering.suffix_array(&succ), naive_sa(&text));
        assert_eq!(succ.as_slice().iter().filter(|&&v| v == NONE).count(), 1);
    }

    #[test]
    fn successor_file_recovers_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("t.nextpos");
        let succ = SuccessorTable::from_suffix_array(&[4, 0, 1, 2, 3]);
        succ.save(&path, 64).unwrap();
        let back = SuccessorTable::load(&path).unwrap();
        assert_eq!(back.first(), Some(4));
        assert_eq!(back, succ);
    }

    #[test]
    fn broken_chain_is_rejected() {
        // 0 -> 1 -> 0 成环
        assert!(SuccessorTable::from_parts(vec![1, 0, NONE], 2).is_err());
        assert!(SuccessorTable::from_parts(vec![1, NONE], 5).is_err());
        assert!(SuccessorTable::from_parts(vec![1, NONE], 0).is_ok());
    }
}
