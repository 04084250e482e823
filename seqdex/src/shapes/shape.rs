use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ShapeError;

/// 形状：跨度 `q` 与升序排列的内部通配位（`1..q-1`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shape {
    q: usize,
    dontcares: Vec<usize>,
}

impl Shape {
    pub fn new<I: IntoIterator<Item = usize>>(q: usize, dontcares: I) -> Result<Self, ShapeError> {
        if q == 0 {
            return Err(ShapeError::InvalidParameter("shape span must be positive".into()));
        }
        let mut dontcares: Vec<usize> = dontcares.into_iter().collect();
        dontcares.sort_unstable();
        dontcares.dedup();
        if let Some(&offset) = dontcares.iter().find(|&&d| d == 0 || d + 1 >= q) {
            return Err(ShapeError::BadWildcard { q, offset });
        }
        Ok(Self { q, dontcares })
    }

    /// 不含通配位的连续形状
    pub fn contiguous(q: usize) -> Result<Self, ShapeError> {
        Self::new(q, [])
    }

    /// 跨度
    pub fn span(&self) -> usize {
        self.q
    }

    /// 权重：关心位个数
    pub fn weight(&self) -> usize {
        self.q - self.dontcares.len()
    }

    pub fn dontcares(&self) -> &[usize] {
        &self.dontcares
    }

    pub fn cares(&self) -> Vec<usize> {
        (0..self.q).filter(|i| self.dontcares.binary_search(i).is_err()).collect()
    }

    /// 长度为 q 的通配位掩码
    pub(crate) fn dontcare_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.q];
        for &d in &self.dontcares {
            mask[d] = true;
        }
        mask
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self
            .dontcare_mask()
            .into_iter()
            .map(|dc| if dc { '_' } else { '#' })
            .collect();
        f.write_str(&s)
    }
}

impl FromStr for Shape {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, ShapeError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b == b'#' || b == b'_') {
            return Err(ShapeError::Malformed(s.to_string()));
        }
        let dontcares = s.bytes().enumerate().filter(|&(_, b)| b == b'_').map(|(i, _)| i);
        Shape::new(s.len(), dontcares).map_err(|_| ShapeError::Malformed(s.to_string()))
    }
}
