use std::io::Write;
use std::path::Path;

use crate::error::{IndexError, Result};

use super::table_io;

/// 采样的 occ 表：
/// - 每 `rate` 个 BWT 位置保存一行计数，第 b 行是 `bwt[0..b*rate)` 中每个编码的出现次数。
/// - `rank` 取 `(i-1)/rate` 行，再顺扫块内至多 `rate` 个符号补偿。
/// - `less[a]` 为 BWT 中编码小于 a 的符号总数（即 FM 索引的 C 表）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccTable {
    rate: usize,
    sigma: usize,
    len: usize,
    /// 行优先展平：rows[row * sigma + a]
    rows: Vec<u32>,
    less: Vec<u32>,
}

impl OccTable {
    /// 单遍扫描 BWT 构建
    pub fn build<I: IntoIterator<Item = u8>>(bwt: I, sigma: usize, rate: usize) -> Result<Self> {
        if rate == 0 {
            return Err(IndexError::InvalidParameter("occ sample rate must be positive".into()));
        }
        let mut running = vec![0u32; sigma];
        let mut rows = Vec::new();
        let mut len = 0usize;
        for ch in bwt {
            if len % rate == 0 {
                rows.extend_from_slice(&running);
            }
            let ci = ch as usize;
            if ci >= sigma {
                return Err(IndexError::format(format!("BWT symbol {} outside alphabet of {}", ch, sigma)));
            }
            running[ci] += 1;
            len += 1;
        }
        let less = Self::less_from_totals(&running);
        Ok(Self { rate, sigma, len, rows, less })
    }

    fn less_from_totals(totals: &[u32]) -> Vec<u32> {
        let mut acc = 0u32;
        totals
            .iter()
            .map(|&t| {
                let v = acc;
                acc += t;
                v
            })
            .collect()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len() / self.sigma.max(1)
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn row(&self, b: usize) -> &[u32] {
        &self.rows[b * self.sigma..(b + 1) * self.sigma]
    }

    #[inline]
    pub fn less(&self, a: u8) -> u32 {
        self.less[a as usize]
    }

    /// `bwt[0..i)` 中编码 `a` 的出现次数
    pub fn rank(&self, bwt: &[u8], a: u8, i: usize) -> Result<u32> {
        if i > self.len || bwt.len() != self.len {
            return Err(IndexError::OutOfRange { pos: i, len: self.len });
        }
        if (a as usize) >= self.sigma {
            return Err(IndexError::OutOfRange { pos: a as usize, len: self.sigma });
        }
        if i == 0 {
            return Ok(0);
        }
        let bi = (i - 1) / self.rate;
        let base = self.rows[bi * self.sigma + a as usize];
        let start = bi * self.rate;
        let add = bwt[start..i].iter().filter(|&&ch| ch == a).count() as u32;
        Ok(base + add)
    }

    /// 写出全部行，后接 `less` 数组，均为 u32 LE
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        table_io::write_u32s(w, self.rows.iter().copied())?;
        table_io::write_u32s(w, self.less.iter().copied())?;
        w.flush()?;
        Ok(())
    }

    /// 读取 `<idx>.<rate>.occ`；`len` 是 BWT 长度，用于核对行数
    pub fn load(path: &Path, sigma: usize, rate: usize, len: usize) -> Result<Self> {
        if rate == 0 || sigma == 0 {
            return Err(IndexError::InvalidParameter("occ sample rate and alphabet size must be positive".into()));
        }
        let values = table_io::read_u32s(path)?;
        let num_rows = (len + rate - 1) / rate;
        let expected = (num_rows + 1) * sigma;
        if values.len() != expected {
            return Err(IndexError::format(format!(
                "{} holds {} counts, expected {} for {} symbols at rate {}",
                path.display(),
                values.len(),
                expected,
                len,
                rate
            )));
        }
        let mut rows = values;
        let less = rows.split_off(num_rows * sigma);
        Ok(Self { rate, sigma, len, rows, less })
    }
}
