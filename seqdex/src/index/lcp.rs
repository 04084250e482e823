//! LCP 数组：由后继表求 PLCP，按后缀数组顺序流式给出 LCP，
//! 以及定宽（1/2 字节）+ 例外表的压缩存储。

use std::io::Write;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};

use super::sa::{suffix_cmp, SuccessorTable};
use super::table_io::{self, IntWidth};

/// `plcp[p]` = 后缀 `p` 与其在后缀顺序中前一个后缀的公共前缀长度。
///
/// 按文本顺序计算，利用 `lcp(p, next(p)) >= lcp(p-1, next(p-1)) - 1`，总比较次数 O(n)。
pub fn plcp_from_successor(text: &[u8], alphabet: &Alphabet, succ: &SuccessorTable) -> Vec<u32> {
    let n = text.len();
    let mut plcp = vec![0u32; n];
    let mut l = 0usize;
    for p in 0..n {
        match succ.next(p) {
            Some(pp) => {
                let (_, h) = suffix_cmp(text, alphabet, p, pp, l);
                plcp[pp] = h as u32;
                l = h.saturating_sub(1);
            }
            None => l = 0,
        }
    }
    plcp
}

/// 按秩给出 LCP：`lcp[r] = plcp[pos[r]]`。
///
/// 惰性，`pos` 可以是内存中的后缀数组或磁盘流；重新调用即从头开始。
/// 超出文本的位置给出 [`IndexError::FormatInconsistency`]。
pub fn lcp_from_plcp<'a, I>(plcp: &'a [u32], pos: I) -> impl Iterator<Item = Result<u32>> + 'a
where
    I: IntoIterator<Item = Result<u32>>,
    I::IntoIter: 'a,
{
    pos.into_iter().map(move |p| {
        let p = p? as usize;
        plcp.get(p).copied().ok_or_else(|| {
            IndexError::format(format!("suffix position {} outside text of {}", p, plcp.len()))
        })
    })
}

/// 一次压缩的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStats {
    pub len: usize,
    pub exceptions: usize,
}

fn compression_width(width: u8) -> Result<IntWidth> {
    match IntWidth::from_bytes(width) {
        Some(w @ (IntWidth::U8 | IntWidth::U16)) => Ok(w),
        _ => Err(IndexError::InvalidParameter(format!(
            "compressed LCP width must be 1 or 2 bytes, got {}",
            width
        ))),
    }
}

/// 单遍压缩 LCP 流。
///
/// 小于哨兵值 `2^(8w) - 1` 的值原样写入主表；其余值在主表中写哨兵，
/// 并把 `(秩, 真实值)` 记入例外表。例外表格式：全部秩（u32 LE）后接全部值（u32 LE）。
pub fn compress_lcp<I, P, X>(values: I, width: u8, primary: &mut P, exceptions: &mut X) -> Result<CompressionStats>
where
    I: IntoIterator<Item = Result<u32>>,
    P: Write,
    X: Write,
{
    let width = compression_width(width)?;
    let sentinel = width.max_value();
    let mut ranks = Vec::new();
    let mut actual = Vec::new();
    let mut len = 0usize;
    for v in values {
        let v = v?;
        if v >= sentinel {
            width.write(primary, sentinel)?;
            ranks.push(len as u32);
            actual.push(v);
        } else {
            width.write(primary, v)?;
        }
        len += 1;
    }
    table_io::write_u32s(exceptions, ranks.iter().copied())?;
    table_io::write_u32s(exceptions, actual.iter().copied())?;
    primary.flush()?;
    exceptions.flush()?;
    Ok(CompressionStats { len, exceptions: ranks.len() })
}

/// 加载后的压缩 LCP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedLcp {
    width: IntWidth,
    primary: Vec<u8>,
    ranks: Vec<u32>,
    values: Vec<u32>,
}

impl CompressedLcp {
    pub fn from_bytes(width: u8, primary: Vec<u8>, exceptions: &[u8]) -> Result<Self> {
        let width = compression_width(width)?;
        if primary.len() % width.bytes() != 0 {
            return Err(IndexError::format(format!(
                "compressed LCP has {} bytes, not a multiple of {}",
                primary.len(),
                width.bytes()
            )));
        }
        if exceptions.len() % 8 != 0 {
            return Err(IndexError::format(format!(
                "exception list has {} bytes, expected pairs of u32",
                exceptions.len()
            )));
        }
        let k = exceptions.len() / 8;
        let mut ranks = vec![0u32; k];
        let mut values = vec![0u32; k];
        LittleEndian::read_u32_into(&exceptions[..4 * k], &mut ranks);
        LittleEndian::read_u32_into(&exceptions[4 * k..], &mut values);

        let lcp = Self { width, primary, ranks, values };
        lcp.check()?;
        Ok(lcp)
    }

    pub fn load(primary: &Path, exceptions: &Path, width: u8) -> Result<Self> {
        let p = std::fs::read(primary)?;
        let x = std::fs::read(exceptions)?;
        Self::from_bytes(width, p, &x)
    }

    fn check(&self) -> Result<()> {
        let n = self.len();
        let sentinel = self.width.max_value();
        let mut prev: Option<u32> = None;
        for (&r, &v) in self.ranks.iter().zip(&self.values) {
            if r as usize >= n {
                return Err(IndexError::format(format!(
                    "exception at rank {} outside LCP of length {}",
                    r, n
                )));
            }
            if prev.map_or(false, |p| p >= r) {
                return Err(IndexError::format(format!("exception ranks not increasing at {}", r)));
            }
            if self.slot(r as usize) != sentinel || v < sentinel {
                return Err(IndexError::format(format!(
                    "exception at rank {} does not match its primary slot",
                    r
                )));
            }
            prev = Some(r);
        }
        let sentinels = (0..n).filter(|&r| self.slot(r) == sentinel).count();
        if sentinels != self.ranks.len() {
            return Err(IndexError::format(format!(
                "{} sentinel slots but {} exceptions",
                sentinels,
                self.ranks.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn slot(&self, r: usize) -> u32 {
        match self.width {
            IntWidth::U8 => self.primary[r] as u32,
            _ => LittleEndian::read_u16(&self.primary[2 * r..2 * r + 2]) as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.primary.len() / self.width.bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width.bytes()
    }

    pub fn num_exceptions(&self) -> usize {
        self.ranks.len()
    }

    /// 随机访问；哨兵槽位通过二分查找例外表
    pub fn get(&self, r: usize) -> Result<u32> {
        if r >= self.len() {
            return Err(IndexError::OutOfRange { pos: r, len: self.len() });
        }
        let v = self.slot(r);
        if v != self.width.max_value() {
            return Ok(v);
        }
        self.ranks
            .binary_search(&(r as u32))
            .map(|i| self.values[i])
            .map_err(|_| IndexError::format(format!("no exception recorded for rank {}", r)))
    }

    /// 顺序解码，例外表随秩同步前进，不做查找
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let sentinel = self.width.max_value();
        let mut next_exc = 0usize;
        (0..self.len()).map(move |r| {
            let v = self.slot(r);
            if v == sentinel {
                let actual = self.values[next_exc];
                next_exc += 1;
                actual
            } else {
                v
            }
        })
    }

    pub fn decode(&self) -> Vec<u32> {
        self.iter().collect()
    }
}
