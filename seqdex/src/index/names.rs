use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// 可单独构建的派生表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    /// 后继表（`nextpos`）
    Successor,
    /// 后缀数组
    Pos,
    Lcp,
    /// 1 或 2 字节宽的压缩 LCP 及其例外表
    CompressedLcp(u8),
    Bwt,
    /// 采样率为给定值的 occ 表
    Occ(usize),
    Rindex,
}

impl Table {
    /// 构建该表所需的上游表（不含文本本身）
    pub fn prerequisites(&self) -> &'static [Table] {
        match self {
            Table::Successor => &[],
            Table::Pos => &[Table::Successor],
            Table::Lcp => &[Table::Successor, Table::Pos],
            Table::CompressedLcp(_) => &[Table::Lcp],
            Table::Bwt => &[Table::Pos],
            Table::Occ(_) => &[Table::Bwt],
            Table::Rindex => &[Table::Pos],
        }
    }

    /// 依赖顺序中的阶段号：同一阶段的表之间没有依赖
    pub(crate) fn stage(&self) -> u8 {
        match self {
            Table::Successor => 0,
            Table::Pos => 1,
            Table::Lcp => 2,
            Table::CompressedLcp(_) | Table::Bwt | Table::Rindex => 3,
            Table::Occ(_) => 4,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Successor => f.write_str("nextpos"),
            Table::Pos => f.write_str("pos"),
            Table::Lcp => f.write_str("lcp"),
            Table::CompressedLcp(w) => write!(f, "lcp{}", w),
            Table::Bwt => f.write_str("bwt"),
            Table::Occ(rate) => write!(f, "{}.occ", rate),
            Table::Rindex => f.write_str("rindex"),
        }
    }
}

impl FromStr for Table {
    type Err = IndexError;

    /// 接受文件后缀形式的名字；`occ` 后缀也可写作 `occ:<rate>`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let table = match s {
            "nextpos" | "successor" => Table::Successor,
            "pos" | "sa" => Table::Pos,
            "lcp" => Table::Lcp,
            "lcp1" => Table::CompressedLcp(1),
            "lcp2" => Table::CompressedLcp(2),
            "bwt" => Table::Bwt,
            "rindex" => Table::Rindex,
            _ => {
                let rate = s
                    .strip_suffix(".occ")
                    .or_else(|| s.strip_prefix("occ:"))
                    .and_then(|r| r.parse::<usize>().ok())
                    .ok_or_else(|| IndexError::InvalidParameter(format!("unknown table '{}'", s)))?;
                Table::Occ(rate)
            }
        };
        Ok(table)
    }
}

/// 一个索引的基础名 `<idx>`，所有表文件都由它加后缀得到
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexName {
    base: PathBuf,
}

impl IndexName {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut s: OsString = self.base.as_os_str().to_owned();
        s.push(".");
        s.push(suffix);
        PathBuf::from(s)
    }

    pub fn manifest(&self) -> PathBuf {
        self.with_suffix("manifest")
    }

    pub fn seq(&self) -> PathBuf {
        self.with_suffix("seq")
    }

    pub fn info(&self) -> PathBuf {
        self.with_suffix("info")
    }

    /// 表的主文件路径
    pub fn table(&self, table: Table) -> PathBuf {
        self.with_suffix(&table.to_string())
    }

    /// 压缩 LCP 的例外表（`lcp1x` / `lcp2x`）
    pub fn exceptions(&self, width: u8) -> PathBuf {
        self.with_suffix(&format!("lcp{}x", width))
    }

    pub fn exists(&self, table: Table) -> bool {
        let primary = self.table(table).is_file();
        match table {
            Table::CompressedLcp(w) => primary && self.exceptions(w).is_file(),
            _ => primary,
        }
    }

    /// 列出磁盘上已有的 occ 表（按采样率升序）
    pub fn occ_tables(&self) -> Result<Vec<(usize, PathBuf)>> {
        let dir = match self.base.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = match self.base.file_name().and_then(|s| s.to_str()) {
            Some(s) => format!("{}.", s),
            None => return Ok(Vec::new()),
        };
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let rate = name
                .strip_prefix(&stem)
                .and_then(|rest| rest.strip_suffix(".occ"))
                .filter(|r| !r.is_empty() && r.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|r| r.parse::<usize>().ok());
            if let Some(rate) = rate {
                found.push((rate, entry.path()));
            }
        }
        found.sort();
        Ok(found)
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_suffix_convention() {
        let idx = IndexName::new("/data/hg");
        assert_eq!(idx.manifest(), PathBuf::from("/data/hg.manifest"));
        assert_eq!(idx.seq(), PathBuf::from("/data/hg.seq"));
        assert_eq!(idx.table(Table::Successor), PathBuf::from("/data/hg.nextpos"));
        assert_eq!(idx.table(Table::CompressedLcp(2)), PathBuf::from("/data/hg.lcp2"));
        assert_eq!(idx.exceptions(1), PathBuf::from("/data/hg.lcp1x"));
        assert_eq!(idx.table(Table::Occ(64)), PathBuf::from("/data/hg.64.occ"));
        assert_eq!(idx.table(Table::Rindex), PathBuf::from("/data/hg.rindex"));
    }

    #[test]
    fn table_names_parse_back() {
        for t in [
            Table::Successor,
            Table::Pos,
            Table::Lcp,
            Table::CompressedLcp(1),
            Table::CompressedLcp(2),
            Table::Bwt,
            Table::Occ(32),
            Table::Rindex,
        ] {
            assert_eq!(t.to_string().parse::<Table>().unwrap(), t);
        }
        assert_eq!("occ:8".parse::<Table>().unwrap(), Table::Occ(8));
        assert!("lcp3".parse::<Table>().is_err());
    }

    #[test]
    fn occ_tables_are_discovered_by_rate() {
        let dir = tempfile::TempDir::new().unwrap();
        let idx = IndexName::new(dir.path().join("ref"));
        for name in ["ref.64.occ", "ref.8.occ", "ref.bwt", "ref.x.occ", "other.4.occ", "ref.128.occ"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let rates: Vec<usize> = idx.occ_tables().unwrap().into_iter().map(|(r, _)| r).collect();
        assert_eq!(rates, vec![8, 64, 128]);
    }
}
