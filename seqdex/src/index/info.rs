use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::shapes::Shape;

use super::names::Table;

/// 索引的元信息，以 bincode 存于 `<idx>.info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub alphabet: String,
    /// 逻辑符号总数（含分隔符）
    pub length: usize,
    pub sequences: usize,
    /// 至今已构建的表（跨多次构建累积）
    pub tables: Vec<Table>,
    /// 为查询选定的种子形状（`#` 为关心位，`_` 为通配位）
    pub shape: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

impl IndexInfo {
    pub fn new(alphabet: &str, length: usize, sequences: usize) -> Self {
        Self {
            alphabet: alphabet.to_string(),
            length,
            sequences,
            tables: Vec::new(),
            shape: None,
            build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// 合并新构建的表并刷新时间戳
    pub fn record_tables<I: IntoIterator<Item = Table>>(&mut self, tables: I) {
        for t in tables {
            if !self.tables.contains(&t) {
                self.tables.push(t);
            }
        }
        self.tables.sort();
        self.build_timestamp = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn record_shape(&mut self, shape: &Shape) {
        self.shape = Some(shape.to_string());
    }

    /// 已记录的种子形状；字符串损坏时返回 `FormatInconsistency`
    pub fn recorded_shape(&self) -> crate::Result<Option<Shape>> {
        self.shape
            .as_deref()
            .map(|s| s.parse::<Shape>().map_err(|e| IndexError::format(format!("recorded shape: {e}"))))
            .transpose()
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let r = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(r)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ref.info");
        let mut info = IndexInfo::new("dna", 5, 1);
        info.record_tables([Table::Pos, Table::Successor, Table::Pos]);
        info.record_shape(&"##_#".parse().unwrap());
        info.save(&path).unwrap();

        let back = IndexInfo::load(&path).unwrap();
        assert_eq!(back, info);
        assert_eq!(back.tables, vec![Table::Successor, Table::Pos]);
        assert!(back.build_timestamp.is_some());
        assert_eq!(back.recorded_shape().unwrap().map(|s| s.to_string()), Some("##_#".to_string()));
    }

    #[test]
    fn corrupt_shape_is_reported() {
        let mut info = IndexInfo::new("dna", 5, 1);
        assert!(info.recorded_shape().unwrap().is_none());
        info.shape = Some("#x#".to_string());
        assert!(info.recorded_shape().is_err());
    }
}
