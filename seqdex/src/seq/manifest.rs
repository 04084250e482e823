use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};

/// 一条源序列在缓冲区中的位置信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// 第一个内容符号的位置
    pub start: usize,
    /// 最后一个内容符号之后的位置
    pub stop: usize,
    /// 该序列之后的分隔符位置
    pub last_separator: usize,
    /// 内容符号个数
    pub length: usize,
    pub description: String,
}

/// 按追加顺序排列的序列清单。
///
/// `last_separators` 与 `records` 一一对应且严格递增，用于二分查找
/// 任意全局位置所属的序列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    records: Vec<ManifestRecord>,
    last_separators: Vec<usize>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, rec: ManifestRecord) -> &ManifestRecord {
        self.last_separators.push(rec.last_separator);
        self.records.push(rec);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }

    pub fn last_separators(&self) -> &[usize] {
        &self.last_separators
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, i: usize) -> Result<&ManifestRecord> {
        self.records
            .get(i)
            .ok_or(IndexError::OutOfRange { pos: i, len: self.records.len() })
    }

    /// manifest 所描述的缓冲区逻辑长度（最后一个分隔符 + 1）
    pub fn total_len(&self) -> usize {
        self.last_separators.last().map_or(0, |&p| p + 1)
    }

    /// 返回拥有全局位置 `pos` 的序列下标：第一个 `last_separator >= pos` 的记录。
    /// 序列末尾的分隔符归属于该序列本身。
    pub fn owner_of(&self, pos: usize) -> Result<usize> {
        let i = self.last_separators.partition_point(|&s| s < pos);
        if i == self.last_separators.len() {
            return Err(IndexError::OutOfRange { pos, len: self.total_len() });
        }
        Ok(i)
    }

    pub fn description_of(&self, pos: usize) -> Result<&str> {
        let i = self.owner_of(pos)?;
        Ok(&self.records[i].description)
    }

    /// 写出文本形式：首行为字母表名称，其后每行一条记录（制表符分隔）。
    ///
    /// 描述中的 `\`、制表符与换行写作 `\\`、`\t`、`\n`、`\r`，
    /// [`Manifest::read_from`] 还原，因此任意描述都能原样往返。
    pub fn write_to<W: Write>(&self, alphabet: &Alphabet, mut w: W) -> Result<()> {
        writeln!(w, "{}", alphabet.name())?;
        for r in &self.records {
            let desc = escape(&r.description);
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                r.start, r.stop, r.last_separator, r.length, desc
            )?;
        }
        w.flush()?;
        Ok(())
    }

    /// 读取 [`Manifest::write_to`] 的输出，并重建 `last_separators`（无需扫描缓冲区）
    pub fn read_from<R: BufRead>(r: R) -> Result<(Alphabet, Manifest)> {
        let mut lines = r.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(IndexError::format("manifest is empty (missing alphabet header)")),
        };
        let alphabet = Alphabet::from_name(&header)?;

        let mut manifest = Manifest::new();
        for (lineno, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let rec = parse_row(&line).ok_or_else(|| {
                IndexError::format(format!("malformed manifest row {}: {:?}", lineno + 2, line))
            })?;
            manifest.check_next(&rec)?;
            manifest.push(rec);
        }
        Ok((alphabet, manifest))
    }

    fn check_next(&self, rec: &ManifestRecord) -> Result<()> {
        let expected_start = self.total_len();
        if rec.start != expected_start {
            return Err(IndexError::format(format!(
                "record {} starts at {}, expected {}",
                self.len(),
                rec.start,
                expected_start
            )));
        }
        if rec.start > rec.stop || rec.stop > rec.last_separator || rec.stop - rec.start != rec.length {
            return Err(IndexError::format(format!(
                "record {} has inconsistent bounds start={} stop={} last_separator={} length={}",
                self.len(),
                rec.start,
                rec.stop,
                rec.last_separator,
                rec.length
            )));
        }
        Ok(())
    }
}

fn parse_row(line: &str) -> Option<ManifestRecord> {
    let mut fields = line.splitn(5, '\t');
    let start = fields.next()?.trim().parse().ok()?;
    let stop = fields.next()?.trim().parse().ok()?;
    let last_separator = fields.next()?.trim().parse().ok()?;
    let length = fields.next()?.trim().parse().ok()?;
    let description = unescape(fields.next().unwrap_or(""))?;
    Some(ManifestRecord { start, stop, last_separator, length, description })
}

fn escape(desc: &str) -> String {
    let mut out = String::with_capacity(desc.len());
    for c in desc.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// 非法转义（含结尾孤立的 `\`）返回 `None`，整行按格式错误处理
fn unescape(field: &str) -> Option<String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            '\\' => '\\',
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            _ => return None,
        });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn rec(start: usize, length: usize, desc: &str) -> ManifestRecord {
        ManifestRecord {
            start,
            stop: start + length,
            last_separator: start + length,
            length,
            description: desc.to_string(),
        }
    }

    fn sample() -> Manifest {
        let mut m = Manifest::new();
        m.push(rec(0, 4, "chr1 first"));
        m.push(rec(5, 2, "chr2"));
        m.push(rec(8, 0, "empty"));
        m
    }

    #[test]
    fn owner_of_uses_last_separators() {
        let m = sample();
        assert_eq!(m.last_separators(), &[4, 7, 8]);
        for p in 0..=4 {
            assert_eq!(m.owner_of(p).unwrap(), 0);
        }
        assert_eq!(m.owner_of(5).unwrap(), 1);
        assert_eq!(m.owner_of(7).unwrap(), 1);
        assert_eq!(m.owner_of(8).unwrap(), 2);
        assert!(matches!(
            m.owner_of(9),
            Err(IndexError::OutOfRange { pos: 9, len: 9 })
        ));
    }

    #[test]
    fn text_roundtrip_keeps_descriptions_with_spaces() {
        let m = sample();
        let mut out = Vec::new();
        m.write_to(&Alphabet::DNA, &mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("dna\n0\t4\t4\t4\tchr1 first\n"));

        let (alphabet, back) = Manifest::read_from(Cursor::new(out)).unwrap();
        assert_eq!(alphabet, Alphabet::DNA);
        assert_eq!(back, m);
    }

    #[test]
    fn control_characters_in_descriptions_roundtrip() {
        let mut m = Manifest::new();
        m.push(rec(0, 3, "chr1\tleft\\right"));
        m.push(rec(4, 2, "multi\nline\r\n"));
        let mut out = Vec::new();
        m.write_to(&Alphabet::DNA, &mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("chr1\\tleft\\\\right"));

        let (_, back) = Manifest::read_from(Cursor::new(out)).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn bad_escape_is_rejected() {
        let text = "dna\n0\t4\t4\t4\tbad\\q\n";
        assert!(matches!(
            Manifest::read_from(Cursor::new(text)),
            Err(IndexError::FormatInconsistency(_))
        ));
    }

    #[test]
    fn non_contiguous_rows_are_rejected() {
        let text = "dna\n0\t4\t4\t4\ta\n6\t8\t8\t2\tb\n";
        let err = Manifest::read_from(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, IndexError::FormatInconsistency(_)));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let text = "dna\n0\tfour\t4\t4\ta\n";
        assert!(matches!(
            Manifest::read_from(Cursor::new(text)),
            Err(IndexError::FormatInconsistency(_))
        ));
        assert!(matches!(
            Manifest::read_from(Cursor::new("")),
            Err(IndexError::FormatInconsistency(_))
        ));
    }
}
