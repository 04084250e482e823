use std::borrow::Cow;
use std::io::Write;
use std::ops::Range;

use tracing::debug;

use crate::alphabet::{Alphabet, SEPARATOR};
use crate::error::{IndexError, Result};

use super::manifest::{Manifest, ManifestRecord};

/// 多序列容器的公共能力：编码后的符号流 + 每条序列一行的 manifest。
///
/// 位置一律是逻辑符号位置；紧凑存储的实现自行处理半字节换算。
pub trait SequenceContainer {
    fn alphabet(&self) -> Alphabet;

    /// 逻辑符号个数（含分隔符）
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn manifest(&self) -> &Manifest;

    /// 存储层的原始字节
    fn raw_bytes(&self) -> &[u8];

    fn symbol_at(&self, pos: usize) -> Result<u8>;

    /// 全部逻辑编码；按字节存储时直接借用，紧凑存储时解包
    fn codes(&self) -> Cow<'_, [u8]>;

    /// 追加已编码的符号，不修改 manifest
    fn push_codes(&mut self, codes: &[u8]);

    fn manifest_mut(&mut self) -> &mut Manifest;

    /// 追加一条序列及其分隔符，返回新写入的 manifest 记录。
    ///
    /// `encode = false` 时 `raw` 已是编码；超出字母表的编码按 `other` 处理。
    fn append_sequence(&mut self, raw: &[u8], description: &str, encode: bool) -> &ManifestRecord {
        let alphabet = self.alphabet();
        let start = self.len();
        if encode {
            let (codes, gaps) = alphabet.encode_seq(raw);
            if gaps > 0 {
                debug!(gaps, description, "unknown characters replaced by '{}'", alphabet.decode(alphabet.other()) as char);
            }
            self.push_codes(&codes);
        } else if raw.iter().all(|&c| c != SEPARATOR && (c as usize) < alphabet.size()) {
            self.push_codes(raw);
        } else {
            let codes: Vec<u8> = raw
                .iter()
                .map(|&c| if c == SEPARATOR || c as usize >= alphabet.size() { alphabet.other() } else { c })
                .collect();
            self.push_codes(&codes);
        }
        let stop = self.len();
        self.push_codes(&[SEPARATOR]);
        let record = ManifestRecord {
            start,
            stop,
            last_separator: stop,
            length: stop - start,
            description: description.to_string(),
        };
        self.manifest_mut().push(record)
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<u8>> {
        check_range(&range, self.len())?;
        range.map(|p| self.symbol_at(p)).collect()
    }

    /// 可读形式的子串
    fn decode_range(&self, range: Range<usize>) -> Result<String> {
        let codes = self.slice(range)?;
        Ok(self.alphabet().decode_seq(&codes))
    }

    fn owner_of(&self, pos: usize) -> Result<usize> {
        self.manifest().owner_of(pos)
    }

    fn description_of(&self, pos: usize) -> Result<&str> {
        self.manifest().description_of(pos)
    }

    /// 写出原始缓冲区与 manifest 文本
    fn persist<B: Write, M: Write>(&self, mut buffer: B, manifest: M) -> Result<()>
    where
        Self: Sized,
    {
        buffer.write_all(self.raw_bytes())?;
        buffer.flush()?;
        self.manifest().write_to(&self.alphabet(), manifest)
    }
}

pub(crate) fn check_range(range: &Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end {
        return Err(IndexError::OutOfRange { pos: range.start, len });
    }
    if range.end > len {
        return Err(IndexError::OutOfRange { pos: range.end - 1, len });
    }
    Ok(())
}

/// 每个符号占一个字节的容器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteContainer {
    alphabet: Alphabet,
    buf: Vec<u8>,
    manifest: Manifest,
}

impl ByteContainer {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet, buf: Vec::new(), manifest: Manifest::new() }
    }

    pub(crate) fn from_parts(alphabet: Alphabet, buf: Vec<u8>, manifest: Manifest) -> Self {
        Self { alphabet, buf, manifest }
    }
}

impl SequenceContainer for ByteContainer {
    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn raw_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    fn symbol_at(&self, pos: usize) -> Result<u8> {
        self.buf
            .get(pos)
            .copied()
            .ok_or(IndexError::OutOfRange { pos, len: self.buf.len() })
    }

    fn codes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.buf)
    }

    fn push_codes(&mut self, codes: &[u8]) {
        self.buf.extend_from_slice(codes);
    }

    fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<u8>> {
        check_range(&range, self.buf.len())?;
        Ok(self.buf[range].to_vec())
    }
}
