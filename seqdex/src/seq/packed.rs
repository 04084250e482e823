use std::borrow::Cow;
use std::ops::Range;

use crate::alphabet::{Alphabet, MAX_PACKED_SIZE};
use crate::error::{IndexError, Result};

use super::container::{check_range, SequenceContainer};
use super::manifest::Manifest;

/// 每字节存两个符号的容器：逻辑位置 i 位于第 i/2 字节，偶数位置在低半字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedContainer {
    alphabet: Alphabet,
    bytes: Vec<u8>,
    len: usize,
    manifest: Manifest,
}

#[inline]
pub(crate) fn packed_len(logical: usize) -> usize {
    (logical + 1) / 2
}

#[inline]
pub(crate) fn unpack_at(bytes: &[u8], pos: usize) -> u8 {
    let b = bytes[pos / 2];
    if pos % 2 == 0 {
        b & 0x0f
    } else {
        b >> 4
    }
}

/// 将编码序列打包为半字节对
pub(crate) fn pack(codes: &[u8]) -> Vec<u8> {
    codes
        .chunks(2)
        .map(|pair| match *pair {
            [lo, hi] => (lo & 0x0f) | (hi << 4),
            [lo] => lo & 0x0f,
            _ => 0,
        })
        .collect()
}

pub(crate) fn unpack(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for &b in bytes {
        out.push(b & 0x0f);
        out.push(b >> 4);
    }
    out.truncate(len);
    out
}

impl PackedContainer {
    pub fn new(alphabet: Alphabet) -> Self {
        debug_assert!(alphabet.size() <= MAX_PACKED_SIZE);
        Self { alphabet, bytes: Vec::new(), len: 0, manifest: Manifest::new() }
    }

    pub(crate) fn from_parts(alphabet: Alphabet, bytes: Vec<u8>, len: usize, manifest: Manifest) -> Self {
        Self { alphabet, bytes, len, manifest }
    }

    /// 逻辑符号个数；物理字节数为 `ceil(logical / 2)`
    pub fn logical_length(&self) -> usize {
        self.len
    }

    pub fn physical_length(&self) -> usize {
        self.bytes.len()
    }
}

impl SequenceContainer for PackedContainer {
    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn len(&self) -> usize {
        self.len
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    fn symbol_at(&self, pos: usize) -> Result<u8> {
        if pos >= self.len {
            return Err(IndexError::OutOfRange { pos, len: self.len });
        }
        Ok(unpack_at(&self.bytes, pos))
    }

    fn codes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(unpack(&self.bytes, self.len))
    }

    fn push_codes(&mut self, codes: &[u8]) {
        for &c in codes {
            if self.len % 2 == 0 {
                self.bytes.push(c & 0x0f);
            } else if let Some(last) = self.bytes.last_mut() {
                *last |= c << 4;
            }
            self.len += 1;
        }
    }

    fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<u8>> {
        check_range(&range, self.len)?;
        Ok(range.map(|p| unpack_at(&self.bytes, p)).collect())
    }
}
