//! 表文件的读写：定宽小端整数与按容器布局存储的符号流。

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};
use crate::seq::packed;

pub(crate) fn create(path: &Path, capacity: usize) -> Result<BufWriter<File>> {
    Ok(BufWriter::with_capacity(capacity, File::create(path)?))
}

pub(crate) fn open(path: &Path, capacity: usize) -> Result<BufReader<File>> {
    Ok(BufReader::with_capacity(capacity, File::open(path)?))
}

/// 写出一串 `u32`，返回写入的个数
pub fn write_u32s<W: Write, I: IntoIterator<Item = u32>>(w: &mut W, values: I) -> Result<usize> {
    let mut n = 0usize;
    for v in values {
        w.write_u32::<LittleEndian>(v)?;
        n += 1;
    }
    Ok(n)
}

/// 整个文件读为 `u32` 数组
pub fn read_u32s(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(IndexError::format(format!(
            "{} has {} bytes, not a multiple of 4",
            path.display(),
            bytes.len()
        )));
    }
    let mut out = vec![0u32; bytes.len() / 4];
    let mut rd = bytes.as_slice();
    rd.read_u32_into::<LittleEndian>(&mut out)?;
    Ok(out)
}

/// 逐个读取 `u32` 的流式读取器，不把整张表装入内存
pub struct U32Stream<R> {
    inner: R,
    remaining: usize,
}

impl<R: Read> U32Stream<R> {
    pub fn new(inner: R, count: usize) -> Self {
        Self { inner, remaining: count }
    }
}

impl U32Stream<BufReader<File>> {
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        let bytes = std::fs::metadata(path)?.len() as usize;
        if bytes % 4 != 0 {
            return Err(IndexError::format(format!(
                "{} has {} bytes, not a multiple of 4",
                path.display(),
                bytes
            )));
        }
        Ok(Self::new(open(path, capacity)?, bytes / 4))
    }
}

impl<R: Read> Iterator for U32Stream<R> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.inner.read_u32::<LittleEndian>().map_err(IndexError::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Read> ExactSizeIterator for U32Stream<R> {}

/// 定宽无符号整数（1 / 2 / 4 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    U8,
    U16,
    U32,
}

impl IntWidth {
    /// 能容纳 `0..=max` 的最窄宽度
    pub fn for_max(max: usize) -> IntWidth {
        if max <= u8::MAX as usize {
            IntWidth::U8
        } else if max <= u16::MAX as usize {
            IntWidth::U16
        } else {
            IntWidth::U32
        }
    }

    pub fn from_bytes(bytes: u8) -> Option<IntWidth> {
        match bytes {
            1 => Some(IntWidth::U8),
            2 => Some(IntWidth::U16),
            4 => Some(IntWidth::U32),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IntWidth::U8 => 1,
            IntWidth::U16 => 2,
            IntWidth::U32 => 4,
        }
    }

    /// 该宽度能表示的最大值
    pub fn max_value(self) -> u32 {
        match self {
            IntWidth::U8 => u8::MAX as u32,
            IntWidth::U16 => u16::MAX as u32,
            IntWidth::U32 => u32::MAX,
        }
    }

    pub fn write<W: Write>(self, w: &mut W, v: u32) -> io::Result<()> {
        match self {
            IntWidth::U8 => w.write_u8(v as u8),
            IntWidth::U16 => w.write_u16::<LittleEndian>(v as u16),
            IntWidth::U32 => w.write_u32::<LittleEndian>(v),
        }
    }

    pub fn read_all(self, bytes: &[u8]) -> Result<Vec<u32>> {
        let n = self.bytes();
        if bytes.len() % n != 0 {
            return Err(IndexError::format(format!(
                "{} bytes cannot hold {}-byte values",
                bytes.len(),
                n
            )));
        }
        let mut rd = bytes;
        let mut out = Vec::with_capacity(bytes.len() / n);
        while !rd.is_empty() {
            let v = match self {
                IntWidth::U8 => rd.read_u8()? as u32,
                IntWidth::U16 => rd.read_u16::<LittleEndian>()? as u32,
                IntWidth::U32 => rd.read_u32::<LittleEndian>()?,
            };
            out.push(v);
        }
        Ok(out)
    }
}

/// 按字母表的存储布局写出符号流（紧凑字母表每字节两个符号）
pub fn write_symbols<W: Write>(w: &mut W, alphabet: &Alphabet, codes: &[u8]) -> Result<()> {
    if alphabet.is_packed() {
        w.write_all(&packed::pack(codes))?;
    } else {
        w.write_all(codes)?;
    }
    Ok(())
}

/// 读取 `len` 个逻辑符号
pub fn read_symbols(path: &Path, alphabet: &Alphabet, len: usize) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    let expected = if alphabet.is_packed() { packed::packed_len(len) } else { len };
    if bytes.len() != expected {
        return Err(IndexError::format(format!(
            "{} has {} bytes, expected {} for {} symbols",
            path.display(),
            bytes.len(),
            expected,
            len
        )));
    }
    if alphabet.is_packed() {
        Ok(packed::unpack(&bytes, len))
    } else {
        Ok(bytes)
    }
}
