//! 多序列容器：编码后的符号缓冲区与序列清单（manifest）。
//!
//! 两种存储布局（按字节 / 半字节紧凑）共享 [`SequenceContainer`] 接口，
//! [`Container`] 按字母表选择其中一种，并负责从磁盘加载。

pub mod container;
pub mod manifest;
pub mod packed;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::Range;

use tracing::info;

pub use container::{ByteContainer, SequenceContainer};
pub use manifest::{Manifest, ManifestRecord};
pub use packed::PackedContainer;

use crate::alphabet::{Alphabet, SEPARATOR};
use crate::error::{IndexError, Result};
use crate::index::IndexName;

/// 按字母表的存储方式分派的容器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Bytes(ByteContainer),
    Packed(PackedContainer),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            Container::Bytes($c) => $body,
            Container::Packed($c) => $body,
        }
    };
}

impl Container {
    pub fn new(alphabet: Alphabet) -> Self {
        if alphabet.is_packed() {
            Container::Packed(PackedContainer::new(alphabet))
        } else {
            Container::Bytes(ByteContainer::new(alphabet))
        }
    }

    /// 从原始缓冲区与 manifest 文本重建容器。
    ///
    /// `last_separators` 直接由 manifest 得出；缓冲区只用于核对长度与分隔符位置。
    pub fn load<B: Read, M: Read>(mut buffer: B, manifest: M) -> Result<Self> {
        let (alphabet, manifest) = Manifest::read_from(BufReader::new(manifest))?;
        let logical = manifest.total_len();

        let mut bytes = Vec::new();
        buffer.read_to_end(&mut bytes)?;
        let expected = if alphabet.is_packed() { packed::packed_len(logical) } else { logical };
        if bytes.len() != expected {
            return Err(IndexError::format(format!(
                "sequence buffer holds {} bytes but the manifest ({} sequences, {} symbols) implies {}",
                bytes.len(),
                manifest.len(),
                logical,
                expected
            )));
        }

        let container = if alphabet.is_packed() {
            Container::Packed(PackedContainer::from_parts(alphabet, bytes, logical, manifest))
        } else {
            Container::Bytes(ByteContainer::from_parts(alphabet, bytes, manifest))
        };

        for (i, &sep) in container.manifest().last_separators().iter().enumerate() {
            if container.symbol_at(sep)? != SEPARATOR {
                return Err(IndexError::format(format!(
                    "record {} ends at {} but no separator is stored there",
                    i, sep
                )));
            }
        }
        Ok(container)
    }

    /// 写出 `<idx>.seq` 与 `<idx>.manifest`
    pub fn save(&self, idx: &IndexName) -> Result<()> {
        let seq = BufWriter::new(File::create(idx.seq())?);
        let manifest = BufWriter::new(File::create(idx.manifest())?);
        self.persist(seq, manifest)?;
        info!(
            index = %idx,
            sequences = self.manifest().len(),
            symbols = self.len(),
            "sequence container saved"
        );
        Ok(())
    }

    pub fn open(idx: &IndexName) -> Result<Self> {
        let seq = File::open(idx.seq())?;
        let manifest = File::open(idx.manifest())?;
        Self::load(seq, manifest)
    }

    /// 物理字节数（按字节存储时与逻辑长度相同）
    pub fn physical_length(&self) -> usize {
        self.raw_bytes().len()
    }
}

impl SequenceContainer for Container {
    fn alphabet(&self) -> Alphabet {
        dispatch!(self, c => c.alphabet())
    }

    fn len(&self) -> usize {
        dispatch!(self, c => c.len())
    }

    fn manifest(&self) -> &Manifest {
        dispatch!(self, c => c.manifest())
    }

    fn raw_bytes(&self) -> &[u8] {
        dispatch!(self, c => c.raw_bytes())
    }

    fn symbol_at(&self, pos: usize) -> Result<u8> {
        dispatch!(self, c => c.symbol_at(pos))
    }

    fn codes(&self) -> Cow<'_, [u8]> {
        dispatch!(self, c => c.codes())
    }

    fn push_codes(&mut self, codes: &[u8]) {
        dispatch!(self, c => c.push_codes(codes));
    }

    fn manifest_mut(&mut self) -> &mut Manifest {
        dispatch!(self, c => c.manifest_mut())
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<u8>> {
        dispatch!(self, c => c.slice(range))
    }

    fn persist<B: Write, M: Write>(&self, buffer: B, manifest: M) -> Result<()> {
        dispatch!(self, c => c.persist(buffer, manifest))
    }
}
