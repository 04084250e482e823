use std::io::Write;
use std::path::Path;

use crate::error::{IndexError, Result};
use crate::seq::Manifest;

use super::table_io::IntWidth;

/// 秩 → 所属序列下标。宽度取能容纳序列个数的最窄无符号整数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rindex {
    width: IntWidth,
    owners: Vec<u32>,
}

impl Rindex {
    pub fn width_for(num_sequences: usize) -> IntWidth {
        IntWidth::for_max(num_sequences.saturating_sub(1))
    }

    /// 对每个秩在 manifest 的分隔符位置上二分查找
    pub fn build<I>(manifest: &Manifest, pos: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<u32>>,
    {
        let owners = pos
            .into_iter()
            .map(|p| manifest.owner_of(p? as usize).map(|i| i as u32))
            .collect::<Result<Vec<u32>>>()?;
        Ok(Self { width: Self::width_for(manifest.len()), owners })
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width.bytes()
    }

    pub fn get(&self, r: usize) -> Result<usize> {
        self.owners
            .get(r)
            .map(|&i| i as usize)
            .ok_or(IndexError::OutOfRange { pos: r, len: self.owners.len() })
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.owners
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for &v in &self.owners {
            self.width.write(w, v)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path, num_sequences: usize, len: usize) -> Result<Self> {
        let width = Self::width_for(num_sequences);
        let bytes = std::fs::read(path)?;
        if bytes.len() != len * width.bytes() {
            return Err(IndexError::format(format!(
                "{} has {} bytes, expected {} entries of {} bytes",
                path.display(),
                bytes.len(),
                len,
                width.bytes()
            )));
        }
        let owners = width.read_all(&bytes)?;
        if let Some(&bad) = owners.iter().find(|&&v| v as usize >= num_sequences) {
            return Err(IndexError::format(format!(
                "rindex refers to sequence {} of {}",
                bad, num_sequences
            )));
        }
        Ok(Self { width, owners })
    }
}
