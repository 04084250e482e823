use crate::error::{IndexError, Result};

/// 根据后缀数组构建 BWT：`bwt[r] = text[pos[r] - 1]`，
/// 位置 0 回绕到文本最后一个符号（末尾的分隔符）。
pub fn build_bwt(text: &[u8], sa: &[u32]) -> Vec<u8> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    sa.iter()
        .map(|&p| {
            let i = p as usize;
            if i == 0 {
                text[n - 1]
            } else {
                text[i - 1]
            }
        })
        .collect()
}

/// 与 [`build_bwt`] 相同，但后缀数组以流的形式（通常直接读自 `pos` 文件）给出
pub fn bwt_from_pos<I>(text: &[u8], pos: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Result<u32>>,
{
    let n = text.len();
    let mut bwt = Vec::with_capacity(n);
    for p in pos {
        let i = p? as usize;
        let prev = match i {
            0 if n > 0 => text[n - 1],
            i if i > 0 && i < n => text[i - 1],
            _ => return Err(IndexError::format(format!("suffix position {} outside text of {}", i, n))),
        };
        bwt.push(prev);
    }
    if bwt.len() != n {
        return Err(IndexError::format(format!(
            "suffix array has {} entries, text has {}",
            bwt.len(),
            n
        )));
    }
    Ok(bwt)
}
