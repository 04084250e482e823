//! 字母表：字符 ↔ 编码的静态映射表。
//!
//! 编码 0 固定为序列分隔符 `$`。编码分为"常规"字母（如 A/C/G/T）与"特殊"
//! 字母（分隔符、N、X 等未知/模糊符号）。`is_special` 在后缀比较、LCP 计算
//! 与 occ 统计中都会用到。
//!
//! 字母表是不可变的 `Copy` 值，由容器和索引构建器在构造时显式持有。

use std::fmt;

use crate::error::{IndexError, Result};

/// 分隔符编码
pub const SEPARATOR: u8 = 0;

/// 紧凑存储（每字节两个符号）允许的最大字母表大小
pub const MAX_PACKED_SIZE: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Alphabet {
    name: &'static str,
    /// 编码 -> 字符
    characters: &'static [u8],
    /// 字符 -> 编码（大小写不敏感）
    codes: &'static [u8; 256],
    first_regular: u8,
    regulars: u8,
    other: u8,
    packed: bool,
}

const fn build_codes(characters: &[u8], other: u8, aliases: &[(u8, u8)]) -> [u8; 256] {
    let mut table = [other; 256];
    // 从 1 开始：'$' 不能由输入产生
    let mut c = 1;
    while c < characters.len() {
        let ch = characters[c];
        table[ch as usize] = c as u8;
        table[ch.to_ascii_lowercase() as usize] = c as u8;
        c += 1;
    }
    let mut a = 0;
    while a < aliases.len() {
        let (ch, code) = aliases[a];
        table[ch as usize] = code;
        table[ch.to_ascii_lowercase() as usize] = code;
        a += 1;
    }
    table
}

const DNA_CHARACTERS: &[u8] = b"$ACGTN";
const DNA_CODES: [u8; 256] = build_codes(DNA_CHARACTERS, 5, &[(b'U', 4)]);

const PROTEIN_CHARACTERS: &[u8] = b"$ACDEFGHIKLMNPQRSTVWYX*";
const PROTEIN_CODES: [u8; 256] = build_codes(PROTEIN_CHARACTERS, 21, &[]);

impl Alphabet {
    /// DNA：{0:$, 1:A, 2:C, 3:G, 4:T, 5:N}，每个符号占一个字节
    pub const DNA: Alphabet = Alphabet {
        name: "dna",
        characters: DNA_CHARACTERS,
        codes: &DNA_CODES,
        first_regular: 1,
        regulars: 4,
        other: 5,
        packed: false,
    };

    /// 与 [`Alphabet::DNA`] 相同的编码，但每个字节存两个符号（低半字节在前）
    pub const DNA_PACKED: Alphabet = Alphabet {
        name: "dna-packed",
        characters: DNA_CHARACTERS,
        codes: &DNA_CODES,
        first_regular: 1,
        regulars: 4,
        other: 5,
        packed: true,
    };

    /// 蛋白质：20 种氨基酸为常规字母，X（未知）与 *（终止）为特殊字母
    pub const PROTEIN: Alphabet = Alphabet {
        name: "protein",
        characters: PROTEIN_CHARACTERS,
        codes: &PROTEIN_CODES,
        first_regular: 1,
        regulars: 20,
        other: 21,
        packed: false,
    };

    pub const ALL: [Alphabet; 3] = [Alphabet::DNA, Alphabet::DNA_PACKED, Alphabet::PROTEIN];

    /// 按 manifest 头部记录的名称查找字母表
    pub fn from_name(name: &str) -> Result<Alphabet> {
        Self::ALL
            .into_iter()
            .find(|a| a.name == name.trim())
            .ok_or_else(|| IndexError::UnknownAlphabet(name.trim().to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 编码总数（含分隔符与特殊字母）
    #[inline]
    pub fn size(&self) -> usize {
        self.characters.len()
    }

    #[inline]
    pub fn first_regular(&self) -> u8 {
        self.first_regular
    }

    #[inline]
    pub fn regulars(&self) -> usize {
        self.regulars as usize
    }

    /// 未知字符统一映射到的编码
    #[inline]
    pub fn other(&self) -> u8 {
        self.other
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    #[inline]
    pub fn is_special(&self, code: u8) -> bool {
        code < self.first_regular || code >= self.first_regular + self.regulars
    }

    /// 单个字符编码；无法识别的字符返回 `other`，不会失败
    #[inline]
    pub fn encode(&self, ch: u8) -> u8 {
        self.codes[ch as usize]
    }

    /// 编码整段输入，同时返回被替换为 `other` 的字符个数
    pub fn encode_seq(&self, seq: &[u8]) -> (Vec<u8>, usize) {
        let mut gaps = 0usize;
        let mut out = Vec::with_capacity(seq.len());
        for &b in seq {
            let code = self.encode(b);
            if code == self.other && b.to_ascii_uppercase() != self.characters[self.other as usize] {
                gaps += 1;
            }
            out.push(code);
        }
        (out, gaps)
    }

    #[inline]
    pub fn decode(&self, code: u8) -> u8 {
        self.characters
            .get(code as usize)
            .copied()
            .unwrap_or(self.characters[self.other as usize])
    }

    pub fn decode_seq(&self, codes: &[u8]) -> String {
        codes.iter().map(|&c| self.decode(c) as char).collect()
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alphabet")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("packed", &self.packed)
            .finish()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
