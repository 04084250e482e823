use thiserror::Error;

/// 索引相关操作的错误类型
#[derive(Error, Debug)]
pub enum IndexError {
    /// 访问越过缓冲区或 manifest 的边界
    #[error("position {pos} out of range (length {len})")]
    OutOfRange { pos: usize, len: usize },

    /// 某个构建步骤所需的上游表既未构建也不在磁盘上
    #[error("step '{step}' requires table '{missing}', which was neither built nor found on disk")]
    PrerequisiteMissing { step: String, missing: String },

    /// 索引文件之间互相矛盾（损坏或不匹配）
    #[error("inconsistent index files: {0}")]
    FormatInconsistency(String),

    #[error("unknown alphabet '{0}'")]
    UnknownAlphabet(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        IndexError::FormatInconsistency(msg.into())
    }
}
