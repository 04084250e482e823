//! 派生索引表：后继表、后缀数组、LCP（含压缩形式）、BWT、采样 occ 表与 rindex。

pub mod builder;
pub mod bwt;
pub mod info;
pub mod lcp;
pub mod names;
pub mod occ;
pub mod rindex;
pub mod sa;
pub mod table_io;

pub use builder::{BuildReport, IndexTableBuilder, StepOutcome};
pub use info::IndexInfo;
pub use lcp::CompressedLcp;
pub use names::{IndexName, Table};
pub use occ::OccTable;
pub use rindex::Rindex;
pub use sa::{DoublingOrdering, SuccessorTable, SuffixOrdering};
