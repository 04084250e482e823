//! # seqdex
//!
//! 面向生物序列的磁盘驻留全文索引，以及间隔种子形状的优化搜索。
//!
//! 本 crate 提供：
//!
//! - **序列容器**：多条序列以分隔符串联，按字节或按半字节紧凑存储，附带 manifest
//! - **派生索引表**：后继表、后缀数组（pos）、LCP 及其 1/2 字节压缩形式、BWT、
//!   采样 occ 表与 rindex，按依赖顺序构建，缺失的上游表从磁盘读取
//! - **种子形状优化**：对给定错误数与覆盖要求，求形状的最小窗口并搜索最优形状
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use seqdex::{Alphabet, Container, IndexName, IndexTableBuilder, SequenceContainer, Table};
//!
//! let mut container = Container::new(Alphabet::DNA);
//! container.append_sequence(b"ACGTACGTAGCTGATCGTAG", "chr1", true);
//! container.append_sequence(b"GATTACA", "chr2", true);
//!
//! let idx = IndexName::new("/tmp/ref");
//! container.save(&idx)?;
//!
//! let mut builder = IndexTableBuilder::new(&container, idx);
//! let report = builder.build(&[Table::Successor, Table::Pos, Table::Lcp, Table::Bwt, Table::Occ(16)])?;
//! assert!(report.is_success());
//! # Ok::<(), seqdex::IndexError>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`alphabet`] — 字母表与编码
//! - [`seq`] — 序列容器与 manifest
//! - [`index`] — 派生索引表及其构建器
//! - [`shapes`] — 间隔种子形状评估与搜索
//! - [`config`] — 构建与搜索参数

pub mod alphabet;
pub mod config;
pub mod error;
pub mod index;
pub mod seq;
pub mod shapes;

pub use alphabet::Alphabet;
pub use config::{BuildConfig, SearchConfig, SWITCH_NEVER};
pub use error::{IndexError, Result};
pub use index::{BuildReport, IndexInfo, IndexName, IndexTableBuilder, StepOutcome, Table};
pub use seq::{Container, SequenceContainer};
pub use shapes::{evaluate_one_shape, evaluate_shapes_of_type, Outcome, Shape, ShapeError, ShapeResult};
