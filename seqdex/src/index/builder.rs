//! 派生表构建流水线。
//!
//! 每张表是一个独立步骤：上游表可以来自同一轮构建、先前留在内存中的结果或磁盘。
//! 找不到上游表时该步骤以 [`IndexError::PrerequisiteMissing`] 失败，其余步骤照常进行。
//! 同一阶段内互不依赖的步骤（两种宽度的压缩 LCP、BWT、rindex、多个 occ 采样率）并行执行。

use std::borrow::Cow;
use std::io::Write;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::alphabet::Alphabet;
use crate::config::BuildConfig;
use crate::error::{IndexError, Result};
use crate::seq::{Container, SequenceContainer};

use super::bwt::bwt_from_pos;
use super::info::IndexInfo;
use super::lcp::{compress_lcp, lcp_from_plcp, plcp_from_successor};
use super::names::{IndexName, Table};
use super::occ::OccTable;
use super::rindex::Rindex;
use super::sa::{DoublingOrdering, SuccessorTable, SuffixOrdering};
use super::table_io::{self, U32Stream};

/// 单个步骤的结果
#[derive(Debug)]
pub enum StepOutcome {
    Built { table: Table, elements: usize, elapsed: Duration },
    Skipped { table: Table, reason: String },
    Failed { table: Table, error: IndexError },
}

impl StepOutcome {
    pub fn table(&self) -> Table {
        match self {
            StepOutcome::Built { table, .. }
            | StepOutcome::Skipped { table, .. }
            | StepOutcome::Failed { table, .. } => *table,
        }
    }
}

/// 一轮构建中所有步骤的结果（按执行顺序）
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<StepOutcome>,
    /// 更新 `<idx>.info` 失败时的错误；已写出的表仍然有效
    pub info_error: Option<IndexError>,
}

impl BuildReport {
    pub fn built(&self) -> Vec<Table> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                StepOutcome::Built { table, .. } => Some(*table),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (Table, &IndexError)> {
        self.outcomes.iter().filter_map(|o| match o {
            StepOutcome::Failed { table, error } => Some((*table, error)),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none() && self.info_error.is_none()
    }

    pub fn outcome(&self, table: Table) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.table() == table)
    }
}

/// 上一步留在内存中的产物
enum Product {
    Successor(SuccessorTable),
    Pos(Vec<u32>),
    Bwt(Vec<u8>),
}

#[derive(Default)]
struct Products {
    successor: Option<SuccessorTable>,
    pos: Option<Vec<u32>>,
    bwt: Option<Vec<u8>>,
    /// 本轮失败的表：即使磁盘上有旧文件也不再作为上游
    failed: Vec<Table>,
}

impl Products {
    fn store(&mut self, product: Product) {
        match product {
            Product::Successor(s) => self.successor = Some(s),
            Product::Pos(p) => self.pos = Some(p),
            Product::Bwt(b) => self.bwt = Some(b),
        }
    }
}

type PosStream<'a> = Box<dyn Iterator<Item = Result<u32>> + Send + 'a>;

/// 以容器为输入、按 [`IndexName`] 写出各表的构建器
pub struct IndexTableBuilder<'a, O: SuffixOrdering = DoublingOrdering> {
    container: &'a Container,
    idx: IndexName,
    ordering: O,
    config: BuildConfig,
    products: Products,
}

impl<'a> IndexTableBuilder<'a, DoublingOrdering> {
    pub fn new(container: &'a Container, idx: IndexName) -> Self {
        Self::with_ordering(container, idx, DoublingOrdering)
    }
}

impl<'a, O: SuffixOrdering + Sync> IndexTableBuilder<'a, O> {
    pub fn with_ordering(container: &'a Container, idx: IndexName, ordering: O) -> Self {
        Self { container, idx, ordering, config: BuildConfig::default(), products: Products::default() }
    }

    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn index_name(&self) -> &IndexName {
        &self.idx
    }

    /// 构建请求的表。步骤级错误记录在 [`BuildReport`] 中，
    /// 只有配置或线程池错误才作为 `Err` 返回。
    pub fn build(&mut self, tables: &[Table]) -> Result<BuildReport> {
        self.config.validate()?;
        self.config.print();
        let pool = self.config.thread_pool()?;

        let mut requested: Vec<Table> = tables.to_vec();
        requested.sort_by_key(|t| (t.stage(), *t));
        requested.dedup();

        let mut products = std::mem::take(&mut self.products);
        products.failed.clear();
        let mut report = BuildReport::default();
        info!(index = %self.idx, steps = requested.len(), "building index tables");

        let this = &*self;
        for stage in stages(&requested) {
            let results: Vec<(StepOutcome, Option<Product>)> = if stage.len() == 1 {
                vec![this.run_step(stage[0], &products)]
            } else {
                pool.install(|| stage.par_iter().map(|&t| this.run_step(t, &products)).collect())
            };
            for (outcome, product) in results {
                if let StepOutcome::Failed { table, .. } = &outcome {
                    products.failed.push(*table);
                }
                if let Some(p) = product {
                    products.store(p);
                }
                report.outcomes.push(outcome);
            }
        }
        self.products = products;

        let built = report.built();
        if !built.is_empty() {
            if let Err(error) = self.update_info(&built) {
                warn!(index = %self.idx, %error, "cannot update index info");
                report.info_error = Some(error);
            }
        }
        info!(
            built = built.len(),
            failed = report.failures().count(),
            "index table build finished"
        );
        Ok(report)
    }

    fn update_info(&self, built: &[Table]) -> Result<()> {
        let path = self.idx.info();
        let mut info = if path.is_file() {
            IndexInfo::load(&path)?
        } else {
            IndexInfo::new(self.container.alphabet().name(), self.container.len(), self.container.manifest().len())
        };
        info.length = self.container.len();
        info.sequences = self.container.manifest().len();
        info.record_tables(built.iter().copied());
        info.save(&path)
    }

    fn run_step(&self, table: Table, products: &Products) -> (StepOutcome, Option<Product>) {
        if let Table::Occ(0) = table {
            info!(step = %table, "occurrence sampling disabled (rate 0), skipped");
            return (
                StepOutcome::Skipped { table, reason: "sample rate 0 disables the occurrence table".into() },
                None,
            );
        }
        let start = Instant::now();
        info!(step = %table, "building");
        let result = match table {
            Table::Successor => self.build_successor(),
            Table::Pos => self.build_pos(products),
            Table::Lcp => self.build_lcp(products),
            Table::CompressedLcp(width) => self.build_compressed_lcp(width, products),
            Table::Bwt => self.build_bwt(products),
            Table::Occ(rate) => self.build_occ(rate, products),
            Table::Rindex => self.build_rindex(products),
        };
        let elapsed = start.elapsed();
        match result {
            Ok((elements, product)) => {
                info!(step = %table, elements, elapsed_ms = elapsed.as_millis() as u64, "built");
                (StepOutcome::Built { table, elements, elapsed }, product)
            }
            Err(error) => {
                warn!(step = %table, %error, "step failed");
                (StepOutcome::Failed { table, error }, None)
            }
        }
    }

    fn alphabet(&self) -> Alphabet {
        self.container.alphabet()
    }

    fn text(&self) -> Cow<'_, [u8]> {
        self.container.codes()
    }

    fn missing(step: Table, missing: Table) -> IndexError {
        IndexError::PrerequisiteMissing { step: step.to_string(), missing: missing.to_string() }
    }

    fn available_on_disk(&self, table: Table, products: &Products) -> bool {
        !products.failed.contains(&table) && self.idx.exists(table)
    }

    /// 磁盘上的旧表可能来自容器追加序列之前
    fn check_stored_len(&self, table: Table, len: usize) -> Result<()> {
        let n = self.container.len();
        if len != n {
            return Err(IndexError::format(format!(
                "{} holds {} entries but the container has {} symbols",
                self.idx.table(table).display(),
                len,
                n
            )));
        }
        Ok(())
    }

    fn successor<'p>(&self, step: Table, products: &'p Products) -> Result<Cow<'p, SuccessorTable>> {
        if let Some(s) = &products.successor {
            return Ok(Cow::Borrowed(s));
        }
        if self.available_on_disk(Table::Successor, products) {
            let succ = SuccessorTable::load(&self.idx.table(Table::Successor))?;
            self.check_stored_len(Table::Successor, succ.len())?;
            return Ok(Cow::Owned(succ));
        }
        Err(Self::missing(step, Table::Successor))
    }

    fn pos_stream<'p>(&self, step: Table, products: &'p Products) -> Result<PosStream<'p>> {
        if let Some(pos) = &products.pos {
            return Ok(Box::new(pos.iter().map(|&p| Ok(p))));
        }
        if self.available_on_disk(Table::Pos, products) {
            let stream = U32Stream::open(&self.idx.table(Table::Pos), self.config.io_buffer_bytes)?;
            self.check_stored_len(Table::Pos, stream.len())?;
            return Ok(Box::new(stream));
        }
        Err(Self::missing(step, Table::Pos))
    }

    fn bwt<'p>(&self, step: Table, products: &'p Products) -> Result<Cow<'p, [u8]>> {
        if let Some(b) = &products.bwt {
            return Ok(Cow::Borrowed(b));
        }
        if self.available_on_disk(Table::Bwt, products) {
            // 大小与容器不符时 read_symbols 报格式错误
            let path = self.idx.table(Table::Bwt);
            return Ok(Cow::Owned(table_io::read_symbols(&path, &self.alphabet(), self.container.len())?));
        }
        Err(Self::missing(step, Table::Bwt))
    }

    fn build_successor(&self) -> Result<(usize, Option<Product>)> {
        let text = self.text();
        let succ = self.ordering.successor_table(&text, &self.alphabet());
        if succ.len() != text.len() {
            return Err(IndexError::format(format!(
                "suffix ordering returned {} successors for {} symbols",
                succ.len(),
                text.len()
            )));
        }
        succ.save(&self.idx.table(Table::Successor), self.config.io_buffer_bytes)?;
        Ok((succ.len(), Some(Product::Successor(succ))))
    }

    fn build_pos(&self, products: &Products) -> Result<(usize, Option<Product>)> {
        let succ = self.successor(Table::Pos, products)?;
        let pos = self.ordering.suffix_array(&succ);
        if pos.len() != self.container.len() {
            return Err(IndexError::format(format!(
                "suffix array has {} entries, text has {}",
                pos.len(),
                self.container.len()
            )));
        }
        let mut w = table_io::create(&self.idx.table(Table::Pos), self.config.io_buffer_bytes)?;
        table_io::write_u32s(&mut w, pos.iter().copied())?;
        w.flush()?;
        Ok((pos.len(), Some(Product::Pos(pos))))
    }

    fn build_lcp(&self, products: &Products) -> Result<(usize, Option<Product>)> {
        let succ = self.successor(Table::Lcp, products)?;
        let pos = self.pos_stream(Table::Lcp, products)?;
        let text = self.text();
        let plcp = plcp_from_successor(&text, &self.alphabet(), &succ);

        let mut w = table_io::create(&self.idx.table(Table::Lcp), self.config.io_buffer_bytes)?;
        let mut n = 0usize;
        for v in lcp_from_plcp(&plcp, pos) {
            table_io::write_u32s(&mut w, std::iter::once(v?))?;
            n += 1;
        }
        w.flush()?;
        if n != text.len() {
            return Err(IndexError::format(format!("suffix array has {} entries, text has {}", n, text.len())));
        }
        Ok((n, None))
    }

    fn build_compressed_lcp(&self, width: u8, products: &Products) -> Result<(usize, Option<Product>)> {
        let step = Table::CompressedLcp(width);
        if width != 1 && width != 2 {
            return Err(IndexError::InvalidParameter(format!(
                "compressed LCP width must be 1 or 2 bytes, got {}",
                width
            )));
        }
        if !self.available_on_disk(Table::Lcp, products) {
            return Err(Self::missing(step, Table::Lcp));
        }
        let values = U32Stream::open(&self.idx.table(Table::Lcp), self.config.io_buffer_bytes)?;
        self.check_stored_len(Table::Lcp, values.len())?;
        let mut primary = table_io::create(&self.idx.table(step), self.config.io_buffer_bytes)?;
        let mut exceptions = table_io::create(&self.idx.exceptions(width), self.config.io_buffer_bytes)?;
        let stats = compress_lcp(values, width, &mut primary, &mut exceptions)?;
        info!(step = %step, exceptions = stats.exceptions, "LCP compressed");
        Ok((stats.len, None))
    }

    fn build_bwt(&self, products: &Products) -> Result<(usize, Option<Product>)> {
        let pos = self.pos_stream(Table::Bwt, products)?;
        let text = self.text();
        let bwt = bwt_from_pos(&text, pos)?;
        let mut w = table_io::create(&self.idx.table(Table::Bwt), self.config.io_buffer_bytes)?;
        table_io::write_symbols(&mut w, &self.alphabet(), &bwt)?;
        w.flush()?;
        Ok((bwt.len(), Some(Product::Bwt(bwt))))
    }

    fn build_occ(&self, rate: usize, products: &Products) -> Result<(usize, Option<Product>)> {
        let step = Table::Occ(rate);
        let bwt = self.bwt(step, products)?;
        let occ = OccTable::build(bwt.iter().copied(), self.alphabet().size(), rate)?;
        let mut w = table_io::create(&self.idx.table(step), self.config.io_buffer_bytes)?;
        occ.write_to(&mut w)?;
        Ok((occ.num_rows(), None))
    }

    fn build_rindex(&self, products: &Products) -> Result<(usize, Option<Product>)> {
        let pos = self.pos_stream(Table::Rindex, products)?;
        let ri = Rindex::build(self.container.manifest(), pos)?;
        if ri.len() != self.container.len() {
            return Err(IndexError::format(format!(
                "suffix array has {} entries, text has {}",
                ri.len(),
                self.container.len()
            )));
        }
        let mut w = table_io::create(&self.idx.table(Table::Rindex), self.config.io_buffer_bytes)?;
        ri.write_to(&mut w)?;
        Ok((ri.len(), None))
    }
}

/// 按阶段切分已排序的步骤列表
fn stages(sorted: &[Table]) -> Vec<&[Table]> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i].stage() != sorted[start].stage() {
            out.push(&sorted[start..i]);
            start = i;
        }
    }
    out
}
