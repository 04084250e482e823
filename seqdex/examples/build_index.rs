//! 演示如何在 library 模式下使用 seqdex：建容器、构建派生表、搜索种子形状并记录到索引。
//!
//! 运行方式：
//! ```bash
//! cargo run --example build_index
//! ```

use seqdex::index::occ::OccTable;
use seqdex::index::table_io::{read_symbols, read_u32s};
use seqdex::shapes::evaluate_all_shapes_with_weight;
use seqdex::{
    Alphabet, Container, IndexInfo, IndexName, IndexTableBuilder, SearchConfig, SequenceContainer, StepOutcome, Table,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // 1. 建立序列容器
    let mut container = Container::new(Alphabet::DNA_PACKED);
    container.append_sequence(b"ACGTACGTAGCTGATCGTAGCTAGCTAGCTGATCGTAG", "ref1 demo", true);
    container.append_sequence(b"GATTACANNGATTACA", "ref2", true);
    println!("容器: {} 条序列, {} 个符号, {} 字节", container.manifest().len(), container.len(), container.physical_length());

    let dir = tempfile::TempDir::new()?;
    let idx = IndexName::new(dir.path().join("demo"));
    container.save(&idx)?;

    // 2. 构建派生表
    let mut builder = IndexTableBuilder::new(&container, idx.clone());
    let report = builder.build(&[
        Table::Successor,
        Table::Pos,
        Table::Lcp,
        Table::CompressedLcp(1),
        Table::Bwt,
        Table::Occ(8),
        Table::Rindex,
    ])?;
    for outcome in &report.outcomes {
        if let StepOutcome::Built { table, elements, .. } = outcome {
            println!("  {}: {} 个元素", table, elements);
        }
    }

    // 3. 读回 BWT 与 occ，统计 'A' 的出现次数
    let n = container.len();
    let pos = read_u32s(&idx.table(Table::Pos))?;
    let bwt = read_symbols(&idx.table(Table::Bwt), &container.alphabet(), n)?;
    let occ = OccTable::load(&idx.table(Table::Occ(8)), container.alphabet().size(), 8, n)?;
    let a = container.alphabet().encode(b'A');
    println!("最小后缀位于 {}，BWT = {}", pos[0], container.alphabet().decode_seq(&bwt));
    println!("BWT 中 'A' 出现 {} 次", occ.rank(&bwt, a, n)?);

    // 4. 搜索权重 4、最多 1 个错误的最优形状，并记录到索引
    let rows = evaluate_all_shapes_with_weight(4, 1, 1, 0, 3, &SearchConfig::default())?;
    for row in &rows {
        println!("{}", row);
    }
    if let Some(best) = rows.iter().min_by(|x, y| x.best.cmp(&y.best)) {
        let mut info = IndexInfo::load(&idx.info())?;
        info.record_shape(&best.representative);
        info.save(&idx.info())?;
        println!("记录形状 {}", best.representative);
    }
    Ok(())
}
