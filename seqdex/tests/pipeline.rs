use std::cmp::Ordering;

use tempfile::TempDir;

use seqdex::index::lcp::CompressedLcp;
use seqdex::index::occ::OccTable;
use seqdex::index::rindex::Rindex;
use seqdex::index::sa::{suffix_cmp, SuccessorTable};
use seqdex::index::table_io::{read_symbols, read_u32s};
use seqdex::{
    Alphabet, BuildConfig, BuildReport, Container, IndexError, IndexInfo, IndexName, IndexTableBuilder,
    SequenceContainer, StepOutcome, Table,
};

fn make_seq(len: usize, seed: u32) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut x = seed;
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            bases[(x >> 16) as usize % 4]
        })
        .collect()
}

fn sample_container(alphabet: Alphabet) -> Container {
    let mut c = Container::new(alphabet);
    c.append_sequence(&make_seq(400, 7), "chr1 first", true);
    // 300 个符号的重复，让 LCP 超出单字节
    let repeat = make_seq(300, 11);
    let mut second = repeat.clone();
    second.extend_from_slice(b"NNGATTACA");
    second.extend_from_slice(&repeat);
    c.append_sequence(&second, "chr2", true);
    c.append_sequence(b"", "empty", true);
    c.append_sequence(b"ACGTNACGT", "chr3 tail", true);
    c
}

fn naive_pos(text: &[u8], alphabet: &Alphabet) -> Vec<u32> {
    let mut pos: Vec<u32> = (0..text.len() as u32).collect();
    pos.sort_by(|&a, &b| suffix_cmp(text, alphabet, a as usize, b as usize, 0).0);
    pos
}

fn all_tables() -> Vec<Table> {
    vec![
        Table::Successor,
        Table::Pos,
        Table::Lcp,
        Table::CompressedLcp(1),
        Table::CompressedLcp(2),
        Table::Bwt,
        Table::Occ(1),
        Table::Occ(16),
        Table::Occ(0),
        Table::Rindex,
    ]
}

fn check_index(alphabet: Alphabet) {
    let dir = TempDir::new().unwrap();
    let idx = IndexName::new(dir.path().join("ref"));
    sample_container(alphabet).save(&idx).unwrap();

    let container = Container::open(&idx).unwrap();
    assert_eq!(container.manifest().len(), 4);
    assert_eq!(container.description_of(405).unwrap(), "chr2");

    let mut builder = IndexTableBuilder::new(&container, idx.clone())
        .config(BuildConfig { num_threads: 2, ..BuildConfig::default() });
    let report = builder.build(&all_tables()).unwrap();
    assert!(report.is_success());
    assert!(matches!(report.outcome(Table::Occ(0)), Some(StepOutcome::Skipped { .. })));

    let text = container.codes().into_owned();
    let n = text.len();

    // pos 与后继表
    let pos = read_u32s(&idx.table(Table::Pos)).unwrap();
    assert_eq!(pos, naive_pos(&text, &alphabet));
    let succ = SuccessorTable::load(&idx.table(Table::Successor)).unwrap();
    assert_eq!(succ.first(), Some(pos[0] as usize));
    let walked: Vec<u32> = succ.walk().collect();
    assert_eq!(walked, pos);

    // lcp 与压缩形式
    let lcp = read_u32s(&idx.table(Table::Lcp)).unwrap();
    let mut expected = vec![0u32; n];
    for r in 1..n {
        let (ord, l) = suffix_cmp(&text, &alphabet, pos[r - 1] as usize, pos[r] as usize, 0);
        assert_eq!(ord, Ordering::Less);
        expected[r] = l as u32;
    }
    assert_eq!(lcp, expected);
    assert!(lcp.iter().any(|&v| v >= 300));
    for width in [1u8, 2] {
        let compressed = CompressedLcp::load(
            &idx.table(Table::CompressedLcp(width)),
            &idx.exceptions(width),
            width,
        )
        .unwrap();
        assert_eq!(compressed.decode(), lcp);
        assert_eq!(compressed.get(n - 1).unwrap(), lcp[n - 1]);
        if width == 1 {
            assert!(compressed.num_exceptions() > 0);
        } else {
            assert_eq!(compressed.num_exceptions(), 0);
        }
    }

    // bwt 与 occ
    let bwt = read_symbols(&idx.table(Table::Bwt), &alphabet, n).unwrap();
    for r in 0..n {
        let p = pos[r] as usize;
        assert_eq!(bwt[r], text[if p == 0 { n - 1 } else { p - 1 }]);
    }
    assert_eq!(idx.occ_tables().unwrap().iter().map(|(r, _)| *r).collect::<Vec<_>>(), vec![1, 16]);
    let occ = OccTable::load(&idx.table(Table::Occ(16)), alphabet.size(), 16, n).unwrap();
    for a in 0..alphabet.size() as u8 {
        let mut count = 0u32;
        for i in 0..=n {
            assert_eq!(occ.rank(&bwt, a, i).unwrap(), count, "a={} i={}", a, i);
            if i < n && bwt[i] == a {
                count += 1;
            }
        }
        let less = text.iter().filter(|&&c| c < a).count() as u32;
        assert_eq!(occ.less(a), less);
    }

    // rindex
    let rindex = Rindex::load(&idx.table(Table::Rindex), 4, n).unwrap();
    assert_eq!(rindex.width(), 1);
    for r in 0..n {
        assert_eq!(rindex.get(r).unwrap(), container.owner_of(pos[r] as usize).unwrap());
    }

    let info = IndexInfo::load(&idx.info()).unwrap();
    assert_eq!(info.alphabet, alphabet.name());
    assert_eq!(info.length, n);
    assert_eq!(info.sequences, 4);
    assert!(!info.tables.contains(&Table::Occ(0)));
    assert!(info.tables.contains(&Table::Rindex));
}

#[test]
fn byte_alphabet_pipeline() {
    check_index(Alphabet::DNA);
}

#[test]
fn packed_alphabet_pipeline() {
    check_index(Alphabet::DNA_PACKED);
}

#[test]
fn single_sequence_end_to_end() {
    let dir = TempDir::new().unwrap();
    let idx = IndexName::new(dir.path().join("acgt"));
    let mut container = Container::new(Alphabet::DNA);
    container.append_sequence(b"ACGT", "s", true);
    container.save(&idx).unwrap();

    let mut builder = IndexTableBuilder::new(&container, idx.clone());
    let report = builder.build(&[Table::Successor, Table::Pos, Table::Bwt, Table::Lcp]).unwrap();
    assert!(report.is_success());

    assert_eq!(read_u32s(&idx.table(Table::Pos)).unwrap(), vec![4, 0, 1, 2, 3]);
    assert_eq!(read_u32s(&idx.table(Table::Lcp)).unwrap(), vec![0; 5]);
    let bwt = read_symbols(&idx.table(Table::Bwt), &Alphabet::DNA, 5).unwrap();
    assert_eq!(Alphabet::DNA.decode_seq(&bwt), "T$ACG");
}

#[test]
fn later_pass_reads_prerequisites_from_disk() {
    let dir = TempDir::new().unwrap();
    let idx = IndexName::new(dir.path().join("ref"));
    let container = sample_container(Alphabet::DNA);
    container.save(&idx).unwrap();

    IndexTableBuilder::new(&container, idx.clone())
        .build(&[Table::Successor, Table::Pos])
        .unwrap();

    // 新的构建器，内存中没有任何表
    let reopened = Container::open(&idx).unwrap();
    let mut builder = IndexTableBuilder::new(&reopened, idx.clone());
    let report = builder.build(&[Table::Bwt, Table::Rindex, Table::Occ(8)]).unwrap();
    assert!(report.is_success());
    assert!(idx.exists(Table::Occ(8)));

    let info = IndexInfo::load(&idx.info()).unwrap();
    assert_eq!(info.tables, vec![Table::Successor, Table::Pos, Table::Bwt, Table::Occ(8), Table::Rindex]);
}

#[test]
fn missing_prerequisite_does_not_stop_other_steps() {
    let dir = TempDir::new().unwrap();
    let idx = IndexName::new(dir.path().join("ref"));
    let container = sample_container(Alphabet::DNA);

    let mut builder = IndexTableBuilder::new(&container, idx.clone());
    let report = builder.build(&[Table::Successor, Table::Bwt]).unwrap();
    assert!(!report.is_success());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Table::Bwt);
    assert!(matches!(failures[0].1, IndexError::PrerequisiteMissing { .. }));
    assert!(idx.exists(Table::Successor));
}

#[test]
fn corrupt_container_is_rejected() {
    let dir = TempDir::new().unwrap();
    let idx = IndexName::new(dir.path().join("ref"));
    sample_container(Alphabet::DNA).save(&idx).unwrap();

    let mut bytes = std::fs::read(idx.seq()).unwrap();
    bytes.pop();
    std::fs::write(idx.seq(), &bytes).unwrap();
    assert!(matches!(Container::open(&idx), Err(IndexError::FormatInconsistency(_))));
}

fn assert_inconsistent(report: &BuildReport, table: Table) {
    match report.outcome(table) {
        Some(StepOutcome::Failed { error: IndexError::FormatInconsistency(_), .. }) => {}
        other => panic!("{}: expected a format inconsistency, got {:?}", table, other),
    }
}

#[test]
fn tables_left_from_a_shorter_container_fail_their_steps() {
    let dir = TempDir::new().unwrap();
    let idx = IndexName::new(dir.path().join("ref"));
    let mut container = Container::new(Alphabet::DNA);
    container.append_sequence(b"ACGT", "s1", true);
    container.save(&idx).unwrap();
    IndexTableBuilder::new(&container, idx.clone())
        .build(&[Table::Successor, Table::Pos])
        .unwrap();

    // 容器增长后重新保存，nextpos / pos 仍是旧的
    container.append_sequence(b"GATTACA", "s2", true);
    container.save(&idx).unwrap();
    let grown = Container::open(&idx).unwrap();

    let report = IndexTableBuilder::new(&grown, idx.clone())
        .build(&[Table::Lcp, Table::Rindex])
        .unwrap();
    assert_inconsistent(&report, Table::Lcp);
    assert_inconsistent(&report, Table::Rindex);
    assert!(report.built().is_empty());
}

/// 为长容器建好全部表，再用短容器的同名表覆盖其中一张
fn index_with_stale(dir: &TempDir, name: &str, stale: Table) -> (Container, IndexName) {
    let base = [Table::Successor, Table::Pos, Table::Lcp, Table::Bwt];

    let short_idx = IndexName::new(dir.path().join(format!("{}-short", name)));
    let mut short = Container::new(Alphabet::DNA);
    short.append_sequence(b"ACGT", "s1", true);
    short.save(&short_idx).unwrap();
    assert!(IndexTableBuilder::new(&short, short_idx.clone()).build(&base).unwrap().is_success());

    let idx = IndexName::new(dir.path().join(name));
    let container = sample_container(Alphabet::DNA);
    container.save(&idx).unwrap();
    assert!(IndexTableBuilder::new(&container, idx.clone()).build(&base).unwrap().is_success());

    std::fs::copy(short_idx.table(stale), idx.table(stale)).unwrap();
    (container, idx)
}

#[test]
fn stale_successor_table_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    let (container, idx) = index_with_stale(&dir, "ref", Table::Successor);
    let report = IndexTableBuilder::new(&container, idx.clone())
        .build(&[Table::Lcp, Table::Bwt, Table::Rindex])
        .unwrap();
    assert_inconsistent(&report, Table::Lcp);
    assert_eq!(report.built(), vec![Table::Bwt, Table::Rindex]);
}

#[test]
fn stale_suffix_array_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    let (container, idx) = index_with_stale(&dir, "ref", Table::Pos);
    let report = IndexTableBuilder::new(&container, idx.clone())
        .build(&[Table::CompressedLcp(1), Table::Bwt, Table::Rindex])
        .unwrap();
    assert_inconsistent(&report, Table::Bwt);
    assert_inconsistent(&report, Table::Rindex);
    assert_eq!(report.built(), vec![Table::CompressedLcp(1)]);
}

#[test]
fn stale_bwt_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    let (container, idx) = index_with_stale(&dir, "ref", Table::Bwt);
    let report = IndexTableBuilder::new(&container, idx.clone())
        .build(&[Table::Occ(4), Table::Rindex])
        .unwrap();
    assert_inconsistent(&report, Table::Occ(4));
    assert_eq!(report.built(), vec![Table::Rindex]);
    assert!(!idx.exists(Table::Occ(4)));
}

#[test]
fn stale_lcp_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    let (container, idx) = index_with_stale(&dir, "ref", Table::Lcp);
    let report = IndexTableBuilder::new(&container, idx.clone())
        .build(&[Table::CompressedLcp(1), Table::CompressedLcp(2), Table::Rindex])
        .unwrap();
    assert_inconsistent(&report, Table::CompressedLcp(1));
    assert_inconsistent(&report, Table::CompressedLcp(2));
    assert_eq!(report.built(), vec![Table::Rindex]);
}
