mod common;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use common::{Decoded, Fixture, content_of, decode, kinds_for, pattern, verify_checksums};
use packstream::archive::archive_to_output;
use packstream::{ArchiveError, ArchiveOpts, Archiver, BlockKind, Opts, archive_dirs};

fn run(roots: &[PathBuf], opts: &ArchiveOpts) -> (Vec<u8>, Vec<Decoded>) {
    let mut out = Vec::new();
    archive_dirs(roots, opts, &mut out).unwrap();
    let blocks = decode(&out);
    (out, blocks)
}

fn non_checksum(blocks: &[Decoded]) -> Vec<&Decoded> {
    blocks
        .iter()
        .filter(|b| b.kind != BlockKind::Checksum)
        .collect()
}

#[test]
fn test_small_tree_scenario() {
    let fx = Fixture::new();
    fx.write("a", &pattern(130_000));
    fx.write("b/c", b"");

    let (out, blocks) = run(&[fx.root.clone()], &ArchiveOpts::default());
    verify_checksums(&out, &blocks);

    assert_eq!(kinds_for(&blocks, &fx.wire("")), vec![BlockKind::Directory]);
    assert_eq!(kinds_for(&blocks, &fx.wire("b")), vec![BlockKind::Directory]);
    assert_eq!(
        kinds_for(&blocks, &fx.wire("a")),
        vec![
            BlockKind::StartOfFile,
            BlockKind::Data,
            BlockKind::Data,
            BlockKind::EndOfFile
        ]
    );
    let sizes: Vec<usize> = blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Data)
        .map(|b| b.data.len())
        .collect();
    assert_eq!(sizes, vec![65535, 64465]);
    assert_eq!(content_of(&blocks, &fx.wire("a")), pattern(130_000));
    assert_eq!(
        kinds_for(&blocks, &fx.wire("b/c")),
        vec![BlockKind::StartOfFile, BlockKind::EndOfFile]
    );

    // 2 directories + 4 + 2 file blocks, then the closing checksum
    assert_eq!(blocks.len(), 9);
    assert_eq!(blocks.last().unwrap().kind, BlockKind::Checksum);
}

#[test]
fn test_directory_comes_before_its_children() {
    let fx = Fixture::new();
    fx.write("x/y/z.txt", b"deep");

    let (_, blocks) = run(&[fx.root.clone()], &ArchiveOpts::default());
    let pos = |p: &str| blocks.iter().position(|b| b.path == p).unwrap();
    assert!(pos(&fx.wire("")) < pos(&fx.wire("x")));
    assert!(pos(&fx.wire("x")) < pos(&fx.wire("x/y")));
    assert!(pos(&fx.wire("x/y")) < pos(&fx.wire("x/y/z.txt")));
}

#[cfg(unix)]
#[test]
fn test_ownership_mode_carries_file_type() {
    let fx = Fixture::new();
    fx.write("f", b"1");

    let (_, blocks) = run(&[fx.root.clone()], &ArchiveOpts::default());
    let mode_of = |p: &str| {
        blocks
            .iter()
            .find(|b| b.path == p && b.owner.is_some())
            .and_then(|b| b.owner)
            .unwrap()
            .mode
    };
    assert_eq!(mode_of(&fx.wire("")) & 0o170000, 0o040000);
    assert_eq!(mode_of(&fx.wire("f")) & 0o170000, 0o100000);
}

#[test]
fn test_per_file_block_order_under_contention() {
    let fx = Fixture::new();
    for i in 0..40 {
        fx.write(&format!("d{}/f{}", i % 5, i), &pattern(100 + i * 37));
    }
    let opts = ArchiveOpts {
        dir_workers: 4,
        file_workers: 8,
        dir_queue_size: 1,
        file_queue_size: 1,
        block_queue_size: 1,
        chunk_size: 16,
        ..ArchiveOpts::default()
    };

    let (out, blocks) = run(&[fx.root.clone()], &opts);
    verify_checksums(&out, &blocks);
    for i in 0..40 {
        let path = fx.wire(&format!("d{}/f{}", i % 5, i));
        let kinds = kinds_for(&blocks, &path);
        assert_eq!(kinds.first(), Some(&BlockKind::StartOfFile), "{path}");
        assert_eq!(kinds.last(), Some(&BlockKind::EndOfFile), "{path}");
        assert!(
            kinds[1..kinds.len() - 1]
                .iter()
                .all(|k| *k == BlockKind::Data),
            "{path}"
        );
        let data_blocks: Vec<&Decoded> = blocks
            .iter()
            .filter(|b| b.path == path && b.kind == BlockKind::Data)
            .collect();
        let (last, full) = data_blocks.split_last().unwrap();
        assert!(full.iter().all(|b| b.data.len() == 16));
        assert!(!last.data.is_empty() && last.data.len() <= 16);
        assert_eq!(content_of(&blocks, &path), pattern(100 + i * 37));
    }
}

#[test]
fn test_checksum_every_thousand_blocks() {
    let fx = Fixture::new();
    // 1 directory + 600 empty files * 2 blocks = 1201 queue blocks
    for i in 0..600 {
        fx.write(&format!("e{i:03}"), b"");
    }

    let (out, blocks) = run(&[fx.root.clone()], &ArchiveOpts::default());
    verify_checksums(&out, &blocks);

    let checksum_positions: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.kind == BlockKind::Checksum)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(checksum_positions, vec![1000, 1202]);
    assert_eq!(non_checksum(&blocks).len(), 1201);
}

#[test]
fn test_summary_counts() {
    let fx = Fixture::new();
    fx.write("a", &pattern(10));
    fx.write("sub/b", &pattern(20));

    let summary = archive_dirs(&[fx.root.clone()], &ArchiveOpts::default(), io::sink()).unwrap();
    assert_eq!(summary.directories, 2);
    assert_eq!(summary.files, 2);
    assert_eq!(summary.bytes, 30);
    // 2 directories + (sof, data, eof) * 2
    assert_eq!(summary.blocks, 8);
    assert_eq!(summary.checksums, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.truncated, 0);
}

fn archived_paths(fx: &Fixture, exclude: &[&str]) -> Vec<String> {
    let opts = ArchiveOpts {
        exclude: exclude.iter().map(|p| p.to_string()).collect(),
        ..ArchiveOpts::default()
    };
    let (_, blocks) = run(&[fx.root.clone()], &opts);
    blocks.into_iter().map(|b| b.path).collect()
}

#[test]
fn test_exclusion_matches_whole_path() {
    let fx = Fixture::new();
    fx.write("keep.txt", b"k");
    fx.write("debug.log", b"l");
    fx.write("skipme/inner.txt", b"i");
    fx.write("nested/deep.log", b"d");
    fx.write("x/d", b"d");

    // bare patterns only match single-component paths, and every path here starts with the root
    let paths = archived_paths(&fx, &["*.log", "skipme", "d"]);
    for kept in ["keep.txt", "debug.log", "skipme/inner.txt", "nested/deep.log", "x/d"] {
        assert!(paths.contains(&fx.wire(kept)), "{kept} missing");
    }

    let paths = archived_paths(&fx, &["*/*.log", "*/skipme", "*/nested/*.log"]);
    assert!(paths.contains(&fx.wire("keep.txt")));
    assert!(paths.contains(&fx.wire("nested")));
    assert!(paths.contains(&fx.wire("x/d")));
    for gone in ["debug.log", "skipme", "skipme/inner.txt", "nested/deep.log"] {
        assert!(!paths.contains(&fx.wire(gone)), "{gone} archived");
    }
}

#[test]
fn test_excluded_sibling_leaves_others() {
    let fx = Fixture::new();
    fx.write("a/one.tmp", b"1");
    fx.write("a/two.txt", b"2");

    let paths = archived_paths(&fx, &["*/a/*.tmp"]);
    assert!(!paths.contains(&fx.wire("a/one.tmp")));
    assert!(paths.contains(&fx.wire("a/two.txt")));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_skipped() {
    let fx = Fixture::new();
    fx.write("target.txt", b"t");
    fx.mkdir("realdir");
    std::os::unix::fs::symlink("target.txt", fx.abs("link.txt")).unwrap();
    std::os::unix::fs::symlink("realdir", fx.abs("linkdir")).unwrap();

    let mut out = Vec::new();
    let summary = archive_dirs(&[fx.root.clone()], &ArchiveOpts::default(), &mut out).unwrap();
    let blocks = decode(&out);
    assert!(kinds_for(&blocks, &fx.wire("link.txt")).is_empty());
    assert!(kinds_for(&blocks, &fx.wire("linkdir")).is_empty());
    assert_eq!(
        kinds_for(&blocks, &fx.wire("realdir")),
        vec![BlockKind::Directory]
    );
    assert_eq!(summary.skipped, 2);
}

#[cfg(unix)]
#[test]
fn test_fifo_is_skipped_by_default() {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let fx = Fixture::new();
    fx.write("plain", b"p");
    let fifo = CString::new(fx.abs("pipe").as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(fifo.as_ptr(), 0o644) }, 0);

    let mut out = Vec::new();
    let summary = archive_dirs(&[fx.root.clone()], &ArchiveOpts::default(), &mut out).unwrap();
    let blocks = decode(&out);
    assert!(kinds_for(&blocks, &fx.wire("pipe")).is_empty());
    assert_eq!(summary.files, 1);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_absolute_root_fails_run() {
    let fx = Fixture::new();
    fx.write("a", b"a");

    let archiver = Archiver::new(ArchiveOpts::default());
    archiver.add_dir(fx.root.clone()).unwrap();
    archiver.add_dir(fx.tmp.path().to_path_buf()).unwrap();
    let err = archiver.run(Vec::new()).unwrap_err();
    assert!(err.is_absolute_path(), "unexpected error: {err}");
}

#[test]
fn test_missing_root_is_skipped() {
    let archiver = Archiver::new(ArchiveOpts::default());
    archiver.add_dir("pstest-does-not-exist").unwrap();
    let mut out = Vec::new();
    let summary = archiver.run(&mut out).unwrap();
    assert_eq!(summary.skipped, 1);
    let blocks = decode(&out);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Checksum);
}

#[test]
fn test_empty_run_is_header_and_checksum() {
    let mut out = Vec::new();
    let summary = Archiver::new(ArchiveOpts::default()).run(&mut out).unwrap();
    assert_eq!(summary.blocks, 0);
    assert_eq!(summary.checksums, 1);
    assert_eq!(out.len(), 8 + 3 + 8);
    verify_checksums(&out, &decode(&out));
}

#[test]
fn test_registrar_closed_after_run() {
    let fx = Fixture::new();
    fx.write("a", b"a");

    let archiver = Archiver::new(ArchiveOpts::default());
    let registrar = archiver.registrar();
    registrar.add_dir(fx.root.clone()).unwrap();
    archiver.run(io::sink()).unwrap();
    assert!(matches!(
        registrar.add_dir(fx.root.clone()),
        Err(ArchiveError::Closed)
    ));
}

#[test]
fn test_multiple_roots() {
    let one = Fixture::new();
    let two = Fixture::new();
    one.write("x", b"1");
    two.write("y", b"2");

    let (_, blocks) = run(&[one.root.clone(), two.root.clone()], &ArchiveOpts::default());
    assert_eq!(content_of(&blocks, &one.wire("x")), b"1");
    assert_eq!(content_of(&blocks, &two.wire("y")), b"2");
}

#[test]
fn test_same_tree_gives_same_block_multiset() {
    let fx = Fixture::new();
    for i in 0..20 {
        fx.write(&format!("s{}/f{}", i % 3, i), &pattern(i * 1000));
    }
    let opts = ArchiveOpts {
        chunk_size: 700,
        ..ArchiveOpts::default()
    };

    let multiset = |blocks: &[Decoded]| {
        let mut counts: HashMap<(BlockKind, String, Vec<u8>), usize> = HashMap::new();
        for b in non_checksum(blocks) {
            *counts
                .entry((b.kind, b.path.clone(), b.data.clone()))
                .or_default() += 1;
        }
        counts
    };
    let (_, first) = run(&[fx.root.clone()], &opts);
    let (_, second) = run(&[fx.root.clone()], &opts);
    assert_eq!(multiset(&first), multiset(&second));
}

/// Accepts `limit` bytes, then fails every write.
struct FailingSink {
    written: usize,
    limit: usize,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written >= self.limit {
            return Err(io::Error::other("disk full"));
        }
        let n = buf.len().min(self.limit - self.written);
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_error_stops_run() {
    let fx = Fixture::new();
    for i in 0..8 {
        fx.write(&format!("big{i}"), &pattern(200_000));
    }
    let opts = ArchiveOpts {
        block_queue_size: 2,
        ..ArchiveOpts::default()
    };

    let sink = FailingSink {
        written: 0,
        limit: 50_000,
    };
    let archiver = Archiver::new(opts);
    archiver.add_dir(fx.root.clone()).unwrap();
    let err = archiver.run(sink).unwrap_err();
    assert!(matches!(err, ArchiveError::Io(_)), "unexpected error: {err}");
}

#[test]
fn test_archive_to_file_skips_itself() {
    let fx = Fixture::new();
    fx.write("data.bin", &pattern(5000));
    let output = fx.root.join("out.pstr");

    let opts = Opts {
        output: Some(output.clone()),
        ..Opts::default()
    };
    let summary = archive_to_output(&[fx.root.clone()], &opts).unwrap();
    assert_eq!(summary.files, 1);

    let out = fs::read(&output).unwrap();
    let blocks = decode(&out);
    verify_checksums(&out, &blocks);
    assert!(kinds_for(&blocks, &fx.wire("out.pstr")).is_empty());
    assert!(kinds_for(&blocks, &fx.wire("out.pstr.tmp")).is_empty());
    assert!(!common::exists(&fx.abs("out.pstr.tmp")));
    assert_eq!(content_of(&blocks, &fx.wire("data.bin")), pattern(5000));
}

#[cfg(unix)]
#[test]
fn test_register_root_while_running() {
    use packstream::SpecialFiles;
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let first = Fixture::new();
    let second = Fixture::new();
    second.write("late.txt", b"late");
    let fifo_path = first.abs("pipe");
    let fifo = CString::new(fifo_path.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(fifo.as_ptr(), 0o644) }, 0);

    let archiver = Archiver::new(ArchiveOpts {
        special_files: SpecialFiles::Read,
        ..ArchiveOpts::default()
    });
    let registrar = archiver.registrar();
    registrar.add_dir(first.root.clone()).unwrap();
    let run = std::thread::spawn(move || {
        let mut out = Vec::new();
        archiver.run(&mut out).map(|summary| (summary, out))
    });

    // the reader is stuck on the FIFO until it gets a writer, so the run cannot finish yet
    registrar.add_dir(second.root.clone()).unwrap();
    fs::write(&fifo_path, b"from fifo").unwrap();

    let (summary, out) = run.join().unwrap().unwrap();
    let blocks = decode(&out);
    assert_eq!(summary.files, 2);
    assert_eq!(content_of(&blocks, &first.wire("pipe")), b"from fifo");
    assert_eq!(content_of(&blocks, &second.wire("late.txt")), b"late");
}
