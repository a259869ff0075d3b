// SPDX-License-Identifier: AGPL-3.0-or-later
//! File-level parser and report tests.

use std::fs;

use cophy::error::Error;
use cophy::io::report::{write_graph, write_histogram_csv, HistogramFormat};
use cophy::io::{tip_map, tree_text};
use cophy::recon::dp::{reconcile, DtlCosts};
use cophy::recon::histogram::Histogram;

#[test]
fn trees_and_tip_map_load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let host_path = dir.path().join("host.tree");
    let para_path = dir.path().join("parasite.tree");
    let map_path = dir.path().join("tips.map");
    fs::write(&host_path, "((a,c)m,b)r;\n").unwrap();
    fs::write(&para_path, "(x,y)q\n").unwrap();
    fs::write(&map_path, "# tip associations\nx:a\ny:b\n").unwrap();

    let host = tree_text::parse_file(&host_path).unwrap();
    let para = tree_text::parse_file(&para_path).unwrap();
    let phi = tip_map::load(&map_path, &para, &host).unwrap();
    assert_eq!(host.len(), 5);
    assert_eq!(para.len(), 3);
    assert_eq!(phi.len(), 2);

    let rec = reconcile(&host, &para, &phi, &DtlCosts::default()).unwrap();
    assert_eq!(rec.best_cost, 1);
}

#[test]
fn missing_files_carry_their_path() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("nope.tree");
    match tree_text::parse_file(&absent).unwrap_err() {
        Error::Io { path, .. } => assert_eq!(path, absent),
        other => panic!("expected Io error, got {other}"),
    }
    let host = tree_text::parse("(a,b)r").unwrap();
    let para = tree_text::parse("(x,y)q").unwrap();
    assert!(matches!(
        tip_map::load(&dir.path().join("nope.map"), &para, &host),
        Err(Error::Io { .. })
    ));
}

#[test]
fn malformed_inputs_are_rejected_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let bad_tree = dir.path().join("bad.tree");
    fs::write(&bad_tree, "((a,b)m,c\n").unwrap();
    assert!(matches!(
        tree_text::parse_file(&bad_tree),
        Err(Error::Tree(_))
    ));

    let host = tree_text::parse("(a,b)r").unwrap();
    let para = tree_text::parse("(x,y)q").unwrap();
    let bad_map = dir.path().join("bad.map");
    fs::write(&bad_map, "x:a\ny:r\n").unwrap();
    // y maps to an internal host node
    assert!(matches!(
        tip_map::load(&bad_map, &para, &host),
        Err(Error::TipMap(_))
    ));
}

#[test]
fn graph_report_parses_back_by_eye() {
    // The report names nodes, not ids, and lists roots first.
    let host = tree_text::parse("(a,b)r").unwrap();
    let para = tree_text::parse("(x,y)q").unwrap();
    let phi = cophy::recon::tree::TipMapping::new(&[("x", "a"), ("y", "a")], &para, &host)
        .unwrap();
    let rec = reconcile(&host, &para, &phi, &DtlCosts::default()).unwrap();
    let mut buf = Vec::new();
    write_graph(&mut buf, &rec.graph, &para, &host).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(
        text,
        "roots: (q, a)\n(x, a): C\n(y, a): C\n(q, a): D((x, a), (y, a))\n"
    );
}

#[test]
fn histogram_csv_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pdv.csv");
    let mut h = Histogram::point(0, 3);
    h.add(3, 2);
    let mut file = fs::File::create(&path).unwrap();
    write_histogram_csv(&mut file, &h, &HistogramFormat::default()).unwrap();
    drop(file);
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "distance,count\n0,3\n1,0\n2,0\n3,2\n");
}
