use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use trident_bench_core::extract::{
    extract_dir, read_summary, write_json, write_summary, LogProfile, QueryRow,
};

fn gz(path: &std::path::Path, body: &str) {
    let mut enc = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::fast());
    enc.write_all(body.as_bytes()).unwrap();
    enc.finish().unwrap();
}

#[test]
fn baseline_logs_with_compressed_results() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("logs_q1"),
        "Time total: 120 ms\nTime query: 80 ms\nMax mem: 300 MB\nIO Read bytes: 77\n\
         Time total: 30 ms\nTime query: 20 ms\nTime total: 50 ms\nTime query: 40 ms\n",
    )?;
    gz(&dir.path().join("results_q1.gz"), "1\n2\n3\n4\n 4 cardinality\n");

    let rows = extract_dir(dir.path(), &LogProfile::baseline())?;
    assert_eq!(rows.len(), 1);
    let s = rows[0].summary();
    assert_eq!(s.cold_runtime, Some(120.0));
    assert_eq!(s.avg_warm_runtime, Some(40.0));
    assert_eq!(s.cold_q_runtime, Some(80.0));
    assert_eq!(s.avg_warm_q_runtime, Some(30.0));
    assert_eq!(s.rows, Some(4));
    assert_eq!(s.max_mem_mb, Some(300.0));
    assert_eq!(s.io_bytes, Some(77.0));
    Ok(())
}

#[test]
fn legacy_layout_counts_every_result_line() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("logs_q7"),
        "[t] Runtime totalexec: 9ms.\n[t] Runtime totalexec: 3ms.\n[t] Runtime queryexec: 2ms.\n",
    )?;
    std::fs::write(dir.path().join("logs_q7_results"), "a\nb\n<empty result>\n")?;

    let rows = extract_dir(dir.path(), &LogProfile::legacy())?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].query, "q7");
    assert_eq!(rows[0].total.cold, Some(9.0));
    assert_eq!(rows[0].total.warm, vec![3.0]);
    assert_eq!(rows[0].rows, Some(3));
    Ok(())
}

#[test]
fn summaries_are_sorted_and_readable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    for q in ["q3", "q1", "q2"] {
        std::fs::write(
            dir.path().join(format!("logs_{}", q)),
            "Runtime total: 5ms.\nRuntime total: 7ms.\n# rows: 1\n",
        )?;
    }
    // a single run has no warm mean
    std::fs::write(dir.path().join("logs_q0"), "Runtime total: 1ms.\n# rows: 0\n")?;

    let rows = extract_dir(dir.path(), &LogProfile::engine())?;
    let names: Vec<&str> = rows.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(names, vec!["q0", "q1", "q2", "q3"]);

    let summary: Vec<_> = rows.iter().map(QueryRow::summary).collect();
    let path = dir.path().join("summary.tsv");
    write_summary(std::fs::File::create(&path)?, &summary)?;
    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with("QUERY\tCOLD_RUNTIME\tAVG_WARM_RUNTIME"));
    assert!(text.contains("q0\t1\t-1\t-1\t-1\t0\t-1\t-1\n"));
    assert_eq!(read_summary(&path)?, summary);

    let json_path = dir.path().join("rows.json");
    write_json(std::fs::File::create(&json_path)?, &rows)?;
    assert_eq!(read_summary(&json_path)?, summary);
    Ok(())
}

#[test]
fn missing_results_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("logs_q1"), "Runtime total: 5ms.\n")?;

    let err = extract_dir(dir.path(), &LogProfile::engine()).unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("results_q1"), "{}", msg);

    std::fs::write(dir.path().join("results_q1"), "<a>\n<b>\n")?;
    let rows = extract_dir(dir.path(), &LogProfile::engine())?;
    assert_eq!(rows[0].rows, Some(2));
    Ok(())
}

#[test]
fn missing_directory_is_an_error() {
    let err = extract_dir(std::path::Path::new("/nonexistent/results"), &LogProfile::engine())
        .unwrap_err();
    assert!(err.to_string().contains("failed to list"));
}
