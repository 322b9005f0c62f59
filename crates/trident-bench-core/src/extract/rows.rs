use anyhow::Context;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Counts lines of `reader` that do not contain `skip`.
pub fn count_rows<R: BufRead>(reader: R, skip: Option<&str>) -> std::io::Result<u64> {
    let mut rows = 0;
    for line in reader.split(b'\n') {
        let line = line?;
        let is_meta = skip.is_some_and(|s| contains(&line, s.as_bytes()));
        if !is_meta {
            rows += 1;
        }
    }
    Ok(rows)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// `path` itself, or its `.gz` sibling when only the compressed copy exists.
pub fn locate(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let mut gz = path.as_os_str().to_os_string();
    gz.push(".gz");
    let gz = PathBuf::from(gz);
    gz.is_file().then_some(gz)
}

/// Opens a results file, decompressing `.gz` files transparently.
pub fn open_maybe_gz(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Result cardinality stored at `path` (or `path.gz`); `None` if neither exists.
pub fn count_result_rows(path: &Path, skip: Option<&str>) -> anyhow::Result<Option<u64>> {
    let Some(found) = locate(path) else {
        return Ok(None);
    };
    let reader = open_maybe_gz(&found)?;
    let rows =
        count_rows(reader, skip).with_context(|| format!("failed to read {}", found.display()))?;
    Ok(Some(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn skips_metadata_lines() {
        let text = "<a> <b>\n<empty result>\n<c> <d>\n";
        assert_eq!(count_rows(text.as_bytes(), Some("<empty result")).unwrap(), 2);
        assert_eq!(count_rows(text.as_bytes(), None).unwrap(), 3);
        assert_eq!(count_rows("".as_bytes(), None).unwrap(), 0);
    }

    #[test]
    fn reads_gzip_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let gz = File::create(dir.path().join("results_q1.gz")).unwrap();
        let mut enc = GzEncoder::new(gz, Compression::default());
        enc.write_all(b"1 2\n3 4\n5 6\n8 cardinality\n").unwrap();
        enc.finish().unwrap();

        let rows = count_result_rows(&dir.path().join("results_q1"), Some(" cardinality")).unwrap();
        assert_eq!(rows, Some(3));
        assert_eq!(
            count_result_rows(&dir.path().join("results_q2"), None).unwrap(),
            None
        );
    }
}
