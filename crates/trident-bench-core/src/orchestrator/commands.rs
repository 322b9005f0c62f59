//! Command lines for the engine, the baseline store and the helpers around them.

use super::exec::Invocation;
use crate::errors::ConfigError;
use crate::model::{split_opts, BenchConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// SPARQL through the engine's RDF-3X style optimizer (`query`).
    Sparql,
    /// The engine's own query evaluator (`query_native`).
    Native,
}

impl QueryKind {
    pub fn subcommand(&self) -> &'static str {
        match self {
            QueryKind::Sparql => "query",
            QueryKind::Native => "query_native",
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> String {
    format!("{}{}", path.display(), suffix)
}

/// The engine executable.
#[derive(Debug, Clone)]
pub struct Engine {
    pub exe: PathBuf,
}

impl Engine {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    fn cmd(&self, subcommand: &str) -> Invocation {
        Invocation::new(&self.exe).arg(subcommand)
    }

    pub fn load(&self, input: &Path, db: &Path, opts: &str) -> Invocation {
        self.cmd("load")
            .args(["-l", "debug", "-f"])
            .path_arg(input)
            .arg("-i")
            .path_arg(db)
            .arg("--logfile")
            .arg(with_suffix(db, ".log"))
            .args(split_opts(opts))
    }

    /// Load from a compressed, pre-partitioned input (`part-r-00*`).
    pub fn load_compressed(&self, input: &Path, db: &Path, opts: &str) -> Invocation {
        self.cmd("load")
            .args(["-l", "debug", "--comprinput"])
            .path_arg(input)
            .arg("-i")
            .path_arg(db)
            .arg("--logfile")
            .arg(with_suffix(db, ".log"))
            .args(split_opts(opts))
    }

    pub fn add(&self, input: &Path, db: &Path, opts: &str, tag: &str) -> Invocation {
        self.update("add", input, db, opts, tag)
    }

    pub fn rm(&self, input: &Path, db: &Path, opts: &str, tag: &str) -> Invocation {
        self.update("rm", input, db, opts, tag)
    }

    fn update(&self, op: &str, input: &Path, db: &Path, opts: &str, tag: &str) -> Invocation {
        self.cmd(op)
            .args(["-l", "debug", "--update"])
            .path_arg(input)
            .arg("-i")
            .path_arg(db)
            .arg("--logfile")
            .arg(with_suffix(db, &format!(".{}.log.{}", op, tag)))
            .args(split_opts(opts))
    }

    pub fn merge(&self, db: &Path, opts: &str, tag: &str) -> Invocation {
        self.cmd("merge")
            .args(["-l", "debug", "-i"])
            .path_arg(db)
            .arg("--logfile")
            .arg(with_suffix(db, &format!(".merge.log.{}", tag)))
            .args(split_opts(opts))
    }

    /// First pass over a query: debug logging, decoded results on stdout.
    pub fn query_results(
        &self,
        kind: QueryKind,
        db: &Path,
        query_file: &Path,
        opts: &str,
    ) -> Invocation {
        self.cmd(kind.subcommand())
            .arg("-i")
            .path_arg(db)
            .arg("-q")
            .path_arg(query_file)
            .args(["-l", "debug"])
            .args(split_opts(opts))
    }

    /// Second pass: repeated runs without decoding, for the timing statistics.
    pub fn query_stats(
        &self,
        kind: QueryKind,
        db: &Path,
        query_file: &Path,
        repeats: u32,
        opts: &str,
    ) -> Invocation {
        self.cmd(kind.subcommand())
            .arg("-i")
            .path_arg(db)
            .arg("-q")
            .path_arg(query_file)
            .args(["-l", "info", "-r"])
            .arg(repeats.to_string())
            .args(["--decodeoutput", "false"])
            .args(split_opts(opts))
    }

    pub fn analytics(&self, db: &Path, op: &str, param: Option<&str>) -> Invocation {
        let mut inv = self.cmd("analytics").arg("-i").path_arg(db).args(["-l", "info"]);
        if let Some(p) = param.filter(|p| !p.is_empty()) {
            inv = inv.arg("--oparg2").arg(p);
        }
        inv.arg("--op").arg(op)
    }

    /// Generate the random scan workload used by test 1.
    pub fn testcq(&self, db: &Path, query_file: &Path) -> Invocation {
        self.cmd("testcq")
            .arg("-i")
            .path_arg(db)
            .arg("--testqueryfile")
            .path_arg(query_file)
    }

    pub fn testti(&self, db: &Path, query_file: &Path) -> Invocation {
        self.cmd("testti")
            .args(["-l", "debug", "-i"])
            .path_arg(db)
            .arg("--testqueryfile")
            .path_arg(query_file)
    }
}

/// The comparison store and its helper scripts.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    load: Option<PathBuf>,
    query: Option<PathBuf>,
    test: Option<PathBuf>,
    import_script: PathBuf,
    query_script: PathBuf,
}

fn require<'a>(exe: &'a Option<PathBuf>, key: &str) -> Result<&'a Path, ConfigError> {
    exe.as_deref()
        .ok_or_else(|| ConfigError(format!("'{}' is required by this test", key)))
}

impl BaselineStore {
    pub fn from_config(cfg: &BenchConfig) -> Self {
        Self {
            load: cfg.rdf3xload.clone(),
            query: cfg.rdf3xquery.clone(),
            test: cfg.rdf3xtest.clone(),
            import_script: cfg.rdf3x_import_script(),
            query_script: cfg.rdf3x_query_script(),
        }
    }

    /// Build a database from the engine's compressed dictionary and triples.
    pub fn load_from_mappings(
        &self,
        db: &Path,
        triples: &Path,
        dict: &Path,
    ) -> Result<Invocation, ConfigError> {
        Ok(Invocation::new(require(&self.load, "rdf3xload")?)
            .path_arg(db)
            .path_arg(triples)
            .path_arg(dict))
    }

    pub fn import(&self, input: &Path, db: &Path) -> Result<Invocation, ConfigError> {
        let loader = require(&self.load, "rdf3xload")?;
        Ok(Invocation::new(&self.import_script)
            .path_arg(input)
            .path_arg(db)
            .path_arg(loader))
    }

    pub fn query_batch(
        &self,
        db: &Path,
        queries: &Path,
        out: &Path,
    ) -> Result<Invocation, ConfigError> {
        let query = require(&self.query, "rdf3xquery")?;
        Ok(Invocation::new(&self.query_script)
            .path_arg(db)
            .path_arg(queries)
            .path_arg(out)
            .path_arg(query))
    }

    pub fn test(&self, db: &Path, query_file: &Path) -> Result<Invocation, ConfigError> {
        Ok(Invocation::new(require(&self.test, "rdf3xtest")?)
            .path_arg(db)
            .path_arg(query_file))
    }
}

pub fn snap_test(exe: &Path, graph: &Path, dataset_dir: &Path) -> Invocation {
    Invocation::new(exe)
        .path_arg(graph)
        .path_arg(dataset_dir.join("output"))
        .path_arg(dataset_dir.join("terms_snap"))
        .path_arg(dataset_dir.join("terms_snap_p"))
}

/// Writes a randomly permuted copy of `input` to `output`.
pub fn shuffle(input: &Path, output: &Path) -> Invocation {
    Invocation::new("sort")
        .arg("-R")
        .path_arg(input)
        .stdout(super::exec::Stdio::Create(output.to_path_buf()))
}

/// Page-cache flush, output discarded.
pub fn flush_cache(command_line: &str) -> Option<Invocation> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next()?;
    Some(
        Invocation::new(program)
            .args(parts)
            .stdout(super::exec::Stdio::Null)
            .stderr(super::exec::Stdio::Null),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new("/opt/trident")
    }

    #[test]
    fn load_appends_extra_options_last() {
        let inv = engine().load(
            Path::new("/data/lubm1b"),
            Path::new("/out/db/lubm1b"),
            "--skipTables true",
        );
        assert_eq!(
            inv.command_line(),
            "/opt/trident load -l debug -f /data/lubm1b -i /out/db/lubm1b \
             --logfile /out/db/lubm1b.log --skipTables true"
        );
    }

    #[test]
    fn update_logfiles_carry_operation_and_tag() {
        let db = Path::new("/db/x");
        let add = engine().add(Path::new("/in/p1"), db, "", "7950-7960");
        assert!(add.args.contains(&"/db/x.add.log.7950-7960".to_string()));
        let rm = engine().rm(Path::new("/in/p1"), db, "", "3");
        assert_eq!(rm.args[0], "rm");
        assert!(rm.args.contains(&"/db/x.rm.log.3".to_string()));
        let merge = engine().merge(db, "", "add");
        assert_eq!(
            merge.command_line(),
            "/opt/trident merge -l debug -i /db/x --logfile /db/x.merge.log.add"
        );
    }

    #[test]
    fn stats_run_repeats_without_decoding() {
        let inv = engine().query_stats(
            QueryKind::Native,
            Path::new("/db"),
            Path::new("/q/q1"),
            6,
            "--opt x",
        );
        assert_eq!(
            inv.command_line(),
            "/opt/trident query_native -i /db -q /q/q1 -l info -r 6 --decodeoutput false --opt x"
        );
    }

    #[test]
    fn analytics_skips_empty_parameter() {
        let db = Path::new("/db/astro");
        let plain = engine().analytics(db, "pagerank", Some(""));
        assert!(!plain.args.contains(&"--oparg2".to_string()));
        let rw = engine().analytics(db, "rw", Some("len=3;nodes=/n"));
        assert_eq!(
            rw.command_line(),
            "/opt/trident analytics -i /db/astro -l info --oparg2 len=3;nodes=/n --op rw"
        );
    }

    #[test]
    fn baseline_requires_configured_executables() {
        let cfg: BenchConfig =
            serde_yaml::from_str("input: i\nqueries: q\noutput: o\ntrident: t\n").unwrap();
        let store = BaselineStore::from_config(&cfg);
        let err = store.test(Path::new("/db"), Path::new("/q")).unwrap_err();
        assert!(err.to_string().contains("rdf3xtest"));
    }

    #[test]
    fn flush_command_is_split_and_silenced() {
        let inv = flush_cache("sudo /usr/bin/drop_caches").unwrap();
        assert_eq!(inv.program, PathBuf::from("sudo"));
        assert_eq!(inv.args, vec!["/usr/bin/drop_caches"]);
        assert_eq!(inv.stderr, super::super::exec::Stdio::Null);
        assert!(flush_cache("  ").is_none());
    }
}
