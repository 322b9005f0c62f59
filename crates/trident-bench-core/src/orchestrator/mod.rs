//! Sequential experiment pipelines driving the engine and the baseline store.

pub mod commands;
pub mod exec;
pub mod marker;
mod suites;

use crate::model::BenchConfig;
use anyhow::Context;
use commands::{BaselineStore, Engine, QueryKind};
use exec::{CommandRunner, ExitReport, Invocation, Stdio};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(u8);

impl TestId {
    pub const MAX: u8 = 10;

    pub fn new(n: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&n).then_some(TestId(n))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = TestId> {
        (1..=Self::MAX).map(TestId)
    }

    pub fn describe(&self) -> &'static str {
        match self.0 {
            1 => "Execute all possible scans on a given dataset",
            2 => "Execute simple SPARQL queries",
            3 => "Execute more complex SPARQL queries (BSBM benchmark)",
            4 => "Execute other graph analytics algorithms",
            5 => "Execute the same queries over larger databases",
            6 => "Execute graph analytics over the largest publicly available graph",
            7 => "Additions/removals with simple SPARQL queries on the result, lubm1b",
            8 => "Additions/removals with simple SPARQL queries on the result, lubm125m",
            9 => "Additions/removals with simple SPARQL queries on the result, wikidata",
            _ => "Like test 2, on databases loaded with --skipTables",
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSelection {
    All,
    One(TestId),
}

impl TestSelection {
    pub fn ids(&self) -> Vec<TestId> {
        match self {
            TestSelection::All => TestId::all().collect(),
            TestSelection::One(id) => vec![*id],
        }
    }
}

impl FromStr for TestSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(TestSelection::All);
        }
        s.parse::<u8>()
            .ok()
            .and_then(TestId::new)
            .map(TestSelection::One)
            .ok_or_else(|| format!("unknown test '{}' (expected 1..=10 or 'all')", s))
    }
}

pub struct Orchestrator {
    cfg: BenchConfig,
    runner: Arc<dyn CommandRunner>,
    engine: Engine,
    baseline: BaselineStore,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(cfg: BenchConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let engine = Engine::new(cfg.trident.clone());
        let baseline = BaselineStore::from_config(&cfg);
        Self {
            cfg,
            runner,
            engine,
            baseline,
            dry_run: false,
        }
    }

    /// In dry-run mode nothing is deleted and no marker is written.
    pub fn with_dry_run(mut self, on: bool) -> Self {
        self.dry_run = on;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.cfg
    }

    pub async fn run(&self, selection: TestSelection) -> anyhow::Result<()> {
        if self.cfg.flush_cache_command().is_none() {
            tracing::warn!("no flush_cache command configured, cold runs will hit the page cache");
        }
        for id in selection.ids() {
            tracing::info!("*** Begin Test {} ***", id);
            self.run_test(id)
                .await
                .with_context(|| format!("test {} failed", id))?;
            tracing::info!("*** End Test {} ***", id);
        }
        Ok(())
    }

    pub async fn run_test(&self, id: TestId) -> anyhow::Result<()> {
        let input = self.cfg.input.clone();
        let queries = self.cfg.queries.clone();
        let output = self.cfg.output.clone();
        match id.get() {
            1 => self.test1(&input, &output).await,
            2 => self.test2(&input, &queries, &output).await,
            3 => self.test3(&input, &queries, &output).await,
            4 => self.test4(&input, &output).await,
            5 => self.test5(&input, &queries, &output).await,
            6 => self.test6(&input, &output).await,
            7 => self.test7(&input, &queries, &output).await,
            8 => self.test8(&input, &queries, &output).await,
            9 => self.test9(&input, &queries, &output).await,
            _ => self.test10(&input, &queries, &output).await,
        }
    }

    async fn exec(&self, inv: Invocation) -> anyhow::Result<ExitReport> {
        let report = self.runner.run(&inv).await?;
        match report {
            ExitReport::Code(0) | ExitReport::DryRun => {}
            ExitReport::Code(c) => {
                tracing::warn!(command = %inv.command_line(), "exited with status {}", c)
            }
            ExitReport::Signal => {
                tracing::warn!(command = %inv.command_line(), "terminated by signal")
            }
            ExitReport::TimedOut => {
                tracing::warn!(command = %inv.command_line(), "timed out")
            }
        }
        Ok(report)
    }

    async fn flush_cache(&self) -> anyhow::Result<()> {
        if let Some(inv) = self
            .cfg
            .flush_cache_command()
            .and_then(commands::flush_cache)
        {
            self.exec(inv).await?;
        }
        Ok(())
    }

    /// Creates `dir` and its parents; a no-op in dry-run mode.
    fn make_dir(&self, dir: &Path) -> anyhow::Result<()> {
        if self.dry_run {
            return Ok(());
        }
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
    }

    /// Deletes `path` if it exists. Dry runs only report what would go.
    fn remove_existing(&self, path: &Path) -> anyhow::Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if self.dry_run {
            tracing::info!("[dry-run] would remove {}", path.display());
            return Ok(());
        }
        tracing::info!(" Removing {}", path.display());
        marker::remove_path(path)
    }

    fn needs_build(&self, dir: &Path) -> anyhow::Result<bool> {
        if self.dry_run {
            let state = marker::build_state(dir);
            if state == marker::BuildState::Partial {
                tracing::info!("[dry-run] would rebuild partial {}", dir.display());
            }
            return Ok(state != marker::BuildState::Complete);
        }
        marker::needs_build(dir, self.cfg.adopt_unmarked_dirs())
    }

    fn finish_build(&self, dir: &Path, all_ok: bool) -> anyhow::Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if all_ok {
            marker::mark_complete(dir)
        } else {
            tracing::warn!(
                " Build of {} did not complete cleanly, leaving it unmarked",
                dir.display()
            );
            Ok(())
        }
    }

    /// Runs `steps` to produce the database directory `db` unless a
    /// completed copy already exists. Returns whether a build happened.
    async fn build_db(&self, db: &Path, steps: Vec<Invocation>) -> anyhow::Result<bool> {
        if !self.needs_build(db)? {
            return Ok(false);
        }
        if let Some(parent) = db.parent() {
            self.make_dir(parent)?;
        }
        tracing::info!(" Loading db into {}...", db.display());
        let mut all_ok = true;
        for step in steps {
            all_ok &= self.exec(step).await?.success();
        }
        self.finish_build(db, all_ok)?;
        Ok(true)
    }

    /// Runs every query in `queries` against `db`, twice: once for the
    /// results and once, repeated, for the timing statistics.
    pub async fn query(
        &self,
        db: &Path,
        queries: &Path,
        out: &Path,
        kind: QueryKind,
    ) -> anyhow::Result<Option<ExitReport>> {
        tracing::info!(" Launch queries on {}", db.display());
        self.remove_existing(out)?;
        self.make_dir(out)?;

        let opts = self.cfg.extraopts.as_str();
        let mut last = None;
        for name in list_visible(queries)? {
            let query_file = queries.join(&name);
            let results = out.join(format!("results_{}", name));
            let log = out.join(format!("logs_{}", name));

            self.flush_cache().await?;
            tracing::info!(" Querying {} for getting results...", name);
            let inv = self
                .engine
                .query_results(kind, db, &query_file, opts)
                .stdout(Stdio::Create(results))
                .stderr(Stdio::Append(log.clone()));
            if !self.dry_run {
                write_cmd_header(&log, &inv, true)?;
            }
            self.exec(inv).await?;

            self.flush_cache().await?;
            tracing::info!(" Querying {} for getting stats...", name);
            let inv = self
                .engine
                .query_stats(kind, db, &query_file, self.cfg.stats_repeats(), opts)
                .stdout(Stdio::Null)
                .stderr(Stdio::Append(log.clone()));
            if !self.dry_run {
                write_cmd_header(&log, &inv, false)?;
            }
            last = Some(self.exec(inv).await?);
        }
        Ok(last)
    }

    /// Runs both query flavours of the engine, native first.
    async fn query_both(
        &self,
        db: &Path,
        queries: &Path,
        results_dir: &Path,
        name: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(" Launch the {} queries (native) ...", name);
        self.query(
            db,
            queries,
            &results_dir.join(format!("{}-native", name)),
            QueryKind::Native,
        )
        .await?;
        tracing::info!(" Launch the {} queries ...", name);
        self.query(db, queries, &results_dir.join(name), QueryKind::Sparql)
            .await?;
        Ok(())
    }

    /// Creates a fresh, timestamped results directory under `test_dir`.
    fn new_results_dir(&self, test_dir: &Path) -> anyhow::Result<PathBuf> {
        let dir = test_dir.join(results_dir_name(chrono::Local::now()));
        self.make_dir(&dir)?;
        Ok(dir)
    }
}

pub fn results_dir_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    now.format("results-%d-%m-%y-%H:%M:%S").to_string()
}

/// Non-hidden entries of `dir`, sorted by name.
pub fn list_visible(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
    {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn write_cmd_header(log: &Path, inv: &Invocation, truncate: bool) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(!truncate)
        .truncate(truncate)
        .open(log)
        .with_context(|| format!("failed to open {}", log.display()))?;
    writeln!(file, "CMD: {}", inv.command_line())?;
    Ok(())
}
