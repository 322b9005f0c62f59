use super::commands::{self, QueryKind};
use super::exec::Stdio;
use super::{list_visible, Orchestrator};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// yago2s storage layouts built for the scan test: (name, load flags, tested).
const TEST1_LAYOUTS: &[(&str, &str, bool)] = &[
    ("default", "--storeplainlist 1", true),
    ("row", "--enableFixedStrat 1 --fixedStrat 148", true),
    // built for completeness; its scan test takes too long
    ("cluster", "--enableFixedStrat 1 --fixedStrat 181", false),
    ("column", "--enableFixedStrat 1 --fixedStrat 96", true),
    ("aggr", "--aggrIndices 1", true),
    ("skipped", "--skipTables 1", true),
];

struct Dataset {
    name: &'static str,
    /// Sub-directory of the queries root.
    queries: &'static str,
    /// Raw input for the baseline store, relative to the input root.
    raw: &'static str,
}

const SPARQL_DATASETS: &[Dataset] = &[
    Dataset { name: "lubm1b", queries: "lubm", raw: "lubm1b_raw" },
    Dataset { name: "btc2012", queries: "btc2012", raw: "btc2012_raw" },
    Dataset { name: "uniprot", queries: "uniprot", raw: "uniprot/uniprot-sample.nt" },
    Dataset { name: "dbpedia", queries: "dbpedia-examples", raw: "dbpedia_raw_data" },
    Dataset { name: "wikidata", queries: "wikidata", raw: "wikidata_raw" },
];

pub const SNAP_GRAPHS: &[&str] = &["astro", "web", "twitter"];

/// Analytics run on every SNAP graph, in order.
pub const ANALYTICS_OPS: &[&str] = &[
    "pagerank", "hits", "clustcoef", "triangles", "diameter", "maxwcc", "maxscc", "rw", "bfs",
    "mod",
];

fn analytics_param(op: &str, nodes: &Path, pairs: &Path) -> Option<String> {
    match op {
        "diameter" => Some("testnodes=1000".to_string()),
        "rw" => Some(format!("len=3;nodes={}", nodes.display())),
        "bfs" => Some(format!("pairs={}", pairs.display())),
        "mod" => Some(format!("nodes={}", nodes.display())),
        _ => None,
    }
}

/// Percentages of the lubm10B input files loaded by the scale test.
pub const SCALE_PERCENTAGES: &[usize] = &[1, 2, 5, 10, 20, 50, 100];

struct UpdateSuite {
    test: &'static str,
    db_name: &'static str,
    initial: &'static str,
    queries: &'static str,
    first_results: &'static str,
    /// (input relative to the input root, tag used in the engine's log name)
    additions: Vec<(String, String)>,
    removals: Vec<(String, String)>,
    add_note: &'static str,
    rm_note: &'static str,
}

fn update_suite_7() -> UpdateSuite {
    // part7950 is lubm1b minus its last 50 universities; partX-Y holds
    // universities X..Y
    let part = |p: &str| (format!("lubm1b_parts/part{}", p), p.to_string());
    UpdateSuite {
        test: "test7",
        db_name: "lubm1b_updates",
        initial: "lubm1b_parts/part7950",
        queries: "lubm-test",
        first_results: "lubm7950",
        additions: ["7950-7960", "7960-7970", "7970-7980", "7980-7990", "7990-8000"]
            .into_iter()
            .map(part)
            .collect(),
        removals: ["100-110", "200-210", "300-310", "400-410", "500-510"]
            .into_iter()
            .map(part)
            .collect(),
        add_note: "Adding 10 universities",
        rm_note: "Removing 10 universities",
    }
}

fn update_suite_8() -> UpdateSuite {
    let part = |p: &str| (format!("lubm1000_parts/lubm-u{}", p), p.to_string());
    UpdateSuite {
        test: "test8",
        db_name: "lubm1000_updates",
        initial: "lubm1000_parts/lubm995",
        queries: "lubm-test",
        first_results: "lubm995",
        additions: ["995", "996", "997", "998", "999"]
            .into_iter()
            .map(part)
            .collect(),
        removals: ["100", "200", "300", "400", "500"]
            .into_iter()
            .map(part)
            .collect(),
        add_note: "Adding 1 university",
        rm_note: "Removing 1 university",
    }
}

fn update_suite_9() -> UpdateSuite {
    // wikidata chunks are tagged by position, not by name
    let heads = |hs: [&str; 5]| {
        hs.iter()
            .enumerate()
            .map(|(i, h)| (format!("wikidata.parts/head{}", h), (i + 1).to_string()))
            .collect::<Vec<_>>()
    };
    UpdateSuite {
        test: "test9",
        db_name: "wikidata_updates",
        initial: "wikidata.parts/db",
        queries: "wikidata",
        first_results: "wikidata-",
        additions: heads(["54", "42", "14", "34", "61"]),
        removals: heads(["55", "10", "49", "47", "60"]),
        add_note: "Adding 1MB facts",
        rm_note: "Removing 1MB facts",
    }
}

#[cfg(unix)]
fn link_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(not(unix))]
fn link_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}

impl Orchestrator {
    pub(super) async fn test1(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let test_dir = output.join("test1");
        let db_dir = test_dir.join("db");
        let opts = self.cfg.extraopts.clone();

        if self.needs_build(&db_dir)? {
            self.make_dir(&db_dir)?;
            let yago = input.join("yago2s");
            let mut all_ok = true;

            // the baseline store is built from the engine's dictionary and triples
            let mappings = db_dir.join("yago_mappings");
            tracing::info!(" Loading db into {}...", mappings.display());
            all_ok &= self
                .exec(self.engine.load(&yago, &mappings, &format!("{} --onlyCompress 1", opts)))
                .await?
                .success();

            let rdf3x = db_dir.join("yago_rdf3x");
            tracing::info!(" Loading db into {}...", rdf3x.display());
            let inv = self.baseline.load_from_mappings(
                &rdf3x,
                &mappings.join("triples.gz"),
                &mappings.join("dict.gz"),
            )?;
            all_ok &= self.exec(inv).await?.success();

            for (name, flags, _) in TEST1_LAYOUTS {
                let db = db_dir.join(format!("yago_{}", name));
                tracing::info!(" Loading db into {}...", db.display());
                all_ok &= self
                    .exec(self.engine.load(&yago, &db, &format!("{} {}", opts, flags)))
                    .await?
                    .success();
            }

            tracing::info!(" Generating the queries...");
            let queries = db_dir.join("queries");
            all_ok &= self
                .exec(self.engine.testcq(&db_dir.join("yago_default"), &queries))
                .await?
                .success();
            tracing::info!(" Shuffling the queries...");
            all_ok &= self
                .exec(commands::shuffle(&queries, &db_dir.join("queries_shuffled")))
                .await?
                .success();

            self.finish_build(&db_dir, all_ok)?;
        }

        let results = self.new_results_dir(&test_dir)?;
        let shuffled = db_dir.join("queries_shuffled");

        tracing::info!(" Launch the test with RDF3x...");
        let inv = self
            .baseline
            .test(&db_dir.join("yago_rdf3x"), &shuffled)?
            .stdout(Stdio::Create(results.join("test_rdf3x")))
            .stderr(Stdio::Null);
        self.exec(inv).await?;

        for (name, _, tested) in TEST1_LAYOUTS {
            if !tested {
                continue;
            }
            tracing::info!(" Launch the test {}...", name);
            let inv = self
                .engine
                .testti(&db_dir.join(format!("yago_{}", name)), &shuffled)
                .stdout(Stdio::Create(results.join(format!("test_{}", name))))
                .stderr(Stdio::Null);
            self.exec(inv).await?;
        }
        Ok(())
    }

    pub(super) async fn test2(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        let test_dir = output.join("test2");
        let db_dir = test_dir.join("db");
        let opts = self.cfg.extraopts.clone();

        for ds in SPARQL_DATASETS {
            let db = db_dir.join(ds.name);
            let load = self.engine.load(&input.join(ds.name), &db, &opts);
            self.build_db(&db, vec![load]).await?;
        }
        for ds in SPARQL_DATASETS {
            let db = db_dir.join(format!("{}_rdf3x", ds.name));
            let import = self.baseline.import(&input.join(ds.raw), &db)?;
            self.build_db(&db, vec![import]).await?;
        }

        let results = self.new_results_dir(&test_dir)?;
        for ds in SPARQL_DATASETS {
            self.query_both(&db_dir.join(ds.name), &queries.join(ds.queries), &results, ds.name)
                .await?;
        }
        for ds in SPARQL_DATASETS {
            tracing::info!(" Launch the {} queries with RDF3X ...", ds.name);
            let inv = self.baseline.query_batch(
                &db_dir.join(format!("{}_rdf3x", ds.name)).join("outputdb"),
                &queries.join(ds.queries),
                &results.join(format!("{}-rdf3x", ds.name)),
            )?;
            self.exec(inv).await?;
        }
        Ok(())
    }

    pub(super) async fn test3(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        let test_dir = output.join("test3");
        let db = test_dir.join("db").join("bsbm");
        let load = self.engine.load(&input.join("bsbm"), &db, &self.cfg.extraopts);
        self.build_db(&db, vec![load]).await?;

        let results = self.new_results_dir(&test_dir)?;
        self.query_both(&db, &queries.join("bsbm"), &results, "bsbm")
            .await
    }

    pub(super) async fn test4(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let test_dir = output.join("test4");
        let db_dir = test_dir.join("db");
        let snap_root = input.join("snap-orig");

        for graph in SNAP_GRAPHS {
            let db = db_dir.join(graph);
            let source = snap_root.join(graph).join(format!("{}.gz", graph));
            let load = self
                .engine
                .load(&source, &db, "--inputformat snap --flatTree 1");
            self.build_db(&db, vec![load]).await?;
        }

        tracing::info!(" Launching test snap program...");
        let testsnap = self.cfg.testsnap.clone().ok_or_else(|| {
            crate::errors::ConfigError("'testsnap' is required by test 4".into())
        })?;
        let snap_results = self.fresh_dir(&test_dir.join("snap"))?;
        for graph in SNAP_GRAPHS {
            let dataset_dir = snap_root.join(graph);
            let inv = commands::snap_test(
                &testsnap,
                &dataset_dir.join(format!("{}.gz", graph)),
                &dataset_dir,
            )
            .stdout(Stdio::Create(snap_results.join(format!("results_{}", graph))))
            .stderr(Stdio::Create(
                snap_results.join(format!("results_{}-err", graph)),
            ));
            self.exec(inv).await?;
        }

        tracing::info!(" Launching test trident program...");
        let engine_results = self.fresh_dir(&test_dir.join("trident"))?;
        for graph in SNAP_GRAPHS {
            let nodes = snap_root.join(graph).join("terms_trident");
            let pairs = snap_root.join(graph).join("terms_trident_p");
            for op in ANALYTICS_OPS {
                let param = analytics_param(op, &nodes, &pairs);
                let inv = self
                    .engine
                    .analytics(&db_dir.join(graph), op, param.as_deref())
                    .stderr(Stdio::Create(engine_results.join(format!("{}_{}", graph, op))))
                    .stdout(Stdio::Create(
                        engine_results.join(format!("{}_{}_stdout", graph, op)),
                    ));
                self.exec(inv).await?;
            }
        }
        Ok(())
    }

    pub(super) async fn test5(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        let test_dir = output.join("test5");
        let db_root = test_dir.join("db").join("scale");
        self.make_dir(&db_root)?;

        let source = input.join("lubm10B");
        let files = list_visible(&source)?;
        if files.is_empty() {
            anyhow::bail!("No files to load in {}! Test aborted", source.display());
        }

        for pct in SCALE_PERCENTAGES {
            let db = db_root.join(format!("lubm_perc_{}", pct));
            if !self.needs_build(&db)? {
                continue;
            }
            // the engine loads whole directories, so stage a subset of links
            let staging = test_dir.join(format!("scale_inputdataset_{}", pct));
            self.remove_existing(&staging)?;
            tracing::info!(" Creating {}", staging.display());
            self.make_dir(&staging)?;
            let count = scale_subset_len(files.len(), *pct);
            tracing::info!(
                " Linking {} files to the directory {}",
                count,
                staging.display()
            );
            if !self.dry_run {
                for f in &files[..count] {
                    link_file(&source.join(f), &staging.join(f))
                        .with_context(|| format!("failed to link {}", f))?;
                }
            }

            tracing::info!(" Loading db into {}...", db.display());
            let ok = self
                .exec(self.engine.load(&staging, &db, &self.cfg.test5_extraopts))
                .await?
                .success();
            self.finish_build(&db, ok)?;

            self.remove_existing(&staging)?;
        }

        let results = self.new_results_dir(&test_dir)?;
        let lubm = queries.join("lubm");
        for pct in SCALE_PERCENTAGES {
            let db = db_root.join(format!("lubm_perc_{}", pct));
            let out = pct.to_string();
            self.query(&db, &lubm, &results.join("lubm_native").join(&out), QueryKind::Native)
                .await?;
            self.query(&db, &lubm, &results.join("lubm").join(&out), QueryKind::Sparql)
                .await?;
        }
        Ok(())
    }

    pub(super) async fn test6(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let test_dir = output.join("test6");
        let db = test_dir.join("db").join("hypergraph");
        tracing::info!(" Load database...");
        let load = self.engine.load_compressed(
            &input.join("hypergraph").join("part-r-00"),
            &db,
            &self.cfg.test6_extraopts,
        );
        self.build_db(&db, vec![load]).await?;

        tracing::info!(" Launch PageRank...");
        self.make_dir(&test_dir)?;
        let inv = self
            .engine
            .analytics(&db, "pagerank", None)
            .stderr(Stdio::Create(test_dir.join("pagerank.log")));
        self.exec(inv).await?;
        Ok(())
    }

    pub(super) async fn test7(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        self.run_updates(&update_suite_7(), input, queries, output)
            .await
    }

    pub(super) async fn test8(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        self.run_updates(&update_suite_8(), input, queries, output)
            .await
    }

    pub(super) async fn test9(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        self.run_updates(&update_suite_9(), input, queries, output)
            .await
    }

    pub(super) async fn test10(
        &self,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        let test_dir = output.join("test10");
        let db_dir = test_dir.join("db");
        for ds in SPARQL_DATASETS {
            let db = db_dir.join(ds.name);
            let load = self
                .engine
                .load(&input.join(ds.name), &db, "--skipTables true");
            self.build_db(&db, vec![load]).await?;
        }

        let results = self.new_results_dir(&test_dir)?;
        for ds in SPARQL_DATASETS {
            self.query_both(&db_dir.join(ds.name), &queries.join(ds.queries), &results, ds.name)
                .await?;
        }
        Ok(())
    }

    async fn run_updates(
        &self,
        suite: &UpdateSuite,
        input: &Path,
        queries: &Path,
        output: &Path,
    ) -> anyhow::Result<()> {
        let test_dir = output.join(suite.test);
        let db = test_dir.join("db").join(suite.db_name);
        let opts = self.cfg.extraopts.as_str();

        let load = self.engine.load(&input.join(suite.initial), &db, opts);
        let built = self.build_db(&db, vec![load]).await?;
        if !built {
            // drop pending updates left over from an earlier run
            self.remove_existing(&db.join("_diff"))?;
        }

        let results = self.new_results_dir(&test_dir)?;
        let queries = queries.join(suite.queries);
        let run_queries = |label: String| {
            let out = results.join(label);
            let db = db.clone();
            let queries = queries.clone();
            async move { self.query(&db, &queries, &out, QueryKind::Sparql).await }
        };

        tracing::info!(" Launch the queries  ...");
        run_queries(suite.first_results.to_string()).await?;

        for (i, (part, tag)) in suite.additions.iter().enumerate() {
            tracing::info!("{}", suite.add_note);
            self.exec(self.engine.add(&input.join(part), &db, opts, tag))
                .await?;
            run_queries(format!("parts-added-{}", i + 1)).await?;
        }
        tracing::info!("Merging updates");
        self.exec(self.engine.merge(&db, opts, "add")).await?;
        run_queries("parts-merged-after-add".to_string()).await?;

        for (i, (part, tag)) in suite.removals.iter().enumerate() {
            tracing::info!("{}", suite.rm_note);
            self.exec(self.engine.rm(&input.join(part), &db, opts, tag))
                .await?;
            run_queries(format!("parts-removed-{}", i + 1)).await?;
        }
        tracing::info!("Merging updates");
        self.exec(self.engine.merge(&db, opts, "db")).await?;
        run_queries("parts-merged-after-rm".to_string()).await?;
        Ok(())
    }

    /// Empties `dir` for a new set of results.
    fn fresh_dir(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        self.remove_existing(dir)?;
        self.make_dir(dir)?;
        Ok(dir.to_path_buf())
    }
}

/// Number of files making up `pct` percent of `total`, rounded down.
pub fn scale_subset_len(total: usize, pct: usize) -> usize {
    total * pct / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_subsets_round_down() {
        assert_eq!(scale_subset_len(250, 1), 2);
        assert_eq!(scale_subset_len(250, 50), 125);
        assert_eq!(scale_subset_len(250, 100), 250);
        assert_eq!(scale_subset_len(40, 2), 0);
    }

    #[test]
    fn analytics_parameters_reference_term_files() {
        let nodes = Path::new("/in/astro/terms_trident");
        let pairs = Path::new("/in/astro/terms_trident_p");
        assert_eq!(analytics_param("pagerank", nodes, pairs), None);
        assert_eq!(
            analytics_param("diameter", nodes, pairs).as_deref(),
            Some("testnodes=1000")
        );
        assert_eq!(
            analytics_param("rw", nodes, pairs).as_deref(),
            Some("len=3;nodes=/in/astro/terms_trident")
        );
        assert_eq!(
            analytics_param("bfs", nodes, pairs).as_deref(),
            Some("pairs=/in/astro/terms_trident_p")
        );
    }

    #[test]
    fn wikidata_updates_are_tagged_by_position() {
        let suite = update_suite_9();
        assert_eq!(suite.additions[0], ("wikidata.parts/head54".into(), "1".into()));
        assert_eq!(suite.removals[4], ("wikidata.parts/head60".into(), "5".into()));
        let lubm = update_suite_7();
        assert_eq!(lubm.additions[2].1, "7970-7980");
    }
}
