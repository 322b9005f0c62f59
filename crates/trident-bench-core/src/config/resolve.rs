use crate::model::BenchConfig;
use std::path::{Path, PathBuf};

/// Anchors relative paths in the config at the directory of the config file.
///
/// Executables given as a bare name (`sort`, `trident`) are left alone so
/// they are still looked up in `PATH`.
pub fn resolve_paths(cfg: &mut BenchConfig, base_dir: &Path) {
    for dir in [&mut cfg.input, &mut cfg.queries, &mut cfg.output] {
        resolve_dir(dir, base_dir);
    }

    resolve_program(&mut cfg.trident, base_dir);
    for exe in [
        &mut cfg.rdf3xload,
        &mut cfg.rdf3xquery,
        &mut cfg.rdf3xtest,
        &mut cfg.testsnap,
        &mut cfg.settings.rdf3x_import_script,
        &mut cfg.settings.rdf3x_query_script,
    ]
    .into_iter()
    .flatten()
    {
        resolve_program(exe, base_dir);
    }
}

fn resolve_dir(path: &mut PathBuf, base_dir: &Path) {
    if path.is_relative() {
        *path = base_dir.join(&*path);
    }
}

fn resolve_program(path: &mut PathBuf, base_dir: &Path) {
    if path.is_relative() && path.components().count() > 1 {
        *path = base_dir.join(&*path);
    }
}
