//! Quakefile discovery and loading

use crate::error::{ConfigError, ConfigResult};
use crate::quakefile::grammar::parse_quakefile;
use crate::quakefile::schema::validate_quakefile;
use crate::quakefile::types::{Namespace, QuakeFile};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the primary build file
pub const QUAKEFILE_NAME: &str = "Quakefile";

/// Directories, relative to the Quakefile, searched for `*.quake` fragments
pub const FRAGMENT_DIRS: &[&str] = &["qtasks", "lib/qtasks", "internal/qtasks"];

/// Find the Quakefile by searching current and parent directories
pub fn find_quakefile() -> ConfigResult<PathBuf> {
    let cwd = env::current_dir().map_err(|e| ConfigError::Read {
        path: PathBuf::from("."),
        error: e,
    })?;
    find_quakefile_from(cwd)
}

/// Find the Quakefile starting from a specific directory
pub fn find_quakefile_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        let candidate = current_dir.join(QUAKEFILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched_paths.push(candidate.display().to_string());

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Fragment files beside `quakefile`, sorted by path
pub fn find_fragments(quakefile: &Path) -> Vec<PathBuf> {
    let base_dir = quakefile.parent().unwrap_or_else(|| Path::new("."));
    let mut fragments = Vec::new();

    for dir in FRAGMENT_DIRS {
        let pattern = base_dir.join(dir).join("*.quake");
        let pattern = pattern.to_string_lossy();
        match glob::glob(&pattern) {
            Ok(paths) => fragments.extend(paths.filter_map(Result::ok).filter(|p| p.is_file())),
            Err(e) => warn!(pattern = %pattern, error = %e, "invalid fragment pattern"),
        }
    }

    fragments.sort();
    fragments
}

/// Read and parse one Quakefile, recording the source path on each task
pub fn parse_quakefile_file(path: &Path) -> ConfigResult<QuakeFile> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        error: e,
    })?;

    let mut file = parse_quakefile(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        error: e,
    })?;

    let source = path.display().to_string();
    for task in &mut file.tasks {
        task.source_file = Some(source.clone());
    }
    for ns in &mut file.namespaces {
        tag_namespace(ns, &source);
    }

    Ok(file)
}

fn tag_namespace(ns: &mut Namespace, source: &str) {
    for task in &mut ns.tasks {
        task.source_file = Some(source.to_string());
    }
    for nested in &mut ns.namespaces {
        tag_namespace(nested, source);
    }
}

/// Load the primary Quakefile merged with its fragments, then validate.
///
/// A parse failure in the primary file aborts; a failing fragment is skipped
/// with a warning.
pub fn load_quakefile(path: &Path) -> ConfigResult<QuakeFile> {
    let mut file = parse_quakefile_file(path)?;

    for fragment in find_fragments(path) {
        match parse_quakefile_file(&fragment) {
            Ok(parsed) => {
                debug!(fragment = %fragment.display(), tasks = parsed.tasks.len(), "merging fragment");
                file.merge(parsed);
            }
            Err(e) => warn!("skipping {}: {}", fragment.display(), e),
        }
    }

    validate_quakefile(&file)?;
    Ok(file)
}
