//! Disk cache for programs compiled from file templates.
//!
//! Programs are stored as JSON beside the template in `<file>.<extension>`,
//! tagged with a digest of the body they were compiled from. Any failure to
//! read or write the cache is logged and otherwise ignored.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::page_template::CacheKey;
use crate::output::Program;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    digest: u64,
    programs: Vec<(CacheKey, Program)>,
}

/// `template.pt` → `template.pt.<extension>`.
pub fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn read(path: &Path) -> Option<CacheFile> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("cannot read program cache {}: {}", path.display(), err);
            return None;
        }
    };
    match serde_json::from_str(&source) {
        Ok(file) => Some(file),
        Err(err) => {
            log::warn!("ignoring corrupt program cache {}: {}", path.display(), err);
            None
        }
    }
}

/// The cached program for `key`, if the cache was written for the same
/// body.
pub fn load(template: &Path, extension: &str, digest: u64, key: &CacheKey) -> Option<Program> {
    let path = sibling(template, extension);
    let file = read(&path)?;
    if file.digest != digest {
        log::debug!("program cache {} is stale", path.display());
        return None;
    }
    let program = file
        .programs
        .into_iter()
        .find(|(cached, _)| cached == key)
        .map(|(_, program)| program);
    if program.is_some() {
        log::debug!("loaded {:?} from {}", key, path.display());
    }
    program
}

/// Add `program` to the cache, dropping entries compiled from another body.
pub fn store(template: &Path, extension: &str, digest: u64, key: &CacheKey, program: &Program) {
    let path = sibling(template, extension);
    let mut file = read(&path)
        .filter(|file| file.digest == digest)
        .unwrap_or_default();
    file.digest = digest;
    file.programs.retain(|(cached, _)| cached != key);
    file.programs.push((key.clone(), program.clone()));

    let written = serde_json::to_string(&file)
        .map_err(io::Error::from)
        .and_then(|json| fs::write(&path, json));
    if let Err(err) = written {
        log::warn!("cannot write program cache {}: {}", path.display(), err);
    }
}

/// Write the program listing to `<file>.src` for inspection.
pub fn dump_listing(template: &Path, program: &Program) {
    let path = sibling(template, "src");
    if let Err(err) = fs::write(&path, program.source()) {
        log::warn!("cannot write program listing {}: {}", path.display(), err);
    }
}
