// Case discovery: enumerate `*.json` files in a directory and read them whole.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{Error, ErrorKind};

pub const CASE_SUFFIX: &str = ".json";

/// One case file, read once at run start and never mutated.
///
/// Content is opaque: the harness forwards the bytes verbatim and leaves
/// format validation to the solver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestCase {
    name: String,
    path: PathBuf,
    content: Vec<u8>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Cases ordered by file name, ascending.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CaseSet {
    cases: Vec<TestCase>,
}

impl CaseSet {
    pub fn from_cases(mut cases: Vec<TestCase>) -> Self {
        cases.sort_by(|a, b| a.name.cmp(&b.name));
        Self { cases }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(TestCase::name).collect()
    }

    /// Keeps cases whose name contains `pattern`; order is preserved.
    pub fn filter(self, pattern: &str) -> Self {
        let cases = self
            .cases
            .into_iter()
            .filter(|case| case.name.contains(pattern))
            .collect();
        Self { cases }
    }
}

impl<'a> IntoIterator for &'a CaseSet {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

pub fn is_case_file_name(name: &str) -> bool {
    name.ends_with(CASE_SUFFIX)
}

/// Reads every `*.json` file in `dir` into a sorted [`CaseSet`].
///
/// The directory is read exactly once. A missing or unreadable directory is
/// `DirectoryNotFound`; a matching file that cannot be read is `Io`.
pub fn load_cases(dir: &Path) -> Result<CaseSet, Error> {
    let entries = fs::read_dir(dir).map_err(|err| {
        Error::new(ErrorKind::DirectoryNotFound)
            .with_message("case directory not found or unreadable")
            .with_path(dir)
            .with_source(err)
    })?;

    let mut cases = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::new(ErrorKind::DirectoryNotFound)
                .with_message("failed to list case directory")
                .with_path(dir)
                .with_source(err)
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_case_file_name(&name) {
            continue;
        }
        let path = entry.path();
        // Follows symlinks so a linked case file still counts.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            _ => {
                debug!(case = %name, "skipping non-file entry with case suffix");
                continue;
            }
        }
        let content = fs::read(&path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read case file")
                .with_path(&path)
                .with_case(&name)
                .with_source(err)
        })?;
        cases.push(TestCase::new(name, path, content));
    }

    let set = CaseSet::from_cases(cases);
    debug!(dir = %dir.display(), count = set.len(), "enumerated cases");
    Ok(set)
}

/// Reads a single case file; its name is the file name component of `path`.
pub fn load_case(path: &Path) -> Result<TestCase, Error> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("case path has no file name")
                .with_path(path)
        })?;
    let content = fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read case file")
            .with_path(path)
            .with_case(&name)
            .with_source(err)
    })?;
    Ok(TestCase::new(name, path, content))
}
