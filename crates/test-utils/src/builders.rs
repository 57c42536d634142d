#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Builds an input tree (and a sibling output directory) in a temp dir.
///
/// ```ignore
/// let tree = TreeBuilder::new()
///     .file("a.jpg")
///     .file("temp/b.jpg")
///     .dir("empty")
///     .build();
/// ```
pub struct TreeBuilder {
    files: Vec<(String, Vec<u8>)>,
    dirs: Vec<String>,
}

/// A built tree. The temp dir is removed when this is dropped.
pub struct Tree {
    _tmp: TempDir,
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a file (parents are created) whose content is its own relative path.
    pub fn file(self, rel: &str) -> Self {
        let content = rel.as_bytes().to_vec();
        self.file_with(rel, content)
    }

    pub fn file_with(mut self, rel: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((rel.to_string(), content.into()));
        self
    }

    pub fn files<'a>(self, rels: impl IntoIterator<Item = &'a str>) -> Self {
        rels.into_iter().fold(self, |b, rel| b.file(rel))
    }

    pub fn dir(mut self, rel: &str) -> Self {
        self.dirs.push(rel.to_string());
        self
    }

    /// Materialise under `<tmp>/input`; `<tmp>/output` is left uncreated.
    pub fn build(self) -> Tree {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        let input = root.join("input");
        let output = root.join("output");
        fs::create_dir_all(&input).expect("create input dir");

        for rel in &self.dirs {
            fs::create_dir_all(input.join(rel)).expect("create dir");
        }
        for (rel, content) in &self.files {
            write_file(&input.join(rel), content);
        }

        Tree {
            _tmp: tmp,
            root,
            input,
            output,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn input_path(&self, rel: &str) -> PathBuf {
        self.input.join(rel)
    }

    pub fn output_path(&self, rel: &str) -> PathBuf {
        self.output.join(rel)
    }

    /// Create (or overwrite) a file under the input root after the build.
    pub fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.input.join(rel);
        write_file(&path, content);
        path
    }

    /// Relative paths of every file under the output root, sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.output.exists() {
            collect_files(&self.output, &self.output, &mut out);
        }
        out.sort();
        out
    }
}

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write file");
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).expect("under root");
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
