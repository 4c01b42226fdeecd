//! In-memory asset tree
//!
//! Everything in a package besides `text.*` and `info.json` lives here as a
//! recursive map of names to file contents or subdirectories. Nothing in the
//! tree refers back to the filesystem; it is only materialized by the writer.

use crate::error::{Result, TextBundleError};
use std::collections::btree_map::{self, BTreeMap};
use std::path::Path;

/// Conventional asset subdirectory
pub const ASSETS_DIR_NAME: &str = "assets";

/// A file or a subdirectory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetNode {
    File(Vec<u8>),
    Directory(AssetTree),
}

impl AssetNode {
    /// File contents, if this is a file
    pub fn as_file(&self) -> Option<&[u8]> {
        match self {
            AssetNode::File(data) => Some(data),
            AssetNode::Directory(_) => None,
        }
    }

    /// Subtree, if this is a directory
    pub fn as_dir(&self) -> Option<&AssetTree> {
        match self {
            AssetNode::Directory(tree) => Some(tree),
            AssetNode::File(_) => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, AssetNode::Directory(_))
    }
}

/// Directory of asset nodes keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetTree {
    entries: BTreeMap<String, AssetNode>,
}

impl AssetTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the tree has no direct children
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of files at any depth
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                AssetNode::File(_) => 1,
                AssetNode::Directory(tree) => tree.file_count(),
            })
            .sum()
    }

    /// Total file bytes at any depth
    pub fn total_bytes(&self) -> u64 {
        self.entries
            .values()
            .map(|node| match node {
                AssetNode::File(data) => data.len() as u64,
                AssetNode::Directory(tree) => tree.total_bytes(),
            })
            .sum()
    }

    /// Direct children in name order
    pub fn entries(&self) -> btree_map::Iter<'_, String, AssetNode> {
        self.entries.iter()
    }

    /// Direct child by exact name
    pub fn child(&self, name: &str) -> Option<&AssetNode> {
        self.entries.get(name)
    }

    /// Look up a node by relative path (`a/b/c.png`)
    pub fn get(&self, path: &str) -> Option<&AssetNode> {
        let parts = split_path(path).ok()?;
        let (last, parents) = parts.split_last()?;

        let mut tree = self;
        for part in parents {
            tree = tree.entries.get(*part)?.as_dir()?;
        }
        tree.entries.get(*last)
    }

    /// File contents at a relative path
    pub fn get_file(&self, path: &str) -> Option<&[u8]> {
        self.get(path).and_then(AssetNode::as_file)
    }

    /// Subdirectory at a relative path
    pub fn get_dir(&self, path: &str) -> Option<&AssetTree> {
        self.get(path).and_then(AssetNode::as_dir)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Insert a file, creating intermediate directories
    ///
    /// Returns the node previously stored at `path`.
    pub fn insert_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> Result<Option<AssetNode>> {
        self.insert_node(path, AssetNode::File(data.into()))
    }

    /// Insert any node at a relative path, creating intermediate directories
    pub fn insert_node(&mut self, path: &str, node: AssetNode) -> Result<Option<AssetNode>> {
        let parts = split_path(path)?;
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| TextBundleError::InvalidAssetPath(path.to_string()))?;

        let tree = self.dir_chain_mut(parents, path)?;
        Ok(tree.entries.insert((*last).to_string(), node))
    }

    /// Ensure a directory exists at a relative path and return it
    pub fn create_dir(&mut self, path: &str) -> Result<&mut AssetTree> {
        let parts = split_path(path)?;
        self.dir_chain_mut(&parts, path)
    }

    /// Insert a node under path components read from disk or an archive
    ///
    /// Components are taken verbatim, so a `\` inside a name stays part of it.
    pub(crate) fn insert_components(&mut self, parts: &[&str], node: AssetNode) -> Result<Option<AssetNode>> {
        let full_path = check_components(parts)?;
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| TextBundleError::InvalidAssetPath(full_path.clone()))?;

        let tree = self.dir_chain_mut(parents, &full_path)?;
        Ok(tree.entries.insert((*last).to_string(), node))
    }

    /// Ensure a directory exists under verbatim path components
    pub(crate) fn create_dir_components(&mut self, parts: &[&str]) -> Result<&mut AssetTree> {
        let full_path = check_components(parts)?;
        self.dir_chain_mut(parts, &full_path)
    }

    /// Mutable subdirectory at a relative path
    pub fn get_dir_mut(&mut self, path: &str) -> Option<&mut AssetTree> {
        let parts = split_path(path).ok()?;
        let mut tree = self;
        for part in parts {
            tree = match tree.entries.get_mut(part)? {
                AssetNode::Directory(sub) => sub,
                AssetNode::File(_) => return None,
            };
        }
        Some(tree)
    }

    /// Remove and return the node at a relative path
    pub fn remove(&mut self, path: &str) -> Option<AssetNode> {
        let parts = split_path(path).ok()?;
        let (last, parents) = parts.split_last()?;

        let mut tree = self;
        for part in parents {
            tree = match tree.entries.get_mut(*part)? {
                AssetNode::Directory(sub) => sub,
                AssetNode::File(_) => return None,
            };
        }
        tree.entries.remove(*last)
    }

    /// Flattened `(relative path, contents)` for every file at any depth
    pub fn files(&self) -> Vec<(String, &[u8])> {
        let mut out = Vec::new();
        self.collect_files("", &mut out);
        out
    }

    fn collect_files<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a [u8])>) {
        for (name, node) in &self.entries {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };
            match node {
                AssetNode::File(data) => out.push((path, data)),
                AssetNode::Directory(tree) => tree.collect_files(&path, out),
            }
        }
    }

    /// Add a file directly under this directory without clobbering
    ///
    /// A taken name gets a numeric suffix (`image 2.png`, `image 3.png`, ...).
    /// With `skip_duplicates`, a candidate name already holding identical
    /// bytes is reused instead. Returns the name the file ended up under.
    pub fn add_unique(&mut self, name: &str, data: Vec<u8>, skip_duplicates: bool) -> Result<String> {
        let parts = split_path(name)?;
        if parts.len() != 1 {
            return Err(TextBundleError::InvalidAssetPath(name.to_string()));
        }

        let mut candidate = name.to_string();
        let mut counter = 1;
        while let Some(existing) = self.entries.get(&candidate) {
            if skip_duplicates && existing.as_file() == Some(data.as_slice()) {
                return Ok(candidate);
            }
            counter += 1;
            candidate = numbered_name(name, counter);
        }

        self.entries.insert(candidate.clone(), AssetNode::File(data));
        Ok(candidate)
    }

    fn dir_chain_mut(&mut self, parts: &[&str], full_path: &str) -> Result<&mut AssetTree> {
        let mut tree = self;
        for part in parts {
            let node = tree
                .entries
                .entry((*part).to_string())
                .or_insert_with(|| AssetNode::Directory(AssetTree::new()));
            tree = match node {
                AssetNode::Directory(sub) => sub,
                AssetNode::File(_) => {
                    return Err(TextBundleError::InvalidAssetPath(format!(
                        "{}: '{}' is a file",
                        full_path, part
                    )))
                }
            };
        }
        Ok(tree)
    }
}

/// Split a relative asset path into validated components
fn split_path(path: &str) -> Result<Vec<&str>> {
    let invalid = || TextBundleError::InvalidAssetPath(path.to_string());

    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return Err(invalid());
    }

    let parts: Vec<&str> = path.split(['/', '\\']).collect();
    for part in &parts {
        if part.is_empty() || *part == "." || *part == ".." {
            return Err(invalid());
        }
    }
    Ok(parts)
}

/// Validate single names and join them for error messages
fn check_components(parts: &[&str]) -> Result<String> {
    let full_path = parts.join("/");
    let valid = !parts.is_empty()
        && parts
            .iter()
            .all(|part| !part.is_empty() && *part != "." && *part != ".." && !part.contains('/'));

    if valid {
        Ok(full_path)
    } else {
        Err(TextBundleError::InvalidAssetPath(full_path))
    }
}

/// `name N.ext` for a collision counter N
fn numbered_name(name: &str, counter: usize) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{} {}.{}", stem, counter, ext),
        None => format!("{} {}", stem, counter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut tree = AssetTree::new();
        tree.insert_file("assets/img.png", vec![1, 2, 3]).unwrap();
        tree.insert_file("assets/css/site.css", b"body {}".to_vec()).unwrap();
        tree.insert_file("cover.jpg", vec![0xff]).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.file_count(), 3);
        assert_eq!(tree.total_bytes(), 11);
        assert_eq!(tree.get_file("assets/img.png"), Some(&[1u8, 2, 3][..]));
        assert!(tree.get("assets/css").unwrap().is_dir());
        assert!(tree.get_file("assets/css").is_none());
        assert!(tree.get("assets/missing.png").is_none());
    }

    #[test]
    fn test_files_are_flattened_in_order() {
        let mut tree = AssetTree::new();
        tree.insert_file("b/two.txt", b"2".to_vec()).unwrap();
        tree.insert_file("a.txt", b"1".to_vec()).unwrap();
        tree.insert_file("b/c/three.txt", b"3".to_vec()).unwrap();

        let paths: Vec<String> = tree.files().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["a.txt", "b/c/three.txt", "b/two.txt"]);
    }

    #[test]
    fn test_rejects_bad_paths() {
        let mut tree = AssetTree::new();
        for path in ["", "/etc/passwd", "\\server\\share", "../escape", "a/../b", "a//b", "./a"] {
            assert!(
                matches!(
                    tree.insert_file(path, b"x".to_vec()),
                    Err(TextBundleError::InvalidAssetPath(_))
                ),
                "accepted {:?}",
                path
            );
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn test_file_blocks_directory() {
        let mut tree = AssetTree::new();
        tree.insert_file("assets", b"flat".to_vec()).unwrap();
        assert!(tree.insert_file("assets/img.png", vec![1]).is_err());
        assert!(tree.create_dir("assets").is_err());
    }

    #[test]
    fn test_backslashes_are_separators() {
        let mut tree = AssetTree::new();
        tree.insert_file("assets\\img.png", vec![9]).unwrap();
        assert_eq!(tree.get_file("assets/img.png"), Some(&[9u8][..]));
    }

    #[test]
    fn test_components_are_verbatim() {
        let mut tree = AssetTree::new();
        tree.insert_components(&["assets", "a\\b.png"], AssetNode::File(vec![1]))
            .unwrap();
        tree.create_dir_components(&["notes\\"]).unwrap();

        let assets = tree.get_dir("assets").unwrap();
        assert_eq!(assets.child("a\\b.png"), Some(&AssetNode::File(vec![1])));
        assert!(assets.get_dir("a").is_none());
        assert!(tree.child("notes\\").unwrap().is_dir());

        let invalid: [&[&str]; 4] = [&[], &[""], &["a", ".."], &["a/b"]];
        for parts in invalid {
            assert!(tree
                .insert_components(parts, AssetNode::File(vec![0]))
                .is_err());
        }
    }

    #[test]
    fn test_remove() {
        let mut tree = AssetTree::new();
        tree.insert_file("assets/a.png", vec![1]).unwrap();
        tree.insert_file("assets/b.png", vec![2]).unwrap();

        assert_eq!(tree.remove("assets/a.png"), Some(AssetNode::File(vec![1])));
        assert_eq!(tree.remove("assets/a.png"), None);
        assert_eq!(tree.file_count(), 1);

        assert!(tree.remove("assets").unwrap().is_dir());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_create_dir_keeps_empty_directories() {
        let mut tree = AssetTree::new();
        tree.create_dir("assets/empty").unwrap();
        assert!(tree.get_dir("assets/empty").unwrap().is_empty());
        assert_eq!(tree.file_count(), 0);

        tree.get_dir_mut("assets")
            .unwrap()
            .insert_file("x.bin", vec![0])
            .unwrap();
        assert!(tree.contains("assets/x.bin"));
    }

    #[test]
    fn test_add_unique_renames_collisions() {
        let mut dir = AssetTree::new();
        assert_eq!(dir.add_unique("image.png", vec![1], false).unwrap(), "image.png");
        assert_eq!(dir.add_unique("image.png", vec![2], false).unwrap(), "image 2.png");
        assert_eq!(dir.add_unique("image.png", vec![3], false).unwrap(), "image 3.png");
        assert_eq!(dir.add_unique("README", vec![4], false).unwrap(), "README");
        assert_eq!(dir.add_unique("README", vec![5], false).unwrap(), "README 2");
        assert_eq!(dir.len(), 5);
    }

    #[test]
    fn test_add_unique_skips_duplicates() {
        let mut dir = AssetTree::new();
        dir.add_unique("image.png", vec![1], true).unwrap();
        dir.add_unique("image.png", vec![2], true).unwrap();

        assert_eq!(dir.add_unique("image.png", vec![1], true).unwrap(), "image.png");
        assert_eq!(dir.add_unique("image.png", vec![2], true).unwrap(), "image 2.png");
        assert_eq!(dir.len(), 2);

        // Same bytes without the flag still get a fresh name
        assert_eq!(dir.add_unique("image.png", vec![1], false).unwrap(), "image 3.png");
    }

    #[test]
    fn test_add_unique_rejects_nested_names() {
        let mut dir = AssetTree::new();
        assert!(dir.add_unique("sub/image.png", vec![1], false).is_err());
    }
}
