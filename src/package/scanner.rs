use crate::assets::{AssetNode, AssetTree};
use crate::content_type;
use crate::error::{IoResultExt, Result, TextBundleError};
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::options::ReadOptions;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Base name the text payload must carry
pub const TEXT_FILE_STEM: &str = "text";

/// A package split into its three parts
#[derive(Debug, Clone)]
pub struct ScannedPackage {
    /// Decoded text payload
    pub text: String,

    /// Name the payload was stored under (`text.md`)
    pub text_file_name: String,

    /// Parsed `info.json`, or legacy defaults when absent
    pub manifest: Manifest,

    /// Whether `info.json` was present
    pub has_manifest_file: bool,

    /// Everything else
    pub assets: AssetTree,
}

/// Whether a root-level name denotes a text payload candidate
pub fn is_text_file_name(name: &str) -> bool {
    Path::new(name)
        .file_stem()
        .is_some_and(|stem| stem == TEXT_FILE_STEM)
}

/// Read a package directory into memory and classify it
pub fn scan_dir(root: &Path, options: &ReadOptions) -> Result<ScannedPackage> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TextBundleError::NotFound(root.to_path_buf()))
        }
        Err(e) => return Err(TextBundleError::io(root, e)),
    };

    if !metadata.is_dir() {
        return Err(TextBundleError::InvalidFormat(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    debug!(path = %root.display(), "Scanning package");
    let tree = read_tree(root, options)?;
    classify(tree)
}

/// Load every entry under `root` into an asset tree
///
/// Each file is read in full and its handle dropped before moving on.
fn read_tree(root: &Path, options: &ReadOptions) -> Result<AssetTree> {
    let skip_hidden = options.skip_hidden;
    let mut tree = AssetTree::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(skip_hidden && is_hidden(entry)))
    {
        let entry = entry?;
        let parts = relative_components(root, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            tree.create_dir_components(&parts)?;
        } else if file_type.is_file() {
            let data = fs::read(entry.path()).at(entry.path())?;
            tree.insert_components(&parts, AssetNode::File(data))?;
        } else {
            debug!(path = %entry.path().display(), "Skipping non-regular entry");
        }
    }

    Ok(tree)
}

/// Split a full package tree into text, manifest and assets
///
/// Exactly one root-level file named `text.*` must exist.
pub fn classify(mut tree: AssetTree) -> Result<ScannedPackage> {
    let candidates: Vec<String> = tree
        .entries()
        .filter(|(name, node)| !node.is_dir() && is_text_file_name(name))
        .map(|(name, _)| name.clone())
        .collect();

    let text_file_name = match candidates.as_slice() {
        [single] => single.clone(),
        [] => {
            return Err(TextBundleError::InvalidFormat(
                "Missing text.* payload".to_string(),
            ))
        }
        many => {
            return Err(TextBundleError::InvalidFormat(format!(
                "Ambiguous text payload: {}",
                many.join(", ")
            )))
        }
    };

    let text_bytes = match tree.remove(&text_file_name) {
        Some(AssetNode::File(data)) => data,
        _ => {
            return Err(TextBundleError::InvalidFormat(format!(
                "{} is not a regular file",
                text_file_name
            )))
        }
    };
    let text = String::from_utf8(text_bytes).map_err(|e| {
        TextBundleError::InvalidFormat(format!("{} is not valid UTF-8: {}", text_file_name, e))
    })?;

    let manifest_bytes = match tree.remove(MANIFEST_FILE_NAME) {
        Some(AssetNode::File(data)) => Some(data),
        Some(AssetNode::Directory(_)) => {
            return Err(TextBundleError::InvalidFormat(format!(
                "{} is a directory",
                MANIFEST_FILE_NAME
            )))
        }
        None => None,
    };

    let extension = Path::new(&text_file_name)
        .extension()
        .and_then(|ext| ext.to_str());
    let default_type = content_type::default_type_for(extension);

    let has_manifest_file = manifest_bytes.is_some();
    let manifest = match manifest_bytes {
        Some(data) => Manifest::from_json_with_default_type(&data, default_type)?,
        None => {
            debug!(content_type = default_type, "No info.json, using version 1 defaults");
            Manifest::legacy(default_type)
        }
    };

    debug!(
        text_file = %text_file_name,
        text_bytes = text.len(),
        assets = tree.file_count(),
        version = manifest.version,
        "Package classified"
    );

    Ok(ScannedPackage {
        text,
        text_file_name,
        manifest,
        has_manifest_file,
        assets: tree,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Package-relative path split into file names
fn relative_components<'a>(root: &Path, path: &'a Path) -> Result<Vec<&'a str>> {
    let relative = path.strip_prefix(root).map_err(|_| {
        TextBundleError::InvalidFormat(format!("{} escapes the package", path.display()))
    })?;

    relative
        .components()
        .map(|component| {
            component.as_os_str().to_str().ok_or_else(|| {
                TextBundleError::InvalidFormat(format!(
                    "Non UTF-8 file name: {}",
                    path.display()
                ))
            })
        })
        .collect()
}
