use crate::assets::{AssetNode, AssetTree};
use crate::bundle::TextBundle;
use crate::error::{IoResultExt, Result, TextBundleError};
use crate::manifest::MANIFEST_FILE_NAME;
use crate::options::WriteOptions;
use crate::package::scanner::is_text_file_name;
use std::fs::{self, FileType};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Prefix for staging files and directories created next to their targets
const STAGING_PREFIX: &str = ".textbundle-";

/// Counts from a completed write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files whose bytes were written out
    pub files_written: usize,

    /// Assets hard-linked to the previous revision
    pub files_linked: usize,

    /// Assets left untouched because the destination is the previous revision
    pub files_unchanged: usize,

    /// Stale destination entries removed
    pub entries_pruned: usize,
}

/// Package writer for TextBundle directories
#[derive(Debug, Clone, Default)]
pub struct PackageWriter {
    options: WriteOptions,
}

impl PackageWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Write a bundle to `destination`
    ///
    /// `previous` is an earlier revision of the same package; assets whose
    /// bytes match it are linked instead of rewritten.
    pub fn write(
        &self,
        bundle: &TextBundle,
        destination: &Path,
        previous: Option<&Path>,
    ) -> Result<WriteSummary> {
        let text_file_name = bundle.text_filename();
        check_reserved_names(bundle.assets(), &text_file_name, destination)?;

        let mut summary = WriteSummary::default();
        if self.options.atomic {
            self.write_staged(bundle, destination, previous, &mut summary)?;
        } else {
            self.write_into(bundle, destination, previous, &mut summary)?;
        }
        Ok(summary)
    }

    /// Write directly into the destination, entry by entry
    fn write_into(
        &self,
        bundle: &TextBundle,
        destination: &Path,
        previous: Option<&Path>,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        fs::create_dir_all(destination).at(destination)?;

        let in_place = previous.is_some_and(|prev| same_location(prev, destination));

        // Text payload
        let text_file_name = bundle.text_filename();
        write_file(&destination.join(&text_file_name), bundle.text().as_bytes())?;
        summary.files_written += 1;

        // Manifest, omitted when a reader would infer it anyway
        let extension = text_file_name
            .strip_prefix("text.")
            .unwrap_or_default();
        let write_manifest = !bundle.manifest().is_implied_by(extension);
        if write_manifest {
            let json = bundle.manifest().to_json()?;
            write_file(&destination.join(MANIFEST_FILE_NAME), &json)?;
            summary.files_written += 1;
        }

        // Drop whatever the new layout no longer contains
        let mut keep = vec![text_file_name.as_str()];
        if write_manifest {
            keep.push(MANIFEST_FILE_NAME);
        }
        summary.entries_pruned += prune(destination, bundle.assets(), &keep)?;

        // Assets
        self.write_tree(bundle.assets(), destination, previous, in_place, summary)
    }

    /// Build the package in a staging directory and rename it into place
    fn write_staged(
        &self,
        bundle: &TextBundle,
        destination: &Path,
        previous: Option<&Path>,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).at(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .at(parent)?;
        let staged = staging.path().join("package");
        let displaced = staging.path().join("displaced");

        self.write_into(bundle, &staged, previous, summary)?;

        let had_destination = fs::symlink_metadata(destination).is_ok();
        if had_destination {
            fs::rename(destination, &displaced).at(destination)?;
        }

        if let Err(e) = fs::rename(&staged, destination) {
            if had_destination {
                let _ = fs::rename(&displaced, destination);
            }
            return Err(TextBundleError::io(destination, e));
        }

        debug!(path = %destination.display(), "Swapped staged package into place");
        // Dropping `staging` removes the displaced revision
        Ok(())
    }

    fn write_tree(
        &self,
        tree: &AssetTree,
        dir: &Path,
        previous: Option<&Path>,
        in_place: bool,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        for (name, node) in tree.entries() {
            let target = dir.join(name);
            let previous_entry = previous.map(|prev| prev.join(name));

            match node {
                AssetNode::Directory(sub) => {
                    fs::create_dir_all(&target).at(&target)?;
                    self.write_tree(sub, &target, previous_entry.as_deref(), in_place, summary)?;
                }
                AssetNode::File(data) => {
                    self.write_asset(&target, data, previous_entry.as_deref(), in_place, summary)?;
                }
            }
        }
        Ok(())
    }

    fn write_asset(
        &self,
        target: &Path,
        data: &[u8],
        previous: Option<&Path>,
        in_place: bool,
        summary: &mut WriteSummary,
    ) -> Result<()> {
        if let Some(previous) = previous.filter(|_| self.options.reuse_unchanged_assets) {
            if same_content(previous, data) {
                if in_place {
                    summary.files_unchanged += 1;
                    return Ok(());
                }

                if same_file(previous, target) {
                    debug!(path = %target.display(), "Asset already linked");
                    summary.files_linked += 1;
                    return Ok(());
                }

                match link_file(previous, target) {
                    Ok(()) => {
                        debug!(path = %target.display(), "Linked unchanged asset");
                        summary.files_linked += 1;
                        return Ok(());
                    }
                    Err(e) => {
                        debug!(
                            path = %target.display(),
                            error = %e,
                            "Hard link failed, copying instead"
                        );
                    }
                }
            }
        }

        write_file(target, data)?;
        summary.files_written += 1;
        Ok(())
    }
}

/// Root asset names that would shadow the payload or the manifest
pub(crate) fn check_reserved_names(assets: &AssetTree, text_file_name: &str, destination: &Path) -> Result<()> {
    for (name, node) in assets.entries() {
        let reserved = name == text_file_name
            || name == MANIFEST_FILE_NAME
            || (!node.is_dir() && is_text_file_name(name));

        if reserved {
            return Err(TextBundleError::io(
                destination.join(name),
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "asset name collides with a reserved package entry",
                ),
            ));
        }
    }
    Ok(())
}

/// Remove entries under `dir` that `tree` does not contain
///
/// Returns the number of entries removed.
fn prune(dir: &Path, tree: &AssetTree, keep: &[&str]) -> Result<usize> {
    let mut pruned = 0;

    for entry in fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_str();

        if name.is_some_and(|name| keep.contains(&name)) {
            continue;
        }

        let file_type = entry.file_type().at(&path)?;
        match name.and_then(|name| tree.child(name)) {
            Some(AssetNode::Directory(sub)) if file_type.is_dir() => {
                pruned += prune(&path, sub, &[])?;
            }
            Some(AssetNode::File(_)) if file_type.is_file() => {}
            _ => {
                debug!(path = %path.display(), "Pruning stale entry");
                remove_entry(&path, file_type)?;
                pruned += 1;
            }
        }
    }

    Ok(pruned)
}

fn remove_entry(path: &Path, file_type: FileType) -> Result<()> {
    if file_type.is_dir() {
        fs::remove_dir_all(path).at(path)
    } else {
        fs::remove_file(path).at(path)
    }
}

/// Write a file by persisting a sibling temp file over it
fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = staging_file(dir).at(dir)?;
    file.write_all(data).at(path)?;
    file.flush().at(path)?;
    file.persist(path)
        .map_err(|e| TextBundleError::io(path, e.error))?;
    Ok(())
}

fn staging_file(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}

/// Replace `target` with a hard link to `source`
fn link_file(source: &Path, target: &Path) -> io::Result<()> {
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("asset");
    let staging = target.with_file_name(format!("{}{}.link", STAGING_PREFIX, file_name));

    if fs::symlink_metadata(&staging).is_ok() {
        fs::remove_file(&staging)?;
    }
    fs::hard_link(source, &staging)?;

    let renamed = fs::rename(&staging, target);
    // rename is a no-op when both names already point at the same file
    if fs::symlink_metadata(&staging).is_ok() {
        let _ = fs::remove_file(&staging);
    }
    renamed
}

/// Whether two paths name the same file on disk
#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_a: &Path, _b: &Path) -> bool {
    false
}

/// Whether the regular file at `path` holds exactly `data`
///
/// Unreadable files count as different.
fn same_content(path: &Path, data: &[u8]) -> bool {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_file() && metadata.len() == data.len() as u64 => {
            fs::read(path).is_ok_and(|existing| existing == data)
        }
        _ => false,
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
