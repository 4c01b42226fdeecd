//! TextPack support
//!
//! A TextPack (`.textpack`) is a zip archive holding one TextBundle, usually
//! as a `<name>.textbundle/` folder, though some producers put the bundle
//! contents at the archive root. Both layouts are accepted on read; writing
//! always produces the folder layout. Archives are handled in memory.

use crate::assets::{AssetNode, AssetTree};
use crate::bundle::TextBundle;
use crate::error::{IoResultExt, Result, TextBundleError};
use crate::manifest::MANIFEST_FILE_NAME;
use crate::package::{check_reserved_names, classify, is_text_file_name};
use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path};
use tracing::{debug, info};
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

/// Folder extension used inside the archive
const BUNDLE_FOLDER_EXTENSION: &str = "textbundle";

/// Folder name used when the target path has no usable stem
const FALLBACK_FOLDER_STEM: &str = "Document";

/// Default cap on the total uncompressed size of a TextPack (1 GiB)
pub const MAX_UNPACKED_SIZE: u64 = 1024 * 1024 * 1024;

/// Open a `.textpack` file
pub fn open_textpack<P: AsRef<Path>>(path: P) -> Result<TextBundle> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TextBundleError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(TextBundleError::io(path, e)),
    };

    let bundle = read_textpack(file)?;
    info!(
        path = %path.display(),
        version = bundle.version(),
        assets = bundle.assets().file_count(),
        "TextPack opened"
    );
    Ok(bundle)
}

/// Read a TextPack from any seekable source
pub fn read_textpack<R: Read + Seek>(reader: R) -> Result<TextBundle> {
    read_textpack_with_limit(reader, MAX_UNPACKED_SIZE)
}

/// Read a TextPack, failing once its contents exceed `limit` bytes
///
/// The limit is enforced on the bytes actually decompressed, not on the
/// sizes the archive declares.
pub fn read_textpack_with_limit<R: Read + Seek>(reader: R, limit: u64) -> Result<TextBundle> {
    let mut archive = ZipArchive::new(reader)?;
    let mut tree = AssetTree::new();
    let mut unpacked: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let enclosed = entry.enclosed_name().ok_or_else(|| {
            TextBundleError::InvalidFormat(format!("Unsafe path in TextPack: {}", entry.name()))
        })?;
        let parts = archive_components(&enclosed)?;

        if parts.first().map_or(true, |first| *first == "__MACOSX") {
            continue;
        }

        if entry.is_dir() {
            tree.create_dir_components(&parts)?;
            continue;
        }

        let remaining = limit.saturating_sub(unpacked);
        if entry.size() > remaining {
            return Err(too_large(limit));
        }

        let mut data = Vec::new();
        entry
            .by_ref()
            .take(remaining.saturating_add(1))
            .read_to_end(&mut data)
            .at(&enclosed)?;
        unpacked += data.len() as u64;
        if unpacked > limit {
            return Err(too_large(limit));
        }

        tree.insert_components(&parts, AssetNode::File(data))?;
    }

    debug!(bytes = unpacked, entries = archive.len(), "TextPack unpacked");

    let root = locate_bundle_root(tree)?;
    Ok(TextBundle::from_scanned(classify(root)?))
}

/// Write a bundle as a `.textpack` file
///
/// The bundle is stored under `<file stem>.textbundle/` inside the archive.
pub fn save_textpack<P: AsRef<Path>>(bundle: &TextBundle, path: P) -> Result<()> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(FALLBACK_FOLDER_STEM);
    let folder = format!("{}.{}", stem, BUNDLE_FOLDER_EXTENSION);

    let file = File::create(path).at(path)?;
    let mut file = write_textpack(bundle, file, &folder)?;
    file.flush().at(path)?;

    info!(
        path = %path.display(),
        files = bundle.assets().file_count() + 1,
        "TextPack written"
    );
    Ok(())
}

/// Write a TextPack into any seekable sink, returning the sink
pub fn write_textpack<W: Write + Seek>(bundle: &TextBundle, writer: W, folder: &str) -> Result<W> {
    let text_file_name = bundle.text_filename();
    check_reserved_names(bundle.assets(), &text_file_name, Path::new(folder))?;

    // TextPacks are stored uncompressed; most assets are already compressed
    let options: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(writer);
    zip.add_directory(format!("{}/", folder), options)?;

    let text_path = format!("{}/{}", folder, text_file_name);
    zip.start_file(text_path.as_str(), options)?;
    zip.write_all(bundle.text().as_bytes())
        .at(Path::new(&text_path))?;

    let extension = text_file_name.strip_prefix("text.").unwrap_or_default();
    if !bundle.manifest().is_implied_by(extension) {
        let manifest_path = format!("{}/{}", folder, MANIFEST_FILE_NAME);
        zip.start_file(manifest_path.as_str(), options)?;
        zip.write_all(&bundle.manifest().to_json()?)
            .at(Path::new(&manifest_path))?;
    }

    add_tree(&mut zip, bundle.assets(), folder, options)?;

    Ok(zip.finish()?)
}

fn add_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    tree: &AssetTree,
    prefix: &str,
    options: FileOptions<'_, ()>,
) -> Result<()> {
    for (name, node) in tree.entries() {
        let path = format!("{}/{}", prefix, name);
        match node {
            AssetNode::Directory(sub) => {
                zip.add_directory(format!("{}/", path), options)?;
                add_tree(zip, sub, &path, options)?;
            }
            AssetNode::File(data) => {
                zip.start_file(path.as_str(), options)?;
                zip.write_all(data).at(Path::new(&path))?;
                debug!(path = %path, bytes = data.len(), "Added file to TextPack");
            }
        }
    }
    Ok(())
}

/// Find the bundle inside the archive tree
///
/// Either the root itself holds `text.*`, or it holds exactly one visible
/// folder that does.
fn locate_bundle_root(mut tree: AssetTree) -> Result<AssetTree> {
    let root_has_text = tree
        .entries()
        .any(|(name, node)| !node.is_dir() && is_text_file_name(name));
    if root_has_text {
        return Ok(tree);
    }

    let visible: Vec<String> = tree
        .entries()
        .filter(|(name, _)| !name.starts_with('.'))
        .map(|(name, _)| name.clone())
        .collect();

    if let [folder] = visible.as_slice() {
        if let Some(AssetNode::Directory(inner)) = tree.remove(folder) {
            debug!(folder = %folder, "Using bundle folder inside TextPack");
            return Ok(inner);
        }
    }

    Err(TextBundleError::InvalidFormat(
        "TextPack does not contain a TextBundle".to_string(),
    ))
}

fn too_large(limit: u64) -> TextBundleError {
    TextBundleError::InvalidFormat(format!(
        "TextPack expands beyond {} bytes",
        limit
    ))
}

/// File names along an archive entry path
fn archive_components(path: &Path) -> Result<Vec<&str>> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .map(|part| {
            part.to_str().ok_or_else(|| {
                TextBundleError::InvalidFormat(format!(
                    "Non UTF-8 name in TextPack: {}",
                    path.display()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type;
    use std::io::Cursor;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<'_, ()> = FileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_roundtrip_in_memory() {
        let mut bundle = TextBundle::new("# Hi\n\n![](assets/a.png)");
        bundle.set_content_type(content_type::MARKDOWN);
        bundle.set_creator_identifier(Some("com.example.app".to_string()));
        bundle.add_asset("a.png", vec![1, 2, 3]).unwrap();
        bundle.assets_mut().create_dir("assets/empty").unwrap();

        let cursor = write_textpack(&bundle, Cursor::new(Vec::new()), "Note.textbundle").unwrap();
        let reopened = read_textpack(Cursor::new(cursor.into_inner())).unwrap();

        assert_eq!(reopened, bundle);
    }

    #[test]
    fn test_reads_flat_archives() {
        let data = zip_of(&[
            ("text.md", &b"flat"[..]),
            ("info.json", &br#"{"version": 2, "type": "net.daringfireball.markdown"}"#[..]),
            ("assets/x.bin", &[9u8][..]),
        ]);

        let bundle = read_textpack(Cursor::new(data)).unwrap();
        assert_eq!(bundle.text(), "flat");
        assert_eq!(bundle.version(), 2);
        assert_eq!(bundle.asset("x.bin"), Some(&[9u8][..]));
    }

    #[test]
    fn test_skips_resource_forks() {
        let data = zip_of(&[
            ("Doc.textbundle/text.txt", &b"body"[..]),
            ("__MACOSX/Doc.textbundle/._text.txt", &[0u8; 4][..]),
        ]);

        let bundle = read_textpack(Cursor::new(data)).unwrap();
        assert_eq!(bundle.text(), "body");
        assert!(bundle.assets().is_empty());
    }

    #[test]
    fn test_rejects_archives_without_bundle() {
        let data = zip_of(&[("a/text.md", &b"x"[..]), ("b/text.md", &b"y"[..])]);
        let err = read_textpack(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, TextBundleError::InvalidFormat(_)));

        let err = read_textpack(Cursor::new(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, TextBundleError::Zip(_)));
    }

    #[test]
    fn test_size_limit() {
        let data = zip_of(&[
            ("text.md", &b"0123456789"[..]),
            ("assets/big.bin", &[0u8; 100][..]),
        ]);

        let err = read_textpack_with_limit(Cursor::new(data.clone()), 50).unwrap_err();
        assert!(matches!(err, TextBundleError::InvalidFormat(_)));

        let err = read_textpack_with_limit(Cursor::new(data.clone()), 109).unwrap_err();
        assert!(matches!(err, TextBundleError::InvalidFormat(_)));

        let bundle = read_textpack_with_limit(Cursor::new(data), 110).unwrap();
        assert_eq!(bundle.asset("big.bin").map(<[u8]>::len), Some(100));
    }

    #[test]
    fn test_folder_name_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Draft.textpack");
        save_textpack(&TextBundle::new("x"), &path).unwrap();

        let archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"Draft.textbundle/text.txt"));
    }
}
