//! textbundle-rs: reader and writer for TextBundle document packages
//!
//! A TextBundle is a directory holding one plain-text payload (`text.md`,
//! `text.txt`, ...), an optional `info.json` manifest and any number of
//! referenced asset files. This library provides:
//! - Loading a package fully into memory as a [`TextBundle`]
//! - Manifest parsing with version-1 defaults and preserved application metadata
//! - Writing packages back with hard-link reuse of unchanged assets
//! - TextPack (`.textpack`) zip archives
//!
//! # Example
//!
//! ```no_run
//! use textbundle_rs::{content_type, open_bundle, save_bundle, TextBundle};
//! use std::path::Path;
//!
//! // Create a bundle
//! let mut bundle = TextBundle::new("# Notes\n\n![](assets/photo.jpg)");
//! bundle.set_content_type(content_type::MARKDOWN);
//! bundle.add_asset("photo.jpg", vec![0xff, 0xd8, 0xff])?;
//! save_bundle(&bundle, "Notes.textbundle", None)?;
//!
//! // Edit and save again, linking the unchanged photo
//! let mut bundle = open_bundle("Notes.textbundle")?;
//! bundle.set_text("# Notes\n\nUpdated");
//! save_bundle(&bundle, "Notes v2.textbundle", Some(Path::new("Notes.textbundle")))?;
//! # Ok::<(), textbundle_rs::error::TextBundleError>(())
//! ```

// Core modules
pub mod assets;
pub mod bundle;
pub mod content_type;
pub mod error;
pub mod manifest;
pub mod options;
pub mod package;
pub mod textpack;

use std::path::Path;

// Re-export commonly used types
pub use assets::{AssetNode, AssetTree, ASSETS_DIR_NAME};
pub use bundle::TextBundle;
pub use error::{Result, TextBundleError};
pub use manifest::{Manifest, CURRENT_VERSION, LEGACY_VERSION, MANIFEST_FILE_NAME};
pub use options::{ReadOptions, WriteOptions};
pub use package::{PackageWriter, WriteSummary, TEXT_FILE_STEM};
pub use textpack::{
    open_textpack, read_textpack, read_textpack_with_limit, save_textpack, write_textpack,
    MAX_UNPACKED_SIZE,
};

/// Open a TextBundle package directory
pub fn open_bundle<P: AsRef<Path>>(path: P) -> Result<TextBundle> {
    TextBundle::open(path)
}

/// Save a bundle to a package directory
///
/// Assets unchanged since `previous` are hard-linked to it where possible.
pub fn save_bundle<P: AsRef<Path>>(
    bundle: &TextBundle,
    path: P,
    previous: Option<&Path>,
) -> Result<()> {
    bundle.save(path, previous)
}
