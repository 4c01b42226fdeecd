//! The in-memory TextBundle
//!
//! A [`TextBundle`] owns its text, manifest and asset tree outright. Opening
//! reads the whole package into memory and releases every file handle, so
//! edits stay local until [`TextBundle::save`] is called.

use crate::assets::{AssetNode, AssetTree, ASSETS_DIR_NAME};
use crate::content_type;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::options::{ReadOptions, WriteOptions};
use crate::package::{scan_dir, PackageWriter, ScannedPackage, WriteSummary};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// A TextBundle document: text payload, manifest and assets
#[derive(Debug, Clone, Default)]
pub struct TextBundle {
    text: String,
    manifest: Manifest,
    assets: AssetTree,
    prevent_asset_duplication: bool,
}

impl PartialEq for TextBundle {
    /// Compares persisted state only
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.manifest == other.manifest && self.assets == other.assets
    }
}

impl Eq for TextBundle {}

impl TextBundle {
    /// Create a current-version bundle holding `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a bundle from explicit parts
    pub fn from_parts(text: impl Into<String>, manifest: Manifest, assets: AssetTree) -> Self {
        Self {
            text: text.into(),
            manifest,
            assets,
            prevent_asset_duplication: false,
        }
    }

    pub(crate) fn from_scanned(package: ScannedPackage) -> Self {
        Self::from_parts(package.text, package.manifest, package.assets)
    }

    /// Open a package directory with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, &ReadOptions::default())
    }

    /// Open a package directory
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let package = scan_dir(path, options)?;

        info!(
            path = %path.display(),
            version = package.manifest.version,
            content_type = %package.manifest.content_type,
            assets = package.assets.file_count(),
            "Bundle opened"
        );

        Ok(Self::from_scanned(package))
    }

    /// Write the bundle to a package directory with default options
    ///
    /// `previous` is an earlier revision of the package; unchanged assets are
    /// linked to it rather than copied.
    pub fn save<P: AsRef<Path>>(&self, path: P, previous: Option<&Path>) -> Result<()> {
        self.save_with_options(path, previous, &WriteOptions::default())
            .map(|_| ())
    }

    /// Write the bundle to a package directory
    ///
    /// Without [`WriteOptions::atomic`], a failure part-way leaves the entries
    /// written so far on disk.
    pub fn save_with_options<P: AsRef<Path>>(
        &self,
        path: P,
        previous: Option<&Path>,
        options: &WriteOptions,
    ) -> Result<WriteSummary> {
        let path = path.as_ref();
        let summary = PackageWriter::new(*options).write(self, path, previous)?;

        info!(
            path = %path.display(),
            written = summary.files_written,
            linked = summary.files_linked,
            unchanged = summary.files_unchanged,
            pruned = summary.entries_pruned,
            "Bundle saved"
        );

        Ok(summary)
    }

    /// The plain text contents of `text.*`
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// File name the payload is written under
    pub fn text_filename(&self) -> String {
        format!(
            "text.{}",
            content_type::extension_for(&self.manifest.content_type)
        )
    }

    pub fn assets(&self) -> &AssetTree {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetTree {
        &mut self.assets
    }

    pub fn set_assets(&mut self, assets: AssetTree) {
        self.assets = assets;
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    pub fn version(&self) -> u32 {
        self.manifest.version
    }

    pub fn set_version(&mut self, version: u32) {
        self.manifest.version = version;
    }

    /// UTI of the text payload
    pub fn content_type(&self) -> &str {
        &self.manifest.content_type
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.manifest.content_type = content_type.into();
    }

    pub fn is_transient(&self) -> bool {
        self.manifest.transient
    }

    pub fn set_transient(&mut self, transient: bool) {
        self.manifest.transient = transient;
    }

    pub fn creator_identifier(&self) -> Option<&str> {
        self.manifest.creator_identifier.as_deref()
    }

    pub fn set_creator_identifier(&mut self, identifier: Option<String>) {
        self.manifest.creator_identifier = identifier;
    }

    pub fn application_metadata(&self) -> &Map<String, Value> {
        &self.manifest.application_metadata
    }

    pub fn application_metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.manifest.application_metadata
    }

    /// Metadata object stored under an application identifier
    pub fn application_metadata_for(&self, identifier: &str) -> Option<&Map<String, Value>> {
        self.manifest.application_metadata_for(identifier)
    }

    pub fn set_application_value(&mut self, identifier: &str, key: &str, value: Value) {
        self.manifest.set_application_value(identifier, key, value);
    }

    pub fn remove_application_value(&mut self, identifier: &str, key: &str) -> Option<Value> {
        self.manifest.remove_application_value(identifier, key)
    }

    /// Whether [`add_asset`](Self::add_asset) reuses same-named identical files
    pub fn prevent_asset_duplication(&self) -> bool {
        self.prevent_asset_duplication
    }

    pub fn set_prevent_asset_duplication(&mut self, prevent: bool) {
        self.prevent_asset_duplication = prevent;
    }

    /// Contents of a file under `assets/`
    pub fn asset(&self, name: &str) -> Option<&[u8]> {
        self.assets
            .get_dir(ASSETS_DIR_NAME)
            .and_then(|dir| dir.get_file(name))
    }

    /// Add a file under `assets/`, renaming it if the name is taken
    ///
    /// Returns the name the file was stored under, which is the one to
    /// reference from the text.
    pub fn add_asset(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<String> {
        let skip_duplicates = self.prevent_asset_duplication;
        self.assets
            .create_dir(ASSETS_DIR_NAME)?
            .add_unique(name, data.into(), skip_duplicates)
    }

    /// Remove a file or directory under `assets/`
    pub fn remove_asset(&mut self, name: &str) -> Option<AssetNode> {
        self.assets.get_dir_mut(ASSETS_DIR_NAME)?.remove(name)
    }
}
