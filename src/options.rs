//! Read and write flags
//!
//! The plain `open`/`save` entry points use the defaults here.

/// Flags controlling how a package is scanned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Follow symbolic links inside the package instead of skipping them
    pub follow_symlinks: bool,

    /// Skip dot-files (`.DS_Store` and friends) when building the asset tree
    pub skip_hidden: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }
}

/// Flags controlling how a package is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Hard-link assets whose bytes match the previous revision
    pub reuse_unchanged_assets: bool,

    /// Build the package in a sibling temp directory and swap it into place
    pub atomic: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            reuse_unchanged_assets: true,
            atomic: false,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable or enable hard-link reuse of unchanged assets
    pub fn with_asset_reuse(mut self, reuse: bool) -> Self {
        self.reuse_unchanged_assets = reuse;
        self
    }

    /// Replace the destination all-or-nothing
    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }
}
