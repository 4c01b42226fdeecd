mod scanner;
mod writer;

pub use scanner::{classify, is_text_file_name, scan_dir, ScannedPackage, TEXT_FILE_STEM};
pub use writer::{PackageWriter, WriteSummary};

pub(crate) use writer::check_reserved_names;
