#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use textbundle_rs::{read_textpack, write_textpack};

fuzz_target!(|data: &[u8]| {
    // Skip inputs shorter than an end-of-central-directory record
    if data.len() < 22 {
        return;
    }

    // Try to read the archive - should never panic
    let bundle = match read_textpack(Cursor::new(data)) {
        Ok(b) => b,
        Err(_) => return, // Expected for invalid data
    };

    // Walk the asset tree - should never panic
    let _ = bundle.assets().files();
    let _ = bundle.assets().total_bytes();
    let _ = bundle.text_filename();

    // Writing a bundle we just read can only fail on reserved names
    let _ = write_textpack(&bundle, Cursor::new(Vec::new()), "Fuzz.textbundle");
});
