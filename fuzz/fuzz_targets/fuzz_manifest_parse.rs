#![no_main]

use libfuzzer_sys::fuzz_target;
use textbundle_rs::Manifest;

fuzz_target!(|data: &[u8]| {
    // Parse - should never panic
    let manifest = match Manifest::from_json(data) {
        Ok(m) => m,
        Err(_) => return, // Expected for malformed JSON
    };

    // Serialize and parse back - should never panic
    let json = match manifest.to_json() {
        Ok(json) => json,
        Err(_) => return,
    };
    if let Ok(reparsed) = Manifest::from_json(&json) {
        assert_eq!(reparsed.version, manifest.version);
        assert_eq!(reparsed.content_type, manifest.content_type);
        assert_eq!(reparsed.creator_identifier, manifest.creator_identifier);
    }

    let _ = manifest.is_implied_by("md");
    let _ = manifest.application_metadata_for("com.example.app");
});
