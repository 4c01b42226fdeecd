//! Generate seed corpus for fuzzing

use std::fs;
use std::io::Cursor;
use textbundle_rs::{content_type, write_textpack, Manifest, TextBundle};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = "fuzz/corpus/fuzz_manifest_parse";
    let textpack_dir = "fuzz/corpus/fuzz_textpack_open";
    fs::create_dir_all(manifest_dir)?;
    fs::create_dir_all(textpack_dir)?;

    println!("Generating seed corpus...");

    // Manifest seeds
    let manifests: [(&str, &[u8]); 4] = [
        ("seed_empty.json", b"{}"),
        ("seed_v1.json", br#"{"version": 1, "type": "public.plain-text"}"#),
        (
            "seed_v2.json",
            br#"{"version":2,"type":"net.daringfireball.markdown","transient":true,"creatorIdentifier":"com.example.app"}"#,
        ),
        (
            "seed_metadata.json",
            br#"{"version":2,"com.example.app":{"version":1,"note":"x","tags":["a","b"]},"flag":null}"#,
        ),
    ];
    for (name, data) in manifests {
        let path = format!("{}/{}", manifest_dir, name);
        fs::write(&path, data)?;
        println!("Generated: {}", path);
    }

    // Seed: plain text, no assets
    {
        let bundle = TextBundle::new("Hello, World!");
        write_seed(textpack_dir, "seed_plain.textpack", &bundle)?;
    }

    // Seed: markdown with nested assets
    {
        let mut bundle = TextBundle::new("# Title\n\n![](assets/img.png)");
        bundle.set_content_type(content_type::MARKDOWN);
        bundle.add_asset("img.png", vec![1, 2, 3])?;
        bundle
            .assets_mut()
            .insert_file("assets/dir/data.bin", (0..=255).collect::<Vec<u8>>())?;
        write_seed(textpack_dir, "seed_assets.textpack", &bundle)?;
    }

    // Seed: application metadata
    {
        let mut bundle = TextBundle::from_parts(
            "<p>page</p>",
            Manifest::new(content_type::HTML),
            Default::default(),
        );
        bundle.set_application_value("com.example.app", "cursor", 7u64.into());
        write_seed(textpack_dir, "seed_metadata.textpack", &bundle)?;
    }

    println!("\nSeed corpus generated successfully!");
    Ok(())
}

fn write_seed(dir: &str, name: &str, bundle: &TextBundle) -> Result<(), Box<dyn std::error::Error>> {
    let path = format!("{}/{}", dir, name);
    let cursor = write_textpack(bundle, Cursor::new(Vec::new()), "Seed.textbundle")?;
    fs::write(&path, cursor.into_inner())?;
    println!("Generated: {}", path);
    Ok(())
}
