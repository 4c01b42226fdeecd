//! Create a bundle, edit it, save a second revision and pack it
//!
//! Run with `cargo run --example basic -- <output dir>`.

use anyhow::{Context, Result};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use textbundle_rs::{content_type, open_bundle, open_textpack, save_textpack, TextBundle, WriteOptions};

fn main() -> Result<()> {
    let out = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("textbundle-demo"));

    let first = out.join("Recipe.textbundle");
    let second = out.join("Recipe 2.textbundle");
    let pack = out.join("Recipe.textpack");

    let mut bundle = TextBundle::new("# Pancakes\n\n![](assets/stack.jpg)\n");
    bundle.set_content_type(content_type::MARKDOWN);
    bundle.set_creator_identifier(Some("org.example.demo".to_string()));
    bundle.set_application_value("org.example.demo", "servings", json!(4));
    let name = bundle.add_asset("stack.jpg", vec![0xff, 0xd8, 0xff, 0xe0])?;
    println!("Stored image as assets/{}", name);

    bundle
        .save(&first, None)
        .with_context(|| format!("saving {}", first.display()))?;
    println!("Wrote {}", first.display());

    let mut edited = open_bundle(&first)?;
    edited.set_text(format!("{}\nServe warm.\n", edited.text()));
    let summary = edited.save_with_options(&second, Some(&first), &WriteOptions::default())?;
    println!(
        "Wrote {} ({} written, {} linked)",
        second.display(),
        summary.files_written,
        summary.files_linked
    );

    save_textpack(&edited, &pack)?;
    let unpacked = open_textpack(&pack)?;
    println!(
        "Packed {} ({} assets, equal: {})",
        pack.display(),
        unpacked.assets().file_count(),
        unpacked == edited
    );

    Ok(())
}
