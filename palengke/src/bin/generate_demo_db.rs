//! Generate a demo catalog database.
//!
//! This creates a SQLite database using the native catalog code, ensuring
//! schema compatibility with the server.
//!
//! Usage:
//!     cargo run --bin generate-demo-db [output_path]
//!
//! Default output: palengke.sqlite in the current directory.

use std::env;
use std::path::PathBuf;

use palengke::database::Catalog;

fn main() {
    let args: Vec<String> = env::args().collect();

    let output_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("palengke.sqlite")
    };

    // Remove existing file
    if output_path.exists() {
        std::fs::remove_file(&output_path).expect("Failed to remove existing database");
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("Failed to create output directory");
        }
    }

    println!("Generating demo catalog...");
    println!("Output: {}", output_path.display());

    let catalog = Catalog::open(&output_path).expect("Failed to create database");
    palengke::demo::seed(&catalog).expect("Failed to seed demo data");

    println!();
    println!("Database created: {}", output_path.display());
    println!("  Stalls: {}", catalog.count_stalls().expect("count stalls"));
    println!("  Items:  {}", catalog.count_items().expect("count items"));
}
