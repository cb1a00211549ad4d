//! Example: Load a menu catalog file and preview it in the terminal
//!
//! Usage: cargo run --example load_catalog -- path/to/catalog.json [drink-key]

use std::env;
use std::fs;

use brewviz_core::{Catalog, ViewerConfig};
use brewviz_terminal::{TerminalApp, TerminalError};

fn main() -> Result<(), TerminalError> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let catalog = match args.get(1) {
        Some(path) => {
            println!("Loading catalog: {path}");
            Catalog::from_json(&fs::read_to_string(path)?)?
        }
        None => {
            eprintln!("Usage: {} <catalog.json> [drink-key]", args[0]);
            eprintln!("\nNo catalog provided, using the built-in menu...");
            Catalog::embedded()?
        }
    };

    for record in catalog.iter() {
        println!(
            "  {:<16} {:<10} {} layers, {} total",
            record.key,
            record.category.label(),
            record.ingredients.len(),
            record.total_volume()
        );
    }
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(catalog, ViewerConfig::default(), args.get(2).map(String::as_str))?;
    app.run()
}
