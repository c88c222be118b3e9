//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::collector::SpriteMapCollector;
use crate::config::CssConfig;
use crate::mapper::SpriteDirsMapper;
use crate::models::SpriteRef;

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Find all stylesheets in a directory (recursively).
pub fn find_css_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(paths) = glob(&format!("{}/**/*.css", dir.display())) {
        files.extend(paths.filter_map(Result::ok));
    }
    files.sort();
    files
}

/// Spritemapper - collect CSS sprite references into spritemap listings
#[derive(Parser)]
#[command(name = "smap")]
#[command(about = "Spritemapper - collect CSS sprite references into spritemap listings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate sprite references and print the resulting spritemaps
    Map {
        /// Stylesheet files or directories to scan ("-" reads a JSON
        /// record from stdin in --json mode)
        inputs: Vec<PathBuf>,

        /// Read pre-extracted [source, [refs]] JSON records instead of
        /// CSS files, and emit the registry as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Sprite directory that groups images into a spritemap; may be
        /// repeated, match order follows the flag order
        #[arg(long = "sprite-dir")]
        sprite_dirs: Vec<PathBuf>,

        /// Flatten nested directories into one spritemap per sprite dir
        #[arg(long)]
        flat: bool,

        /// Published URL prefix for generated spritemap images
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Map { inputs, json, sprite_dirs, flat, base_url } => {
            if inputs.is_empty() {
                eprintln!("Error: no inputs given");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
            let conf = CssConfig {
                sprite_dirs: if sprite_dirs.is_empty() { None } else { Some(sprite_dirs) },
                recursive: !flat,
                base_url,
                ..CssConfig::default()
            };
            if json {
                run_map_json(&inputs, conf)
            } else {
                run_map(&inputs, conf)
            }
        }
    }
}

/// Aggregate stylesheets and print the sorted spritemap listing.
fn run_map(inputs: &[PathBuf], conf: CssConfig) -> ExitCode {
    let mut collector = SpriteMapCollector::with_conf(conf);

    for input in inputs {
        let files = if input.is_dir() {
            let found = find_css_files(input);
            if found.is_empty() {
                eprintln!("Warning: no stylesheets under '{}'", input.display());
            }
            found
        } else {
            vec![input.clone()]
        };
        for file in files {
            if let Err(e) = collector.map_file(&file) {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    for sref in collector.skipped() {
        eprintln!(
            "Warning: no spritemap for '{}' (referenced from '{}')",
            sref.fname().display(),
            sref.source().display()
        );
    }

    for (fname, members) in collector.sorted_listing() {
        println!("{}", fname);
        for member in members {
            println!("- {}", member);
        }
        println!();
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// One batch input record: a source stylesheet and its extracted refs,
/// on the wire as `["src.css", ["a.png", ...]]`.
#[derive(Debug, serde::Deserialize)]
struct BatchRecord(String, Vec<String>);

/// Fold pre-extracted reference records into the registry and emit it as
/// `[[map, [members]], ...]` JSON on stdout.
fn run_map_json(inputs: &[PathBuf], conf: CssConfig) -> ExitCode {
    let mapper = SpriteDirsMapper::from_conf(&conf);
    let mut collector = SpriteMapCollector::with_conf(conf);

    for input in inputs {
        let record = if input.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        } else {
            std::fs::read_to_string(input)
        };
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: cannot read '{}': {}", input.display(), e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        };

        let BatchRecord(source, refs) = match serde_json::from_str(&record) {
            Ok(rec) => rec,
            Err(e) => {
                eprintln!("Error: bad record in '{}': {}", input.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        };

        let count = refs.len();
        let srefs = refs.into_iter().map(|r| SpriteRef::new(r, source.as_str()));
        if let Err(e) = collector.map_refs(srefs, &mapper) {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
        eprintln!("mapped {} sprites in {}", count, source);
    }

    match serde_json::to_string_pretty(&collector.listing()) {
        Ok(out) => {
            println!("{}", out);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_css_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.css"), "").unwrap();
        std::fs::write(dir.path().join("sub/b.css"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_css_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().is_some_and(|e| e == "css")));
    }

    #[test]
    fn test_batch_record_shape() {
        let BatchRecord(source, refs) =
            serde_json::from_str(r#"["css/style.css", ["css/icons/a.png", "css/icons/b.png"]]"#)
                .unwrap();
        assert_eq!(source, "css/style.css");
        assert_eq!(refs.len(), 2);
    }
}
