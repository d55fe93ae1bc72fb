use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use vbapcode::{process_project, Options};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage(me: &str) -> ! {
    eprintln!("Usage: {me} [options] <file-or-dir> [<file-or-dir> ...]");
    eprintln!("  --no-recurse     when a directory is given, process only its immediate children");
    eprintln!("  --disasm-only    suppress stream dumps; emit only the per-line disassembly");
    eprintln!("  --verbose        include hex dumps of each stream and raw opcode words");
    eprintln!("  --output <path>  redirect rendered output to <path> instead of stdout");
    eprintln!("  --version        print version and exit");
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let argv: Vec<String> = std::env::args().collect();
    let mut opts = Options::default();
    let mut no_recurse = false;
    let mut output_path: Option<String> = None;
    let mut paths: Vec<String> = Vec::new();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--no-recurse" => no_recurse = true,
            "--disasm-only" => opts.disasm_only = true,
            "--verbose" => opts.verbose = true,
            "--version" => {
                println!("vbapcode {VERSION}");
                std::process::exit(0);
            }
            "--output" => {
                i += 1;
                match argv.get(i) {
                    Some(p) => output_path = Some(p.clone()),
                    None => usage(&argv[0]),
                }
            }
            "--help" => usage(&argv[0]),
            other => paths.push(other.to_string()),
        }
        i += 1;
    }
    if paths.is_empty() {
        usage(&argv[0]);
    }

    let mut out: Box<dyn Write> = match output_path {
        Some(p) => match File::create(&p) {
            Ok(f) => Box::new(BufWriter::new(f)),
            Err(e) => {
                eprintln!("Failed to create output file {p}: {e}.");
                std::process::exit(1);
            }
        },
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let mut files = Vec::new();
    for path in &paths {
        collect_files(Path::new(path), no_recurse, &mut files);
    }

    for file in files {
        if let Err(e) = process_one(&file, opts, &mut out) {
            eprintln!("Error processing {}: {e}.", file.display());
        }
    }
}

/// Expands a file-or-directory argument into a flat list of files to disassemble.
///
/// A single directory level is walked even under `--no-recurse` (the restriction applies
/// to nested subdirectories, not to the directory named on the command line itself).
fn collect_files(path: &Path, no_recurse: bool, out: &mut Vec<PathBuf>) {
    if path.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else {
            eprintln!("Failed to read directory {}.", path.display());
            return;
        };
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                if !no_recurse {
                    collect_files(&entry_path, no_recurse, out);
                }
            } else {
                out.push(entry_path);
            }
        }
    } else {
        out.push(path.to_path_buf());
    }
}

fn process_one(path: &Path, opts: Options, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{}", path.display())?;
    let f = File::open(path)?;
    process_project(BufReader::new(f), out, opts)
}
