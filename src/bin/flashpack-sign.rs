//! Manifest signing binary

use clap::Parser;
use flashpack::exit_codes::*;
use flashpack::firmware::report;
use flashpack::{SignOptions, sign_items};
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = flashpack::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Sign the SHA-256 manifest of staged items")]
struct Args {
    /// Items directory holding sig_item_list.txt and the item files
    #[arg(short = 'd', long = "dir")]
    items_dir: PathBuf,

    /// RSA private key (PEM, PKCS#1 or PKCS#8, 2048-bit)
    #[arg(short, long)]
    key: PathBuf,

    /// Signature file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Print the manifest as JSON instead of diagnostic lines
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error, json:<level>)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in flashpack-sign");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("flashpack-sign {}", flashpack::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();

    flashpack::logger::init(args.log_level.as_deref());

    match sign_items(&args.items_dir, &args.key, &args.output, SignOptions::default()) {
        Ok(result) => {
            if args.json {
                match serde_json::to_string_pretty(&result) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("JSON error: {e}"),
                }
            } else {
                for line in report::sign_list_lines(&result.list) {
                    println!("{line}");
                }
                println!(
                    "{} Signed {} items into {}",
                    report::PASS,
                    result.manifest.len(),
                    args.output.display()
                );
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Sign error: {}", e);
            exit_code_for(&e)
        }
    }
}
