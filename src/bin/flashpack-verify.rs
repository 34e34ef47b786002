//! Signature file verification binary

use clap::Parser;
use flashpack::exit_codes::*;
use flashpack::firmware::report;
use flashpack::{VerifyOptions, verify_items};
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = flashpack::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Verify a signed item manifest")]
struct Args {
    /// Items directory the manifest paths are relative to
    #[arg(short = 'd', long = "dir")]
    items_dir: PathBuf,

    /// RSA public key (PEM, SPKI or PKCS#1)
    #[arg(short, long)]
    key: PathBuf,

    /// Signature file to check
    #[arg(short, long)]
    input: PathBuf,

    /// Print the report as JSON instead of diagnostic lines
    #[arg(long)]
    json: bool,

    /// Exit 0 even when a digest or the signature does not match
    #[arg(long)]
    report_only: bool,

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
            eprintln!("Fatal: Unhandled panic in flashpack-verify");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("flashpack-verify {}", flashpack::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();

    flashpack::logger::init(args.log_level.as_deref());

    let verify_report = match verify_items(
        &args.items_dir,
        &args.key,
        &args.input,
        VerifyOptions::default(),
    ) {
        Ok(verify_report) => verify_report,
        Err(e) => {
            eprintln!("Verify error: {}", e);
            return exit_code_for(&e);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&verify_report) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("JSON error: {e}"),
        }
    } else {
        for line in report::verify_lines(&verify_report, &args.key) {
            println!("{line}");
        }
    }

    if verify_report.is_valid() || args.report_only {
        EXIT_SUCCESS
    } else {
        EXIT_SIGNATURE_ERROR
    }
}
