//! Flash container pack/unpack binary

use anyhow::{Context, bail};
use clap::Parser;
use flashpack::exit_codes::*;
use flashpack::firmware::defaults::strict_mode;
use flashpack::firmware::report::{self, ItemTable};
use flashpack::{PackOptions, UnpackOptions, pack_firmware, unpack_firmware};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::{env, panic, process};

const VERSION: &str = flashpack::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Pack or unpack flash containers")]
struct Args {
    /// Items directory (staged item files, item_list.txt, sig_item_list.txt)
    #[arg(short = 'd', long = "dir")]
    items_dir: PathBuf,

    /// Unpack the container given with -f
    #[arg(short, long)]
    unpack: bool,

    /// Container to unpack
    #[arg(short = 'f', long = "file")]
    input: Option<PathBuf>,

    /// Pack the items directory into the container given with -o
    #[arg(short, long)]
    pack: bool,

    /// Container to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show every item record field
    #[arg(short, long)]
    verbose: bool,

    /// Print the result as JSON instead of diagnostic lines
    #[arg(long)]
    json: bool,

    /// Fail on CRC32 mismatches while unpacking (also FLASHPACK_STRICT)
    #[arg(long)]
    strict: bool,

    /// Log level (trace, debug, info, warn, error, json:<level>)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug)]
enum Mode {
    Pack(PathBuf),
    Unpack(PathBuf),
}

fn mode(args: &Args) -> anyhow::Result<Mode> {
    match (args.unpack, args.pack) {
        (true, true) => bail!("-u and -p cannot be used together"),
        (true, false) => {
            let input = args.input.clone().context("-u requires -f <container>")?;
            Ok(Mode::Unpack(input))
        }
        (false, true) => {
            let output = args.output.clone().context("-p requires -o <container>")?;
            Ok(Mode::Pack(output))
        }
        (false, false) => bail!("one of -u or -p is required"),
    }
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
            eprintln!("Fatal: Unhandled panic in flashpack-fmw");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("flashpack-fmw {}", flashpack::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();

    flashpack::logger::init(args.log_level.as_deref());

    match mode(&args) {
        Ok(Mode::Pack(output)) => pack(&args, &output),
        Ok(Mode::Unpack(input)) => unpack(&args, &input),
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_INVALID_ARGS
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("JSON error: {e}"),
    }
}

fn pack(args: &Args, output: &Path) -> i32 {
    let fw = match pack_firmware(&args.items_dir, output, PackOptions::default()) {
        Ok(fw) => fw,
        Err(e) => {
            eprintln!("Pack error: {}", e);
            return exit_code_for(&e);
        }
    };

    if args.json {
        let records: Vec<_> = fw.entries.iter().map(|e| &e.record).collect();
        print_json(&json!({
            "output": output,
            "header": fw.header,
            "product_list": fw.product_list_text(),
            "items": records,
        }));
    } else {
        for line in report::header_lines(&fw) {
            println!("{line}");
        }
        print!("{}", ItemTable::new(&fw, args.verbose));
        println!("{} Packed {}", report::PASS, output.display());
    }
    EXIT_SUCCESS
}

fn unpack(args: &Args, input: &Path) -> i32 {
    let options = UnpackOptions {
        strict: strict_mode(args.strict),
    };

    let result = match unpack_firmware(input, &args.items_dir, options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Unpack error: {}", e);
            return exit_code_for(&e);
        }
    };
    let fw = &result.firmware;

    if args.json {
        let records: Vec<_> = fw.entries.iter().map(|e| &e.record).collect();
        print_json(&json!({
            "input": input,
            "header": fw.header,
            "product_list": fw.product_list_text(),
            "items": records,
            "crc": result.crc,
        }));
    } else {
        for line in report::header_lines(fw) {
            println!("{line}");
        }
        print!("{}", ItemTable::new(fw, args.verbose));
        for line in report::crc_lines(&result.crc) {
            println!("{line}");
        }
    }
    EXIT_SUCCESS
}
