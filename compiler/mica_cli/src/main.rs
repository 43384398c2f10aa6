//! Command-line driver for the mica C compiler

mod pipeline;
mod testrun;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use mica_lexer::SearchPaths;

/// A C compiler front-end and mid-end targeting x86-64
#[derive(Parser, Debug)]
#[command(name = "mica", version, about)]
struct Args {
    /// Source files to compile
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Add an include directory; a leading '-' marks a system directory
    #[arg(short = 'I', value_name = "PATH", allow_hyphen_values = true)]
    include: Vec<String>,

    /// Stop after translation phase N (1-8)
    #[arg(short = 'E', value_name = "N")]
    stop_after: Option<u8>,

    /// Dump the AST as JSON after parsing
    #[arg(long)]
    print_ast: bool,

    /// Dump the IR after lowering
    #[arg(long)]
    print_ir: bool,

    /// Compile every .c file under PATH and report pass/fail
    #[arg(long, value_name = "PATH")]
    test: Option<PathBuf>,
}

fn search_paths(include: &[String]) -> SearchPaths {
    let mut search = SearchPaths::new();
    for entry in include {
        match entry.strip_prefix('-') {
            Some(system) => search.add_system(PathBuf::from(system)),
            None => search.add_user(PathBuf::from(entry)),
        }
    }
    search
}

fn run(args: &Args) -> Result<bool> {
    let search = search_paths(&args.include);

    if let Some(tree) = &args.test {
        return testrun::run_tree(tree, &search);
    }

    if let Some(stop) = args.stop_after {
        anyhow::ensure!((1..=8).contains(&stop), "-E expects a phase between 1 and 8");
    }

    let mut all_ok = true;
    for file in &args.files {
        let options = pipeline::DriverOptions {
            stop_after: args.stop_after.unwrap_or(8),
            print_ast: args.print_ast,
            print_ir: args.print_ir,
        };
        all_ok &= pipeline::compile_file(file, &search, &options)?;
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.files.is_empty() && args.test.is_none() {
        eprintln!("mica: no input files");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("mica: {error:#}");
            ExitCode::FAILURE
        }
    }
}
