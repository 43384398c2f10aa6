//! The `--test` tree runner: compile every .c file under a directory

use crate::pipeline::{compile_file, DriverOptions};
use anyhow::Result;
use mica_lexer::SearchPaths;
use std::path::Path;
use walkdir::WalkDir;

pub fn run_tree(tree: &Path, search: &SearchPaths) -> Result<bool> {
    let options = DriverOptions { stop_after: 8, print_ast: false, print_ir: false };

    let mut passed = 0usize;
    let mut failed = 0usize;

    for entry in WalkDir::new(tree).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("c") {
            continue;
        }

        let ok = compile_file(entry.path(), search, &options)?;
        if ok {
            passed += 1;
            println!("PASS {}", entry.path().display());
        } else {
            failed += 1;
            println!("FAIL {}", entry.path().display());
        }
    }

    println!("{passed} passed, {failed} failed");
    Ok(failed == 0)
}
