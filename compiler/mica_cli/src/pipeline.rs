//! Per-file compilation driving with phase stop points

use anyhow::{Context as _, Result};
use mica_common::Context;
use mica_lexer::{
    Interner, Phase1, Phase2, Phase3, Preprocessor, SearchPaths, SourceReader,
    TokenPrinter,
};
use mica_parser::parse_source;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub stop_after: u8,
    pub print_ast: bool,
    pub print_ir: bool,
}

fn report(ctx: &Context) {
    for diagnostic in &ctx.diags.messages {
        eprintln!("{}", diagnostic.render(&ctx.files));
    }
}

/// Run one translation unit up to the requested phase. Returns whether the
/// unit compiled without errors.
pub fn compile_file(path: &Path, search: &SearchPaths, options: &DriverOptions) -> Result<bool> {
    let name = path.display().to_string();
    let bytes =
        fs::read(path).with_context(|| format!("cannot read source file '{name}'"))?;

    let mut ctx = Context::default();

    match options.stop_after {
        1 | 2 => run_char_phases(&name, bytes, options.stop_after, &mut ctx),
        3 => run_tokenizer(&name, bytes, &mut ctx),
        // phases 5-7 have no separate stream; 6 is the full preprocess
        4..=7 => run_preprocessor(&name, bytes, search.clone(), &mut ctx),
        _ => run_compile(&name, bytes, search.clone(), &mut ctx, options),
    }

    report(&ctx);
    Ok(!ctx.diags.has_errors())
}

fn run_char_phases(name: &str, bytes: Vec<u8>, stop_after: u8, ctx: &mut Context) {
    let file = ctx.files.add_file(name);
    let phase1 = Phase1::new(SourceReader::new(bytes, file));

    let mut out = Vec::new();
    if stop_after == 1 {
        let mut phase1 = phase1;
        while let Some(c) = phase1.next(ctx) {
            out.push(c);
        }
    } else {
        let mut phase2 = Phase2::new(phase1, ctx);
        while let Some(c) = phase2.next(ctx) {
            out.push(c);
        }
    }
    print!("{}", String::from_utf8_lossy(&out));
}

fn run_tokenizer(name: &str, bytes: Vec<u8>, ctx: &mut Context) {
    let file = ctx.files.add_file(name);
    let phase1 = Phase1::new(SourceReader::new(bytes, file));
    let phase2 = Phase2::new(phase1, ctx);
    let mut phase3 = Phase3::new(phase2, ctx);
    let mut interner = Interner::new();

    let mut printer = TokenPrinter::new();
    let mut out = String::new();
    loop {
        let tok = phase3.next(&mut interner, ctx);
        if tok.is_eof() {
            break;
        }
        printer.print(&mut out, &interner, &tok).expect("writing to a string");
    }
    println!("{out}");
}

fn run_preprocessor(name: &str, bytes: Vec<u8>, search: SearchPaths, ctx: &mut Context) {
    let mut pp = Preprocessor::new(name, bytes, search, ctx);

    let mut printer = TokenPrinter::new();
    let mut out = String::new();
    loop {
        let tok = pp.next_token(ctx);
        if tok.is_eof() {
            break;
        }
        printer.print(&mut out, pp.interner(), &tok).expect("writing to a string");
    }
    println!("{out}");
}

fn run_compile(
    name: &str,
    bytes: Vec<u8>,
    search: SearchPaths,
    ctx: &mut Context,
    options: &DriverOptions,
) {
    let (mut unit, symbols) = parse_source(name, bytes, search, ctx);

    if options.print_ast {
        match mica_parser::serialization::to_json(&unit) {
            Ok(json) => println!("{json}"),
            Err(error) => log::error!("cannot serialize AST: {error}"),
        }
    }

    if ctx.diags.has_errors() {
        return;
    }

    mica_typechecker::analyze(&mut unit, &symbols, ctx);
    if ctx.diags.has_errors() {
        // semantic errors abandon the unit before lowering
        return;
    }

    let module = mica_ir::lower(&unit, &symbols, ctx);

    if options.print_ir {
        print!("{}", mica_ir::print_module(&module));
    }
}
