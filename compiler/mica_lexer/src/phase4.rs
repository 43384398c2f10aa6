//! Translation phase 4: macro expansion and directive execution
//!
//! Pulls phase-3 tokens from a stack of open files, executes `#include`,
//! `#include_next`, `#define` and `#undef`, and macro-expands everything
//! else. Expansion works over abstract token sources so a replacement list
//! can be rescanned jointly with the stream that follows the macro use, as
//! the rescanning rule requires; the blue-paint flag on the macro's hash
//! node is cleared for exactly that rescan.

use crate::includes::{IncludeSearchState, SearchPaths};
use crate::intern::{FnMacro, Interner, MacroDef, NodeId};
use crate::phase1::Phase1;
use crate::phase2::Phase2;
use crate::phase3::{LexMode, Phase3};
use crate::source::SourceReader;
use crate::token::{StringEncoding, Token, TokenKind};
use mica_common::{Context, SourceLocation};
use std::collections::VecDeque;
use std::fs;

// See n1570 5.2.4.1
const MAX_INCLUDE_DEPTH: usize = 15;

// one open file on the include stack
#[derive(Debug)]
struct FileLexer {
    phase3: Phase3,
    peek: Token,
    /// search state used to resolve includes written in this file; the
    /// parent entry's state is what located this file, which is where
    /// `#include_next` resumes
    search_state: IncludeSearchState,
}

impl FileLexer {
    fn new(name: &str, bytes: Vec<u8>, interner: &mut Interner, ctx: &mut Context) -> Self {
        let file = ctx.files.add_file(name);
        let phase1 = Phase1::new(SourceReader::new(bytes, file));
        let phase2 = Phase2::new(phase1, ctx);
        let mut phase3 = Phase3::new(phase2, ctx);
        let peek = phase3.next(interner, ctx);
        Self { phase3, peek, search_state: IncludeSearchState::default() }
    }

    fn advance(&mut self, interner: &mut Interner, ctx: &mut Context) -> Token {
        let tok = self.peek.clone();
        self.peek = self.phase3.next(interner, ctx);
        tok
    }

    fn file_id(&self) -> mica_common::FileId {
        self.peek.loc.file
    }
}

// shared state the expansion engine needs besides a token source
struct ExpandEnv<'a> {
    interner: &'a mut Interner,
    ctx: &'a mut Context,
    prev_loc: SourceLocation,
}

// a pull source of preprocessing tokens for the expansion engine
trait PpSource {
    fn advance(&mut self, env: &mut ExpandEnv) -> Token;
    fn peek(&mut self, env: &mut ExpandEnv) -> Token;
    /// true once the part of this source that must be expanded has drained;
    /// rescanning stops here so trailing stream tokens stay untouched
    fn exhausted(&self) -> bool {
        false
    }
}

struct FileSource<'a> {
    file: &'a mut FileLexer,
}

impl PpSource for FileSource<'_> {
    fn advance(&mut self, env: &mut ExpandEnv) -> Token {
        self.file.advance(env.interner, env.ctx)
    }

    fn peek(&mut self, _env: &mut ExpandEnv) -> Token {
        self.file.peek.clone()
    }
}

struct ListSource {
    items: VecDeque<Token>,
    end_loc: SourceLocation,
}

impl ListSource {
    fn new(items: Vec<Token>, end_loc: SourceLocation) -> Self {
        Self { items: items.into(), end_loc }
    }
}

impl PpSource for ListSource {
    fn advance(&mut self, _env: &mut ExpandEnv) -> Token {
        self.items.pop_front().unwrap_or_else(|| Token::eof(self.end_loc))
    }

    fn peek(&mut self, _env: &mut ExpandEnv) -> Token {
        self.items.front().cloned().unwrap_or_else(|| Token::eof(self.end_loc))
    }
}

// a replacement list chained in front of the stream it was found in; the
// macro's blue paint is restored the moment the list drains
struct JointSource<'a> {
    list: VecDeque<Token>,
    node: NodeId,
    second: &'a mut dyn PpSource,
}

impl PpSource for JointSource<'_> {
    fn advance(&mut self, env: &mut ExpandEnv) -> Token {
        match self.list.pop_front() {
            Some(tok) => tok,
            None => {
                env.interner.node_mut(self.node).expansion_enabled = true;
                self.second.advance(env)
            }
        }
    }

    fn peek(&mut self, env: &mut ExpandEnv) -> Token {
        match self.list.front() {
            Some(tok) => tok.clone(),
            None => self.second.peek(env),
        }
    }

    fn exhausted(&self) -> bool {
        self.list.is_empty()
    }
}

// outcome of attempting to expand one token
enum Expansion {
    /// not a macro use; the token stands as-is
    NotMacro,
    /// the macro expanded to no tokens at all
    Null,
    /// the token was replaced in place; the rest of the expansion follows
    Tokens(Vec<Token>),
}

// fully expand tokens pulled from `source` until it reports exhaustion (or
// end of input), producing the flattened result
fn expand_token_list(env: &mut ExpandEnv, source: &mut dyn PpSource) -> Vec<Token> {
    let mut out = Vec::new();
    loop {
        let mut tok = source.advance(env);
        if tok.is_eof() {
            break;
        }
        match expand_single(env, &mut tok, source) {
            Expansion::Null => {
                if source.exhausted() {
                    break;
                }
                continue;
            }
            Expansion::NotMacro => out.push(tok),
            Expansion::Tokens(tail) => {
                out.push(tok);
                out.extend(tail);
            }
        }
        if source.exhausted() {
            break;
        }
    }
    out
}

fn expand_object(
    env: &mut ExpandEnv,
    tok: &mut Token,
    node: NodeId,
    items: Vec<Token>,
    source: &mut dyn PpSource,
) -> Expansion {
    if items.is_empty() {
        return Expansion::Null;
    }

    env.interner.node_mut(node).expansion_enabled = false;
    let mut joint = JointSource { list: items.into(), node, second: source };
    let result = expand_token_list(env, &mut joint);
    env.interner.node_mut(node).expansion_enabled = true;

    finish_expansion(tok, result)
}

fn expand_function(
    env: &mut ExpandEnv,
    tok: &mut Token,
    node: NodeId,
    macro_def: FnMacro,
    source: &mut dyn PpSource,
) -> Expansion {
    if source.peek(env).kind != TokenKind::LeftParen {
        // a function macro name without an argument list is left alone
        return Expansion::NotMacro;
    }
    source.advance(env);

    // gather raw arguments: token lists split on top-level commas, with
    // nested parentheses balanced
    let mut raw_args: Vec<Vec<Token>> = Vec::new();
    let terminator = loop {
        let mut arg = Vec::new();
        let mut depth = 0usize;
        let terminator = loop {
            let next = source.advance(env);
            match next.kind {
                TokenKind::Comma if depth == 0 => break TokenKind::Comma,
                TokenKind::RightParen if depth == 0 => break TokenKind::RightParen,
                TokenKind::Eof => break TokenKind::Eof,
                TokenKind::LeftParen => {
                    depth += 1;
                    arg.push(next);
                }
                TokenKind::RightParen => {
                    depth -= 1;
                    arg.push(next);
                }
                _ => arg.push(next),
            }
        };
        if let Some(first) = arg.first_mut() {
            first.indent = 0;
        }
        raw_args.push(arg);
        if terminator != TokenKind::Comma {
            break terminator;
        }
    };

    if terminator != TokenKind::RightParen {
        env.ctx
            .diags
            .error("Unterminated function macro call", tok.loc);
        return Expansion::Null;
    }

    // each argument is fully expanded before substitution
    let expanded: Vec<Vec<Token>> = raw_args
        .into_iter()
        .map(|arg| {
            let mut list = ListSource::new(arg, tok.loc);
            expand_token_list(env, &mut list)
        })
        .collect();

    // a variadic macro binds the excess arguments, comma-joined, to the
    // parameter slot one past the named parameters
    let named = macro_def.params.len();
    let args: Vec<Vec<Token>> = if macro_def.variadic {
        let mut args: Vec<Vec<Token>> =
            expanded.iter().take(named).cloned().collect();
        let mut variadic_arg = Vec::new();
        for (i, extra) in expanded.iter().skip(named).enumerate() {
            if i > 0 {
                variadic_arg.push(Token::new(TokenKind::Comma, tok.loc));
            }
            variadic_arg.extend(extra.iter().cloned());
        }
        args.push(variadic_arg);
        args
    } else {
        expanded
    };

    // substitute the arguments into the replacement list
    let mut substituted = Vec::new();
    for rep in &macro_def.replacement {
        if let TokenKind::MacroArg(index) = rep.kind {
            match args.get(index) {
                Some(arg) => {
                    for (i, t) in arg.iter().enumerate() {
                        let mut t = t.clone();
                        if i == 0 {
                            t.inherit_spacing(rep);
                        }
                        substituted.push(t);
                    }
                }
                None => {
                    env.ctx.diags.warning(
                        "no argument for macro parameter, substituting nothing",
                        tok.loc,
                    );
                }
            }
        } else {
            substituted.push(rep.clone());
        }
    }

    if substituted.is_empty() {
        return Expansion::Null;
    }

    // rescan the substituted list jointly with the following stream
    env.interner.node_mut(node).expansion_enabled = false;
    let mut joint = JointSource { list: substituted.into(), node, second: source };
    let result = expand_token_list(env, &mut joint);
    env.interner.node_mut(node).expansion_enabled = true;

    finish_expansion(tok, result)
}

// install the expansion result: the first token replaces the macro name and
// inherits its spacing, the rest become the pending tail
fn finish_expansion(tok: &mut Token, result: Vec<Token>) -> Expansion {
    let mut iter = result.into_iter();
    match iter.next() {
        None => Expansion::Null,
        Some(mut first) => {
            first.inherit_spacing(tok);
            *tok = first;
            Expansion::Tokens(iter.collect())
        }
    }
}

// expand one already-consumed token, pulling any function-macro arguments
// and rescan input from `source`
fn expand_single(
    env: &mut ExpandEnv,
    tok: &mut Token,
    source: &mut dyn PpSource,
) -> Expansion {
    let TokenKind::Identifier(node) = &tok.kind else {
        return Expansion::NotMacro;
    };
    let node = *node;
    if !env.interner.node(node).expansion_enabled {
        return Expansion::NotMacro;
    }

    match env.interner.node(node).macro_def.clone() {
        MacroDef::None => Expansion::NotMacro,
        MacroDef::Object(items) => expand_object(env, tok, node, items, source),
        MacroDef::Function(macro_def) => {
            expand_function(env, tok, node, macro_def, source)
        }
        MacroDef::Integer(value) => {
            tok.kind = TokenKind::Integer(value);
            Expansion::Tokens(Vec::new())
        }
        MacroDef::Text(text) => {
            tok.kind = TokenKind::StringLit { text, encoding: StringEncoding::None };
            Expansion::Tokens(Vec::new())
        }
        MacroDef::Line => {
            // the base-layer previous token location, so the value reflects
            // the use site rather than any expansion internals
            tok.kind = TokenKind::Integer(env.prev_loc.line as i64);
            Expansion::Tokens(Vec::new())
        }
        MacroDef::File => {
            let name = env.ctx.files.name(env.prev_loc.file).to_owned();
            tok.kind = TokenKind::StringLit { text: name, encoding: StringEncoding::None };
            Expansion::Tokens(Vec::new())
        }
    }
}

/// The preprocessor: the consumer-facing end of the lexical pipeline
#[derive(Debug)]
pub struct Preprocessor {
    interner: Interner,
    files: Vec<FileLexer>,
    search: SearchPaths,
    pending: VecDeque<Token>,
    prev_loc: SourceLocation,
}

enum DirectiveOutcome {
    Handled,
    /// unknown directive: the `#` token is passed through
    Passthrough,
}

impl Preprocessor {
    pub fn new(
        name: &str,
        bytes: Vec<u8>,
        search: SearchPaths,
        ctx: &mut Context,
    ) -> Self {
        let mut interner = Interner::new();
        define_predefined_macros(&mut interner);
        let main = FileLexer::new(name, bytes, &mut interner, ctx);
        let prev_loc = SourceLocation::start(main.file_id());
        Self {
            interner,
            files: vec![main],
            search,
            pending: VecDeque::new(),
            prev_loc,
        }
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    fn advance_top(&mut self, ctx: &mut Context) -> Token {
        let file = self.files.last_mut().expect("file stack never empty");
        file.advance(&mut self.interner, ctx)
    }

    fn peek_top(&self) -> &Token {
        &self.files.last().expect("file stack never empty").peek
    }

    fn skip_line(&mut self, ctx: &mut Context) {
        while !self.peek_top().is_eof() && !self.peek_top().start_of_line {
            self.advance_top(ctx);
        }
    }

    /// Produce the next fully macro-expanded, directive-free token
    pub fn next_token(&mut self, ctx: &mut Context) -> Token {
        if let Some(tok) = self.pending.pop_front() {
            return tok;
        }

        loop {
            let tok = self.advance_top(ctx);

            if tok.is_eof() {
                if self.files.len() > 1 {
                    self.files.pop();
                    continue;
                }
                return tok;
            }

            if matches!(tok.kind, TokenKind::Hash | TokenKind::PercentColon)
                && tok.start_of_line
            {
                match self.directive(ctx) {
                    DirectiveOutcome::Handled => continue,
                    DirectiveOutcome::Passthrough => {
                        self.prev_loc = tok.loc;
                        return tok;
                    }
                }
            }

            let mut tok = tok;
            match self.enter_macro(ctx, &mut tok) {
                Expansion::Null => continue,
                Expansion::NotMacro | Expansion::Tokens(_) => {}
            }

            if let TokenKind::Identifier(id) = &tok.kind {
                if self.interner.name(*id) == "__VA_ARGS__" {
                    ctx.diags.warning(
                        "Unexpected identifier __VA_ARGS__ outside of variadic function macro",
                        tok.loc,
                    );
                }
            }

            self.prev_loc = tok.loc;
            return tok;
        }
    }

    // expand a token at the base layer; the tail of the expansion is
    // buffered and drained by subsequent `next_token` calls
    fn enter_macro(&mut self, ctx: &mut Context, tok: &mut Token) -> Expansion {
        let Self { interner, files, pending, prev_loc, .. } = self;
        let mut env = ExpandEnv { interner, ctx, prev_loc: *prev_loc };
        let mut source = FileSource { file: files.last_mut().expect("file stack never empty") };
        let result = expand_single(&mut env, tok, &mut source);
        if let Expansion::Tokens(tail) = &result {
            pending.extend(tail.iter().cloned());
        }
        result
    }

    // the `#` has been consumed; decide and run the directive
    fn directive(&mut self, ctx: &mut Context) -> DirectiveOutcome {
        let peek = self.peek_top();

        if peek.start_of_line || peek.is_eof() {
            // null directive
            return DirectiveOutcome::Handled;
        }

        let TokenKind::Identifier(id) = &peek.kind else {
            let loc = peek.loc;
            ctx.diags.error("Unexpected token at start of directive", loc);
            self.skip_line(ctx);
            return DirectiveOutcome::Handled;
        };

        let directive_name = self.interner.name(*id).to_owned();
        match directive_name.as_str() {
            "include" => self.parse_include(ctx, false),
            "include_next" => self.parse_include(ctx, true),
            "define" => {
                self.parse_define(ctx);
                DirectiveOutcome::Handled
            }
            "undef" => {
                self.parse_undef(ctx);
                DirectiveOutcome::Handled
            }
            // pragmatically pass unknown directives through
            _ => DirectiveOutcome::Passthrough,
        }
    }

    fn parse_include(&mut self, ctx: &mut Context, is_next: bool) -> DirectiveOutcome {
        // the `#include` argument lexes as a header name
        self.files.last_mut().expect("file stack never empty").phase3.mode =
            LexMode::MaybeHeader;
        self.advance_top(ctx); // consume `include` / `include_next`
        self.files.last_mut().expect("file stack never empty").phase3.mode =
            LexMode::NoHeader;

        let header = self.peek_top().clone();
        let (name, is_user) = match &header.kind {
            TokenKind::HeaderName(name) => (name.clone(), true),
            TokenKind::SysHeaderName(name) => (name.clone(), false),
            _ => {
                ctx.diags.error("macro #include is not implemented", header.loc);
                self.skip_line(ctx);
                return DirectiveOutcome::Handled;
            }
        };
        self.advance_top(ctx); // consume the header name

        let resolved = {
            // `#include_next` resumes the search that found this file, which
            // lives on the entry below the top of the stack
            let state = if is_next {
                if self.files.len() >= 2 {
                    let index = self.files.len() - 2;
                    &mut self.files[index].search_state
                } else {
                    ctx.diags.warning("#include_next at top level", header.loc);
                    let top = self.files.last_mut().expect("file stack never empty");
                    top.search_state = IncludeSearchState::default();
                    &mut top.search_state
                }
            } else {
                let top = self.files.last_mut().expect("file stack never empty");
                top.search_state = IncludeSearchState::default();
                &mut top.search_state
            };

            if is_user {
                self.search.find_user(state, &name)
            } else {
                self.search.find_system(state, &name)
            }
        };

        let Some(path) = resolved else {
            ctx.diags.error(format!("Cannot resolve include '{name}'"), header.loc);
            self.skip_line(ctx);
            return DirectiveOutcome::Handled;
        };

        if !self.peek_top().start_of_line && !self.peek_top().is_eof() {
            ctx.diags
                .error("Unexpected token after include location", self.peek_top().loc);
            self.skip_line(ctx);
        }

        if self.files.len() > MAX_INCLUDE_DEPTH {
            ctx.diags.error("include depth limit reached", header.loc);
            return DirectiveOutcome::Handled;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                ctx.diags.error(
                    format!("Cannot read include '{}': {err}", path.display()),
                    header.loc,
                );
                return DirectiveOutcome::Handled;
            }
        };

        log::debug!("entering include {} at depth {}", path.display(), self.files.len());
        let file = FileLexer::new(
            &path.display().to_string(),
            bytes,
            &mut self.interner,
            ctx,
        );
        self.files.push(file);
        DirectiveOutcome::Handled
    }

    fn parse_define(&mut self, ctx: &mut Context) {
        self.advance_top(ctx); // consume `define`
        let name = self.advance_top(ctx);

        let TokenKind::Identifier(node) = &name.kind else {
            ctx.diags.error("Unexpected token inside #define", name.loc);
            self.skip_line(ctx);
            return;
        };
        let node = *node;

        if self.interner.node(node).macro_def.is_macro() {
            // TODO: report redefinitions once #if guards exist; without them
            // every system header triggers a storm of these
            self.skip_line(ctx);
            return;
        }

        // `name(` with no whitespace introduces a function-like macro
        let function_like = self.peek_top().kind == TokenKind::LeftParen
            && !self.peek_top().whitespace_before;

        let mut params: Vec<NodeId> = Vec::new();
        let mut variadic = false;

        if function_like {
            self.advance_top(ctx); // consume `(`

            if self.peek_top().kind != TokenKind::RightParen {
                loop {
                    if self.peek_top().start_of_line {
                        ctx.diags.error(
                            "unexpected token at end of macro argument list",
                            self.peek_top().loc,
                        );
                        return;
                    }
                    let param = self.advance_top(ctx);
                    match param.kind {
                        TokenKind::Ellipsis => {
                            variadic = true;
                            break;
                        }
                        TokenKind::Identifier(id) => {
                            params.push(id);
                            if self.peek_top().kind == TokenKind::Comma {
                                self.advance_top(ctx);
                                continue;
                            }
                            break;
                        }
                        _ => {
                            ctx.diags.error(
                                "unexpected token at end of macro argument list",
                                param.loc,
                            );
                            self.skip_line(ctx);
                            return;
                        }
                    }
                }
            }

            let close = self.advance_top(ctx);
            if close.kind != TokenKind::RightParen {
                ctx.diags
                    .error("unexpected token at end of macro argument list", close.loc);
                self.skip_line(ctx);
                return;
            }
        } else if !self.peek_top().whitespace_before && !self.peek_top().start_of_line {
            ctx.diags.error(
                "ISO C requires whitespace after macro name",
                self.peek_top().loc,
            );
        }

        let mut replacement: Vec<Token> = Vec::new();
        while !self.peek_top().start_of_line && !self.peek_top().is_eof() {
            let mut tok = self.advance_top(ctx);
            if replacement.is_empty() {
                tok.indent = 0;
            }

            let ident = match &tok.kind {
                TokenKind::Identifier(id) => Some(*id),
                _ => None,
            };
            if let Some(id) = ident {
                // parameter references become placeholders by index
                if let Some(index) = params.iter().position(|&p| p == id) {
                    tok.kind = TokenKind::MacroArg(index);
                } else if self.interner.name(id) == "__VA_ARGS__" {
                    if function_like && variadic {
                        tok.kind = TokenKind::MacroArg(params.len());
                    } else {
                        ctx.diags.error(
                            "__VA_ARGS__ is invalid unless in a variadic function macro",
                            tok.loc,
                        );
                    }
                }
            }

            replacement.push(tok);
        }

        let def = if function_like {
            MacroDef::Function(FnMacro { params, variadic, replacement })
        } else {
            MacroDef::Object(replacement)
        };
        self.interner.node_mut(node).macro_def = def;
    }

    fn parse_undef(&mut self, ctx: &mut Context) {
        self.advance_top(ctx); // consume `undef`
        let name = self.advance_top(ctx);

        let TokenKind::Identifier(node) = &name.kind else {
            ctx.diags.error("Unexpected token inside #undef", name.loc);
            self.skip_line(ctx);
            return;
        };

        self.interner.node_mut(*node).macro_def = MacroDef::None;
    }
}

fn define_predefined_macros(interner: &mut Interner) {
    let now = chrono::Local::now();
    let mut set = |name: &str, def: MacroDef| {
        let id = interner.intern(name);
        interner.node_mut(id).macro_def = def;
    };

    set("__TIME__", MacroDef::Text(now.format("%H:%M:%S").to_string()));
    set("__DATE__", MacroDef::Text(now.format("%b %d %Y").to_string()));
    set("__FILE__", MacroDef::File);
    set("__LINE__", MacroDef::Line);

    let integers: &[(&str, i64)] = &[
        ("__STDC__", 1),
        ("__STDC_HOSTED__", 1),
        ("__STDC_VERSION__", 201112),
        ("__STDC_UTF_16__", 1),
        ("__STDC_UTF_32__", 1),
        ("__STDC_NO_ATOMICS__", 1),
        ("__STDC_NO_COMPLEX__", 1),
        ("__STDC_NO_THREADS__", 1),
        ("__STDC_NO_VLA__", 1),
        ("__STDC_LIB_EXT1__", 201112),
        ("__x86_64__", 1),
        ("__x86_64", 1),
        ("WIN32", 1),
        ("_WIN32", 1),
        ("__WIN32__", 1),
        ("WIN64", 1),
        ("_WIN64", 1),
        ("__WIN64__", 1),
    ];
    for &(name, value) in integers {
        set(name, MacroDef::Integer(value));
    }
}
