//! Lexically scoped symbol table
//!
//! Bindings live in a stack of scopes addressed by depth; lookup walks the
//! visible bindings innermost-first, comparing hash and length before
//! bytes. Symbols themselves are never destroyed; leaving a scope only
//! removes visibility, so AST and IR references stay valid.

use crate::ast::TypeRef;
use mica_lexer::string_hash;
use serde::Serialize;

/// Index of a symbol in the table's backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub hash: u32,
    pub scope_depth: u32,
    /// Variable type, filled in by declarator parsing
    pub ty: Option<TypeRef>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    visible: Vec<SymbolId>,
    current_depth: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> u32 {
        self.current_depth
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn set_type(&mut self, id: SymbolId, ty: TypeRef) {
        self.symbols[id.0 as usize].ty = Some(ty);
    }

    /// Add a binding in the current scope; `None` if the name is already
    /// bound at this exact depth
    pub fn add_local(&mut self, name: &str) -> Option<SymbolId> {
        if let Some(existing) = self.get_local(name) {
            if self.symbol(existing).scope_depth == self.current_depth {
                return None;
            }
        }

        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_owned(),
            hash: string_hash(name.as_bytes()),
            scope_depth: self.current_depth,
            ty: None,
        });
        self.visible.push(id);
        Some(id)
    }

    /// Innermost visible binding for `name`
    pub fn get_local(&self, name: &str) -> Option<SymbolId> {
        let hash = string_hash(name.as_bytes());
        self.visible
            .iter()
            .rev()
            .copied()
            .find(|&id| {
                let sym = self.symbol(id);
                sym.hash == hash
                    && sym.name.len() == name.len()
                    && sym.name == name
            })
    }

    pub fn enter(&mut self) {
        self.current_depth += 1;
    }

    /// Leave the current scope, returning the bindings that went out of view
    pub fn exit(&mut self) -> Vec<SymbolId> {
        let mut popped = Vec::new();
        self.current_depth -= 1;
        while let Some(&id) = self.visible.last() {
            if self.symbol(id).scope_depth <= self.current_depth {
                break;
            }
            popped.push(id);
            self.visible.pop();
        }
        popped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut table = SymbolTable::new();
        let outer = table.add_local("x").unwrap();
        table.enter();
        let inner = table.add_local("x").unwrap();
        assert_eq!(table.get_local("x"), Some(inner));
        let popped = table.exit();
        assert_eq!(popped, vec![inner]);
        assert_eq!(table.get_local("x"), Some(outer));
    }

    #[test]
    fn test_duplicate_in_same_scope_rejected() {
        let mut table = SymbolTable::new();
        assert!(table.add_local("x").is_some());
        assert!(table.add_local("x").is_none());
        table.enter();
        assert!(table.add_local("x").is_some());
    }

    #[test]
    fn test_exit_reports_pop_count() {
        let mut table = SymbolTable::new();
        table.enter();
        table.add_local("a");
        table.add_local("b");
        table.add_local("c");
        assert_eq!(table.exit().len(), 3);
    }
}
