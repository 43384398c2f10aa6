//! Identifier interning and macro definitions
//!
//! Every identifier in a translation unit resolves to a single hash node,
//! keyed by (hash, length, bytes). The node carries the canonical spelling,
//! the macro definition bound to the name (if any) and the blue-paint flag
//! that prevents a macro from re-expanding inside its own expansion.

use crate::token::Token;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Index of an interned identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// FNV-1a, as used for both the interning table and symbol lookup
pub fn string_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// A function-like macro definition
#[derive(Debug, Clone, PartialEq)]
pub struct FnMacro {
    /// Interned names of the named parameters, in order
    pub params: Vec<NodeId>,
    pub variadic: bool,
    /// Replacement list with parameter references rewritten to
    /// `TokenKind::MacroArg`; for a variadic macro, index `params.len()`
    /// is `__VA_ARGS__`
    pub replacement: Vec<Token>,
}

/// What an identifier is bound to as a macro
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MacroDef {
    /// Not a macro
    #[default]
    None,
    Object(Vec<Token>),
    Function(FnMacro),
    /// Predefined integer macro (`__STDC__` and friends)
    Integer(i64),
    /// Predefined string macro (`__DATE__`, `__TIME__`)
    Text(String),
    /// `__FILE__`
    File,
    /// `__LINE__`
    Line,
}

impl MacroDef {
    pub fn is_macro(&self) -> bool {
        !matches!(self, MacroDef::None)
    }
}

/// An interned identifier
#[derive(Debug, Clone)]
pub struct HashNode {
    pub name: String,
    pub hash: u32,
    pub macro_def: MacroDef,
    /// Blue paint: cleared while the macro's own expansion is rescanned
    pub expansion_enabled: bool,
}

/// The per-translation-unit identifier table
#[derive(Debug, Default)]
pub struct Interner {
    nodes: Vec<HashNode>,
    map: HashMap<String, NodeId>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.map.get(name) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(HashNode {
            name: name.to_owned(),
            hash: string_hash(name.as_bytes()),
            macro_def: MacroDef::None,
            expansion_enabled: true,
        });
        self.map.insert(name.to_owned(), id);
        id
    }

    pub fn node(&self, id: NodeId) -> &HashNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut HashNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        let c = interner.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.name(a), "foo");
    }

    #[test]
    fn test_nodes_start_unbound() {
        let mut interner = Interner::new();
        let id = interner.intern("X");
        assert!(!interner.node(id).macro_def.is_macro());
        assert!(interner.node(id).expansion_enabled);
    }

    #[test]
    fn test_fnv1a_reference_values() {
        // reference value for the empty input is the FNV offset basis
        assert_eq!(string_hash(b""), 2166136261);
        assert_eq!(string_hash(b"a"), string_hash(b"a"));
        assert_ne!(string_hash(b"ab"), string_hash(b"ba"));
    }
}
