//! SSA intermediate representation for the mica C compiler
//!
//! The IR is strictly statically typed: every virtual register has one
//! datatype, inferred from its defining instruction once the operand types
//! are known, so cast instructions are needed for conversions but types do
//! not have to be written at every use.
//!
//! Construction follows Braun et al., "Simple and Efficient Construction of
//! Static Single Assignment Form" (<https://c9x.me/compile/bib/braun13cc.pdf>):
//! φ nodes are inserted on demand when a variable is read, incomplete φs are
//! completed when their block is sealed, and trivial φs are removed as soon
//! as they are recognised.

pub mod ir;
pub mod lower;
pub mod printer;

pub use ir::*;
pub use lower::lower;
pub use printer::print_module;
