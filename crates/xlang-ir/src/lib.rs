//! Intermediate Representation (IR) for the X compiler
//!
//! This crate defines a small typed IR that sits between the AST and native
//! code generation, together with the lowering that produces it. The IR is a
//! control flow graph of basic blocks with explicit stack/global storage:
//! every variable lives in a slot, reads are loads and writes are stores.
//!
//! It also carries a reference interpreter (`interp`) that executes a module
//! directly, which is what the tests use to observe runtime behavior.

pub mod lower;
pub mod interp;
pub mod types;
pub mod value;
pub mod instruction;
pub mod function;
pub mod module;

// ============================================================================
// ID Types (using newtype pattern for type safety)
// ============================================================================

/// Unique identifier for a basic block within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Unique identifier for a stack slot within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub usize);

/// Unique identifier for a temporary value within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub usize);

/// Unique identifier for a function within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub usize);

/// Unique identifier for a global variable within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub usize);

// ============================================================================
// Display Implementations for ID types
// ============================================================================

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "_local{}", self.0)
    }
}

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "_temp{}", self.0)
    }
}

impl std::fmt::Display for FuncId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "func{}", self.0)
    }
}

impl std::fmt::Display for GlobalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "global{}", self.0)
    }
}

// ============================================================================
// Re-exports (public API)
// ============================================================================

pub use types::*;
pub use value::*;
pub use instruction::*;
pub use function::*;
pub use module::*;
pub use lower::{
    lower_program, LowerError, LowerErrorKind, LowerOptions, Lowerer, RedeclarationPolicy,
};

// ============================================================================
// Tests
// ============================================================================
