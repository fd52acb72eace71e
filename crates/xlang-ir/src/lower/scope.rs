//! Lexical scopes for name resolution during lowering.

use indexmap::IndexMap;

use super::LowerErrorKind;
use crate::{FuncId, FuncSignature, GlobalId, IrType, LocalId};

/// What a name refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Stack slot in the function being lowered
    Local { slot: LocalId, ty: IrType },
    /// Module-level variable
    Global { id: GlobalId, ty: IrType },
    /// Function definition
    Function { id: FuncId, signature: FuncSignature },
}

impl Binding {
    /// Kind of storage, for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Binding::Local { .. } => "local variable",
            Binding::Global { .. } => "global variable",
            Binding::Function { .. } => "function",
        }
    }
}

/// Stack of scope frames. Frame 0 is the global frame and is never popped.
#[derive(Debug)]
pub struct SymbolTable {
    frames: Vec<IndexMap<String, Binding>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            frames: vec![IndexMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Discards the innermost frame.
    ///
    /// # Panics
    /// Panics if only the global frame is left; that is a lowering bug.
    pub fn pop_frame(&mut self) {
        assert!(self.frames.len() > 1, "attempted to pop the global scope frame");
        self.frames.pop();
    }

    pub fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    /// Looks `name` up from the innermost frame outwards.
    pub fn resolve(&self, name: &str) -> Result<&Binding, LowerErrorKind> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .ok_or_else(|| LowerErrorKind::UndeclaredIdentifier {
                name: name.to_string(),
            })
    }

    /// Looks `name` up in the innermost frame only.
    pub fn lookup_innermost(&self, name: &str) -> Option<&Binding> {
        self.frames.last().and_then(|frame| frame.get(name))
    }

    /// Binds `name` in the innermost frame, returning the binding it replaced.
    pub fn bind(&mut self, name: &str, binding: Binding) -> Option<Binding> {
        self.frames
            .last_mut()
            .and_then(|frame| frame.insert(name.to_string(), binding))
    }

}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(slot: usize) -> Binding {
        Binding::Local {
            slot: LocalId(slot),
            ty: IrType::I32,
        }
    }

    #[test]
    fn test_inner_frame_shadows_outer() {
        let mut table = SymbolTable::new();
        table.bind("x", local(0));
        table.push_frame();
        table.bind("x", local(1));
        assert_eq!(table.resolve("x"), Ok(&local(1)));
        table.pop_frame();
        assert_eq!(table.resolve("x"), Ok(&local(0)));
    }

    #[test]
    fn test_rebinding_replaces_in_same_frame() {
        let mut table = SymbolTable::new();
        table.push_frame();
        assert_eq!(table.bind("x", local(0)), None);
        assert_eq!(table.bind("x", local(1)), Some(local(0)));
        assert_eq!(table.resolve("x"), Ok(&local(1)));
        assert_eq!(table.lookup_innermost("x"), Some(&local(1)));
    }

    #[test]
    fn test_popped_bindings_are_gone() {
        let mut table = SymbolTable::new();
        table.push_frame();
        table.bind("y", local(0));
        table.pop_frame();
        assert_eq!(
            table.resolve("y"),
            Err(LowerErrorKind::UndeclaredIdentifier { name: "y".to_string() })
        );
        assert!(table.is_global_scope());
    }

    #[test]
    #[should_panic(expected = "global scope frame")]
    fn test_cannot_pop_global_frame() {
        let mut table = SymbolTable::new();
        table.pop_frame();
    }
}
