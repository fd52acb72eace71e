//! IR function definitions.

use std::collections::HashSet;
use std::fmt;

use xlang_ast::Span;

use crate::{Block, BlockId, FuncId, Instruction, IrType, LocalId, TempId};

/// An IR function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    /// Function identifier
    pub id: FuncId,
    /// Symbol name (unique within the module)
    pub name: String,
    /// Parameters with their source names and types
    pub params: Vec<(String, IrType)>,
    /// Return type
    pub return_type: IrType,
    /// Stack slots with their stored types
    pub locals: Vec<(LocalId, IrType)>,
    /// Temporary values with their types
    pub temps: Vec<(TempId, IrType)>,
    /// Basic blocks comprising the function body
    pub blocks: Vec<Block>,
    /// Entry block (first block to execute)
    pub entry_block: BlockId,
    /// Optional source span for debugging
    pub span: Option<Span>,
}

impl IrFunction {
    /// Creates a new function with the given name and signature.
    pub fn new(id: FuncId, name: String, params: Vec<(String, IrType)>, return_type: IrType) -> Self {
        IrFunction {
            id,
            name,
            params,
            return_type,
            locals: Vec::new(),
            temps: Vec::new(),
            blocks: Vec::new(),
            entry_block: BlockId(0),
            span: None,
        }
    }

    /// Adds a new stack slot.
    pub fn add_local(&mut self, ty: IrType) -> LocalId {
        let id = LocalId(self.locals.len());
        self.locals.push((id, ty));
        id
    }

    /// Adds a new temporary value.
    pub fn add_temp(&mut self, ty: IrType) -> TempId {
        let id = TempId(self.temps.len());
        self.temps.push((id, ty));
        id
    }

    /// Creates a new basic block.
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block::new(id));
        id
    }

    /// Gets a mutable reference to a block.
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    /// Gets an immutable reference to a block.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn local_type(&self, id: LocalId) -> Option<&IrType> {
        self.locals.get(id.0).map(|(_, ty)| ty)
    }

    pub fn temp_type(&self, id: TempId) -> Option<&IrType> {
        self.temps.get(id.0).map(|(_, ty)| ty)
    }

    /// Blocks reachable from the entry block by following terminators.
    pub fn reachable_blocks(&self) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        if self.blocks.is_empty() {
            return seen;
        }

        let mut worklist = vec![self.entry_block];
        while let Some(id) = worklist.pop() {
            if id.0 >= self.blocks.len() || !seen.insert(id) {
                continue;
            }
            worklist.extend(self.block(id).successors());
        }
        seen
    }

    /// Iterates over every instruction in block order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|block| block.instructions.iter())
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.id, self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "%arg{} {}: {}", i, name, ty)?;
        }
        writeln!(f, ") -> {} {{", self.return_type)?;
        for (id, ty) in &self.locals {
            writeln!(f, "    {}: {}", id, ty)?;
        }
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}
