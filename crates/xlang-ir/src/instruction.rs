//! IR instructions and control flow primitives.

use std::fmt;

use xlang_ast::Span;

use crate::{BlockId, FuncId, RValue, TempId, Value};

/// A single IR instruction within a basic block.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Assignment: dest = value
    Assign {
        dest: TempId,
        value: RValue,
    },

    /// Load value from pointer
    Load {
        dest: TempId,
        ptr: Value,
    },

    /// Store value to pointer
    Store {
        ptr: Value,
        value: Value,
    },

    /// Direct call: dest = func(args); `dest` is `None` for void callees
    Call {
        dest: Option<TempId>,
        func: FuncId,
        args: Vec<Value>,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { dest, value } => write!(f, "{} = {}", dest, value),
            Instruction::Load { dest, ptr } => write!(f, "{} = load {}", dest, ptr),
            Instruction::Store { ptr, value } => write!(f, "store {}, {}", ptr, value),
            Instruction::Call { dest, func, args } => {
                if let Some(dest) = dest {
                    write!(f, "{} = ", dest)?;
                }
                write!(f, "call {}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Terminator instruction that ends a basic block.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Return from function
    Return(Option<Value>),
    /// Conditional branch on a `bool` value
    Branch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Unconditional jump
    Jump(BlockId),
    /// Control never reaches this point
    Unreachable,
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Return(Some(value)) => write!(f, "ret {}", value),
            Terminator::Return(None) => write!(f, "ret void"),
            Terminator::Branch { cond, then_block, else_block } => {
                write!(f, "br {}, {}, {}", cond, then_block, else_block)
            }
            Terminator::Jump(target) => write!(f, "jmp {}", target),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A basic block in the control flow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Unique identifier for this block
    pub id: BlockId,
    /// Instructions in this block (excluding terminator)
    pub instructions: Vec<Instruction>,
    /// Terminator instruction; `None` while the block is still being built
    pub terminator: Option<Terminator>,
    /// Optional source span for debugging
    pub span: Option<Span>,
}

impl Block {
    /// Creates a new, unterminated basic block with the given ID.
    pub fn new(id: BlockId) -> Self {
        Block {
            id,
            instructions: Vec::new(),
            terminator: None,
            span: None,
        }
    }

    /// Adds an instruction to this block.
    pub fn push_instruction(&mut self, instruction: Instruction) {
        debug_assert!(self.terminator.is_none(), "instruction pushed into terminated block {}", self.id);
        self.instructions.push(instruction);
    }

    /// Sets the terminator for this block. A block is terminated exactly once.
    pub fn set_terminator(&mut self, terminator: Terminator) {
        debug_assert!(self.terminator.is_none(), "block {} terminated twice", self.id);
        self.terminator = Some(terminator);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Returns the successor block IDs (for CFG analysis).
    pub fn successors(&self) -> Vec<BlockId> {
        match &self.terminator {
            None | Some(Terminator::Return(_)) | Some(Terminator::Unreachable) => Vec::new(),
            Some(Terminator::Jump(block)) => vec![*block],
            Some(Terminator::Branch { then_block, else_block, .. }) => {
                vec![*then_block, *else_block]
            }
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.id)?;
        for instruction in &self.instructions {
            writeln!(f, "    {}", instruction)?;
        }
        match &self.terminator {
            Some(terminator) => writeln!(f, "    {}", terminator),
            None => writeln!(f, "    <unterminated>"),
        }
    }
}
