//! IR module definition representing a compilation unit.
//!
//! The module is the sink that lowering populates; `to_text` is the
//! serialized form handed to tooling, and `verify` is a structural sanity
//! check. Full verification is left to the native backend.

use std::fmt;

use thiserror::Error;

use crate::{
    BlockId, Constant, FuncId, GlobalId, Instruction, IrFunction, IrType, RValue, Terminator, Value,
};

/// A global variable definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub id: GlobalId,
    /// Symbol name (unique within the module)
    pub name: String,
    pub ty: IrType,
    /// Constant initializer; `None` means zero-initialized
    pub init: Option<Constant>,
}

impl IrGlobal {
    pub fn new(id: GlobalId, name: String, ty: IrType, init: Option<Constant>) -> Self {
        Self { id, name, ty, init }
    }
}

/// Structural problem found by [`IrModule::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("in `{function}`: {message}")]
pub struct VerifyError {
    pub function: String,
    pub message: String,
}

/// A complete IR module representing a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct IrModule {
    /// All functions in this module, in definition order
    pub functions: Vec<IrFunction>,
    /// Global variables, in definition order
    pub globals: Vec<IrGlobal>,
}

impl IrModule {
    /// Creates a new empty IR module.
    pub fn new() -> Self {
        IrModule {
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// Adds a function to the module.
    pub fn add_function(&mut self, function: IrFunction) -> FuncId {
        let id = function.id;
        self.functions.push(function);
        id
    }

    /// Adds a global variable.
    pub fn add_global(&mut self, global: IrGlobal) -> GlobalId {
        let id = global.id;
        self.globals.push(global);
        id
    }

    /// Gets a function by ID.
    pub fn function(&self, id: FuncId) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.id == id)
    }

    /// Gets a global by ID.
    pub fn global(&self, id: GlobalId) -> Option<&IrGlobal> {
        self.globals.iter().find(|g| g.id == id)
    }

    /// Finds a function by name.
    pub fn find_function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Finds a global by name.
    pub fn find_global(&self, name: &str) -> Option<&IrGlobal> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Returns `name`, or `name.N` if a function or global already uses it.
    ///
    /// A redeclared top-level name replaces the binding but both definitions
    /// stay in the module, so their symbols must not collide.
    pub fn fresh_symbol_name(&self, name: &str) -> String {
        let taken = |candidate: &str| {
            self.functions.iter().any(|f| f.name == candidate)
                || self.globals.iter().any(|g| g.name == candidate)
        };

        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{}.{}", name, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    /// Serializes the module to its textual IR form.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Checks that every block is terminated and every reference resolves.
    pub fn verify(&self) -> Result<(), VerifyError> {
        for global in &self.globals {
            if let Some(Constant::GlobalAddr(target)) = &global.init {
                if self.global(*target).is_none() {
                    return Err(VerifyError {
                        function: global.name.clone(),
                        message: format!("initializer refers to unknown {}", target),
                    });
                }
            }
        }

        for func in &self.functions {
            let fail = |message: String| VerifyError {
                function: func.name.clone(),
                message,
            };
            let block_exists = |id: &BlockId| id.0 < func.blocks.len();

            if !block_exists(&func.entry_block) {
                return Err(fail(format!("entry block {} does not exist", func.entry_block)));
            }

            for block in &func.blocks {
                for instruction in &block.instructions {
                    if let Instruction::Call { func: callee, args, .. } = instruction {
                        let target = self
                            .function(*callee)
                            .ok_or_else(|| fail(format!("call to unknown {}", callee)))?;
                        if target.params.len() != args.len() {
                            return Err(fail(format!("call to `{}` has wrong argument count", target.name)));
                        }
                    }
                    self.verify_operands(func, instruction).map_err(fail)?;
                }

                match &block.terminator {
                    None => return Err(fail(format!("block {} is not terminated", block.id))),
                    Some(Terminator::Jump(target)) if !block_exists(target) => {
                        return Err(fail(format!("{} jumps to missing block {}", block.id, target)))
                    }
                    Some(Terminator::Branch { then_block, else_block, .. })
                        if !block_exists(then_block) || !block_exists(else_block) =>
                    {
                        return Err(fail(format!("{} branches to a missing block", block.id)))
                    }
                    Some(Terminator::Return(value)) => {
                        if value.is_some() == (func.return_type == IrType::Void) {
                            return Err(fail(format!("{} returns a value of the wrong shape", block.id)));
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    fn verify_operands(&self, func: &IrFunction, instruction: &Instruction) -> Result<(), String> {
        let check = |value: &Value| -> Result<(), String> {
            match value {
                Value::Temp(id) if func.temp_type(*id).is_none() => Err(format!("unknown {}", id)),
                Value::Local(id) if func.local_type(*id).is_none() => Err(format!("unknown {}", id)),
                Value::Global(id) if self.global(*id).is_none() => Err(format!("unknown {}", id)),
                Value::Param(index) if *index >= func.params.len() => Err(format!("unknown %arg{}", index)),
                _ => Ok(()),
            }
        };

        match instruction {
            Instruction::Assign { value, .. } => match value {
                RValue::Use(v) => check(v),
                RValue::BinaryOp { left, right, .. } => check(left).and_then(|_| check(right)),
                RValue::UnaryOp { operand, .. } => check(operand),
            },
            Instruction::Load { ptr, .. } => check(ptr),
            Instruction::Store { ptr, value } => check(ptr).and_then(|_| check(value)),
            Instruction::Call { args, .. } => args.iter().try_for_each(check),
        }
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in &self.globals {
            write!(f, "{} {}: {}", global.id, global.name, global.ty)?;
            match &global.init {
                Some(init) => writeln!(f, " = {}", init)?,
                None => writeln!(f, " = zeroinit")?,
            }
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
