//! Reference interpreter for IR modules
//!
//! Executes lowered IR directly, without a native backend. Storage follows
//! the IR's memory model: every local is a slot in its function's frame,
//! globals live for the whole run, and pointers are slot addresses. A pointer
//! into a frame that has returned is dangling.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::{
    BinOp, BlockId, Constant, FuncId, GlobalId, Instruction, IrFunction, IrModule, IrType, LocalId, RValue,
    TempId, Terminator, UnOp, Value,
};

/// Default number of instructions and terminators executed before giving up.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

/// Default maximum call depth.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Interpreter error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpError {
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{function}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in signed division")]
    IntegerOverflow,

    #[error("read of uninitialized {0}")]
    UninitializedRead(String),

    #[error("dereference of a null or dangling pointer")]
    DanglingPointer,

    #[error("reached unreachable code in `{0}`")]
    ReachedUnreachable(String),

    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),

    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
}

/// Where a pointer points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Zero-initialized pointer
    Null,
    /// Slot in the frame with the given serial number
    Local { frame: usize, slot: LocalId },
    Global(GlobalId),
}

/// Runtime value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeValue {
    Int(i32),
    Bool(bool),
    Ptr(Address),
}

impl RuntimeValue {
    fn zero_of(ty: &IrType) -> Self {
        match ty {
            IrType::Ptr(_) => RuntimeValue::Ptr(Address::Null),
            IrType::Bool => RuntimeValue::Bool(false),
            IrType::I32 | IrType::Void => RuntimeValue::Int(0),
        }
    }

    fn from_constant(constant: &Constant) -> Self {
        match constant {
            Constant::I32(v) => RuntimeValue::Int(*v),
            Constant::Bool(b) => RuntimeValue::Bool(*b),
            Constant::GlobalAddr(id) => RuntimeValue::Ptr(Address::Global(*id)),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            RuntimeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RuntimeValue::Int(_) => "int",
            RuntimeValue::Bool(_) => "bool",
            RuntimeValue::Ptr(_) => "pointer",
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Int(v) => write!(f, "{}", v),
            RuntimeValue::Bool(b) => write!(f, "{}", b),
            RuntimeValue::Ptr(Address::Null) => write!(f, "null"),
            RuntimeValue::Ptr(Address::Local { frame, slot }) => write!(f, "&frame{}.{}", frame, slot),
            RuntimeValue::Ptr(Address::Global(id)) => write!(f, "&{}", id),
        }
    }
}

struct Frame {
    serial: usize,
    args: Vec<RuntimeValue>,
    slots: Vec<Option<RuntimeValue>>,
    temps: Vec<Option<RuntimeValue>>,
}

/// Interpreter state
pub struct Interpreter<'m> {
    module: &'m IrModule,
    globals: HashMap<GlobalId, RuntimeValue>,
    frames: Vec<Frame>,
    next_serial: usize,
    steps: u64,
    step_limit: u64,
    max_depth: usize,
    entered: HashSet<(FuncId, BlockId)>,
}

impl<'m> Interpreter<'m> {
    /// Creates an interpreter with every global set to its initializer.
    pub fn new(module: &'m IrModule) -> Self {
        let globals = module
            .globals
            .iter()
            .map(|global| {
                let value = match &global.init {
                    Some(init) => RuntimeValue::from_constant(init),
                    None => RuntimeValue::zero_of(&global.ty),
                };
                (global.id, value)
            })
            .collect();

        Self {
            module,
            globals,
            frames: Vec::new(),
            next_serial: 0,
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            entered: HashSet::new(),
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether execution ever entered `block` of `func`.
    pub fn entered_block(&self, func: FuncId, block: BlockId) -> bool {
        self.entered.contains(&(func, block))
    }

    /// Current value of a global, by symbol name.
    pub fn global_value(&self, name: &str) -> Option<RuntimeValue> {
        let global = self.module.find_global(name)?;
        self.globals.get(&global.id).copied()
    }

    /// Calls the function named `name` with integer arguments.
    pub fn call(&mut self, name: &str, args: &[i32]) -> Result<Option<RuntimeValue>, InterpError> {
        let module = self.module;
        let func = module
            .find_function(name)
            .ok_or_else(|| InterpError::UnknownFunction(name.to_string()))?;
        let args = args.iter().map(|v| RuntimeValue::Int(*v)).collect();
        self.call_function(func, args)
    }

    /// Calls `func` with already-evaluated arguments.
    pub fn call_function(
        &mut self,
        func: &'m IrFunction,
        args: Vec<RuntimeValue>,
    ) -> Result<Option<RuntimeValue>, InterpError> {
        if args.len() != func.params.len() {
            return Err(InterpError::ArityMismatch {
                function: func.name.clone(),
                expected: func.params.len(),
                found: args.len(),
            });
        }
        if self.frames.len() >= self.max_depth {
            return Err(InterpError::CallDepthExceeded(self.max_depth));
        }

        trace!(function = %func.name, depth = self.frames.len(), "enter");
        self.frames.push(Frame {
            serial: self.next_serial,
            args,
            slots: vec![None; func.locals.len()],
            temps: vec![None; func.temps.len()],
        });
        self.next_serial += 1;

        let result = self.run(func);
        self.frames.pop();
        result
    }

    fn run(&mut self, func: &'m IrFunction) -> Result<Option<RuntimeValue>, InterpError> {
        let mut current = func.entry_block;

        loop {
            self.entered.insert((func.id, current));
            let block = func
                .blocks
                .get(current.0)
                .ok_or_else(|| InterpError::ReachedUnreachable(func.name.clone()))?;

            for instruction in &block.instructions {
                self.tick()?;
                self.execute_instruction(instruction)?;
            }

            self.tick()?;
            match &block.terminator {
                Some(Terminator::Return(value)) => {
                    return value.as_ref().map(|v| self.eval(v)).transpose();
                }
                Some(Terminator::Jump(target)) => current = *target,
                Some(Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                }) => {
                    current = match self.eval(cond)? {
                        RuntimeValue::Bool(true) => *then_block,
                        RuntimeValue::Bool(false) => *else_block,
                        other => {
                            return Err(InterpError::TypeMismatch {
                                expected: "bool".to_string(),
                                got: other.kind().to_string(),
                            })
                        }
                    };
                }
                Some(Terminator::Unreachable) | None => {
                    return Err(InterpError::ReachedUnreachable(func.name.clone()));
                }
            }
        }
    }

    fn tick(&mut self) -> Result<(), InterpError> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(InterpError::StepLimitExceeded(self.step_limit));
        }
        Ok(())
    }

    fn execute_instruction(&mut self, instruction: &Instruction) -> Result<(), InterpError> {
        match instruction {
            Instruction::Assign { dest, value } => {
                let result = self.eval_rvalue(value)?;
                self.set_temp(*dest, result);
            }
            Instruction::Load { dest, ptr } => {
                let address = self.eval_pointer(ptr)?;
                let value = self.read(address)?;
                self.set_temp(*dest, value);
            }
            Instruction::Store { ptr, value } => {
                let address = self.eval_pointer(ptr)?;
                let value = self.eval(value)?;
                self.write(address, value)?;
            }
            Instruction::Call { dest, func, args } => {
                let module = self.module;
                let callee = module
                    .function(*func)
                    .ok_or_else(|| InterpError::UnknownFunction(func.to_string()))?;
                let args = args.iter().map(|arg| self.eval(arg)).collect::<Result<Vec<_>, _>>()?;
                let result = self.call_function(callee, args)?;
                if let Some(dest) = dest {
                    let value = result.ok_or_else(|| InterpError::TypeMismatch {
                        expected: "a return value".to_string(),
                        got: "void".to_string(),
                    })?;
                    self.set_temp(*dest, value);
                }
            }
        }
        Ok(())
    }

    fn eval_rvalue(&mut self, rvalue: &RValue) -> Result<RuntimeValue, InterpError> {
        match rvalue {
            RValue::Use(value) => self.eval(value),
            RValue::UnaryOp { op: UnOp::Neg, operand } => {
                let v = self.eval_int(operand)?;
                Ok(RuntimeValue::Int(v.wrapping_neg()))
            }
            RValue::BinaryOp { op, left, right } => {
                let l = self.eval_int(left)?;
                let r = self.eval_int(right)?;
                let result = match op {
                    BinOp::Add => RuntimeValue::Int(l.wrapping_add(r)),
                    BinOp::Sub => RuntimeValue::Int(l.wrapping_sub(r)),
                    BinOp::Mul => RuntimeValue::Int(l.wrapping_mul(r)),
                    BinOp::Div => {
                        if r == 0 {
                            return Err(InterpError::DivisionByZero);
                        }
                        RuntimeValue::Int(l.checked_div(r).ok_or(InterpError::IntegerOverflow)?)
                    }
                    BinOp::Eq => RuntimeValue::Bool(l == r),
                    BinOp::Ne => RuntimeValue::Bool(l != r),
                    BinOp::Lt => RuntimeValue::Bool(l < r),
                    BinOp::Le => RuntimeValue::Bool(l <= r),
                    BinOp::Gt => RuntimeValue::Bool(l > r),
                    BinOp::Ge => RuntimeValue::Bool(l >= r),
                };
                Ok(result)
            }
        }
    }

    fn eval(&self, value: &Value) -> Result<RuntimeValue, InterpError> {
        let frame = self.frames.last();
        match value {
            Value::Const(constant) => Ok(RuntimeValue::from_constant(constant)),
            Value::Global(id) => Ok(RuntimeValue::Ptr(Address::Global(*id))),
            Value::Local(slot) => {
                let frame = frame.ok_or(InterpError::DanglingPointer)?;
                Ok(RuntimeValue::Ptr(Address::Local {
                    frame: frame.serial,
                    slot: *slot,
                }))
            }
            Value::Temp(id) => frame
                .and_then(|f| f.temps.get(id.0).copied().flatten())
                .ok_or_else(|| InterpError::UninitializedRead(id.to_string())),
            Value::Param(index) => frame
                .and_then(|f| f.args.get(*index).copied())
                .ok_or_else(|| InterpError::UninitializedRead(format!("%arg{}", index))),
        }
    }

    fn eval_int(&self, value: &Value) -> Result<i32, InterpError> {
        match self.eval(value)? {
            RuntimeValue::Int(v) => Ok(v),
            other => Err(InterpError::TypeMismatch {
                expected: "int".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }

    fn eval_pointer(&self, value: &Value) -> Result<Address, InterpError> {
        match self.eval(value)? {
            RuntimeValue::Ptr(address) => Ok(address),
            other => Err(InterpError::TypeMismatch {
                expected: "pointer".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }

    fn set_temp(&mut self, id: TempId, value: RuntimeValue) {
        if let Some(slot) = self.frames.last_mut().and_then(|f| f.temps.get_mut(id.0)) {
            *slot = Some(value);
        }
    }

    fn frame_slot(&mut self, serial: usize, slot: LocalId) -> Result<&mut Option<RuntimeValue>, InterpError> {
        self.frames
            .iter_mut()
            .rev()
            .find(|frame| frame.serial == serial)
            .and_then(|frame| frame.slots.get_mut(slot.0))
            .ok_or(InterpError::DanglingPointer)
    }

    fn read(&mut self, address: Address) -> Result<RuntimeValue, InterpError> {
        match address {
            Address::Null => Err(InterpError::DanglingPointer),
            Address::Global(id) => self.globals.get(&id).copied().ok_or(InterpError::DanglingPointer),
            Address::Local { frame, slot } => {
                let value = *self.frame_slot(frame, slot)?;
                value.ok_or_else(|| InterpError::UninitializedRead(slot.to_string()))
            }
        }
    }

    fn write(&mut self, address: Address, value: RuntimeValue) -> Result<(), InterpError> {
        match address {
            Address::Null => Err(InterpError::DanglingPointer),
            Address::Global(id) => match self.globals.get_mut(&id) {
                Some(cell) => {
                    *cell = value;
                    Ok(())
                }
                None => Err(InterpError::DanglingPointer),
            },
            Address::Local { frame, slot } => {
                *self.frame_slot(frame, slot)? = Some(value);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> IrModule {
        let program = xlang_parser::parse_source(source).expect("test source should parse");
        crate::lower_program(&program).expect("test source should lower")
    }

    fn run(source: &str, entry: &str, args: &[i32]) -> Result<Option<RuntimeValue>, InterpError> {
        let module = compile(source);
        Interpreter::new(&module).call(entry, args)
    }

    #[test]
    fn test_arithmetic_and_locals() {
        let result = run("f(a: Int, b: Int) -> Int { c: Int = a * b; return c - a / b }", "f", &[7, 2]);
        assert_eq!(result, Ok(Some(RuntimeValue::Int(11))));
    }

    #[test]
    fn test_pointer_sees_later_stores() {
        let source = r#"
            g: Int = 1
            main() -> Int { x: Int = 5; p: *Int = &x; x = 7; return *p + g }
        "#;
        assert_eq!(run(source, "main", &[]), Ok(Some(RuntimeValue::Int(8))));
    }

    #[test]
    fn test_global_state_persists() {
        let source = r#"
            counter: Int
            bump() { counter = counter + 1 }
            main() -> Int { bump() bump() bump() return counter }
        "#;
        let module = compile(source);
        let mut interp = Interpreter::new(&module);
        assert_eq!(interp.call("main", &[]), Ok(Some(RuntimeValue::Int(3))));
        assert_eq!(interp.global_value("counter"), Some(RuntimeValue::Int(3)));
    }

    #[test]
    fn test_division_errors() {
        let source = "div(a: Int, b: Int) -> Int { return a / b }";
        assert_eq!(run(source, "div", &[1, 0]), Err(InterpError::DivisionByZero));
        assert_eq!(run(source, "div", &[i32::MIN, -1]), Err(InterpError::IntegerOverflow));
        assert_eq!(run(source, "div", &[-7, 2]), Ok(Some(RuntimeValue::Int(-3))));
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let source = "f(a: Int) -> Int { return a + 1 }";
        assert_eq!(run(source, "f", &[i32::MAX]), Ok(Some(RuntimeValue::Int(i32::MIN))));
    }

    #[test]
    fn test_uninitialized_read() {
        let err = run("f() -> Int { x: Int; return x }", "f", &[]).unwrap_err();
        assert!(matches!(err, InterpError::UninitializedRead(_)));
    }

    #[test]
    fn test_dangling_pointer() {
        let source = r#"
            leak() -> *Int { x: Int = 1; return &x }
            main() -> Int { p: *Int = leak(); return *p }
        "#;
        assert_eq!(run(source, "main", &[]), Err(InterpError::DanglingPointer));
    }

    #[test]
    fn test_null_pointer() {
        let source = "p: *Int\nmain() -> Int { return *p }";
        assert_eq!(run(source, "main", &[]), Err(InterpError::DanglingPointer));
    }

    #[test]
    fn test_step_limit() {
        let module = compile("spin() { while 0 < 1 { } }");
        let err = Interpreter::new(&module).with_step_limit(1_000).call("spin", &[]).unwrap_err();
        assert_eq!(err, InterpError::StepLimitExceeded(1_000));
    }

    #[test]
    fn test_call_depth_limit() {
        let module = compile("down(n: Int) -> Int { return down(n + 1) }");
        let err = Interpreter::new(&module).with_max_depth(64).call("down", &[0]).unwrap_err();
        assert_eq!(err, InterpError::CallDepthExceeded(64));
    }

    #[test]
    fn test_entry_errors() {
        let module = compile("f(a: Int) { }");
        let mut interp = Interpreter::new(&module);
        assert_eq!(interp.call("g", &[]), Err(InterpError::UnknownFunction("g".to_string())));
        assert!(matches!(interp.call("f", &[]), Err(InterpError::ArityMismatch { expected: 1, found: 0, .. })));
        assert_eq!(interp.call("f", &[3]), Ok(None));
    }
}
