//! AST → IR Lowering
//!
//! Translates an X `Program` into an `IrModule` in a single top-to-bottom
//! walk. The first error aborts the walk and no module is produced.

mod error;
mod expr;
pub mod scope;
mod stmt;
pub mod types;

use tracing::{debug, trace};
use xlang_ast::*;

use crate::{
    BlockId, Constant, FuncId, FuncSignature, GlobalId, Instruction, IrFunction, IrGlobal, IrModule, IrType,
    LocalId, TempId, Terminator, Value,
};

pub use error::{LowerError, LowerErrorKind};
use scope::{Binding, SymbolTable};
use types::lower_type;

/// What happens when a name is declared twice in the same frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedeclarationPolicy {
    /// The new binding silently replaces the old one.
    #[default]
    Replace,
    /// Redeclaration fails with `DuplicateDeclaration`.
    Reject,
}

/// Knobs for the lowering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LowerOptions {
    /// Bind every function signature before lowering any body, so functions
    /// may call ones defined later in the file (mutual recursion).
    pub forward_declarations: bool,
    pub redeclaration: RedeclarationPolicy,
}

/// Lowers `program` with the default options.
pub fn lower_program(program: &Program) -> Result<IrModule, LowerError> {
    Lowerer::new().lower_program(program)
}

/// Context for lowering a single function body.
struct FuncCtx<'a> {
    func: &'a mut IrFunction,
    current_block: BlockId,
}

impl<'a> FuncCtx<'a> {
    fn emit(&mut self, instr: Instruction) {
        self.func.block_mut(self.current_block).push_instruction(instr);
    }

    fn set_terminator(&mut self, term: Terminator) {
        self.func.block_mut(self.current_block).set_terminator(term);
    }

    fn is_terminated(&self) -> bool {
        self.func.block(self.current_block).is_terminated()
    }

    /// Terminates the current block with a jump unless it already ends.
    fn jump_if_open(&mut self, target: BlockId) {
        if !self.is_terminated() {
            self.set_terminator(Terminator::Jump(target));
        }
    }

    fn new_block(&mut self) -> BlockId {
        let id = self.func.new_block();
        trace!(function = %self.func.name, block = %id, "created block");
        id
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current_block = block;
    }

    fn add_local(&mut self, ty: IrType) -> LocalId {
        self.func.add_local(ty)
    }

    fn add_temp(&mut self, ty: IrType) -> TempId {
        self.func.add_temp(ty)
    }
}

/// Main lowering context.
pub struct Lowerer {
    module: IrModule,
    symbols: SymbolTable,
    options: LowerOptions,
    next_func_id: usize,
    next_global_id: usize,
}

impl Lowerer {
    pub fn new() -> Self {
        Self {
            module: IrModule::new(),
            symbols: SymbolTable::new(),
            options: LowerOptions::default(),
            next_func_id: 0,
            next_global_id: 0,
        }
    }

    pub fn with_options(mut self, options: LowerOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable binding all function signatures before any body is lowered.
    pub fn with_forward_declarations(mut self, enabled: bool) -> Self {
        self.options.forward_declarations = enabled;
        self
    }

    pub fn with_redeclaration(mut self, policy: RedeclarationPolicy) -> Self {
        self.options.redeclaration = policy;
        self
    }

    fn alloc_func_id(&mut self) -> FuncId {
        let id = FuncId(self.next_func_id);
        self.next_func_id += 1;
        id
    }

    fn alloc_global_id(&mut self) -> GlobalId {
        let id = GlobalId(self.next_global_id);
        self.next_global_id += 1;
        id
    }

    /// Binds `name` in the innermost frame, honoring the redeclaration policy.
    fn declare(&mut self, name: &Node<Ident>, binding: Binding) -> Result<(), LowerError> {
        let name_str = &name.value.name;
        if self.options.redeclaration == RedeclarationPolicy::Reject
            && self.symbols.lookup_innermost(name_str).is_some()
        {
            return Err(LowerError::new(
                LowerErrorKind::DuplicateDeclaration {
                    name: name_str.clone(),
                },
                name.span,
            ));
        }

        if let Some(previous) = self.symbols.bind(name_str, binding) {
            debug!(name = %name_str, replaced = previous.describe(), "redeclaration replaced binding");
        }
        Ok(())
    }

    fn resolve(&self, name: &Node<Ident>) -> Result<&Binding, LowerError> {
        self.symbols
            .resolve(&name.value.name)
            .map_err(|kind| LowerError::new(kind, name.span))
    }

    /// Lower an entire program into an IR module.
    pub fn lower_program(mut self, program: &Program) -> Result<IrModule, LowerError> {
        let mut predeclared = vec![None; program.items.len()];

        if self.options.forward_declarations {
            for (index, item) in program.items.iter().enumerate() {
                if let Decl::Function(func) = &item.value {
                    let signature = self.lower_signature(func)?;
                    let id = self.alloc_func_id();
                    self.declare(&func.name, Binding::Function { id, signature })?;
                    predeclared[index] = Some(id);
                }
            }
        }

        for (index, item) in program.items.iter().enumerate() {
            match &item.value {
                Decl::Function(func) => self.lower_function(func, item.span, predeclared[index])?,
                Decl::Var(var) => self.lower_global(var)?,
            }
            debug_assert!(self.symbols.is_global_scope(), "frame leaked past a declaration");
        }

        debug!(
            functions = self.module.functions.len(),
            globals = self.module.globals.len(),
            "lowered program"
        );
        Ok(self.module)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn lower_signature(&self, func: &FunctionDecl) -> Result<FuncSignature, LowerError> {
        let params = func
            .params
            .iter()
            .map(|param| lower_type(&param.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = match &func.return_type {
            Some(ty) => lower_type(ty)?,
            None => IrType::Void,
        };
        Ok(FuncSignature { params, return_type })
    }

    fn lower_function(&mut self, decl: &FunctionDecl, span: Span, predeclared: Option<FuncId>) -> Result<(), LowerError> {
        let signature = self.lower_signature(decl)?;
        let id = predeclared.unwrap_or_else(|| self.alloc_func_id());

        // Bound before the body so the function can call itself.
        let already_bound = matches!(
            self.symbols.lookup_innermost(&decl.name.value.name),
            Some(Binding::Function { id: bound, .. }) if *bound == id
        );
        if !already_bound {
            self.declare(
                &decl.name,
                Binding::Function {
                    id,
                    signature: signature.clone(),
                },
            )?;
        }

        let name = self.module.fresh_symbol_name(&decl.name.value.name);
        debug!(function = %name, id = %id, params = signature.params.len(), "lowering function");

        let params = decl
            .params
            .iter()
            .map(|param| param.name.value.name.clone())
            .zip(signature.params.iter().cloned())
            .collect();
        let mut ir_func = IrFunction::new(id, name, params, signature.return_type.clone());
        ir_func.span = Some(span);
        let entry = ir_func.new_block();
        ir_func.entry_block = entry;

        let mut func_ctx = FuncCtx {
            func: &mut ir_func,
            current_block: entry,
        };

        self.symbols.push_frame();
        let result = self.lower_function_body(&mut func_ctx, decl, &signature);
        self.symbols.pop_frame();
        result?;

        self.finish_function(&mut ir_func, decl)?;
        self.module.add_function(ir_func);
        Ok(())
    }

    fn lower_function_body(
        &mut self,
        ctx: &mut FuncCtx,
        decl: &FunctionDecl,
        signature: &FuncSignature,
    ) -> Result<(), LowerError> {
        // Parameters live in stack slots initialized from the incoming arguments.
        for (index, (param, ty)) in decl.params.iter().zip(&signature.params).enumerate() {
            let slot = ctx.add_local(ty.clone());
            ctx.emit(Instruction::Store {
                ptr: Value::Local(slot),
                value: Value::Param(index),
            });
            self.declare(&param.name, Binding::Local { slot, ty: ty.clone() })?;
        }

        self.lower_block(ctx, &decl.body.value)
    }

    /// Terminates every block left open by the walk.
    fn finish_function(&self, func: &mut IrFunction, decl: &FunctionDecl) -> Result<(), LowerError> {
        let reachable = func.reachable_blocks();
        let is_void = func.return_type == IrType::Void;

        for block in &mut func.blocks {
            if block.is_terminated() {
                continue;
            }
            if !reachable.contains(&block.id) {
                block.set_terminator(Terminator::Unreachable);
            } else if is_void {
                block.set_terminator(Terminator::Return(None));
            } else {
                return Err(LowerError::new(
                    LowerErrorKind::MissingReturn {
                        function: decl.name.value.name.clone(),
                    },
                    decl.body.span,
                ));
            }
        }
        Ok(())
    }

    fn lower_global(&mut self, var: &VarDecl) -> Result<(), LowerError> {
        let ty = lower_type(&var.ty)?;

        let init = match &var.init {
            Some(expr) => {
                let (constant, init_ty) = self.eval_constant(expr, &var.name.value.name)?;
                if init_ty != ty {
                    return Err(LowerError::new(
                        LowerErrorKind::mismatch(format!("initializer of `{}`", var.name.value.name), &ty, &init_ty),
                        expr.span,
                    ));
                }
                Some(constant)
            }
            None => None,
        };

        let id = self.alloc_global_id();
        let name = self.module.fresh_symbol_name(&var.name.value.name);
        debug!(global = %name, id = %id, ty = %ty, "lowering global");
        self.module.add_global(IrGlobal::new(id, name, ty.clone(), init));
        self.declare(&var.name, Binding::Global { id, ty })
    }

    /// Folds a global initializer. Arithmetic wraps like the runtime does.
    fn eval_constant(&self, expr: &Node<Expr>, global: &str) -> Result<(Constant, IrType), LowerError> {
        let non_constant = || {
            LowerError::new(
                LowerErrorKind::NonConstantInitializer {
                    name: global.to_string(),
                },
                expr.span,
            )
        };

        match &expr.value {
            Expr::Literal(value) => Ok((Constant::I32(*value as i32), IrType::I32)),
            Expr::Paren(inner) => self.eval_constant(inner, global),
            Expr::Unary { op: UnaryOp::Minus, expr: operand } => {
                let value = self.expect_const_int(operand, global, "operand of unary `-`")?;
                Ok((Constant::I32(value.wrapping_neg()), IrType::I32))
            }
            Expr::Binary { left, op, right } => {
                let context = format!("operand of `{}`", op);
                let lhs = self.expect_const_int(left, global, &context)?;
                let rhs = self.expect_const_int(right, global, &context)?;
                let folded = match op {
                    BinaryOp::Add => Constant::I32(lhs.wrapping_add(rhs)),
                    BinaryOp::Sub => Constant::I32(lhs.wrapping_sub(rhs)),
                    BinaryOp::Mul => Constant::I32(lhs.wrapping_mul(rhs)),
                    BinaryOp::Div if rhs == 0 => return Err(non_constant()),
                    BinaryOp::Div => Constant::I32(lhs.wrapping_div(rhs)),
                    BinaryOp::Eq => Constant::Bool(lhs == rhs),
                    BinaryOp::NotEq => Constant::Bool(lhs != rhs),
                    BinaryOp::Lt => Constant::Bool(lhs < rhs),
                    BinaryOp::LtEq => Constant::Bool(lhs <= rhs),
                    BinaryOp::Gt => Constant::Bool(lhs > rhs),
                    BinaryOp::GtEq => Constant::Bool(lhs >= rhs),
                };
                let ty = if op.is_relational() { IrType::Bool } else { IrType::I32 };
                Ok((folded, ty))
            }
            Expr::AddrOf(target) => match target.value.unwrap_parens() {
                Expr::Ident(ident) => {
                    let node = Node::new(ident.clone(), target.span);
                    match self.resolve(&node)? {
                        Binding::Global { id, ty } => Ok((Constant::GlobalAddr(*id), ty.clone().pointer_to())),
                        other => Err(LowerError::new(
                            LowerErrorKind::UnsupportedLValue {
                                what: format!("cannot take the address of {} `{}`", other.describe(), ident),
                            },
                            target.span,
                        )),
                    }
                }
                _ => Err(LowerError::new(
                    LowerErrorKind::UnsupportedLValue {
                        what: "address-of requires a variable name".to_string(),
                    },
                    target.span,
                )),
            },
            Expr::Ident(_) | Expr::Deref(_) | Expr::Call { .. } => Err(non_constant()),
        }
    }

    fn expect_const_int(&self, expr: &Node<Expr>, global: &str, context: &str) -> Result<i32, LowerError> {
        match self.eval_constant(expr, global)? {
            (Constant::I32(value), IrType::I32) => Ok(value),
            (_, ty) => Err(LowerError::new(
                LowerErrorKind::mismatch(context, IrType::I32, ty),
                expr.span,
            )),
        }
    }
}

impl Default for Lowerer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(0, 0, 0)
    }

    fn ident(name: &str) -> Node<Ident> {
        Node::new(Ident::new(name), dummy_span())
    }

    fn lit(value: u64) -> Node<Expr> {
        Node::new(Expr::Literal(value), dummy_span())
    }

    fn parse(source: &str) -> Program {
        xlang_parser::parse_source(source).expect("test source should parse")
    }

    fn lower(source: &str) -> Result<IrModule, LowerError> {
        lower_program(&parse(source))
    }

    fn count_calls(func: &IrFunction) -> usize {
        func.instructions()
            .filter(|instr| matches!(instr, Instruction::Call { .. }))
            .count()
    }

    #[test]
    fn test_lower_empty_void_function() {
        let module = lower("main() { }").unwrap();
        let main = module.find_function("main").unwrap();
        assert_eq!(main.return_type, IrType::Void);
        assert_eq!(main.blocks.len(), 1);
        assert_eq!(main.block(main.entry_block).terminator, Some(Terminator::Return(None)));
        assert!(module.verify().is_ok());
    }

    #[test]
    fn test_global_initializers_fold() {
        let module = lower("a: Int = 2 * (3 + 4) - -1\nb: Int\np: *Int = &a").unwrap();
        assert_eq!(module.find_global("a").unwrap().init, Some(Constant::I32(15)));
        assert_eq!(module.find_global("b").unwrap().init, None);
        let p = module.find_global("p").unwrap();
        assert_eq!(p.ty, IrType::I32.pointer_to());
        assert_eq!(p.init, Some(Constant::GlobalAddr(GlobalId(0))));
    }

    #[test]
    fn test_global_literal_wraps_to_i32() {
        let module = lower("big: Int = 4294967295").unwrap();
        assert_eq!(module.find_global("big").unwrap().init, Some(Constant::I32(-1)));
    }

    #[test]
    fn test_global_initializer_must_be_constant() {
        let err = lower("a: Int = 1\nb: Int = a").unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::NonConstantInitializer { name: "b".to_string() });

        let err = lower("c: Int = 1 / 0").unwrap_err();
        assert!(matches!(err.kind, LowerErrorKind::NonConstantInitializer { .. }));
    }

    #[test]
    fn test_global_initializer_type_checked() {
        let err = lower("a: Int\np: Int = &a").unwrap_err();
        assert!(matches!(err.kind, LowerErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_redeclared_globals_get_distinct_symbols() {
        let module = lower("x: Int = 1\nx: Int = 2\nf() -> Int { return x }").unwrap();
        assert_eq!(module.globals.len(), 2);
        assert_eq!(module.globals[1].name, "x.1");
        let f = module.find_function("f").unwrap();
        assert!(f
            .instructions()
            .any(|instr| matches!(instr, Instruction::Load { ptr: Value::Global(GlobalId(1)), .. })));
    }

    #[test]
    fn test_reject_policy_reports_duplicates() {
        let program = parse("f() { x: Int = 1; x: Int = 2 }");
        let err = Lowerer::new()
            .with_redeclaration(RedeclarationPolicy::Reject)
            .lower_program(&program)
            .unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::DuplicateDeclaration { name: "x".to_string() });
    }

    #[test]
    fn test_reject_policy_allows_shadowing_in_nested_frames() {
        let program = parse("f(n: Int) { n: Int = 1; { n: Int = 2 } }");
        let result = Lowerer::new()
            .with_redeclaration(RedeclarationPolicy::Reject)
            .lower_program(&program);
        assert!(result.is_ok());
    }

    #[test]
    fn test_forward_declarations_enable_mutual_recursion() {
        let source = r#"
            even(n: Int) -> Int { if n == 0 { return 1 } return odd(n - 1) }
            odd(n: Int) -> Int { if n == 0 { return 0 } return even(n - 1) }
        "#;
        let err = lower(source).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::UndeclaredIdentifier { name: "odd".to_string() });

        let module = Lowerer::new()
            .with_forward_declarations(true)
            .lower_program(&parse(source))
            .unwrap();
        let even = module.find_function("even").unwrap();
        let odd = module.find_function("odd").unwrap();
        assert!(even
            .instructions()
            .any(|instr| matches!(instr, Instruction::Call { func, .. } if *func == odd.id)));
        assert!(module.verify().is_ok());
    }

    #[test]
    fn test_forward_declarations_with_reject_policy() {
        let program = parse("a() { b() }\nb() { a() }");
        let options = LowerOptions {
            forward_declarations: true,
            redeclaration: RedeclarationPolicy::Reject,
        };
        assert!(Lowerer::new().with_options(options).lower_program(&program).is_ok());
    }

    #[test]
    fn test_bad_call_emits_no_call_instruction() {
        let mut lowerer = Lowerer::new();
        lowerer.symbols.bind(
            "f",
            Binding::Function {
                id: FuncId(7),
                signature: FuncSignature {
                    params: vec![IrType::I32],
                    return_type: IrType::I32,
                },
            },
        );

        let mut func = IrFunction::new(FuncId(0), "caller".to_string(), vec![], IrType::Void);
        let entry = func.new_block();
        let mut ctx = FuncCtx {
            func: &mut func,
            current_block: entry,
        };

        let wrong_arity = Node::new(
            Expr::Call {
                callee: ident("f"),
                args: vec![lit(1), lit(2)],
            },
            dummy_span(),
        );
        let err = lowerer.lower_expr(&mut ctx, &wrong_arity).unwrap_err();
        assert!(matches!(err.kind, LowerErrorKind::ArityMismatch { expected: 1, found: 2, .. }));

        let addr = Node::new(Expr::AddrOf(Box::new(Node::new(Expr::Ident(Ident::new("g")), dummy_span()))), dummy_span());
        lowerer.symbols.bind(
            "g",
            Binding::Global {
                id: GlobalId(0),
                ty: IrType::I32,
            },
        );
        let wrong_type = Node::new(
            Expr::Call {
                callee: ident("f"),
                args: vec![addr],
            },
            dummy_span(),
        );
        let err = lowerer.lower_expr(&mut ctx, &wrong_type).unwrap_err();
        assert!(matches!(err.kind, LowerErrorKind::TypeMismatch { .. }));

        assert_eq!(count_calls(&func), 0);
    }
}
