//! Expression lowering

use super::*;
use crate::{BinOp, RValue, UnOp};

impl Lowerer {
    /// Lowers an expression whose value is needed.
    pub(super) fn lower_expr(&mut self, ctx: &mut FuncCtx, expr: &Node<Expr>) -> Result<(Value, IrType), LowerError> {
        match &expr.value {
            Expr::Paren(inner) => self.lower_expr(ctx, inner),

            Expr::Literal(value) => Ok((Value::i32(*value as i32), IrType::I32)),

            Expr::Ident(ident) => {
                let name = Node::new(ident.clone(), expr.span);
                let (ptr, ty) = self.lower_storage(&name, "read")?;
                let dest = ctx.add_temp(ty.clone());
                ctx.emit(Instruction::Load { dest, ptr });
                Ok((Value::Temp(dest), ty))
            }

            Expr::AddrOf(target) => self.lower_addr_of(target),

            Expr::Deref(pointer) => {
                let (ptr, ptr_ty) = self.lower_expr(ctx, pointer)?;
                let pointee = match ptr_ty.pointee() {
                    Some(pointee) => pointee.clone(),
                    None => {
                        return Err(LowerError::new(
                            LowerErrorKind::mismatch("dereference", "a pointer", &ptr_ty),
                            pointer.span,
                        ))
                    }
                };
                let dest = ctx.add_temp(pointee.clone());
                ctx.emit(Instruction::Load { dest, ptr });
                Ok((Value::Temp(dest), pointee))
            }

            Expr::Unary { op: UnaryOp::Minus, expr: operand } => {
                let value = self.lower_int_operand(ctx, operand, "operand of unary `-`")?;
                let dest = ctx.add_temp(IrType::I32);
                ctx.emit(Instruction::Assign {
                    dest,
                    value: RValue::UnaryOp { op: UnOp::Neg, operand: value },
                });
                Ok((Value::Temp(dest), IrType::I32))
            }

            Expr::Binary { left, op, right } => {
                let context = format!("operand of `{}`", op);
                let lhs = self.lower_int_operand(ctx, left, &context)?;
                let rhs = self.lower_int_operand(ctx, right, &context)?;

                let ir_op = lower_binary_op(*op);
                let ty = if ir_op.is_comparison() { IrType::Bool } else { IrType::I32 };
                let dest = ctx.add_temp(ty.clone());
                ctx.emit(Instruction::Assign {
                    dest,
                    value: RValue::BinaryOp { op: ir_op, left: lhs, right: rhs },
                });
                Ok((Value::Temp(dest), ty))
            }

            Expr::Call { callee, args } => match self.lower_call(ctx, callee, args)? {
                (Some(value), ty) => Ok((value, ty)),
                (None, ty) => Err(LowerError::new(
                    LowerErrorKind::mismatch(format!("use of `{}()` as a value", callee.value), "a value", ty),
                    expr.span,
                )),
            },
        }
    }

    fn lower_int_operand(&mut self, ctx: &mut FuncCtx, expr: &Node<Expr>, context: &str) -> Result<Value, LowerError> {
        let (value, ty) = self.lower_expr(ctx, expr)?;
        if ty != IrType::I32 {
            return Err(LowerError::new(LowerErrorKind::mismatch(context, IrType::I32, &ty), expr.span));
        }
        Ok(value)
    }

    /// `&name` yields the storage handle itself; no other lvalue is supported.
    fn lower_addr_of(&mut self, target: &Node<Expr>) -> Result<(Value, IrType), LowerError> {
        match target.value.unwrap_parens() {
            Expr::Ident(ident) => {
                let name = Node::new(ident.clone(), target.span);
                let (ptr, ty) = self.lower_storage(&name, "take the address of")?;
                Ok((ptr, ty.pointer_to()))
            }
            other => Err(LowerError::new(
                LowerErrorKind::UnsupportedLValue {
                    what: format!("cannot take the address of {}", describe_expr(other)),
                },
                target.span,
            )),
        }
    }

    /// Resolves a variable name to the address of its storage and its type.
    pub(super) fn lower_storage(&self, name: &Node<Ident>, action: &str) -> Result<(Value, IrType), LowerError> {
        match self.resolve(name)? {
            Binding::Local { slot, ty } => Ok((Value::Local(*slot), ty.clone())),
            Binding::Global { id, ty } => Ok((Value::Global(*id), ty.clone())),
            Binding::Function { .. } => Err(LowerError::new(
                LowerErrorKind::UnsupportedLValue {
                    what: format!("cannot {} function `{}`", action, name.value),
                },
                name.span,
            )),
        }
    }

    /// Lowers a direct call. Returns `None` as the value for void callees.
    pub(super) fn lower_call(
        &mut self,
        ctx: &mut FuncCtx,
        callee: &Node<Ident>,
        args: &[Node<Expr>],
    ) -> Result<(Option<Value>, IrType), LowerError> {
        let (func_id, signature) = match self.resolve(callee)? {
            Binding::Function { id, signature } => (*id, signature.clone()),
            _ => {
                return Err(LowerError::new(
                    LowerErrorKind::NotCallable {
                        name: callee.value.name.clone(),
                    },
                    callee.span,
                ))
            }
        };

        if args.len() != signature.params.len() {
            return Err(LowerError::new(
                LowerErrorKind::ArityMismatch {
                    callee: callee.value.name.clone(),
                    expected: signature.params.len(),
                    found: args.len(),
                },
                callee.span,
            ));
        }

        let mut arg_values = Vec::with_capacity(args.len());
        for (index, (arg, param_ty)) in args.iter().zip(&signature.params).enumerate() {
            let (value, ty) = self.lower_expr(ctx, arg)?;
            if &ty != param_ty {
                return Err(LowerError::new(
                    LowerErrorKind::mismatch(
                        format!("argument {} of `{}`", index + 1, callee.value),
                        param_ty,
                        &ty,
                    ),
                    arg.span,
                ));
            }
            arg_values.push(value);
        }

        let dest = match signature.return_type {
            IrType::Void => None,
            ref ty => Some(ctx.add_temp(ty.clone())),
        };
        ctx.emit(Instruction::Call {
            dest,
            func: func_id,
            args: arg_values,
        });

        Ok((dest.map(Value::Temp), signature.return_type))
    }
}

fn lower_binary_op(op: BinaryOp) -> BinOp {
    match op {
        BinaryOp::Add => BinOp::Add,
        BinaryOp::Sub => BinOp::Sub,
        BinaryOp::Mul => BinOp::Mul,
        BinaryOp::Div => BinOp::Div,
        BinaryOp::Eq => BinOp::Eq,
        BinaryOp::NotEq => BinOp::Ne,
        BinaryOp::Lt => BinOp::Lt,
        BinaryOp::LtEq => BinOp::Le,
        BinaryOp::Gt => BinOp::Gt,
        BinaryOp::GtEq => BinOp::Ge,
    }
}

fn describe_expr(expr: &Expr) -> &'static str {
    match expr {
        Expr::Literal(_) => "a literal",
        Expr::Ident(_) => "a variable",
        Expr::Paren(_) => "a parenthesized expression",
        Expr::AddrOf(_) => "an address",
        Expr::Deref(_) => "a dereference",
        Expr::Unary { .. } | Expr::Binary { .. } => "a computed value",
        Expr::Call { .. } => "a call result",
    }
}
