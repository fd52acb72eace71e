//! Statement and control-flow lowering

use super::*;

impl Lowerer {
    /// Lowers a block in a fresh frame.
    pub(super) fn lower_block(&mut self, ctx: &mut FuncCtx, block: &BlockStmt) -> Result<(), LowerError> {
        self.symbols.push_frame();
        let result = block.stmts.iter().try_for_each(|stmt| self.lower_stmt(ctx, stmt));
        self.symbols.pop_frame();
        result
    }

    /// Lowers a branch or loop body in its own frame.
    fn lower_scoped_stmt(&mut self, ctx: &mut FuncCtx, stmt: &Node<Stmt>) -> Result<(), LowerError> {
        self.symbols.push_frame();
        let result = self.lower_stmt(ctx, stmt);
        self.symbols.pop_frame();
        result
    }

    pub(super) fn lower_stmt(&mut self, ctx: &mut FuncCtx, stmt: &Node<Stmt>) -> Result<(), LowerError> {
        // Statements after a return still get checked; they land in a dead block.
        if ctx.is_terminated() {
            let dead = ctx.new_block();
            ctx.switch_to(dead);
        }

        match &stmt.value {
            Stmt::VarDecl(var) => self.lower_local_var(ctx, var),
            Stmt::Block(block) => self.lower_block(ctx, block),
            Stmt::If {
                condition,
                then_stmt,
                else_stmt,
            } => self.lower_if(ctx, condition, then_stmt, else_stmt.as_deref()),
            Stmt::While { condition, body } => self.lower_while(ctx, condition, body),
            Stmt::Return(value) => self.lower_return(ctx, value.as_ref(), stmt.span),
            Stmt::Assign { target, value } => self.lower_assign(ctx, target, value),
            Stmt::Expr(expr) => {
                match expr.value.unwrap_parens() {
                    // Void calls are fine here: the value is discarded anyway.
                    Expr::Call { callee, args } => {
                        self.lower_call(ctx, callee, args)?;
                    }
                    _ => {
                        self.lower_expr(ctx, expr)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn lower_local_var(&mut self, ctx: &mut FuncCtx, var: &VarDecl) -> Result<(), LowerError> {
        let ty = lower_type(&var.ty)?;

        // The initializer is evaluated before the name is bound.
        let init = match &var.init {
            Some(expr) => {
                let (value, init_ty) = self.lower_expr(ctx, expr)?;
                if init_ty != ty {
                    return Err(LowerError::new(
                        LowerErrorKind::mismatch(format!("initializer of `{}`", var.name.value), &ty, &init_ty),
                        expr.span,
                    ));
                }
                Some(value)
            }
            None => None,
        };

        let slot = ctx.add_local(ty.clone());
        if let Some(value) = init {
            ctx.emit(Instruction::Store {
                ptr: Value::Local(slot),
                value,
            });
        }
        self.declare(&var.name, Binding::Local { slot, ty })
    }

    fn lower_assign(&mut self, ctx: &mut FuncCtx, target: &Node<Ident>, value: &Node<Expr>) -> Result<(), LowerError> {
        let (ptr, ty) = self.lower_storage(target, "assign to")?;
        let (value_val, value_ty) = self.lower_expr(ctx, value)?;
        if value_ty != ty {
            return Err(LowerError::new(
                LowerErrorKind::mismatch(format!("assignment to `{}`", target.value), &ty, &value_ty),
                value.span,
            ));
        }
        ctx.emit(Instruction::Store { ptr, value: value_val });
        Ok(())
    }

    fn lower_condition(&mut self, ctx: &mut FuncCtx, condition: &Node<Expr>, context: &str) -> Result<Value, LowerError> {
        let (value, ty) = self.lower_expr(ctx, condition)?;
        if ty != IrType::Bool {
            return Err(LowerError::new(
                LowerErrorKind::mismatch(context, "a comparison", &ty),
                condition.span,
            ));
        }
        Ok(value)
    }

    fn lower_if(
        &mut self,
        ctx: &mut FuncCtx,
        condition: &Node<Expr>,
        then_stmt: &Node<Stmt>,
        else_stmt: Option<&Node<Stmt>>,
    ) -> Result<(), LowerError> {
        let cond_val = self.lower_condition(ctx, condition, "`if` condition")?;

        let then_block = ctx.new_block();
        let else_block = else_stmt.map(|_| ctx.new_block());
        let merge_block = ctx.new_block();

        ctx.set_terminator(Terminator::Branch {
            cond: cond_val,
            then_block,
            else_block: else_block.unwrap_or(merge_block),
        });

        // Then branch
        ctx.switch_to(then_block);
        self.lower_scoped_stmt(ctx, then_stmt)?;
        ctx.jump_if_open(merge_block);

        // Else branch
        if let (Some(else_block), Some(else_s)) = (else_block, else_stmt) {
            ctx.switch_to(else_block);
            self.lower_scoped_stmt(ctx, else_s)?;
            ctx.jump_if_open(merge_block);
        }

        ctx.switch_to(merge_block);
        Ok(())
    }

    fn lower_while(&mut self, ctx: &mut FuncCtx, condition: &Node<Expr>, body: &Node<Stmt>) -> Result<(), LowerError> {
        let cond_block = ctx.new_block();
        let body_block = ctx.new_block();
        let exit_block = ctx.new_block();

        ctx.set_terminator(Terminator::Jump(cond_block));

        // Condition
        ctx.switch_to(cond_block);
        let cond_val = self.lower_condition(ctx, condition, "`while` condition")?;
        ctx.set_terminator(Terminator::Branch {
            cond: cond_val,
            then_block: body_block,
            else_block: exit_block,
        });

        // Body
        ctx.switch_to(body_block);
        self.lower_scoped_stmt(ctx, body)?;
        ctx.jump_if_open(cond_block);

        ctx.switch_to(exit_block);
        Ok(())
    }

    fn lower_return(&mut self, ctx: &mut FuncCtx, value: Option<&Node<Expr>>, span: Span) -> Result<(), LowerError> {
        let return_type = ctx.func.return_type.clone();

        match value {
            Some(expr) => {
                let (value, ty) = self.lower_expr(ctx, expr)?;
                if ty != return_type {
                    return Err(LowerError::new(
                        LowerErrorKind::mismatch(format!("return from `{}`", ctx.func.name), &return_type, &ty),
                        expr.span,
                    ));
                }
                ctx.set_terminator(Terminator::Return(Some(value)));
            }
            None if return_type == IrType::Void => ctx.set_terminator(Terminator::Return(None)),
            None => {
                return Err(LowerError::new(
                    LowerErrorKind::MissingReturn {
                        function: ctx.func.name.clone(),
                    },
                    span,
                ))
            }
        }
        Ok(())
    }
}
