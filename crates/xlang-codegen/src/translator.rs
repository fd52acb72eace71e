//! Function translation logic for converting X IR to Cranelift IR

use cranelift::codegen::ir::GlobalValue;
use cranelift::prelude::*;
use cranelift_module::{DataId, FuncId as ClifFuncId, Module};
use cranelift_object::ObjectModule;
use std::collections::HashMap;

use xlang_ir::{
    BinOp, Block as IrBlock, BlockId, Constant, FuncId, GlobalId, Instruction, IrFunction, IrType,
    LocalId, RValue, TempId, Terminator, UnOp, Value as IrValue,
};

use crate::error::CodegenError;
use crate::{ir_type_to_cranelift, storage_size};

use cranelift::prelude::Block as ClifBlock;
use cranelift::prelude::Value as ClifValue;

/// Context for translating a single function
pub(crate) struct FunctionTranslator<'a> {
    module: &'a mut ObjectModule,
    func_id_map: &'a HashMap<FuncId, ClifFuncId>,
    global_data_map: &'a HashMap<GlobalId, DataId>,
    ir_func: &'a IrFunction,
    pointer_type: Type,
    /// Incoming arguments, taken from the entry block parameters
    params: Vec<ClifValue>,
    /// Stack slot addresses, computed once in the entry block
    slot_addrs: HashMap<LocalId, ClifValue>,
    /// Temps map to frontend variables; the builder inserts block params as needed
    temp_vars: HashMap<TempId, Variable>,
    block_map: HashMap<BlockId, ClifBlock>,
    /// Data symbols already imported into this function
    global_refs: HashMap<GlobalId, GlobalValue>,
}

impl<'a> FunctionTranslator<'a> {
    pub(crate) fn new(
        module: &'a mut ObjectModule,
        func_id_map: &'a HashMap<FuncId, ClifFuncId>,
        global_data_map: &'a HashMap<GlobalId, DataId>,
        ir_func: &'a IrFunction,
        pointer_type: Type,
    ) -> Self {
        Self {
            module,
            func_id_map,
            global_data_map,
            ir_func,
            pointer_type,
            params: Vec::new(),
            slot_addrs: HashMap::new(),
            temp_vars: HashMap::new(),
            block_map: HashMap::new(),
            global_refs: HashMap::new(),
        }
    }

    fn clif_type(&self, ty: &IrType) -> Result<Type, CodegenError> {
        ir_type_to_cranelift(ty, self.pointer_type)
    }

    /// Translate the entire function
    pub(crate) fn translate(&mut self, mut builder: FunctionBuilder) -> Result<(), CodegenError> {
        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);
        builder.seal_block(entry_block);

        let ir_func = self.ir_func;
        self.params = builder.block_params(entry_block).to_vec();

        for (local_id, ty) in &ir_func.locals {
            let size = storage_size(ty, self.pointer_type) as u32;
            let slot = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                size,
                size.trailing_zeros() as u8,
            ));
            let addr = builder.ins().stack_addr(self.pointer_type, slot, 0);
            self.slot_addrs.insert(*local_id, addr);
        }

        for (temp_id, ty) in &ir_func.temps {
            let var = Variable::new(temp_id.0);
            builder.declare_var(var, self.clif_type(ty)?);
            self.temp_vars.insert(*temp_id, var);
        }

        for block in &ir_func.blocks {
            let clif_block = builder.create_block();
            self.block_map.insert(block.id, clif_block);
        }

        let ir_entry = self.lookup_block(ir_func.entry_block)?;
        builder.ins().jump(ir_entry, &[]);

        for block in &ir_func.blocks {
            self.translate_block(&mut builder, block)?;
        }

        builder.seal_all_blocks();
        builder.finalize();

        Ok(())
    }

    fn translate_block(
        &mut self,
        builder: &mut FunctionBuilder,
        block: &IrBlock,
    ) -> Result<(), CodegenError> {
        let clif_block = self.lookup_block(block.id)?;
        builder.switch_to_block(clif_block);

        for inst in &block.instructions {
            self.translate_instruction(builder, inst)?;
        }

        let terminator = block
            .terminator
            .as_ref()
            .ok_or_else(|| CodegenError::new(format!("block {} has no terminator", block.id)))?;
        self.translate_terminator(builder, terminator)
    }

    fn translate_instruction(
        &mut self,
        builder: &mut FunctionBuilder,
        inst: &Instruction,
    ) -> Result<(), CodegenError> {
        match inst {
            Instruction::Assign { dest, value } => {
                let val = self.translate_rvalue(builder, value)?;
                self.define_temp(builder, *dest, val)?;
            }

            Instruction::Load { dest, ptr } => {
                let ty = self
                    .ir_func
                    .temp_type(*dest)
                    .ok_or_else(|| CodegenError::new(format!("unknown temp {}", dest)))?;
                let ty = self.clif_type(ty)?;
                let addr = self.translate_value(builder, ptr)?;
                let val = builder.ins().load(ty, MemFlags::new(), addr, 0);
                self.define_temp(builder, *dest, val)?;
            }

            Instruction::Store { ptr, value } => {
                let addr = self.translate_value(builder, ptr)?;
                let val = self.translate_value(builder, value)?;
                builder.ins().store(MemFlags::new(), val, addr, 0);
            }

            Instruction::Call { dest, func, args } => {
                let clif_func_id = *self
                    .func_id_map
                    .get(func)
                    .ok_or_else(|| CodegenError::new(format!("call to undeclared {}", func)))?;
                let arg_vals = args
                    .iter()
                    .map(|arg| self.translate_value(builder, arg))
                    .collect::<Result<Vec<_>, _>>()?;

                let func_ref = self.module.declare_func_in_func(clif_func_id, builder.func);
                let call = builder.ins().call(func_ref, &arg_vals);

                if let Some(dest) = dest {
                    let result = builder.inst_results(call).first().copied().ok_or_else(|| {
                        CodegenError::new(format!("{} returns no value", func))
                    })?;
                    self.define_temp(builder, *dest, result)?;
                }
            }
        }

        Ok(())
    }

    fn translate_terminator(
        &mut self,
        builder: &mut FunctionBuilder,
        terminator: &Terminator,
    ) -> Result<(), CodegenError> {
        match terminator {
            Terminator::Return(val_opt) => {
                if let Some(val) = val_opt {
                    let return_val = self.translate_value(builder, val)?;
                    builder.ins().return_(&[return_val]);
                } else {
                    builder.ins().return_(&[]);
                }
            }

            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => {
                let cond_val = self.translate_value(builder, cond)?;
                let then_bl = self.lookup_block(*then_block)?;
                let else_bl = self.lookup_block(*else_block)?;
                builder.ins().brif(cond_val, then_bl, &[], else_bl, &[]);
            }

            Terminator::Jump(target) => {
                let target_block = self.lookup_block(*target)?;
                builder.ins().jump(target_block, &[]);
            }

            Terminator::Unreachable => {
                if let Some(trap_code) = TrapCode::user(1) {
                    builder.ins().trap(trap_code);
                } else {
                    builder.ins().trap(TrapCode::HEAP_OUT_OF_BOUNDS);
                }
            }
        }

        Ok(())
    }

    fn translate_rvalue(
        &mut self,
        builder: &mut FunctionBuilder,
        rvalue: &RValue,
    ) -> Result<ClifValue, CodegenError> {
        match rvalue {
            RValue::Use(value) => self.translate_value(builder, value),
            RValue::BinaryOp { op, left, right } => {
                let lhs = self.translate_value(builder, left)?;
                let rhs = self.translate_value(builder, right)?;
                Ok(translate_binop(builder, *op, lhs, rhs))
            }
            RValue::UnaryOp { op, operand } => {
                let val = self.translate_value(builder, operand)?;
                match op {
                    UnOp::Neg => Ok(builder.ins().ineg(val)),
                }
            }
        }
    }

    fn translate_value(
        &mut self,
        builder: &mut FunctionBuilder,
        value: &IrValue,
    ) -> Result<ClifValue, CodegenError> {
        match value {
            IrValue::Const(constant) => self.translate_constant(builder, constant),
            IrValue::Temp(temp) => {
                let var = self
                    .temp_vars
                    .get(temp)
                    .ok_or_else(|| CodegenError::new(format!("unknown temp {}", temp)))?;
                Ok(builder.use_var(*var))
            }
            IrValue::Param(index) => self
                .params
                .get(*index)
                .copied()
                .ok_or_else(|| CodegenError::new(format!("parameter {} out of range", index))),
            IrValue::Local(local) => self
                .slot_addrs
                .get(local)
                .copied()
                .ok_or_else(|| CodegenError::new(format!("unknown slot {}", local))),
            IrValue::Global(global) => self.global_addr(builder, *global),
        }
    }

    fn translate_constant(
        &mut self,
        builder: &mut FunctionBuilder,
        constant: &Constant,
    ) -> Result<ClifValue, CodegenError> {
        match constant {
            Constant::I32(v) => Ok(builder.ins().iconst(types::I32, i64::from(*v))),
            Constant::Bool(b) => Ok(builder.ins().iconst(types::I8, i64::from(*b))),
            Constant::GlobalAddr(global) => self.global_addr(builder, *global),
        }
    }

    fn global_addr(
        &mut self,
        builder: &mut FunctionBuilder,
        global: GlobalId,
    ) -> Result<ClifValue, CodegenError> {
        let gv = match self.global_refs.get(&global) {
            Some(gv) => *gv,
            None => {
                let data_id = *self
                    .global_data_map
                    .get(&global)
                    .ok_or_else(|| CodegenError::new(format!("undeclared global {}", global)))?;
                let gv = self.module.declare_data_in_func(data_id, builder.func);
                self.global_refs.insert(global, gv);
                gv
            }
        };
        Ok(builder.ins().global_value(self.pointer_type, gv))
    }

    fn define_temp(
        &mut self,
        builder: &mut FunctionBuilder,
        temp: TempId,
        value: ClifValue,
    ) -> Result<(), CodegenError> {
        let var = self
            .temp_vars
            .get(&temp)
            .ok_or_else(|| CodegenError::new(format!("unknown temp {}", temp)))?;
        builder.def_var(*var, value);
        Ok(())
    }

    fn lookup_block(&self, id: BlockId) -> Result<ClifBlock, CodegenError> {
        self.block_map
            .get(&id)
            .copied()
            .ok_or_else(|| CodegenError::new(format!("block {} not found", id)))
    }
}

/// Arithmetic wraps; comparisons are signed and produce an `i8` flag.
fn translate_binop(
    builder: &mut FunctionBuilder,
    op: BinOp,
    lhs: ClifValue,
    rhs: ClifValue,
) -> ClifValue {
    match op {
        BinOp::Add => builder.ins().iadd(lhs, rhs),
        BinOp::Sub => builder.ins().isub(lhs, rhs),
        BinOp::Mul => builder.ins().imul(lhs, rhs),
        BinOp::Div => builder.ins().sdiv(lhs, rhs),
        BinOp::Eq => builder.ins().icmp(IntCC::Equal, lhs, rhs),
        BinOp::Ne => builder.ins().icmp(IntCC::NotEqual, lhs, rhs),
        BinOp::Lt => builder.ins().icmp(IntCC::SignedLessThan, lhs, rhs),
        BinOp::Le => builder.ins().icmp(IntCC::SignedLessThanOrEqual, lhs, rhs),
        BinOp::Gt => builder.ins().icmp(IntCC::SignedGreaterThan, lhs, rhs),
        BinOp::Ge => builder.ins().icmp(IntCC::SignedGreaterThanOrEqual, lhs, rhs),
    }
}
