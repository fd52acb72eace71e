//! Cranelift-based native code generation for X IR
//!
//! Translates an [`IrModule`] into a relocatable object file. Every top-level
//! function and global becomes an exported symbol; globals are data objects
//! whose initializers may carry relocations (`p: *Int = &x`). Linking the
//! object into an executable is left to the system toolchain.

mod error;
mod translator;

pub use error::CodegenError;

use cranelift::codegen::ir::Endianness;
use cranelift::prelude::*;
use cranelift_module::{DataDescription, DataId, FuncId as ClifFuncId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};
use std::collections::HashMap;
use target_lexicon::Triple;
use tracing::debug;

use xlang_ir::{Constant, FuncId, GlobalId, IrFunction, IrGlobal, IrModule, IrType};

use crate::translator::FunctionTranslator;

/// Main code generator that compiles IR to native object files
pub struct CodeGenerator {
    module: ObjectModule,
    ctx: codegen::Context,
    func_builder_ctx: FunctionBuilderContext,
    pointer_type: Type,
    func_id_map: HashMap<FuncId, ClifFuncId>,
    global_data_map: HashMap<GlobalId, DataId>,
    triple: Triple,
}

impl CodeGenerator {
    /// Create a new code generator targeting the host platform
    pub fn new() -> Result<Self, CodegenError> {
        let triple = Triple::host();
        let isa_builder = cranelift_native::builder()
            .map_err(|e| CodegenError::new(format!("Failed to create ISA builder: {}", e)))?;

        let mut flag_builder = settings::builder();
        flag_builder
            .set("is_pic", "true")
            .map_err(|e| CodegenError::new(format!("Failed to set is_pic: {}", e)))?;
        flag_builder
            .set("enable_verifier", "true")
            .map_err(|e| CodegenError::new(format!("Failed to enable verifier: {}", e)))?;

        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| CodegenError::new(format!("Failed to create ISA: {}", e)))?;

        let pointer_type = isa.pointer_type();

        let builder = ObjectBuilder::new(
            isa,
            "xlang_module",
            cranelift_module::default_libcall_names(),
        )
        .map_err(|e| CodegenError::new(format!("Failed to create object builder: {}", e)))?;

        Ok(Self {
            module: ObjectModule::new(builder),
            ctx: codegen::Context::new(),
            func_builder_ctx: FunctionBuilderContext::new(),
            pointer_type,
            func_id_map: HashMap::new(),
            global_data_map: HashMap::new(),
            triple,
        })
    }

    /// The target the object file is generated for.
    pub fn triple(&self) -> &Triple {
        &self.triple
    }

    /// Compile an IR module to object file bytes
    pub fn compile_module(mut self, ir_module: &IrModule) -> Result<Vec<u8>, CodegenError> {
        debug!(
            target = %self.triple(),
            functions = ir_module.functions.len(),
            globals = ir_module.globals.len(),
            "generating object"
        );

        // Declare every symbol first so initializers and calls can refer forward.
        for global in &ir_module.globals {
            self.declare_global(global)?;
        }
        for function in &ir_module.functions {
            self.declare_function(function)?;
        }

        for global in &ir_module.globals {
            self.define_global(global)?;
        }
        for function in &ir_module.functions {
            self.compile_function(function)
                .map_err(|e| e.in_function(&function.name))?;
        }

        let object_product = self.module.finish();

        object_product
            .emit()
            .map_err(|e| CodegenError::new(format!("Failed to emit object file: {}", e)))
    }

    fn declare_function(&mut self, ir_func: &IrFunction) -> Result<(), CodegenError> {
        let mut signature = self.module.make_signature();

        for (_, ty) in &ir_func.params {
            signature.params.push(AbiParam::new(self.ir_type_to_cranelift(ty)?));
        }
        if ir_func.return_type != IrType::Void {
            signature
                .returns
                .push(AbiParam::new(self.ir_type_to_cranelift(&ir_func.return_type)?));
        }

        let clif_func_id = self
            .module
            .declare_function(&ir_func.name, Linkage::Export, &signature)
            .map_err(|e| CodegenError::new(format!("Failed to declare function: {}", e)))?;

        self.func_id_map.insert(ir_func.id, clif_func_id);
        Ok(())
    }

    fn declare_global(&mut self, global: &IrGlobal) -> Result<(), CodegenError> {
        let data_id = self
            .module
            .declare_data(&global.name, Linkage::Export, true, false)
            .map_err(|e| {
                CodegenError::new(format!("Failed to declare global '{}': {}", global.name, e))
            })?;
        self.global_data_map.insert(global.id, data_id);
        Ok(())
    }

    fn define_global(&mut self, global: &IrGlobal) -> Result<(), CodegenError> {
        let data_id = *self
            .global_data_map
            .get(&global.id)
            .ok_or_else(|| CodegenError::new(format!("Global {} not declared", global.name)))?;

        let size = storage_size(&global.ty, self.pointer_type);
        let mut data_desc = DataDescription::new();
        data_desc.set_align(size as u64);

        match &global.init {
            None => data_desc.define_zeroinit(size),
            Some(Constant::I32(value)) => {
                let bytes = match self.module.isa().endianness() {
                    Endianness::Little => value.to_le_bytes(),
                    Endianness::Big => value.to_be_bytes(),
                };
                data_desc.define(bytes.to_vec().into_boxed_slice());
            }
            Some(Constant::Bool(value)) => data_desc.define(vec![u8::from(*value)].into_boxed_slice()),
            Some(Constant::GlobalAddr(target)) => {
                let target_id = *self.global_data_map.get(target).ok_or_else(|| {
                    CodegenError::new(format!("Initializer of {} names unknown {}", global.name, target))
                })?;
                data_desc.define_zeroinit(size);
                let gv = self.module.declare_data_in_data(target_id, &mut data_desc);
                data_desc.write_data_addr(0, gv, 0);
            }
        }

        self.module.define_data(data_id, &data_desc).map_err(|e| {
            CodegenError::new(format!("Failed to define global '{}': {}", global.name, e))
        })
    }

    /// Compile a single function
    pub fn compile_function(&mut self, ir_func: &IrFunction) -> Result<(), CodegenError> {
        let clif_func_id = *self
            .func_id_map
            .get(&ir_func.id)
            .ok_or_else(|| CodegenError::new(format!("Function {} not declared", ir_func.name)))?;

        debug!(
            function = %ir_func.name,
            blocks = ir_func.blocks.len(),
            slots = ir_func.locals.len(),
            "translating function"
        );

        self.ctx.func.signature.clear(self.module.isa().default_call_conv());
        for (_, ty) in &ir_func.params {
            let cl_type = self.ir_type_to_cranelift(ty)?;
            self.ctx.func.signature.params.push(AbiParam::new(cl_type));
        }
        if ir_func.return_type != IrType::Void {
            let cl_type = self.ir_type_to_cranelift(&ir_func.return_type)?;
            self.ctx.func.signature.returns.push(AbiParam::new(cl_type));
        }

        let builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.func_builder_ctx);
        let mut translator = FunctionTranslator::new(
            &mut self.module,
            &self.func_id_map,
            &self.global_data_map,
            ir_func,
            self.pointer_type,
        );
        let translated = translator.translate(builder);
        if let Err(err) = translated {
            self.module.clear_context(&mut self.ctx);
            return Err(err);
        }

        if let Err(errors) = cranelift::codegen::verify_function(&self.ctx.func, self.module.isa()) {
            let message = format!("Verifier errors:\n{}", errors);
            self.module.clear_context(&mut self.ctx);
            return Err(CodegenError::new(message));
        }

        let defined = self.module.define_function(clif_func_id, &mut self.ctx);
        self.module.clear_context(&mut self.ctx);
        defined.map_err(|e| CodegenError::new(format!("Failed to define function: {}", e)))?;

        Ok(())
    }

    fn ir_type_to_cranelift(&self, ir_type: &IrType) -> Result<Type, CodegenError> {
        ir_type_to_cranelift(ir_type, self.pointer_type)
    }

}

/// Bytes a stack slot or data object of this type occupies on the target.
pub(crate) fn storage_size(ir_type: &IrType, pointer_type: Type) -> usize {
    match ir_type {
        IrType::Ptr(_) => pointer_type.bytes() as usize,
        other => other.size_bytes(),
    }
}

/// Maps an IR type to its Cranelift value type.
pub(crate) fn ir_type_to_cranelift(ir_type: &IrType, pointer_type: Type) -> Result<Type, CodegenError> {
    match ir_type {
        IrType::I32 => Ok(types::I32),
        IrType::Bool => Ok(types::I8),
        IrType::Ptr(_) => Ok(pointer_type),
        IrType::Void => Err(CodegenError::new("Cannot convert Void to Cranelift type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlang_ir::{Instruction, RValue, Terminator, Value as IrValue};

    fn compile_source(source: &str) -> Result<Vec<u8>, CodegenError> {
        let program = xlang_parser::parse_source(source).expect("test source should parse");
        let module = xlang_ir::lower_program(&program).expect("test source should lower");
        CodeGenerator::new().unwrap().compile_module(&module)
    }

    #[test]
    fn test_codegen_creation() {
        let codegen = CodeGenerator::new().unwrap();
        assert_eq!(codegen.triple(), &Triple::host());
    }

    #[test]
    fn test_type_conversion() {
        let codegen = CodeGenerator::new().unwrap();

        assert_eq!(codegen.ir_type_to_cranelift(&IrType::I32).unwrap(), types::I32);
        assert_eq!(codegen.ir_type_to_cranelift(&IrType::Bool).unwrap(), types::I8);
        assert_eq!(
            codegen
                .ir_type_to_cranelift(&IrType::I32.pointer_to().pointer_to())
                .unwrap(),
            codegen.pointer_type
        );
        assert!(codegen.ir_type_to_cranelift(&IrType::Void).is_err());
    }

    #[test]
    fn test_storage_size_follows_pointer_width() {
        let ptr = IrType::I32.pointer_to();
        assert_eq!(storage_size(&ptr, types::I64), 8);
        assert_eq!(storage_size(&ptr, types::I32), 4);
        assert_eq!(storage_size(&IrType::I32, types::I32), 4);
        assert_eq!(storage_size(&IrType::Bool, types::I64), 1);

        let codegen = CodeGenerator::new().unwrap();
        assert_eq!(
            storage_size(&ptr, codegen.pointer_type),
            codegen.pointer_type.bytes() as usize
        );
    }

    #[test]
    fn test_pointer_locals_compile() {
        let result = compile_source(
            "main() -> Int { x: Int = 3; p: *Int = &x; q: **Int = &p; return **q }",
        );
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_simple_function_compile() {
        let codegen = CodeGenerator::new().unwrap();
        let mut module = IrModule::new();

        let mut func = IrFunction::new(FuncId(0), "main".to_string(), vec![], IrType::I32);
        let entry = func.new_block();
        func.entry_block = entry;

        let result_temp = func.add_temp(IrType::I32);
        func.block_mut(entry).push_instruction(Instruction::Assign {
            dest: result_temp,
            value: RValue::Use(IrValue::i32(42)),
        });
        func.block_mut(entry)
            .set_terminator(Terminator::Return(Some(IrValue::Temp(result_temp))));
        module.add_function(func);

        let bytes = codegen.compile_module(&module).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_unterminated_block_is_rejected() {
        let codegen = CodeGenerator::new().unwrap();
        let mut module = IrModule::new();

        let mut func = IrFunction::new(FuncId(0), "broken".to_string(), vec![], IrType::Void);
        let entry = func.new_block();
        func.entry_block = entry;
        module.add_function(func);

        let err = codegen.compile_module(&module).unwrap_err();
        assert!(err.message.contains("broken"));
        assert!(err.message.contains("no terminator"));
    }

    #[test]
    fn test_recursive_function_compiles() {
        let result =
            compile_source("count(n: Int) -> Int { if n < 1 { return 0 } return n + count(n - 1) }");
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_globals_with_address_initializer_compile() {
        let source = r#"
            x: Int = 5
            flag: Int
            p: *Int = &x
            main() -> Int {
                flag = *p / 2
                return flag
            }
        "#;
        let result = compile_source(source);
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_dead_code_and_void_calls_compile() {
        let source = r#"
            touch(q: *Int) { }
            bump(q: *Int) -> Int { return *q + 1 }
            main() -> Int {
                v: Int = 0
                while v < 3 { touch(&v) v = bump(&v) }
                return v
                v = 7
            }
        "#;
        let result = compile_source(source);
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_redeclared_symbols_do_not_collide() {
        let result = compile_source("f() -> Int { return 1 }\nf() -> Int { return 2 }\nmain() -> Int { return f() }");
        assert!(result.is_ok(), "{:?}", result.err());
    }
}
