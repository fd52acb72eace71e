//! End-to-end lowering tests: source text through the real parser into IR,
//! checked structurally and by running the reference interpreter.

use std::collections::HashSet;

use xlang_ir::interp::{InterpError, Interpreter, RuntimeValue};
use xlang_ir::*;

fn lower(source: &str) -> Result<IrModule, LowerError> {
    let program = xlang_parser::parse_source(source).expect("test source should parse");
    lower_program(&program)
}

fn lower_ok(source: &str) -> IrModule {
    let module = lower(source).unwrap_or_else(|err| panic!("lowering failed: {}", err));
    module.verify().expect("lowered module should verify");
    module
}

fn lower_err(source: &str) -> LowerErrorKind {
    lower(source).expect_err("lowering should fail").kind
}

fn run(module: &IrModule, entry: &str, args: &[i32]) -> Option<i32> {
    Interpreter::new(module)
        .call(entry, args)
        .expect("execution should succeed")
        .and_then(|value| value.as_int())
}

fn reachable_from(func: &IrFunction, start: BlockId) -> HashSet<BlockId> {
    let mut seen = HashSet::new();
    let mut worklist = vec![start];
    while let Some(id) = worklist.pop() {
        if seen.insert(id) {
            worklist.extend(func.block(id).successors());
        }
    }
    seen
}

#[test]
fn test_well_typed_program_verifies() {
    let source = r#"
        limit: Int = 10
        total: Int
        cursor: *Int = &total

        square(x: Int) -> Int { return x * x }

        accumulate(n: Int) {
            i: Int = 0
            while i < n {
                total = total + square(i)
                i = i + 1
            }
        }

        pick(a: Int, b: Int) -> Int {
            if a > b { return a } else { return b }
        }

        main() -> Int {
            accumulate(limit)
            p: *Int = cursor
            return pick(*p, -1) / 5
        }
    "#;
    let module = lower_ok(source);
    assert_eq!(module.functions.len(), 4);
    assert_eq!(module.globals.len(), 3);
    // 0 + 1 + 4 + ... + 81 = 285
    assert_eq!(run(&module, "main", &[]), Some(57));
}

#[test]
fn test_declared_value_round_trips_through_storage() {
    let module = lower_ok("main() -> Int { x: Int = 5; return x }");
    let main = module.find_function("main").unwrap();

    let stored = main.instructions().any(|instr| {
        matches!(instr, Instruction::Store { ptr: Value::Local(_), value: Value::Const(Constant::I32(5)) })
    });
    let loaded = main
        .instructions()
        .any(|instr| matches!(instr, Instruction::Load { ptr: Value::Local(_), .. }));
    assert!(stored);
    assert!(loaded);
    assert_eq!(run(&module, "main", &[]), Some(5));
}

#[test]
fn test_redeclaration_replaces_binding() {
    let module = lower_ok("main() -> Int { x: Int = 1; x: Int = 2; return x }");
    let main = module.find_function("main").unwrap();

    assert_eq!(main.locals.len(), 2);
    let loads: Vec<_> = main
        .instructions()
        .filter_map(|instr| match instr {
            Instruction::Load { ptr: Value::Local(slot), .. } => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(loads, vec![LocalId(1)]);
    assert_eq!(run(&module, "main", &[]), Some(2));
}

#[test]
fn test_redeclared_parameter_shadows_in_body() {
    let module = lower_ok("f(n: Int) -> Int { n: Int = n + 1; return n }");
    assert_eq!(run(&module, "f", &[41]), Some(42));
}

#[test]
fn test_nested_block_declarations_do_not_escape() {
    let kind = lower_err("f() -> Int { if 1 < 2 { y: Int = 1 } return y }");
    assert_eq!(kind, LowerErrorKind::UndeclaredIdentifier { name: "y".to_string() });

    let kind = lower_err("f() -> Int { while 1 < 2 y: Int = 1 return y }");
    assert_eq!(kind, LowerErrorKind::UndeclaredIdentifier { name: "y".to_string() });

    let kind = lower_err("f() -> Int { { z: Int = 3 } return z }");
    assert_eq!(kind, LowerErrorKind::UndeclaredIdentifier { name: "z".to_string() });
}

#[test]
fn test_call_arity_and_argument_types() {
    let kind = lower_err("g(a: Int) -> Int { return a }\nf() -> Int { return g(1, 2) }");
    assert_eq!(
        kind,
        LowerErrorKind::ArityMismatch {
            callee: "g".to_string(),
            expected: 1,
            found: 2,
        }
    );

    let kind = lower_err("g(a: Int) -> Int { return a }\nf() -> Int { x: Int = 1; return g(&x) }");
    assert!(matches!(kind, LowerErrorKind::TypeMismatch { .. }));

    let kind = lower_err("g(p: *Int) { }\nf() { x: Int = 1; g(x) }");
    assert!(matches!(kind, LowerErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_false_while_condition_never_enters_body() {
    let module = lower_ok("main() -> Int { x: Int = 0; while 1 < 0 { x = x + 1 } return x }");
    let main = module.find_function("main").unwrap();

    let (body, exit) = main
        .blocks
        .iter()
        .find_map(|block| match &block.terminator {
            Some(Terminator::Branch { then_block, else_block, .. }) => Some((*then_block, *else_block)),
            _ => None,
        })
        .expect("loop test block");

    assert!(!reachable_from(main, exit).contains(&body));

    let mut interp = Interpreter::new(&module);
    assert_eq!(interp.call("main", &[]), Ok(Some(RuntimeValue::Int(0))));
    assert!(!interp.entered_block(main.id, body));
    assert!(interp.entered_block(main.id, exit));
}

#[test]
fn test_missing_return_is_an_error() {
    let kind = lower_err("f() -> Int { x: Int = 1 }");
    assert_eq!(kind, LowerErrorKind::MissingReturn { function: "f".to_string() });

    let kind = lower_err("f(n: Int) -> Int { if n < 1 { return 0 } }");
    assert!(matches!(kind, LowerErrorKind::MissingReturn { .. }));

    let kind = lower_err("f() -> Int { return }");
    assert!(matches!(kind, LowerErrorKind::MissingReturn { .. }));
}

#[test]
fn test_both_branches_returning_is_complete() {
    let module = lower_ok("sign(n: Int) -> Int { if n < 0 { return -1 } else { return 1 } }");
    let sign = module.find_function("sign").unwrap();
    assert!(sign
        .blocks
        .iter()
        .any(|block| block.terminator == Some(Terminator::Unreachable)));
    assert_eq!(run(&module, "sign", &[-4]), Some(-1));
    assert_eq!(run(&module, "sign", &[4]), Some(1));
}

#[test]
fn test_void_function_gets_implicit_return() {
    let module = lower_ok("g: Int\nset(v: Int) { if v > 0 { g = v } }");
    let set = module.find_function("set").unwrap();
    assert!(set
        .blocks
        .iter()
        .any(|block| block.terminator == Some(Terminator::Return(None))));
}

#[test]
fn test_count_example() {
    let module = lower_ok("count(n: Int) -> Int { if n < 1 { return 0 } return n + count(n - 1) }");
    let count = module.find_function("count").unwrap();

    assert_eq!(count.params.len(), 1);
    assert_eq!(count.blocks.len(), 3);

    let comparisons = count
        .instructions()
        .filter(|instr| matches!(instr, Instruction::Assign { value: RValue::BinaryOp { op, .. }, .. } if op.is_comparison()))
        .count();
    assert_eq!(comparisons, 1);

    let callees: Vec<FuncId> = count
        .instructions()
        .filter_map(|instr| match instr {
            Instruction::Call { func, .. } => Some(*func),
            _ => None,
        })
        .collect();
    assert_eq!(callees, vec![count.id]);

    assert_eq!(run(&module, "count", &[10]), Some(55));
}

#[test]
fn test_calls_to_later_functions_fail_by_default() {
    let kind = lower_err("f() -> Int { return g() }\ng() -> Int { return 1 }");
    assert_eq!(kind, LowerErrorKind::UndeclaredIdentifier { name: "g".to_string() });
}

#[test]
fn test_expression_type_errors() {
    assert!(matches!(
        lower_err("f() -> Int { x: Int = 1; return *x }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        lower_err("f() -> Int { x: Int = 1; return &x }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        lower_err("f() -> Int { return 1 < 2 }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        lower_err("f() { if 1 { } }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        lower_err("f() { x: Int = 1; p: *Int = &x; x = p }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        lower_err("v() { }\nf() -> Int { return v() + 1 }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        lower_err("f() -> Int { x: Int = 1; p: *Int = &x; return p * 2 }"),
        LowerErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_pointer_int_mixing_names_the_context() {
    let cases = [
        ("f() { x: Int = 1; y: Int = &x }", "initializer of `y`"),
        ("f() { x: Int = 1; p: *Int = x }", "initializer of `p`"),
        ("f(p: *Int) -> Int { return -p }", "operand of unary `-`"),
        ("f(p: *Int) { if p < 1 { } }", "operand of `<`"),
        ("f(p: *Int) { y: Int = p == p }", "operand of `==`"),
    ];

    for (source, expected_context) in cases {
        match lower_err(source) {
            LowerErrorKind::TypeMismatch { context, .. } => {
                assert!(context.contains(expected_context), "{}: got context {:?}", source, context)
            }
            other => panic!("{}: expected a type mismatch, got {:?}", source, other),
        }
    }
}

#[test]
fn test_unsupported_lvalues() {
    assert!(matches!(
        lower_err("f() { p: *Int = &(1 + 2) }"),
        LowerErrorKind::UnsupportedLValue { .. }
    ));
    assert!(matches!(
        lower_err("f(p: *Int) { q: *Int = &*p }"),
        LowerErrorKind::UnsupportedLValue { .. }
    ));
    assert!(matches!(
        lower_err("g() -> Int { return 1 }\nf() { p: *Int = &g() }"),
        LowerErrorKind::UnsupportedLValue { .. }
    ));
}

#[test]
fn test_address_of_parenthesized_name() {
    let module = lower_ok("f() -> Int { x: Int = 9; p: *Int = &(x); return *p }");
    assert_eq!(run(&module, "f", &[]), Some(9));
}

#[test]
fn test_not_callable_and_unknown_type() {
    assert_eq!(
        lower_err("f() { x: Int = 1; x() }"),
        LowerErrorKind::NotCallable { name: "x".to_string() }
    );
    assert_eq!(
        lower_err("f(x: Float) { }"),
        LowerErrorKind::UnknownType { name: "Float".to_string() }
    );
    assert_eq!(
        lower_err("f() { p: Pointer<Bool> }"),
        LowerErrorKind::UnknownType { name: "Bool".to_string() }
    );
}

#[test]
fn test_code_after_return_is_still_checked() {
    let kind = lower_err("f() -> Int { return 1; return missing }");
    assert_eq!(kind, LowerErrorKind::UndeclaredIdentifier { name: "missing".to_string() });

    let module = lower_ok("f() -> Int { return 1; x: Int = 2; return x }");
    let f = module.find_function("f").unwrap();
    assert_eq!(f.blocks.len(), 2);
    assert_eq!(run(&module, "f", &[]), Some(1));
}

#[test]
fn test_error_spans_point_at_offending_node() {
    let source = "f() -> Int { return undefined_name }";
    let err = lower(source).unwrap_err();
    assert_eq!(&source[err.span.start..err.span.end], "undefined_name");
}

#[test]
fn test_textual_ir_is_deterministic() {
    let source = "g: Int = 3\nmain() -> Int { if g > 2 { return g } return 0 }";
    let first = lower_ok(source).to_text();
    let second = lower_ok(source).to_text();
    assert_eq!(first, second);
    assert!(first.contains("global0 g: i32 = 3"));
    assert!(first.contains("icmp sgt"));
    assert!(first.contains("br _temp1, bb1, bb2"));
}

#[test]
fn test_runtime_errors_surface_from_interpreter() {
    let module = lower_ok("f(a: Int) -> Int { return 10 / a }");
    assert_eq!(Interpreter::new(&module).call("f", &[0]), Err(InterpError::DivisionByZero));
}
