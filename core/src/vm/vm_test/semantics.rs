use super::*;
use crate::vm::{ConstPool, NameTable, OperandStack, SlotTable};

#[test]
fn test_operand_stack_lifo_and_underflow() {
    let mut stack = OperandStack::new(8);
    assert_eq!(stack.pop(), Err(ErrorKind::StackUnderflow));
    assert_eq!(stack.peek(), Err(ErrorKind::StackUnderflow));

    stack.push(Val::Int(1)).unwrap();
    stack.push(Val::Int(2)).unwrap();
    stack.push(Val::Int(3)).unwrap();
    assert_eq!(stack.peek(), Ok(&Val::Int(3)));
    assert_eq!(stack.len(), 3);

    assert_eq!(stack.pop_n(2).unwrap(), vec![Val::Int(2), Val::Int(3)]);
    assert!(stack.pop_n(0).unwrap().is_empty());

    // a failed multi-pop leaves the stack untouched
    assert_eq!(stack.pop_n(2), Err(ErrorKind::StackUnderflow));
    assert_eq!(stack.as_slice(), &[Val::Int(1)]);
    assert_eq!(stack.pop(), Ok(Val::Int(1)));
    assert!(stack.is_empty());
}

#[test]
fn test_operand_stack_limit() {
    let mut stack = OperandStack::with_capacity(64, 2);
    stack.push(Val::Nil).unwrap();
    stack.push(Val::Nil).unwrap();
    assert_eq!(stack.push(Val::Nil), Err(ErrorKind::StackOverflow { limit: 2 }));
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.limit(), 2);
}

#[test]
fn test_const_pool_reads_are_pure() {
    let pool = ConstPool::new(vec![Val::Int(7), Val::from("s")]);
    assert_eq!(pool.get(0), Ok(&Val::Int(7)));
    assert_eq!(pool.get(0), Ok(&Val::Int(7)));
    assert_eq!(pool.get(1), Ok(&Val::from("s")));
    assert_eq!(pool.get(2), Err(ErrorKind::ConstIndexOutOfRange { index: 2, len: 2 }));

    let shared = pool.clone();
    assert!(shared.shares_storage(&pool));
    assert!(!ConstPool::new(vec![Val::Int(7)]).shares_storage(&pool));
}

#[test]
fn test_name_table_lookup() {
    let names = NameTable::new(["print", "len"]);
    assert_eq!(names.get(1).unwrap().as_ref(), "len");
    assert_eq!(names.get(2), Err(ErrorKind::NameIndexOutOfRange { index: 2, len: 2 }));
    assert_eq!(names.iter().collect::<Vec<_>>(), vec!["print", "len"]);
}

#[test]
fn test_slot_table_defaults_and_bounds() {
    let mut slots = SlotTable::new(2);
    assert_eq!(slots.load(1), Ok(&Val::Nil));
    slots.store(1, Val::Bool(true)).unwrap();
    assert_eq!(slots.load(1), Ok(&Val::Bool(true)));
    assert_eq!(
        slots.store(2, Val::Nil),
        Err(ErrorKind::SlotIndexOutOfRange { index: 2, len: 2 })
    );
    assert_eq!(slots.load(9), Err(ErrorKind::SlotIndexOutOfRange { index: 9, len: 2 }));
}

#[test]
fn test_vm_equality_across_numeric_kinds() {
    let unit = assemble(
        "eq",
        0,
        vec![Val::Int(1), Val::Float(1.0)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Eq, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::Bool(true));

    // equality is total: mismatched kinds are simply unequal
    let unit = assemble(
        "ne",
        0,
        vec![Val::Int(1), Val::from("1")],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Ne, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::Bool(true));
}

#[test]
fn test_vm_ordering_rejects_mixed_kinds() {
    let unit = assemble(
        "lt",
        0,
        vec![Val::from("a"), Val::Int(1)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Lt, Op::Return],
    );
    let err = run_unit(&unit).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::TypeMismatch {
            op: "<",
            lhs: "String",
            rhs: Some("Int"),
        }
    );
    assert_eq!(err.pc, 2);
    assert_eq!(err.op, Some(Op::Lt));
}

#[test]
fn test_vm_string_concat_and_mixed_arithmetic() {
    let unit = assemble(
        "concat",
        0,
        vec![Val::from("ab"), Val::from("cd")],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Add, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::from("abcd"));

    let unit = assemble(
        "mixed",
        0,
        vec![Val::Int(1), Val::Float(0.5)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Add, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::Float(1.5));

    let unit = assemble(
        "bad",
        0,
        vec![Val::from("n="), Val::Int(1)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Add, Op::Return],
    );
    assert!(matches!(run_unit(&unit).unwrap_err().kind, ErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_vm_integer_overflow_is_fatal() {
    let unit = assemble(
        "overflow",
        0,
        vec![Val::Int(i64::MAX), Val::Int(1)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Add, Op::Return],
    );
    let err = run_unit(&unit).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArithmeticOverflow { op: "+" });
    assert_eq!(err.category(), ErrorCategory::Arithmetic);
}

#[test]
fn test_vm_min_mod_minus_one_is_zero() {
    let unit = assemble(
        "rem",
        0,
        vec![Val::Int(i64::MIN), Val::Int(-1)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Mod, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::Int(0));
}

#[test]
fn test_vm_int_float_comparison_is_exact() {
    // 2^63 rounds i64::MAX up when converted, but they are not equal
    let two_63 = 9_223_372_036_854_775_808.0;
    let unit = assemble(
        "exact",
        0,
        vec![Val::Int(i64::MAX), Val::Float(two_63)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Eq, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::Bool(false));

    let unit = assemble(
        "below",
        0,
        vec![Val::Int(i64::MAX), Val::Float(two_63)],
        vec![Op::LoadConst(0), Op::LoadConst(1), Op::Lt, Op::Return],
    );
    assert_eq!(run_unit(&unit).unwrap(), Val::Bool(true));
}

#[test]
fn test_vm_operand_stack_limit() {
    let unit = assemble(
        "deep",
        0,
        vec![],
        vec![Op::LoadNil, Op::LoadNil, Op::LoadNil, Op::Pop, Op::Pop, Op::Return],
    );
    assert_eq!(unit.max_stack(), 3);

    let mut vm = Vm::with_config(
        Arc::new(BuiltinRegistry::new()),
        VmConfig::default().with_max_stack_depth(2),
    );
    let err = vm.run(&unit, &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StackOverflow { limit: 2 });
    assert_eq!(err.pc, 2);
    assert!(vm.frames().is_empty());

    let mut vm = Vm::with_config(
        Arc::new(BuiltinRegistry::new()),
        VmConfig::default().with_max_stack_depth(3),
    );
    assert_eq!(vm.run(&unit, &[]).unwrap(), Val::Nil);
}
