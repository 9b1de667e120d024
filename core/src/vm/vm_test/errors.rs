use super::*;

fn divide_unit() -> Arc<Unit> {
    Unit::new(UnitParts {
        name: "divide".into(),
        arity: 1,
        n_locals: 1,
        consts: vec![Val::Int(0)],
        code: vec![Op::LoadSlot(0), Op::LoadConst(0), Op::Div, Op::Return],
        ..UnitParts::default()
    })
    .unwrap()
}

/// `name` calls `callee` with no arguments and returns its result.
fn forwarding(name: &str, callee: Arc<Unit>) -> Arc<Unit> {
    let mut b = UnitBuilder::new(name);
    let p = b.proto(callee);
    b.emit(Op::MakeClosure(p, 0));
    b.emit(Op::Call(0));
    b.emit(Op::Return);
    b.build().unwrap()
}

fn nested_failure() -> Arc<Unit> {
    let f3 = assemble(
        "f3",
        0,
        vec![Val::Int(0), Val::Int(1)],
        vec![Op::LoadConst(1), Op::LoadConst(0), Op::Div, Op::Return],
    );
    let f2 = forwarding("f2", f3);
    let f1 = forwarding("f1", f2);
    forwarding("main", f1)
}

#[test]
fn test_vm_division_by_zero_is_fatal() {
    init_tracing();
    let unit = divide_unit();
    let mut vm = empty_vm();
    let err = vm.run(&unit, &[Val::Int(10)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(err.category(), ErrorCategory::Arithmetic);
    assert_eq!(err.pc, 2);
    assert_eq!(err.op, Some(Op::Div));
    assert_eq!(err.depth, 0);
    assert!(vm.frames().is_empty());

    // the divisor is checked first, whatever the dividend
    let err = vm.run(&unit, &[Val::from("x")]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    let err = vm.run(&unit, &[Val::Float(1.5)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
}

#[test]
fn test_vm_nil_local_divided_by_zero() {
    // one local, no parameters: slot 0 is nil when DIV runs
    let unit = assemble(
        "div",
        1,
        vec![Val::Int(0)],
        vec![Op::LoadSlot(0), Op::LoadConst(0), Op::Div],
    );
    assert_eq!(unit.arity(), 0);
    let mut vm = empty_vm();
    let err = vm.run(&unit, &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(err.pc, 2);
    assert_eq!(err.op, Some(Op::Div));
    assert_eq!(err.trace_names(), vec!["div"]);
    assert!(vm.frames().is_empty());
}

#[test]
fn test_vm_error_trace_lists_every_pending_frame() {
    init_tracing();
    let err = run_unit(&nested_failure()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(err.trace_names(), vec!["f3", "f2", "f1", "main"]);
    assert_eq!(err.depth, 3);

    let pcs: Vec<usize> = err.trace.iter().map(|entry| entry.pc).collect();
    assert_eq!(pcs, vec![2, 1, 1, 1]);
    let depths: Vec<usize> = err.trace.iter().map(|entry| entry.depth).collect();
    assert_eq!(depths, vec![3, 2, 1, 0]);
}

#[test]
fn test_vm_error_display_includes_call_stack() {
    let err = run_unit(&nested_failure()).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("division by zero (at pc 2: DIV)"), "{text}");
    assert!(text.contains("Call stack:\n  [3] f3 at pc 2\n  [2] f2 at pc 1\n"), "{text}");
    assert!(text.ends_with("  [0] main at pc 1\n"), "{text}");

    let detached = empty_vm().call(&Val::Nil, &[]).unwrap_err();
    assert_eq!(detached.call_stack_report(), None);
    assert_eq!(detached.to_string(), "value of type Nil is not callable");
}

#[test]
fn test_vm_reusable_after_error() {
    let mut vm = empty_vm();
    assert!(vm.run(&nested_failure(), &[]).is_err());
    assert!(!vm.is_running());

    let ok = assemble("ok", 0, vec![Val::Int(9)], vec![Op::LoadConst(0), Op::Return]);
    assert_eq!(vm.run(&ok, &[]).unwrap(), Val::Int(9));
}

#[test]
fn test_vm_error_converts_into_anyhow() {
    fn run_host(unit: &Arc<Unit>) -> anyhow::Result<Val> {
        Ok(empty_vm().run(unit, &[Val::Int(1)])?)
    }

    let err = run_host(&divide_unit()).unwrap_err();
    let vm_err = err.downcast_ref::<VmError>().expect("VmError is preserved");
    assert_eq!(vm_err.category(), ErrorCategory::Arithmetic);
    assert_eq!(vm_err.trace_names(), vec!["divide"]);
}

#[test]
fn test_vm_config_from_json() {
    let config = VmConfig::from_json("{}").unwrap();
    assert_eq!(config, VmConfig::default());

    let config = VmConfig::from_json(r#"{"max_call_depth": 8}"#).unwrap();
    assert_eq!(config.max_call_depth, 8);
    assert_eq!(config.max_stack_depth, VmConfig::default().max_stack_depth);

    let err = VmConfig::from_json(r#"{"max_stack_depth": 0}"#).unwrap_err();
    assert!(err.to_string().contains("max_stack_depth"));

    let err = VmConfig::from_json("[1, 2").unwrap_err();
    assert!(err.to_string().contains("invalid vm config"));
}
