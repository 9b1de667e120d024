use super::*;

fn constant_fn(name: &str, arity: u16, value: i64) -> Arc<Unit> {
    let mut b = UnitBuilder::new(name).arity(arity);
    let k = b.constant(value);
    b.emit(Op::LoadConst(k));
    b.emit(Op::Return);
    b.build().unwrap()
}

/// fib(n) = n < 2 ? n : fib(n - 1) + fib(n - 2), recursing through LOAD_CALLEE.
fn fib_unit() -> Arc<Unit> {
    let mut b = UnitBuilder::new("fib").arity(1);
    let two = b.constant(2);
    let one = b.constant(1);
    b.emit(Op::LoadSlot(0));
    b.emit(Op::LoadConst(two));
    b.emit(Op::Lt);
    let recurse = b.emit(Op::JumpIfFalse(0));
    b.emit(Op::LoadSlot(0));
    b.emit(Op::Return);
    let target = b.here();
    b.patch_jump(recurse, target);
    b.emit(Op::LoadCallee);
    b.emit(Op::LoadSlot(0));
    b.emit(Op::LoadConst(one));
    b.emit(Op::Sub);
    b.emit(Op::Call(1));
    b.emit(Op::LoadCallee);
    b.emit(Op::LoadSlot(0));
    b.emit(Op::LoadConst(two));
    b.emit(Op::Sub);
    b.emit(Op::Call(1));
    b.emit(Op::Add);
    b.emit(Op::Return);
    b.build().unwrap()
}

#[test]
fn test_vm_call_return_leaves_one_result_for_every_arity() {
    for arity in 0u8..=4 {
        let callee = constant_fn("callee", arity as u16, 42);
        let mut b = UnitBuilder::new("main");
        let filler = b.constant(7);
        let p = b.proto(callee);
        b.emit(Op::LoadConst(filler));
        b.emit(Op::MakeClosure(p, 0));
        for _ in 0..arity {
            b.emit(Op::LoadConst(filler));
        }
        let call_pc = b.emit(Op::Call(arity));
        b.emit(Op::Return);
        let unit = b.build().unwrap();

        let mut vm = empty_vm();
        vm.start(&unit, &[]).unwrap();
        while vm.frames()[0].pc() != call_pc {
            assert_eq!(vm.step().unwrap(), None);
        }
        // filler + callee + args
        assert_eq!(vm.frames()[0].stack().len(), 2 + arity as usize);
        let depth_before_call_sequence = 1;

        vm.step().unwrap();
        assert_eq!(vm.frames().len(), 2, "arity {arity}");
        assert_eq!(vm.frames()[1].slots().len(), arity as usize);
        assert!(vm.frames()[1].stack().is_empty());
        while vm.frames().len() == 2 {
            assert_eq!(vm.step().unwrap(), None);
        }
        let caller = &vm.frames()[0];
        assert_eq!(caller.stack().len(), depth_before_call_sequence + 1, "arity {arity}");
        assert_eq!(caller.stack().as_slice().last(), Some(&Val::Int(42)));
        assert_eq!(vm.step().unwrap(), Some(Val::Int(42)));
    }
}

#[test]
fn test_vm_callee_gets_declared_slots() {
    let mut b = UnitBuilder::new("three").arity(1).locals(3);
    b.emit(Op::LoadSlot(2));
    b.emit(Op::Return);
    let callee = b.build().unwrap();

    let mut b = UnitBuilder::new("main");
    let arg = b.constant("arg");
    let p = b.proto(callee);
    b.emit(Op::MakeClosure(p, 0));
    b.emit(Op::LoadConst(arg));
    b.emit(Op::Call(1));
    b.emit(Op::Return);
    let unit = b.build().unwrap();

    let mut vm = empty_vm();
    vm.start(&unit, &[]).unwrap();
    while vm.frames().len() < 2 {
        vm.step().unwrap();
    }
    let frame = &vm.frames()[1];
    assert_eq!(frame.slots().len(), 3);
    assert_eq!(frame.slots().as_slice(), &[Val::from("arg"), Val::Nil, Val::Nil]);
    assert_eq!(frame.depth(), 1);
    assert_eq!(frame.unit().name(), "three");

    // unwritten slots read as nil
    let result = loop {
        if let Some(v) = vm.step().unwrap() {
            break v;
        }
    };
    assert_eq!(result, Val::Nil);
}

#[test]
fn test_vm_recursive_fib_via_load_callee() {
    let fib = fib_unit();
    let mut vm = empty_vm();
    assert_eq!(vm.run(&fib, &[Val::Int(0)]).unwrap(), Val::Int(0));
    assert_eq!(vm.run(&fib, &[Val::Int(1)]).unwrap(), Val::Int(1));
    assert_eq!(vm.run(&fib, &[Val::Int(15)]).unwrap(), Val::Int(610));
}

#[test]
fn test_vm_recursive_frames_share_unit_tables() {
    let fib = fib_unit();
    let mut vm = empty_vm();
    vm.start(&fib, &[Val::Int(5)]).unwrap();
    while vm.frames().len() < 3 {
        vm.step().unwrap();
    }
    let frames = vm.frames();
    assert!(Arc::ptr_eq(frames[0].unit(), frames[2].unit()));
    assert!(frames[0].unit().consts().shares_storage(frames[1].unit().consts()));
    assert_eq!(frames[2].slots().as_slice(), &[Val::Int(3)]);
}

#[test]
fn test_vm_closure_captures_by_copy() {
    let mut get = UnitBuilder::new("get").captures(1);
    get.emit(Op::LoadCapture(0));
    get.emit(Op::Return);
    let get = get.build().unwrap();

    let mut b = UnitBuilder::new("main").locals(2);
    let one = b.constant(1);
    let changed = b.constant(99);
    let p = b.proto(get);
    b.emit(Op::LoadConst(one));
    b.emit(Op::StoreSlot(0));
    b.emit(Op::LoadSlot(0));
    b.emit(Op::MakeClosure(p, 1));
    b.emit(Op::StoreSlot(1));
    // mutate the captured variable after the closure exists
    b.emit(Op::LoadConst(changed));
    b.emit(Op::StoreSlot(0));
    b.emit(Op::LoadSlot(1));
    b.emit(Op::Call(0));
    b.emit(Op::Return);
    let unit = b.build().unwrap();

    assert_eq!(run_unit(&unit).unwrap(), Val::Int(1));
}

#[test]
fn test_vm_returned_closure_callable_from_host() {
    let mut adder = UnitBuilder::new("adder").arity(1).captures(1);
    adder.emit(Op::LoadSlot(0));
    adder.emit(Op::LoadCapture(0));
    adder.emit(Op::Add);
    adder.emit(Op::Return);
    let adder = adder.build().unwrap();

    let mut b = UnitBuilder::new("make_adder").arity(1);
    let p = b.proto(adder);
    b.emit(Op::LoadSlot(0));
    b.emit(Op::MakeClosure(p, 1));
    b.emit(Op::Return);
    let make_adder = b.build().unwrap();

    let mut vm = empty_vm();
    let add10 = vm.run(&make_adder, &[Val::Int(10)]).unwrap();
    assert!(matches!(&add10, Val::Callable(c) if c.name() == "adder" && c.captures().len() == 1));
    assert_eq!(add10.to_string(), "<fn adder/1>");
    assert_eq!(vm.call(&add10, &[Val::Int(5)]).unwrap(), Val::Int(15));
    assert_eq!(vm.call(&add10, &[Val::Int(-10)]).unwrap(), Val::Int(0));
}

#[test]
fn test_vm_callable_arity_must_match() {
    let callee = constant_fn("pair", 2, 0);
    let mut b = UnitBuilder::new("main");
    let p = b.proto(callee);
    b.emit(Op::MakeClosure(p, 0));
    b.emit(Op::LoadNil);
    b.emit(Op::Call(1));
    b.emit(Op::Return);
    let unit = b.build().unwrap();

    let err = run_unit(&unit).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::ArityMismatch {
            callee: "pair".into(),
            expected: Arity::Exact(2),
            got: 1,
        }
    );
    assert_eq!(err.category(), ErrorCategory::Type);
    assert_eq!(err.pc, 2);

    // entry activations are checked as well
    let err = empty_vm().run(&constant_fn("pair", 2, 0), &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ArityMismatch { got: 0, .. }));
}

#[test]
fn test_vm_call_non_callable() {
    let unit = assemble("main", 0, vec![Val::Int(3)], vec![Op::LoadConst(0), Op::Call(0), Op::Return]);
    let err = run_unit(&unit).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotCallable { type_name: "Int" });

    let err = empty_vm().call(&Val::from("f"), &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotCallable { type_name: "String" });
    assert!(err.trace.is_empty());
}

#[test]
fn test_vm_call_depth_limit() {
    let forever = assemble("forever", 0, vec![], vec![Op::LoadCallee, Op::Call(0), Op::Return]);
    let mut vm = Vm::with_config(
        Arc::new(BuiltinRegistry::new()),
        VmConfig::default().with_max_call_depth(16),
    );
    let err = vm.run(&forever, &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::CallDepthExceeded { limit: 16 });
    assert_eq!(err.category(), ErrorCategory::OperandStack);
    assert_eq!(err.trace.len(), 16);
    assert_eq!(err.depth, 15);
    assert!(vm.frames().is_empty());
}
