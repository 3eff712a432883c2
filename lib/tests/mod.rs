//! End-to-end runs of the whole stack: il construction, per-cfg
//! fixpoints, and interprocedural resolution.

use crate::analysis::{
    AbstractState, AnalysisConfiguration, ConstantPropagation, FixpointConfiguration,
    InferredTypes, InterproceduralAnalysis, Lattice, MonolithicHeap, Prefix, TopCallResolver,
};
use crate::il::{
    expr_int, expr_str, expr_var, var, BinaryOp, Call, CfgDescriptor, ControlFlowGraph,
    Expression, Parameter, Program, Receiver, Statement, Type, TypeRegistry, UnaryOp,
};

type ConstState = AbstractState<MonolithicHeap, ConstantPropagation, InferredTypes>;
type PrefixState = AbstractState<MonolithicHeap, Prefix, InferredTypes>;

#[test]
fn constants_flow_through_two_call_levels() {
    // g(p) { return p + 1; }
    // f(p) { r = g(p); return r * 2; }
    // main { x = 5; y = f(x); }
    let mut program = Program::new(TypeRegistry::new());

    let mut g = ControlFlowGraph::new(CfgDescriptor::new(
        "g",
        vec![Parameter::new("p", Type::Int)],
        Type::Int,
    ));
    let g_ret = g
        .new_node(Statement::Return(Some(Expression::binary(
            BinaryOp::Add,
            expr_var("p"),
            expr_int(1),
        ))))
        .unwrap();
    g.set_entry(g_ret).unwrap();
    let g_id = program.add_cfg(g);

    let mut f = ControlFlowGraph::new(CfgDescriptor::new(
        "f",
        vec![Parameter::new("p", Type::Int)],
        Type::Int,
    ));
    let f_call = f
        .new_node(Statement::Call(Call::new(
            Some(var("r")),
            "g",
            None,
            vec![expr_var("p")],
        )))
        .unwrap();
    let f_ret = f
        .new_node(Statement::Return(Some(Expression::binary(
            BinaryOp::Mul,
            expr_var("r"),
            expr_int(2),
        ))))
        .unwrap();
    f.unconditional_edge(f_call, f_ret).unwrap();
    f.set_entry(f_call).unwrap();
    let f_id = program.add_cfg(f);

    let mut main = ControlFlowGraph::new(CfgDescriptor::new("main", Vec::new(), Type::Int));
    let init = main
        .new_node(Statement::assign(var("x"), expr_int(5)))
        .unwrap();
    let site = main
        .new_node(Statement::Call(Call::new(
            Some(var("y")),
            "f",
            None,
            vec![expr_var("x")],
        )))
        .unwrap();
    main.unconditional_edge(init, site).unwrap();
    main.set_entry(init).unwrap();
    let main_id = program.add_cfg(main);

    let analysis = InterproceduralAnalysis::analyze(
        &program,
        &[main_id],
        &ConstState::top(),
        AnalysisConfiguration::default(),
    )
    .unwrap();

    let result = analysis.result_of(main_id).unwrap();
    assert_eq!(
        result.state_at(site).unwrap().value().value_of(&var("y")),
        ConstantPropagation::Constant(12)
    );

    let graph = analysis.call_graph();
    assert!(graph.targets(main_id, site).unwrap().contains(&f_id));
    assert!(graph.targets(f_id, f_call).unwrap().contains(&g_id));
}

#[test]
fn branch_join_keeps_the_common_prefix() {
    // if (c) { s = "interpolation"; } else { s = "interpreter"; }
    let mut cfg = ControlFlowGraph::new(CfgDescriptor::new("branches", Vec::new(), Type::Str));
    let entry = cfg.new_node(Statement::Nop).unwrap();
    let then_arm = cfg
        .new_node(Statement::assign(var("s"), expr_str("interpolation")))
        .unwrap();
    let else_arm = cfg
        .new_node(Statement::assign(var("s"), expr_str("interpreter")))
        .unwrap();
    let join = cfg.new_node(Statement::Nop).unwrap();
    cfg.conditional_edge(entry, then_arm, expr_var("c")).unwrap();
    cfg.conditional_edge(
        entry,
        else_arm,
        Expression::unary(UnaryOp::Not, expr_var("c")),
    )
    .unwrap();
    cfg.unconditional_edge(then_arm, join).unwrap();
    cfg.unconditional_edge(else_arm, join).unwrap();
    cfg.set_entry(entry).unwrap();

    let mut program = Program::new(TypeRegistry::new());
    let id = program.add_cfg(cfg);

    let result = crate::analysis::fixpoint(
        &program,
        id,
        &PrefixState::top(),
        &FixpointConfiguration::default(),
        &mut TopCallResolver,
    )
    .unwrap();

    assert_eq!(
        result.state_at(join).unwrap().value().value_of(&var("s")),
        Prefix::new("interp")
    );
}

#[test]
fn may_dispatch_unions_the_overrides() {
    // unit A { m() { return 1; } }  unit B <: A { m() { return 2; } }
    // main { if (c) { p = alloc A; } else { p = alloc B; } y = p.m(); }
    let mut types = TypeRegistry::new();
    let a = types.insert_unit("A", None);
    let b = types.insert_unit("B", Some(a));
    let mut program = Program::new(types);

    let mut a_m = ControlFlowGraph::new(CfgDescriptor::instance("m", a, Vec::new(), Type::Int));
    let node = a_m.new_node(Statement::Return(Some(expr_int(1)))).unwrap();
    a_m.set_entry(node).unwrap();
    let a_m = program.add_cfg(a_m);

    let mut b_m = ControlFlowGraph::new(CfgDescriptor::instance("m", b, Vec::new(), Type::Int));
    let node = b_m.new_node(Statement::Return(Some(expr_int(2)))).unwrap();
    b_m.set_entry(node).unwrap();
    let b_m = program.add_cfg(b_m);

    let mut main = ControlFlowGraph::new(CfgDescriptor::new("main", Vec::new(), Type::Int));
    let entry = main.new_node(Statement::Nop).unwrap();
    let then_arm = main
        .new_node(Statement::assign(var("p"), Expression::alloc(Type::Unit(a))))
        .unwrap();
    let else_arm = main
        .new_node(Statement::assign(var("p"), Expression::alloc(Type::Unit(b))))
        .unwrap();
    let site = main
        .new_node(Statement::Call(Call::new(
            Some(var("y")),
            "m",
            Some(Receiver::new(expr_var("p"), Type::Unit(a))),
            Vec::new(),
        )))
        .unwrap();
    main.conditional_edge(entry, then_arm, expr_var("c")).unwrap();
    main.conditional_edge(
        entry,
        else_arm,
        Expression::unary(UnaryOp::Not, expr_var("c")),
    )
    .unwrap();
    main.unconditional_edge(then_arm, site).unwrap();
    main.unconditional_edge(else_arm, site).unwrap();
    main.set_entry(entry).unwrap();
    let main_id = program.add_cfg(main);

    let analysis = InterproceduralAnalysis::analyze(
        &program,
        &[main_id],
        &ConstState::top(),
        AnalysisConfiguration::default(),
    )
    .unwrap();

    // Both overrides may run, so their results join away.
    let result = analysis.result_of(main_id).unwrap();
    assert_eq!(
        result.state_at(site).unwrap().value().value_of(&var("y")),
        ConstantPropagation::Top
    );
    let targets = analysis.call_graph().targets(main_id, site).unwrap();
    assert!(targets.contains(&a_m));
    assert!(targets.contains(&b_m));
    assert_eq!(targets.len(), 2);
}

#[test]
fn more_precise_arguments_give_more_precise_results() {
    // inc(p) { return p + 1; }
    // main { a = 5; y1 = inc(a); y2 = inc(b); }  b is unknown.
    let mut program = Program::new(TypeRegistry::new());

    let mut inc = ControlFlowGraph::new(CfgDescriptor::new(
        "inc",
        vec![Parameter::new("p", Type::Int)],
        Type::Int,
    ));
    let node = inc
        .new_node(Statement::Return(Some(Expression::binary(
            BinaryOp::Add,
            expr_var("p"),
            expr_int(1),
        ))))
        .unwrap();
    inc.set_entry(node).unwrap();
    program.add_cfg(inc);

    let mut main = ControlFlowGraph::new(CfgDescriptor::new("main", Vec::new(), Type::Int));
    let init = main
        .new_node(Statement::assign(var("a"), expr_int(5)))
        .unwrap();
    let precise = main
        .new_node(Statement::Call(Call::new(
            Some(var("y1")),
            "inc",
            None,
            vec![expr_var("a")],
        )))
        .unwrap();
    let imprecise = main
        .new_node(Statement::Call(Call::new(
            Some(var("y2")),
            "inc",
            None,
            vec![expr_var("b")],
        )))
        .unwrap();
    main.unconditional_edge(init, precise).unwrap();
    main.unconditional_edge(precise, imprecise).unwrap();
    main.set_entry(init).unwrap();
    let main_id = program.add_cfg(main);

    let analysis = InterproceduralAnalysis::analyze(
        &program,
        &[main_id],
        &ConstState::top(),
        AnalysisConfiguration::default(),
    )
    .unwrap();

    let result = analysis.result_of(main_id).unwrap();
    let y1 = result
        .state_at(imprecise)
        .unwrap()
        .value()
        .value_of(&var("y1"));
    let y2 = result
        .state_at(imprecise)
        .unwrap()
        .value()
        .value_of(&var("y2"));
    assert_eq!(y1, ConstantPropagation::Constant(6));
    assert_eq!(y2, ConstantPropagation::Top);
    assert!(y1.less_or_equal(&y2).unwrap());
}

#[test]
fn programs_round_trip_through_json() {
    let mut types = TypeRegistry::new();
    let a = types.insert_unit("A", None);
    let mut program = Program::new(types);

    let mut cfg = ControlFlowGraph::new(CfgDescriptor::instance(
        "m",
        a,
        vec![Parameter::new("p", Type::Int)],
        Type::Int,
    ));
    let entry = cfg
        .new_node(Statement::assign(
            var("x"),
            Expression::binary(BinaryOp::Add, expr_var("p"), expr_int(1)),
        ))
        .unwrap();
    let exit = cfg.new_node(Statement::Return(Some(expr_var("x")))).unwrap();
    cfg.unconditional_edge(entry, exit).unwrap();
    cfg.set_entry(entry).unwrap();
    program.add_cfg(cfg);

    let serialized = serde_json::to_string(&program).unwrap();
    let deserialized: Program = serde_json::from_str(&serialized).unwrap();
    assert_eq!(program, deserialized);
}

#[test]
fn descending_phase_preserves_a_stable_fixpoint() {
    // x = 1; while (x < 10) { x = x + 1; }
    let mut cfg = ControlFlowGraph::new(CfgDescriptor::new("count", Vec::new(), Type::Int));
    let init = cfg
        .new_node(Statement::assign(var("x"), expr_int(1)))
        .unwrap();
    let head = cfg.new_node(Statement::Nop).unwrap();
    let body = cfg
        .new_node(Statement::assign(
            var("x"),
            Expression::binary(BinaryOp::Add, expr_var("x"), expr_int(1)),
        ))
        .unwrap();
    let exit = cfg.new_node(Statement::Return(Some(expr_var("x")))).unwrap();
    let guard = Expression::binary(BinaryOp::Lt, expr_var("x"), expr_int(10));
    cfg.unconditional_edge(init, head).unwrap();
    cfg.conditional_edge(head, body, guard.clone()).unwrap();
    cfg.conditional_edge(head, exit, Expression::unary(UnaryOp::Not, guard))
        .unwrap();
    cfg.unconditional_edge(body, head).unwrap();
    cfg.set_entry(init).unwrap();

    let mut program = Program::new(TypeRegistry::new());
    let id = program.add_cfg(cfg);

    let ascending = crate::analysis::fixpoint(
        &program,
        id,
        &ConstState::top(),
        &FixpointConfiguration::default(),
        &mut TopCallResolver,
    )
    .unwrap();
    let with_descending = crate::analysis::fixpoint(
        &program,
        id,
        &ConstState::top(),
        &FixpointConfiguration::default().with_descending_iterations(5),
        &mut TopCallResolver,
    )
    .unwrap();

    // The ascending result is already a fixpoint here; descending must not
    // perturb it.
    for (node, state) in ascending.states() {
        assert_eq!(with_descending.state_at(node).unwrap(), state);
    }
}
