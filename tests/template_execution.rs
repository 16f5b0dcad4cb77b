//! Execution tests for compiled templates: call-site caching, in-place
//! mutation of host values, assignment suppression, iteration sections, and
//! the unresolvable-reference rendering contract.

use std::any::Any;

use velvet::{
    BindingEvent, Context, HostRegistry, HostTypeEntry, MethodCandidate, NativeFn, Node,
    ObjectHandle, PropertyCandidate, RuntimeError, Section, Span, Template, TemplateGraph,
    TypeHash, Value, compile_assignment, compile_foreach, primitives,
};

fn object<T: Any + Send + Sync>(type_name: &str, value: T) -> (ObjectHandle, Value) {
    let handle = ObjectHandle::new(TypeHash::from_name(type_name), type_name, value);
    let value = Value::Object(handle.clone());
    (handle, value)
}

// =============================================================================
// Boxing: mutation through a variable acts on shared storage
// =============================================================================

#[derive(Clone)]
struct TallyHost {
    calls: i32,
}

fn tally_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::new("Tally")
                .with_property(PropertyCandidate::readonly::<TallyHost>(
                    "CallCount",
                    primitives::INT32,
                    |tally| {
                        let current = tally.calls;
                        tally.calls += 1;
                        Value::I32(current)
                    },
                ))
                .with_method(MethodCandidate::new(
                    "GetCallCount",
                    vec![],
                    primitives::INT32,
                    NativeFn::typed::<TallyHost>("GetCallCount", |tally, _| {
                        let current = tally.calls;
                        tally.calls += 1;
                        Ok(Value::I32(current))
                    }),
                )),
        )
        .unwrap();
    registry
}

#[test]
fn repeated_property_reads_observe_cumulative_mutation() {
    let registry = tally_registry();

    let mut graph = TemplateGraph::new();
    let mut roots = Vec::new();
    for i in 0..3 {
        if i > 0 {
            roots.push(graph.text(", "));
        }
        let target = graph.reference("x");
        let read = graph.property(target, "CallCount");
        roots.push(graph.output(read, "$x.CallCount"));
    }
    let template = Template::new(graph, roots);

    let (handle, value) = object("Tally", TallyHost { calls: 0 });
    let mut ctx = Context::new();
    ctx.set("x", value);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "0, 1, 2");
    assert_eq!(handle.extract::<TallyHost>().unwrap().calls, 3);
}

#[test]
fn repeated_method_calls_observe_cumulative_mutation() {
    let registry = tally_registry();

    let mut graph = TemplateGraph::new();
    let mut roots = Vec::new();
    for i in 0..3 {
        if i > 0 {
            roots.push(graph.text(", "));
        }
        let target = graph.reference("x");
        let call = graph.method_call(target, "GetCallCount", vec![]);
        roots.push(graph.output(call, "$x.GetCallCount()"));
    }
    let template = Template::new(graph, roots);

    let (handle, value) = object("Tally", TallyHost { calls: 0 });
    let mut ctx = Context::new();
    ctx.set("x", value);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "0, 1, 2");
    assert_eq!(handle.extract::<TallyHost>().unwrap().calls, 3);
}

// =============================================================================
// Monomorphic call-site cache
// =============================================================================

struct GreeterHost {
    word: String,
}

struct RobotHost;

fn greeter_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry
        .register_type(HostTypeEntry::new("Greeter").with_method(MethodCandidate::new(
            "Greet",
            vec![],
            primitives::STRING,
            NativeFn::typed::<GreeterHost>("Greet", |greeter, _| {
                Ok(Value::Str(greeter.word.clone()))
            }),
        )))
        .unwrap();
    registry
        .register_type(HostTypeEntry::new("Robot").with_method(MethodCandidate::new(
            "Greet",
            vec![],
            primitives::STRING,
            NativeFn::typed::<RobotHost>("Greet", |_, _| Ok(Value::Str("beep".to_string()))),
        )))
        .unwrap();
    registry
}

#[test]
fn stable_type_binds_once_and_type_change_evicts() {
    let registry = greeter_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("x");
    let call = graph.method_call(target, "Greet", vec![]);
    let out = graph.output(call, "$x.Greet()");
    let template = Template::new(graph, vec![out]);

    let (_, greeter) = object("Greeter", GreeterHost { word: "hi".to_string() });
    let (_, robot) = object("Robot", RobotHost);

    let site = template
        .graph()
        .sites()
        .map(|(_, site)| site)
        .next()
        .unwrap();
    assert_eq!(site.bind_count(), 0);

    let mut ctx = Context::new();
    ctx.set("x", greeter.clone());
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "hi");
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "hi");
    // Second render with the same observed type is a cache hit.
    assert_eq!(site.bind_count(), 1);

    // A different observed type rebinds exactly once...
    ctx.set("x", robot);
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "beep");
    assert_eq!(site.bind_count(), 2);

    // ...and evicted the old entry, so the original type rebinds again.
    ctx.set("x", greeter);
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "hi");
    assert_eq!(site.bind_count(), 3);
}

// =============================================================================
// Unresolvable references render as their literal source text
// =============================================================================

#[test]
fn unresolved_member_renders_literal_text_and_records_event() {
    let registry = greeter_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("x");
    let read = graph.property(target, "Missing");
    let out = graph.output(read, "$x.Missing");
    let template = Template::new(graph, vec![out]);

    let (_, greeter) = object("Greeter", GreeterHost { word: "hi".to_string() });
    let mut ctx = Context::new();
    ctx.set("x", greeter);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "$x.Missing");
    assert_eq!(
        rendered.events,
        vec![BindingEvent::GetMemberFailure {
            member: "Missing".to_string(),
            target_type: "Greeter".to_string(),
        }]
    );
}

#[test]
fn unbound_variable_renders_literal_text() {
    let registry = HostRegistry::new();

    let mut graph = TemplateGraph::new();
    let reference = graph.reference("nobody");
    let out = graph.output(reference, "$nobody");
    let template = Template::new(graph, vec![out]);

    let rendered = template.render(&registry, &mut Context::new()).unwrap();
    assert_eq!(rendered.text, "$nobody");
}

#[test]
fn ambiguous_invocation_renders_literal_text_and_records_event() {
    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::new("Xlator")
                .with_method(MethodCandidate::new(
                    "t",
                    vec![primitives::OBJECT, primitives::STRING],
                    primitives::STRING,
                    NativeFn::new(|_, _| Ok(Value::Str("a".to_string()))),
                ))
                .with_method(MethodCandidate::new(
                    "t",
                    vec![primitives::STRING, primitives::OBJECT],
                    primitives::STRING,
                    NativeFn::new(|_, _| Ok(Value::Str("b".to_string()))),
                )),
        )
        .unwrap();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("x");
    let first = graph.literal("one");
    let second = graph.literal("two");
    let call = graph.method_call(target, "t", vec![first, second]);
    let out = graph.output(call, "$x.t(\"one\", \"two\")");
    let template = Template::new(graph, vec![out]);

    let (_, xlator) = object("Xlator", ());
    let mut ctx = Context::new();
    ctx.set("x", xlator);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "$x.t(\"one\", \"two\")");
    assert!(matches!(
        rendered.events.as_slice(),
        [BindingEvent::InvokeMemberAmbiguous { member, .. }] if member == "t"
    ));
}

// =============================================================================
// Member resolution details
// =============================================================================

struct BagHost {
    name: String,
    color: String,
}

fn bag_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::new("Bag")
                .with_property(PropertyCandidate::readonly::<BagHost>(
                    "Name",
                    primitives::STRING,
                    |bag| Value::Str(bag.name.clone()),
                ))
                .with_indexer_get(MethodCandidate::new(
                    "Item",
                    vec![primitives::STRING],
                    primitives::OBJECT,
                    NativeFn::typed::<BagHost>("Item", |bag, args| match &args[0] {
                        Value::Str(key) if key == "color" => Ok(Value::Str(bag.color.clone())),
                        _ => Ok(Value::Null),
                    }),
                )),
        )
        .unwrap();
    registry
}

#[test]
fn property_lookup_is_case_insensitive() {
    let registry = bag_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("bag");
    let read = graph.property(target, "name");
    let out = graph.output(read, "$bag.name");
    let template = Template::new(graph, vec![out]);

    let (_, bag) = object("Bag", BagHost { name: "satchel".to_string(), color: "red".to_string() });
    let mut ctx = Context::new();
    ctx.set("bag", bag);

    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "satchel");
}

#[test]
fn member_read_falls_back_to_string_indexer() {
    let registry = bag_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("bag");
    let read = graph.property(target, "color");
    let out = graph.output(read, "$bag.color");
    let template = Template::new(graph, vec![out]);

    let (_, bag) = object("Bag", BagHost { name: "satchel".to_string(), color: "red".to_string() });
    let mut ctx = Context::new();
    ctx.set("bag", bag);

    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "red");
}

#[test]
fn map_values_answer_member_and_index_reads() {
    let registry = HostRegistry::new();

    let mut graph = TemplateGraph::new();
    let name_value = graph.literal("Ada");
    let map = graph.add_expr(velvet::Expr::MapLiteral(vec![(
        "name".to_string(),
        name_value,
    )]));
    let by_member = graph.property(map, "name");
    let out_member = graph.output(by_member, "$person.name");

    let map_again = graph.add_expr(velvet::Expr::MapLiteral(vec![(
        "name".to_string(),
        name_value,
    )]));
    let key = graph.literal("name");
    let by_index = graph.index(map_again, vec![key]);
    let out_index = graph.output(by_index, "$person[\"name\"]");

    let template = Template::new(graph, vec![out_member, out_index]);
    let rendered = template.render(&registry, &mut Context::new()).unwrap();
    assert_eq!(rendered.text, "AdaAda");
}

// =============================================================================
// Invocation: widening, rest packing, void substitution, null-aware selection
// =============================================================================

#[test]
fn arguments_widen_to_the_declared_parameter() {
    let mut registry = HostRegistry::new();
    registry
        .register_type(HostTypeEntry::new("Meter").with_method(MethodCandidate::new(
            "Record",
            vec![primitives::INT64],
            primitives::STRING,
            NativeFn::new(|_, args| Ok(Value::Str(args[0].type_name()))),
        )))
        .unwrap();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("m");
    let arg = graph.literal(Value::I32(5));
    let call = graph.method_call(target, "Record", vec![arg]);
    let out = graph.output(call, "$m.Record(5)");
    let template = Template::new(graph, vec![out]);

    let (_, meter) = object("Meter", ());
    let mut ctx = Context::new();
    ctx.set("m", meter);

    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "int64");
}

fn joiner_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry
        .register_type(HostTypeEntry::new("Joiner").with_method(
            MethodCandidate::new(
                "Join",
                vec![primitives::STRING],
                primitives::STRING,
                NativeFn::new(|_, args| {
                    let Value::Str(separator) = &args[0] else {
                        return Err(RuntimeError::HostFault {
                            member: "Join".to_string(),
                            message: "separator must be a string".to_string(),
                        });
                    };
                    let Value::List(values) = &args[1] else {
                        return Err(RuntimeError::HostFault {
                            member: "Join".to_string(),
                            message: "rest arguments must arrive as a list".to_string(),
                        });
                    };
                    let joined = values
                        .iter()
                        .map(|value| value.to_string())
                        .collect::<Vec<_>>()
                        .join(separator);
                    Ok(Value::Str(joined))
                }),
            )
            .with_rest(primitives::INT64),
        ))
        .unwrap();
    registry
}

#[test]
fn surplus_arguments_pack_into_a_rest_list() {
    let registry = joiner_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("j");
    let separator = graph.literal(", ");
    let one = graph.literal(Value::I32(1));
    let two = graph.literal(Value::I32(2));
    let three = graph.literal(Value::I32(3));
    let call = graph.method_call(target, "Join", vec![separator, one, two, three]);
    let out = graph.output(call, "$j.Join(...)");
    let template = Template::new(graph, vec![out]);

    let (_, joiner) = object("Joiner", ());
    let mut ctx = Context::new();
    ctx.set("j", joiner);

    // Each packed argument was widened to the declared element type.
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "1, 2, 3");
}

#[test]
fn an_explicit_list_passes_through_unpacked() {
    let registry = joiner_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("j");
    let separator = graph.literal("-");
    let list = graph.literal(Value::List(vec![Value::I64(4), Value::I64(5)]));
    let call = graph.method_call(target, "Join", vec![separator, list]);
    let out = graph.output(call, "$j.Join(\"-\", $values)");
    let template = Template::new(graph, vec![out]);

    let (_, joiner) = object("Joiner", ());
    let mut ctx = Context::new();
    ctx.set("j", joiner);

    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "4-5");
}

#[test]
fn void_members_render_as_the_empty_string() {
    #[derive(Clone)]
    struct DoorHost {
        closed: bool,
    }

    let mut registry = HostRegistry::new();
    registry
        .register_type(HostTypeEntry::new("Door").with_method(MethodCandidate::new(
            "Close",
            vec![],
            primitives::VOID,
            NativeFn::typed::<DoorHost>("Close", |door, _| {
                door.closed = true;
                Ok(Value::Null)
            }),
        )))
        .unwrap();

    let mut graph = TemplateGraph::new();
    let open = graph.text("[");
    let target = graph.reference("door");
    let call = graph.method_call(target, "Close", vec![]);
    let out = graph.output(call, "$door.Close()");
    let close = graph.text("]");
    let template = Template::new(graph, vec![open, out, close]);

    let (handle, door) = object("Door", DoorHost { closed: false });
    let mut ctx = Context::new();
    ctx.set("door", door);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "[]");
    assert!(handle.extract::<DoorHost>().unwrap().closed);
}

#[test]
fn null_argument_drives_overload_selection_at_runtime() {
    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::new("Printer")
                .with_method(MethodCandidate::new(
                    "Print",
                    vec![primitives::INT32],
                    primitives::STRING,
                    NativeFn::new(|_, _| Ok(Value::Str("via int".to_string()))),
                ))
                .with_method(MethodCandidate::new(
                    "Print",
                    vec![primitives::STRING],
                    primitives::STRING,
                    NativeFn::new(|_, args| {
                        Ok(Value::Str(format!("via string, got {}", args[0].type_name())))
                    }),
                )),
        )
        .unwrap();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("p");
    let arg = graph.literal(Value::Null);
    let call = graph.method_call(target, "Print", vec![arg]);
    let out = graph.output(call, "$p.Print($null)");
    let template = Template::new(graph, vec![out]);

    let (_, printer) = object("Printer", ());
    let mut ctx = Context::new();
    ctx.set("p", printer);

    assert_eq!(
        template.render(&registry, &mut ctx).unwrap().text,
        "via string, got null"
    );
}

// =============================================================================
// Assignment
// =============================================================================

#[derive(Clone)]
struct ProfileHost {
    town: String,
}

fn profile_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry
        .register_type(HostTypeEntry::new("Profile").with_property(
            PropertyCandidate::read_write::<ProfileHost>(
                "Town",
                primitives::STRING,
                |profile| Value::Str(profile.town.clone()),
                |profile, value| {
                    if let Value::Str(town) = value {
                        profile.town = town;
                    }
                },
            ),
        ))
        .unwrap();
    registry
}

fn property_set_template(rhs_of: impl FnOnce(&mut TemplateGraph) -> velvet::ExprId) -> Template {
    let mut graph = TemplateGraph::new();
    let target = graph.reference("p");
    let lhs = graph.property(target, "Town");
    let rhs = rhs_of(&mut graph);
    let assignment = compile_assignment(&mut graph, lhs, rhs, Span::default()).unwrap();
    let set = graph.add_node(Node::Set(assignment));
    Template::new(graph, vec![set])
}

#[test]
fn absent_rhs_leaves_property_unchanged() {
    let registry = profile_registry();
    let (handle, profile) = object("Profile", ProfileHost { town: "Ume\u{e5}".to_string() });

    // RHS is an unbound reference: evaluates to no value.
    let template = property_set_template(|graph| graph.reference("missing"));
    let mut ctx = Context::new();
    ctx.set("p", profile.clone());
    template.render(&registry, &mut ctx).unwrap();
    assert_eq!(handle.extract::<ProfileHost>().unwrap().town, "Ume\u{e5}");

    // RHS is literal null: also suppressed.
    let template = property_set_template(|graph| graph.literal(Value::Null));
    let mut ctx = Context::new();
    ctx.set("p", profile.clone());
    template.render(&registry, &mut ctx).unwrap();
    assert_eq!(handle.extract::<ProfileHost>().unwrap().town, "Ume\u{e5}");

    // A present RHS overwrites.
    let template = property_set_template(|graph| graph.literal("Berlin"));
    let mut ctx = Context::new();
    ctx.set("p", profile);
    template.render(&registry, &mut ctx).unwrap();
    assert_eq!(handle.extract::<ProfileHost>().unwrap().town, "Berlin");
}

#[test]
fn direct_variable_store_does_not_suppress_null() {
    let registry = HostRegistry::new();

    let mut graph = TemplateGraph::new();
    let lhs = graph.reference("v");
    let rhs = graph.literal(Value::Null);
    let assignment = compile_assignment(&mut graph, lhs, rhs, Span::default()).unwrap();
    let set = graph.add_node(Node::Set(assignment));
    let template = Template::new(graph, vec![set]);

    let mut ctx = Context::new();
    ctx.set("v", Value::I32(7));
    template.render(&registry, &mut ctx).unwrap();
    assert_eq!(ctx.get("v"), Some(&Value::Null));
}

#[test]
fn unassignable_lhs_is_a_recorded_noop() {
    let registry = greeter_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("x");
    let lhs = graph.method_call(target, "Greet", vec![]);
    let rhs = graph.literal("ignored");
    let assignment = compile_assignment(&mut graph, lhs, rhs, Span::default()).unwrap();
    let set = graph.add_node(Node::Set(assignment));
    let template = Template::new(graph, vec![set]);

    let (_, greeter) = object("Greeter", GreeterHost { word: "hi".to_string() });
    let mut ctx = Context::new();
    ctx.set("x", greeter);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert!(matches!(
        rendered.events.as_slice(),
        [BindingEvent::AssignmentDropped { .. }]
    ));
}

#[test]
fn assignment_to_global_fails_compilation() {
    let mut graph = TemplateGraph::new();
    let lhs = graph.global_reference("request");
    let rhs = graph.literal(Value::I32(1));
    let error = compile_assignment(&mut graph, lhs, rhs, Span::new(2, 9, 8)).unwrap_err();
    assert!(matches!(
        error,
        velvet::CompilationError::AssignmentToGlobal { ref name, .. } if name == "request"
    ));
}

#[test]
fn indexer_write_goes_through_the_binder() {
    #[derive(Clone)]
    struct GridHost {
        cells: Vec<String>,
    }

    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::new("Grid")
                .with_indexer_get(MethodCandidate::new(
                    "Item",
                    vec![primitives::INT32],
                    primitives::STRING,
                    NativeFn::typed::<GridHost>("Item", |grid, args| {
                        let index = args[0].as_i64().unwrap_or(0) as usize;
                        Ok(grid.cells.get(index).cloned().map(Value::Str).unwrap_or(Value::Null))
                    }),
                ))
                .with_indexer_set(MethodCandidate::new(
                    "Item",
                    vec![primitives::INT32, primitives::STRING],
                    primitives::VOID,
                    NativeFn::typed::<GridHost>("Item", |grid, args| {
                        let index = args[0].as_i64().unwrap_or(0) as usize;
                        if let Value::Str(cell) = &args[1] {
                            if index < grid.cells.len() {
                                grid.cells[index] = cell.clone();
                            }
                        }
                        Ok(Value::Null)
                    }),
                )),
        )
        .unwrap();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("grid");
    let index = graph.literal(Value::I32(1));
    let lhs = graph.index(target, vec![index]);
    let rhs = graph.literal("set");
    let assignment = compile_assignment(&mut graph, lhs, rhs, Span::default()).unwrap();
    let set = graph.add_node(Node::Set(assignment));

    let read_target = graph.reference("grid");
    let read_index = graph.literal(Value::I32(1));
    let read = graph.index(read_target, vec![read_index]);
    let out = graph.output(read, "$grid[1]");
    let template = Template::new(graph, vec![set, out]);

    let (handle, grid) = object(
        "Grid",
        GridHost { cells: vec!["a".to_string(), "b".to_string()] },
    );
    let mut ctx = Context::new();
    ctx.set("grid", grid);

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "set");
    assert_eq!(handle.extract::<GridHost>().unwrap().cells, vec!["a", "set"]);
}

// =============================================================================
// Iteration sections
// =============================================================================

struct LoopSections<'a> {
    sections: Vec<(Section, &'a str)>,
    print_item: bool,
}

/// Build a sectioned loop over `$items` with per-section literal text, plus
/// (optionally) an `each` section that prints the current item.
fn loop_template(spec: LoopSections<'_>) -> Template {
    let mut graph = TemplateGraph::new();
    let mut body = Vec::new();
    if spec.print_item {
        let item_ref = graph.reference("it");
        body.push(graph.output(item_ref, "$it"));
    }
    for (section, text) in spec.sections {
        body.push(graph.add_node(Node::SectionMarker(section)));
        body.push(graph.text(text));
    }

    let source = graph.reference("items");
    let item = graph.reference("it");
    let each = compile_foreach(&graph, source, item, "count", &body, Span::default()).unwrap();
    let root = graph.add_node(Node::Foreach(each));
    Template::new(graph, vec![root])
}

fn items(values: &[&str]) -> Value {
    Value::List(values.iter().map(|v| Value::Str(v.to_string())).collect())
}

#[test]
fn sections_dispatch_in_order() {
    // Sections defined: before, each, between, after. Expected execution for
    // a three-element source: before, each(1), between, each(2), between,
    // each(3), after.
    let template = loop_template(LoopSections {
        sections: vec![
            (Section::Before, "<"),
            (Section::Between, ","),
            (Section::After, ">"),
        ],
        print_item: true,
    });

    let registry = HostRegistry::new();
    let mut ctx = Context::new();
    ctx.set("items", items(&["a", "b", "c"]));

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "<a,b,c>");
}

#[test]
fn odd_and_even_follow_one_based_parity() {
    let template = loop_template(LoopSections {
        sections: vec![(Section::Odd, "O"), (Section::Even, "E")],
        print_item: true,
    });

    let registry = HostRegistry::new();
    let mut ctx = Context::new();
    ctx.set("items", items(&["1", "2", "3"]));

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "O1E2O3");
}

#[test]
fn before_all_and_after_all_wrap_the_loop_once() {
    let template = loop_template(LoopSections {
        sections: vec![
            (Section::BeforeAll, "{"),
            (Section::Before, "<"),
            (Section::After, ">"),
            (Section::AfterAll, "}"),
        ],
        print_item: true,
    });

    let registry = HostRegistry::new();
    let mut ctx = Context::new();
    ctx.set("items", items(&["a", "b"]));

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "{<ab>}");
}

#[test]
fn empty_source_runs_only_no_data() {
    let template = loop_template(LoopSections {
        sections: vec![
            (Section::BeforeAll, "{"),
            (Section::AfterAll, "}"),
            (Section::NoData, "none"),
        ],
        print_item: true,
    });

    let registry = HostRegistry::new();
    let mut ctx = Context::new();
    ctx.set("items", Value::List(vec![]));

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "none");
}

#[test]
fn non_enumerable_source_runs_only_no_data() {
    let template = loop_template(LoopSections {
        sections: vec![(Section::NoData, "none")],
        print_item: true,
    });

    let registry = HostRegistry::new();

    let mut ctx = Context::new();
    ctx.set("items", Value::I32(5));
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "none");

    // The absent case counts as non-enumerable.
    let mut ctx = Context::new();
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "none");
}

#[test]
fn loop_index_is_one_based_and_bindings_are_restored() {
    let mut graph = TemplateGraph::new();
    let index_ref = graph.reference("count");
    let body = vec![graph.output(index_ref, "$count")];

    let source = graph.reference("items");
    let item = graph.reference("it");
    let each = compile_foreach(&graph, source, item, "count", &body, Span::default()).unwrap();
    let root = graph.add_node(Node::Foreach(each));
    let template = Template::new(graph, vec![root]);

    let registry = HostRegistry::new();
    let mut ctx = Context::new();
    ctx.set("items", items(&["a", "b", "c"]));
    ctx.set("it", Value::Str("outer-item".to_string()));
    ctx.set("count", Value::I32(99));

    let rendered = template.render(&registry, &mut ctx).unwrap();
    assert_eq!(rendered.text, "123");

    // The loop variables did not leak into the surrounding scope.
    assert_eq!(ctx.get("it"), Some(&Value::Str("outer-item".to_string())));
    assert_eq!(ctx.get("count"), Some(&Value::I32(99)));

    // Previously-unbound loop variables end up unbound again.
    let mut clean = Context::new();
    clean.set("items", items(&["a"]));
    template.render(&registry, &mut clean).unwrap();
    assert_eq!(clean.get("it"), None);
    assert_eq!(clean.get("count"), None);
}

#[test]
fn members_registered_on_builtin_string_resolve() {
    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::for_builtin("string", primitives::STRING).with_method(
                MethodCandidate::new(
                    "ToUpper",
                    vec![],
                    primitives::STRING,
                    NativeFn::typed::<String>("ToUpper", |receiver, _| {
                        Ok(Value::Str(receiver.to_uppercase()))
                    }),
                ),
            ),
        )
        .unwrap();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("word");
    let call = graph.method_call(target, "ToUpper", vec![]);
    let out = graph.output(call, "$word.ToUpper()");
    let template = Template::new(graph, vec![out]);

    let mut ctx = Context::new();
    ctx.set("word", Value::Str("quiet".to_string()));
    assert_eq!(template.render(&registry, &mut ctx).unwrap().text, "QUIET");
}

// =============================================================================
// Concurrent rendering of one compiled template
// =============================================================================

#[test]
fn one_template_renders_on_many_threads() {
    let registry = greeter_registry();

    let mut graph = TemplateGraph::new();
    let target = graph.reference("x");
    let call = graph.method_call(target, "Greet", vec![]);
    let out = graph.output(call, "$x.Greet()");
    let template = Template::new(graph, vec![out]);

    std::thread::scope(|scope| {
        for word in ["north", "south", "east", "west"] {
            let registry = &registry;
            let template = &template;
            scope.spawn(move || {
                for _ in 0..50 {
                    let (_, greeter) = object("Greeter", GreeterHost { word: word.to_string() });
                    let mut ctx = Context::new();
                    ctx.set("x", greeter);
                    let rendered = template.render(registry, &mut ctx).unwrap();
                    assert_eq!(rendered.text, word);
                }
            });
        }
    });
}
