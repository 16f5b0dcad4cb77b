//! Performance benchmarks for call-site binding.
//!
//! Measures the two paths that matter for render throughput:
//! - cold binding: first execution against a host type, paying member
//!   resolution and fragment construction
//! - warm execution: the monomorphic cache hit every later execution takes
//!
//! ```bash
//! cargo bench --bench binder_benchmarks
//! ```

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use velvet::{
    Context, HostRegistry, HostTypeEntry, MethodCandidate, NativeFn, PropertyCandidate, Template,
    TemplateGraph, TypeHash, Value, primitives,
};

struct AccountHost {
    balance: i64,
}

fn account_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry
        .register_type(
            HostTypeEntry::new("Account")
                .with_property(PropertyCandidate::readonly::<AccountHost>(
                    "Balance",
                    primitives::INT64,
                    |account| Value::I64(account.balance),
                ))
                .with_method(MethodCandidate::new(
                    "Add",
                    vec![primitives::INT64],
                    primitives::INT64,
                    NativeFn::typed::<AccountHost>("Add", |account, args| {
                        account.balance += args[0].as_i64().unwrap_or(0);
                        Ok(Value::I64(account.balance))
                    }),
                )),
        )
        .unwrap();
    registry
}

fn account_value() -> Value {
    Value::Object(velvet::ObjectHandle::new(
        TypeHash::from_name("Account"),
        "Account",
        AccountHost { balance: 0 },
    ))
}

fn invoke_template() -> Template {
    let mut graph = TemplateGraph::new();
    let target = graph.reference("account");
    let amount = graph.literal(Value::I32(1));
    let call = graph.method_call(target, "Add", vec![amount]);
    let out = graph.output(call, "$account.Add(1)");
    Template::new(graph, vec![out])
}

fn property_template() -> Template {
    let mut graph = TemplateGraph::new();
    let target = graph.reference("account");
    let read = graph.property(target, "Balance");
    let out = graph.output(read, "$account.Balance");
    Template::new(graph, vec![out])
}

fn bench_cold_binding(c: &mut Criterion) {
    let registry = account_registry();

    c.bench_function("invoke_cold_bind", |b| {
        b.iter(|| {
            // Fresh template per iteration: every execution resolves.
            let template = invoke_template();
            let mut ctx = Context::new();
            ctx.set("account", account_value());
            black_box(template.render(&registry, &mut ctx).unwrap());
        });
    });
}

fn bench_warm_cache(c: &mut Criterion) {
    let registry = account_registry();

    let template = invoke_template();
    let mut ctx = Context::new();
    ctx.set("account", account_value());

    c.bench_function("invoke_warm_cache", |b| {
        b.iter(|| {
            black_box(template.render(&registry, &mut ctx).unwrap());
        });
    });

    let template = property_template();
    let mut ctx = Context::new();
    ctx.set("account", account_value());

    c.bench_function("property_warm_cache", |b| {
        b.iter(|| {
            black_box(template.render(&registry, &mut ctx).unwrap());
        });
    });
}

criterion_group!(benches, bench_cold_binding, bench_warm_cache);
criterion_main!(benches);
