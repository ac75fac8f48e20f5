use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use tracing_advice::{
    AdviceRegistry, FailureDisposition, Interceptor, JoinPoint, Marker, OperationSignature,
    Pointcut, Value,
};

fn join_point(id: i64) -> JoinPoint {
    JoinPoint::new(
        OperationSignature::new("shop::parcel::ParcelServiceImpl", "order_package")
            .with_params(["i64"])
            .with_returns("String"),
        vec![Value::Int(id)],
    )
    .with_markers([Marker::new("transactional")])
}

/// Registry with `n` rules of every kind, half of which match.
fn registry(n: usize) -> AdviceRegistry {
    let mut builder = AdviceRegistry::builder();
    for i in 0..n {
        let scope = if i % 2 == 0 {
            "within(shop::parcel::*)"
        } else {
            "within(shop::billing::*)"
        };
        builder = builder
            .before(format!("before-{}", i), scope, |_| Ok(()))
            .after_returning(format!("returning-{}", i), scope, |_, _| Ok(()))
            .after_throwing(format!("throwing-{}", i), scope, |_, _| {
                Ok(FailureDisposition::Propagate)
            })
            .after(format!("after-{}", i), scope, |_, _| Ok(()));
    }
    builder
        .around("validate", "within(shop::parcel::*)", |pjp| {
            match pjp.args()[0].as_i64() {
                Some(id) if id > 0 => pjp.proceed(),
                _ => Ok(Value::from("rejected")),
            }
        })
        .build()
        .expect("benchmark registry is valid")
}

/// Benchmark pointcut matching speed
fn bench_pointcut_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("pointcut_matching");
    let jp = join_point(1);

    let cases = [
        ("within", "within(shop::parcel::*)"),
        ("execution_any_depth", "execution(* shop::**::order_*(..))"),
        ("annotation", "@annotation(transactional)"),
        (
            "combined",
            "(within(shop::**) || @annotation(audited)) && !execution(String shop::*::get_*(..))",
        ),
    ];

    for (name, expression) in cases {
        let pointcut: Pointcut = expression.parse().expect("valid pointcut");
        group.bench_function(name, |b| b.iter(|| black_box(&pointcut).matches(black_box(&jp))));
    }

    group.bench_function("parse_combined", |b| {
        b.iter(|| Pointcut::parse(black_box(cases[3].1)))
    });

    group.finish();
}

/// Benchmark invocation overhead by registry size
fn bench_invocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("invocation");
    group.throughput(Throughput::Elements(1));

    for rules in [0usize, 4, 16, 64] {
        let interceptor = Interceptor::new(registry(rules));
        let jp = join_point(1);

        group.bench_with_input(BenchmarkId::new("proceed", rules), &rules, |b, _| {
            b.iter(|| {
                interceptor.invoke(black_box(&jp), |jp| {
                    Ok::<_, String>(jp.args()[0].clone())
                })
            })
        });
    }

    let interceptor = Interceptor::new(registry(16));
    let rejected = join_point(-34);
    group.bench_function("short_circuit", |b| {
        b.iter(|| {
            interceptor.invoke(black_box(&rejected), |jp| {
                Ok::<_, String>(jp.args()[0].clone())
            })
        })
    });

    group.finish();
}

/// Benchmark concurrent invocations sharing one interceptor
fn bench_concurrent_invocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for threads in [2usize, 4, 8] {
        let interceptor = Arc::new(Interceptor::new(registry(8)));
        group.throughput(Throughput::Elements((threads * 1000) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let interceptor = Arc::clone(&interceptor);
                        thread::spawn(move || {
                            for i in 0..1000 {
                                let jp = join_point((t * 1000 + i) as i64);
                                let _ = interceptor.invoke(&jp, |jp| {
                                    Ok::<_, String>(jp.args()[0].clone())
                                });
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("benchmark thread panicked");
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pointcut_matching,
    bench_invocation,
    bench_concurrent_invocation
);
criterion_main!(benches);
