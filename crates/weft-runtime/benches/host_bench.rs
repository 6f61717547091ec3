//! Plugin host benchmarks
//!
//! Run with: cargo bench --package weft-runtime

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::Value;
use tokio::runtime::Runtime;
use weft_runtime::{PluginHost, ScopedLoaderFactory, SharedLoaderFactory};
use weft_spi::testing::{InMemoryLanguageService, MemoryResource};
use weft_spi::{Environment, StaticLoader};

#[derive(Debug)]
struct BenchPlugin;

fn service(name: &str, plugins: usize) -> InMemoryLanguageService {
    (0..plugins).fold(InMemoryLanguageService::new(name), |service, i| {
        service.with_resource(
            format!("/plugins/{name}/plugin-{i}"),
            MemoryResource::plugin(format!("plugin-{i}")),
        )
    })
}

fn loader(plugins: usize) -> StaticLoader {
    (0..plugins).fold(StaticLoader::new(), |loader, i| {
        loader.with(format!("plugin-{i}"), |_: &Value| Ok(BenchPlugin))
    })
}

fn host(services: usize, plugins: usize) -> PluginHost {
    let mut env = Environment::builder();
    for s in 0..services {
        env = env.search_root(format!("/plugins/service-{s}"));
    }

    let mut host = PluginHost::new(env.build());
    for s in 0..services {
        // Every service offers the same identities, so resolution has conflicts to settle
        host.register(service(&format!("service-{s}"), plugins))
            .expect("unique service names");
    }
    host
}

fn bench_run(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("host_run");

    for plugins in [10usize, 100, 500] {
        let factory = SharedLoaderFactory::new(loader(plugins));
        group.throughput(Throughput::Elements(plugins as u64));
        group.bench_with_input(BenchmarkId::from_parameter(plugins), &plugins, |b, &plugins| {
            b.to_async(&rt).iter(|| async {
                let mut host = host(1, plugins);
                let summary = host.run(&factory).await.unwrap();
                black_box(summary)
            });
        });
    }

    group.finish();
}

fn bench_conflicts(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let factory = ScopedLoaderFactory::new(loader(100));

    c.bench_function("host_run_4_services_conflicting", |b| {
        b.to_async(&rt).iter(|| async {
            let mut host = host(4, 100);
            let summary = host.run(&factory).await.unwrap();
            black_box(summary)
        });
    });
}

criterion_group!(benches, bench_run, bench_conflicts);
criterion_main!(benches);
