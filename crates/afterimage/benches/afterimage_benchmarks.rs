//! AfterImage benchmarks.

use afterimage::{AfterImage, AfterImageProps, Host, HostConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use web_apis::DOMRect;

fn gallery(count: usize) -> (Host, Vec<AfterImage>) {
    let host = Host::new(HostConfig::default()).expect("default host config is valid");
    let components = (0..count)
        .map(|n| {
            let component = AfterImage::new(
                AfterImageProps::new(format!("https://img.example/{n}.jpg")).attribute("alt", "tile"),
            );
            component
                .mount(&host, host.body())
                .expect("body accepts children");
            component
        })
        .collect();
    (host, components)
}

/// Benchmark mounting and registering components.
fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("components", size), size, |b, &size| {
            b.iter(|| {
                let (host, components) = gallery(size);
                host.run_animation_frame();
                black_box(components.len())
            })
        });
    }

    group.finish();
}

/// Benchmark a scroll step delivering a batch of crossings.
fn bench_crossings(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossings");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("batch", size), size, |b, &size| {
            b.iter_with_setup(
                || {
                    let (host, components) = gallery(size);
                    for (n, component) in components.iter().enumerate() {
                        if let Some(container) = component.container() {
                            let x = (n % 4) as f64 * 320.0;
                            let y = 2000.0 + (n / 4) as f64 * 180.0;
                            host.set_layout_rect(container, DOMRect::new(x, y, 320.0, 180.0));
                        }
                    }
                    host.run_animation_frame();
                    (host, components)
                },
                |(host, components)| {
                    host.scroll_to(0.0, 2000.0);
                    black_box(host.update_intersections());
                    black_box(components.len())
                },
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mount, bench_crossings);

criterion_main!(benches);
