use criterion::measurement::WallTime;
use criterion::*;

use cdt2d::{triangulate, CdtBuilder, TriangulationOptions};

use crate::benchmark_utilities::*;

pub fn insert_benchmark(c: &mut Criterion) {
    fn single_insert_benchmark(
        group: &mut BenchmarkGroup<WallTime>,
        distribution: SampleDistribution,
        sizes: &[usize],
    ) {
        for size in sizes {
            group.throughput(Throughput::Elements(*size as u64));
            let name = format!("triangulate ({})", distribution);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                let data = distribution.points(*size);
                b.iter(|| triangulate(data.iter().copied()).unwrap());
            });
        }
    }

    let mut group = c.benchmark_group("insert benchmark");
    let sizes = &[200, 800, 1000, 2000, 3500];

    single_insert_benchmark(&mut group, SampleDistribution::Uniform, sizes);
    single_insert_benchmark(&mut group, SampleDistribution::RandomWalk, sizes);

    for size in sizes {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(
            BenchmarkId::new("builder with constraint chain", size),
            &size,
            |b, &size| {
                let data = SampleDistribution::Uniform.points(*size);
                b.iter(|| {
                    let mut builder = CdtBuilder::new(TriangulationOptions::default());
                    let chain: Vec<usize> = (0..8)
                        .map(|i| {
                            let x = -900.0 + 1800.0 * i as f64 / 7.0;
                            builder.insert([x, 0.5 * x]).unwrap()
                        })
                        .collect();
                    for point in &data {
                        builder.insert(*point).unwrap();
                    }
                    for pair in chain.windows(2) {
                        builder.add_constraint(pair[0], pair[1]).unwrap();
                    }
                    builder.finish().unwrap()
                });
            },
        );
    }

    group.finish();
}
