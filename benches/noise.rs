use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pcdm_toolkit::rand_tools::{Fresh, NormalSource};
use pcdm_toolkit::{NaiveDft, NoiseCollector, NoiseCollectorBuilder};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn make_waveform(nsamples: usize, seed: u64) -> Vec<f64> {
    let rng = StdRng::seed_from_u64(seed);
    let mut src = Fresh::new(rng);
    (0..nsamples).map(|_| 10.0 * src.normal()).collect()
}

fn bench_collector_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_collector_add");
    for nsamples in [256usize, 1024, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(nsamples), &nsamples, |b, &nsamples| {
            let waveforms: Vec<Vec<f64>> = (0..32).map(|i| make_waveform(nsamples, i as u64)).collect();
            b.iter(|| {
                let mut collector: NoiseCollector<NaiveDft> =
                    NoiseCollectorBuilder::new(NaiveDft, nsamples).build();
                for w in &waveforms {
                    collector.add(w);
                }
                collector.rms()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_collector_add);
criterion_main!(benches);
