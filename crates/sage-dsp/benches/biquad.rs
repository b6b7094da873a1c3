//! Biquad and K-weighting benchmarks

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sage_dsp::MonoProcessor;
use sage_dsp::biquad::{Biquad, FilterSpec, FilterType};
use sage_dsp::k_weighting::KWeightingFilter;

fn bench_biquad_peaking(c: &mut Criterion) {
    let spec = FilterSpec::new(FilterType::Peaking, 1000.0, 0.707).with_gain(6.0);
    let mut filter = Biquad::with_spec(spec, 48000.0).unwrap();

    let mut buffer: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.01).sin()).collect();

    c.bench_function("biquad_peaking_1024", |b| {
        b.iter(|| {
            filter.process_block(black_box(&mut buffer));
        })
    });
}

fn bench_k_weighting(c: &mut Criterion) {
    let mut filter = KWeightingFilter::new(48000.0).unwrap();

    let mut buffer: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.01).sin()).collect();

    c.bench_function("k_weighting_1024", |b| {
        b.iter(|| {
            filter.process_in_place(black_box(&mut buffer));
        })
    });
}

criterion_group!(benches, bench_biquad_peaking, bench_k_weighting);
criterion_main!(benches);
