use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rug::Integer;
use xkiss_awc::period::{certify_period, certify_variant, Variant};
use xkiss_awc::pratt::{mwc128_modulus, PrattBuilder};
use xkiss_awc::search::{search_candidates, DEFAULT_START};

fn bench_certify_period(c: &mut Criterion) {
    c.bench_function("certify_period(16)", |b| {
        b.iter(|| certify_period(black_box(16)));
    });
    c.bench_function("certify_variant(Xkiss64)", |b| {
        b.iter(|| certify_variant(black_box(Variant::Xkiss64)));
    });
}

fn bench_pratt_mwc128(c: &mut Criterion) {
    let m = mwc128_modulus();
    let builder = PrattBuilder::new();
    c.bench_function("pratt_certificate(mwc128)", |b| {
        b.iter(|| builder.build(black_box(&m)));
    });

    let cert = builder.build(&m).unwrap();
    c.bench_function("pratt_verify(mwc128)", |b| {
        b.iter(|| black_box(&cert).verify());
    });
}

fn bench_search_window(c: &mut Criterion) {
    let radix = Integer::from(1u32) << 64u32;
    let start = Integer::from(DEFAULT_START);
    c.bench_function("search_candidates(2^64, 5^26, 2000)", |b| {
        b.iter(|| search_candidates(black_box(&radix), black_box(&start), 2000).count());
    });
}

criterion_group!(
    benches,
    bench_certify_period,
    bench_pratt_mwc128,
    bench_search_window,
);
criterion_main!(benches);
