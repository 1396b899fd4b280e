use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mopaq::hash::{compute_name_hashes, hash_string, hash_type};

pub fn filename_hash_benchmark(c: &mut Criterion) {
    let name = "unit\\neutral\\acritter.mdx";

    c.bench_function("hash_string_table_offset", |b| {
        b.iter(|| black_box(hash_string(black_box(name), hash_type::TABLE_OFFSET)))
    });

    c.bench_function("compute_name_hashes", |b| {
        b.iter(|| black_box(compute_name_hashes(black_box(name))))
    });
}

criterion_group!(benches, filename_hash_benchmark);
criterion_main!(benches);
