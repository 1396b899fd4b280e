use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mopaq::crypto::{decrypt_block, encrypt_block};

pub fn block_cipher_benchmark(c: &mut Criterion) {
    let words: Vec<u32> = (0..1024u32).collect();

    c.bench_function("encrypt_block_1024_words", |b| {
        b.iter(|| {
            let mut data = words.clone();
            encrypt_block(&mut data, black_box(0xC1EB_1CEF));
            black_box(data)
        })
    });

    c.bench_function("decrypt_block_1024_words", |b| {
        let mut encrypted = words.clone();
        encrypt_block(&mut encrypted, 0xC1EB_1CEF);

        b.iter(|| {
            let mut data = encrypted.clone();
            decrypt_block(&mut data, black_box(0xC1EB_1CEF));
            black_box(data)
        })
    });
}

criterion_group!(benches, block_cipher_benchmark);
criterion_main!(benches);
