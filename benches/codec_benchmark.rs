use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use imago::{decode_jpeg, decode_png, encode_jpeg, encode_png, Image, Rgb, YCbCr};

fn gradient_rgb(size: u32) -> Image<Rgb<u8>> {
    Image::generate(size, size, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn gradient_ycbcr(size: u32) -> Image<YCbCr<u8>> {
    Image::generate(size, size, |x, y| {
        YCbCr([(x * 7 % 256) as u8, (128 + y % 64) as u8, (128 + x % 64) as u8])
    })
}

fn bench_png(c: &mut Criterion) {
    let mut group = c.benchmark_group("png");
    for size in [64u32, 256] {
        let img = gradient_rgb(size);
        let encoded = encode_png(&img).unwrap();
        group.throughput(Throughput::Bytes((size * size * 3) as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &img, |b, img| {
            b.iter(|| encode_png(img).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, bytes| {
            b.iter(|| decode_png(bytes).unwrap())
        });
    }
    group.finish();
}

fn bench_jpeg(c: &mut Criterion) {
    let mut group = c.benchmark_group("jpeg");
    for size in [64u32, 256] {
        let img = gradient_ycbcr(size);
        let encoded = encode_jpeg(&img, 85).unwrap();
        group.throughput(Throughput::Bytes((size * size * 3) as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &img, |b, img| {
            b.iter(|| encode_jpeg(img, 85).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, bytes| {
            b.iter(|| decode_jpeg(bytes).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_png, bench_jpeg);
criterion_main!(benches);
