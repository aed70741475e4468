use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use photoconv_rs::image_pipeline::depth::rescale;
use photoconv_rs::image_pipeline::encode::{
    EncodeParams, EncoderSettings, ImageWriter, StandardTiffWriter, TiffCompression,
};
use photoconv_rs::image_pipeline::pixel::{SampleLayout, composite_over_white, prepare};
use photoconv_rs::image_pipeline::source::MetadataHandle;
use photoconv_rs::image_pipeline::{BitDepth, CapabilityTable, OutputFormat, PixelBuffer};

fn generate_mock_buffer(width: usize, height: usize, channels: usize) -> PixelBuffer {
    let mut data = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                data.push(((x * 131 + y * 17 + c * 4099) % 65536) as u16);
            }
        }
    }
    PixelBuffer::from_u16(width, height, channels, data).unwrap()
}

fn benchmark_rescale_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescale_16_to_8");

    let sizes = vec![
        (100, 100, "100x100"),
        (500, 500, "500x500"),
        (1000, 1000, "1000x1000"),
    ];

    for (width, height, label) in sizes {
        let buffer = generate_mock_buffer(width, height, 3);

        group.bench_with_input(BenchmarkId::from_parameter(label), &buffer, |b, buffer| {
            b.iter(|| rescale(black_box(buffer.clone()), BitDepth::Sixteen, BitDepth::Eight));
        });
    }

    group.finish();
}

fn benchmark_rescale_directions(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescale_directions");
    let buffer = generate_mock_buffer(500, 500, 3);

    let directions = vec![
        (BitDepth::Sixteen, BitDepth::Eight, "16_to_8"),
        (BitDepth::Twelve, BitDepth::Sixteen, "12_to_16"),
        (BitDepth::Sixteen, BitDepth::Ten, "16_to_10"),
    ];

    for (from, to, label) in directions {
        group.bench_function(label, |b| {
            b.iter(|| rescale(black_box(buffer.clone()), from, to));
        });
    }

    group.finish();
}

fn benchmark_alpha_composite(c: &mut Criterion) {
    let buffer = generate_mock_buffer(500, 500, 4);

    c.bench_function("composite_over_white_500x500", |b| {
        b.iter(|| composite_over_white(black_box(buffer.clone()), BitDepth::Sixteen));
    });
}

fn benchmark_tiff_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiff_compression");
    let table = CapabilityTable::standard();
    let image = prepare(
        generate_mock_buffer(500, 500, 3),
        BitDepth::Sixteen,
        SampleLayout::default(),
    );
    let metadata = MetadataHandle::default();

    let compressions = vec![
        (TiffCompression::None, "none"),
        (TiffCompression::Lzw, "lzw"),
        (TiffCompression::DeflateFast, "deflate_fast"),
        (TiffCompression::DeflateBalanced, "deflate_balanced"),
    ];

    for (compression, label) in compressions {
        let settings = EncoderSettings {
            tiff_compression: compression,
            ..EncoderSettings::default()
        };
        let params = EncodeParams::for_quality(table.get(OutputFormat::Tiff), 90, &settings);

        group.bench_function(label, |b| {
            b.iter(|| {
                let mut output = Vec::new();
                let _ = StandardTiffWriter.write_image(black_box(&image), &params, &metadata, &mut output);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_rescale_sizes,
    benchmark_rescale_directions,
    benchmark_alpha_composite,
    benchmark_tiff_compression
);
criterion_main!(benches);
