use criterion::{Criterion, black_box, criterion_group, criterion_main};
use modelspec_core::document::{parse_str, to_yaml_string};
use modelspec_core::{CodecRegistry, ModelDescriptor};

const V1_DOC: &str = r#"
format_version: 0.1.0
name: n2v
authors: [Jane Doe]
language: java
framework: tensorflow
inputs:
  - name: input
    axes: byxc
    data_type: float32
    shape: {min: [1, 4, 4, 1], step: [1, 4, 4, 0]}
outputs:
  - name: output
    axes: byxc
    shape: {reference_input: input, scale: [1, 1, 1, 1], offset: [0, 0, 0, 0]}
prediction:
  preprocess:
    kwargs: {mean: 100, stdDev: 10}
"#;

const V3_DOC: &str = r#"
format_version: 0.3.6
name: UNet 2D nuclei
description: Nucleus segmentation
authors:
  - name: Jane Doe
    affiliation: EMBL
cite:
  - text: Ronneberger et al. U-Net
    doi: 10.1007/978-3-319-24574-4_28
tags: [unet2d, nuclei, segmentation]
license: MIT
language: python
framework: pytorch
attachments: {manifest: ./manifest.yaml}
inputs:
  - name: raw
    axes: bcyx
    data_type: float32
    data_range: [-inf, inf]
    shape: {min: [1, 1, 64, 64], step: [0, 0, 16, 16]}
    preprocessing:
      - name: scale_min_max
        kwargs: {reference_input: raw, min_percentile: 1, max_percentile: 99.8, mode: per_sample, axes: yx}
outputs:
  - name: mask
    axes: bcyx
    data_type: float32
    data_range: [0, 1]
    shape: {reference_input: raw, scale: [1, 1, 1, 1], offset: [0, 0, 0, 0]}
    postprocessing:
      - name: binarize
        kwargs: {threshold: 0.5}
weights:
  pytorch_state_dict:
    source: ./weights.pt
    architecture: unet.py:UNet2d
  pytorch_script:
    source: ./model.pt
  onnx:
    source: ./model.onnx
    opset_version: 12
config:
  deepimagej: {pyramidal_model: false}
"#;

fn bench_decode(c: &mut Criterion) {
    let registry = CodecRegistry::default();
    let v1 = parse_str(V1_DOC).unwrap();
    let v3 = parse_str(V3_DOC).unwrap();

    c.bench_function("decode_generation_1", |b| {
        b.iter(|| registry.decode_any(black_box(&v1)).unwrap())
    });

    c.bench_function("decode_generation_3", |b| {
        b.iter(|| registry.decode_any(black_box(&v3)).unwrap())
    });

    c.bench_function("parse_and_decode_generation_3", |b| {
        b.iter(|| {
            let doc = parse_str(black_box(V3_DOC)).unwrap();
            registry.decode_any(&doc).unwrap()
        })
    });
}

fn bench_encode(c: &mut Criterion) {
    let registry = CodecRegistry::default();
    let descriptor = registry.decode_any(&parse_str(V3_DOC).unwrap()).unwrap();

    c.bench_function("encode_generation_3", |b| {
        b.iter(|| registry.encode_for(black_box(&descriptor)).unwrap())
    });

    c.bench_function("encode_generation_3_to_yaml", |b| {
        b.iter(|| {
            let doc = registry.encode_for(black_box(&descriptor)).unwrap();
            to_yaml_string(&doc).unwrap()
        })
    });

    c.bench_function("convert_generation_3_to_latest", |b| {
        b.iter(|| {
            let mut d: ModelDescriptor = descriptor.clone();
            registry.encode_latest(black_box(&mut d)).unwrap()
        })
    });
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
