use criterion::{black_box, criterion_group, criterion_main, Criterion};
use synthra_core::lane::AnnotationLane;
use synthra_core::{
    AnnotationSettings, ClassId, ColorImage, FrameBuffers, InstanceAttributeTable,
    InstanceAttributes, InstanceMap,
};
use synthra_lanes::MaskBoundsLane;

fn frame(width: u32, height: u32, objects: u32) -> FrameBuffers {
    let mut map = InstanceMap::new(width, height);
    let mut attributes = InstanceAttributeTable::new();
    for id in 1..=objects {
        let x = (id * 97) % (width - 64);
        let y = (id * 53) % (height - 64);
        map.fill_rect(x, y, 64, 48, id);
        attributes.insert(id, InstanceAttributes::of_class(ClassId(id % 3)));
    }
    FrameBuffers::new(ColorImage::new(width, height), map, attributes)
}

fn bench_extraction(c: &mut Criterion) {
    let lane = MaskBoundsLane::new(AnnotationSettings::default());

    let mut group = c.benchmark_group("MaskBounds extraction");

    let sparse = frame(640, 480, 5);
    group.bench_function("640x480, 5 objects", |b| {
        b.iter(|| black_box(lane.extract(black_box(&sparse))));
    });

    let dense = frame(1920, 1080, 60);
    group.bench_function("1920x1080, 60 objects", |b| {
        b.iter(|| black_box(lane.extract(black_box(&dense))));
    });

    group.finish();
}

criterion_group!(benches, bench_extraction);
criterion_main!(benches);
