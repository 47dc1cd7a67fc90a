use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mmdb_client::{Decoder, EntryData, EntryDataList};
use std::hint::black_box;

/// Flattened pre-order list shaped like a city-level geolocation record.
fn city_record_nodes() -> Vec<EntryData> {
    vec![
        EntryData::Map { count: 4 },
        EntryData::utf8("country"),
        EntryData::Map { count: 2 },
        EntryData::utf8("iso_code"),
        EntryData::utf8("US"),
        EntryData::utf8("geoname_id"),
        EntryData::Uint32(6252001),
        EntryData::utf8("location"),
        EntryData::Map { count: 3 },
        EntryData::utf8("latitude"),
        EntryData::Double(37.751),
        EntryData::utf8("longitude"),
        EntryData::Double(-97.822),
        EntryData::utf8("accuracy_radius"),
        EntryData::Uint16(1000),
        EntryData::utf8("subdivisions"),
        EntryData::Array { count: 2 },
        EntryData::Map { count: 1 },
        EntryData::utf8("iso_code"),
        EntryData::utf8("CA"),
        EntryData::Map { count: 1 },
        EntryData::utf8("iso_code"),
        EntryData::utf8("OR"),
        EntryData::utf8("traits"),
        EntryData::Map { count: 2 },
        EntryData::utf8("is_anonymous_proxy"),
        EntryData::Bool(false),
        EntryData::utf8("network"),
        EntryData::Uint128(0x2001_0db8_0000_0000_0000_0000_0000_0000u128.to_be_bytes()),
    ]
}

/// A wide flat map of `width` string pairs.
fn wide_record_nodes(width: u32) -> Vec<EntryData> {
    let mut nodes = vec![EntryData::Map { count: width }];
    for i in 0..width {
        nodes.push(EntryData::utf8(&format!("key_{:04}", i)));
        nodes.push(EntryData::utf8(&format!("value_{:04}", i)));
    }
    nodes
}

fn bench_decode_city_record(c: &mut Criterion) {
    let nodes = city_record_nodes();
    let decoder = Decoder::new();

    c.bench_function("decode_city_record", |b| {
        b.iter(|| {
            let list = EntryDataList::new(black_box(nodes.clone()));
            decoder.decode_list(list).unwrap()
        })
    });
}

fn bench_decode_wide_maps(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_wide_map");
    let decoder = Decoder::new();

    for width in [16u32, 64, 256].iter() {
        let nodes = wide_record_nodes(*width);
        group.throughput(Throughput::Elements(*width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &nodes, |b, nodes| {
            b.iter(|| {
                let list = EntryDataList::new(black_box(nodes.clone()));
                decoder.decode_list(list).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode_city_record, bench_decode_wide_maps);
criterion_main!(benches);
