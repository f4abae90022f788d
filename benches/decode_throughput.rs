//! Benchmark suite for contrail decode throughput
//!
//! This benchmark measures datum decoding with:
//! - A flat record of primitives and containers
//! - Reader/writer resolution (field skipping, promotions, defaults)
//! - Built-in logical type conversions
//! - Sized versus unsized array blocks when skipping
//!
//! # Configuration
//!
//! Benchmark behavior can be configured via environment variables:
//!
//! - `BENCH_SAMPLE_SIZE`: Number of samples to collect (default: 100)
//! - `BENCH_MEASUREMENT_TIME`: Measurement time in seconds (default: 5)
//! - `BENCH_WARM_UP_TIME`: Warm-up time in seconds (default: 3)
//! - `BENCH_NOISE_THRESHOLD`: Noise threshold as a fraction (default: 0.01 = 1%)
//! - `BENCH_DATUMS`: Number of datums per iteration (default: 10000)
//!
//! # Examples
//!
//! ```bash
//! # Quick run with fewer samples
//! BENCH_SAMPLE_SIZE=50 BENCH_MEASUREMENT_TIME=3 cargo bench
//!
//! # Thorough run with more samples and longer measurement time
//! BENCH_SAMPLE_SIZE=300 BENCH_MEASUREMENT_TIME=15 cargo bench
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use contrail::{
    ConversionTable, DecodedValue, Deserializer, Schema, Serializer, SliceCursor,
};

const EVENT_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Event",
    "namespace": "bench",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "ts", "type": {"type": "long", "logicalType": "timestamp-millis"}},
        {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["CLICK", "VIEW", "BUY"]}},
        {"name": "user", "type": ["null", "string"]},
        {"name": "score", "type": "double"},
        {"name": "tags", "type": {"type": "array", "items": "string"}},
        {"name": "props", "type": {"type": "map", "values": "int"}},
        {"name": "payload", "type": "bytes"}
    ]
}"#;

/// Reader view of `EVENT_SCHEMA`: drops the enum and containers and adds a
/// defaulted field.
const EVENT_READER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Event",
    "namespace": "bench",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "ts", "type": {"type": "long", "logicalType": "timestamp-millis"}},
        {"name": "user", "type": ["null", "string"]},
        {"name": "score", "type": "double"},
        {"name": "region", "type": "string", "default": "unknown"}
    ]
}"#;

/// Configure Criterion based on environment variables
///
/// Allows runtime configuration of benchmark parameters without recompiling.
/// See module-level documentation for available environment variables.
fn configure_criterion() -> Criterion {
    let mut criterion = Criterion::default();

    // Read sample size from env (default: 100)
    if let Ok(sample_size) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(size) = sample_size.parse::<usize>() {
            criterion = criterion.sample_size(size);
            eprintln!("Configured sample size: {}", size);
        } else {
            eprintln!("Warning: Invalid BENCH_SAMPLE_SIZE value: {}", sample_size);
        }
    }

    // Read measurement time from env (default: 5 seconds)
    if let Ok(measurement_time) = std::env::var("BENCH_MEASUREMENT_TIME") {
        if let Ok(secs) = measurement_time.parse::<u64>() {
            criterion = criterion.measurement_time(Duration::from_secs(secs));
            eprintln!("Configured measurement time: {}s", secs);
        } else {
            eprintln!(
                "Warning: Invalid BENCH_MEASUREMENT_TIME value: {}",
                measurement_time
            );
        }
    }

    // Read warm-up time from env (default: 3 seconds)
    if let Ok(warm_up_time) = std::env::var("BENCH_WARM_UP_TIME") {
        if let Ok(secs) = warm_up_time.parse::<u64>() {
            criterion = criterion.warm_up_time(Duration::from_secs(secs));
            eprintln!("Configured warm-up time: {}s", secs);
        } else {
            eprintln!("Warning: Invalid BENCH_WARM_UP_TIME value: {}", warm_up_time);
        }
    }

    // Read noise threshold from env (default: 0.01 = 1%)
    if let Ok(noise_threshold) = std::env::var("BENCH_NOISE_THRESHOLD") {
        if let Ok(threshold) = noise_threshold.parse::<f64>() {
            criterion = criterion.noise_threshold(threshold);
            eprintln!("Configured noise threshold: {:.1}%", threshold * 100.0);
        } else {
            eprintln!(
                "Warning: Invalid BENCH_NOISE_THRESHOLD value: {}",
                noise_threshold
            );
        }
    }

    criterion
}

fn datum_count() -> usize {
    std::env::var("BENCH_DATUMS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10_000)
}

fn event(i: usize) -> DecodedValue {
    let mut props = HashMap::new();
    props.insert("a".to_string(), DecodedValue::Long((i % 7) as i64));
    props.insert("bb".to_string(), DecodedValue::Long((i % 11) as i64));

    DecodedValue::Record(vec![
        ("id".to_string(), DecodedValue::Long(i as i64)),
        (
            "ts".to_string(),
            DecodedValue::Long(1_700_000_000_000 + i as i64),
        ),
        (
            "kind".to_string(),
            DecodedValue::String(["CLICK", "VIEW", "BUY"][i % 3].to_string()),
        ),
        (
            "user".to_string(),
            if i % 4 == 0 {
                DecodedValue::Null
            } else {
                DecodedValue::String(format!("user-{}", i % 1000))
            },
        ),
        ("score".to_string(), DecodedValue::Double(i as f64 * 0.5)),
        (
            "tags".to_string(),
            DecodedValue::Array(
                (0..i % 5)
                    .map(|t| DecodedValue::String(format!("tag{}", t)))
                    .collect(),
            ),
        ),
        ("props".to_string(), DecodedValue::Map(props)),
        ("payload".to_string(), DecodedValue::Bytes(vec![0xAB; 32])),
    ])
}

/// Encode `n` events back to back.
fn encode_events(schema: &Arc<Schema>, n: usize, sized_blocks: bool) -> Vec<u8> {
    let serializer = Serializer::new(Arc::clone(schema)).with_sized_blocks(sized_blocks);
    let mut out = Vec::new();
    for i in 0..n {
        serializer.serialize_into(&event(i), &mut out).unwrap();
    }
    out
}

fn decode_all(de: &mut Deserializer) -> usize {
    let mut count = 0;
    for value in de.iter() {
        black_box(value.unwrap());
        count += 1;
    }
    count
}

/// Benchmark decoding against the writer schema
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_throughput");
    let schema = Arc::new(Schema::parse(EVENT_SCHEMA).unwrap());
    let n = datum_count();
    let data = bytes::Bytes::from(encode_events(&schema, n, false));

    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("generic", |b| {
        b.iter(|| {
            let mut de = Deserializer::from_schema(Arc::clone(&schema), SliceCursor::new(data.clone()));
            assert_eq!(decode_all(&mut de), n);
        });
    });

    let table = Arc::new(ConversionTable::logical_types(&schema));
    group.bench_function("logical_conversions", |b| {
        b.iter(|| {
            let mut de = Deserializer::from_schema(Arc::clone(&schema), SliceCursor::new(data.clone()))
                .with_conversions(Arc::clone(&table));
            assert_eq!(decode_all(&mut de), n);
        });
    });

    group.finish();
}

/// Benchmark resolution into a narrower reader schema
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution_throughput");
    let writer = Arc::new(Schema::parse(EVENT_SCHEMA).unwrap());
    let reader = Arc::new(Schema::parse(EVENT_READER_SCHEMA).unwrap());
    let n = datum_count();

    for sized_blocks in [false, true] {
        let data = bytes::Bytes::from(encode_events(&writer, n, sized_blocks));
        let name = if sized_blocks { "sized_blocks" } else { "counted_blocks" };

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("skip", name), &data, |b, data| {
            b.iter(|| {
                let mut de = Deserializer::from_schema(Arc::clone(&reader), SliceCursor::new(data.clone()))
                    .with_writer(Arc::clone(&writer));
                assert_eq!(decode_all(&mut de), n);
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = bench_decode, bench_resolution
}

criterion_main!(benches);
