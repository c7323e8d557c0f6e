use std::error::Error;

use criterion::{criterion_group, criterion_main, Criterion};
use chainjson::reader::ParserSettings;

fn call_unwrap<F: FnOnce() -> Result<(), Box<dyn Error>>>(f: F) {
    f().unwrap();
}

fn bench_compare(c: &mut Criterion, name: &str, json: &str) {
    let mut group = c.benchmark_group(name);
    group.bench_with_input("chainjson-parse", json, |b, json| {
        b.iter(|| {
            call_unwrap(|| {
                let document = chainjson::parse(json.as_bytes())?;
                document.destroy();
                Ok(())
            });
        })
    });
    group.bench_with_input("chainjson-parse (small blocks)", json, |b, json| {
        b.iter(|| {
            call_unwrap(|| {
                let document = chainjson::parse_custom(
                    json.as_bytes(),
                    ParserSettings {
                        read_block_size: 64,
                        initial_token_capacity: 16,
                        ..Default::default()
                    },
                )?;
                document.destroy();
                Ok(())
            });
        })
    });

    group.bench_with_input("serde-value (string)", json, |b, json| {
        b.iter(|| {
            call_unwrap(|| {
                let _: serde_json::Value = serde_json::from_str(json)?;
                Ok(())
            });
        })
    });

    group.finish();
}

fn benchmark_large_array(c: &mut Criterion) {
    let json = format!(
        "[{}true]",
        "true, false, null, 12345689.123e12, \"abcdabcdabcdabcd\",".repeat(1000)
    );
    bench_compare(c, "parse-large-array", &json);
}

fn benchmark_nested_object(c: &mut Criterion) {
    let count = 100;
    let json = r#"{"member name":"#.repeat(count) + "true" + "}".repeat(count).as_str();
    bench_compare(c, "parse-nested-object", &json);
}

fn benchmark_nested_object_pretty(c: &mut Criterion) {
    let count = 100;
    let mut json = "{".to_owned();

    for i in 1..=count {
        json.push('\n');
        json.push_str("  ".repeat(i).as_str());
        json.push_str(r#""member name": {"#);
    }
    for i in (0..=count).rev() {
        json.push('\n');
        json.push_str("  ".repeat(i).as_str());
        json.push('}');
    }

    bench_compare(c, "parse-nested-object-pretty", &json);
}

fn benchmark_large_unicode_string(c: &mut Criterion) {
    let json = format!(
        "\"{}\"",
        "ab\u{0080}cd\u{0800}ef\u{1234}gh\u{10FFFF}".repeat(10_000)
    );
    bench_compare(c, "parse-large-unicode-string", &json);
}

fn benchmark_escapes_string(c: &mut Criterion) {
    let json = format!(
        "\"{}\"",
        r#"a\nb\tc\\d\"e\u0000f\u0080g\u0800h\u1234i"#.repeat(10_000)
    );
    bench_compare(c, "parse-large-escapes-string", &json);
}

criterion_group!(
    benches,
    // Benchmark functions
    benchmark_large_array,
    benchmark_nested_object,
    benchmark_nested_object_pretty,
    benchmark_large_unicode_string,
    benchmark_escapes_string
);
criterion_main!(benches);
