#![no_main]

use hardy_tinycbor::{decode, encode};
use libfuzzer_sys::fuzz_target;

fn same(a: &decode::Value, b: &decode::Value) -> bool {
    match (a, b) {
        (decode::Value::Float(a), decode::Value::Float(b)) => a.to_bits() == b.to_bits(),
        _ => a == b,
    }
}

// Flat arrays and scalars re-encode to something that parses back the same
fn flatten<'a>(item: &decode::Item<'a>) -> Option<Vec<decode::Value<'a>>> {
    match item.value {
        decode::Value::Array(a) => {
            let mut values = Vec::new();
            decode::traverse_array(&a, 1, |item| values.push(item.value)).ok()?;
            Some(values)
        }
        decode::Value::Map(_) | decode::Value::ByteStream(_) | decode::Value::TextStream(_) => {
            None
        }
        value => Some(vec![value]),
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(item) = decode::parse(data) else {
        return;
    };
    let Some(values) = flatten(&item) else {
        return;
    };
    let descriptors: Vec<encode::Descriptor> = values.iter().map(|v| (*v).into()).collect();
    let descriptor = match item.value {
        decode::Value::Array(a) if a.is_definite() => encode::Descriptor::Values(&descriptors),
        decode::Value::Array(_) => encode::Descriptor::ValuesIndefinite(&descriptors),
        _ => descriptors[0],
    };

    let mut buf = vec![0u8; data.len() * 2 + 16];
    let Ok(len) = encode::encode(&descriptor, &mut buf) else {
        return;
    };
    let reparsed = decode::parse(&buf[..len]).expect("Failed to parse encoded value");
    let roundtrip = flatten(&reparsed).expect("Failed to traverse encoded value");
    assert_eq!(values.len(), roundtrip.len());
    assert!(values.iter().zip(&roundtrip).all(|(a, b)| same(a, b)));
});
