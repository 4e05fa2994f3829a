#![no_main]

use hardy_tinycbor::{DEFAULT_MAX_RECURSION, decode::*};
use libfuzzer_sys::fuzz_target;

fn visit(item: &Item, max_recursion: usize) {
    _ = format!("{:?}", item.value);
    let depth = max_recursion.saturating_sub(1);
    _ = match item.value {
        Value::Array(a) => traverse_array(&a, max_recursion, |item| visit(item, depth)),
        Value::Map(m) => traverse_map(&m, max_recursion, |k, v| {
            visit(k, depth);
            visit(v, depth);
        }),
        Value::ByteStream(c) => traverse_indefinite_string(&c, StringKind::Bytes, |_| {}),
        Value::TextStream(c) => traverse_indefinite_string(&c, StringKind::Text, |_| {}),
        _ => Ok(0),
    };
}

fuzz_target!(|data: &[u8]| {
    if let Ok(item) = parse(data) {
        visit(&item, DEFAULT_MAX_RECURSION);
        if let Ok(end) = item.end(DEFAULT_MAX_RECURSION) {
            assert!(end <= data.len());
        }
    }
});
