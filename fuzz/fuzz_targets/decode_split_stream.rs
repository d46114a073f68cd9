#![no_main]

use decisionator_stream::{decode_chunks, Classifier};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split_seed, body)) = data.split_first() else {
        return;
    };
    let split = if body.is_empty() {
        0
    } else {
        usize::from(split_seed) % body.len()
    };
    let (head, tail) = body.split_at(split);

    let whole = decode_chunks(Classifier::default(), [body]);
    let split = decode_chunks(Classifier::default(), [head, tail]);
    assert_eq!(whole.is_ok(), split.is_ok());
    if let (Ok(whole), Ok(split)) = (whole, split) {
        assert_eq!(whole, split);
    }
});
