#![no_main]

use decisionator_stream::compute_alignment;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let (generated, reference) = input.split_once('\n').unwrap_or((input.as_ref(), ""));
    if let Some(span) = compute_alignment(generated, reference) {
        assert!(!span.is_empty());
        assert!(span.slice(generated).is_some());
    }
});
