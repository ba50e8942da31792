#![no_main]

use clinrec::utils::{normalize, tokenize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Token spans must always slice the original text on char boundaries
    let tokens = tokenize(&normalize(data));
    let chars = data.chars().count();
    for token in tokens {
        assert!(!token.text.is_empty());
        assert!(data.get(token.span.clone()).is_some());
        assert!(token.chars.start < token.chars.end && token.chars.end <= chars);
    }
});
