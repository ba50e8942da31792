#![no_main]

use clinrec::server::protocol::{parse_one_shot, parse_request, read_line, Request};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary client bytes must never panic the framing or request parsing
    let mut reader = Cursor::new(data);
    let mut buf = Vec::new();
    while let Ok(Some(line)) = read_line(&mut reader, &mut buf) {
        if let Request::Annotate(text) = parse_request(&line) {
            assert!(!text.is_empty());
        }
        let _ = parse_one_shot(&line);
    }
});
