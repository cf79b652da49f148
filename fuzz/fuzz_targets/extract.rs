// fuzz_targets/extract.rs
#![no_main]

use goextract::{extract_function, parse_source, print_document, ExtractError, Position, Selection};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (head, rest) = data.split_at(4);
    let s = String::from_utf8_lossy(rest);

    let Ok(mut doc) = parse_source(&s) else {
        return;
    };
    let before = print_document(&doc);

    let selection = Selection::new(
        Position::new(u32::from(head[0] % 32) + 1, u32::from(head[1] % 64) + 1),
        Position::new(u32::from(head[2] % 32) + 1, u32::from(head[3] % 64) + 1),
    );
    match extract_function(&mut doc, selection, "fuzzed") {
        Ok(_) => {
            let printed = print_document(&doc);
            assert_eq!(printed.len() as u32, doc.size());
            assert!(parse_source(&printed).is_ok(), "{printed}");
        }
        Err(ExtractError::LayoutInconsistency { expected, actual }) => {
            panic!("layout drifted: expected {expected}, got {actual}");
        }
        Err(_) => assert_eq!(print_document(&doc), before),
    }
});
