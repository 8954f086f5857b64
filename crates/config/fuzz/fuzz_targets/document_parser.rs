//! Fuzzing harness for the download tool configuration parser
//!
//! Arbitrary input must never panic, and anything that parses must survive a
//! reconcile pass and a serialize/parse round trip.
//! Run with: cargo fuzz run document_parser

#![no_main]
use libfuzzer_sys::fuzz_target;
use loanload_config::{reconcile, ConfigDocument};
use loanload_core::LibraryRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut doc) = ConfigDocument::from_json_str(s) else {
        return;
    };

    reconcile(&mut doc, &[LibraryRecord::new("FuzzLib", "https://fuzz.example", "1")]);

    let Ok(out) = doc.to_json_string() else {
        return;
    };
    let reparsed = ConfigDocument::from_json_str(&out);
    assert_eq!(reparsed.as_ref(), Ok(&doc));
});
