#![no_main]
use libfuzzer_sys::fuzz_target;

// Whatever the loader accepts must render back to text that loads the same.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let records = cavesweep_store::parse_records(s);
        let rendered = cavesweep_store::render_records(&records);
        assert_eq!(cavesweep_store::parse_records(&rendered), records);
    }
});
