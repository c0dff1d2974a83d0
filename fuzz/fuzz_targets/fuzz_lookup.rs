#![no_main]
use cloudiplookup::{build, RangeRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let records = ["3.3.3.0/24", "10.0.0.0/8", "9.9.9.9/32", "2400:cb00::/32", "::/0"]
            .iter()
            .filter_map(|cidr| RangeRecord::from_cidr(cidr, "Fuzz", "", "").ok());
        if let Ok(index) = build(records) {
            // Malformed addresses come back as misses
            let _ = index.lookup(s);
        }
        // Arbitrary CIDR text either parses or errors
        if let Ok(record) = RangeRecord::from_cidr(s, "Fuzz", "", "") {
            let _ = build([record]);
        }
    }
});
