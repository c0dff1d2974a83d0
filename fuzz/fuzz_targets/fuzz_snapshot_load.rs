#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Garbage must be rejected with an error, never a panic
    if let Ok(index) = cloudiplookup::snapshot::load(data) {
        let _ = index.lookup("3.3.3.3");
        let _ = index.lookup("2400:cb00::1");
        for record in index.records() {
            let _ = record;
        }
    }
});
