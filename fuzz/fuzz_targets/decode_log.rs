#![no_main]

use libfuzzer_sys::fuzz_target;
use things_core::event::codec::{LogFormat, decode, encode};

fuzz_target!(|data: &[u8]| {
    let Ok(events) = decode(data) else {
        return;
    };
    for format in [LogFormat::Lines, LogFormat::Json] {
        let bytes = encode(&events, format).expect("decoded events must re-encode");
        let again = decode(&bytes).expect("encoded log must decode");
        assert_eq!(again, events);
    }
});
