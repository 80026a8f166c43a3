//! Fuzz target: `JsonDecoder::decode` followed by `render`
//!
//! Arbitrary broker payloads must never panic the decoder, and any reading
//! it accepts as valid must render to a normalised colour.
//!
//! cargo fuzz run fuzz_payload_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use sugarlight::codec::{JsonDecoder, PayloadDecoder};
use sugarlight::render::render;

fuzz_target!(|data: &[u8]| {
    if let Ok(reading) = JsonDecoder.decode(data) {
        match render(reading.value()) {
            Ok(color) => {
                assert!(reading.is_valid());
                assert!(color.is_normalised(), "{:?}", color);
            }
            Err(_) => assert!(!reading.is_valid()),
        }
    }
});
