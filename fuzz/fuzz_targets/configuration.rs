#![no_main]

use libfuzzer_sys::fuzz_target;
use usbdecode::{Decoder, IdDatabase};

fuzz_target!(|data: &[u8]| {
    static IDS: IdDatabase = IdDatabase::empty();
    let config = Decoder::new(&IDS, 1).decode_configuration(data);
    let s = format!("{config:?}");
    std::hint::black_box(s);
});
