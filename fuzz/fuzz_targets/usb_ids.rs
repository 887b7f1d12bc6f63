#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(ids) = usbdecode::IdDatabase::parse_usb_ids(text) {
            std::hint::black_box(ids.class_sub_proto(0x03, 0x01, 0x01));
            std::hint::black_box(ids.vid_pid(0x1d6b, 0x0002));
        }
    }
});
