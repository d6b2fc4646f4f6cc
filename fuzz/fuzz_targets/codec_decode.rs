#![no_main]

use libfuzzer_sys::fuzz_target;
use vox_codec::edit::{parse_edit_packet, parse_edit_records};
use vox_codec::header::parse_edit_header;
use vox_core::octal::code_length;

fuzz_target!(|data: &[u8]| {
    let _ = code_length(data);
    let _ = parse_edit_header(data);
    let _ = parse_edit_records(data);
    let _ = parse_edit_packet(data);
});
