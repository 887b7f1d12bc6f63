//! Reader for the linux-usb `usb.ids` text format.
//!
//! ```text
//! # comment
//! 1d6b  Linux Foundation
//! 	0002  2.0 root hub
//! C 03  Human Interface Device
//! 	01  Boot Interface Subclass
//! 		02  Mouse
//! ```

use log::trace;

use super::{IdDatabase, IdDatabaseBuilder};
use crate::{Error, ErrorKind};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Start,
    Vendor,
    Class,
    /// `AT`, `HID`, `R`, `BIAS`, `PHY`, `HUT`, `L`, `HCC`, `VT` and anything else unknown
    Other,
}

pub(super) fn parse(text: &str) -> Result<IdDatabase, Error> {
    let mut builder = IdDatabaseBuilder::new();
    let mut section = Section::Start;

    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let depth = line.bytes().take_while(|&b| b == b'\t').count();
        let line = &line[depth..];
        let err = |message| Error::at(ErrorKind::InvalidDatabase, message, line_number);

        match (depth, section) {
            (0, _) => {
                if let Some(rest) = line.strip_prefix("C ") {
                    let (id, name) = split_entry(rest, 2).ok_or_else(|| err("invalid class line"))?;
                    builder.class(id as u8, name.to_owned());
                    section = Section::Class;
                } else if let Some((id, name)) = split_entry(line, 4) {
                    builder.vendor(id, name.to_owned());
                    section = Section::Vendor;
                } else {
                    trace!("skipping usb.ids section at line {line_number}");
                    section = Section::Other;
                }
            }
            (1, Section::Vendor) => {
                let (id, name) = split_entry(line, 4).ok_or_else(|| err("invalid product line"))?;
                builder
                    .product(id, name.to_owned())
                    .map_err(|_| err("product without a vendor"))?;
            }
            (1, Section::Class) => {
                let (id, name) = split_entry(line, 2).ok_or_else(|| err("invalid subclass line"))?;
                builder
                    .subclass(id as u8, name.to_owned())
                    .map_err(|_| err("subclass without a class"))?;
            }
            (2, Section::Class) => {
                let (id, name) = split_entry(line, 2).ok_or_else(|| err("invalid protocol line"))?;
                builder
                    .protocol(id as u8, name.to_owned())
                    .map_err(|_| err("protocol without a subclass"))?;
            }
            // interface names under products
            (2, Section::Vendor) => {}
            (_, Section::Other) => {}
            (_, Section::Start) => return Err(err("indented line before any section")),
            _ => return Err(err("unexpected indentation")),
        }
    }

    Ok(builder.build())
}

/// Split `"<hex id of exactly digits chars>  <name>"`.
fn split_entry(line: &str, digits: usize) -> Option<(u16, &str)> {
    let (id, name) = line.split_once(|c: char| c.is_ascii_whitespace())?;
    if id.len() != digits {
        return None;
    }
    let id = u16::from_str_radix(id, 16).ok()?;
    Some((id, name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
#
#	List of USB ID's
#
# Syntax:
# vendor  vendor_name
#	device  device_name				<-- single tab
#		interface  interface_name		<-- two tabs

0403  Future Technology Devices International, Ltd
	6001  FT232 Serial (UART) IC
	6010  FT2232C/D/H Dual UART/FIFO IC
		00  Interface A
1d6b  Linux Foundation
	0001  1.1 root hub
	0002  2.0 root hub

C 00  (Defined at Interface level)
C 03  Human Interface Device
	00  No Subclass
	01  Boot Interface Subclass
		01  Keyboard
		02  Mouse

AT 0409  US English
HID 21  HID
R 00  Undefined
	00  ignored
C 09  Hub
	00  Unused
		00  Full speed (or root) hub
";

    #[test]
    fn test_parse_sample() {
        let db = parse(SAMPLE).unwrap();
        assert_eq!(db.vendors().len(), 2);
        assert_eq!(db.products().len(), 4);
        assert_eq!(db.vid_pid(0x0403, 0x6010).product.name, "FT2232C/D/H Dual UART/FIFO IC");
        assert_eq!(db.vid_pid(0x1d6b, 0x0001).product.name, "1.1 root hub");

        assert_eq!(db.classes().len(), 3);
        let r = db.class_sub_proto(0x03, 0x01, 0x02);
        assert_eq!(r.class.name, "Human Interface Device");
        assert_eq!(r.protocol.name, "Mouse");
        let r = db.class_sub_proto(0x09, 0x00, 0x00);
        assert_eq!(r.protocol.name, "Full speed (or root) hub");

        // "AT 0409" must not be read as a vendor
        assert!(db.vendor(0x0409).is_null());
    }

    #[test]
    fn test_parse_errors() {
        let e = parse("1d6b  Linux Foundation\n\tzz  bad\n").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidDatabase);
        assert_eq!(e.offset(), Some(2));

        let e = parse("\t0001  orphan\n").unwrap_err();
        assert_eq!(e.offset(), Some(1));

        let e = parse("C 03  HID\n\t\t\t01  too deep\n").unwrap_err();
        assert_eq!(e.offset(), Some(2));
    }

    #[test]
    fn test_io_error() {
        fn load(text: &str) -> std::io::Result<crate::IdDatabase> {
            Ok(crate::IdDatabase::parse_usb_ids(text)?)
        }
        let e = load("1d6b  Linux Foundation\n\tzz  bad\n").unwrap_err();
        assert_eq!(e.kind(), std::io::ErrorKind::InvalidData);
        assert!(e.to_string().ends_with("(line 2)"));
    }
}
