//! Compiled-in identifier tables: the USB-IF class tree and a selection of common vendors.

use super::{IdDatabase, IdDatabaseBuilder, Name, ProductEntry, ProtocolEntry, SubclassDef};

type Products = &'static [(u16, &'static str)];
type Protocols = &'static [(u8, &'static str)];
type Subclasses = &'static [(u8, &'static str, Protocols)];

#[rustfmt::skip]
static VENDORS: &[(u16, &str, Products)] = &[
    (0x03eb, "Atmel Corp.", &[
        (0x2104, "AVR ISP mkII"),
        (0x2ff4, "atmega32u4 DFU bootloader"),
    ]),
    (0x0403, "Future Technology Devices International, Ltd", &[
        (0x6001, "FT232 Serial (UART) IC"),
        (0x6010, "FT2232C/D/H Dual UART/FIFO IC"),
        (0x6014, "FT232H Single HS USB-UART/FIFO IC"),
        (0x6015, "Bridge(I2C/SPI/UART/FIFO)"),
    ]),
    (0x045e, "Microsoft Corp.", &[
        (0x0040, "Wheel Mouse Optical"),
        (0x028e, "Xbox360 Controller"),
        (0x0750, "Wired Keyboard 600"),
    ]),
    (0x046d, "Logitech, Inc.", &[
        (0xc077, "M105 Optical Mouse"),
        (0xc52b, "Unifying Receiver"),
        (0xc534, "Unifying Receiver"),
    ]),
    (0x0483, "STMicroelectronics", &[
        (0x3748, "ST-LINK/V2"),
        (0x5740, "Virtual COM Port"),
        (0xdf11, "STM Device in DFU Mode"),
    ]),
    (0x04d8, "Microchip Technology, Inc.", &[
        (0x000a, "CDC RS-232 Emulation Demo"),
    ]),
    (0x05ac, "Apple, Inc.", &[
        (0x024f, "Aluminium Keyboard (ANSI)"),
        (0x12a8, "iPhone 5/5C/5S/6/SE/7/8/X/XR"),
    ]),
    (0x0781, "SanDisk Corp.", &[
        (0x5567, "Cruzer Blade"),
        (0x5583, "Ultra Fit"),
    ]),
    (0x0951, "Kingston Technology", &[
        (0x1666, "DataTraveler 100 G3/G4/SE9 G2/50"),
    ]),
    (0x0a12, "Cambridge Silicon Radio, Ltd", &[
        (0x0001, "Bluetooth Dongle (HCI mode)"),
    ]),
    (0x0bda, "Realtek Semiconductor Corp.", &[
        (0x8153, "RTL8153 Gigabit Ethernet Adapter"),
    ]),
    (0x0d8c, "C-Media Electronics, Inc.", &[
        (0x0014, "Audio Adapter (Unitek Y-247A)"),
    ]),
    (0x1050, "Yubico.com", &[
        (0x0407, "Yubikey 4/5 OTP+U2F+CCID"),
    ]),
    (0x10c4, "Silicon Labs", &[
        (0xea60, "CP210x UART Bridge"),
    ]),
    (0x1a86, "QinHeng Electronics", &[
        (0x7523, "CH340 serial converter"),
    ]),
    (0x1d6b, "Linux Foundation", &[
        (0x0001, "1.1 root hub"),
        (0x0002, "2.0 root hub"),
        (0x0003, "3.0 root hub"),
        (0x0104, "Multifunction Composite Gadget"),
    ]),
    (0x2341, "Arduino SA", &[
        (0x0043, "Uno R3 (CDC ACM)"),
        (0x8036, "Leonardo (CDC ACM, HID)"),
    ]),
    (0x2e8a, "Raspberry Pi", &[
        (0x0003, "RP2 Boot"),
        (0x000a, "Pico"),
    ]),
    (0x303a, "Espressif", &[
        (0x1001, "USB JTAG/serial debug unit"),
    ]),
    (0x8087, "Intel Corp.", &[
        (0x0024, "Integrated Rate Matching Hub"),
        (0x0a2b, "Bluetooth wireless interface"),
    ]),
];

const NO_PROTOCOLS: Protocols = &[];

const CDC_ACM_PROTOCOLS: Protocols = &[
    (0x00, "None"),
    (0x01, "AT-commands (v.25ter)"),
    (0x02, "AT-commands (PCCA101)"),
    (0x03, "AT-commands (PCCA101 + wakeup)"),
    (0x04, "AT-commands (GSM)"),
    (0x05, "AT-commands (3G)"),
    (0x06, "AT-commands (CDMA)"),
    (0xfe, "Defined by command set descriptor"),
    (0xff, "Vendor Specific (MSFT RNDIS?)"),
];

const HID_PROTOCOLS: Protocols = &[(0x00, "None"), (0x01, "Keyboard"), (0x02, "Mouse")];

const MASS_STORAGE_PROTOCOLS: Protocols = &[
    (0x00, "Control/Bulk/Interrupt"),
    (0x01, "Control/Bulk"),
    (0x50, "Bulk-Only"),
];

#[rustfmt::skip]
static CLASSES: &[(u8, &str, Subclasses)] = &[
    (0x00, "(Defined at Interface level)", &[]),
    (0x01, "Audio", &[
        (0x01, "Control Device", NO_PROTOCOLS),
        (0x02, "Streaming", NO_PROTOCOLS),
        (0x03, "MIDI Streaming", NO_PROTOCOLS),
    ]),
    (0x02, "Communications", &[
        (0x01, "Direct Line", NO_PROTOCOLS),
        (0x02, "Abstract (modem)", CDC_ACM_PROTOCOLS),
        (0x03, "Telephone", NO_PROTOCOLS),
        (0x04, "Multi-Channel", NO_PROTOCOLS),
        (0x05, "CAPI Control", NO_PROTOCOLS),
        (0x06, "Ethernet Networking", NO_PROTOCOLS),
        (0x07, "ATM Networking", NO_PROTOCOLS),
        (0x08, "Wireless Handset Control", NO_PROTOCOLS),
        (0x09, "Device Management", NO_PROTOCOLS),
        (0x0a, "Mobile Direct Line", NO_PROTOCOLS),
        (0x0b, "OBEX", NO_PROTOCOLS),
        (0x0c, "Ethernet Emulation", NO_PROTOCOLS),
        (0x0d, "Network Control Model", NO_PROTOCOLS),
    ]),
    (0x03, "Human Interface Device", &[
        (0x00, "No Subclass", HID_PROTOCOLS),
        (0x01, "Boot Interface Subclass", HID_PROTOCOLS),
    ]),
    (0x05, "Physical Interface Device", &[]),
    (0x06, "Imaging", &[
        (0x01, "Still Image Capture", &[(0x01, "Picture Transfer Protocol (PIMA 15470)")]),
    ]),
    (0x07, "Printer", &[
        (0x01, "Printer", &[
            (0x00, "Reserved/Undefined"),
            (0x01, "Unidirectional"),
            (0x02, "Bidirectional"),
            (0x03, "IEEE 1284.4 compatible bidirectional"),
            (0xff, "Vendor Specific"),
        ]),
    ]),
    (0x08, "Mass Storage", &[
        (0x01, "RBC (typically Flash)", MASS_STORAGE_PROTOCOLS),
        (0x02, "SFF-8020i, MMC-2 (ATAPI)", NO_PROTOCOLS),
        (0x03, "QIC-157", NO_PROTOCOLS),
        (0x04, "Floppy (UFI)", MASS_STORAGE_PROTOCOLS),
        (0x05, "SFF-8070i", NO_PROTOCOLS),
        (0x06, "SCSI", &[
            (0x00, "Control/Bulk/Interrupt"),
            (0x01, "Control/Bulk"),
            (0x50, "Bulk-Only"),
            (0x62, "UAS"),
        ]),
    ]),
    (0x09, "Hub", &[
        (0x00, "Unused", &[
            (0x00, "Full speed (or root) hub"),
            (0x01, "Single TT"),
            (0x02, "TT per port"),
        ]),
    ]),
    (0x0a, "CDC Data", &[
        (0x00, "Unused", &[
            (0x30, "I.430 ISDN BRI"),
            (0x31, "HDLC"),
            (0x32, "Transparent"),
            (0x50, "Q.921M"),
            (0x51, "Q.921"),
            (0x52, "Q.921TM"),
            (0x90, "V.42bis"),
            (0x91, "Q.932 EuroISDN"),
            (0x92, "V.120 V.24 rate ISDN"),
            (0x93, "CAPI 2.0"),
            (0xfd, "Host Based Driver"),
            (0xfe, "CDC PUF"),
            (0xff, "Vendor specific"),
        ]),
    ]),
    (0x0b, "Chip/SmartCard", &[]),
    (0x0d, "Content Security", &[]),
    (0x0e, "Video", &[
        (0x00, "Undefined", NO_PROTOCOLS),
        (0x01, "Video Control", NO_PROTOCOLS),
        (0x02, "Video Streaming", NO_PROTOCOLS),
        (0x03, "Video Interface Collection", NO_PROTOCOLS),
    ]),
    (0x0f, "Personal Healthcare", &[]),
    (0x10, "Audio/Video", &[]),
    (0x11, "Billboard", &[]),
    (0x58, "Xbox", &[
        (0x42, "Controller", NO_PROTOCOLS),
    ]),
    (0xdc, "Diagnostic", &[
        (0x01, "Reprogrammable Diagnostics", &[(0x01, "USB2 Compliance")]),
    ]),
    (0xe0, "Wireless", &[
        (0x01, "Radio Frequency", &[
            (0x01, "Bluetooth"),
            (0x02, "Ultra WideBand Radio Control"),
            (0x03, "RNDIS"),
        ]),
        (0x02, "Wireless USB Wire Adapter", &[
            (0x01, "Host Wire Adapter Control/Data Streaming"),
            (0x02, "Device Wire Adapter Control/Data Streaming"),
            (0x03, "Device Wire Adapter Isochronous Streaming"),
        ]),
    ]),
    (0xef, "Miscellaneous Device", &[
        (0x02, "?", &[(0x01, "Interface Association")]),
        (0x03, "Cable Based Association", NO_PROTOCOLS),
        (0x05, "USB3 Vision", NO_PROTOCOLS),
    ]),
    (0xfe, "Application Specific Interface", &[
        (0x01, "Device Firmware Update", NO_PROTOCOLS),
        (0x02, "IRDA Bridge", NO_PROTOCOLS),
        (0x03, "Test and Measurement", &[(0x01, "TMC"), (0x02, "USB488")]),
    ]),
    (0xff, "Vendor Specific Class", &[
        (0xff, "Vendor Specific Subclass", &[(0xff, "Vendor Specific Protocol")]),
    ]),
];

pub(super) fn build() -> IdDatabase {
    let mut builder = IdDatabaseBuilder::new();

    for &(id, name, products) in VENDORS {
        let products = products
            .iter()
            .map(|&(id, name)| ProductEntry { id, name: Name::Borrowed(name) })
            .collect();
        builder.vendor_with_products(id, Name::Borrowed(name), products);
    }

    for &(id, name, subclasses) in CLASSES {
        let subclasses = subclasses
            .iter()
            .map(|&(id, name, protocols)| SubclassDef {
                id,
                name: Name::Borrowed(name),
                protocols: protocols
                    .iter()
                    .map(|&(id, name)| ProtocolEntry { id, name: Name::Borrowed(name) })
                    .collect(),
            })
            .collect();
        builder.class_with_subclasses(id, Name::Borrowed(name), subclasses);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted() {
        assert!(VENDORS.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(CLASSES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_builtin_lookups() {
        let db = IdDatabase::builtin();
        assert_eq!(db.vendors().len(), VENDORS.len());
        assert_eq!(db.classes().len(), CLASSES.len());

        for &(id, name, products) in VENDORS {
            let vendor = db.vendor(id);
            assert_eq!(vendor.name, name);
            for &(pid, pname) in products {
                assert_eq!(db.product(vendor, pid).name, pname);
            }
        }

        let r = db.vid_pid(0x1d6b, 0x0002);
        assert_eq!(r.vendor.name, "Linux Foundation");
        assert_eq!(r.product.name, "2.0 root hub");

        let r = db.class_sub_proto(0x09, 0x00, 0x01);
        assert_eq!(r.class.name, "Hub");
        assert_eq!(r.protocol.name, "Single TT");

        // first and last entries
        assert_eq!(db.class(0x00).name, "(Defined at Interface level)");
        assert_eq!(db.class(0xff).name, "Vendor Specific Class");
        assert_eq!(db.vendor(0x03eb).name, "Atmel Corp.");
        assert_eq!(db.vendor(0x8087).name, "Intel Corp.");
    }

    #[test]
    fn test_builtin_class_tree() {
        let db = IdDatabase::builtin();
        let total: usize = CLASSES.iter().map(|c| c.2.len()).sum();
        assert_eq!(db.subclasses().len(), total);

        for &(id, name, subclasses) in CLASSES {
            let class = db.class(id);
            assert_eq!(class.name, name);
            assert_eq!(class.subclass_count, subclasses.len());
            for &(sid, sname, protocols) in subclasses {
                let subclass = db.subclass(sid, class.subclass_offset, class.subclass_count);
                assert_eq!(subclass.name, sname);
                assert_eq!(subclass.protocol_count, protocols.len());
                for &(pid, pname) in protocols {
                    let protocol =
                        db.protocol(pid, subclass.protocol_offset, subclass.protocol_count);
                    assert_eq!(protocol.name, pname);
                }
            }
        }
    }
}
