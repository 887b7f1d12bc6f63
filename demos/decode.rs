//! Decode a hex dump of descriptors and print them with their names.
//!
//! Usage: `decode <hex file> [usb.ids]`, or `-` to read the dump from stdin.
//! The dump may start with an 18-byte device descriptor.

use std::io::{self, Read};

use usbdecode::{
    ClassSpecificRecord, ClassSubProto, Decoder, DeviceDescriptor, IdDatabase, InterfaceRecord,
    MidiJack,
};

fn main() -> io::Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);

    let text = match args.next().as_deref() {
        None | Some("-") => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
        Some(path) => std::fs::read_to_string(path)?,
    };
    let bytes = parse_hex(&text)?;

    let parsed;
    let ids = match args.next() {
        Some(path) => {
            parsed = IdDatabase::parse_usb_ids(&std::fs::read_to_string(path)?)?;
            &parsed
        }
        None => IdDatabase::builtin(),
    };

    let mut decoder = Decoder::new(ids, 1);
    let mut config = &bytes[..];

    if let Some(dev) = DeviceDescriptor::new(&bytes) {
        let r = decoder.identify_device(&dev);
        println!(
            "Device {:04x}:{:04x} {} {}",
            dev.vendor_id(),
            dev.product_id(),
            r.vendor.name,
            r.product.name
        );
        println!("  Class {}", names(&r.class, dev.class(), dev.subclass(), dev.protocol()));
        config = &bytes[18..];
    }

    let decoded = decoder.decode_configuration(config);
    let c = &decoded.data;
    println!(
        "  Configuration {}, {} bytes, {} interfaces, attributes 0x{:02x}, max power {}mA",
        c.configuration_value,
        c.total_length,
        c.num_interfaces,
        c.attributes,
        c.max_power as u32 * 2
    );

    for group in &c.groups {
        if let Some(iad) = &group.association {
            println!(
                "    Association of {} interfaces from {}: {}",
                iad.interface_count,
                iad.first_interface,
                names(
                    &iad.names,
                    iad.function_class,
                    iad.function_subclass,
                    iad.function_protocol
                )
            );
        }
        for intf in &group.interfaces {
            print_interface(intf);
        }
        if let Some(e) = &group.error {
            println!("    Error: {e}");
        }
    }

    if let Some(e) = &decoded.error {
        println!("  Stopped: {e}");
    }
    println!("");
    Ok(())
}

fn print_interface(intf: &InterfaceRecord) {
    println!(
        "    Interface {}, alt setting {}: {}",
        intf.number,
        intf.alternate_setting,
        names(&intf.names, intf.class, intf.subclass, intf.protocol)
    );

    match &intf.class_specific {
        ClassSpecificRecord::None => {}
        ClassSpecificRecord::Hid(hid) => println!(
            "      HID {:x}.{:02x}, report descriptor {} bytes",
            hid.hid_version >> 8,
            hid.hid_version & 0xff,
            hid.report_length
        ),
        ClassSpecificRecord::AudioControl(h) => println!(
            "      AudioControl ADC {:04x}, category 0x{:02x}",
            h.adc_version, h.category
        ),
        ClassSpecificRecord::AudioStreaming(h) => println!(
            "      AudioStreaming terminal {}, {} channels, formats 0x{:08x}",
            h.terminal_link, h.num_channels, h.formats
        ),
        ClassSpecificRecord::MidiStreaming(ms) => {
            for jack in &ms.jacks {
                match jack {
                    MidiJack::In(j) => println!("      MIDI IN jack {} ({})", j.id, j.jack_type),
                    MidiJack::Out(j) => println!(
                        "      MIDI OUT jack {} ({}) from {:?}",
                        j.id,
                        j.jack_type,
                        j.sources.iter().map(|s| s.id).collect::<Vec<_>>()
                    ),
                }
            }
            for ep in &ms.endpoints {
                println!("      MIDI endpoint {:?} jacks {:?}", ep.direction, ep.jack_ids);
            }
        }
    }

    for ep in &intf.endpoints {
        println!(
            "      {} {} {} bytes, interval {} {:?}",
            ep.address,
            ep.transfer_type(),
            ep.max_packet_size(),
            ep.interval,
            ep.polling
        );
    }
}

fn names(n: &ClassSubProto, class: u8, subclass: u8, protocol: u8) -> String {
    format!(
        "{class:02x}/{subclass:02x}/{protocol:02x} {} / {} / {}",
        n.class.name, n.subclass.name, n.protocol.name
    )
}

fn parse_hex(text: &str) -> io::Result<Vec<u8>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_start_matches("0x"))
        .filter(|t| !t.is_empty())
        .map(|t| {
            u8::from_str_radix(t, 16).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        })
        .collect()
}
