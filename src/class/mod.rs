//! Class-specific interface parsers.
//!
//! Every interface group is handed to one parser family, picked by the class
//! of the group's first interface. Members of a HID or audio group with a
//! different class are decoded by their own class's parser. The parser fills
//! in the
//! [`ClassSpecificRecord`] and endpoints of each [`InterfaceRecord`].

use log::{trace, warn};

use crate::{
    descriptors::{
        Descriptors, EndpointDescriptor, InterfaceDescriptor, DESCRIPTOR_TYPE_ENDPOINT,
    },
    endpoint::EndpointRecord,
    walker::InterfaceRecord,
    Decoder, Error, ErrorKind,
};

mod audio;
mod hid;
mod midi;

pub use audio::{AudioControlHeader, AudioStreamingHeader};
pub use hid::HidDescriptor;
pub use midi::{JackType, MidiEndpoint, MidiInJack, MidiJack, MidiOutJack, MidiSource, MidiStreaming};

pub(crate) const CLASS_AUDIO: u8 = 0x01;
pub(crate) const CLASS_HID: u8 = 0x03;

/// Decoded class-specific part of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSpecificRecord {
    /// No class-specific descriptor was decoded for this interface.
    None,
    Hid(HidDescriptor),
    AudioControl(AudioControlHeader),
    AudioStreaming(AudioStreamingHeader),
    MidiStreaming(MidiStreaming),
}

/// Parser family for an interface group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ClassParser {
    Hid,
    Audio,
    Generic,
}

impl ClassParser {
    pub(crate) fn for_class(class: u8) -> Self {
        match class {
            CLASS_HID => ClassParser::Hid,
            CLASS_AUDIO => ClassParser::Audio,
            _ => ClassParser::Generic,
        }
    }

    /// Parser for a group member of class `class` in a group of this family.
    ///
    /// A generic family decodes all its members generically.
    pub(crate) fn for_member(self, class: u8) -> Self {
        match self {
            ClassParser::Generic => ClassParser::Generic,
            _ => ClassParser::for_class(class),
        }
    }
}

/// Decode one interface: its header, then the class-specific part with the
/// group's `parser` (see [`ClassParser::for_member`]).
///
/// `buf` runs from the interface descriptor up to the next interface descriptor
/// or the end of the group, and starts at byte `offset` of the configuration.
///
/// The record is returned even when the class parser fails, holding whatever
/// was decoded before the error.
pub(crate) fn parse_interface<'a>(
    decoder: &mut Decoder<'a, '_>,
    parser: ClassParser,
    buf: &[u8],
    offset: usize,
) -> (Option<InterfaceRecord<'a>>, Result<(), Error>) {
    let Some(header) = InterfaceDescriptor::new(buf) else {
        return (
            None,
            Err(Error::at(
                ErrorKind::LengthOverflow,
                "interface descriptor is too short",
                offset,
            )),
        );
    };

    let mut record = InterfaceRecord::from_descriptor(header, decoder.ids, offset, buf.len());
    let parser = parser.for_member(record.class);
    trace!(
        "interface {} alt {} class 0x{:02x} at byte {offset} ({} bytes) with {:?} parser",
        record.number,
        record.alternate_setting,
        record.class,
        buf.len(),
        parser
    );

    let body = Body {
        buf,
        start: header.descriptor_len(),
        offset,
    };

    let res = match parser {
        ClassParser::Hid => hid::parse(decoder, &mut record, body),
        ClassParser::Audio => audio::parse(&mut record, body),
        ClassParser::Generic => {
            parse_generic(&mut record, body);
            Ok(())
        }
    };

    (Some(record), res)
}

/// Bytes of one interface, with the position where the class-specific
/// descriptors begin and the interface's offset in the configuration.
#[derive(Clone, Copy)]
pub(crate) struct Body<'b> {
    pub(crate) buf: &'b [u8],
    pub(crate) start: usize,
    pub(crate) offset: usize,
}

impl<'b> Body<'b> {
    pub(crate) fn rest(&self, pos: usize) -> &'b [u8] {
        self.buf.get(pos..).unwrap_or(&[])
    }

    pub(crate) fn error(&self, kind: ErrorKind, message: &'static str, pos: usize) -> Error {
        Error::at(kind, message, self.offset + pos)
    }
}

/// Decode every endpoint after the interface header, skipping anything else.
fn parse_generic(record: &mut InterfaceRecord, body: Body) {
    for desc in Descriptors::new(body.rest(body.start)) {
        if desc.descriptor_type() != DESCRIPTOR_TYPE_ENDPOINT {
            trace!("skipping descriptor of type 0x{:02x}", desc.descriptor_type());
            continue;
        }
        match EndpointDescriptor::new(&desc) {
            Some(ep) => record.endpoints.push(EndpointRecord::from_descriptor(ep)),
            None => warn!(
                "ignoring endpoint descriptor of length {}",
                desc.descriptor_len()
            ),
        }
    }
}
