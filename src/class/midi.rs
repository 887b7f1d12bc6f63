//! USB MIDI 1.0 streaming interface descriptors.

use std::fmt::Display;

use log::{debug, warn};

use super::{Body, ClassSpecificRecord};
use crate::{
    descriptors::{
        Descriptor, EndpointDescriptor, DESCRIPTOR_TYPE_CS_ENDPOINT, DESCRIPTOR_TYPE_CS_INTERFACE,
        DESCRIPTOR_TYPE_ENDPOINT,
    },
    endpoint::{Direction, EndpointRecord},
    walker::InterfaceRecord,
    Error, ErrorKind,
};

const MS_HEADER: u8 = 0x01;
const MS_IN_JACK: u8 = 0x02;
const MS_OUT_JACK: u8 = 0x03;
const MS_ELEMENT: u8 = 0x04;

const MS_HEADER_LEN: usize = 7;
const MS_IN_JACK_LEN: usize = 6;
const MS_OUT_JACK_MIN_LEN: usize = 7;
const MS_ENDPOINT_MIN_LEN: usize = 4;

fn subtype_name(subtype: u8) -> &'static str {
    match subtype {
        MS_HEADER => "HEADER",
        MS_IN_JACK => "MIDI_IN_JACK",
        MS_OUT_JACK => "MIDI_OUT_JACK",
        MS_ELEMENT => "MIDI_ELEMENT",
        _ => "",
    }
}

/// `bJackType`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JackType {
    Embedded,
    External,
    Undefined(u8),
}

impl From<u8> for JackType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => JackType::Embedded,
            0x02 => JackType::External,
            other => JackType::Undefined(other),
        }
    }
}

impl Display for JackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JackType::Embedded => f.write_str("Embedded"),
            JackType::External => f.write_str("External"),
            JackType::Undefined(v) => write!(f, "Undefined (0x{v:02x})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiInJack {
    pub jack_type: JackType,
    pub id: u8,
    /// `iJack`
    pub string_index: u8,
}

/// One input pin of a MIDI OUT jack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MidiSource {
    /// `baSourceID`: jack or element the pin connects to.
    pub id: u8,
    /// `baSourcePin`: output pin of that entity.
    pub pin: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutJack {
    pub jack_type: JackType,
    pub id: u8,
    pub sources: Vec<MidiSource>,
    /// `iJack`
    pub string_index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiJack {
    In(MidiInJack),
    Out(MidiOutJack),
}

/// Class-specific MS_GENERAL endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiEndpoint {
    /// Direction of the standard endpoint this descriptor follows, if any.
    pub direction: Option<Direction>,
    pub subtype: u8,
    /// `baAssocJackID`: embedded jacks carried by the endpoint.
    pub jack_ids: Vec<u8>,
}

/// MIDI streaming interface: header, jacks and MIDI endpoint descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MidiStreaming {
    /// `bcdMSC`: MIDIStreaming subclass release.
    pub msc_version: u16,
    /// `wTotalLength` of the class-specific descriptors, header included.
    pub total_length: u16,
    pub jacks: Vec<MidiJack>,
    pub endpoints: Vec<MidiEndpoint>,
}

pub(super) fn parse(record: &mut InterfaceRecord, body: Body) -> Result<(), Error> {
    let pos = body.start;
    let header = match Descriptor::new(body.rest(pos)) {
        Some(d)
            if d.descriptor_type() == DESCRIPTOR_TYPE_CS_INTERFACE
                && d.descriptor_subtype() == Some(MS_HEADER) =>
        {
            d
        }
        _ => {
            return Err(body.error(
                ErrorKind::UnsupportedSubtype,
                "MIDI streaming interface without header",
                pos,
            ))
        }
    };
    if header.descriptor_len() < MS_HEADER_LEN {
        return Err(body.error(ErrorKind::LengthOverflow, "MIDI header is too short", pos));
    }

    let mut ms = MidiStreaming {
        msc_version: u16::from_le_bytes([header[3], header[4]]),
        total_length: u16::from_le_bytes([header[5], header[6]]),
        ..Default::default()
    };
    let to_read = ms.total_length as isize - header.descriptor_len() as isize;
    let res = walk(&mut ms, &mut record.endpoints, body, pos + header.descriptor_len(), to_read);
    record.class_specific = ClassSpecificRecord::MidiStreaming(ms);
    res
}

/// Decode descriptors from `pos` until `to_read` bytes, as counted by each
/// descriptor's own length, have been consumed.
fn walk(
    ms: &mut MidiStreaming,
    endpoints: &mut Vec<EndpointRecord>,
    body: Body,
    mut pos: usize,
    mut to_read: isize,
) -> Result<(), Error> {
    let mut last_direction = None;

    while to_read > 0 {
        let Some(desc) = Descriptor::new(body.rest(pos)) else {
            return Err(body.error(
                ErrorKind::LengthOverflow,
                "MIDI descriptor runs past the interface",
                pos,
            ));
        };
        to_read -= desc.descriptor_len() as isize;

        match desc.descriptor_type() {
            DESCRIPTOR_TYPE_CS_INTERFACE => {
                let jack = match desc.descriptor_subtype() {
                    Some(MS_IN_JACK) => in_jack(&desc),
                    Some(MS_OUT_JACK) => out_jack(&desc),
                    other => {
                        debug!(
                            "MIDI interface descriptor subtype {:?} ({})",
                            other,
                            other.map(subtype_name).unwrap_or("")
                        );
                        return Err(body.error(
                            ErrorKind::UnsupportedSubtype,
                            "unhandled MIDI descriptor subtype",
                            pos,
                        ))
                    }
                };
                match jack {
                    Some(jack) => ms.jacks.push(jack),
                    None => {
                        return Err(body.error(
                            ErrorKind::LengthOverflow,
                            "MIDI jack descriptor is too short",
                            pos,
                        ))
                    }
                }
            }
            DESCRIPTOR_TYPE_ENDPOINT => match EndpointDescriptor::new(&desc) {
                Some(ep) => {
                    let ep = EndpointRecord::from_descriptor(ep);
                    last_direction = Some(ep.direction());
                    endpoints.push(ep);
                }
                None => warn!("ignoring endpoint descriptor of length {}", desc.descriptor_len()),
            },
            DESCRIPTOR_TYPE_CS_ENDPOINT if desc.descriptor_len() >= MS_ENDPOINT_MIN_LEN => {
                let count = desc[3] as usize;
                let jack_ids = desc.get(4..4 + count).unwrap_or(&desc[4..]).to_vec();
                ms.endpoints.push(MidiEndpoint {
                    direction: last_direction,
                    subtype: desc[2],
                    jack_ids,
                });
            }
            other => debug!("skipping descriptor of type 0x{other:02x} in MIDI interface"),
        }

        pos += desc.descriptor_len();
    }

    Ok(())
}

fn in_jack(desc: &[u8]) -> Option<MidiJack> {
    if desc.len() < MS_IN_JACK_LEN {
        return None;
    }
    Some(MidiJack::In(MidiInJack {
        jack_type: desc[3].into(),
        id: desc[4],
        string_index: desc[5],
    }))
}

fn out_jack(desc: &[u8]) -> Option<MidiJack> {
    if desc.len() < MS_OUT_JACK_MIN_LEN {
        return None;
    }
    let pins = desc[5] as usize;
    let string_index = *desc.get(6 + 2 * pins)?;
    let sources = desc[6..6 + 2 * pins]
        .chunks_exact(2)
        .map(|p| MidiSource { id: p[0], pin: p[1] })
        .collect();
    Some(MidiJack::Out(MidiOutJack {
        jack_type: desc[3].into(),
        id: desc[4],
        sources,
        string_index,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decoder, IdDatabase};

    fn midi_interface(buf: &[u8]) -> (crate::InterfaceRecord<'static>, Option<Error>) {
        static IDS: IdDatabase = IdDatabase::empty();
        let c = Decoder::new(&IDS, 1).decode_configuration(buf);
        assert!(c.is_complete());
        let mut group = c.data.groups.into_iter().next().unwrap();
        (group.interfaces.remove(0), group.error)
    }

    fn streaming<'r>(record: &'r crate::InterfaceRecord) -> &'r MidiStreaming {
        match &record.class_specific {
            ClassSpecificRecord::MidiStreaming(ms) => ms,
            other => panic!("expected MIDI streaming, got {other:?}"),
        }
    }

    #[test]
    #[rustfmt::skip]
    fn test_jacks_and_endpoints() {
        let (i, err) = midi_interface(&[
            0x09, 0x02, 0x44, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32,
            0x09, 0x04, 0x00, 0x00, 0x02, 0x01, 0x03, 0x00, 0x00,
            0x07, 0x24, 0x01, 0x00, 0x01, 0x32, 0x00,
            0x06, 0x24, 0x02, 0x01, 0x01, 0x00,
            0x09, 0x24, 0x03, 0x02, 0x02, 0x01, 0x01, 0x01, 0x05,
            0x09, 0x05, 0x01, 0x02, 0x40, 0x00, 0x00, 0x00, 0x00,
            0x05, 0x25, 0x01, 0x01, 0x01,
            0x09, 0x05, 0x81, 0x02, 0x40, 0x00, 0x00, 0x00, 0x00,
            0x05, 0x25, 0x01, 0x01, 0x02,
        ]);
        assert!(err.is_none());

        let ms = streaming(&i);
        assert_eq!(ms.msc_version, 0x0100);
        assert_eq!(ms.total_length, 0x32);
        assert_eq!(ms.jacks, vec![
            MidiJack::In(MidiInJack { jack_type: JackType::Embedded, id: 1, string_index: 0 }),
            MidiJack::Out(MidiOutJack {
                jack_type: JackType::External,
                id: 2,
                sources: vec![MidiSource { id: 1, pin: 1 }],
                string_index: 5,
            }),
        ]);
        assert_eq!(ms.endpoints, vec![
            MidiEndpoint { direction: Some(Direction::Out), subtype: 1, jack_ids: vec![1] },
            MidiEndpoint { direction: Some(Direction::In), subtype: 1, jack_ids: vec![2] },
        ]);
        assert_eq!(i.endpoints.len(), 2);
        assert_eq!(i.endpoints[1].address.raw(), 0x81);
        assert_eq!(i.endpoints[1].max_packet_size(), 64);
    }

    #[test]
    #[rustfmt::skip]
    fn test_stops_at_total_length() {
        // wTotalLength covers the two jacks; an element descriptor follows
        let (i, err) = midi_interface(&[
            0x09, 0x02, 0x2c, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32,
            0x09, 0x04, 0x00, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00,
            0x07, 0x24, 0x01, 0x00, 0x01, 0x16, 0x00,
            0x06, 0x24, 0x02, 0x02, 0x01, 0x00,
            0x09, 0x24, 0x03, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00,
            0x04, 0x24, 0x04, 0x00,
        ]);
        assert!(err.is_none());
        let ms = streaming(&i);
        assert_eq!(ms.jacks.len(), 2);
        assert!(matches!(ms.jacks[0], MidiJack::In(MidiInJack { jack_type: JackType::External, .. })));
        assert!(ms.endpoints.is_empty());
    }

    #[test]
    #[rustfmt::skip]
    fn test_unsupported_subtype() {
        let (i, err) = midi_interface(&[
            0x09, 0x02, 0x1d, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32,
            0x09, 0x04, 0x00, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00,
            0x07, 0x24, 0x01, 0x00, 0x01, 0x0b, 0x00,
            0x04, 0x24, 0x04, 0x00,
        ]);
        let err = err.unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSubtype);
        assert_eq!(err.offset(), Some(25));
        assert!(streaming(&i).jacks.is_empty());
    }

    #[test]
    #[rustfmt::skip]
    fn test_total_length_past_interface() {
        let (i, err) = midi_interface(&[
            0x09, 0x02, 0x1f, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32,
            0x09, 0x04, 0x00, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00,
            0x07, 0x24, 0x01, 0x00, 0x01, 0x40, 0x00,
            0x06, 0x24, 0x02, 0x01, 0x01, 0x00,
        ]);
        assert_eq!(err.unwrap().kind(), ErrorKind::LengthOverflow);
        // what was read before the overrun is kept
        assert_eq!(streaming(&i).jacks.len(), 1);
    }

    #[test]
    #[rustfmt::skip]
    fn test_missing_header() {
        let (i, err) = midi_interface(&[
            0x09, 0x02, 0x18, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32,
            0x09, 0x04, 0x00, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00,
            0x06, 0x24, 0x02, 0x01, 0x01, 0x00,
        ]);
        assert_eq!(err.unwrap().kind(), ErrorKind::UnsupportedSubtype);
        assert_eq!(i.class_specific, ClassSpecificRecord::None);
    }

    #[test]
    fn test_jack_type() {
        assert_eq!(JackType::from(1), JackType::Embedded);
        assert_eq!(JackType::from(7).to_string(), "Undefined (0x07)");
    }
}
