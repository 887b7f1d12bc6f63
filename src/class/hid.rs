use log::debug;

use super::{Body, ClassSpecificRecord};
use crate::{
    descriptors::{
        checked_descriptor, descriptor_fields, Descriptor, EndpointDescriptor,
        DESCRIPTOR_LEN_ENDPOINT, DESCRIPTOR_LEN_HID, DESCRIPTOR_LEN_INTERFACE,
        DESCRIPTOR_TYPE_ENDPOINT, DESCRIPTOR_TYPE_HID,
    },
    endpoint::{Direction, EndpointRecord},
    walker::InterfaceRecord,
    Decoder, ErrorKind,
};

/// HID class descriptor (`bDescriptorType` 0x21).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDescriptor {
    /// `bcdHID`: HID specification release.
    pub hid_version: u16,
    pub country_code: u8,
    /// `bNumDescriptors`: number of class descriptors that follow (at least the report descriptor).
    pub num_descriptors: u8,
    /// `bDescriptorType` of the first class descriptor, normally 0x22 (report).
    pub report_type: u8,
    /// `wDescriptorLength` of the first class descriptor.
    pub report_length: u16,
}

struct RawHid<'a>(&'a [u8]);

descriptor_fields! {
    impl<'a> RawHid<'a> {
        fn hid_version at 2 -> u16;
        fn country_code at 4 -> u8;
        fn num_descriptors at 5 -> u8;
        fn report_type at 6 -> u8;
        fn report_length at 7 -> u16;
    }
}

/// Interface, HID descriptor, then exactly `bNumEndpoints` endpoints.
pub(super) fn parse(
    decoder: &mut Decoder,
    record: &mut InterfaceRecord,
    body: Body,
) -> Result<(), crate::Error> {
    let expected = DESCRIPTOR_LEN_INTERFACE as usize
        + DESCRIPTOR_LEN_HID as usize
        + record.num_endpoints as usize * DESCRIPTOR_LEN_ENDPOINT as usize;
    if body.buf.len() < expected {
        return Err(body.error(
            ErrorKind::LengthOverflow,
            "HID interface shorter than its descriptors",
            0,
        ));
    }

    let mut pos = body.start;
    let Some(hid) = checked_descriptor(body.rest(pos), DESCRIPTOR_TYPE_HID, DESCRIPTOR_LEN_HID)
    else {
        return Err(body.error(
            ErrorKind::BadDescriptorType,
            "expected HID descriptor after interface",
            pos,
        ));
    };
    let raw = RawHid(hid);
    record.class_specific = ClassSpecificRecord::Hid(HidDescriptor {
        hid_version: raw.hid_version(),
        country_code: raw.country_code(),
        num_descriptors: raw.num_descriptors(),
        report_type: raw.report_type(),
        report_length: raw.report_length(),
    });
    pos += hid.len();

    for _ in 0..record.num_endpoints {
        let Some(desc) = Descriptor::new(body.rest(pos)) else {
            return Err(body.error(
                ErrorKind::LengthOverflow,
                "HID endpoint descriptor runs past the interface",
                pos,
            ));
        };
        if desc.descriptor_type() != DESCRIPTOR_TYPE_ENDPOINT {
            return Err(body.error(ErrorKind::BadEndpointType, "bad endpoint type", pos));
        }
        let Some(ep) = EndpointDescriptor::new(&desc) else {
            return Err(body.error(
                ErrorKind::LengthOverflow,
                "HID endpoint descriptor is too short",
                pos,
            ));
        };

        let mut endpoint = EndpointRecord::from_descriptor(ep);
        if endpoint.direction() == Direction::In {
            endpoint.polling = decoder.request_polling(&endpoint);
        } else {
            debug!("not polling {}", endpoint.address);
        }
        record.endpoints.push(endpoint);
        pos += desc.descriptor_len();
    }

    Ok(())
}
