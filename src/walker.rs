//! Walk a configuration descriptor and split it into interface groups.
//!
//! A configuration descriptor is the 9-byte configuration header followed by
//! every interface, class-specific and endpoint descriptor of the
//! configuration, `wTotalLength` bytes in all. Interfaces are grouped into
//! functions: an interface association descriptor (IAD) claims the
//! `bInterfaceCount` interfaces that follow it, and without one each
//! interface forms its own group together with its alternate settings.

use log::{trace, warn};

use crate::{
    class::{parse_interface, ClassParser, ClassSpecificRecord},
    descriptors::{
        ConfigurationHeader, Descriptor, Descriptors, InterfaceAssociationDescriptor,
        InterfaceDescriptor, DESCRIPTOR_LEN_INTERFACE, DESCRIPTOR_TYPE_INTERFACE,
        DESCRIPTOR_TYPE_INTERFACE_ASSOCIATION,
    },
    endpoint::EndpointRecord,
    ids::{ClassSubProto, IdDatabase},
    Decoder, Error, ErrorKind,
};

/// Result of a decode that keeps going after an error.
///
/// `data` always holds everything decoded up to the point of failure. When
/// `error` is `Some`, decoding stopped early.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub data: T,
    pub error: Option<Error>,
}

impl<T> Decoded<T> {
    /// `true` if the whole input was decoded.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discard the partial data on error.
    pub fn into_result(self) -> Result<T, Error> {
        match self.error {
            None => Ok(self.data),
            Some(e) => Err(e),
        }
    }
}

/// A decoded configuration descriptor.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationRecord<'a> {
    /// `wTotalLength` as used for the walk.
    pub total_length: u16,
    /// `bNumInterfaces`
    pub num_interfaces: u8,
    /// `bConfigurationValue`
    pub configuration_value: u8,
    /// `iConfiguration`
    pub string_index: Option<u8>,
    /// `bmAttributes`
    pub attributes: u8,
    /// `bMaxPower` in device-speed-specific units (2 mA at USB 2.0).
    pub max_power: u8,
    pub groups: Vec<InterfaceGroup<'a>>,
}

impl<'a> ConfigurationRecord<'a> {
    /// Iterate over every interface and alternate setting in all groups.
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceRecord<'a>> {
        self.groups.iter().flat_map(|g| g.interfaces.iter())
    }
}

/// Interfaces forming one function, delimited by an interface association
/// descriptor or by the next interface with alternate setting 0.
#[derive(Debug, Clone)]
pub struct InterfaceGroup<'a> {
    pub association: Option<InterfaceAssociation<'a>>,
    /// Byte offset of the group's first interface descriptor.
    pub offset: usize,
    /// Bytes from the first interface descriptor to the end of the group.
    pub length: usize,
    pub interfaces: Vec<InterfaceRecord<'a>>,
    /// Error that stopped decoding of this group. Later interfaces of the
    /// group are missing from `interfaces`.
    pub error: Option<Error>,
}

impl<'a> InterfaceGroup<'a> {
    /// Number of interfaces the group was declared with.
    pub fn association_count(&self) -> u8 {
        self.association.as_ref().map_or(1, |a| a.interface_count)
    }

    /// Length of the group including its association descriptor.
    pub fn total_len(&self) -> usize {
        self.length + self.association.as_ref().map_or(0, |a| a.length)
    }
}

/// A decoded interface association descriptor.
#[derive(Debug, Clone)]
pub struct InterfaceAssociation<'a> {
    /// `bFirstInterface`
    pub first_interface: u8,
    /// `bInterfaceCount`
    pub interface_count: u8,
    pub function_class: u8,
    pub function_subclass: u8,
    pub function_protocol: u8,
    /// `iFunction`
    pub string_index: Option<u8>,
    pub names: ClassSubProto<'a>,
    pub offset: usize,
    pub length: usize,
}

impl<'a> InterfaceAssociation<'a> {
    fn from_descriptor(
        desc: InterfaceAssociationDescriptor,
        ids: &'a IdDatabase,
        offset: usize,
    ) -> Self {
        InterfaceAssociation {
            first_interface: desc.first_interface(),
            interface_count: desc.interface_count(),
            function_class: desc.function_class(),
            function_subclass: desc.function_subclass(),
            function_protocol: desc.function_protocol(),
            string_index: Some(desc.string_index()).filter(|&i| i != 0),
            names: ids.class_sub_proto(
                desc.function_class(),
                desc.function_subclass(),
                desc.function_protocol(),
            ),
            offset,
            length: desc.descriptor_len(),
        }
    }
}

/// One interface descriptor (a single alternate setting) with its
/// class-specific data and endpoints.
#[derive(Debug, Clone)]
pub struct InterfaceRecord<'a> {
    /// `bInterfaceNumber`
    pub number: u8,
    pub alternate_setting: u8,
    /// `bNumEndpoints` as declared.
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    /// `iInterface`
    pub string_index: Option<u8>,
    pub names: ClassSubProto<'a>,
    pub class_specific: ClassSpecificRecord,
    /// Endpoints that were decoded, in descriptor order.
    pub endpoints: Vec<EndpointRecord>,
    /// Byte offset of the interface descriptor in the configuration.
    pub offset: usize,
    /// Bytes up to the next interface descriptor or the end of the group.
    pub length: usize,
}

impl<'a> InterfaceRecord<'a> {
    pub(crate) fn from_descriptor(
        desc: InterfaceDescriptor,
        ids: &'a IdDatabase,
        offset: usize,
        length: usize,
    ) -> Self {
        InterfaceRecord {
            number: desc.interface_number(),
            alternate_setting: desc.alternate_setting(),
            num_endpoints: desc.num_endpoints(),
            class: desc.class(),
            subclass: desc.subclass(),
            protocol: desc.protocol(),
            string_index: Some(desc.string_index()).filter(|&i| i != 0),
            names: ids.class_sub_proto(desc.class(), desc.subclass(), desc.protocol()),
            class_specific: ClassSpecificRecord::None,
            endpoints: Vec::new(),
            offset,
            length,
        }
    }
}

pub(crate) fn walk<'a>(
    decoder: &mut Decoder<'a, '_>,
    buf: &[u8],
    total_length: u16,
) -> Decoded<ConfigurationRecord<'a>> {
    let Some(header) = ConfigurationHeader::new(buf) else {
        return Decoded {
            data: ConfigurationRecord::default(),
            error: Some(
                Error::at(
                    ErrorKind::CorruptedDescriptor,
                    "missing configuration descriptor header",
                    0,
                )
                .log_warn(),
            ),
        };
    };

    let mut config = ConfigurationRecord {
        total_length,
        num_interfaces: header.num_interfaces(),
        configuration_value: header.configuration_value(),
        string_index: Some(header.string_index()).filter(|&i| i != 0),
        attributes: header.attributes(),
        max_power: header.max_power(),
        groups: Vec::new(),
    };

    let mut end = total_length as usize;
    if end > buf.len() {
        warn!(
            "configuration descriptor declares {} bytes but only {} are available",
            end,
            buf.len()
        );
        end = buf.len();
    }
    if end < header.descriptor_len() {
        return Decoded {
            data: config,
            error: Some(
                Error::at(
                    ErrorKind::CorruptedDescriptor,
                    "total length shorter than the configuration header",
                    0,
                )
                .log_warn(),
            ),
        };
    }

    let buf = &buf[..end];
    let mut cursor = header.descriptor_len();
    while cursor < end {
        match walk_group(decoder, buf, cursor) {
            Ok(group) => {
                cursor += group.total_len();
                config.groups.push(group);
            }
            Err(e) => {
                return Decoded {
                    data: config,
                    error: Some(e.log_warn()),
                }
            }
        }
    }

    Decoded {
        data: config,
        error: None,
    }
}

/// Decode the group starting at `start`. `Err` means the stream is corrupted
/// and the walk can't continue; interface errors are kept in the group.
fn walk_group<'a>(
    decoder: &mut Decoder<'a, '_>,
    buf: &[u8],
    start: usize,
) -> Result<InterfaceGroup<'a>, Error> {
    let corrupted = |message, offset| Error::at(ErrorKind::CorruptedDescriptor, message, offset);
    let rest = |pos: usize| buf.get(pos..).unwrap_or(&[]);

    let mut pos = start;
    let Some(first) = Descriptor::new(rest(pos)) else {
        return Err(corrupted("invalid descriptor length", pos));
    };

    let mut association = None;
    let mut count = 1;
    if first.descriptor_type() == DESCRIPTOR_TYPE_INTERFACE_ASSOCIATION {
        let Some(iad) = InterfaceAssociationDescriptor::new(&first) else {
            return Err(corrupted("interface association descriptor is too short", pos));
        };
        count = iad.interface_count();
        association = Some(InterfaceAssociation::from_descriptor(iad, decoder.ids, pos));
        pos += first.descriptor_len();
    }

    let Some(interface) = InterfaceDescriptor::new(rest(pos)) else {
        return Err(corrupted("expected interface descriptor", pos));
    };

    let length = group_len(rest(pos), count);
    if length < DESCRIPTOR_LEN_INTERFACE as usize {
        return Err(corrupted("interface group is shorter than an interface", pos));
    }

    let parser = ClassParser::for_class(interface.class());
    trace!(
        "group at byte {pos}: {length} bytes, {count} interfaces, {:?} parser",
        parser
    );

    let mut group = InterfaceGroup {
        association,
        offset: pos,
        length,
        interfaces: Vec::new(),
        error: None,
    };

    let bytes = &buf[pos..pos + length];
    let starts = interface_starts(bytes);
    for (i, &s) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(length);
        let (record, res) = parse_interface(decoder, parser, &bytes[s..end], pos + s);
        group.interfaces.extend(record);
        if let Err(e) = res {
            group.error = Some(e.log_warn());
            break;
        }
    }

    Ok(group)
}

/// Byte length of a group of `count` interfaces at the start of `buf`.
///
/// Each interface runs until the next interface descriptor with alternate
/// setting 0; an IAD ends the group early. Only descriptors that fit in `buf`
/// are counted.
fn group_len(buf: &[u8], count: u8) -> usize {
    let mut len = 0;

    for _ in 0..count {
        let Some(interface) = Descriptor::new(&buf[len..]) else {
            break;
        };
        len += interface.descriptor_len();

        while let Some(desc) = Descriptor::new(&buf[len..]) {
            match desc.descriptor_type() {
                DESCRIPTOR_TYPE_INTERFACE_ASSOCIATION => return len,
                DESCRIPTOR_TYPE_INTERFACE if desc.get(3) == Some(&0) => break,
                _ => len += desc.descriptor_len(),
            }
        }
    }

    len
}

/// Offsets of the interface descriptors in a group.
fn interface_starts(group: &[u8]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut pos = 0;
    for desc in Descriptors::new(group) {
        if desc.descriptor_type() == DESCRIPTOR_TYPE_INTERFACE {
            starts.push(pos);
        }
        pos += desc.descriptor_len();
    }
    starts
}
