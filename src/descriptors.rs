//! Zero-copy views over raw USB descriptors.
//!
//! Descriptors are length-prefixed blocks of data that describe the functionality of a USB device.
//! The types here only check that enough bytes are present for the fields they expose; the
//! interpretation into owned records happens when a [`Decoder`][crate::Decoder] walks the
//! configuration.

use std::{fmt::Debug, ops::Deref};

use log::warn;

use crate::{Error, ErrorKind};

pub(crate) const DESCRIPTOR_TYPE_DEVICE: u8 = 0x01;
pub(crate) const DESCRIPTOR_LEN_DEVICE: u8 = 18;

pub(crate) const DESCRIPTOR_TYPE_CONFIGURATION: u8 = 0x02;
pub(crate) const DESCRIPTOR_LEN_CONFIGURATION: u8 = 9;

pub(crate) const DESCRIPTOR_TYPE_STRING: u8 = 0x03;

pub(crate) const DESCRIPTOR_TYPE_INTERFACE: u8 = 0x04;
pub(crate) const DESCRIPTOR_LEN_INTERFACE: u8 = 9;

pub(crate) const DESCRIPTOR_TYPE_ENDPOINT: u8 = 0x05;
pub(crate) const DESCRIPTOR_LEN_ENDPOINT: u8 = 7;

pub(crate) const DESCRIPTOR_TYPE_INTERFACE_ASSOCIATION: u8 = 0x0b;
pub(crate) const DESCRIPTOR_LEN_INTERFACE_ASSOCIATION: u8 = 8;

pub(crate) const DESCRIPTOR_TYPE_HID: u8 = 0x21;
pub(crate) const DESCRIPTOR_LEN_HID: u8 = 9;

pub(crate) const DESCRIPTOR_TYPE_CS_INTERFACE: u8 = 0x24;
pub(crate) const DESCRIPTOR_TYPE_CS_ENDPOINT: u8 = 0x25;

/// A raw USB descriptor.
///
/// Wraps a byte slice to provide access to the bytes of a descriptor by implementing `Deref` to `[u8]`,
/// while also exposing the descriptor length and type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor<'a>(&'a [u8]);

impl<'a> Descriptor<'a> {
    /// Create a `Descriptor` from the start of a buffer.
    ///
    /// Returns `None` if
    ///   * the slice length is not at least 2.
    ///   * the `bLength` field (first byte) is less than 2 or greater than the slice length.
    ///
    /// The returned descriptor covers exactly `bLength` bytes.
    pub fn new(buf: &'a [u8]) -> Option<Descriptor<'a>> {
        if buf.len() >= 2 && buf[0] >= 2 && buf.len() >= buf[0] as usize {
            Some(Descriptor(&buf[..buf[0] as usize]))
        } else {
            None
        }
    }

    /// Get the length field of the descriptor.
    #[doc(alias = "bLength")]
    pub fn descriptor_len(&self) -> usize {
        self.0[0] as usize
    }

    /// Get the type field of the descriptor.
    #[doc(alias = "bDescriptorType")]
    pub fn descriptor_type(&self) -> u8 {
        self.0[1]
    }

    /// Get the subtype byte of a class-specific descriptor, if present.
    #[doc(alias = "bDescriptorSubtype")]
    pub fn descriptor_subtype(&self) -> Option<u8> {
        self.0.get(2).copied()
    }
}

impl<'a> Deref for Descriptor<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0
    }
}

/// An iterator over a sequence of USB descriptors.
///
/// Iteration stops at the first descriptor whose `bLength` can't point to the
/// next one or runs past the end of the buffer.
#[derive(Clone)]
pub struct Descriptors<'a>(&'a [u8]);

impl<'a> Descriptors<'a> {
    /// Iterate the descriptors in `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Descriptors(buf)
    }

    /// Get the concatenated bytes of the remaining descriptors.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    fn split_first(&self) -> Option<(&'a [u8], &'a [u8])> {
        if self.0.len() < 2 {
            return None;
        }

        if self.0[0] < 2 {
            warn!(
                "descriptor with bLength {} can't point to next descriptor",
                self.0[0]
            );
            return None;
        }

        if self.0[0] as usize > self.0.len() {
            warn!(
                "descriptor with bLength {} exceeds remaining buffer length {}",
                self.0[0],
                self.0.len()
            );
            return None;
        }

        Some(self.0.split_at(self.0[0] as usize))
    }
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = Descriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((cur, next)) = self.split_first() {
            self.0 = next;
            Some(Descriptor(cur))
        } else {
            None
        }
    }
}

macro_rules! descriptor_fields {
    (impl $(<$( $i_lt:lifetime ),+>)? $tname:ident $(<$( $t_lt:lifetime ),+>)? {
        $(
            $(#[$attr:meta])*
            $vis:vis fn $name:ident at $pos:literal -> $ty:ty;
        )*
    }) => {
        impl $(<$( $i_lt ),+>)? $tname $(<$( $t_lt ),+>)? {
            $(
                $(#[$attr])*
                #[inline]
                $vis fn $name(&self) -> $ty {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(&self.0[$pos..$pos + std::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(bytes)
                }
            )*
        }
    }
}

pub(crate) use descriptor_fields;

/// Check that `buf` starts with a descriptor of `descriptor_type` that is at least `min_len` bytes.
///
/// Returns the bytes of the descriptor, `bLength` long.
pub(crate) fn checked_descriptor(buf: &[u8], descriptor_type: u8, min_len: u8) -> Option<&[u8]> {
    let desc = Descriptor::new(buf)?;
    if desc.descriptor_type() != descriptor_type || desc.descriptor_len() < min_len as usize {
        return None;
    }
    Some(desc.0)
}

/// Information about a USB device.
#[derive(Clone)]
pub struct DeviceDescriptor([u8; DESCRIPTOR_LEN_DEVICE as usize]);

impl DeviceDescriptor {
    /// Create a `DeviceDescriptor` from a buffer beginning with a device descriptor.
    ///
    /// Returns `None` when the buffer is too short or does not start with a device descriptor.
    pub fn new(buf: &[u8]) -> Option<Self> {
        let Some(desc) = checked_descriptor(buf, DESCRIPTOR_TYPE_DEVICE, DESCRIPTOR_LEN_DEVICE)
        else {
            if !buf.is_empty() {
                warn!("buffer of {} bytes is not a device descriptor", buf.len());
            }
            return None;
        };
        let mut bytes = [0; DESCRIPTOR_LEN_DEVICE as usize];
        bytes.copy_from_slice(&desc[..DESCRIPTOR_LEN_DEVICE as usize]);
        Some(Self(bytes))
    }

    /// Get the bytes of the descriptor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

descriptor_fields! {
    impl DeviceDescriptor {
        /// `bcdUSB` descriptor field: USB Specification Number.
        #[doc(alias = "bcdUSB")]
        pub fn usb_version at 2 -> u16;

        /// `bDeviceClass` descriptor field: Class code, assigned by USB-IF.
        #[doc(alias = "bDeviceClass")]
        pub fn class at 4 -> u8;

        /// `bDeviceSubClass` descriptor field: Subclass code, assigned by USB-IF.
        #[doc(alias = "bDeviceSubClass")]
        pub fn subclass at 5 -> u8;

        /// `bDeviceProtocol` descriptor field: Protocol code, assigned by USB-IF.
        #[doc(alias = "bDeviceProtocol")]
        pub fn protocol at 6 -> u8;

        /// `bMaxPacketSize0` descriptor field: Maximum packet size for 0 Endpoint.
        #[doc(alias = "bMaxPacketSize0")]
        pub fn max_packet_size_0 at 7 -> u8;

        /// `idVendor` descriptor field: Vendor ID, assigned by USB-IF.
        #[doc(alias = "idVendor")]
        pub fn vendor_id at 8 -> u16;

        /// `idProduct` descriptor field: Product ID, assigned by the manufacturer.
        #[doc(alias = "idProduct")]
        pub fn product_id at 10 -> u16;

        /// `bcdDevice` descriptor field: Device release number.
        #[doc(alias = "bcdDevice")]
        pub fn device_version at 12 -> u16;

        fn manufacturer_string_index_raw at 14 -> u8;
        fn product_string_index_raw at 15 -> u8;
        fn serial_number_string_index_raw at 16 -> u8;

        /// `bNumConfigurations` descriptor field: Number of configurations
        #[doc(alias = "bNumConfigurations")]
        pub fn num_configurations at 17 -> u8;
    }
}

impl DeviceDescriptor {
    /// `iManufacturer` descriptor field: Index for manufacturer description string.
    pub fn manufacturer_string_index(&self) -> Option<u8> {
        Some(self.manufacturer_string_index_raw()).filter(|&i| i != 0)
    }

    /// `iProduct` descriptor field: Index for product description string.
    pub fn product_string_index(&self) -> Option<u8> {
        Some(self.product_string_index_raw()).filter(|&i| i != 0)
    }

    /// `iSerialNumber` descriptor field: Index for serial number string.
    pub fn serial_number_string_index(&self) -> Option<u8> {
        Some(self.serial_number_string_index_raw()).filter(|&i| i != 0)
    }
}

impl Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("usb_version", &format_args!("0x{:04X}", self.usb_version()))
            .field("class", &format_args!("0x{:02X}", self.class()))
            .field("subclass", &format_args!("0x{:02X}", self.subclass()))
            .field("protocol", &format_args!("0x{:02X}", self.protocol()))
            .field("max_packet_size_0", &self.max_packet_size_0())
            .field("vendor_id", &format_args!("0x{:04X}", self.vendor_id()))
            .field("product_id", &format_args!("0x{:04X}", self.product_id()))
            .field(
                "device_version",
                &format_args!("0x{:04X}", self.device_version()),
            )
            .field("num_configurations", &self.num_configurations())
            .finish()
    }
}

/// Configuration descriptor header (the first 9 bytes of a configuration descriptor set).
#[derive(Clone, Copy)]
pub(crate) struct ConfigurationHeader<'a>(&'a [u8]);

impl<'a> ConfigurationHeader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Option<Self> {
        let Some(desc) = checked_descriptor(
            buf,
            DESCRIPTOR_TYPE_CONFIGURATION,
            DESCRIPTOR_LEN_CONFIGURATION,
        ) else {
            if !buf.is_empty() {
                warn!(
                    "config descriptor buffer of {} bytes does not start with a configuration descriptor",
                    buf.len()
                );
            }
            return None;
        };
        Some(Self(desc))
    }

    pub(crate) fn descriptor_len(&self) -> usize {
        self.0.len()
    }
}

descriptor_fields! {
    impl<'a> ConfigurationHeader<'a> {
        pub(crate) fn total_length at 2 -> u16;
        pub(crate) fn num_interfaces at 4 -> u8;
        pub(crate) fn configuration_value at 5 -> u8;
        pub(crate) fn string_index at 6 -> u8;
        pub(crate) fn attributes at 7 -> u8;
        pub(crate) fn max_power at 8 -> u8;
    }
}

/// Interface descriptor header.
#[derive(Clone, Copy)]
pub(crate) struct InterfaceDescriptor<'a>(&'a [u8]);

impl<'a> InterfaceDescriptor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Option<Self> {
        checked_descriptor(buf, DESCRIPTOR_TYPE_INTERFACE, DESCRIPTOR_LEN_INTERFACE).map(Self)
    }

    pub(crate) fn descriptor_len(&self) -> usize {
        self.0.len()
    }
}

descriptor_fields! {
    impl<'a> InterfaceDescriptor<'a> {
        pub(crate) fn interface_number at 2 -> u8;
        pub(crate) fn alternate_setting at 3 -> u8;
        pub(crate) fn num_endpoints at 4 -> u8;
        pub(crate) fn class at 5 -> u8;
        pub(crate) fn subclass at 6 -> u8;
        pub(crate) fn protocol at 7 -> u8;
        pub(crate) fn string_index at 8 -> u8;
    }
}

/// Interface association descriptor.
#[derive(Clone, Copy)]
pub(crate) struct InterfaceAssociationDescriptor<'a>(&'a [u8]);

impl<'a> InterfaceAssociationDescriptor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Option<Self> {
        checked_descriptor(
            buf,
            DESCRIPTOR_TYPE_INTERFACE_ASSOCIATION,
            DESCRIPTOR_LEN_INTERFACE_ASSOCIATION,
        )
        .map(Self)
    }

    pub(crate) fn descriptor_len(&self) -> usize {
        self.0.len()
    }
}

descriptor_fields! {
    impl<'a> InterfaceAssociationDescriptor<'a> {
        pub(crate) fn first_interface at 2 -> u8;
        pub(crate) fn interface_count at 3 -> u8;
        pub(crate) fn function_class at 4 -> u8;
        pub(crate) fn function_subclass at 5 -> u8;
        pub(crate) fn function_protocol at 6 -> u8;
        pub(crate) fn string_index at 7 -> u8;
    }
}

/// Standard endpoint descriptor.
#[derive(Clone, Copy)]
pub(crate) struct EndpointDescriptor<'a>(&'a [u8]);

impl<'a> EndpointDescriptor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Option<Self> {
        checked_descriptor(buf, DESCRIPTOR_TYPE_ENDPOINT, DESCRIPTOR_LEN_ENDPOINT).map(Self)
    }
}

descriptor_fields! {
    impl<'a> EndpointDescriptor<'a> {
        pub(crate) fn address at 2 -> u8;
        pub(crate) fn attributes at 3 -> u8;
        pub(crate) fn max_packet_size_raw at 4 -> u16;
        pub(crate) fn interval at 6 -> u8;
    }
}

/// Decode a string descriptor (`bDescriptorType` 3) from UTF-16LE.
///
/// Unpaired surrogates are replaced with U+FFFD. A trailing odd byte is ignored.
pub fn decode_string_descriptor(data: &[u8]) -> Result<String, Error> {
    let Some(desc) = Descriptor::new(data) else {
        return Err(Error::new(ErrorKind::InvalidString, "truncated string descriptor"));
    };
    if desc.descriptor_type() != DESCRIPTOR_TYPE_STRING {
        return Err(Error::new(ErrorKind::InvalidString, "not a string descriptor"));
    }

    Ok(char::decode_utf16(
        desc[2..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]])),
    )
    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
    .collect::<String>())
}

#[test]
fn test_descriptors_stop_on_bad_length() {
    let buf = [4, 0x24, 1, 2, 0, 5, 9, 9];
    let mut d = Descriptors::new(&buf);
    let first = d.next().unwrap();
    assert_eq!(first.descriptor_len(), 4);
    assert_eq!(first.descriptor_subtype(), Some(1));
    assert!(d.next().is_none());

    let buf = [4, 0x24, 1, 2, 9, 5, 0];
    let mut d = Descriptors::new(&buf);
    assert!(d.next().is_some());
    assert!(d.next().is_none());
}

#[test]
#[rustfmt::skip]
fn test_linux_root_hub_device() {
    let dev = DeviceDescriptor::new(&[
        0x12, 0x01, 0x00, 0x02, 0x09, 0x00, 0x01, 0x40, 0x6b,
        0x1d, 0x02, 0x00, 0x10, 0x05, 0x03, 0x02, 0x01, 0x01
    ]).unwrap();
    assert_eq!(dev.usb_version(), 0x0200);
    assert_eq!(dev.class(), 0x09);
    assert_eq!(dev.subclass(), 0x00);
    assert_eq!(dev.protocol(), 0x01);
    assert_eq!(dev.max_packet_size_0(), 64);
    assert_eq!(dev.vendor_id(), 0x1d6b);
    assert_eq!(dev.product_id(), 0x0002);
    assert_eq!(dev.device_version(), 0x0510);
    assert_eq!(dev.manufacturer_string_index(), Some(3));
    assert_eq!(dev.product_string_index(), Some(2));
    assert_eq!(dev.serial_number_string_index(), Some(1));
    assert_eq!(dev.num_configurations(), 1);

    assert!(DeviceDescriptor::new(&[0x12, 0x02, 0x00]).is_none());
}

#[test]
fn test_string_descriptor() {
    assert_eq!(
        decode_string_descriptor(&[10, 3, b'U', 0, b'S', 0, b'B', 0, 0xe9, 0]).unwrap(),
        "USB\u{e9}"
    );
    assert_eq!(
        decode_string_descriptor(&[4, 3, 0x00, 0xd8]).unwrap(),
        "\u{fffd}"
    );
    assert_eq!(
        decode_string_descriptor(&[4, 2, 0, 0]).unwrap_err().kind(),
        ErrorKind::InvalidString
    );
    assert!(decode_string_descriptor(&[8, 3, 0]).is_err());
}
