//! Endpoint address and `bmAttributes` decoding.

use std::fmt::{Debug, Display};

use crate::{descriptors::EndpointDescriptor, pool::BufferId, Error};

/// Endpoint direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Direction {
    /// Host to device
    Out = 0,

    /// Device to host
    In = 1,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Out => "OUT",
            Direction::In => "IN",
        })
    }
}

/// Decoded `bEndpointAddress`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EndpointAddress(u8);

impl EndpointAddress {
    /// Wrap a raw `bEndpointAddress` byte.
    pub fn new(address: u8) -> Self {
        EndpointAddress(address)
    }

    /// Raw address byte, including the direction bit.
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// Endpoint number, bits 0..=3.
    pub fn number(&self) -> u8 {
        self.0 & 0x0f
    }

    /// Direction, bit 7.
    pub fn direction(&self) -> Direction {
        match self.0 & 0x80 {
            0 => Direction::Out,
            _ => Direction::In,
        }
    }
}

impl Display for EndpointAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EP {} {}", self.number(), self.direction())
    }
}

impl Debug for EndpointAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X} ({})", self.0, self)
    }
}

/// Endpoint transfer type, `bmAttributes` bits 0..=1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferType {
    Control = 0,
    Isochronous = 1,
    Bulk = 2,
    Interrupt = 3,
}

/// Isochronous synchronization type, `bmAttributes` bits 2..=3.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyncType {
    None = 0,
    Asynchronous = 1,
    Adaptive = 2,
    Synchronous = 3,
}

/// Isochronous usage type, `bmAttributes` bits 4..=5.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UsageType {
    Data = 0,
    Feedback = 1,
    ExplicitFeedback = 2,
    Reserved = 3,
}

impl Display for TransferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TransferType::Control => "Control",
            TransferType::Isochronous => "Isochronous",
            TransferType::Bulk => "Bulk",
            TransferType::Interrupt => "Interrupt",
        })
    }
}

impl Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncType::None => "None",
            SyncType::Asynchronous => "Asynchronous",
            SyncType::Adaptive => "Adaptive",
            SyncType::Synchronous => "Synchronous",
        })
    }
}

impl Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UsageType::Data => "Data",
            UsageType::Feedback => "Feedback",
            UsageType::ExplicitFeedback => "Explicit feedback",
            UsageType::Reserved => "Reserved",
        })
    }
}

/// The three 2-bit fields of an endpoint's `bmAttributes`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EndpointAttributes {
    pub transfer_type: TransferType,
    pub sync_type: SyncType,
    pub usage_type: UsageType,
}

impl EndpointAttributes {
    /// Decode a `bmAttributes` byte. Reserved bits 6..=7 are ignored.
    pub fn decode(attributes: u8) -> Self {
        EndpointAttributes {
            transfer_type: match field_index(attributes, 0) {
                1 => TransferType::Isochronous,
                2 => TransferType::Bulk,
                3 => TransferType::Interrupt,
                _ => TransferType::Control,
            },
            sync_type: match field_index(attributes, 2) {
                1 => SyncType::Asynchronous,
                2 => SyncType::Adaptive,
                3 => SyncType::Synchronous,
                _ => SyncType::None,
            },
            usage_type: match field_index(attributes, 4) {
                1 => UsageType::Feedback,
                2 => UsageType::ExplicitFeedback,
                3 => UsageType::Reserved,
                _ => UsageType::Data,
            },
        }
    }
}

/// Extract a 2-bit field. The matches above map anything unexpected to the first variant.
fn field_index(attributes: u8, shift: u8) -> u8 {
    (attributes >> shift) & 0b11
}

/// Outcome of asking for continuous polling on an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingStatus {
    /// Polling was not requested for this endpoint.
    NotRequested,

    /// The transport accepted the endpoint, receiving into this buffer.
    Registered(BufferId),

    /// The buffer pool was exhausted; the endpoint was skipped.
    OutOfBuffers,

    /// The transport refused the registration.
    Failed(Error),
}

/// A decoded endpoint descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    pub address: EndpointAddress,
    pub attributes: EndpointAttributes,
    max_packet_size_raw: u16,
    pub interval: u8,
    pub polling: PollingStatus,
}

impl EndpointRecord {
    pub(crate) fn from_descriptor(desc: EndpointDescriptor) -> Self {
        EndpointRecord {
            address: EndpointAddress::new(desc.address()),
            attributes: EndpointAttributes::decode(desc.attributes()),
            max_packet_size_raw: desc.max_packet_size_raw(),
            interval: desc.interval(),
            polling: PollingStatus::NotRequested,
        }
    }

    /// Endpoint number without the direction bit.
    pub fn number(&self) -> u8 {
        self.address.number()
    }

    pub fn direction(&self) -> Direction {
        self.address.direction()
    }

    pub fn transfer_type(&self) -> TransferType {
        self.attributes.transfer_type
    }

    pub fn sync_type(&self) -> SyncType {
        self.attributes.sync_type
    }

    pub fn usage_type(&self) -> UsageType {
        self.attributes.usage_type
    }

    /// Raw `wMaxPacketSize` descriptor field.
    #[doc(alias = "wMaxPacketSize")]
    pub fn max_packet_size_raw(&self) -> u16 {
        self.max_packet_size_raw
    }

    /// Get the maximum packet size in bytes.
    pub fn max_packet_size(&self) -> usize {
        (self.max_packet_size_raw & ((1 << 11) - 1)) as usize
    }

    /// For isochronous endpoints at high speed, get the number of packets per microframe (1, 2, or 3).
    pub fn packets_per_microframe(&self) -> u8 {
        ((self.max_packet_size_raw >> 11) & 0b11) as u8 + 1
    }
}

impl Debug for EndpointRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointRecord")
            .field("address", &self.address)
            .field("transfer_type", &self.transfer_type())
            .field("sync_type", &self.sync_type())
            .field("usage_type", &self.usage_type())
            .field("max_packet_size", &self.max_packet_size())
            .field("interval", &self.interval)
            .field("polling", &self.polling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        let a = EndpointAddress::new(0x81);
        assert_eq!(a.number(), 1);
        assert_eq!(a.direction(), Direction::In);
        assert_eq!(a.to_string(), "EP 1 IN");

        let a = EndpointAddress::new(0x0f);
        assert_eq!(a.number(), 15);
        assert_eq!(a.direction(), Direction::Out);
        assert_eq!(a.to_string(), "EP 15 OUT");

        // reserved bits don't leak into the number
        assert_eq!(EndpointAddress::new(0xf2).number(), 2);
    }

    #[test]
    fn test_attributes() {
        let a = EndpointAttributes::decode(0x03);
        assert_eq!(a.transfer_type, TransferType::Interrupt);
        assert_eq!(a.sync_type, SyncType::None);
        assert_eq!(a.usage_type, UsageType::Data);

        let a = EndpointAttributes::decode(0x25);
        assert_eq!(a.transfer_type, TransferType::Isochronous);
        assert_eq!(a.sync_type, SyncType::Asynchronous);
        assert_eq!(a.usage_type, UsageType::ExplicitFeedback);
        assert_eq!(a.usage_type.to_string(), "Explicit feedback");

        let a = EndpointAttributes::decode(0xff);
        assert_eq!(a.transfer_type, TransferType::Interrupt);
        assert_eq!(a.sync_type, SyncType::Synchronous);
        assert_eq!(a.usage_type, UsageType::Reserved);
    }

    #[test]
    fn test_endpoint_record() {
        let desc = EndpointDescriptor::new(&[0x07, 0x05, 0x81, 0x05, 0x20, 0x13, 0x01]).unwrap();
        let ep = EndpointRecord::from_descriptor(desc);
        assert_eq!(ep.number(), 1);
        assert_eq!(ep.direction(), Direction::In);
        assert_eq!(ep.transfer_type(), TransferType::Isochronous);
        assert_eq!(ep.sync_type(), SyncType::Asynchronous);
        assert_eq!(ep.max_packet_size(), 800);
        assert_eq!(ep.packets_per_microframe(), 3);
        assert_eq!(ep.interval, 1);
        assert_eq!(ep.polling, PollingStatus::NotRequested);
    }
}
