use log::{debug, warn};

use crate::{
    descriptors::{ConfigurationHeader, DeviceDescriptor},
    endpoint::{EndpointRecord, PollingStatus},
    ids::{ClassSubProto, IdDatabase, ProductEntry, VendorEntry},
    pool::{BufferId, BufferPool},
    walker::{self, ConfigurationRecord, Decoded},
    Error,
};

/// Moves data on the bus for a device whose descriptors are being decoded.
///
/// Implemented by the caller. The decoder asks it to start continuous polling
/// of interrupt IN endpoints of HID interfaces.
pub trait Transport {
    /// Start polling `endpoint` of the device at `device_address`, receiving
    /// into `buffer`.
    ///
    /// The buffer stays owned by the device until
    /// [`BufferPool::release_all`] is called for its address, also when this
    /// returns an error.
    fn register_polling(
        &mut self,
        device_address: u8,
        endpoint: &EndpointRecord,
        buffer: BufferId,
    ) -> Result<(), Error>;
}

struct Poller<'p> {
    pool: &'p mut BufferPool,
    transport: &'p mut dyn Transport,
}

/// Decodes descriptors of one device and names the ids they contain.
///
/// Names are borrowed from the [`IdDatabase`], so decoded records live as long
/// as the database rather than the decoder.
///
/// ```
/// use usbdecode::{Decoder, IdDatabase};
///
/// let ids = IdDatabase::default();
/// let config = Decoder::new(&ids, 1).decode_configuration(&[
///     0x09, 0x02, 0x19, 0x00, 0x01, 0x01, 0x00, 0xe0, 0x00,
///     0x09, 0x04, 0x00, 0x00, 0x01, 0x09, 0x00, 0x00, 0x00,
///     0x07, 0x05, 0x81, 0x03, 0x04, 0x00, 0x0c,
/// ]);
/// assert!(config.is_complete());
/// assert_eq!(config.data.groups.len(), 1);
/// ```
pub struct Decoder<'a, 'p> {
    pub(crate) ids: &'a IdDatabase,
    device_address: u8,
    poller: Option<Poller<'p>>,
}

impl<'a, 'p> Decoder<'a, 'p> {
    /// Create a decoder for the device at `device_address` that doesn't poll any endpoint.
    pub fn new(ids: &'a IdDatabase, device_address: u8) -> Self {
        Decoder {
            ids,
            device_address,
            poller: None,
        }
    }

    /// Register interrupt IN endpoints of HID interfaces with `transport`,
    /// taking a receive buffer from `pool` for each.
    pub fn with_polling(mut self, pool: &'p mut BufferPool, transport: &'p mut dyn Transport) -> Self {
        self.poller = Some(Poller { pool, transport });
        self
    }

    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    pub fn ids(&self) -> &'a IdDatabase {
        self.ids
    }

    /// Decode a configuration descriptor, using its own `wTotalLength`.
    ///
    /// `buf` may be longer or shorter than `wTotalLength`; the walk stops at
    /// whichever ends first.
    pub fn decode_configuration(&mut self, buf: &[u8]) -> Decoded<ConfigurationRecord<'a>> {
        let total_length = ConfigurationHeader::new(buf).map_or(0, |h| h.total_length());
        self.walk(buf, total_length)
    }

    /// Decode a configuration descriptor as if it were `total_length` bytes long.
    pub fn walk(&mut self, buf: &[u8], total_length: u16) -> Decoded<ConfigurationRecord<'a>> {
        walker::walk(self, buf, total_length)
    }

    /// Name the vendor, product and class of a device descriptor.
    pub fn identify_device(&self, descriptor: &DeviceDescriptor) -> DeviceRecord<'a> {
        let ids: &'a IdDatabase = self.ids;
        let names = ids.vid_pid(descriptor.vendor_id(), descriptor.product_id());
        DeviceRecord {
            descriptor: descriptor.clone(),
            vendor: names.vendor,
            product: names.product,
            class: ids.class_sub_proto(
                descriptor.class(),
                descriptor.subclass(),
                descriptor.protocol(),
            ),
        }
    }

    /// Take a buffer and ask the transport to poll `endpoint`.
    pub(crate) fn request_polling(&mut self, endpoint: &EndpointRecord) -> PollingStatus {
        let device_address = self.device_address;
        let Some(poller) = self.poller.as_mut() else {
            return PollingStatus::NotRequested;
        };

        let buffer = match poller.pool.acquire(device_address) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(
                    "not polling {} of device {device_address}: {e}",
                    endpoint.address
                );
                return PollingStatus::OutOfBuffers;
            }
        };

        match poller
            .transport
            .register_polling(device_address, endpoint, buffer)
        {
            Ok(()) => {
                debug!(
                    "listening to [dev {device_address}: ep {:02x}]",
                    endpoint.address.raw()
                );
                PollingStatus::Registered(buffer)
            }
            Err(e) => PollingStatus::Failed(e.log_warn()),
        }
    }
}

/// A device descriptor with its ids resolved to names.
#[derive(Debug, Clone)]
pub struct DeviceRecord<'a> {
    pub descriptor: DeviceDescriptor,
    pub vendor: &'a VendorEntry,
    pub product: &'a ProductEntry,
    pub class: ClassSubProto<'a>,
}
