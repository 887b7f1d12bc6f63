//! Decode USB configuration descriptors into structured records and name the
//! vendor, product and class ids they contain, without a host OS.
//!
//! The bytes come from whatever transport the caller has; this crate only
//! interprets them. Start with a [`Decoder`], which borrows an [`IdDatabase`]
//! for names:
//!
//! ```
//! use usbdecode::{ClassSpecificRecord, Decoder, IdDatabaseBuilder};
//!
//! let mut ids = IdDatabaseBuilder::new();
//! ids.class(0x03, "Human Interface Device");
//! let ids = ids.build();
//!
//! let config = Decoder::new(&ids, 1).decode_configuration(&[
//!     0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0xa0, 0x32,
//!     0x09, 0x04, 0x00, 0x00, 0x01, 0x03, 0x01, 0x01, 0x00,
//!     0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x3f, 0x00,
//!     0x07, 0x05, 0x81, 0x03, 0x08, 0x00, 0x0a,
//! ]);
//!
//! let keyboard = &config.data.groups[0].interfaces[0];
//! assert_eq!(keyboard.names.class.name, "Human Interface Device");
//! assert!(matches!(keyboard.class_specific, ClassSpecificRecord::Hid(_)));
//! ```
//!
//! Decoding never fails as a whole. Corruption that makes the rest of the
//! stream unreadable stops the walk and is reported in [`Decoded::error`]
//! next to everything decoded before it; problems confined to one interface
//! are stored on its [`InterfaceGroup`] and the walk continues with the next
//! group.
//!
//! With [`Decoder::with_polling`], the interrupt IN endpoints of HID
//! interfaces are handed to the caller's [`Transport`] along with a buffer
//! from a [`BufferPool`].

mod error;
pub use error::{Error, ErrorKind};

pub mod descriptors;
pub use descriptors::{decode_string_descriptor, DeviceDescriptor};

mod endpoint;
pub use endpoint::{
    Direction, EndpointAddress, EndpointAttributes, EndpointRecord, PollingStatus, SyncType,
    TransferType, UsageType,
};

mod pool;
pub use pool::{BufferId, BufferPool, DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_LEN};

mod ids;
pub use ids::{
    ClassEntry, ClassSubProto, IdDatabase, IdDatabaseBuilder, ProductEntry, ProtocolEntry,
    SubclassEntry, VendorEntry, VidPid,
};

mod class;
pub use class::{
    AudioControlHeader, AudioStreamingHeader, ClassSpecificRecord, HidDescriptor, JackType,
    MidiEndpoint, MidiInJack, MidiJack, MidiOutJack, MidiSource, MidiStreaming,
};

mod walker;
pub use walker::{
    ConfigurationRecord, Decoded, InterfaceAssociation, InterfaceGroup, InterfaceRecord,
};

mod decoder;
pub use decoder::{Decoder, DeviceRecord, Transport};
