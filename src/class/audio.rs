use log::debug;

use super::{midi, Body, ClassSpecificRecord};
use crate::{
    descriptors::{descriptor_fields, Descriptor, DESCRIPTOR_TYPE_CS_INTERFACE},
    walker::InterfaceRecord,
    Error, ErrorKind,
};

pub(crate) const SUBCLASS_AUDIO_CONTROL: u8 = 0x01;
pub(crate) const SUBCLASS_AUDIO_STREAMING: u8 = 0x02;
pub(crate) const SUBCLASS_MIDI_STREAMING: u8 = 0x03;

const AUDIO_CONTROL_HEADER_LEN: usize = 9;
const AUDIO_STREAMING_HEADER_LEN: usize = 16;

/// Class-specific AudioControl interface header (UAC2 layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioControlHeader {
    /// `bDescriptorSubtype`, 0x01 for HEADER.
    pub subtype: u8,
    /// `bcdADC`: Audio Device Class release in BCD.
    pub adc_version: u16,
    /// `bCategory`: primary use of the audio function.
    pub category: u8,
    /// `wTotalLength` of the class-specific AudioControl descriptors.
    pub total_length: u16,
    /// `bmControls`
    pub controls: u8,
}

/// Class-specific AudioStreaming interface header (UAC2 layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamingHeader {
    pub subtype: u8,
    /// `bTerminalLink`: id of the terminal this interface connects to.
    pub terminal_link: u8,
    pub controls: u8,
    pub format_type: u8,
    /// `bmFormats`
    pub formats: u32,
    pub num_channels: u8,
    /// `bmChannelConfig`: spatial location of the channels.
    pub channel_config: u32,
    /// `iChannelNames`
    pub channel_names_index: u8,
}

struct RawAudioControl<'a>(&'a [u8]);

descriptor_fields! {
    impl<'a> RawAudioControl<'a> {
        fn subtype at 2 -> u8;
        fn adc_version at 3 -> u16;
        fn category at 5 -> u8;
        fn total_length at 6 -> u16;
        fn controls at 8 -> u8;
    }
}

struct RawAudioStreaming<'a>(&'a [u8]);

descriptor_fields! {
    impl<'a> RawAudioStreaming<'a> {
        fn subtype at 2 -> u8;
        fn terminal_link at 3 -> u8;
        fn controls at 4 -> u8;
        fn format_type at 5 -> u8;
        fn formats at 6 -> u32;
        fn num_channels at 10 -> u8;
        fn channel_config at 11 -> u32;
        fn channel_names_index at 15 -> u8;
    }
}

pub(super) fn parse(record: &mut InterfaceRecord, body: Body) -> Result<(), Error> {
    match record.subclass {
        SUBCLASS_AUDIO_CONTROL => {
            if let Some(raw) = class_header(body, AUDIO_CONTROL_HEADER_LEN) {
                let raw = RawAudioControl(raw);
                record.class_specific = ClassSpecificRecord::AudioControl(AudioControlHeader {
                    subtype: raw.subtype(),
                    adc_version: raw.adc_version(),
                    category: raw.category(),
                    total_length: raw.total_length(),
                    controls: raw.controls(),
                });
            }
            Ok(())
        }
        SUBCLASS_AUDIO_STREAMING => {
            if let Some(raw) = class_header(body, AUDIO_STREAMING_HEADER_LEN) {
                let raw = RawAudioStreaming(raw);
                record.class_specific = ClassSpecificRecord::AudioStreaming(AudioStreamingHeader {
                    subtype: raw.subtype(),
                    terminal_link: raw.terminal_link(),
                    controls: raw.controls(),
                    format_type: raw.format_type(),
                    formats: raw.formats(),
                    num_channels: raw.num_channels(),
                    channel_config: raw.channel_config(),
                    channel_names_index: raw.channel_names_index(),
                });
            }
            Ok(())
        }
        SUBCLASS_MIDI_STREAMING => midi::parse(record, body),
        _ => Err(body.error(ErrorKind::UnsupportedSubtype, "bad audio interface subclass", 0)),
    }
}

/// The class-specific interface descriptor directly after the interface header.
///
/// Zero-bandwidth alternate settings have none, which is not an error. Headers
/// shorter than `min_len` (UAC1 layouts) are left undecoded.
fn class_header(body: Body, min_len: usize) -> Option<&[u8]> {
    let Some(desc) = Descriptor::new(body.rest(body.start)) else {
        debug!("no class-specific audio descriptor at byte {}", body.offset + body.start);
        return None;
    };
    if desc.descriptor_type() != DESCRIPTOR_TYPE_CS_INTERFACE {
        debug!(
            "expected class-specific audio descriptor, found type 0x{:02x}",
            desc.descriptor_type()
        );
        return None;
    }
    if desc.descriptor_len() < min_len {
        debug!(
            "class-specific audio header at byte {} has {} bytes, need {min_len}",
            body.offset + body.start,
            desc.descriptor_len()
        );
        return None;
    }
    Some(&body.buf[body.start..body.start + desc.descriptor_len()])
}
