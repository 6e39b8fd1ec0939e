//! Linear-PCM WAV container assembly
//!
//! Wraps headerless mono samples in the canonical 44-byte RIFF/WAVE header.
//! Every multi-byte field is packed little-endian with an explicit width.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use super::mime::AudioStreamDescriptor;
use crate::error::{Error, Result};

pub const WAV_HEADER_LEN: usize = 44;

/// Bytes of header that follow the RIFF tag and size field
const RIFF_FIXED_LEN: u32 = 36;
const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;
const CHANNELS: u16 = 1;

/// Decoded fields of a 44-byte PCM header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Compute the header for a mono PCM payload of `data_size` bytes
    pub fn for_payload(data_size: u32, descriptor: AudioStreamDescriptor) -> Self {
        let block_align = CHANNELS * descriptor.bytes_per_sample();
        Self {
            chunk_size: RIFF_FIXED_LEN.saturating_add(data_size),
            channels: CHANNELS,
            sample_rate: descriptor.sample_rate,
            byte_rate: descriptor.sample_rate.wrapping_mul(block_align as u32),
            block_align,
            bits_per_sample: descriptor.bits_per_sample,
            data_size,
        }
    }

    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_slice(b"RIFF");
        buf.put_u32_le(self.chunk_size);
        buf.put_slice(b"WAVE");

        buf.put_slice(b"fmt ");
        buf.put_u32_le(FMT_CHUNK_LEN);
        buf.put_u16_le(FORMAT_PCM);
        buf.put_u16_le(self.channels);
        buf.put_u32_le(self.sample_rate);
        buf.put_u32_le(self.byte_rate);
        buf.put_u16_le(self.block_align);
        buf.put_u16_le(self.bits_per_sample);

        buf.put_slice(b"data");
        buf.put_u32_le(self.data_size);
    }

    /// Read back a header produced by [`WavHeader::write_to`]
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(Error::AudioError(format!(
                "WAV header needs {} bytes, got {}",
                WAV_HEADER_LEN,
                bytes.len()
            )));
        }

        let mut buf = &bytes[..WAV_HEADER_LEN];
        expect_tag(&mut buf, b"RIFF")?;
        let chunk_size = buf.get_u32_le();
        expect_tag(&mut buf, b"WAVE")?;
        expect_tag(&mut buf, b"fmt ")?;

        let fmt_len = buf.get_u32_le();
        let format = buf.get_u16_le();
        if fmt_len != FMT_CHUNK_LEN || format != FORMAT_PCM {
            return Err(Error::AudioError(format!(
                "unsupported fmt chunk (size {}, format {})",
                fmt_len, format
            )));
        }

        let channels = buf.get_u16_le();
        let sample_rate = buf.get_u32_le();
        let byte_rate = buf.get_u32_le();
        let block_align = buf.get_u16_le();
        let bits_per_sample = buf.get_u16_le();
        expect_tag(&mut buf, b"data")?;
        let data_size = buf.get_u32_le();

        Ok(Self {
            chunk_size,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
            data_size,
        })
    }

    pub fn descriptor(&self) -> AudioStreamDescriptor {
        AudioStreamDescriptor::new(self.bits_per_sample, self.sample_rate)
    }
}

fn expect_tag(buf: &mut &[u8], tag: &[u8; 4]) -> Result<()> {
    let mut found = [0u8; 4];
    buf.copy_to_slice(&mut found);
    if &found != tag {
        return Err(Error::AudioError(format!(
            "expected {:?} tag, found {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(&found)
        )));
    }
    Ok(())
}

/// A finished WAV file: header followed by the untouched payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioContainer {
    bytes: Bytes,
    header: WavHeader,
}

impl AudioContainer {
    /// Frame `payload` as mono linear PCM.
    ///
    /// `descriptor.bits_per_sample` must be a multiple of 8. Fails only when the
    /// payload is too large for the 32-bit RIFF size fields.
    pub fn build(payload: &[u8], descriptor: AudioStreamDescriptor) -> Result<Self> {
        let data_size = u32::try_from(payload.len())
            .ok()
            .filter(|len| len.checked_add(RIFF_FIXED_LEN).is_some())
            .ok_or_else(|| {
                Error::AudioError(format!(
                    "payload of {} bytes exceeds the RIFF size limit",
                    payload.len()
                ))
            })?;

        let header = WavHeader::for_payload(data_size, descriptor);

        let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN + payload.len());
        header.write_to(&mut buf);
        buf.put_slice(payload);

        debug!(
            "Built WAV container: {} payload bytes, {} bit, {} Hz",
            data_size, descriptor.bits_per_sample, descriptor.sample_rate
        );

        Ok(Self {
            bytes: buf.freeze(),
            header,
        })
    }

    /// Wrap existing WAV bytes after validating the header against the length
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let header = WavHeader::parse(&bytes)?;
        let expected = WAV_HEADER_LEN + header.data_size as usize;
        if bytes.len() != expected
            || RIFF_FIXED_LEN.checked_add(header.data_size) != Some(header.chunk_size)
        {
            return Err(Error::AudioError(format!(
                "WAV size fields disagree with length {} (data size {})",
                bytes.len(),
                header.data_size
            )));
        }
        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.data_size == 0
    }

    pub fn duration_ms(&self) -> f32 {
        if self.header.byte_rate == 0 {
            return 0.0;
        }
        self.header.data_size as f32 / self.header.byte_rate as f32 * 1000.0
    }

    pub fn content_type() -> &'static str {
        "audio/wav"
    }
}

/// Build a container straight from the upstream MIME type string
pub fn wav_from_mime(payload: &[u8], mime_type: &str) -> Result<Bytes> {
    AudioContainer::build(payload, AudioStreamDescriptor::parse(mime_type)).map(|c| c.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BITS: [u16; 4] = [8, 16, 24, 32];
    const RATES: [u32; 5] = [8000, 16000, 24000, 44100, 48000];

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_header_layout() {
        let payload = [1u8, 2, 3, 4, 5, 6];
        let wav = wav_from_mime(&payload, "audio/L16;rate=24000").unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(read_u32(&wav, 4), 36 + 6);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(read_u32(&wav, 16), 16);
        assert_eq!(read_u16(&wav, 20), 1);
        assert_eq!(read_u16(&wav, 22), 1);
        assert_eq!(read_u32(&wav, 24), 24000);
        assert_eq!(read_u32(&wav, 28), 48000);
        assert_eq!(read_u16(&wav, 32), 2);
        assert_eq!(read_u16(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32(&wav, 40), 6);
        assert_eq!(&wav[44..], &payload);
    }

    #[test]
    fn test_empty_payload() {
        let container = AudioContainer::build(&[], AudioStreamDescriptor::default()).unwrap();
        assert_eq!(container.len(), WAV_HEADER_LEN);
        assert_eq!(read_u32(container.as_bytes(), 40), 0);
        assert_eq!(read_u32(container.as_bytes(), 4), 36);
        assert!(container.is_empty());
        assert!(container.payload().is_empty());
    }

    #[test]
    fn test_size_fields_track_payload_length() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        for &bits in &BITS {
            for &rate in &RATES {
                let descriptor = AudioStreamDescriptor::new(bits, rate);
                for n in 0..=payload.len() {
                    let container = AudioContainer::build(&payload[..n], descriptor).unwrap();
                    let bytes = container.as_bytes();
                    assert_eq!(bytes.len(), 44 + n);
                    assert_eq!(read_u32(bytes, 4), 36 + n as u32);
                    assert_eq!(read_u32(bytes, 40), n as u32);
                    assert_eq!(bytes[44..].last(), payload[..n].last());
                }
            }
        }

        let full = AudioContainer::build(&payload, AudioStreamDescriptor::default()).unwrap();
        assert_eq!(full.payload(), payload.as_slice());
    }

    #[test]
    fn test_header_round_trip() {
        for &bits in &BITS {
            for &rate in &RATES {
                let descriptor = AudioStreamDescriptor::new(bits, rate);
                let container = AudioContainer::build(&[0u8; 96], descriptor).unwrap();
                let parsed = WavHeader::parse(container.as_bytes()).unwrap();

                assert_eq!(parsed.descriptor(), descriptor);
                assert_eq!(parsed.data_size, 96);
                assert_eq!(parsed.block_align, bits / 8);
                assert_eq!(parsed.byte_rate, rate * (bits / 8) as u32);
                assert_eq!(&parsed, container.header());
            }
        }
    }

    #[test]
    fn test_standard_reader_accepts_container() {
        // 16-bit little-endian ramp
        let samples: Vec<i16> = (0..480).map(|i| (i * 64 - 15000) as i16).collect();
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let wav = wav_from_mime(&payload, "audio/L16;codec=pcm;rate=24000").unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(wav.to_vec())).unwrap();
        let spec = reader.spec();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_standard_reader_accepts_other_widths() {
        for &(bits, rate) in &[(8u16, 8000u32), (24, 48000), (32, 44100)] {
            let frame = (bits / 8) as usize;
            let payload = vec![0x10u8; frame * 100];
            let container =
                AudioContainer::build(&payload, AudioStreamDescriptor::new(bits, rate)).unwrap();

            let reader = hound::WavReader::new(Cursor::new(container.as_bytes().to_vec())).unwrap();
            assert_eq!(reader.spec().bits_per_sample, bits);
            assert_eq!(reader.spec().sample_rate, rate);
            assert_eq!(reader.len(), 100);
        }
    }

    #[test]
    fn test_from_bytes_validates() {
        let container =
            AudioContainer::build(&[9u8; 10], AudioStreamDescriptor::default()).unwrap();
        let restored = AudioContainer::from_bytes(container.clone().into_bytes()).unwrap();
        assert_eq!(restored, container);

        let mut truncated = container.as_bytes().to_vec();
        truncated.pop();
        assert!(AudioContainer::from_bytes(Bytes::from(truncated)).is_err());

        let mut bad_tag = container.as_bytes().to_vec();
        bad_tag[0] = b'X';
        assert!(WavHeader::parse(&bad_tag).is_err());

        assert!(WavHeader::parse(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_duration() {
        // 24000 Hz * 2 bytes = 48000 bytes per second
        let container =
            AudioContainer::build(&vec![0u8; 24000], AudioStreamDescriptor::default()).unwrap();
        assert!((container.duration_ms() - 500.0).abs() < 0.01);
    }
}
