//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-`DataPackage`.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE)                   | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge zaehlt nur die Payload-Bytes. Maximale Frame-Groesse ist
//! konfigurierbar (Standard: 1 MB).

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::package::DataPackage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

fn ungueltig(nachricht: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, nachricht)
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer `DataPackage`s
///
/// Wird von Relay und Client gleichermassen mit `Framed` verwendet.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limit
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit eigener maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = DataPackage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(ungueltig(format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                length, self.max_frame_size
            )));
        }

        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        serde_json::from_slice(&payload)
            .map(Some)
            .map_err(|e| ungueltig(format!("JSON-Deserialisierung fehlgeschlagen: {}", e)))
    }
}

impl Encoder<DataPackage> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: DataPackage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| ungueltig(format!("JSON-Serialisierung fehlgeschlagen: {}", e)))?;

        if json.len() > self.max_frame_size {
            return Err(ungueltig(format!(
                "Paket zu gross: {} Bytes (Maximum: {} Bytes)",
                json.len(),
                self.max_frame_size
            )));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;

    fn test_paket(n: u8) -> DataPackage {
        DataPackage::nachricht("alice", "bob", vec![n; 32])
    }

    #[test]
    fn frame_codec_encode_decode() {
        let mut codec = FrameCodec::new();
        let original = test_paket(42);

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert!(payload_len > 0);
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        let decoded = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss ein Paket enthalten");
        assert_eq!(decoded, original);
    }

    #[test]
    fn frame_codec_unvollstaendiger_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(test_paket(1), &mut buf).unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn frame_codec_zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn frame_codec_ablehnung_zu_grosser_frame() {
        let mut codec = FrameCodec::with_max_size(100);

        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);

        let fehler = codec.decode(&mut buf).unwrap_err();
        assert_eq!(fehler.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn frame_codec_ablehnung_beim_encode_zu_grosses_paket() {
        let mut codec = FrameCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(codec.encode(test_paket(1), &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_codec_ungueltiges_json() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(5);
        buf.put_slice(b"{kaputt");

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn frame_codec_mehrere_pakete_im_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        codec.encode(DataPackage::id_senden("alice"), &mut buf).unwrap();
        codec.encode(test_paket(7), &mut buf).unwrap();
        codec
            .encode(DataPackage::zerstoeren("alice", "bob"), &mut buf)
            .unwrap();

        let headers: Vec<Header> = std::iter::from_fn(|| codec.decode(&mut buf).unwrap())
            .map(|p| p.header)
            .collect();
        assert_eq!(headers, vec![Header::IdSending, Header::Msg, Header::Destroy]);
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_codec_default_max_size() {
        assert_eq!(FrameCodec::new().max_frame_size(), DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(FrameCodec::default().max_frame_size(), DEFAULT_MAX_FRAME_SIZE);
    }
}
