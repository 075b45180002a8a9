use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};
use crate::network::message::Envelope;
use crate::utils::VoteChainError;

/// 4-byte big-endian length prefix around one JSON envelope per frame.
#[derive(Debug)]
pub struct EnvelopeCodec {
    inner: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .big_endian()
                .max_frame_length(max_frame_len)
                .new_codec(),
        }
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = VoteChainError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(frame) => Ok(Some(Envelope::decode(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = VoteChainError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = item.encode()?;
        self.inner.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::message::Message;

    #[test]
    fn frame_carries_length_prefix() {
        let mut codec = EnvelopeCodec::new(1 << 20);
        let mut buf = BytesMut::new();
        codec.encode(Envelope::new("n", Message::ChainRequest), &mut buf).unwrap();
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(len, buf.len() - 4);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.message, Message::ChainRequest);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut codec = EnvelopeCodec::new(1 << 20);
        let mut full = BytesMut::new();
        codec.encode(Envelope::new("n", Message::ChainRequest), &mut full).unwrap();
        let mut partial = full.split_to(full.len() - 3);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = EnvelopeCodec::new(16);
        let mut buf = BytesMut::new();
        assert!(codec.encode(Envelope::new("n", Message::ChainRequest), &mut buf).is_err());
    }
}
