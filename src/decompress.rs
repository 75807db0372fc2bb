//! Group payload decompression.
//!
//! One [`Decompressor`] is constructed at open time from the disc header
//! and reused for every group and compressed table. Decompression is
//! one-shot: the caller hands over the full stored payload and a buffer
//! sized to the decoded length it is owed. Success requires the entire
//! input consumed (and the codec's end-of-stream state reached, where the
//! codec has one); a short or overlong stream is corruption, not EOF.

use std::{io, mem::size_of};

use tracing::instrument;
use zerocopy::FromBytes;

use crate::{
    common::Compression,
    format::{DiscHeader, PurgeSegment},
    util::{array_ref, digest::sha1_hash},
    Error, Result,
};

/// Decoder for one of the supported compression methods.
#[derive(Debug, Clone)]
pub enum Decompressor {
    /// Stored bytes are the decoded bytes.
    None,
    /// Sparse segments over a zero background, with a SHA-1 trailer
    /// covering the expanded output.
    Purge,
    /// BZIP2 stream.
    #[cfg(feature = "compress-bzip2")]
    Bzip2,
    /// Raw LZMA stream; holds the 5-byte filter properties.
    #[cfg(feature = "compress-lzma")]
    Lzma(Box<[u8]>),
    /// Raw LZMA2 stream; holds the 1-byte filter properties.
    #[cfg(feature = "compress-lzma")]
    Lzma2(Box<[u8]>),
}

impl Decompressor {
    /// Creates a decompressor for the disc's compression method.
    pub fn new(disc: &DiscHeader) -> Result<Self> {
        let _data = disc.compr_data();
        match disc.compression() {
            Compression::None => Ok(Self::None),
            Compression::Purge => Ok(Self::Purge),
            #[cfg(feature = "compress-bzip2")]
            Compression::Bzip2 => Ok(Self::Bzip2),
            #[cfg(feature = "compress-lzma")]
            Compression::Lzma => Ok(Self::Lzma(Box::from(_data))),
            #[cfg(feature = "compress-lzma")]
            Compression::Lzma2 => Ok(Self::Lzma2(Box::from(_data))),
            #[allow(unreachable_patterns)]
            comp => Err(Error::UnsupportedFormat(format!("{} support is disabled", comp))),
        }
    }

    /// Decompresses one stored payload into `out`, returning the number of
    /// bytes produced.
    ///
    /// For `None` the produced length is the input length; for `Purge` it
    /// is always `out.len()` (the expanded size is implied by the caller).
    /// The compressed codecs may produce less than `out.len()`, never more.
    #[instrument(name = "Decompressor::decompress", skip_all)]
    pub fn decompress(&self, buf: &[u8], out: &mut [u8]) -> io::Result<usize> {
        match self {
            Decompressor::None => {
                if buf.len() > out.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("decompressed data too large: {} > {}", buf.len(), out.len()),
                    ));
                }
                out[..buf.len()].copy_from_slice(buf);
                Ok(buf.len())
            }
            Decompressor::Purge => decompress_purge(buf, out),
            #[cfg(feature = "compress-bzip2")]
            Decompressor::Bzip2 => {
                let mut decoder = bzip2::Decompress::new(false);
                let status = decoder.decompress(buf, out)?;
                if status != bzip2::Status::StreamEnd || decoder.total_in() as usize != buf.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("bzip2 decompression status {:?}", status),
                    ));
                }
                Ok(decoder.total_out() as usize)
            }
            #[cfg(feature = "compress-lzma")]
            Decompressor::Lzma(data) => {
                use lzma_util::{lzma_props_decode, new_lzma_decoder};
                let mut decoder = new_lzma_decoder(&lzma_props_decode(data)?)?;
                lzma_finish(&mut decoder, buf, out)
            }
            #[cfg(feature = "compress-lzma")]
            Decompressor::Lzma2(data) => {
                use lzma_util::{lzma2_props_decode, new_lzma2_decoder};
                let mut decoder = new_lzma2_decoder(&lzma2_props_decode(data)?)?;
                lzma_finish(&mut decoder, buf, out)
            }
        }
    }
}

/// Runs a raw liblzma stream to completion over a whole payload.
///
/// wit-written streams do not always carry an end marker, so plain `Ok`
/// with the input fully consumed also counts as done.
#[cfg(feature = "compress-lzma")]
fn lzma_finish(
    decoder: &mut liblzma::stream::Stream,
    buf: &[u8],
    out: &mut [u8],
) -> io::Result<usize> {
    let status = decoder.process(buf, out, liblzma::stream::Action::Finish)?;
    match status {
        liblzma::stream::Status::StreamEnd | liblzma::stream::Status::Ok
            if decoder.total_in() as usize == buf.len() =>
        {
            Ok(decoder.total_out() as usize)
        }
        status => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("LZMA decompression status {:?}", status),
        )),
    }
}

fn decompress_purge(buf: &[u8], out: &mut [u8]) -> io::Result<usize> {
    let Some(trailer_at) = buf.len().checked_sub(size_of::<crate::common::HashBytes>()) else {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "purge stream too short"));
    };
    out.fill(0);
    let mut pos = 0;
    while pos < trailer_at {
        if trailer_at - pos < size_of::<PurgeSegment>() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated purge segment"));
        }
        let segment =
            PurgeSegment::read_from_bytes(&buf[pos..pos + size_of::<PurgeSegment>()]).unwrap();
        pos += size_of::<PurgeSegment>();
        let offset = segment.offset.get() as usize;
        let size = segment.size.get() as usize;
        if trailer_at - pos < size {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated purge segment data"));
        }
        let end = offset.checked_add(size).filter(|&end| end <= out.len());
        let Some(end) = end else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("purge segment out of range: {:#X}+{:#X}", offset, size),
            ));
        };
        out[offset..end].copy_from_slice(&buf[pos..pos + size]);
        pos += size;
    }
    // The trailer covers the expanded output, not the stored stream.
    if sha1_hash(out) != *array_ref![buf, trailer_at, 20] {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "purge hash mismatch"));
    }
    Ok(out.len())
}

#[cfg(feature = "compress-lzma")]
pub mod lzma_util {
    use std::{
        cmp::Ordering,
        io::{Error, ErrorKind, Result},
    };

    use liblzma::stream::{Filters, LzmaOptions, Stream};

    use crate::util::array_ref;

    /// Decodes the LZMA properties byte (lc/lp/pb).
    /// See `lzma_lzma_lclppb_decode` in `liblzma/lzma/lzma_decoder.c`.
    pub fn lzma_lclppb_decode(options: &mut LzmaOptions, byte: u8) -> Result<()> {
        let mut d = byte as u32;
        if d >= (9 * 5 * 5) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid LZMA props byte: {}", d),
            ));
        }
        options.literal_context_bits(d % 9);
        d /= 9;
        options.position_bits(d / 5);
        options.literal_position_bits(d % 5);
        Ok(())
    }

    /// Decodes LZMA properties: the lc/lp/pb byte followed by the
    /// little-endian dictionary size.
    /// See `lzma_lzma_props_decode` in `liblzma/lzma/lzma_decoder.c`.
    pub fn lzma_props_decode(props: &[u8]) -> Result<LzmaOptions> {
        if props.len() != 5 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid LZMA props length: {}", props.len()),
            ));
        }
        let mut options = LzmaOptions::new();
        lzma_lclppb_decode(&mut options, props[0])?;
        options.dict_size(u32::from_le_bytes(*array_ref![props, 1, 4]));
        Ok(options)
    }

    /// Decodes the single LZMA2 properties byte into a dictionary size.
    /// See `lzma_lzma2_props_decode` in `liblzma/lzma/lzma2_decoder.c`.
    pub fn lzma2_props_decode(props: &[u8]) -> Result<LzmaOptions> {
        if props.len() != 1 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid LZMA2 props length: {}", props.len()),
            ));
        }
        let d = props[0] as u32;
        let mut options = LzmaOptions::new();
        options.dict_size(match d.cmp(&40) {
            Ordering::Greater => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("invalid LZMA2 props byte: {}", d),
                ));
            }
            Ordering::Equal => u32::MAX,
            Ordering::Less => (2 | (d & 1)) << (d / 2 + 11),
        });
        Ok(options)
    }

    /// Creates a new raw LZMA decoder with the given options.
    pub fn new_lzma_decoder(options: &LzmaOptions) -> Result<Stream> {
        let mut filters = Filters::new();
        filters.lzma1(options);
        Stream::new_raw_decoder(&filters).map_err(Error::from)
    }

    /// Creates a new raw LZMA2 decoder with the given options.
    pub fn new_lzma2_decoder(options: &LzmaOptions) -> Result<Stream> {
        let mut filters = Filters::new();
        filters.lzma2(options);
        Stream::new_raw_decoder(&filters).map_err(Error::from)
    }
}
