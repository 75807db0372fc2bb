//! On-disk WIA structures.
//!
//! All multi-byte fields are big-endian. The layouts are fixed by the
//! format; each struct carries a size assertion.

use std::mem::size_of;

use zerocopy::{big_endian::*, FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    common::{version_string, Compression, DiscKind, HashBytes, KeyBytes, MagicBytes},
    util::{digest::sha1_hash, static_assert},
    Error, Result,
};

/// Magic bytes at the start of every WIA file. Reads as the little-endian
/// u32 `0x01414957`.
pub const WIA_MAGIC: MagicBytes = *b"WIA\x01";

/// The format version this decoder implements.
pub const WIA_VERSION: u32 = 0x01000000;
/// The oldest `version_compatible` value this decoder accepts.
pub const WIA_VERSION_READ_COMPATIBLE: u32 = 0x00080000;

/// Size in bytes of a disc sector. (32 KiB)
pub const SECTOR_SIZE: usize = 0x8000;

/// Size in bytes of the hash block at the start of an encrypted Wii sector.
pub const HASHES_SIZE: usize = 0x400;

/// Size in bytes of the data portion of a Wii sector. (31 KiB)
pub const SECTOR_DATA_SIZE: usize = SECTOR_SIZE - HASHES_SIZE;

/// Number of sectors covered by one hash tree / one exception sublist.
pub const SECTOR_GROUP_SECTORS: usize = 64;

/// Size in bytes of a full Wii sector group. (2 MiB)
pub const SECTOR_GROUP_SIZE: usize = SECTOR_SIZE * SECTOR_GROUP_SECTORS;

/// Size in bytes of the verbatim disc header copy held in [`DiscHeader`].
pub const DISC_HEAD_SIZE: usize = 0x80;

/// This struct is stored at offset 0x0 and is 0x48 bytes long. Its layout
/// never changes between format versions.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct FileHeader {
    /// Must be [`WIA_MAGIC`].
    pub magic: MagicBytes,
    /// The version of the program that wrote the file, nibble-packed.
    /// See [`version_string`].
    pub version: U32,
    /// The oldest version able to read this file. Readers compare this
    /// against their own version and read floor.
    pub version_compatible: U32,
    /// The size of [`DiscHeader`] as stored in the file.
    pub header_2_size: U32,
    /// SHA-1 of the next `header_2_size` bytes.
    pub header_2_hash: HashBytes,
    /// The size of the uncompressed disc image.
    pub iso_file_size: U64,
    /// The size of this file.
    pub wia_file_size: U64,
    /// SHA-1 of this struct up to, but not including, this field.
    pub header_1_hash: HashBytes,
}

static_assert!(size_of::<FileHeader>() == 0x48);

impl FileHeader {
    /// Checks magic, the header's own hash, and the version window.
    pub fn validate(&self) -> Result<()> {
        if self.magic != WIA_MAGIC {
            return Err(Error::UnsupportedFormat(format!("invalid magic: {:#X?}", self.magic)));
        }
        let bytes = self.as_bytes();
        verify_hash(&bytes[..bytes.len() - size_of::<HashBytes>()], &self.header_1_hash)?;
        let version_compatible = self.version_compatible.get();
        if version_compatible < WIA_VERSION_READ_COMPATIBLE || version_compatible > WIA_VERSION {
            return Err(Error::UnsupportedFormat(format!(
                "unsupported WIA version {} (compatible {})",
                version_string(self.version.get()),
                version_string(version_compatible)
            )));
        }
        Ok(())
    }
}

/// This struct is stored at offset 0x48, immediately after [`FileHeader`],
/// and is 0xDC bytes long.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct DiscHeader {
    /// The disc type. (1 = GameCube, 2 = Wii)
    pub disc_type: U32,
    /// The compression type. See [`Compression`].
    pub compression: U32,
    /// The compression level the writer used. Informative only.
    pub compression_level: U32,
    /// The size of the chunks that disc data is divided into: a
    /// power-of-two multiple of the sector size. 2 MiB in practice, but
    /// whatever the header declares is accepted.
    pub chunk_size: U32,
    /// The first 0x80 bytes of the disc image, stored verbatim. Reads
    /// covering this range are always served from here.
    pub disc_head: [u8; DISC_HEAD_SIZE],
    /// The number of [`PartitionEntry`] structs.
    pub num_partitions: U32,
    /// The size of one [`PartitionEntry`] struct. Always 0x30.
    pub partition_entry_size: U32,
    /// The offset in the file where the partition table is stored
    /// (uncompressed).
    pub partition_offset: U64,
    /// SHA-1 of the partition table
    /// (`num_partitions * partition_entry_size` bytes).
    pub partition_hash: HashBytes,
    /// The number of [`RawDataEntry`] structs.
    pub num_raw_data: U32,
    /// The offset in the file where the raw-data table is stored
    /// (compressed).
    pub raw_data_offset: U64,
    /// The compressed size of the raw-data table.
    pub raw_data_size: U32,
    /// The number of [`GroupEntry`] structs.
    pub num_groups: U32,
    /// The offset in the file where the group table is stored (compressed).
    pub group_offset: U64,
    /// The compressed size of the group table.
    pub group_size: U32,
    /// The number of used bytes in [`compr_data`](Self::compr_data).
    pub compr_data_len: u8,
    /// Compressor-specific data: 7-Zip filter properties for LZMA (5 bytes)
    /// and LZMA2 (1 byte), empty otherwise.
    pub compr_data: [u8; 7],
}

static_assert!(size_of::<DiscHeader>() == 0xDC);

impl DiscHeader {
    /// Checks enumerated fields and structural invariants.
    pub fn validate(&self) -> Result<()> {
        DiscKind::try_from(self.disc_type.get())?;
        Compression::try_from(self.compression.get())?;
        let chunk_size = self.chunk_size.get();
        if chunk_size < SECTOR_SIZE as u32
            || chunk_size % SECTOR_SIZE as u32 != 0
            || !(chunk_size / SECTOR_SIZE as u32).is_power_of_two()
        {
            return Err(Error::Corrupt(format!("invalid chunk size: {:#X}", chunk_size)));
        }
        if self.partition_entry_size.get() != size_of::<PartitionEntry>() as u32 {
            return Err(Error::Corrupt(format!(
                "partition entry size is {}, expected {}",
                self.partition_entry_size.get(),
                size_of::<PartitionEntry>()
            )));
        }
        if self.compr_data_len as usize > self.compr_data.len() {
            return Err(Error::Corrupt(format!(
                "compressor data length out of range: {}",
                self.compr_data_len
            )));
        }
        Ok(())
    }

    /// The disc kind. Must be validated first.
    pub fn disc_kind(&self) -> DiscKind { DiscKind::try_from(self.disc_type.get()).unwrap() }

    /// The compression method. Must be validated first.
    pub fn compression(&self) -> Compression {
        Compression::try_from(self.compression.get()).unwrap()
    }

    /// The used portion of the compressor-specific data.
    pub fn compr_data(&self) -> &[u8] { &self.compr_data[..self.compr_data_len as usize] }
}

/// One of the two per-partition spans of stored sectors.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct PartitionDataEntry {
    /// The first disc sector covered by this entry, in 0x8000-byte units
    /// from the start of the disc.
    pub first_sector: U32,
    /// The number of sectors covered by this entry.
    pub num_sectors: U32,
    /// The index of the first group holding this entry's data. Subsequent
    /// groups follow sequentially.
    pub group_index: U32,
    /// The number of groups used for this entry.
    pub num_groups: U32,
}

static_assert!(size_of::<PartitionDataEntry>() == 0x10);

impl PartitionDataEntry {
    /// Disc offset of the first covered byte.
    pub fn start_offset(&self) -> u64 { self.first_sector.get() as u64 * SECTOR_SIZE as u64 }

    /// Disc offset one past the last covered byte.
    pub fn end_offset(&self) -> u64 {
        self.start_offset() + self.num_sectors.get() as u64 * SECTOR_SIZE as u64
    }

    /// Whether the given disc sector falls inside this entry.
    pub fn contains_sector(&self, sector: u32) -> bool {
        let start = self.first_sector.get();
        sector >= start && sector < start + self.num_sectors.get()
    }
}

/// A Wii partition's key and stored data spans.
///
/// Partition data is stored decrypted and with hash blocks removed: each
/// 0x8000-byte disc sector contributes 0x7C00 bytes to its group. The first
/// data entry covers the partition's hashed data region; the second covers
/// the trailing remainder and may be empty.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct PartitionEntry {
    /// The AES-128 title key, usable directly for re-encrypting the
    /// partition data.
    pub partition_key: KeyBytes,
    /// The stored spans of this partition.
    pub data_entries: [PartitionDataEntry; 2],
}

static_assert!(size_of::<PartitionEntry>() == 0x30);

/// A span of disc bytes not owned by any partition, stored as-is (aside
/// from compression).
///
/// `data_offset` may be unaligned; groups cover the span from `data_offset`
/// aligned down to the sector size. The first entry typically declares
/// offset 0x80, with the preceding bytes served from
/// [`DiscHeader::disc_head`].
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct RawDataEntry {
    /// The disc offset at which this span starts.
    pub data_offset: U64,
    /// The number of disc bytes covered by this span.
    pub data_size: U64,
    /// The index of the first group holding this span's data.
    pub group_index: U32,
    /// The number of groups used for this span.
    pub num_groups: U32,
}

static_assert!(size_of::<RawDataEntry>() == 0x18);

impl RawDataEntry {
    /// Disc offset of the first group byte: `data_offset` aligned down to
    /// the sector size.
    pub fn start_offset(&self) -> u64 { self.data_offset.get() & !(SECTOR_SIZE as u64 - 1) }

    /// First covered disc sector.
    pub fn start_sector(&self) -> u32 { (self.start_offset() / SECTOR_SIZE as u64) as u32 }

    /// Disc offset one past the last covered byte.
    pub fn end_offset(&self) -> u64 { self.data_offset.get() + self.data_size.get() }

    /// One past the last covered disc sector. Rounds up for spans with an
    /// unaligned end.
    pub fn end_sector(&self) -> u32 { self.end_offset().div_ceil(SECTOR_SIZE as u64) as u32 }

    /// Whether the given disc sector falls inside this span.
    pub fn contains_sector(&self, sector: u32) -> bool {
        sector >= self.start_sector() && sector < self.end_sector()
    }
}

/// Location of one group's compressed payload within the file.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct GroupEntry {
    /// The file offset of the payload, divided by 4.
    pub data_offset: U32,
    /// The size of the payload, including any exception lists. 0 means the
    /// whole group decodes to zero bytes (and its exception lists, if any
    /// apply, are empty).
    pub data_size: U32,
}

static_assert!(size_of::<GroupEntry>() == 0x08);

impl GroupEntry {
    /// The file offset of the payload in bytes.
    pub fn file_offset(&self) -> u64 { self.data_offset.get() as u64 * 4 }
}

/// A single stored hash override.
///
/// The recomputed hash tree of a sector group does not always match the
/// original disc (padding areas, wonky mastering); these entries restore
/// the stored bytes. `offset` addresses the hash regions of the sublist's
/// 64-sector run as a flat array: `0x400 * n + k` is byte `k` of sector
/// `n`'s hash block.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(2))]
pub struct HashException {
    /// Offset within the sublist's hash regions.
    pub offset: U16,
    /// The bytes to splice in at that offset.
    pub hash: HashBytes,
}

static_assert!(size_of::<HashException>() == 0x16);

/// One sublist of hash overrides, covering 64 sectors.
pub type ExceptionList = Box<[HashException]>;

/// Header of one stored run inside a purge stream. The run's bytes follow
/// immediately; bytes between runs decode to zero.
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, align(4))]
pub struct PurgeSegment {
    /// Output offset of the run.
    pub offset: U32,
    /// Length of the run in bytes.
    pub size: U32,
}

static_assert!(size_of::<PurgeSegment>() == 0x08);

/// Compares a buffer's SHA-1 against an expected hash.
pub(crate) fn verify_hash(buf: &[u8], expected: &HashBytes) -> Result<()> {
    let out = sha1_hash(buf);
    if out != *expected {
        let mut got_bytes = [0u8; 40];
        let got = base16ct::lower::encode_str(&out, &mut got_bytes).unwrap(); // Safe: fixed buffer size
        let mut expected_bytes = [0u8; 40];
        let expected = base16ct::lower::encode_str(expected, &mut expected_bytes).unwrap(); // Safe: fixed buffer size
        return Err(Error::Corrupt(format!("hash mismatch: {}, expected {}", got, expected)));
    }
    Ok(())
}
