//! [`WiaReader`] and the read paths.

use std::{
    fs::File,
    io,
    io::{Read, Seek, SeekFrom},
    mem::size_of,
    path::Path,
};

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, instrument};
use zerocopy::{FromBytes, FromZeros, IntoBytes};

use crate::{
    common::{Compression, DiscKind, KeyBytes},
    decompress::Decompressor,
    format::{
        verify_hash, DiscHeader, ExceptionList, FileHeader, GroupEntry, HashException,
        PartitionEntry, RawDataEntry, DISC_HEAD_SIZE, HASHES_SIZE, SECTOR_DATA_SIZE,
        SECTOR_GROUP_SECTORS, SECTOR_GROUP_SIZE, SECTOR_SIZE,
    },
    sector::{apply_hash_exceptions, hash_sector_group},
    util::{
        aes::encrypt_sector,
        array_ref_mut,
        read::{read_box_slice, read_from, read_vec},
    },
    Error, ErrorKind, Result, ResultContext,
};

/// Reading programs may cap the exception count per sublist; this is the
/// reference cap, enough to override every hash and all padding of a
/// 64-sector group. It sizes the decompression slack for payloads that
/// carry their exception lists inside the compressed stream.
const MAX_EXCEPTIONS_PER_LIST: usize = 52 * 64;

const MAX_EXCEPTION_LIST_SIZE: usize =
    size_of::<u16>() + MAX_EXCEPTIONS_PER_LIST * size_of::<HashException>();

/// Required trait bounds for the underlying stream.
pub trait WiaStream: Read + Seek + Send {}

impl<T> WiaStream for T where T: Read + Seek + Send + ?Sized {}

/// An open WIA image.
///
/// Owns its stream exclusively; open another reader for concurrent access.
/// The first corruption or I/O failure poisons the reader and every
/// subsequent read returns the same error kind.
pub struct WiaReader {
    inner: Box<dyn WiaStream>,
    header: FileHeader,
    disc: DiscHeader,
    partitions: Box<[PartitionEntry]>,
    raw_data: Box<[RawDataEntry]>,
    groups: Box<[GroupEntry]>,
    decompressor: Decompressor,
    poison: Option<(ErrorKind, String)>,
}

impl std::fmt::Debug for WiaReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WiaReader")
            .field("header", &self.header)
            .field("disc", &self.disc)
            .field("partitions", &self.partitions)
            .field("raw_data", &self.raw_data)
            .field("groups", &self.groups)
            .field("decompressor", &self.decompressor)
            .field("poison", &self.poison)
            .finish_non_exhaustive()
    }
}

impl WiaReader {
    /// Opens a WIA image from a filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WiaReader> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::Io(format!("failed to open {}", path.display()), e))?;
        Self::new(Box::new(file))
    }

    /// Opens a WIA image from a stream, validating the headers and loading
    /// the partition, raw-data, and group tables.
    pub fn new(mut inner: Box<dyn WiaStream>) -> Result<WiaReader> {
        inner.seek(SeekFrom::Start(0)).context("seeking to start")?;
        let header: FileHeader = read_from(inner.as_mut()).context("reading file header")?;
        header.validate()?;
        debug!("file header: {:?}", header);

        let mut disc_buf: Vec<u8> = read_vec(inner.as_mut(), header.header_2_size.get() as usize)
            .context("reading disc header")?;
        verify_hash(&disc_buf, &header.header_2_hash)?;
        disc_buf.resize(size_of::<DiscHeader>(), 0);
        let disc = DiscHeader::read_from_bytes(disc_buf.as_slice()).unwrap();
        disc.validate()?;
        debug!("disc header: {:?}", disc);

        let decompressor = Decompressor::new(&disc)?;

        // The partition table is stored uncompressed and carries its own hash.
        inner
            .seek(SeekFrom::Start(disc.partition_offset.get()))
            .context("seeking to partition table")?;
        let partitions: Box<[PartitionEntry]> =
            read_box_slice(inner.as_mut(), disc.num_partitions.get() as usize)
                .context("reading partition table")?;
        verify_hash(partitions.as_ref().as_bytes(), &disc.partition_hash)?;

        // The raw-data and group tables pass through the decompressor.
        let raw_data: Box<[RawDataEntry]> = read_table(
            inner.as_mut(),
            &decompressor,
            disc.raw_data_offset.get(),
            disc.raw_data_size.get(),
            disc.num_raw_data.get() as usize,
            "raw-data table",
        )?;
        let groups: Box<[GroupEntry]> = read_table(
            inner.as_mut(),
            &decompressor,
            disc.group_offset.get(),
            disc.group_size.get(),
            disc.num_groups.get() as usize,
            "group table",
        )?;
        debug!(
            "{} partitions, {} raw data spans, {} groups",
            partitions.len(),
            raw_data.len(),
            groups.len()
        );

        // Group ranges must stay inside the group table.
        let num_groups = groups.len() as u64;
        for rd in raw_data.iter() {
            if rd.group_index.get() as u64 + rd.num_groups.get() as u64 > num_groups {
                return Err(Error::Corrupt("raw data span references missing groups".to_string()));
            }
        }
        for pd in partitions.iter().flat_map(|p| p.data_entries.iter()) {
            if pd.group_index.get() as u64 + pd.num_groups.get() as u64 > num_groups {
                return Err(Error::Corrupt(
                    "partition data entry references missing groups".to_string(),
                ));
            }
        }

        Ok(WiaReader {
            inner,
            header,
            disc,
            partitions,
            raw_data,
            groups,
            decompressor,
            poison: None,
        })
    }

    /// The size of the uncompressed disc image.
    #[inline]
    pub fn data_size(&self) -> u64 { self.header.iso_file_size.get() }

    /// The size of the WIA file itself, as recorded in the header.
    #[inline]
    pub fn raw_size(&self) -> u64 { self.header.wia_file_size.get() }

    /// The chunk size disc data is divided into.
    #[inline]
    pub fn block_size(&self) -> u32 { self.disc.chunk_size.get() }

    /// Random access within a chunk still decompresses the whole chunk.
    #[inline]
    pub fn has_fast_random_access_in_block(&self) -> bool { false }

    /// The disc kind.
    #[inline]
    pub fn disc_kind(&self) -> DiscKind { self.disc.disc_kind() }

    /// The compression method used by this file.
    #[inline]
    pub fn compression(&self) -> Compression { self.disc.compression() }

    /// The verbatim first 0x80 bytes of the disc image.
    #[inline]
    pub fn disc_head(&self) -> &[u8; DISC_HEAD_SIZE] { &self.disc.disc_head }

    /// Whether [`read_wii_decrypted`](Self::read_wii_decrypted) can serve
    /// requests for this image.
    #[inline]
    pub fn supports_read_wii_decrypted(&self) -> bool {
        self.disc.disc_kind() == DiscKind::Wii && !self.partitions.is_empty()
    }

    /// Reads `out.len()` bytes of the reconstructed disc image starting at
    /// `offset`. Wii partition regions come back encrypted, with hash
    /// blocks recomputed and patched.
    ///
    /// An empty `out` is a no-op regardless of `offset`.
    #[instrument(name = "WiaReader::read", skip_all)]
    pub fn read(&mut self, offset: u64, out: &mut [u8]) -> Result<()> {
        self.check_poison()?;
        if out.is_empty() {
            return Ok(());
        }
        match self.read_inner(offset, out) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.poison(e)),
        }
    }

    fn read_inner(&mut self, offset: u64, out: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(out.len() as u64)
            .filter(|&end| end <= self.header.iso_file_size.get())
            .ok_or_else(|| {
                Error::OutOfRange(format!(
                    "read {:#X}+{:#X} exceeds disc size {:#X}",
                    offset,
                    out.len(),
                    self.header.iso_file_size.get()
                ))
            })?;

        let mut pos = offset;
        let mut written = 0;
        while written < out.len() {
            let sector = (pos / SECTOR_SIZE as u64) as u32;
            let n = if let Some((p_idx, e_idx)) = self.find_partition_entry(sector) {
                self.read_partition_window(p_idx, e_idx, pos, &mut out[written..])?
            } else if let Some(r_idx) = self.find_raw_entry(sector) {
                self.read_raw_window(r_idx, pos, &mut out[written..])?
            } else {
                return Err(Error::OutOfRange(format!(
                    "offset {:#X} is not covered by any partition or raw data span",
                    pos
                )));
            };
            pos += n as u64;
            written += n;
        }

        // The leading disc header bytes are always served from the header
        // copy, regardless of what the first group stores there.
        if offset < DISC_HEAD_SIZE as u64 {
            let head_end = end.min(DISC_HEAD_SIZE as u64) as usize;
            out[..head_end - offset as usize]
                .copy_from_slice(&self.disc.disc_head[offset as usize..head_end]);
        }
        Ok(())
    }

    /// Reads Wii partition payload without re-encryption, in 0x7C00-byte
    /// data units rooted at the partition whose hashed data region starts
    /// at `partition_data_offset` (an absolute disc offset).
    #[instrument(name = "WiaReader::read_wii_decrypted", skip_all)]
    pub fn read_wii_decrypted(
        &mut self,
        offset: u64,
        out: &mut [u8],
        partition_data_offset: u64,
    ) -> Result<()> {
        self.check_poison()?;
        if out.is_empty() {
            return Ok(());
        }
        if self.disc.disc_kind() != DiscKind::Wii {
            return Err(Error::Unsupported(
                "Wii decrypted read on a GameCube disc".to_string(),
            ));
        }
        match self.read_wii_decrypted_inner(offset, out, partition_data_offset) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.poison(e)),
        }
    }

    fn read_wii_decrypted_inner(
        &mut self,
        offset: u64,
        out: &mut [u8],
        partition_data_offset: u64,
    ) -> Result<()> {
        let chunk_data_size =
            self.disc.chunk_size.get() as u64 / SECTOR_SIZE as u64 * SECTOR_DATA_SIZE as u64;
        let p_idx = self
            .partitions
            .iter()
            .position(|p| p.data_entries[0].start_offset() == partition_data_offset)
            .ok_or_else(|| {
                Error::Unsupported(format!(
                    "no partition data starts at {:#X}",
                    partition_data_offset
                ))
            })?;
        let first_sector = self.partitions[p_idx].data_entries[0].first_sector.get();

        let mut pos = offset;
        let mut written = 0;
        for e_idx in 0..2 {
            let pd = &self.partitions[p_idx].data_entries[e_idx];
            let num_sectors = pd.num_sectors.get();
            let (entry_first, group_base, num_groups) =
                (pd.first_sector.get(), pd.group_index.get(), pd.num_groups.get());
            if num_sectors == 0 {
                continue;
            }
            let Some(rel_sector) = entry_first.checked_sub(first_sector) else {
                return Err(Error::Corrupt(
                    "partition data entry precedes the partition start".to_string(),
                ));
            };
            let entry_begin = rel_sector as u64 * SECTOR_DATA_SIZE as u64;
            let entry_end = entry_begin + num_sectors as u64 * SECTOR_DATA_SIZE as u64;
            while written < out.len() && pos >= entry_begin && pos < entry_end {
                let chunk_index = ((pos - entry_begin) / chunk_data_size) as u32;
                if chunk_index >= num_groups {
                    return Err(Error::Corrupt(format!(
                        "chunk {} beyond partition data entry groups",
                        chunk_index
                    )));
                }
                let group_begin = entry_begin + chunk_index as u64 * chunk_data_size;
                let group_size = chunk_data_size.min(entry_end - group_begin) as usize;
                let group = self.groups[(group_base + chunk_index) as usize].clone();
                // Exception lists patch hashes, which this path never emits.
                let (data, _) = self.read_group(&group, group_size, true)?;
                let offset_in_group = (pos - group_begin) as usize;
                let n = (out.len() - written).min(group_size - offset_in_group);
                out[written..written + n]
                    .copy_from_slice(&data[offset_in_group..offset_in_group + n]);
                pos += n as u64;
                written += n;
            }
            if written == out.len() {
                break;
            }
        }
        if written != out.len() {
            return Err(Error::OutOfRange(format!(
                "decrypted read {:#X}+{:#X} is not contained in the partition data",
                offset,
                out.len()
            )));
        }
        Ok(())
    }

    fn find_partition_entry(&self, sector: u32) -> Option<(usize, usize)> {
        self.partitions.iter().enumerate().find_map(|(p_idx, p)| {
            p.data_entries.iter().enumerate().find_map(|(e_idx, pd)| {
                (pd.num_sectors.get() > 0 && pd.contains_sector(sector))
                    .then_some((p_idx, e_idx))
            })
        })
    }

    fn find_raw_entry(&self, sector: u32) -> Option<usize> {
        self.raw_data.iter().position(|rd| rd.contains_sector(sector))
    }

    /// Serves as much of the request as the raw-data group containing `pos`
    /// covers. Returns the number of bytes written.
    fn read_raw_window(&mut self, r_idx: usize, pos: u64, out: &mut [u8]) -> Result<usize> {
        let rd = &self.raw_data[r_idx];
        let (start, end, group_base, num_groups) =
            (rd.start_offset(), rd.end_offset(), rd.group_index.get(), rd.num_groups.get());
        if pos >= end {
            // Possible when the span's unaligned end shares a sector with
            // uncovered bytes.
            return Err(Error::OutOfRange(format!(
                "offset {:#X} is past the raw data span end {:#X}",
                pos, end
            )));
        }
        let chunk_size = self.disc.chunk_size.get() as u64;
        let chunk_index = ((pos - start) / chunk_size) as u32;
        if chunk_index >= num_groups {
            return Err(Error::Corrupt(format!(
                "chunk {} beyond raw data span groups",
                chunk_index
            )));
        }
        let group_begin = start + chunk_index as u64 * chunk_size;
        let group_size = chunk_size.min(end - group_begin) as usize;
        let group = self.groups[(group_base + chunk_index) as usize].clone();
        let (data, _) = self.read_group(&group, group_size, false)?;
        let offset_in_group = (pos - group_begin) as usize;
        let n = out.len().min(group_size - offset_in_group);
        out[..n].copy_from_slice(&data[offset_in_group..offset_in_group + n]);
        Ok(n)
    }

    /// Serves as much of the request as the partition group containing
    /// `pos` covers, rebuilding full encrypted sectors: recompute the hash
    /// tree per 64-sector run, overlay the stored exceptions, encrypt with
    /// the partition key.
    fn read_partition_window(
        &mut self,
        p_idx: usize,
        e_idx: usize,
        pos: u64,
        out: &mut [u8],
    ) -> Result<usize> {
        let key: KeyBytes = self.partitions[p_idx].partition_key;
        let pd = &self.partitions[p_idx].data_entries[e_idx];
        let (first_sector, num_sectors, group_base, num_groups) =
            (pd.first_sector.get(), pd.num_sectors.get(), pd.group_index.get(), pd.num_groups.get());
        let sectors_per_chunk = self.disc.chunk_size.get() / SECTOR_SIZE as u32;

        let sector = (pos / SECTOR_SIZE as u64) as u32;
        let chunk_index = (sector - first_sector) / sectors_per_chunk;
        if chunk_index >= num_groups {
            return Err(Error::Corrupt(format!(
                "chunk {} beyond partition data entry groups",
                chunk_index
            )));
        }
        let group_first_sector = first_sector + chunk_index * sectors_per_chunk;
        let group_sectors =
            sectors_per_chunk.min(first_sector + num_sectors - group_first_sector) as usize;
        let group_size = group_sectors * SECTOR_DATA_SIZE;
        let group = self.groups[(group_base + chunk_index) as usize].clone();
        let (data, exceptions) = self.read_group(&group, group_size, true)?;

        // Window within the group's encrypted span.
        let group_begin = group_first_sector as u64 * SECTOR_SIZE as u64;
        let offset_in_group = (pos - group_begin) as usize;
        let n = out.len().min(group_sectors * SECTOR_SIZE - offset_in_group);

        let mut sector_group = <[u8; SECTOR_GROUP_SIZE]>::new_box_zeroed().unwrap();
        let first_run = offset_in_group / SECTOR_GROUP_SIZE;
        let last_run = (offset_in_group + n - 1) / SECTOR_GROUP_SIZE;
        for run in first_run..=last_run {
            let run_first = run * SECTOR_GROUP_SECTORS;
            let run_sectors = SECTOR_GROUP_SECTORS.min(group_sectors - run_first);
            sector_group.fill(0);
            for s in 0..run_sectors {
                let data_offset = (run_first + s) * SECTOR_DATA_SIZE;
                sector_group[s * SECTOR_SIZE + HASHES_SIZE..(s + 1) * SECTOR_SIZE]
                    .copy_from_slice(&data[data_offset..data_offset + SECTOR_DATA_SIZE]);
            }
            let hashes = hash_sector_group(&sector_group);
            for s in 0..run_sectors {
                hashes.apply(array_ref_mut![sector_group, s * SECTOR_SIZE, SECTOR_SIZE], s);
            }
            if let Some(list) = exceptions.get(run) {
                apply_hash_exceptions(&mut sector_group, list);
            }

            let run_begin = run * SECTOR_GROUP_SIZE;
            let win_start = offset_in_group.max(run_begin);
            let win_end = (offset_in_group + n).min(run_begin + run_sectors * SECTOR_SIZE);
            let s_first = (win_start - run_begin) / SECTOR_SIZE;
            let s_last = (win_end - 1 - run_begin) / SECTOR_SIZE;
            for s in s_first..=s_last {
                encrypt_sector(array_ref_mut![sector_group, s * SECTOR_SIZE, SECTOR_SIZE], &key);
            }
            out[win_start - offset_in_group..win_end - offset_in_group]
                .copy_from_slice(&sector_group[win_start - run_begin..win_end - run_begin]);
        }
        Ok(n)
    }

    /// Fetches and decodes one group: seek to its payload, consume the
    /// exception lists where they apply, decompress, and verify that
    /// exactly `group_size` bytes remain.
    fn read_group(
        &mut self,
        group: &GroupEntry,
        group_size: usize,
        in_partition: bool,
    ) -> Result<(Bytes, Vec<ExceptionList>)> {
        let num_exception_lists = if in_partition {
            (self.disc.chunk_size.get() as usize).div_ceil(SECTOR_GROUP_SIZE)
        } else {
            0
        };

        // All-zero group: no bytes stored, exception lists are empty.
        let data_size = group.data_size.get();
        if data_size == 0 {
            let data = Bytes::from(vec![0u8; group_size]);
            return Ok((data, vec![ExceptionList::default(); num_exception_lists]));
        }

        self.inner
            .seek(SeekFrom::Start(group.file_offset()))
            .context("seeking to group data")?;
        let stored: Vec<u8> =
            read_vec(self.inner.as_mut(), data_size as usize).context("reading group data")?;
        let mut stored = Bytes::from(stored);

        // For None and Purge the exception lists sit uncompressed ahead of
        // the payload, padded to 4-byte alignment; the other methods store
        // them inside the compressed stream.
        let uncompressed_exception_lists =
            matches!(self.disc.compression(), Compression::None | Compression::Purge);
        let mut exception_lists = vec![];
        if in_partition && uncompressed_exception_lists {
            exception_lists = read_exception_lists(&mut stored, num_exception_lists, true)?;
        }
        let slack = if in_partition && !uncompressed_exception_lists {
            num_exception_lists * MAX_EXCEPTION_LIST_SIZE
        } else {
            0
        };
        let mut decoded = BytesMut::zeroed(group_size + slack);
        let n = self
            .decompressor
            .decompress(stored.as_ref(), decoded.as_mut())
            .map_err(|e| decode_error(e, "decoding group data"))?;
        decoded.truncate(n);
        let mut decoded = decoded.freeze();
        if in_partition && !uncompressed_exception_lists {
            exception_lists = read_exception_lists(&mut decoded, num_exception_lists, false)?;
        }

        if decoded.remaining() != group_size {
            return Err(Error::Corrupt(format!(
                "group data size mismatch: {} != {}",
                decoded.remaining(),
                group_size
            )));
        }
        Ok((decoded, exception_lists))
    }

    fn check_poison(&self) -> Result<()> {
        match &self.poison {
            Some((kind, message)) => Err(Error::from_kind(*kind, message.clone())),
            None => Ok(()),
        }
    }

    fn poison(&mut self, e: Error) -> Error {
        if self.poison.is_none() && matches!(e.kind(), ErrorKind::Corrupt | ErrorKind::Io) {
            self.poison = Some((e.kind(), e.render()));
        }
        e
    }
}

/// Classifies a decompressor failure: rejected input is corruption, the
/// rest is I/O.
fn decode_error(e: io::Error, what: &str) -> Error {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            Error::Corrupt(format!("{}: {}", what, e))
        }
        _ => Error::Io(what.to_string(), e),
    }
}

/// Reads a compressed table of `count` entries.
fn read_table<T>(
    inner: &mut dyn WiaStream,
    decompressor: &Decompressor,
    offset: u64,
    stored_size: u32,
    count: usize,
    what: &str,
) -> Result<Box<[T]>>
where
    T: FromBytes + IntoBytes + zerocopy::Immutable + zerocopy::KnownLayout,
{
    inner
        .seek(SeekFrom::Start(offset))
        .with_context(|| format!("seeking to {}", what))?;
    let stored: Vec<u8> =
        read_vec(inner, stored_size as usize).with_context(|| format!("reading {}", what))?;
    let mut entries = <[T]>::new_box_zeroed_with_elems(count)
        .map_err(|_| Error::Corrupt(format!("{} too large", what)))?;
    let out = entries.as_mut_bytes();
    let n = decompressor
        .decompress(&stored, out)
        .map_err(|e| decode_error(e, what))?;
    if n != out.len() {
        return Err(Error::Corrupt(format!("{} size mismatch: {} != {}", what, n, out.len())));
    }
    Ok(entries)
}

/// Reads the group's exception sublists, one per 2 MiB of chunk territory.
/// With `align`, the consumed length is rounded up to 4 bytes before the
/// payload starts.
fn read_exception_lists(
    bytes: &mut Bytes,
    count: usize,
    align: bool,
) -> Result<Vec<ExceptionList>> {
    let initial_remaining = bytes.remaining();
    let mut exception_lists = Vec::with_capacity(count);
    for _ in 0..count {
        if bytes.remaining() < size_of::<u16>() {
            return Err(Error::Corrupt("truncated exception list count".to_string()));
        }
        let num_exceptions = bytes.get_u16();
        if bytes.remaining() < num_exceptions as usize * size_of::<HashException>() {
            return Err(Error::Corrupt("truncated exception list".to_string()));
        }
        let mut exceptions =
            <[HashException]>::new_box_zeroed_with_elems(num_exceptions as usize).unwrap();
        bytes.copy_to_slice(exceptions.as_mut_bytes());
        if !exceptions.is_empty() {
            debug!("exception list: {} entries", exceptions.len());
        }
        exception_lists.push(exceptions);
    }
    if align {
        let rem = (initial_remaining - bytes.remaining()) % 4;
        if rem != 0 {
            let pad = 4 - rem;
            if bytes.remaining() < pad {
                return Err(Error::Corrupt("truncated exception list padding".to_string()));
            }
            bytes.advance(pad);
        }
    }
    Ok(exception_lists)
}

#[cfg(test)]
mod tests {
    use zerocopy::big_endian::U16;

    use super::*;

    #[test]
    fn exception_lists_alignment() {
        // One sublist with a single entry: 2 + 22 = 24 bytes, aligned.
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(HashException { offset: U16::new(4), hash: [9; 20] }.as_bytes());
        buf.extend_from_slice(&[0xAA; 4]);
        let mut bytes = Bytes::from(buf.clone());
        let lists = read_exception_lists(&mut bytes, 1, true).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].len(), 1);
        assert_eq!(bytes.remaining(), 4);

        // Two empty sublists: 4 bytes consumed, already aligned.
        let mut bytes = Bytes::from(vec![0u8; 8]);
        let lists = read_exception_lists(&mut bytes, 2, true).unwrap();
        assert_eq!(lists.len(), 2);
        assert!(lists.iter().all(|l| l.is_empty()));
        assert_eq!(bytes.remaining(), 4);

        // One empty sublist: 2 bytes consumed, padded to 4 when aligned.
        let mut bytes = Bytes::from(vec![0u8; 8]);
        read_exception_lists(&mut bytes, 1, true).unwrap();
        assert_eq!(bytes.remaining(), 4);
        let mut bytes = Bytes::from(vec![0u8; 8]);
        read_exception_lists(&mut bytes, 1, false).unwrap();
        assert_eq!(bytes.remaining(), 6);
    }

    #[test]
    fn exception_lists_truncated() {
        let mut bytes = Bytes::from(vec![0u8; 1]);
        assert!(read_exception_lists(&mut bytes, 1, false).is_err());
        // Count claims more entries than the buffer holds.
        let mut buf = Vec::new();
        buf.extend_from_slice(&5u16.to_be_bytes());
        buf.extend_from_slice(&[0u8; 22]);
        let mut bytes = Bytes::from(buf);
        assert!(read_exception_lists(&mut bytes, 1, false).is_err());
    }
}
