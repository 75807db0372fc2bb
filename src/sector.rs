//! Wii sector hash reconstruction.
//!
//! Partition data is stored without its hash blocks, so the H0/H1/H2 tree
//! must be recomputed from the cleartext data before a sector can be
//! re-encrypted. A tree covers a group of 64 sectors; sectors past the end
//! of the stored data hash as zeroes.

use zerocopy::{FromZeros, IntoBytes};

use crate::{
    common::HashBytes,
    format::{
        HashException, HASHES_SIZE, SECTOR_DATA_SIZE, SECTOR_GROUP_SECTORS, SECTOR_GROUP_SIZE,
        SECTOR_SIZE,
    },
    util::{array_ref, array_ref_mut, digest::sha1_hash},
};

/// Number of H0 hashes per sector: one per 0x400 bytes of sector data.
pub const NUM_H0_HASHES: usize = SECTOR_DATA_SIZE / HASHES_SIZE;

/// Recomputed hashes for a 64-sector group.
#[derive(Clone, FromZeros)]
pub struct GroupHashes {
    pub h2_hashes: [HashBytes; 8],
    pub h1_hashes: [HashBytes; SECTOR_GROUP_SECTORS],
    pub h0_hashes: [HashBytes; NUM_H0_HASHES * SECTOR_GROUP_SECTORS],
}

impl GroupHashes {
    #[inline]
    pub fn hashes_for_sector(
        &self,
        sector: usize,
    ) -> (&[HashBytes; 31], &[HashBytes; 8], &[HashBytes; 8]) {
        let h1_hashes = array_ref![self.h1_hashes, sector & !7, 8];
        let h0_hashes = array_ref![self.h0_hashes, sector * NUM_H0_HASHES, 31];
        (h0_hashes, h1_hashes, &self.h2_hashes)
    }

    /// Writes the hash block for one sector of the group. The padding
    /// between the subtrees stays zero.
    #[inline]
    pub fn apply(&self, sector_data: &mut [u8; SECTOR_SIZE], sector: usize) {
        let (h0_hashes, h1_hashes, h2_hashes) = self.hashes_for_sector(sector);
        array_ref_mut![sector_data, 0, 0x26C].copy_from_slice(h0_hashes.as_bytes());
        array_ref_mut![sector_data, 0x280, 0xA0].copy_from_slice(h1_hashes.as_bytes());
        array_ref_mut![sector_data, 0x340, 0xA0].copy_from_slice(h2_hashes.as_bytes());
    }
}

/// Computes the full hash tree for a cleartext sector group. Hash blocks in
/// the input buffer must be zeroed; only the data portions are read.
pub fn hash_sector_group(sector_group: &[u8; SECTOR_GROUP_SIZE]) -> Box<GroupHashes> {
    let mut result = GroupHashes::new_box_zeroed().unwrap();
    for (h2_index, h2_hash) in result.h2_hashes.iter_mut().enumerate() {
        let out_h1_hashes = array_ref_mut![result.h1_hashes, h2_index * 8, 8];
        for (h1_index, h1_hash) in out_h1_hashes.iter_mut().enumerate() {
            let sector = h1_index + h2_index * 8;
            let out_h0_hashes =
                array_ref_mut![result.h0_hashes, sector * NUM_H0_HASHES, NUM_H0_HASHES];
            for (h0_index, h0_hash) in out_h0_hashes.iter_mut().enumerate() {
                *h0_hash = sha1_hash(array_ref![
                    sector_group,
                    sector * SECTOR_SIZE + HASHES_SIZE + h0_index * HASHES_SIZE,
                    HASHES_SIZE
                ]);
            }
            *h1_hash = sha1_hash(out_h0_hashes.as_bytes());
        }
        *h2_hash = sha1_hash(out_h1_hashes.as_bytes());
    }
    result
}

/// Splices stored hash overrides into a sector group's hash blocks.
///
/// Exception offsets address the group's 64 hash regions as a flat array;
/// a write crossing a region boundary continues in the next sector's hash
/// block. Bytes falling past the last sector are dropped.
pub fn apply_hash_exceptions(sector_group: &mut [u8; SECTOR_GROUP_SIZE], list: &[HashException]) {
    for exception in list {
        let mut offset = exception.offset.get() as usize;
        let mut remaining: &[u8] = &exception.hash;
        while !remaining.is_empty() {
            let sector = offset / HASHES_SIZE;
            if sector >= SECTOR_GROUP_SECTORS {
                break;
            }
            let within = offset % HASHES_SIZE;
            let n = remaining.len().min(HASHES_SIZE - within);
            sector_group[sector * SECTOR_SIZE + within..sector * SECTOR_SIZE + within + n]
                .copy_from_slice(&remaining[..n]);
            offset += n;
            remaining = &remaining[n..];
        }
    }
}

#[cfg(test)]
mod tests {
    use zerocopy::big_endian::U16;

    use super::*;

    #[test]
    fn h0_covers_data_blocks() {
        let mut group = <[u8; SECTOR_GROUP_SIZE]>::new_box_zeroed().unwrap();
        group[HASHES_SIZE..HASHES_SIZE + 4].copy_from_slice(&[1, 2, 3, 4]);
        let hashes = hash_sector_group(&group);
        let mut block = [0u8; HASHES_SIZE];
        block[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(hashes.h0_hashes[0], sha1_hash(&block));
        // Sector 1 has all-zero data, so its first H0 matches the zero block.
        assert_eq!(hashes.h0_hashes[NUM_H0_HASHES], sha1_hash(&[0u8; HASHES_SIZE]));
        // H1 of sector 0 covers its 31 H0 hashes.
        assert_eq!(
            hashes.h1_hashes[0],
            sha1_hash(array_ref![hashes.h0_hashes, 0, 31].as_bytes())
        );
        // H2 of the first subgroup covers the first 8 H1 hashes.
        assert_eq!(
            hashes.h2_hashes[0],
            sha1_hash(array_ref![hashes.h1_hashes, 0, 8].as_bytes())
        );
    }

    #[test]
    fn apply_fills_hash_block_layout() {
        let mut group = <[u8; SECTOR_GROUP_SIZE]>::new_box_zeroed().unwrap();
        group[HASHES_SIZE] = 0xAB;
        let hashes = hash_sector_group(&group);
        let mut sector = [0u8; SECTOR_SIZE];
        hashes.apply(&mut sector, 0);
        assert_eq!(*array_ref![sector, 0, 20], hashes.h0_hashes[0]);
        assert_eq!(*array_ref![sector, 0x280, 20], hashes.h1_hashes[0]);
        assert_eq!(*array_ref![sector, 0x340, 20], hashes.h2_hashes[0]);
        // Padding between subtrees stays zero.
        assert!(sector[0x26C..0x280].iter().all(|&b| b == 0));
        assert!(sector[0x3E0..HASHES_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn exceptions_address_flat_hash_regions() {
        let mut group = <[u8; SECTOR_GROUP_SIZE]>::new_box_zeroed().unwrap();
        let exception = HashException { offset: U16::new(0x400 + 0x10), hash: [0xEE; 20] };
        apply_hash_exceptions(&mut group, &[exception]);
        // Lands in sector 1's hash block, byte 0x10.
        assert_eq!(group[SECTOR_SIZE + 0x10..SECTOR_SIZE + 0x24], [0xEE; 20][..]);
        assert!(group[..SECTOR_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn exception_split_across_regions() {
        let mut group = <[u8; SECTOR_GROUP_SIZE]>::new_box_zeroed().unwrap();
        let exception = HashException { offset: U16::new(0x400 - 4), hash: [0xCD; 20] };
        apply_hash_exceptions(&mut group, &[exception]);
        // First 4 bytes end sector 0's hash block, the rest continues at
        // the start of sector 1's.
        assert_eq!(group[0x3FC..0x400], [0xCD; 4][..]);
        assert_eq!(group[SECTOR_SIZE..SECTOR_SIZE + 16], [0xCD; 16][..]);
    }
}
