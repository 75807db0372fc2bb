use aes::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};

use crate::{
    common::KeyBytes,
    format::{HASHES_SIZE, SECTOR_SIZE},
    util::array_ref,
};

/// Encrypts data in-place using AES-128-CBC with the given key and IV.
pub fn aes_cbc_encrypt(key: &KeyBytes, iv: &KeyBytes, data: &mut [u8]) {
    assert_eq!(data.len() % 16, 0);
    let len = data.len();
    <cbc::Encryptor<aes::Aes128>>::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(data, len)
        .unwrap();
}

/// Encrypts a Wii partition sector in-place. The hash block uses a zero IV;
/// the data block's IV comes from the encrypted hash block.
pub fn encrypt_sector(out: &mut [u8; SECTOR_SIZE], key: &KeyBytes) {
    aes_cbc_encrypt(key, &[0u8; 16], &mut out[..HASHES_SIZE]);
    let iv = *array_ref![out, 0x3D0, 16];
    aes_cbc_encrypt(key, &iv, &mut out[HASHES_SIZE..]);
}
