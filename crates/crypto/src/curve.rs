//! BLS12-381 point helpers.

use bls12_381::{G1Affine, G1Projective, G2Affine};
use group::Curve;
use sha2::{Digest, Sha256};

use auction_types::{G1Point, G2Point};

const HASH_TO_G1_DST: &[u8] = b"XCAM_BLS12381G1_TRY_AND_INCREMENT:";

/// Hash arbitrary data to a G1 point.
///
/// Try-and-increment: expand `data || counter` to 48 bytes, read them as a
/// compressed x-coordinate, and clear the cofactor of the first candidate that
/// lands on the curve. The discrete log of the result is unknown to everyone.
pub fn hash_to_g1(data: &[u8]) -> G1Affine {
    let mut counter = 0u64;
    loop {
        if let Some(point) = try_point_from_hash(&expand(data, counter)) {
            return point;
        }
        counter += 1;
    }
}

/// Expand `data` and a counter into 48 candidate bytes.
fn expand(data: &[u8], counter: u64) -> [u8; 48] {
    let mut out = [0u8; 48];
    for (block, chunk) in out.chunks_mut(32).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update(HASH_TO_G1_DST);
        hasher.update(data);
        hasher.update(counter.to_le_bytes());
        hasher.update([block as u8]);
        let digest = hasher.finalize();
        chunk.copy_from_slice(&digest[..chunk.len()]);
    }
    out
}

/// Attempt to construct a prime-order G1 point from candidate bytes.
fn try_point_from_hash(candidate: &[u8; 48]) -> Option<G1Affine> {
    let mut bytes = *candidate;
    // compression flag set, infinity flag clear, sign bit taken from the hash
    bytes[0] = (bytes[0] & 0x3f) | 0x80;

    let point: Option<G1Affine> = G1Affine::from_compressed_unchecked(&bytes).into();
    let cleared = G1Projective::from(point?).clear_cofactor();
    if bool::from(cleared.is_identity()) {
        return None;
    }
    Some(cleared.to_affine())
}

/// Compress a G1 point to bytes.
pub fn compress_g1(point: &G1Affine) -> G1Point {
    G1Point(point.to_compressed())
}

/// Decompress a G1 point from bytes.
pub fn decompress_g1(point: &G1Point) -> Result<G1Affine, crate::CryptoError> {
    Option::from(G1Affine::from_compressed(&point.0)).ok_or(crate::CryptoError::InvalidG1Point)
}

/// Compress a G2 point to bytes.
pub fn compress_g2(point: &G2Affine) -> G2Point {
    G2Point(point.to_compressed())
}

/// Decompress a G2 point from bytes.
pub fn decompress_g2(point: &G2Point) -> Result<G2Affine, crate::CryptoError> {
    Option::from(G2Affine::from_compressed(&point.0)).ok_or(crate::CryptoError::InvalidG2Point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoError;

    #[test]
    fn test_hash_to_g1() {
        let point1 = hash_to_g1(b"test identity 1");
        let point2 = hash_to_g1(b"test identity 2");
        let point3 = hash_to_g1(b"test identity 1");

        assert_ne!(point1, point2);
        assert_eq!(point1, point3);
    }

    #[test]
    fn test_hash_to_g1_lands_in_subgroup() {
        let point = hash_to_g1(b"subgroup check");
        // from_compressed performs the subgroup check
        let checked: Option<G1Affine> = G1Affine::from_compressed(&point.to_compressed()).into();
        assert_eq!(checked, Some(point));
        assert!(!bool::from(point.is_identity()));
    }

    #[test]
    fn test_compress_roundtrip_g1() {
        let point = hash_to_g1(b"roundtrip");
        assert_eq!(decompress_g1(&compress_g1(&point)).unwrap(), point);
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert_eq!(
            decompress_g1(&G1Point([0xffu8; 48])),
            Err(CryptoError::InvalidG1Point)
        );
        assert_eq!(
            decompress_g2(&G2Point([0xffu8; 96])),
            Err(CryptoError::InvalidG2Point)
        );
    }
}
