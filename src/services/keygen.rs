use rand::RngCore;
use rand::rngs::OsRng;

use super::classify::Orientation;

/// Generate a storage key of the form `{label}/{128-bit hex}.mp4`.
///
/// Randomness comes from the OS CSPRNG; key unpredictability is the only
/// collision and guessing defense, so a seeded PRNG is not acceptable here.
pub fn generate_storage_key(orientation: Orientation) -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    format!("{}/{}.mp4", orientation.as_str(), hex::encode(bytes))
}
