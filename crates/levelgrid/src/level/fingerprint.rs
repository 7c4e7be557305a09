use std::fmt;

use sha2::{Digest, Sha256};

use super::{Direction, Level};

/// Digest of everything the level graph is derived from: ids, extents and
/// jump targets. Tile contents are not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopologyFingerprint([u8; 32]);

impl TopologyFingerprint {
    pub fn to_hex(&self) -> String {
        to_hex_lower(&self.0)
    }
}

impl fmt::Display for TopologyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub(crate) fn fingerprint_levels<'a>(
    levels: impl Iterator<Item = &'a Level>,
) -> TopologyFingerprint {
    let mut hasher = Sha256::new();
    for level in levels {
        hasher.update(level.id().0.to_le_bytes());
        hasher.update(level.width().to_le_bytes());
        hasher.update(level.height().to_le_bytes());
        for direction in Direction::ALL {
            match level.jump_target(direction) {
                Some(target) => {
                    hasher.update([1u8]);
                    hasher.update(target.0.to_le_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
        hasher.update([0xffu8]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    TopologyFingerprint(bytes)
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
