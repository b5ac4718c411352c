use crate::abstraction::Bucket;
use crate::path::Path;
use crate::street::Street;
use snap_core::*;

/// An infoset key: the decision point as the acting player sees it.
///
/// `version` ties the key to the abstraction build it was encoded under,
/// `bucket` stands in for the private holding, and `path` is this street's
/// abstract action history. Equal keys mean the same decision point, across
/// restarts and across storage backends; the `Ord` derive gives strategy
/// tables a stable iteration order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Info {
    version: u16,
    street: Street,
    bucket: Bucket,
    path: Path,
}

impl Info {
    pub const fn new(version: u16, street: Street, bucket: Bucket, path: Path) -> Self {
        Self {
            version,
            street,
            bucket,
            path,
        }
    }
    /// This street's action history.
    pub const fn path(&self) -> Path {
        self.path
    }
    /// Packed (version, street, bucket) half of the key, for persistence.
    pub fn present(&self) -> u64 {
        (self.version as u64) << 32 | (u8::from(self.street) as u64) << 16 | u16::from(self.bucket) as u64
    }
    /// Inverse of [`Info::present`], rejoined with a path.
    pub fn from_parts(present: u64, path: u64) -> Self {
        Self {
            version: (present >> 32) as u16,
            street: Street::from((present >> 16) as u8),
            bucket: Bucket::from(present as u16),
            path: Path::from(path),
        }
    }
}

impl Arbitrary for Info {
    fn random() -> Self {
        Self {
            version: rand::random(),
            street: Street::random(),
            bucket: Bucket::random(),
            path: Path::random(),
        }
    }
}

impl std::fmt::Display for Info {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.street, self.bucket, self.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_roundtrip() {
        for _ in 0..64 {
            let info = Info::random();
            let rebuilt = Info::from_parts(info.present(), u64::from(info.path()));
            assert_eq!(info, rebuilt);
        }
    }

    #[test]
    fn keys_differ_by_every_field() {
        let info = Info::new(1, Street::Flop, Bucket::from(7), Path::default());
        assert_ne!(info, Info::new(2, Street::Flop, Bucket::from(7), Path::default()));
        assert_ne!(info, Info::new(1, Street::Turn, Bucket::from(7), Path::default()));
        assert_ne!(info, Info::new(1, Street::Flop, Bucket::from(8), Path::default()));
    }
}
