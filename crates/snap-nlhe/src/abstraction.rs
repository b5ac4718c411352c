use crate::spot::Spot;
use snap_core::*;
use std::hash::Hash;
use std::hash::Hasher;

/// A hand bucket: the abstraction's label for a set of strategically
/// similar holdings on one street.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Bucket(u16);

impl From<u16> for Bucket {
    fn from(n: u16) -> Self {
        Self(n)
    }
}
impl From<Bucket> for u16 {
    fn from(bucket: Bucket) -> Self {
        bucket.0
    }
}

impl Arbitrary for Bucket {
    fn random() -> Self {
        Self(rand::random::<u16>())
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Structural parameters of a hand abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Bucket counts per street, preflop through river.
    pub buckets: [u16; 4],
    /// Table size the abstraction was built for.
    pub players: u8,
    /// Seed the clustering run started from.
    pub seed: u64,
}

/// The learned side of an abstraction: flattened cluster centroids.
///
/// Two clustering runs with identical [`Params`] still land on different
/// centroids, and strategies trained against them are not interchangeable.
/// Folding the centroids into the fingerprint is what catches that.
#[derive(Debug, Clone, Default)]
pub struct ClusterGeometry(Vec<f32>);

impl From<Vec<f32>> for ClusterGeometry {
    fn from(centroids: Vec<f32>) -> Self {
        Self(centroids)
    }
}

impl ClusterGeometry {
    /// Flattened centroid coordinates in a stable order.
    pub fn coordinates(&self) -> &[f32] {
        &self.0
    }
}

/// A 64-bit digest binding a strategy to one exact hand abstraction.
///
/// Covers both the structural [`Params`] and the learned
/// [`ClusterGeometry`], so independently built abstractions with the same
/// configuration still hash apart. Compared on every load; a mismatch is
/// fatal and never auto-corrected.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Digests parameters and geometry. Deterministic across processes.
    pub fn build(params: &Params, geometry: &ClusterGeometry) -> Self {
        let ref mut hasher = std::hash::DefaultHasher::new();
        params.buckets.hash(hasher);
        params.players.hash(hasher);
        params.seed.hash(hasher);
        for x in geometry.coordinates() {
            x.to_bits().hash(hasher);
        }
        Self(hasher.finish())
    }
    /// Compact tag carried inside every infoset key.
    pub const fn version(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl From<u64> for Fingerprint {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}
impl From<Fingerprint> for u64 {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl TryFrom<&str> for Fingerprint {
    type Error = std::num::ParseIntError;
    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        u64::from_str_radix(hex, 16).map(Self)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The hand-bucketing service contract.
///
/// Implementations map a seat's private holding plus the public state to a
/// [`Bucket`], and expose the [`Fingerprint`] of the abstraction they
/// embody. The solver treats buckets as opaque labels.
pub trait Abstractor {
    /// Bucket for the given seat's holding at this state.
    fn bucket(&self, spot: &Spot, seat: Position) -> Bucket;
    /// Digest of this abstraction build.
    fn fingerprint(&self) -> Fingerprint;
    /// Compact abstraction tag for infoset keys.
    fn version(&self) -> u16 {
        self.fingerprint().version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params {
            buckets: [169, 200, 200, 200],
            players: 2,
            seed: 42,
        }
    }

    #[test]
    fn identical_builds_agree() {
        let geometry = ClusterGeometry::from(vec![0.25, 0.5, 0.75]);
        let a = Fingerprint::build(&params(), &geometry);
        let b = Fingerprint::build(&params(), &geometry);
        assert_eq!(a, b);
    }

    #[test]
    fn same_params_different_geometry_disagree() {
        let a = Fingerprint::build(&params(), &ClusterGeometry::from(vec![0.25, 0.5, 0.75]));
        let b = Fingerprint::build(&params(), &ClusterGeometry::from(vec![0.25, 0.5, 0.76]));
        assert_ne!(a, b);
    }

    #[test]
    fn different_seeds_disagree() {
        let geometry = ClusterGeometry::from(vec![0.25, 0.5, 0.75]);
        let mut other = params();
        other.seed = 43;
        let a = Fingerprint::build(&params(), &geometry);
        let b = Fingerprint::build(&other, &geometry);
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrips() {
        let geometry = ClusterGeometry::from(vec![0.1, 0.9]);
        let fingerprint = Fingerprint::build(&params(), &geometry);
        let hex = fingerprint.to_string();
        assert_eq!(Fingerprint::try_from(hex.as_str()), Ok(fingerprint));
    }
}
