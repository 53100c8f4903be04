//! Object Identifier (OID) type and search helpers.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for
//! common OIDs. Ordering is lexicographic with a length tiebreak, which is
//! the order the sorted-registry helpers ([`lower_bound`], [`insert_sorted`])
//! rely on.

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// Maximum number of sub-identifiers allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a
/// value". Enforced during wire decoding.
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Stored as a sequence of sub-identifier values (u32). Uses SmallVec to
/// avoid heap allocation for OIDs with 16 or fewer sub-identifiers.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Oid {
    subids: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    ///
    /// An empty OID doubles as the "open upper bound" of a search range.
    pub fn empty() -> Self {
        Self {
            subids: SmallVec::new(),
        }
    }

    /// Create an OID from sub-identifier values.
    ///
    /// Accepts any iterator of `u32` values.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_agentx::oid::Oid;
    ///
    /// let oid = Oid::new(vec![1, 3, 6, 1, 4, 1]);
    /// assert_eq!(oid.subids(), &[1, 3, 6, 1, 4, 1]);
    ///
    /// let oid = Oid::new(0..5);
    /// assert_eq!(oid.subids(), &[0, 1, 2, 3, 4]);
    /// ```
    pub fn new(subids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            subids: subids.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of sub-identifiers.
    pub fn from_slice(subids: &[u32]) -> Self {
        Self {
            subids: SmallVec::from_slice(subids),
        }
    }

    /// Parse an OID from dotted string notation (e.g., "1.3.6.1.4.1.45995").
    ///
    /// Empty components (`"1..3"`) and non-digit characters are rejected.
    /// The empty string parses to the empty OID.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_agentx::oid::Oid;
    ///
    /// let oid = Oid::parse("1.3.6.1.4.1.45995.3.1").unwrap();
    /// assert_eq!(oid.len(), 9);
    ///
    /// assert!(Oid::parse("1..3").is_err());
    /// assert!(Oid::parse("1.3.abc").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::empty());
        }

        let mut subids = SmallVec::new();
        for part in s.split('.') {
            let subid: u32 = part
                .parse()
                .map_err(|_| Error::InvalidOid { input: s.into() }.boxed())?;
            subids.push(subid);
        }

        Ok(Self { subids })
    }

    /// Get the sub-identifier values.
    pub fn subids(&self) -> &[u32] {
        &self.subids
    }

    /// Get the number of sub-identifiers.
    pub fn len(&self) -> usize {
        self.subids.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.subids.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// Returns `true` if `self` begins with the same sub-identifiers as
    /// `other`. An OID always starts with itself, and any OID starts with
    /// the empty OID.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_agentx::oid::Oid;
    ///
    /// let leaf = Oid::parse("1.3.6.1.4.1.45995.3.1").unwrap();
    /// let subtree = Oid::parse("1.3.6.1.4.1.45995").unwrap();
    ///
    /// assert!(leaf.starts_with(&subtree));
    /// assert!(!subtree.starts_with(&leaf));
    /// ```
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.subids.len() >= other.subids.len()
            && self.subids[..other.subids.len()] == other.subids[..]
    }

    /// Return the first `count` sub-identifiers as a new OID.
    ///
    /// `count` is clamped to the OID's length.
    pub fn first(&self, count: usize) -> Oid {
        let count = count.min(self.subids.len());
        Oid::from_slice(&self.subids[..count])
    }

    /// Return the longest common prefix of this OID and `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_agentx::oid::Oid;
    ///
    /// let a = Oid::parse("1.3.6.1.4.1.45995.3.1").unwrap();
    /// let b = Oid::parse("1.3.6.1.4.1.45995.5").unwrap();
    /// assert_eq!(a.common_prefix(&b).to_string(), "1.3.6.1.4.1.45995");
    /// ```
    pub fn common_prefix(&self, other: &Oid) -> Oid {
        let matched = self
            .subids
            .iter()
            .zip(other.subids.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Oid::from_slice(&self.subids[..matched])
    }

    /// Create a child OID by appending a sub-identifier.
    pub fn child(&self, subid: u32) -> Oid {
        let mut subids = self.subids.clone();
        subids.push(subid);
        Oid { subids }
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for subid in &self.subids {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", subid)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Box<crate::error::Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(subids: &[u32]) -> Self {
        Self::from_slice(subids)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(subids: [u32; N]) -> Self {
        Self::new(subids)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    /// Lexicographic comparison with length tiebreak: a shorter OID sorts
    /// before any OID it prefixes.
    fn cmp(&self, other: &Self) -> Ordering {
        self.subids.cmp(&other.subids)
    }
}

/// Find the insertion point for `target` in a sorted slice of OIDs.
///
/// Returns the first index `i` such that `oids[i] >= target` when
/// `inclusive`, or `oids[i] > target` otherwise. If no such element exists,
/// returns `oids.len()`.
///
/// This is the only search substrate the library uses over OID tables; the
/// registry never hashes OID text.
///
/// # Examples
///
/// ```
/// use async_agentx::oid::{lower_bound, Oid};
///
/// let oids: Vec<Oid> = ["1.3.1", "1.3.3", "1.3.5"]
///     .iter()
///     .map(|s| Oid::parse(s).unwrap())
///     .collect();
///
/// let target = Oid::parse("1.3.3").unwrap();
/// assert_eq!(lower_bound(&oids, &target, true), 1);
/// assert_eq!(lower_bound(&oids, &target, false), 2);
/// ```
pub fn lower_bound(oids: &[Oid], target: &Oid, inclusive: bool) -> usize {
    let mut lo = 0;
    let mut hi = oids.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        let ord = oids[mid].cmp(target);
        if ord == Ordering::Less || (!inclusive && ord == Ordering::Equal) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Insert `oid` into a sorted vector, keeping the order, and return the
/// index at which it was placed.
pub fn insert_sorted(oids: &mut Vec<Oid>, oid: Oid) -> usize {
    let index = lower_bound(oids, &oid, true);
    oids.insert(index, oid);
    index
}

/// Macro to create an OID from literal sub-identifiers.
///
/// # Examples
///
/// ```
/// use async_agentx::oid;
///
/// let subtree = oid!(1, 3, 6, 1, 4, 1, 45995);
/// assert_eq!(subtree.to_string(), "1.3.6.1.4.1.45995");
/// ```
#[macro_export]
macro_rules! oid {
    ($($subid:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($subid),*])
    };
}
