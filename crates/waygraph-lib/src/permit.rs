//! Transport-mode permissions stored on every edge.
//!
//! The permit is an 8-bit field:
//!
//! ```text
//! bit 0  foot
//! bit 1  bike
//! bit 2  car
//! bit 3  reserved
//! bit 4  bike reverse-restricted (one-way for bikes)
//! bit 5  car reverse-restricted (one-way for cars)
//! ```
//!
//! A reverse-restriction bit means the edge may only be traversed from its
//! start node to its end node by that mode.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

/// Transport modes with their own permission bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Foot,
    Bike,
    Car,
}

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [
        TransportMode::Foot,
        TransportMode::Bike,
        TransportMode::Car,
    ];

    /// Bit granting access to this mode.
    pub fn access_bit(self) -> u8 {
        match self {
            TransportMode::Foot => PermitMask::FOOT.0,
            TransportMode::Bike => PermitMask::BIKE.0,
            TransportMode::Car => PermitMask::CAR.0,
        }
    }

    /// Bit marking an edge one-way for this mode. Pedestrians are never restricted.
    pub fn reverse_restriction_bit(self) -> Option<u8> {
        match self {
            TransportMode::Foot => None,
            TransportMode::Bike => Some(PermitMask::BIKE_ONEWAY.0),
            TransportMode::Car => Some(PermitMask::CAR_ONEWAY.0),
        }
    }
}

/// Named wrapper around the raw permit byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PermitMask(u8);

impl PermitMask {
    pub const FOOT: PermitMask = PermitMask(0b0000_0001);
    pub const BIKE: PermitMask = PermitMask(0b0000_0010);
    pub const CAR: PermitMask = PermitMask(0b0000_0100);
    pub const BIKE_ONEWAY: PermitMask = PermitMask(0b0001_0000);
    pub const CAR_ONEWAY: PermitMask = PermitMask(0b0010_0000);
    /// Value written when no rule matched a way: all base modes, no one-way bits.
    pub const DEFAULT: PermitMask = PermitMask(0b0000_1111);

    pub const fn from_bits(bits: u8) -> Self {
        PermitMask(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is also set here.
    pub fn contains(self, other: PermitMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn allows(self, mode: TransportMode) -> bool {
        self.0 & mode.access_bit() != 0
    }

    pub fn is_reverse_restricted(self, mode: TransportMode) -> bool {
        mode.reverse_restriction_bit()
            .map(|bit| self.0 & bit != 0)
            .unwrap_or(false)
    }

    /// Modes whose access bit is set in this mask (used for query masks).
    pub fn modes(self) -> impl Iterator<Item = TransportMode> {
        TransportMode::ALL
            .into_iter()
            .filter(move |mode| self.allows(*mode))
    }

    /// Whether an edge carrying `self` as permit must be added one-way when
    /// queried with `query`.
    ///
    /// True iff the query includes bike and the edge is bike-restricted, or
    /// the query includes car and the edge is car-restricted.
    pub fn is_directed_for(self, query: PermitMask) -> bool {
        query.modes().any(|mode| self.is_reverse_restricted(mode))
    }
}

impl Default for PermitMask {
    fn default() -> Self {
        PermitMask::DEFAULT
    }
}

impl fmt::Display for PermitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010b}", self.0)
    }
}

impl FromStr for PermitMask {
    type Err = Error;

    /// Parse `foot`, `bike`, `car`, or a raw non-zero decimal mask.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let mask = match trimmed.to_ascii_lowercase().as_str() {
            "foot" => PermitMask::FOOT,
            "bike" => PermitMask::BIKE,
            "car" => PermitMask::CAR,
            other => other
                .parse::<u8>()
                .ok()
                .filter(|bits| *bits != 0)
                .map(PermitMask)
                .ok_or_else(|| Error::InvalidPermitMask {
                    input: input.to_string(),
                })?,
        };
        Ok(mask)
    }
}

/// One row of the rule table: a tag that sets and/or clears permit bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitRule {
    pub key: String,
    pub value: String,
    pub set_bits: u8,
    pub clear_bits: u8,
}

impl PermitRule {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        set_bits: u8,
        clear_bits: u8,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            set_bits,
            clear_bits,
        }
    }
}

/// Outcome of classifying one way's tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub permit: PermitMask,
    /// Number of rules that matched; zero means the default mask was used.
    pub matched_rules: usize,
}

impl Classification {
    pub fn used_default(&self) -> bool {
        self.matched_rules == 0
    }
}

/// Computes permit masks from tags.
///
/// Granting rules accumulate with OR and restricting rules with AND, so the
/// result does not depend on tag order and the most restrictive rule wins.
#[derive(Debug, Clone, Default)]
pub struct PermitClassifier {
    rules: HashMap<(String, String), Vec<(u8, u8)>>,
}

impl PermitClassifier {
    pub fn new<'a>(rules: impl IntoIterator<Item = &'a PermitRule>) -> Self {
        let mut table: HashMap<(String, String), Vec<(u8, u8)>> = HashMap::new();
        for rule in rules {
            table
                .entry((rule.key.clone(), rule.value.clone()))
                .or_default()
                .push((rule.set_bits, rule.clear_bits));
        }
        Self { rules: table }
    }

    /// Classify a way from its `(key, value)` tags.
    pub fn classify<K, V>(&self, tags: &[(K, V)]) -> Classification
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set_mask = 0u8;
        let mut clear_mask = 0xFFu8;
        let mut matched_rules = 0usize;

        for (key, value) in tags {
            let lookup = (key.as_ref().to_string(), value.as_ref().to_string());
            if let Some(rules) = self.rules.get(&lookup) {
                for &(set_bits, clear_bits) in rules {
                    set_mask |= set_bits;
                    clear_mask &= clear_bits;
                    matched_rules += 1;
                }
            }
        }

        let permit = if matched_rules == 0 {
            PermitMask::DEFAULT
        } else {
            PermitMask(set_mask & clear_mask)
        };

        Classification {
            permit,
            matched_rules,
        }
    }
}

/// Built-in rule table installed by `install_default_permit_rules`.
pub fn default_permit_rules() -> Vec<PermitRule> {
    const FOOT: u8 = 0b0000_0001;
    const FOOT_BIKE: u8 = 0b0000_0011;
    const BIKE: u8 = 0b0000_0010;
    const BIKE_CAR: u8 = 0b0000_0110;
    const CAR: u8 = 0b0000_0100;
    const PAVED: u8 = 0b0000_1000;
    const ONEWAY: u8 = 0b0011_0000;
    const KEEP: u8 = 0xFF;
    const NO_FOOT: u8 = 0b1111_1110;
    const NO_BIKE: u8 = 0b1111_1101;
    const NO_BIKE_ONEWAY: u8 = 0b1110_1111;

    let rows: &[(&str, &str, u8, u8)] = &[
        ("highway", "pedestrian", FOOT, KEEP),
        ("highway", "track", FOOT, KEEP),
        ("highway", "footway", FOOT, KEEP),
        ("highway", "steps", FOOT, KEEP),
        ("highway", "path", FOOT, KEEP),
        ("highway", "construction", FOOT, KEEP),
        ("foot", "yes", FOOT, KEEP),
        ("foot", "designated", FOOT, KEEP),
        ("sidewalk", "both", FOOT, KEEP),
        ("sidewalk:both", "yes", FOOT, KEEP),
        ("sidewalk", "right", FOOT, KEEP),
        ("sidewalk:right", "yes", FOOT, KEEP),
        ("sidewalk", "left", FOOT, KEEP),
        ("sidewalk:left", "yes", FOOT, KEEP),
        ("sidewalk", "yes", FOOT, KEEP),
        ("highway", "residential", FOOT_BIKE, KEEP),
        ("highway", "living_street", FOOT_BIKE, KEEP),
        ("highway", "service", FOOT_BIKE, KEEP),
        ("highway", "track", FOOT_BIKE, KEEP),
        ("highway", "unclassified", FOOT_BIKE, KEEP),
        ("highway", "cycleway", BIKE, KEEP),
        ("bicycle", "yes", BIKE, KEEP),
        ("bicycle", "designated", BIKE, KEEP),
        ("highway", "primary", BIKE_CAR, KEEP),
        ("highway", "primary_link", BIKE_CAR, KEEP),
        ("highway", "secondary", BIKE_CAR, KEEP),
        ("highway", "secondary_link", BIKE_CAR, KEEP),
        ("highway", "tertiary", BIKE_CAR, KEEP),
        ("highway", "tertiary_link", BIKE_CAR, KEEP),
        ("highway", "unclassified", BIKE_CAR, KEEP),
        ("highway", "residential", BIKE_CAR, KEEP),
        ("highway", "motorway", CAR, KEEP),
        ("highway", "motorway_link", CAR, KEEP),
        ("highway", "trunk", CAR, KEEP),
        ("highway", "trunk_link", CAR, KEEP),
        ("surface", "asphalt", PAVED, KEEP),
        ("surface", "sett", PAVED, KEEP),
        ("surface", "paving_stones", PAVED, KEEP),
        ("oneway", "yes", ONEWAY, KEEP),
        ("sidewalk", "separate", 0, NO_FOOT),
        ("foot", "use_sidepath", 0, NO_FOOT),
        ("access", "no", 0, NO_FOOT),
        ("cycleway", "separate", 0, NO_BIKE),
        ("cycleway:both", "separate", 0, NO_BIKE),
        ("cycleway:right", "separate", 0, NO_BIKE),
        ("cycleway:left", "separate", 0, NO_BIKE),
        ("bicycle", "use_sidepath", 0, NO_BIKE),
        ("access", "no", 0, NO_BIKE),
        ("oneway:bicycle", "no", 0, NO_BIKE_ONEWAY),
    ];

    rows.iter()
        .map(|&(key, value, set_bits, clear_bits)| {
            PermitRule::new(key, value, set_bits, clear_bits)
        })
        .collect()
}
