//! Visualization registry keyed by type code

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Features a visualization supports
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VizCapabilities(u8);

impl VizCapabilities {
    pub const NONE: Self = Self(0);
    /// Shows a legend
    pub const LEGEND: Self = Self(0x01);
    /// Records can be selected
    pub const SELECT: Self = Self(0x02);
    /// Can jump to a record's location
    pub const LOCATION: Self = Self(0x04);
    /// Legend allows a single active entry
    pub const SINGLE_LEGEND: Self = Self(0x08);
    /// Has an options dialog
    pub const OPTIONS: Self = Self(0x10);
    pub const VSCROLL: Self = Self(0x20);
    pub const HSCROLL: Self = Self(0x40);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for VizCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for VizCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(VizCapabilities, &str); 7] = [
            (VizCapabilities::LEGEND, "LEGEND"),
            (VizCapabilities::SELECT, "SELECT"),
            (VizCapabilities::LOCATION, "LOCATION"),
            (VizCapabilities::SINGLE_LEGEND, "SINGLE_LEGEND"),
            (VizCapabilities::OPTIONS, "OPTIONS"),
            (VizCapabilities::VSCROLL, "VSCROLL"),
            (VizCapabilities::HSCROLL, "HSCROLL"),
        ];
        let names: Vec<_> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "VizCapabilities({})", names.join(" | "))
    }
}

/// Visualization types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VizKind {
    #[serde(rename = "M")]
    Map,
    #[serde(rename = "C")]
    Cards,
    #[serde(rename = "P")]
    Pinboard,
    #[serde(rename = "T")]
    Timeline,
    #[serde(rename = "D")]
    Directory,
    #[serde(rename = "t")]
    TextStream,
    #[serde(rename = "N")]
    NetWheel,
}

impl VizKind {
    pub const ALL: [VizKind; 7] = [
        VizKind::Map,
        VizKind::Cards,
        VizKind::Pinboard,
        VizKind::Timeline,
        VizKind::Directory,
        VizKind::TextStream,
        VizKind::NetWheel,
    ];

    pub fn code(self) -> char {
        match self {
            VizKind::Map => 'M',
            VizKind::Cards => 'C',
            VizKind::Pinboard => 'P',
            VizKind::Timeline => 'T',
            VizKind::Directory => 'D',
            VizKind::TextStream => 't',
            VizKind::NetWheel => 'N',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            VizKind::Map => "Map",
            VizKind::Cards => "Cards",
            VizKind::Pinboard => "Pinboard",
            VizKind::Timeline => "Timeline",
            VizKind::Directory => "Directory",
            VizKind::TextStream => "TextStream",
            VizKind::NetWheel => "NetWheel",
        }
    }

    pub fn capabilities(self) -> VizCapabilities {
        use VizCapabilities as F;
        match self {
            VizKind::Map => F::LEGEND | F::SELECT | F::LOCATION | F::OPTIONS,
            VizKind::Cards => F::LEGEND | F::SELECT | F::VSCROLL | F::OPTIONS,
            VizKind::Pinboard => {
                F::LEGEND | F::SELECT | F::LOCATION | F::HSCROLL | F::VSCROLL | F::OPTIONS
            }
            VizKind::Timeline => F::LEGEND | F::SELECT | F::LOCATION | F::VSCROLL,
            VizKind::Directory => F::SELECT | F::VSCROLL | F::OPTIONS,
            VizKind::TextStream => F::LEGEND | F::SELECT | F::LOCATION | F::VSCROLL,
            VizKind::NetWheel => F::OPTIONS | F::LEGEND | F::SELECT | F::VSCROLL | F::HSCROLL,
        }
    }
}
