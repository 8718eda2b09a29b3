//! Major US clean-air legislation, overlaid on the pollution timeline.

use super::records::LegislationMarker;

pub const LEGISLATION: &[LegislationMarker] = &[
    LegislationMarker {
        year: 1970,
        title: "Clean Air Act",
        abbrev: "CAA",
        description: "Established national air quality standards and required states to develop implementation plans.",
    },
    LegislationMarker {
        year: 1977,
        title: "Clean Air Act Amendments",
        abbrev: "CAAA 77",
        description: "Set stricter standards for industrial pollutants and vehicle emissions.",
    },
    LegislationMarker {
        year: 1990,
        title: "Clean Air Act Amendments",
        abbrev: "CAAA 90",
        description: "Addressed acid rain, ozone depletion, and toxic air pollution with market-based approaches.",
    },
    LegislationMarker {
        year: 2011,
        title: "Cross-State Air Pollution Rule",
        abbrev: "CSAPR",
        description: "Required states to reduce power plant emissions that cross state lines.",
    },
    LegislationMarker {
        year: 2012,
        title: "Mercury and Air Toxics Standards",
        abbrev: "MATS",
        description: "First national standards to reduce mercury and toxic air pollution from power plants.",
    },
    LegislationMarker {
        year: 2015,
        title: "Clean Power Plan",
        abbrev: "CPP",
        description: "Set carbon pollution standards for existing power plants (implementation varied by administration).",
    },
];

/// Markers falling inside an inclusive year window.
pub fn markers_between(first_year: i32, last_year: i32) -> Vec<&'static LegislationMarker> {
    LEGISLATION
        .iter()
        .filter(|m| (first_year..=last_year).contains(&m.year))
        .collect()
}
