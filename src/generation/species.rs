//! Fixed particle/field species per hierarchy level.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::Level;

/// A density field's species label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    /// Untyped universe density
    Density,
    // Filament
    Proton,
    Neutron,
    Electron,
    Antiproton,
    Antineutron,
    Positron,
    // Sector
    Hydrogen,
    Helium,
    AntiHydrogen,
    AntiHelium,
    // Region
    Matter,
    Antimatter,
}

const UNIVERSE: [Species; 1] = [Species::Density];
const FILAMENT: [Species; 6] = [
    Species::Proton,
    Species::Neutron,
    Species::Electron,
    Species::Antiproton,
    Species::Antineutron,
    Species::Positron,
];
const SECTOR: [Species; 4] = [
    Species::Hydrogen,
    Species::Helium,
    Species::AntiHydrogen,
    Species::AntiHelium,
];
const REGION: [Species; 2] = [Species::Matter, Species::Antimatter];

impl Species {
    /// The species set a level's collections carry, in storage order.
    pub fn for_level(level: Level) -> &'static [Species] {
        match level {
            Level::Universe => &UNIVERSE,
            Level::Filament => &FILAMENT,
            Level::Sector => &SECTOR,
            Level::Region => &REGION,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Density => "density",
            Species::Proton => "proton",
            Species::Neutron => "neutron",
            Species::Electron => "electron",
            Species::Antiproton => "antiproton",
            Species::Antineutron => "antineutron",
            Species::Positron => "positron",
            Species::Hydrogen => "hydrogen",
            Species::Helium => "helium",
            Species::AntiHydrogen => "antihydrogen",
            Species::AntiHelium => "antihelium",
            Species::Matter => "matter",
            Species::Antimatter => "antimatter",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
