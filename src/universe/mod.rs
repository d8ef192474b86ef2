//! Sector universe: the sector -> symbols mapping that drives the refresh

pub mod parser;

pub use parser::{load_sector_universe, parse_sector_universe, UniverseError, CONSTANT_NAME};

/// Ordered mapping from sector name to its ticker symbols.
///
/// Sector lookup resolves to the first sector that lists a symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorUniverse {
    sectors: Vec<(String, Vec<String>)>,
}

impl SectorUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add symbols under `sector`, merging into an existing sector of the same name
    pub fn insert<I, S>(&mut self, sector: &str, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = match self.sectors.iter().position(|(name, _)| name == sector) {
            Some(index) => index,
            None => {
                self.sectors.push((sector.to_string(), Vec::new()));
                self.sectors.len() - 1
            }
        };

        let list = &mut self.sectors[index].1;
        for symbol in symbols {
            let symbol = symbol.into();
            if !list.contains(&symbol) {
                list.push(symbol);
            }
        }
    }

    pub fn sectors(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sectors
            .iter()
            .map(|(name, symbols)| (name.as_str(), symbols.as_slice()))
    }

    pub fn get(&self, sector: &str) -> Option<&[String]> {
        self.sectors
            .iter()
            .find(|(name, _)| name == sector)
            .map(|(_, symbols)| symbols.as_slice())
    }

    /// First sector whose list contains `symbol`
    pub fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.sectors
            .iter()
            .find(|(_, symbols)| symbols.iter().any(|s| s == symbol))
            .map(|(name, _)| name.as_str())
    }

    /// Every distinct symbol once, in first-appearance order
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.sectors
            .iter()
            .flat_map(|(_, symbols)| symbols.iter())
            .map(String::as_str)
            .filter(|symbol| seen.insert(*symbol))
            .collect()
    }

    /// Symbols listed under more than one sector, with every sector that lists them
    pub fn shared_symbols(&self) -> Vec<(&str, Vec<&str>)> {
        let mut shared = Vec::new();
        for symbol in self.symbols() {
            let owners: Vec<&str> = self
                .sectors
                .iter()
                .filter(|(_, symbols)| symbols.iter().any(|s| s == symbol))
                .map(|(name, _)| name.as_str())
                .collect();
            if owners.len() > 1 {
                shared.push((symbol, owners));
            }
        }
        shared
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols().len()
    }
}
