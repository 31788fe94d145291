use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::debug;

use crate::{error::Error, orbit::Orbit, tle::decode};

/// Element set catalog, in file order.
#[derive(Debug, Clone, Default)]
pub struct TleCatalog {
    entries: Vec<Orbit>,
}

impl TleCatalog {
    /// Builds a [TleCatalog] from already decoded [Orbit]s.
    pub fn new(entries: Vec<Orbit>) -> Result<Self, Error> {
        if entries.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self { entries })
    }

    /// Parses 2-line or 3-line (name + element lines) element sets.
    /// A name line may carry the "0 " prefix of the 3LE convention.
    /// Blank and `#` comment lines are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut entries = Vec::new();
        let mut name: Option<String> = None;
        let mut line1: Option<(usize, String)> = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.trim_end();

            if content.trim().is_empty() || content.starts_with('#') {
                continue;
            }

            if let Some((number, first)) = line1.take() {
                let orbit = decode(name.as_deref(), &first, content)
                    .map_err(|error| Error::Parsing {
                        line: number,
                        error,
                    })?;
                entries.push(orbit);
                name = None;
                continue;
            }

            if content.starts_with("1 ") {
                line1 = Some((index + 1, content.to_string()));
            } else {
                let content = content.strip_prefix("0 ").unwrap_or(content);
                name = Some(content.trim().to_string());
            }
        }

        let catalog = Self::new(entries)?;
        debug!("loaded {} element sets", catalog.len());
        Ok(catalog)
    }

    /// Loads an element set file, see [TleCatalog::from_reader].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let fd = File::open(path)?;
        Self::from_reader(BufReader::new(fd))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in file order
    pub fn entries(&self) -> &[Orbit] {
        &self.entries
    }

    /// First entry with this catalog number
    pub fn lookup(&self, catalog_number: u32) -> Option<&Orbit> {
        self.entries
            .iter()
            .find(|orbit| orbit.catalog_number == catalog_number)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ParsingError;

    const CATALOG: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537

# two line set
1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753
2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667
";

    #[test]
    fn catalog_loading() {
        let catalog = TleCatalog::from_reader(CATALOG.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);

        let iss = catalog.lookup(25544).unwrap();
        assert_eq!(iss.name.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(iss.mean_motion, 15.72125391);

        let vanguard = catalog.lookup(5).unwrap();
        assert!(vanguard.name.is_none());
        assert_eq!(vanguard.eccentricity, 0.1859667);
        assert_eq!(vanguard.epoch_year, 2000);

        assert!(catalog.lookup(1).is_none());
        assert_eq!(catalog.entries()[0].catalog_number, 25544);
    }

    #[test]
    fn three_line_prefix() {
        let content = CATALOG.replace("ISS (ZARYA)", "0 ISS (ZARYA)");
        let catalog = TleCatalog::from_reader(content.as_bytes()).unwrap();
        assert_eq!(
            catalog.lookup(25544).unwrap().name.as_deref(),
            Some("ISS (ZARYA)")
        );
    }

    #[test]
    fn catalog_errors() {
        assert!(matches!(
            TleCatalog::from_reader("".as_bytes()),
            Err(Error::EmptyCatalog)
        ));

        assert!(matches!(
            TleCatalog::from_reader("# nothing but comments\n\n".as_bytes()),
            Err(Error::EmptyCatalog)
        ));

        let corrupted = CATALOG.replace("15.72125391563537", "15.72125391563536");
        match TleCatalog::from_reader(corrupted.as_bytes()) {
            Err(Error::Parsing {
                line: 2,
                error: ParsingError::Checksum { .. },
            }) => {},
            other => panic!("unexpected {:?}", other),
        }
    }
}
