//! Observing sites
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, ParsingError};

/// Ground observing [Site] (reference data)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Site {
    /// Site identifier
    pub id: i32,
    /// Geodetic latitude (degrees)
    pub latitude_deg: f64,
    /// Longitude, positive East (degrees)
    pub longitude_deg: f64,
    /// Altitude above the ellipsoid (km)
    pub altitude_km: f64,
    /// Observer label
    pub observer: String,
}

impl Site {
    pub fn new(
        id: i32,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_km: f64,
        observer: &str,
    ) -> Self {
        Self {
            id,
            latitude_deg,
            longitude_deg,
            altitude_km,
            observer: observer.to_string(),
        }
    }

    /// Placeholder returned for ids that do not resolve.
    pub fn unknown(id: i32) -> Self {
        Self::new(id, 0.0, 0.0, 0.0, "Unknown observer")
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} ({:04}) lat={:.4}° lon={:.4}° alt={:.3}km",
            self.observer, self.id, self.latitude_deg, self.longitude_deg, self.altitude_km
        )
    }
}

/// Any [Site] provider should implement [SiteCatalog].
pub trait SiteCatalog {
    /// Resolve a site id. Unknown ids resolve to [Site::unknown].
    fn site(&self, id: i32) -> Site;
}

/// In-memory [SiteCatalog]
#[derive(Debug, Clone, Default)]
pub struct Sites {
    sites: HashMap<i32, Site>,
}

impl Sites {
    /// Builds [Sites] from a list, rejecting duplicate ids.
    pub fn new(sites: Vec<Site>) -> Result<Self, Error> {
        let mut s = Self::default();
        for site in sites {
            s.insert(site)?;
        }
        Ok(s)
    }

    /// Insert a new [Site]
    pub fn insert(&mut self, site: Site) -> Result<(), Error> {
        if self.sites.contains_key(&site.id) {
            return Err(Error::DuplicateSite(site.id));
        }
        self.sites.insert(site.id, site);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Parses a site table, one site per line:
    /// `ID XX LATITUDE LONGITUDE ALTITUDE_M OBSERVER...`
    /// where `XX` is a two letter abbreviation. Lines starting with `#` are comments.
    pub fn parse<R: Read>(reader: R) -> Result<Self, Error> {
        let mut sites = Self::default();

        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let content = line.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let site = parse_site_line(content).map_err(|error| Error::Parsing {
                line: index + 1,
                error,
            })?;

            sites.insert(site)?;
        }

        Ok(sites)
    }

    /// Parses a site table file, see [Sites::parse].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let fd = std::fs::File::open(path)?;
        Self::parse(fd)
    }
}

impl SiteCatalog for Sites {
    fn site(&self, id: i32) -> Site {
        match self.sites.get(&id) {
            Some(site) => site.clone(),
            None => {
                warn!("unknown site {:04}", id);
                Site::unknown(id)
            },
        }
    }
}

fn parse_site_line(content: &str) -> Result<Site, ParsingError> {
    let mut items = content.split_ascii_whitespace();

    let id = items.next().ok_or(ParsingError::MissingField("site id"))?;
    let id = id.parse::<i32>().map_err(|_| ParsingError::InvalidField {
        field: "site id",
        content: id.to_string(),
    })?;

    let _abbrev = items
        .next()
        .ok_or(ParsingError::MissingField("abbreviation"))?;

    let mut numbers = [0.0_f64; 3];
    for (number, field) in numbers
        .iter_mut()
        .zip(["latitude", "longitude", "altitude"])
    {
        let item = items.next().ok_or(ParsingError::MissingField(field))?;
        *number = item.parse::<f64>().map_err(|_| ParsingError::InvalidField {
            field,
            content: item.to_string(),
        })?;
    }

    let observer = items.collect::<Vec<_>>().join(" ");

    Ok(Site::new(
        id,
        numbers[0],
        numbers[1],
        numbers[2] / 1000.0,
        &observer,
    ))
}
