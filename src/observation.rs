//! Doppler measurements
use hifitime::Epoch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::ParsingError,
    site::{Site, SiteCatalog},
    time::{epoch_from_mjd, format_timestamp, mjd_from_calendar},
};

/// Selection state of an [Observation]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selection {
    /// Discarded, never used nor displayed
    Deleted,
    /// Valid but not used by the fit
    #[default]
    Unselected,
    /// Used by fit, RMS and identification
    Highlighted,
}

/// Single frequency measurement, received at a ground [Site].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    /// Epoch (MJD, UTC)
    pub(crate) mjd: f64,
    /// Measured frequency (kHz)
    pub(crate) frequency_khz: f64,
    /// Measured flux (arbitrary units)
    pub flux: f64,
    /// Receiving [Site]
    pub site: Site,
    /// Possible second [Site] (relay or bistatic geometry)
    pub remote: Option<Site>,
    pub(crate) selection: Selection,
    /// Latest predicted frequency (kHz)
    pub predicted_khz: Option<f64>,
    /// Latest residual: measured - predicted (kHz)
    pub residual_khz: Option<f64>,
}

impl Observation {
    /// Builds a new unselected [Observation]
    pub fn new(mjd: f64, frequency_khz: f64, flux: f64, site: Site) -> Self {
        Self {
            mjd,
            frequency_khz,
            flux,
            site,
            remote: None,
            selection: Selection::default(),
            predicted_khz: None,
            residual_khz: None,
        }
    }

    /// Copies and returns [Observation] with remote [Site]
    pub fn with_remote(&self, remote: Site) -> Self {
        let mut s = self.clone();
        s.remote = Some(remote);
        s
    }

    /// Copies and returns [Observation] with given [Selection]
    pub fn with_selection(&self, selection: Selection) -> Self {
        let mut s = self.clone();
        s.selection = selection;
        s
    }

    /// Epoch (MJD, UTC)
    pub fn mjd(&self) -> f64 {
        self.mjd
    }

    /// Measured frequency (kHz)
    pub fn frequency_khz(&self) -> f64 {
        self.frequency_khz
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn is_highlighted(&self) -> bool {
        self.selection == Selection::Highlighted
    }

    pub fn is_deleted(&self) -> bool {
        self.selection == Selection::Deleted
    }

    /// Measurement [Epoch]
    pub fn epoch(&self) -> Epoch {
        epoch_from_mjd(self.mjd)
    }

    /// Readable timestamp, see [format_timestamp]
    pub fn timestamp(&self) -> String {
        format_timestamp(self.mjd)
    }

    /// Decodes one measurement line. Two layouts are accepted:
    /// - `MJD FREQ FLUX SITE [REMOTE]`, identified by a '.' at the 6th character,
    /// - `YY/MM/DD HH:MM:SS.f FREQ FLUX SITE`, year being offset by 2000.
    ///
    /// Frequencies are expressed in Hz and stored in kHz.
    pub fn parse<S: SiteCatalog>(line: &str, sites: &S) -> Result<Self, ParsingError> {
        let mut items = line.split_ascii_whitespace();

        let mjd = if line.as_bytes().get(5) == Some(&b'.') {
            let mjd = items.next().ok_or(ParsingError::MissingField("mjd"))?;
            parse_float("mjd", mjd)?
        } else {
            let date = items.next().ok_or(ParsingError::MissingField("date"))?;
            let time = items.next().ok_or(ParsingError::MissingField("time"))?;
            parse_date_time(date, time)?
        };

        let frequency = items.next().ok_or(ParsingError::MissingField("frequency"))?;
        let frequency_hz = parse_float("frequency", frequency)?;

        let flux = items.next().ok_or(ParsingError::MissingField("flux"))?;
        let flux = parse_float("flux", flux)?;

        let site = items.next().ok_or(ParsingError::MissingField("site id"))?;
        let site = sites.site(parse_site_id(site)?);

        let remote = match items.next() {
            Some(remote) => Some(sites.site(parse_site_id(remote)?)),
            None => None,
        };

        Ok(Self {
            remote,
            ..Self::new(mjd, frequency_hz / 1000.0, flux, site)
        })
    }
}

fn parse_float(field: &'static str, content: &str) -> Result<f64, ParsingError> {
    content
        .parse::<f64>()
        .map_err(|_| ParsingError::InvalidField {
            field,
            content: content.to_string(),
        })
}

fn parse_site_id(content: &str) -> Result<i32, ParsingError> {
    content
        .parse::<i32>()
        .map_err(|_| ParsingError::InvalidField {
            field: "site id",
            content: content.to_string(),
        })
}

/// `YY/MM/DD` `HH:MM:SS.f`
fn parse_date_time(date: &str, time: &str) -> Result<f64, ParsingError> {
    let invalid = || ParsingError::Timestamp(format!("{} {}", date, time));

    let date = date
        .split('/')
        .map(|item| item.parse::<u8>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let (hours, minutes, seconds) = {
        let mut items = time.split(':');
        let hours = items.next().ok_or_else(invalid)?;
        let minutes = items.next().ok_or_else(invalid)?;
        let seconds = items.next().ok_or_else(invalid)?;
        if items.next().is_some() {
            return Err(invalid());
        }
        (
            hours.parse::<u8>().map_err(|_| invalid())?,
            minutes.parse::<u8>().map_err(|_| invalid())?,
            seconds.parse::<f64>().map_err(|_| invalid())?,
        )
    };

    let (year, month, day) = match date[..] {
        [year, month, day] => (year, month, day),
        _ => return Err(invalid()),
    };

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    let day = day as f64 + hours as f64 / 24.0 + minutes as f64 / 1440.0 + seconds / 86400.0;
    Ok(mjd_from_calendar(2000 + year as i32, month, day))
}
