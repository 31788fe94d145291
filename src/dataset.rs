//! Measurement set and selection tools
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use hifitime::Duration;
use itertools::{Itertools, MinMaxResult};
use log::{debug, info};

use crate::{
    cfg::DatasetOpts,
    error::Error,
    observation::{Observation, Selection},
    site::SiteCatalog,
    time::format_timestamp,
};

/// Width of the [Dataset::diagonal_select] band (kHz, either side)
const DIAGONAL_HALF_WIDTH_KHZ: f64 = 3.0;

/// Rectangular area, in centered units: days relative to the reference epoch
/// and kHz relative to the reference frequency. See [Dataset::centered].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Window {
    pub t_min: f64,
    pub t_max: f64,
    pub f_min: f64,
    pub f_max: f64,
}

impl Window {
    /// Builds a [Window] from two opposite corners, in any order.
    pub fn new(t0: f64, f0: f64, t1: f64, f1: f64) -> Self {
        Self {
            t_min: t0.min(t1),
            t_max: t0.max(t1),
            f_min: f0.min(f1),
            f_max: f0.max(f1),
        }
    }

    /// Strict inclusion
    pub fn contains(&self, t: f64, f: f64) -> bool {
        t > self.t_min && t < self.t_max && f > self.f_min && f < self.f_max
    }

    fn width(&self) -> f64 {
        self.t_max - self.t_min
    }

    fn height(&self) -> f64 {
        self.f_max - self.f_min
    }
}

/// Ordered set of [Observation]s.
///
/// The reference epoch and frequency are fixed when the [Dataset] is built
/// and only serve to center values. The working frequency is the current
/// transmitted frequency estimate.
#[derive(Debug, Clone)]
pub struct Dataset {
    points: Vec<Observation>,
    mjd_min: f64,
    mjd_max: f64,
    frequency_min_khz: f64,
    frequency_max_khz: f64,
    reference_mjd: f64,
    reference_frequency_khz: f64,
    frequency_khz: f64,
}

fn bounds<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    match values.minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => (0.0, 0.0),
        MinMaxResult::OneElement(x) => (x, x),
        MinMaxResult::MinMax(min, max) => (min, max),
    }
}

impl Dataset {
    /// Builds a [Dataset] from [Observation]s, in this order.
    pub fn new(points: Vec<Observation>) -> Result<Self, Error> {
        if points.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let (mjd_min, mjd_max) = bounds(points.iter().map(|p| p.mjd));
        let (frequency_min_khz, frequency_max_khz) =
            bounds(points.iter().map(|p| p.frequency_khz));

        let reference_mjd = (0.5 * (mjd_min + mjd_max)).floor();
        let reference_frequency_khz = (0.5 * (frequency_min_khz + frequency_max_khz)).floor();

        Ok(Self {
            points,
            mjd_min,
            mjd_max,
            frequency_min_khz,
            frequency_max_khz,
            reference_mjd,
            reference_frequency_khz,
            frequency_khz: reference_frequency_khz,
        })
    }

    /// Overrides the reference frequency (kHz), which also becomes the
    /// working frequency.
    pub fn with_reference_frequency(&self, frequency_khz: f64) -> Self {
        let mut s = self.clone();
        s.reference_frequency_khz = frequency_khz;
        s.frequency_khz = frequency_khz;
        s
    }

    /// Loads a measurement file, one [Observation] per line
    /// (see [Observation::parse]). Blank lines are ignored.
    /// The first malformed line aborts the load.
    pub fn from_reader<R: BufRead, S: SiteCatalog>(
        reader: R,
        sites: &S,
        opts: &DatasetOpts,
    ) -> Result<Self, Error> {
        let offset_khz = opts.frequency_offset_hz / 1000.0;
        let mut points = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let mut point = Observation::parse(&line, sites).map_err(|error| Error::Parsing {
                line: index + 1,
                error,
            })?;

            point.frequency_khz += offset_khz;
            points.push(point);
        }

        let mut dataset = Self::new(points)?;

        if let Some(frequency_khz) = opts.reference_frequency_khz {
            dataset = dataset.with_reference_frequency(frequency_khz);
        }

        info!(
            "loaded {} measurements from {} site(s): {} - {} ({:.3} kHz)",
            dataset.len(),
            dataset.sites().len(),
            format_timestamp(dataset.mjd_min),
            format_timestamp(dataset.mjd_max),
            dataset.reference_frequency_khz,
        );

        Ok(dataset)
    }

    /// Loads a measurement file, see [Dataset::from_reader].
    pub fn from_file<P: AsRef<Path>, S: SiteCatalog>(
        path: P,
        sites: &S,
        opts: &DatasetOpts,
    ) -> Result<Self, Error> {
        let fd = File::open(path)?;
        Self::from_reader(BufReader::new(fd), sites, opts)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All [Observation]s, in load order
    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Observation] {
        &mut self.points
    }

    /// (earliest, latest) epoch (MJD)
    pub fn mjd_range(&self) -> (f64, f64) {
        (self.mjd_min, self.mjd_max)
    }

    /// (lowest, highest) measured frequency (kHz)
    pub fn frequency_range_khz(&self) -> (f64, f64) {
        (self.frequency_min_khz, self.frequency_max_khz)
    }

    /// Observation time span
    pub fn time_span(&self) -> Duration {
        Duration::from_days(self.mjd_max - self.mjd_min)
    }

    /// Reference epoch (integer MJD)
    pub fn reference_mjd(&self) -> f64 {
        self.reference_mjd
    }

    /// Reference frequency (kHz)
    pub fn reference_frequency_khz(&self) -> f64 {
        self.reference_frequency_khz
    }

    /// Working transmitted frequency (kHz)
    pub fn frequency_khz(&self) -> f64 {
        self.frequency_khz
    }

    /// Sets the working transmitted frequency (kHz)
    pub fn set_frequency(&mut self, frequency_khz: f64) {
        self.frequency_khz = frequency_khz;
    }

    /// Returns (days, kHz) of this [Observation] relative to the
    /// reference epoch and frequency.
    pub fn centered(&self, point: &Observation) -> (f64, f64) {
        (
            point.mjd - self.reference_mjd,
            point.frequency_khz - self.reference_frequency_khz,
        )
    }

    /// Highlighted [Observation]s
    pub fn highlighted(&self) -> impl Iterator<Item = &Observation> + '_ {
        self.points.iter().filter(|p| p.is_highlighted())
    }

    pub fn highlighted_count(&self) -> usize {
        self.highlighted().count()
    }

    /// (earliest, latest) highlighted epoch
    pub fn highlighted_mjd_range(&self) -> Option<(f64, f64)> {
        match self.highlighted().map(|p| p.mjd).minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(x) => Some((x, x)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    /// Mean epoch of the highlighted points, or the dataset midpoint
    /// when nothing is highlighted.
    pub fn mean_highlighted_mjd(&self) -> f64 {
        let (count, sum) = self
            .highlighted()
            .fold((0, 0.0), |(count, sum), p| (count + 1, sum + p.mjd));

        if count == 0 {
            0.5 * (self.mjd_min + self.mjd_max)
        } else {
            sum / count as f64
        }
    }

    /// Distinct receiving site ids, in order of appearance
    pub fn sites(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.site.id).unique().collect()
    }

    /// Applies `selection` to every non deleted point inside [Window].
    pub fn highlight(&mut self, window: &Window, selection: Selection) {
        let (mjd0, f0) = (self.reference_mjd, self.reference_frequency_khz);
        for p in self.points.iter_mut() {
            if !p.is_deleted() && window.contains(p.mjd - mjd0, p.frequency_khz - f0) {
                p.selection = selection;
            }
        }
    }

    /// Deletes every point inside [Window], unless highlighted.
    pub fn deselect_inside(&mut self, window: &Window) {
        let (mjd0, f0) = (self.reference_mjd, self.reference_frequency_khz);
        for p in self.points.iter_mut() {
            if !p.is_highlighted() && window.contains(p.mjd - mjd0, p.frequency_khz - f0) {
                p.selection = Selection::Deleted;
            }
        }
    }

    /// Deletes every point outside [Window].
    pub fn deselect_outside(&mut self, window: &Window) {
        let (mjd0, f0) = (self.reference_mjd, self.reference_frequency_khz);
        for p in self.points.iter_mut() {
            let (t, f) = (p.mjd - mjd0, p.frequency_khz - f0);
            if t < window.t_min || t > window.t_max || f < window.f_min || f > window.f_max {
                p.selection = Selection::Deleted;
            }
        }
    }

    /// Deletes the non deleted point closest to (t, f), distances being
    /// normalized by the [Window] dimensions.
    pub fn deselect_nearest(&mut self, t: f64, f: f64, window: &Window) {
        let (mjd0, f0) = (self.reference_mjd, self.reference_frequency_khz);
        let (width, height) = (window.width(), window.height());

        let nearest = self
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_deleted())
            .map(|(i, p)| {
                let dt = (t - (p.mjd - mjd0)) / width;
                let df = (f - (p.frequency_khz - f0)) / height;
                (i, (dt * dt + df * df).sqrt())
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        if let Some((i, _)) = nearest {
            debug!("deleting {}", self.points[i].timestamp());
            self.points[i].selection = Selection::Deleted;
        }
    }

    /// Applies `selection` to non deleted points within a ±3 kHz band
    /// along the (t0, f0) - (t1, f1) segment, ends excluded.
    pub fn diagonal_select(&mut self, t0: f64, f0: f64, t1: f64, f1: f64, selection: Selection) {
        let (mjd_ref, f_ref) = (self.reference_mjd, self.reference_frequency_khz);
        for p in self.points.iter_mut() {
            let (t, f) = (p.mjd - mjd_ref, p.frequency_khz - f_ref);
            let v = (t - t0) / (t1 - t0);
            let center = f0 + v * (f1 - f0);
            if v > 0.0
                && v < 1.0
                && f > center - DIAGONAL_HALF_WIDTH_KHZ
                && f < center + DIAGONAL_HALF_WIDTH_KHZ
                && !p.is_deleted()
            {
                p.selection = selection;
            }
        }
    }

    /// Highlights every point received at site `id`.
    pub fn select_site(&mut self, id: i32) {
        for p in self.points.iter_mut() {
            if p.site.id == id {
                p.selection = Selection::Highlighted;
            }
        }
    }

    /// Swaps highlighted and unselected points.
    pub fn invert_selection(&mut self) {
        for p in self.points.iter_mut() {
            p.selection = match p.selection {
                Selection::Highlighted => Selection::Unselected,
                Selection::Unselected => Selection::Highlighted,
                Selection::Deleted => Selection::Deleted,
            };
        }
    }

    /// Deletes highlighted points.
    pub fn delete_highlighted(&mut self) {
        for p in self.points.iter_mut() {
            if p.is_highlighted() {
                p.selection = Selection::Deleted;
            }
        }
    }

    /// Highlighted points become unselected.
    pub fn clear_highlights(&mut self) {
        for p in self.points.iter_mut() {
            if p.is_highlighted() {
                p.selection = Selection::Unselected;
            }
        }
    }

    /// Every point, deleted ones included, becomes unselected.
    pub fn restore_all(&mut self) {
        for p in self.points.iter_mut() {
            p.selection = Selection::Unselected;
        }
    }

    /// Shifts highlighted measurements by `offset_khz`.
    pub fn move_highlighted(&mut self, offset_khz: f64) {
        for p in self.points.iter_mut() {
            if p.is_highlighted() {
                p.frequency_khz += offset_khz;
            }
        }
    }

    /// Mirrors every measurement about the reference frequency.
    pub fn mirror(&mut self) {
        let f0 = self.reference_frequency_khz;
        for p in self.points.iter_mut() {
            p.frequency_khz = 2.0 * f0 - p.frequency_khz;
        }
    }
}
