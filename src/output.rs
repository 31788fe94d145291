//! Output files
use std::io::Write;

use crate::{
    dataset::{Dataset, Window},
    error::Error,
    identification::{SearchGrid, SearchSample},
    orbit::Orbit,
    time::calendar_from_mjd,
    tle,
};

/// `YYYYMMDD.dd` compact date
fn compact_date(mjd: f64) -> String {
    let (year, month, day) = calendar_from_mjd(mjd);
    format!("{:4}{:02}{:05.2}", year, month, day)
}

/// Writes [Orbit] as an element set: optional name line, both element lines,
/// then a comment line summarizing the fitted measurements
/// (highlighted time span, point count and RMS).
pub fn write_tle<W: Write>(
    w: &mut W,
    orbit: &Orbit,
    dataset: &Dataset,
    rms_khz: f64,
) -> Result<(), Error> {
    let (mjd_min, mjd_max) = dataset
        .highlighted_mjd_range()
        .ok_or(Error::NoHighlightedPoints)?;

    let (line1, line2) = tle::encode(orbit)?;

    if let Some(name) = &orbit.name {
        writeln!(w, "{}", name)?;
    }

    writeln!(w, "{}", line1)?;
    writeln!(w, "{}", line2)?;
    writeln!(
        w,
        "# {}-{}, {} measurements, {:.3} kHz rms",
        compact_date(mjd_min),
        compact_date(mjd_max),
        dataset.highlighted_count(),
        rms_khz,
    )?;

    Ok(())
}

/// Writes the highlighted points lying strictly inside [Window]
/// using the measurement file layout (frequency in Hz), so the selection
/// can be loaded again.
pub fn write_selection<W: Write>(
    w: &mut W,
    dataset: &Dataset,
    window: &Window,
) -> Result<usize, Error> {
    let mut count = 0;

    for point in dataset.highlighted() {
        let (t, f) = dataset.centered(point);
        if !window.contains(t, f) {
            continue;
        }

        write!(
            w,
            "{:.6}\t{:14.3}\t{:8.3}\t{:04}",
            point.mjd(),
            point.frequency_khz() * 1000.0,
            point.flux,
            point.site.id
        )?;

        if let Some(remote) = &point.remote {
            write!(w, "\t{:04}", remote.id)?;
        }

        writeln!(w)?;
        count += 1;
    }

    Ok(count)
}

/// Writes `mjd frequency residual site` rows (kHz) for every point
/// carrying a residual, see [crate::residual::compute_rms].
pub fn write_residuals<W: Write>(w: &mut W, dataset: &Dataset) -> Result<usize, Error> {
    let mut count = 0;

    for point in dataset.points() {
        if let Some(residual) = point.residual_khz {
            writeln!(
                w,
                "{:14.8} {:.6} {:.6} {}",
                point.mjd(),
                point.frequency_khz(),
                residual,
                point.site.id
            )?;
            count += 1;
        }
    }

    Ok(count)
}

/// Appends a `catalog_number frequency` record (MHz) of the working
/// frequency to a frequency log.
pub fn write_frequency_log<W: Write>(
    w: &mut W,
    orbit: &Orbit,
    dataset: &Dataset,
) -> Result<(), Error> {
    writeln!(
        w,
        "{:05} {:.6}",
        orbit.catalog_number,
        dataset.frequency_khz() / 1000.0
    )?;
    Ok(())
}

/// Writes `mean_anomaly node rms` rows of a [SearchGrid],
/// one blank line separating mean anomaly blocks.
pub fn write_search<W: Write>(
    w: &mut W,
    grid: &SearchGrid,
    samples: &[SearchSample],
) -> Result<(), Error> {
    let block = grid.right_ascension.steps.max(1);

    for chunk in samples.chunks(block) {
        for sample in chunk {
            writeln!(
                w,
                "{:8.4} {:8.4} {:.6}",
                sample.mean_anomaly_deg, sample.right_ascension_deg, sample.rms_khz
            )?;
        }
        writeln!(w)?;
    }

    Ok(())
}
