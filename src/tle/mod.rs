//! Two line element sets
use crate::{
    error::{Error, ParsingError},
    orbit::Orbit,
};

pub mod alpha5;

mod catalog;
pub use catalog::TleCatalog;

/// Element lines are 69 characters long, checksum included
pub const LINE_LENGTH: usize = 69;

/// Modulo 10 checksum of an element line: sum of all digits,
/// each minus sign counting as 1. The checksum character itself
/// (69th character) is not accounted for.
pub fn checksum(line: &str) -> u8 {
    let sum = line
        .bytes()
        .take(LINE_LENGTH - 1)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>();

    (sum % 10) as u8
}

/// Drag term field: sign, 5 digit mantissa with implied leading decimal point,
/// exponent sign and digit. The field stores `bstar`.
fn format_bstar(bstar: f64) -> String {
    if bstar.abs() <= 1.0E-9 {
        return " 00000-0".to_string();
    }

    // d.dddd e x, shifted by one decade to get the implied decimal point
    let formatted = format!("{:.4e}", (10.0 * bstar).abs());
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let mantissa = mantissa.replace('.', "");
    let exponent = exponent.parse::<i32>().unwrap_or(0);

    format!(
        "{}{}{}{}",
        if bstar < 0.0 { '-' } else { ' ' },
        mantissa,
        if exponent < 0 { '-' } else { '+' },
        exponent.abs().min(9),
    )
}

fn parse_bstar(field: &str) -> Result<f64, ParsingError> {
    let invalid = || ParsingError::InvalidField {
        field: "drag term",
        content: field.to_string(),
    };

    let content = field.trim();
    if content.is_empty() {
        return Ok(0.0);
    }

    if !content.is_ascii() {
        return Err(invalid());
    }

    let (sign, content) = match content.as_bytes()[0] {
        b'-' => (-1.0, &content[1..]),
        b'+' => (1.0, &content[1..]),
        _ => (1.0, content),
    };

    if content.len() < 3 {
        return Err(invalid());
    }

    let (mantissa, exponent) = content.split_at(content.len() - 2);
    let mantissa = format!("0.{}", mantissa)
        .parse::<f64>()
        .map_err(|_| invalid())?;
    let exponent = exponent.parse::<i32>().map_err(|_| invalid())?;

    Ok(sign * mantissa * 10.0_f64.powi(exponent))
}

/// Encodes [Orbit] as two element lines, checksums included.
pub fn encode(orbit: &Orbit) -> Result<(String, String), Error> {
    let number = alpha5::encode(orbit.catalog_number)?;
    let designator = orbit.designator.chars().take(8).collect::<String>();

    let mut line1 = format!(
        "1 {}U {:<8} {:02}{:012.8}  .00000000  00000-0 {} 0    0",
        number,
        designator,
        orbit.epoch_year.rem_euclid(100),
        orbit.epoch_day,
        format_bstar(orbit.bstar),
    );

    let mut line2 = format!(
        "2 {} {:8.4} {:8.4} {:07.0} {:8.4} {:8.4} {:11.8}    0",
        number,
        orbit.inclination_deg,
        orbit.right_ascension_deg,
        (orbit.eccentricity * 1.0E7).clamp(0.0, 9_999_999.0),
        orbit.argument_of_perigee_deg,
        orbit.mean_anomaly_deg,
        orbit.mean_motion,
    );

    line1.push((b'0' + checksum(&line1)) as char);
    line2.push((b'0' + checksum(&line2)) as char);

    Ok((line1, line2))
}

fn field<'a>(line: &'a str, start: usize, end: usize) -> Result<&'a str, ParsingError> {
    line.get(start..end)
        .ok_or(ParsingError::LineTooShort(line.len()))
}

fn parse_field(
    line: &str,
    start: usize,
    end: usize,
    name: &'static str,
) -> Result<f64, ParsingError> {
    let content = field(line, start, end)?;
    content
        .trim()
        .parse::<f64>()
        .map_err(|_| ParsingError::InvalidField {
            field: name,
            content: content.to_string(),
        })
}

fn verify_line(line: &str, number: u8) -> Result<(), ParsingError> {
    if line.len() < LINE_LENGTH {
        return Err(ParsingError::LineTooShort(line.len()));
    }

    if line.as_bytes()[0] != b'0' + number {
        return Err(ParsingError::LineNumber(number));
    }

    let found = line.as_bytes()[LINE_LENGTH - 1];
    if !found.is_ascii_digit() {
        return Err(ParsingError::InvalidField {
            field: "checksum",
            content: (found as char).to_string(),
        });
    }

    let expected = checksum(line);
    let found = found - b'0';
    if expected != found {
        return Err(ParsingError::Checksum { expected, found });
    }

    Ok(())
}

/// Decodes an element set. Trailing whitespace is tolerated.
pub fn decode(name: Option<&str>, line1: &str, line2: &str) -> Result<Orbit, ParsingError> {
    let (line1, line2) = (line1.trim_end(), line2.trim_end());

    verify_line(line1, 1)?;
    verify_line(line2, 2)?;

    let catalog_number = alpha5::decode(field(line1, 2, 7)?)?;
    if alpha5::decode(field(line2, 2, 7)?)? != catalog_number {
        return Err(ParsingError::CatalogNumberMismatch);
    }

    let designator = field(line1, 9, 17)?.trim().to_string();

    let year = field(line1, 18, 20)?;
    let year = year
        .trim()
        .parse::<i32>()
        .map_err(|_| ParsingError::InvalidField {
            field: "epoch year",
            content: year.to_string(),
        })?;
    let epoch_year = if year < 57 { 2000 + year } else { 1900 + year };

    let epoch_day = parse_field(line1, 20, 32, "epoch day")?;
    let bstar = parse_bstar(field(line1, 53, 61)?)?;

    let eccentricity = field(line2, 26, 33)?;
    let eccentricity = format!("0.{}", eccentricity.trim())
        .parse::<f64>()
        .map_err(|_| ParsingError::InvalidField {
            field: "eccentricity",
            content: eccentricity.to_string(),
        })?;

    Ok(Orbit {
        catalog_number,
        designator,
        name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        epoch_year,
        epoch_day,
        inclination_deg: parse_field(line2, 8, 16, "inclination")?,
        right_ascension_deg: parse_field(line2, 17, 25, "right ascension")?,
        eccentricity,
        argument_of_perigee_deg: parse_field(line2, 34, 42, "argument of perigee")?,
        mean_anomaly_deg: parse_field(line2, 43, 51, "mean anomaly")?,
        mean_motion: parse_field(line2, 52, 63, "mean motion")?,
        bstar,
    })
}
