//! Alpha-5 catalog numbers: 5 character catalog fields where a leading
//! letter extends the numbering above 99999 (`A0000` = 100000, ..., `Z9999` = 339999).
//! Letters I and O are not used.
use crate::error::{Error, ParsingError};

/// Leading letters, for values 10 to 33
const LETTERS: [u8; 24] = *b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Largest catalog number that can be represented
pub const MAX_CATALOG_NUMBER: u32 = 339_999;

/// Encodes a catalog number into its 5 character field.
pub fn encode(number: u32) -> Result<String, Error> {
    if number < 100_000 {
        return Ok(format!("{:05}", number));
    }

    if number > MAX_CATALOG_NUMBER {
        return Err(Error::CatalogNumberOverflow(number));
    }

    let letter = LETTERS[(number / 10_000 - 10) as usize] as char;
    Ok(format!("{}{:04}", letter, number % 10_000))
}

/// Decodes a 5 character catalog field. Leading blanks are tolerated.
pub fn decode(field: &str) -> Result<u32, ParsingError> {
    let invalid = || ParsingError::CatalogNumber(field.to_string());
    let content = field.trim();

    let first = *content.as_bytes().first().ok_or_else(invalid)?;

    if first.is_ascii_digit() {
        if !content.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        return content.parse::<u32>().map_err(|_| invalid());
    }

    let index = LETTERS
        .iter()
        .position(|l| *l == first.to_ascii_uppercase())
        .ok_or_else(invalid)?;

    let rest = &content[1..];
    if rest.len() != 4 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let rest = rest.parse::<u32>().map_err(|_| invalid())?;
    Ok((index as u32 + 10) * 10_000 + rest)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, "00005")]
    #[case(25544, "25544")]
    #[case(99999, "99999")]
    #[case(100000, "A0000")]
    #[case(179999, "H9999")]
    #[case(180000, "J0000")]
    #[case(230000, "P0000")]
    #[case(339999, "Z9999")]
    fn alpha5(#[case] number: u32, #[case] field: &str) {
        assert_eq!(encode(number).unwrap(), field);
        assert_eq!(decode(field).unwrap(), number);
    }

    #[test]
    fn overflow() {
        assert!(matches!(
            encode(340000),
            Err(Error::CatalogNumberOverflow(340000))
        ));
    }

    #[test]
    fn invalid_fields() {
        for field in ["", "I0000", "O1234", "A12", "12a45", "-1234"] {
            assert!(decode(field).is_err(), "{}", field);
        }
        // blank padded legacy fields
        assert_eq!(decode("  123").unwrap(), 123);
    }
}
