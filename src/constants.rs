/// Speed of light in km.s⁻¹
pub const SPEED_OF_LIGHT_KM_S: f64 = 299792.458;

/// Earth equatorial radius (kilometers), WGS84
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;

/// Earth flattening used by the observer model
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257;

/// Offset between Julian date and Modified Julian date
pub const MJD_JD_OFFSET: f64 = 2400000.5;

/// J2000 reference epoch (2000-01-01T12:00:00), in MJD
pub const J2000_MJD: f64 = 51544.5;

/// Days per Julian century
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Minutes per day
pub const MINUTES_PER_DAY: f64 = 1440.0;
