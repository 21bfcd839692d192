// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coordinate types.
//!
//! These coordinate systems are discussed at length in Interferometry and
//! Synthesis in Radio Astronomy, Third Edition, Section 4: Geometrical
//! Relationships, Polarimetry, and the Measurement Equation.

#[cfg(test)]
mod tests;

use std::ops::{Add, Div, Mul, Neg, Sub};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A struct containing a Right Ascension and Declination. All units are in
/// radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RADec {
    /// Right ascension \[radians\]
    pub ra: f64,
    /// Declination \[radians\]
    pub dec: f64,
}

impl RADec {
    pub fn new(ra: f64, dec: f64) -> RADec {
        RADec { ra, dec }
    }

    pub fn from_degrees(ra: f64, dec: f64) -> RADec {
        RADec {
            ra: ra.to_radians(),
            dec: dec.to_radians(),
        }
    }

    /// Get the (l,m,n) direction cosines of these coordinates relative to a
    /// phase centre.
    ///
    /// Derived using "Coordinate transformations" on page 388 of Synthesis
    /// Imaging in Radio Astronomy II.
    pub fn to_lmn(self, phase_centre: RADec) -> LMN {
        let d_ra = self.ra - phase_centre.ra;
        let (s_d_ra, c_d_ra) = d_ra.sin_cos();
        let (s_dec, c_dec) = self.dec.sin_cos();
        let (pc_s_dec, pc_c_dec) = phase_centre.dec.sin_cos();
        LMN {
            l: c_dec * s_d_ra,
            m: s_dec * pc_c_dec - c_dec * pc_s_dec * c_d_ra,
            n: s_dec * pc_s_dec + c_dec * pc_c_dec * c_d_ra,
        }
    }

    /// Get the hour angle and declination of these coordinates, given a local
    /// sidereal time \[radians\].
    pub fn to_hadec(self, lst_rad: f64) -> HADec {
        HADec {
            ha: lst_rad - self.ra,
            dec: self.dec,
        }
    }
}

impl std::fmt::Display for RADec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.4}°, {:.4}°)",
            self.ra.to_degrees(),
            self.dec.to_degrees()
        )
    }
}

/// A struct containing an Hour Angle and Declination. All units are in
/// radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HADec {
    /// Hour angle \[radians\]
    pub ha: f64,
    /// Declination \[radians\]
    pub dec: f64,
}

/// The (l,m,n) direction-cosine coordinates of a point. All units are in
/// radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LMN {
    /// l-coordinate \[radians\]
    pub l: f64,
    /// m-coordinate \[radians\]
    pub m: f64,
    /// n-coordinate \[radians\]
    pub n: f64,
}

impl LMN {
    /// Get the n coordinate for the given (l,m) with the SIN projection.
    /// Returns `None` if (l,m) is not on the celestial sphere.
    pub fn from_lm(l: f64, m: f64) -> Option<LMN> {
        let r2 = l * l + m * m;
        if r2 >= 1.0 {
            None
        } else {
            Some(LMN {
                l,
                m,
                n: (1.0 - r2).sqrt(),
            })
        }
    }
}

/// The (u,v,w) coordinates of a baseline. All units are in metres; to get
/// units of wavelengths, multiply by the frequency and divide by the speed of
/// light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UVW {
    /// u-coordinate \[metres\]
    pub u: f64,
    /// v-coordinate \[metres\]
    pub v: f64,
    /// w-coordinate \[metres\]
    pub w: f64,
}

impl UVW {
    /// The baseline length in the (u,v) plane \[metres\].
    pub fn uv_length(self) -> f64 {
        self.u.hypot(self.v)
    }
}

impl Add for UVW {
    type Output = UVW;

    fn add(self, rhs: UVW) -> UVW {
        UVW {
            u: self.u + rhs.u,
            v: self.v + rhs.v,
            w: self.w + rhs.w,
        }
    }
}

impl Sub for UVW {
    type Output = UVW;

    fn sub(self, rhs: UVW) -> UVW {
        UVW {
            u: self.u - rhs.u,
            v: self.v - rhs.v,
            w: self.w - rhs.w,
        }
    }
}

impl Neg for UVW {
    type Output = UVW;

    fn neg(self) -> UVW {
        UVW {
            u: -self.u,
            v: -self.v,
            w: -self.w,
        }
    }
}

impl Mul<f64> for UVW {
    type Output = UVW;

    fn mul(self, rhs: f64) -> UVW {
        UVW {
            u: self.u * rhs,
            v: self.v * rhs,
            w: self.w * rhs,
        }
    }
}

impl Div<f64> for UVW {
    type Output = UVW;

    fn div(self, rhs: f64) -> UVW {
        UVW {
            u: self.u / rhs,
            v: self.v / rhs,
            w: self.w / rhs,
        }
    }
}

/// The (x,y,z) coordinates of an antenna (a.k.a. station), or a baseline. All
/// units are in metres. Z points north, X points through the equator from the
/// geocentre along the local meridian and Y is east.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XyzGeodetic {
    /// x-coordinate \[metres\]
    pub x: f64,
    /// y-coordinate \[metres\]
    pub y: f64,
    /// z-coordinate \[metres\]
    pub z: f64,
}

impl XyzGeodetic {
    /// Convert coordinates in local topocentric East, North, Height units to
    /// local XYZ units. Latitude is geodetic, in radians.
    pub fn from_enh(e: f64, n: f64, h: f64, latitude_rad: f64) -> XyzGeodetic {
        let (s_lat, c_lat) = latitude_rad.sin_cos();
        XyzGeodetic {
            x: -n * s_lat + h * c_lat,
            y: e,
            z: n * c_lat + h * s_lat,
        }
    }

    /// Convert a baseline to UVW, given the direction of the phase centre.
    ///
    /// This is Equation 4.1 of: Interferometry and Synthesis in Radio
    /// Astronomy, Third Edition, Section 4: Geometrical Relationships,
    /// Polarimetry, and the Measurement Equation.
    pub fn to_uvw(self, phase_centre: HADec) -> UVW {
        let (s_ha, c_ha) = phase_centre.ha.sin_cos();
        let (s_dec, c_dec) = phase_centre.dec.sin_cos();
        UVW {
            u: s_ha * self.x + c_ha * self.y,
            v: -s_dec * c_ha * self.x + s_dec * s_ha * self.y + c_dec * self.z,
            w: c_dec * c_ha * self.x - c_dec * s_ha * self.y + s_dec * self.z,
        }
    }
}

impl Sub for XyzGeodetic {
    type Output = XyzGeodetic;

    fn sub(self, rhs: XyzGeodetic) -> XyzGeodetic {
        XyzGeodetic {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// For each pair of antennas, calculate a UVW. Baselines are ordered (0,1),
/// (0,2), ..., (1,2), ..., and auto-correlations are not included.
pub fn xyzs_to_cross_uvws(xyzs: &[XyzGeodetic], phase_centre: HADec) -> Vec<UVW> {
    let num_tiles = xyzs.len();
    (0..num_tiles)
        .into_par_iter()
        .flat_map_iter(|i| {
            (i + 1..num_tiles).map(move |j| (xyzs[i] - xyzs[j]).to_uvw(phase_centre))
        })
        .collect()
}
