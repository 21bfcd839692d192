// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_to_lmn() {
    let radec = RADec::from_degrees(62.0, -27.5);
    let phase_centre = RADec::from_degrees(60.0, -27.0);
    let lmn = radec.to_lmn(phase_centre);
    assert_abs_diff_eq!(lmn.l, 0.03095623164758603, epsilon = 1e-10);
    assert_abs_diff_eq!(lmn.m, -0.008971846102111436, epsilon = 1e-10);
    assert_abs_diff_eq!(lmn.n, 0.9994804738961642, epsilon = 1e-10);
}

#[test]
fn test_phase_centre_is_origin() {
    let pc = RADec::from_degrees(10.0, -45.0);
    let lmn = pc.to_lmn(pc);
    assert_abs_diff_eq!(lmn.l, 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(lmn.m, 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(lmn.n, 1.0, epsilon = 1e-15);
}

#[test]
fn test_lmn_from_lm() {
    let lmn = LMN::from_lm(0.6, 0.0).unwrap();
    assert_abs_diff_eq!(lmn.n, 0.8, epsilon = 1e-15);
    assert!(LMN::from_lm(0.8, 0.6).is_none());
}

#[test]
fn test_uvw_at_zenith() {
    // Pointing straight up with a zero hour angle: u is east, v is north and
    // w is "up".
    let latitude = (-26.7_f64).to_radians();
    let xyz = XyzGeodetic::from_enh(10.0, 20.0, 0.0, latitude);
    let uvw = xyz.to_uvw(HADec {
        ha: 0.0,
        dec: latitude,
    });
    assert_abs_diff_eq!(uvw.u, 10.0, epsilon = 1e-10);
    assert_abs_diff_eq!(uvw.v, 20.0, epsilon = 1e-10);
    assert_abs_diff_eq!(uvw.w, 0.0, epsilon = 1e-10);
}

#[test]
fn test_cross_uvws_are_ordered() {
    let xyzs = [
        XyzGeodetic::default(),
        XyzGeodetic {
            x: 0.0,
            y: 1.0,
            z: 0.0,
        },
        XyzGeodetic {
            x: 0.0,
            y: 3.0,
            z: 0.0,
        },
    ];
    let uvws = xyzs_to_cross_uvws(&xyzs, HADec { ha: 0.0, dec: 0.0 });
    assert_eq!(uvws.len(), 3);
    assert_abs_diff_eq!(uvws[0].u, -1.0);
    assert_abs_diff_eq!(uvws[1].u, -3.0);
    assert_abs_diff_eq!(uvws[2].u, -2.0);
}
