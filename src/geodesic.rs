//! Surface distance between two coordinates.
//!
//! Uses Vincenty's inverse formula on the WGS-84 ellipsoid. The iteration
//! does not converge for nearly antipodal points; [`surface_distance_m`]
//! then falls back to the spherical haversine distance, which is off by at
//! most a few tenths of a percent at that range.

use tracing::debug;

use crate::error::GeodesicError;

/// WGS-84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Mean earth radius in meters, for the spherical fallback.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Distance in meters between two (lat, lng) points in degrees.
///
/// Never fails: when the ellipsoidal solution does not converge the
/// haversine distance is returned instead.
pub fn surface_distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    match vincenty_distance_m(from, to) {
        Ok(meters) => meters,
        Err(err) => {
            debug!(?from, ?to, %err, "falling back to haversine distance");
            haversine_distance_m(from, to)
        }
    }
}

/// Ellipsoidal distance in meters, or an error for inputs the iteration
/// cannot resolve.
pub fn vincenty_distance_m(from: (f64, f64), to: (f64, f64)) -> Result<f64, GeodesicError> {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let l = (lng2 - lng1).to_radians();
    if lat1 == lat2 && l.sin().abs() < f64::EPSILON && l.cos() > 0.0 {
        return Ok(0.0);
    }

    let b = (1.0 - WGS84_F) * WGS84_A;

    let tan_u1 = (1.0 - WGS84_F) * lat1.to_radians().tan();
    let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
    let sin_u1 = tan_u1 * cos_u1;
    let tan_u2 = (1.0 - WGS84_F) * lat2.to_radians().tan();
    let cos_u2 = 1.0 / (1.0 + tan_u2 * tan_u2).sqrt();
    let sin_u2 = tan_u2 * cos_u2;

    let mut lambda = l;
    let mut iterations = 0;

    let (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2sigma_m) = loop {
        if iterations >= MAX_ITERATIONS {
            return Err(GeodesicError::NotConverged(iterations));
        }
        iterations += 1;

        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sq_sigma = (cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2);
        if sin_sq_sigma < 1e-24 {
            // coincident points were handled above
            return Err(GeodesicError::Degenerate);
        }

        let sin_sigma = sin_sq_sigma.sqrt();
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // equatorial line: cos_sq_alpha = 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if lambda.abs() > std::f64::consts::PI {
            return Err(GeodesicError::NotConverged(iterations));
        }
        if (lambda - previous).abs() <= CONVERGENCE {
            break (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2sigma_m);
        }
    };

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - b * b) / (b * b);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    Ok(b * big_a * (sigma - delta_sigma))
}

/// Great-circle distance in meters on a sphere of mean earth radius.
pub fn haversine_distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}
