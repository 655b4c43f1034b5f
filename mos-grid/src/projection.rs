use serde::Deserialize;

/// Native coordinate system of a model grid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Regular latitude/longitude grid: x = longitude, y = latitude (degrees).
    LatLon,
    /// Rotated latitude/longitude grid (COSMO convention), axes in rotated degrees.
    RotatedPole {
        /// Geographic latitude of the rotated north pole.
        pole_latitude: f64,
        /// Geographic longitude of the rotated north pole.
        pole_longitude: f64,
    },
    /// Spherical Mercator, axes in metres.
    Mercator {
        #[serde(default = "default_earth_radius")]
        earth_radius: f64,
    },
}

fn default_earth_radius() -> f64 {
    6_371_000.0
}

impl Projection {
    /// Project a geographic (latitude, longitude) pair, in degrees, into (x, y).
    pub fn project(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        match self {
            Projection::LatLon => (longitude, latitude),
            Projection::RotatedPole {
                pole_latitude,
                pole_longitude,
            } => rotate(latitude, longitude, *pole_latitude, *pole_longitude),
            Projection::Mercator { earth_radius } => {
                let x = earth_radius * longitude.to_radians();
                let y = earth_radius
                    * (std::f64::consts::FRAC_PI_4 + latitude.to_radians() / 2.0)
                        .tan()
                        .ln();
                (x, y)
            }
        }
    }
}

/// Geographic to rotated-pole coordinates; returns (rotated lon, rotated lat).
fn rotate(latitude: f64, longitude: f64, pole_latitude: f64, pole_longitude: f64) -> (f64, f64) {
    let sin_pole = pole_latitude.to_radians().sin();
    let cos_pole = pole_latitude.to_radians().cos();
    let lon = if longitude > 180.0 {
        longitude - 360.0
    } else {
        longitude
    };
    let phi = latitude.to_radians();
    let dlam = lon.to_radians() - pole_longitude.to_radians();

    let rotated_lat = (cos_pole * phi.cos() * dlam.cos() + sin_pole * phi.sin())
        .clamp(-1.0, 1.0)
        .asin();
    let num = -dlam.sin() * phi.cos();
    let den = -sin_pole * phi.cos() * dlam.cos() + cos_pole * phi.sin();
    let rotated_lon = num.atan2(den);

    (rotated_lon.to_degrees(), rotated_lat.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::Projection;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_lat_lon_is_identity_with_swapped_axes() {
        assert!(close(Projection::LatLon.project(44.5, 11.3), (11.3, 44.5)));
    }

    #[test]
    fn test_unrotated_pole_is_identity() {
        let projection = Projection::RotatedPole {
            pole_latitude: 90.0,
            pole_longitude: -180.0,
        };
        assert!(close(projection.project(44.5, 11.3), (11.3, 44.5)));
    }

    #[test]
    fn test_rotated_origin() {
        // The rotated (0, 0) point sits 90 - pole_latitude north of the
        // equator, opposite the pole longitude.
        let projection = Projection::RotatedPole {
            pole_latitude: 47.0,
            pole_longitude: -168.0,
        };
        let (x, y) = projection.project(43.0, 12.0);
        assert!(x.abs() < 1e-9, "x = {}", x);
        assert!(y.abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn test_mercator_equator_and_meridian() {
        let projection = Projection::Mercator {
            earth_radius: 6_371_000.0,
        };
        let (x, y) = projection.project(0.0, 0.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        let (x, _) = projection.project(0.0, 180.0);
        assert!((x - 6_371_000.0 * std::f64::consts::PI).abs() < 1e-3);
        let (_, north) = projection.project(45.0, 0.0);
        let (_, south) = projection.project(-45.0, 0.0);
        assert!((north + south).abs() < 1e-6);
    }

    #[test]
    fn test_deserialize_projection() {
        let p: Projection =
            serde_json::from_str(r#"{"kind": "rotated_pole", "pole_latitude": 47.0, "pole_longitude": -168.0}"#)
                .unwrap();
        assert_eq!(
            p,
            Projection::RotatedPole {
                pole_latitude: 47.0,
                pole_longitude: -168.0
            }
        );
        let m: Projection = serde_json::from_str(r#"{"kind": "mercator"}"#).unwrap();
        assert_eq!(m, Projection::Mercator { earth_radius: 6_371_000.0 });
    }
}
