use serde::{Deserialize, Serialize};

/// One row of an uploaded member list, i.e. one person pinned on the map.
///
/// Coordinates are optional: a row may arrive with only a free-text `location`
/// and get its coordinates later from the geocoder. Once a member leaves the
/// pipeline, `coordinates()` is guaranteed to return `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMember {
    /// Synthetic, row-based identifier (`member-{row}`).
    pub id: String,
    /// Random identifier, stable for the lifetime of the saved map.
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

impl CommunityMember {
    /// Returns the member's coordinates when both are present and usable.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude?, self.longitude?)
    }

    /// Returns the trimmed free-text location, if there is one.
    pub fn location_query(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Builds a pair if it is finite and in range.
    ///
    /// The exact `(0, 0)` pair is rejected: spreadsheets and geocoders emit it
    /// for "unknown", and no member list is expected to pin someone there.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        let null_island = latitude == 0.0 && longitude == 0.0;

        (in_range && !null_island).then_some(Self {
            latitude,
            longitude,
        })
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(lat: Option<f64>, lng: Option<f64>) -> CommunityMember {
        CommunityMember {
            id: "member-0".into(),
            uid: "u".into(),
            name: "Ada".into(),
            location: Some("  London ".into()),
            latitude: lat,
            longitude: lng,
            image: None,
            title: None,
            website: None,
            linkedin: None,
        }
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(Coordinates::new(91.0, 0.5).is_none());
        assert!(Coordinates::new(10.0, 200.0).is_none());
        assert!(Coordinates::new(f64::NAN, 1.0).is_none());
        assert!(Coordinates::new(1.0, f64::INFINITY).is_none());
    }

    #[test]
    fn null_island_is_absent_but_single_zero_axis_is_not() {
        assert!(Coordinates::new(0.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, 32.5).is_some());
        assert!(Coordinates::new(51.48, 0.0).is_some());
    }

    #[test]
    fn coordinates_need_both_axes() {
        assert!(member(Some(10.0), None).coordinates().is_none());
        assert_eq!(
            member(Some(10.0), Some(20.0)).coordinates().map(|c| c.as_array()),
            Some([10.0, 20.0])
        );
    }

    #[test]
    fn location_query_is_trimmed() {
        assert_eq!(member(None, None).location_query(), Some("London"));
        let mut blank = member(None, None);
        blank.location = Some("   ".into());
        assert_eq!(blank.location_query(), None);
    }
}
