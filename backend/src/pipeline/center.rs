use common::model::member::CommunityMember;

/// Viewport used when no member has usable coordinates.
pub const FALLBACK_CENTER: [f64; 2] = [20.0, 0.0];

/// Arithmetic mean of all usable member coordinates.
pub fn calculate_map_center(members: &[CommunityMember]) -> [f64; 2] {
    let (count, lat_sum, lng_sum) = members
        .iter()
        .filter_map(CommunityMember::coordinates)
        .fold((0usize, 0.0, 0.0), |(n, lat, lng), c| {
            (n + 1, lat + c.latitude, lng + c.longitude)
        });

    if count == 0 {
        return FALLBACK_CENTER;
    }
    [lat_sum / count as f64, lng_sum / count as f64]
}
