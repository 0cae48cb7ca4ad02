//! Standalone HTML export.
//!
//! Produces one self-contained document: Leaflet and markercluster come from
//! public CDNs, members and settings are inlined as JSON, and a short bootstrap
//! script builds markers and popups. Nothing in the page calls back to this
//! server, so the file keeps working after download.
//!
//! Everything user-controlled is escaped for where it lands: HTML text via
//! [`escape_html`], `<script>` payloads via [`script_json`], and CSS values are
//! checked against a conservative character set, falling back to the defaults.

use common::model::map::SavedMap;
use common::model::member::CommunityMember;
use common::model::settings::{MapCustomization, MapPopupStyle, MapSettings};
use serde::Serialize;

pub const DEFAULT_TITLE: &str = "Community Map";
pub const DEFAULT_ZOOM: f64 = 3.0;
pub const DOWNLOAD_FILE_NAME: &str = "community-map.html";

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub title: String,
    pub zoom: f64,
    pub settings: MapSettings,
    /// Embedded in a third-party page: no attribution badge.
    pub embed: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            zoom: DEFAULT_ZOOM,
            settings: MapSettings::default(),
            embed: false,
        }
    }
}

impl ExportOptions {
    /// Options for rendering a stored map. A zoom saved in the settings wins
    /// over the one computed at generation time.
    pub fn for_map(map: &SavedMap, embed: bool) -> Self {
        Self {
            title: map.name.clone(),
            zoom: map.settings.zoom.unwrap_or(map.zoom),
            settings: map.settings.clone(),
            embed,
        }
    }
}

/// Renders a stored map as a page or download, honoring a viewport saved in
/// its settings.
pub fn export_map(map: &SavedMap, embed: bool) -> serde_json::Result<String> {
    let center = map.settings.center.unwrap_or(map.center);
    generate_standalone_html(&map.members, center, &ExportOptions::for_map(map, embed))
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON that can sit inside a `<script>` element without closing it early.
pub fn script_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

fn css_value<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let safe = !value.trim().is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " #,.()%-".contains(c));
    if safe {
        value
    } else {
        fallback
    }
}

/// Copy of `settings` with every CSS value passed through [`css_value`], so the
/// inlined settings match the stylesheet.
fn sanitized_settings(settings: &MapSettings) -> MapSettings {
    let defaults_popup = MapPopupStyle::default();
    let defaults_custom = MapCustomization::default();
    let mut clean = settings.clone();

    let popup = &mut clean.style.popup_style;
    for (value, fallback) in [
        (&mut popup.background, &defaults_popup.background),
        (&mut popup.text, &defaults_popup.text),
        (&mut popup.border, &defaults_popup.border),
        (&mut popup.shadow, &defaults_popup.shadow),
    ] {
        *value = css_value(value.as_str(), fallback.as_str()).to_string();
    }
    let custom = &mut clean.customization;
    for (value, fallback) in [
        (&mut custom.marker_color, &defaults_custom.marker_color),
        (&mut custom.cluster_color, &defaults_custom.cluster_color),
        (&mut custom.font_family, &defaults_custom.font_family),
    ] {
        *value = css_value(value.as_str(), fallback.as_str()).to_string();
    }
    clean
}

/// Substitutes `{{name}}` markers in one pass; values are never re-scanned.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match vars.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

const FULLSCREEN_CSS: &str = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet.fullscreen@3.0.2/Control.FullScreen.css" />"#;
const FULLSCREEN_JS: &str = r#"<script src="https://unpkg.com/leaflet.fullscreen@3.0.2/Control.FullScreen.js"></script>"#;
const SEARCH_BOX: &str = r#"<input id="member-search" class="member-search" type="search" placeholder="Search members..." />"#;
const BADGE: &str = r#"<div class="attribution-badge">Made with Community Mapper</div>"#;

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{title}}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css" />
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css" />
    {{fullscreen_css}}
    <link rel="preconnect" href="https://fonts.googleapis.com">
    <link href="https://fonts.googleapis.com/css2?family={{font_query}}:wght@400;500;600&display=swap" rel="stylesheet">
    <style>
        :root { --font-sans: '{{font}}', system-ui, -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; }
        body { margin: 0; padding: 0; font-family: var(--font-sans); }
        #map { width: 100vw; height: 100vh; }
        .member-marker { width: 40px; height: 40px; border-radius: 50%; border: 2px solid {{marker_color}}; box-shadow: 0 1px 3px rgba(0,0,0,0.2); object-fit: cover; }
        .member-pin { width: 20px; height: 20px; border-radius: 50%; background-color: {{marker_color}}; border: 2px solid white; box-sizing: border-box; }
        .leaflet-popup-content-wrapper { background-color: {{popup_background}}; color: {{popup_text}}; border: 1px solid {{popup_border}}; box-shadow: {{popup_shadow}}; border-radius: 8px; padding: 0; }
        .leaflet-popup-content { margin: 0; min-width: 200px; font-family: var(--font-sans); }
        .leaflet-popup-tip { background-color: {{popup_background}}; }
        .member-popup { padding: 1rem; text-align: center; }
        .member-popup img { width: 4rem; height: 4rem; border-radius: 50%; object-fit: cover; margin-bottom: 0.5rem; border: 2px solid {{marker_color}}; }
        .member-popup h3 { margin: 0.5rem 0; font-size: 1.1rem; font-weight: 500; color: {{popup_text}}; }
        .member-popup p { margin: 0.25rem 0; color: {{popup_text}}; opacity: 0.8; font-size: 0.9rem; }
        .member-links { margin-top: 0.5rem; display: flex; justify-content: center; gap: 0.5rem; }
        .member-links a { color: {{marker_color}}; text-decoration: none; padding: 4px 8px; border-radius: 4px; font-size: 0.9rem; }
        .marker-cluster, .marker-cluster div { background-color: {{cluster_color}}; color: white; font-weight: 500; font-family: var(--font-sans); }
        .map-name { position: fixed; bottom: 20px; left: 50%; transform: translateX(-50%); z-index: 1000; background: white; padding: 8px 16px; border-radius: 999px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); font-size: 14px; color: #1D3640; pointer-events: none; }
        .member-search { position: fixed; top: 16px; left: 16px; z-index: 1000; padding: 8px 12px; border-radius: 6px; border: 1px solid #E2E8F0; font-family: var(--font-sans); }
        .attribution-badge { position: fixed; bottom: 20px; left: 20px; z-index: 1000; background: white; padding: 8px 12px; border-radius: 6px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); font-size: 12px; color: #1D3640; }
    </style>
</head>
<body>
    <div id="map"></div>
    {{map_name}}
    {{search_box}}
    {{badge}}
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <script src="https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js"></script>
    {{fullscreen_js}}
    <script>
        const members = {{members}};
        const settings = {{settings}};
        const mapCenter = {{center}};
        const features = settings.features;

        const escapeHtml = (value) => String(value == null ? '' : value)
          .replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;')
          .replace(/"/g, '&quot;').replace(/'/g, '&#039;');

        const map = L.map('map', {
          center: mapCenter,
          zoom: {{zoom}},
          zoomControl: false,
          attributionControl: false,
          minZoom: 2,
          maxZoom: 18,
          fullscreenControl: features.enableFullscreen
        });

        L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
          attribution: '&copy; OpenStreetMap contributors'
        }).addTo(map);

        const layer = features.enableClustering
          ? L.markerClusterGroup({
              maxClusterRadius: 50,
              spiderfyOnMaxZoom: true,
              showCoverageOnHover: false,
              zoomToBoundsOnClick: true,
              iconCreateFunction: (cluster) => L.divIcon({
                html: '<div><span>' + cluster.getChildCount() + '</span></div>',
                className: 'marker-cluster',
                iconSize: L.point(40, 40)
              })
            })
          : L.layerGroup();

        const markerIcon = (member) => settings.style.markerStyle === 'photos' && member.image
          ? L.divIcon({
              html: '<img src="' + escapeHtml(member.image) + '" alt="' + escapeHtml(member.name) + '" class="member-marker">',
              className: '', iconSize: [44, 44], iconAnchor: [22, 22], popupAnchor: [0, -20]
            })
          : L.divIcon({
              html: '<div class="member-pin"></div>',
              className: '', iconSize: [20, 20], iconAnchor: [10, 10], popupAnchor: [0, -10]
            });

        const popupHtml = (member) => {
          const link = (url, label) => url
            ? '<a href="' + escapeHtml(url) + '" target="_blank" rel="noopener noreferrer">' + label + '</a>'
            : '';
          const links = features.enableSharing && (member.linkedin || member.website)
            ? '<div class="member-links">' + link(member.linkedin, 'LinkedIn') + link(member.website, 'Website') + '</div>'
            : '';
          return '<div class="member-popup">' +
            (member.image ? '<img src="' + escapeHtml(member.image) + '" alt="' + escapeHtml(member.name) + '">' : '') +
            '<h3>' + escapeHtml(member.name) + '</h3>' +
            (member.location ? '<p>' + escapeHtml(member.location) + '</p>' : '') +
            (member.title ? '<p>' + escapeHtml(member.title) + '</p>' : '') +
            links + '</div>';
        };

        const markers = members.map((member) => {
          const marker = L.marker([member.latitude, member.longitude], {
            icon: markerIcon(member),
            title: member.name
          }).bindPopup(popupHtml(member), { maxWidth: 300, minWidth: 200, autoPan: true, closeButton: false });
          layer.addLayer(marker);
          return { member, marker };
        });
        map.addLayer(layer);

        if (markers.length > 1) {
          map.fitBounds(L.latLngBounds(members.map((m) => [m.latitude, m.longitude])), { padding: [50, 50] });
        }

        const search = document.getElementById('member-search');
        if (search) {
          search.addEventListener('keydown', (event) => {
            if (event.key !== 'Enter') return;
            const query = search.value.trim().toLowerCase();
            const hit = markers.find((m) => m.member.name.toLowerCase().includes(query));
            if (!hit) return;
            if (features.enableClustering) {
              layer.zoomToShowLayer(hit.marker, () => hit.marker.openPopup());
            } else {
              map.setView(hit.marker.getLatLng(), 12);
              hit.marker.openPopup();
            }
          });
        }

        L.control.zoom({ position: 'bottomright' }).addTo(map);
    </script>
</body>
</html>
"#;

/// Builds the standalone document for `members` centered on `center`.
pub fn generate_standalone_html(
    members: &[CommunityMember],
    center: [f64; 2],
    options: &ExportOptions,
) -> serde_json::Result<String> {
    let settings = sanitized_settings(&options.settings);
    let popup = &settings.style.popup_style;
    let custom = &settings.customization;
    let features = &settings.features;

    let font = custom.font_family.as_str();
    let font_query = font.replace(' ', "+");
    let title = escape_html(if options.title.trim().is_empty() {
        DEFAULT_TITLE
    } else {
        options.title.trim()
    });
    let map_name = if custom.show_name {
        format!(r#"<div class="map-name">{}</div>"#, title)
    } else {
        String::new()
    };
    let zoom = if options.zoom.is_finite() {
        options.zoom.clamp(2.0, 18.0)
    } else {
        DEFAULT_ZOOM
    };

    let members_json = script_json(members)?;
    let settings_json = script_json(&settings)?;
    let center_json = script_json(&center)?;
    let zoom = zoom.to_string();

    Ok(render(
        PAGE,
        &[
            ("title", title.as_str()),
            ("font", font),
            ("font_query", font_query.as_str()),
            ("marker_color", custom.marker_color.as_str()),
            ("cluster_color", custom.cluster_color.as_str()),
            ("popup_background", popup.background.as_str()),
            ("popup_text", popup.text.as_str()),
            ("popup_border", popup.border.as_str()),
            ("popup_shadow", popup.shadow.as_str()),
            ("fullscreen_css", if features.enable_fullscreen { FULLSCREEN_CSS } else { "" }),
            ("fullscreen_js", if features.enable_fullscreen { FULLSCREEN_JS } else { "" }),
            ("search_box", if features.enable_search { SEARCH_BOX } else { "" }),
            ("badge", if options.embed { "" } else { BADGE }),
            ("map_name", map_name.as_str()),
            ("members", members_json.as_str()),
            ("settings", settings_json.as_str()),
            ("center", center_json.as_str()),
            ("zoom", zoom.as_str()),
        ],
    ))
}
