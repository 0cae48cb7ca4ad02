//! Display settings attached to a saved map.
//!
//! Settings are split in three sub-objects (`style`, `features`,
//! `customization`). Partial updates arrive as a [`MapSettingsPatch`] and are
//! merged one sub-object at a time: a field present in the patch replaces the
//! stored field, anything absent is left alone. `popup_style` is a single value
//! and is replaced whole.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    Pins,
    Photos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPopupStyle {
    pub background: String,
    pub text: String,
    pub border: String,
    pub shadow: String,
}

impl Default for MapPopupStyle {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".into(),
            text: "#1D3640".into(),
            border: "#E2E8F0".into(),
            shadow: "0 4px 6px -1px rgba(0, 0, 0, 0.1)".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStyle {
    pub id: String,
    pub marker_style: MarkerStyle,
    pub popup_style: MapPopupStyle,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            id: "minimal".into(),
            marker_style: MarkerStyle::Pins,
            popup_style: MapPopupStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFeatures {
    pub enable_clustering: bool,
    pub enable_fullscreen: bool,
    pub enable_sharing: bool,
    pub enable_search: bool,
}

impl Default for MapFeatures {
    fn default() -> Self {
        Self {
            enable_clustering: true,
            enable_fullscreen: true,
            enable_sharing: true,
            enable_search: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCustomization {
    pub marker_color: String,
    pub cluster_color: String,
    pub font_family: String,
    pub show_name: bool,
}

impl Default for MapCustomization {
    fn default() -> Self {
        Self {
            marker_color: "#E9B893".into(),
            cluster_color: "#F99D7C".into(),
            font_family: "Inter".into(),
            show_name: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSettings {
    pub style: MapStyle,
    pub features: MapFeatures,
    pub customization: MapCustomization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapStylePatch {
    pub id: Option<String>,
    pub marker_style: Option<MarkerStyle>,
    pub popup_style: Option<MapPopupStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapFeaturesPatch {
    pub enable_clustering: Option<bool>,
    pub enable_fullscreen: Option<bool>,
    pub enable_sharing: Option<bool>,
    pub enable_search: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapCustomizationPatch {
    pub marker_color: Option<String>,
    pub cluster_color: Option<String>,
    pub font_family: Option<String>,
    pub show_name: Option<bool>,
}

/// Partial settings as sent by clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapSettingsPatch {
    pub style: Option<MapStylePatch>,
    pub features: Option<MapFeaturesPatch>,
    pub customization: Option<MapCustomizationPatch>,
    pub center: Option<[f64; 2]>,
    pub zoom: Option<f64>,
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

impl MapStyle {
    pub fn merge(&mut self, patch: MapStylePatch) {
        replace(&mut self.id, patch.id);
        replace(&mut self.marker_style, patch.marker_style);
        replace(&mut self.popup_style, patch.popup_style);
    }
}

impl MapFeatures {
    pub fn merge(&mut self, patch: MapFeaturesPatch) {
        replace(&mut self.enable_clustering, patch.enable_clustering);
        replace(&mut self.enable_fullscreen, patch.enable_fullscreen);
        replace(&mut self.enable_sharing, patch.enable_sharing);
        replace(&mut self.enable_search, patch.enable_search);
    }
}

impl MapCustomization {
    pub fn merge(&mut self, patch: MapCustomizationPatch) {
        replace(&mut self.marker_color, patch.marker_color);
        replace(&mut self.cluster_color, patch.cluster_color);
        replace(&mut self.font_family, patch.font_family);
        replace(&mut self.show_name, patch.show_name);
    }
}

impl MapSettings {
    /// Applies a partial update in place, one sub-object at a time.
    pub fn merge(&mut self, patch: MapSettingsPatch) {
        if let Some(style) = patch.style {
            self.style.merge(style);
        }
        if let Some(features) = patch.features {
            self.features.merge(features);
        }
        if let Some(customization) = patch.customization {
            self.customization.merge(customization);
        }
        if patch.center.is_some() {
            self.center = patch.center;
        }
        if patch.zoom.is_some() {
            self.zoom = patch.zoom;
        }
    }

    /// Defaults with `patch` merged on top.
    pub fn from_patch(patch: MapSettingsPatch) -> Self {
        let mut settings = Self::default();
        settings.merge(patch);
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_name_update_keeps_colors_and_font() {
        let mut settings = MapSettings::default();
        settings.customization.marker_color = "#112233".into();

        settings.merge(MapSettingsPatch {
            customization: Some(MapCustomizationPatch {
                show_name: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert!(settings.customization.show_name);
        assert_eq!(settings.customization.marker_color, "#112233");
        assert_eq!(settings.customization.cluster_color, "#F99D7C");
        assert_eq!(settings.customization.font_family, "Inter");
        assert_eq!(settings.style, MapStyle::default());
        assert_eq!(settings.features, MapFeatures::default());
    }

    #[test]
    fn popup_style_is_replaced_whole() {
        let popup = MapPopupStyle {
            background: "#000000".into(),
            text: "#FFFFFF".into(),
            border: "none".into(),
            shadow: "none".into(),
        };
        let settings = MapSettings::from_patch(MapSettingsPatch {
            style: Some(MapStylePatch {
                popup_style: Some(popup.clone()),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(settings.style.popup_style, popup);
        assert_eq!(settings.style.id, "minimal");
        assert_eq!(settings.style.marker_style, MarkerStyle::Pins);
    }

    #[test]
    fn partial_json_patch_deserializes() {
        let patch: MapSettingsPatch = serde_json::from_str(
            r#"{"features":{"enableSearch":true},"style":{"markerStyle":"photos"}}"#,
        )
        .unwrap();
        let settings = MapSettings::from_patch(patch);

        assert!(settings.features.enable_search);
        assert!(settings.features.enable_clustering);
        assert_eq!(settings.style.marker_style, MarkerStyle::Photos);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(MapSettings::default()).unwrap();
        assert_eq!(json["customization"]["markerColor"], "#E9B893");
        assert_eq!(json["features"]["enableClustering"], true);
        assert_eq!(json["style"]["markerStyle"], "pins");
        assert!(json.get("center").is_none());
    }
}
