//! Layer configuration.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraint::ViewerPositionConstraint;
use crate::coord::{TileProjection, MAX_ZOOM};
use crate::divider::{Divider, MatrixDivider, TileMatrixSet, WebMercatorDivider, Wgs84Divider};
use crate::geo::GeoBoundingBox;
use crate::timespan::TimeSpan;

use super::LayerError;

fn default_top_level_count() -> u32 {
    1
}

/// Everything the engine needs to know about one imagery layer.
///
/// Usually loaded from a JSON layer list; see [`LayerConfig::load_list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Stable layer identity.
    pub id: String,

    /// Name shown to the user. Falls back to `id` when empty.
    #[serde(default)]
    pub display_name: String,

    /// Server or package identity used for registry lookups.
    #[serde(default)]
    pub source: String,

    /// Tile family identifier used for registry lookups.
    #[serde(default)]
    pub family: String,

    pub projection: TileProjection,

    /// Rows are numbered from the south edge.
    #[serde(default)]
    pub is_tms: bool,

    /// The layer is never shown coarser than this level.
    #[serde(default)]
    pub min_zoom: u32,

    pub max_zoom: u32,

    /// User preference lowering the maximum zoom.
    #[serde(default)]
    pub max_zoom_user_override: Option<u32>,

    /// Number of top-level tiles.
    #[serde(default = "default_top_level_count")]
    pub top_level_count: u32,

    /// Only tiles intersecting this box are built.
    #[serde(default)]
    pub footprint: Option<GeoBoundingBox>,

    #[serde(default)]
    pub time_span: Option<TimeSpan>,

    #[serde(default)]
    pub viewer_position: Option<ViewerPositionConstraint>,

    /// Explicit tile matrix for packaged tile databases.
    #[serde(default)]
    pub matrix: Option<TileMatrixSet>,
}

impl LayerConfig {
    /// Minimal configuration for a layer.
    pub fn new(id: impl Into<String>, projection: TileProjection, max_zoom: u32) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            source: String::new(),
            family: String::new(),
            projection,
            is_tms: false,
            min_zoom: 0,
            max_zoom,
            max_zoom_user_override: None,
            top_level_count: 1,
            footprint: None,
            time_span: None,
            viewer_position: None,
            matrix: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>, family: impl Into<String>) -> Self {
        self.source = source.into();
        self.family = family.into();
        self
    }

    pub fn with_tms(mut self, is_tms: bool) -> Self {
        self.is_tms = is_tms;
        self
    }

    pub fn with_min_zoom(mut self, min_zoom: u32) -> Self {
        self.min_zoom = min_zoom;
        self
    }

    pub fn with_top_level_count(mut self, count: u32) -> Self {
        self.top_level_count = count;
        self
    }

    pub fn with_footprint(mut self, footprint: GeoBoundingBox) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn with_time_span(mut self, span: TimeSpan) -> Self {
        self.time_span = Some(span);
        self
    }

    pub fn with_matrix(mut self, matrix: TileMatrixSet) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Name used in activity labels and logs.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }

    /// Maximum zoom after applying the user override.
    ///
    /// An override can only lower the configured maximum.
    pub fn effective_max_zoom(&self) -> u32 {
        self.max_zoom_user_override
            .map_or(self.max_zoom, |o| o.min(self.max_zoom))
    }

    /// Zoom level of the layer's top-level tiles.
    ///
    /// Web Mercator roots sit at `log4(top_level_count)`, WGS84 roots at 0
    /// and matrix roots at the shallowest matrix level.
    pub fn root_zoom(&self) -> u32 {
        match (&self.matrix, self.projection) {
            (Some(matrix), _) => matrix.first_level().map_or(0, |level| level.zoom),
            (None, TileProjection::WebMercator) => self.top_level_count.trailing_zeros() / 2,
            (None, TileProjection::Wgs84) => 0,
        }
    }

    /// Returns true if `bounds` lies at least partly inside the footprint.
    ///
    /// Layers without a footprint cover everything.
    pub fn in_footprint(&self, bounds: &GeoBoundingBox) -> bool {
        self.footprint
            .as_ref()
            .map_or(true, |footprint| footprint.intersects(bounds))
    }

    /// Check the configuration for errors.
    ///
    /// # Errors
    ///
    /// [`LayerError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), LayerError> {
        let invalid = |reason: String| {
            Err(LayerError::InvalidConfig {
                layer: self.id.clone(),
                reason,
            })
        };

        if self.id.trim().is_empty() {
            return invalid("layer id is empty".into());
        }
        if self.max_zoom > MAX_ZOOM {
            return invalid(format!("max_zoom {} exceeds {}", self.max_zoom, MAX_ZOOM));
        }
        if self.min_zoom > self.max_zoom {
            return invalid(format!(
                "min_zoom {} is greater than max_zoom {}",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.min_zoom > self.effective_max_zoom() {
            return invalid(format!(
                "min_zoom {} is greater than the zoom override {}",
                self.min_zoom,
                self.effective_max_zoom()
            ));
        }
        if self.top_level_count == 0 {
            return invalid("top_level_count must be at least 1".into());
        }

        match &self.matrix {
            Some(matrix) => {
                if matrix.projection != self.projection {
                    return invalid(format!(
                        "matrix projection {} does not match layer projection {}",
                        matrix.projection, self.projection
                    ));
                }
                if matrix.levels.is_empty() {
                    return invalid("matrix has no levels".into());
                }
                if matrix.extent.wraps() {
                    return invalid("matrix extent may not cross the antimeridian".into());
                }
                if matrix
                    .levels
                    .iter()
                    .any(|l| l.matrix_width == 0 || l.matrix_height == 0)
                {
                    return invalid("matrix level with zero width or height".into());
                }
            }
            None => {
                if self.projection == TileProjection::WebMercator
                    && !is_power_of_four(self.top_level_count)
                {
                    return invalid(format!(
                        "top_level_count {} is not a power of 4",
                        self.top_level_count
                    ));
                }
            }
        }

        let root_zoom = self.root_zoom();
        if root_zoom > self.effective_max_zoom() {
            return invalid(format!(
                "top-level tiles at zoom {} are deeper than the maximum zoom {}",
                root_zoom,
                self.effective_max_zoom()
            ));
        }
        Ok(())
    }

    /// Create the divider this layer's tree uses.
    pub fn create_divider(&self) -> Result<Arc<dyn Divider>, LayerError> {
        self.validate()?;
        let max_zoom = self.effective_max_zoom();
        let divider: Arc<dyn Divider> = match (&self.matrix, self.projection) {
            (Some(matrix), _) => Arc::new(MatrixDivider::new(matrix.clone(), max_zoom)),
            (None, TileProjection::WebMercator) => Arc::new(WebMercatorDivider::new(max_zoom, self.is_tms)),
            (None, TileProjection::Wgs84) => Arc::new(Wgs84Divider::new(max_zoom, self.is_tms)),
        };
        Ok(divider)
    }

    /// Load one layer from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LayerError> {
        let text = fs::read_to_string(path)?;
        let config: LayerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a layer file holding one layer or an array of layers.
    pub fn load_list(path: &Path) -> Result<Vec<Self>, LayerError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Parse either one JSON layer object or an array of them.
    ///
    /// Every layer is validated.
    pub fn from_json(text: &str) -> Result<Vec<Self>, LayerError> {
        let configs: Vec<LayerConfig> = if text.trim_start().starts_with('[') {
            serde_json::from_str(text)?
        } else {
            vec![serde_json::from_str(text)?]
        };
        for config in &configs {
            config.validate()?;
        }
        Ok(configs)
    }
}

pub(crate) fn is_power_of_four(n: u32) -> bool {
    n.is_power_of_two() && n.trailing_zeros() % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::divider::TileMatrix;
    use std::io::Write;

    #[test]
    fn test_power_of_four() {
        assert!(is_power_of_four(1));
        assert!(is_power_of_four(4));
        assert!(is_power_of_four(16));
        assert!(!is_power_of_four(2));
        assert!(!is_power_of_four(8));
        assert!(!is_power_of_four(0));
    }

    #[test]
    fn test_effective_max_zoom_override_only_lowers() {
        let mut config = LayerConfig::new("a", TileProjection::WebMercator, 10);
        assert_eq!(config.effective_max_zoom(), 10);
        config.max_zoom_user_override = Some(6);
        assert_eq!(config.effective_max_zoom(), 6);
        config.max_zoom_user_override = Some(14);
        assert_eq!(config.effective_max_zoom(), 10);
    }

    #[test]
    fn test_validation_errors() {
        let base = LayerConfig::new("a", TileProjection::WebMercator, 10);
        assert!(base.validate().is_ok());

        assert!(base.clone().with_min_zoom(11).validate().is_err());
        assert!(base.clone().with_top_level_count(0).validate().is_err());
        assert!(base.clone().with_top_level_count(2).validate().is_err());
        assert!(base.clone().with_top_level_count(16).validate().is_ok());

        let mut lowered = base.clone().with_min_zoom(5);
        lowered.max_zoom_user_override = Some(3);
        assert!(lowered.validate().is_err());

        // 16 top-level tiles sit at zoom 2.
        let shallow = LayerConfig::new("s", TileProjection::WebMercator, 1).with_top_level_count(16);
        assert!(matches!(
            shallow.validate(),
            Err(LayerError::InvalidConfig { .. })
        ));
        let mut capped = base.clone().with_top_level_count(16);
        capped.max_zoom_user_override = Some(1);
        assert!(capped.validate().is_err());
        capped.max_zoom_user_override = Some(2);
        assert!(capped.validate().is_ok());

        // WGS84 layers take any top-level count.
        let wgs = LayerConfig::new("w", TileProjection::Wgs84, 5).with_top_level_count(3);
        assert!(wgs.validate().is_ok());
    }

    #[test]
    fn test_matrix_projection_must_match() {
        let matrix = TileMatrixSet {
            projection: TileProjection::Wgs84,
            extent: GeoBoundingBox::world(),
            levels: vec![TileMatrix {
                zoom: 0,
                matrix_width: 2,
                matrix_height: 1,
            }],
        };
        let config = LayerConfig::new("m", TileProjection::WebMercator, 3).with_matrix(matrix);
        assert!(matches!(
            config.validate(),
            Err(LayerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_matrix_root_deeper_than_max_zoom() {
        let matrix = TileMatrixSet {
            projection: TileProjection::Wgs84,
            extent: GeoBoundingBox::world(),
            levels: vec![TileMatrix {
                zoom: 3,
                matrix_width: 2,
                matrix_height: 1,
            }],
        };
        let mut config = LayerConfig::new("m", TileProjection::Wgs84, 2).with_matrix(matrix);
        assert_eq!(config.root_zoom(), 3);
        assert!(config.validate().is_err());
        config.max_zoom = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_create_divider_by_projection() {
        let merc = LayerConfig::new("a", TileProjection::WebMercator, 7);
        let divider = merc.create_divider().unwrap();
        assert_eq!(divider.projection(), TileProjection::WebMercator);
        assert_eq!(divider.max_zoom(), 7);

        let mut wgs = LayerConfig::new("b", TileProjection::Wgs84, 7).with_top_level_count(2);
        wgs.max_zoom_user_override = Some(4);
        assert_eq!(wgs.create_divider().unwrap().max_zoom(), 4);
    }

    #[test]
    fn test_load_json_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"id": "osm", "display_name": "OpenStreetMap", "projection": "web_mercator", "max_zoom": 5}}"#
        )
        .unwrap();

        let config = LayerConfig::load(file.path()).unwrap();
        assert_eq!(config.display_name(), "OpenStreetMap");
        assert_eq!(config.top_level_count, 1);
        assert!(!config.is_tms);
        assert!(config.footprint.is_none());
    }

    #[test]
    fn test_from_json_object_or_array() {
        let single = LayerConfig::from_json(r#"{"id": "a", "projection": "wgs84", "max_zoom": 2}"#).unwrap();
        assert_eq!(single.len(), 1);

        let list = LayerConfig::from_json(
            r#" [{"id": "a", "projection": "wgs84", "max_zoom": 2},
                 {"id": "b", "projection": "web_mercator", "max_zoom": 4, "is_tms": true}]"#,
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[1].is_tms);

        assert!(matches!(
            LayerConfig::from_json("{not json"),
            Err(LayerError::Json(_))
        ));
    }

    #[test]
    fn test_load_list_rejects_invalid_entry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "ok", "projection": "wgs84", "max_zoom": 3}},
                {{"id": "bad", "projection": "web_mercator", "max_zoom": 3, "min_zoom": 4}}]"#
        )
        .unwrap();
        assert!(matches!(
            LayerConfig::load_list(file.path()),
            Err(LayerError::InvalidConfig { .. })
        ));
    }
}
