//! Upstream category queries.
//!
//! Each category is one Overpass QL request. Categories are fetched in the
//! order of [`DEFAULT_CATEGORIES`]; that order is also the order in which
//! their elements appear in a cached batch.

use super::geo::Coordinate;

/// How the upstream service should report element geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Points for nodes and a computed centre for ways and relations.
    Center,
    /// Full node lists for ways, used for linear features.
    Geometry,
}

impl OutputMode {
    const fn statement(self) -> &'static str {
        match self {
            Self::Center => "out center tags;",
            Self::Geometry => "out geom;",
        }
    }
}

/// One upstream query unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryQuery {
    /// Stable identifier used in logs.
    pub id: &'static str,
    /// Overpass selectors, each combined with an `around:` filter.
    pub selectors: &'static [&'static str],
    /// Geometry output mode.
    pub output: OutputMode,
}

impl CategoryQuery {
    /// Render the Overpass QL program for this category.
    #[must_use]
    pub fn render(&self, center: Coordinate, radius_meters: u32, timeout_secs: u64) -> String {
        let mut query = format!("[out:json][timeout:{timeout_secs}];\n(\n");
        for selector in self.selectors {
            query.push_str(&format!(
                "  {selector}(around:{radius_meters},{},{});\n",
                center.lat, center.lon
            ));
        }
        query.push_str(");\n");
        query.push_str(self.output.statement());
        query
    }
}

/// Categories queried for every places request.
pub const DEFAULT_CATEGORIES: &[CategoryQuery] = &[
    CategoryQuery {
        id: "hot_springs",
        selectors: &[
            r#"nwr["natural"="hot_spring"]"#,
            r#"nwr["leisure"="spa"]"#,
            r#"nwr["amenity"="public_bath"]"#,
        ],
        output: OutputMode::Center,
    },
    CategoryQuery {
        id: "restaurants",
        selectors: &[r#"nwr["amenity"~"^(restaurant|fast_food|cafe)$"]"#],
        output: OutputMode::Center,
    },
    CategoryQuery {
        id: "lodging",
        selectors: &[r#"nwr["tourism"~"^(hotel|guest_house|hostel|motel|chalet)$"]"#],
        output: OutputMode::Center,
    },
    CategoryQuery {
        id: "ski_areas",
        selectors: &[
            r#"nwr["landuse"="winter_sports"]"#,
            r#"nwr["sport"="skiing"]"#,
        ],
        output: OutputMode::Center,
    },
    CategoryQuery {
        id: "attractions",
        selectors: &[
            r#"nwr["tourism"~"^(attraction|viewpoint|museum)$"]"#,
            r#"nwr["historic"]"#,
        ],
        output: OutputMode::Center,
    },
    CategoryQuery {
        id: "streams",
        selectors: &[
            r#"way["waterway"~"^(stream|river)$"]"#,
            r#"node["waterway"="waterfall"]"#,
        ],
        output: OutputMode::Geometry,
    },
];

#[cfg(test)]
mod tests {
    //! Unit tests for Overpass QL rendering.
    use super::*;

    #[test]
    fn renders_around_filters_for_every_selector() {
        let hot_springs = DEFAULT_CATEGORIES.first().expect("first category");
        let query = hot_springs.render(Coordinate::new(35.36, 138.73), 5000, 25);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains(r#"nwr["natural"="hot_spring"](around:5000,35.36,138.73);"#));
        assert!(query.contains(r#"nwr["leisure"="spa"](around:5000,35.36,138.73);"#));
        assert!(query.ends_with("out center tags;"));
    }

    #[test]
    fn streams_request_full_geometry() {
        let streams = DEFAULT_CATEGORIES
            .iter()
            .find(|category| category.id == "streams")
            .expect("streams category");
        assert!(streams.render(Coordinate::new(0.0, 0.0), 10, 5).ends_with("out geom;"));
    }

    #[test]
    fn category_ids_are_unique() {
        let mut ids: Vec<_> = DEFAULT_CATEGORIES.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DEFAULT_CATEGORIES.len());
    }
}
