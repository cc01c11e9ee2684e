use crate::version::Version;
use serde::Deserialize;

/// Knobs of the loader. The defaults match the Potree 1.x formats.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Name of the root node; child names append one octant digit each.
    pub root_name: String,
    /// Up to this version the whole hierarchy is listed in the metadata document.
    pub legacy_hierarchy_max_version: Version,
    /// Up to this version the first hierarchy entry must carry the root point count.
    pub root_point_count_max_version: Version,
    /// From this version on node files are grouped in hierarchy chunk directories.
    pub hierarchy_path_min_version: Version,
    /// Node loads are refused while this many loads are in flight.
    pub max_nodes_loading: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            root_name: "r".to_string(),
            legacy_hierarchy_max_version: Version::new(1, 4),
            root_point_count_max_version: Version::new(1, 5),
            hierarchy_path_min_version: Version::new(1, 5),
            max_nodes_loading: 4,
        }
    }
}

impl LoaderOptions {
    pub fn with_root_name(mut self, root_name: impl Into<String>) -> Self {
        self.root_name = root_name.into();
        self
    }

    pub fn with_max_nodes_loading(mut self, max_nodes_loading: usize) -> Self {
        self.max_nodes_loading = max_nodes_loading;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::from_str;

    #[test]
    fn deserialize_partial_options() {
        let options: LoaderOptions =
            from_str(r#"{"maxNodesLoading": 16, "legacyHierarchyMaxVersion": "1.3"}"#).unwrap();

        assert_eq!(options.max_nodes_loading, 16);
        assert_eq!(options.legacy_hierarchy_max_version, Version::new(1, 3));
        assert_eq!(options.root_name, "r");
        assert_eq!(options.hierarchy_path_min_version, Version::new(1, 5));
    }

    #[test]
    fn reject_invalid_version() {
        assert!(from_str::<LoaderOptions>(r#"{"hierarchyPathMinVersion": "one"}"#).is_err());
    }
}
