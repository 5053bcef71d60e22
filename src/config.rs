//! Distance configuration, resolved once when a topology is created.
//!
//! ```text
//! HWTOPO_IGNORE_DISTANCES=1                      disable grouping
//! HWTOPO_NUMANODE_DISTANCES=0,1,2,3:2*2          textual spec for NUMA nodes
//! HWTOPO_PACKAGE_DISTANCES=0,1:10,20,20,10       textual spec for packages
//! ```

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::model::ObjType;

/// Variable that disables grouping when present, whatever its value.
pub const IGNORE_DISTANCES_VAR: &str = "HWTOPO_IGNORE_DISTANCES";

/// Distance pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceConfig {
    /// Run the grouping stage. Ingestion, resolution and normalization
    /// always run.
    pub grouping: bool,
    /// Textual distance specs per type, ingested in type order.
    pub specs: BTreeMap<ObjType, String>,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self { grouping: true, specs: BTreeMap::new() }
    }
}

impl DistanceConfig {
    /// Name of the variable carrying the textual spec for `obj_type`.
    pub fn env_var_name(obj_type: ObjType) -> String {
        format!("HWTOPO_{}_DISTANCES", obj_type.as_str().to_ascii_uppercase())
    }

    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Read `(name, value)` pairs as if they were environment variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        let specs = ObjType::ALL
            .iter()
            .filter_map(|t| vars.get(&Self::env_var_name(*t)).map(|s| (*t, s.clone())))
            .collect();

        Self { grouping: !vars.contains_key(IGNORE_DISTANCES_VAR), specs }
    }

    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_spec(mut self, obj_type: ObjType, spec: impl Into<String>) -> Self {
        self.specs.insert(obj_type, spec.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars() {
        let cfg = DistanceConfig::from_vars([
            ("HWTOPO_NUMANODE_DISTANCES", "0,1:1,2,2,1"),
            ("HWTOPO_PU_DISTANCES", "0,1,2,3:2*2"),
            ("UNRELATED", "x"),
        ]);
        assert!(cfg.grouping);
        assert_eq!(cfg.specs.len(), 2);
        assert_eq!(cfg.specs[&ObjType::NumaNode], "0,1:1,2,2,1");
        assert_eq!(cfg.specs.keys().copied().collect::<Vec<_>>(), vec![ObjType::NumaNode, ObjType::Pu]);
    }

    #[test]
    fn test_ignore_var_disables_grouping() {
        let cfg = DistanceConfig::from_vars([(IGNORE_DISTANCES_VAR, "")]);
        assert!(!cfg.grouping);
        assert!(cfg.specs.is_empty());
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(DistanceConfig::env_var_name(ObjType::NumaNode), "HWTOPO_NUMANODE_DISTANCES");
        assert_eq!(DistanceConfig::env_var_name(ObjType::Pu), "HWTOPO_PU_DISTANCES");
    }
}
