//! Loading of `instances.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use adt_models::{ObjectInstance, ObjectUid};
use tracing::debug;

use crate::error::{AnnotationError, AnnotationResult};

/// Instance metadata keyed by object uid.
pub type InstanceMap = BTreeMap<ObjectUid, ObjectInstance>;

/// Load instance metadata from `instances.json`.
///
/// The file is an object keyed by uid. Fails with
/// [`AnnotationError::MissingInstances`] when the file does not exist.
pub fn load_instances(path: &Path) -> AnnotationResult<InstanceMap> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AnnotationError::MissingInstances(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let raw: BTreeMap<String, ObjectInstance> =
        serde_json::from_str(&json).map_err(|e| AnnotationError::InvalidInstances {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let instances: InstanceMap = raw
        .into_iter()
        .map(|(uid, instance)| (ObjectUid::from(uid), instance))
        .collect();

    debug!(
        path = %path.display(),
        instances = instances.len(),
        dynamic = instances.values().filter(|i| i.is_dynamic()).count(),
        "Loaded instances"
    );

    Ok(instances)
}

/// Uids of instances flagged dynamic.
pub fn dynamic_uids(instances: &InstanceMap) -> BTreeSet<ObjectUid> {
    instances
        .iter()
        .filter(|(_, instance)| instance.is_dynamic())
        .map(|(uid, _)| uid.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INSTANCES: &str = r#"{
        "101": { "instance_name": "Cup", "prototype_name": "cup_a", "category": "kitchen", "motion_type": "dynamic" },
        "102": { "instance_name": "Sofa", "motion_type": "static", "instance_type": "object" },
        "103": { "instance_name": "Spoon", "motion_type": "DYNAMIC", "rotational_symmetry": { "is_annotated": false } }
    }"#;

    #[test]
    fn test_load_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("instances.json");
        std::fs::write(&path, INSTANCES).unwrap();

        let instances = load_instances(&path).unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[&ObjectUid::from("101")].instance_name, "Cup");

        let dynamic: Vec<String> = dynamic_uids(&instances).into_iter().map(|u| u.0).collect();
        assert_eq!(dynamic, vec!["101", "103"]);
    }

    #[test]
    fn test_missing_instances() {
        let dir = TempDir::new().unwrap();
        let err = load_instances(&dir.path().join("instances.json")).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingInstances(_)));
    }

    #[test]
    fn test_invalid_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("instances.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = load_instances(&path).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidInstances { .. }));
    }
}
