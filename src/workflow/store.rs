//! Workflow persistence
//!
//! Saves and loads workflow definitions as named JSON files under a root
//! directory. The store is a collaborator of the execution core: definitions
//! are written whole and overwritable, never partially.

use std::path::{Path, PathBuf};

use super::WorkflowDefinition;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {file}: {error}")]
    Json {
        file: String,
        error: serde_json::Error,
    },

    #[error("Workflow not found: {0}")]
    NotFound(String),
}

pub struct WorkflowStore {
    root: PathBuf,
}

impl WorkflowStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn workflow_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    /// Persist a definition, overwriting any previous version of the name.
    pub fn save_workflow(&self, def: &WorkflowDefinition) -> Result<(), StoreError> {
        let path = self.workflow_path(&def.name);
        let json = serde_json::to_string_pretty(def).map_err(|e| StoreError::Json {
            file: path.display().to_string(),
            error: e,
        })?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    pub fn load_workflow(&self, name: &str) -> Result<WorkflowDefinition, StoreError> {
        let path = self.workflow_path(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| StoreError::Json {
            file: path.display().to_string(),
            error: e,
        })
    }

    /// Names of all stored workflows, sorted.
    pub fn list_workflows(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn workflow_exists(&self, name: &str) -> bool {
        self.workflow_path(name).exists()
    }

    pub fn delete_workflow(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.workflow_path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ComponentInstance;
    use tempfile::tempdir;

    fn sample(name: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(name)
            .with_instance(ComponentInstance::trigger("slack.receive_message").with_id("t"))
            .with_instance(
                ComponentInstance::action("formatter.text")
                    .with_id("a")
                    .with_config("operation", "urlencode"),
            )
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();

        store.save_workflow(&sample("echo")).unwrap();
        let loaded = store.load_workflow("echo").unwrap();

        assert_eq!(loaded.name, "echo");
        assert_eq!(loaded.instances.len(), 2);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();

        store.save_workflow(&sample("echo")).unwrap();
        let mut updated = sample("echo");
        updated.instances.truncate(1);
        store.save_workflow(&updated).unwrap();

        assert_eq!(store.load_workflow("echo").unwrap().instances.len(), 1);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();

        assert!(matches!(
            store.load_workflow("nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();

        store.save_workflow(&sample("b")).unwrap();
        store.save_workflow(&sample("a")).unwrap();
        assert_eq!(store.list_workflows().unwrap(), vec!["a", "b"]);

        assert!(store.delete_workflow("a").unwrap());
        assert!(!store.delete_workflow("a").unwrap());
        assert_eq!(store.list_workflows().unwrap(), vec!["b"]);
    }
}
