//! File-backed collection of mind maps.
//!
//! The store is a directory holding `collection.json`, a JSON array of maps in
//! the same camelCase shape the browser editor keeps in local storage, and
//! `active-id`, the id of the map commands act on by default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::mindmap::{DEFAULT_ROOT_TEXT, MindMap, Node, NodeId, now_millis};

const COLLECTION_FILE: &str = "collection.json";
const ACTIVE_ID_FILE: &str = "active-id";
const UNTITLED: &str = "Untitled Mind Map";

/// A stored map as read from disk, before defaults are filled in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMap {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    root: Option<Arc<Node>>,
    #[serde(default)]
    selected_node_id: Option<NodeId>,
    #[serde(default)]
    last_modified: Option<u64>,
}

impl StoredMap {
    fn into_map(self) -> MindMap {
        MindMap {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: self
                .title
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            root: self
                .root
                .unwrap_or_else(|| Arc::new(Node::new(NodeId::generate(), DEFAULT_ROOT_TEXT))),
            selected_node_id: self.selected_node_id,
            last_modified: self.last_modified.filter(|&t| t > 0).unwrap_or_else(now_millis),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapStore {
    dir: PathBuf,
}

impl MapStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self) -> PathBuf {
        self.dir.join(COLLECTION_FILE)
    }

    fn active_id_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_ID_FILE)
    }

    /// All stored maps, most recently modified first.
    ///
    /// A missing collection is empty. An unreadable or corrupt one is logged
    /// and treated as empty so the editor can still start.
    pub fn load_collection(&self) -> Vec<MindMap> {
        self.read_collection().unwrap_or_else(|e| {
            tracing::error!(path = %self.collection_path().display(), error = %e, "failed to load map collection");
            Vec::new()
        })
    }

    /// Like [`MapStore::load_collection`], but an existing file that cannot be
    /// read or parsed is an error. Writers go through this so a bad file is
    /// never replaced by a collection missing its maps.
    fn read_collection(&self) -> Result<Vec<MindMap>, String> {
        let path = self.collection_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(format!("Failed to read map collection {}: {}", path.display(), e)),
        };

        let stored: Vec<StoredMap> = from_json_str(&content)
            .map_err(|e| format!("Failed to parse map collection {}: {}", path.display(), e))?;
        let mut maps: Vec<MindMap> = stored.into_iter().map(StoredMap::into_map).collect();
        sort_by_recency(&mut maps);
        Ok(maps)
    }

    pub fn save_collection(&self, maps: &[MindMap]) -> Result<(), String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create store directory: {}", e))?;
        let json = serde_json::to_string_pretty(maps)
            .map_err(|e| format!("Failed to serialize map collection: {}", e))?;
        std::fs::write(self.collection_path(), json)
            .map_err(|e| format!("Failed to write map collection: {}", e))?;
        tracing::debug!(maps = maps.len(), "saved map collection");
        Ok(())
    }

    /// Inserts or replaces `map` (matched by id), stamping it as modified now.
    /// Returns the updated collection.
    pub fn save_map(&self, map: &MindMap) -> Result<Vec<MindMap>, String> {
        let mut maps = self.read_collection()?;
        let mut stamped = map.clone();
        stamped.touch();

        match maps.iter_mut().find(|m| m.id == stamped.id) {
            Some(existing) => *existing = stamped,
            None => maps.push(stamped),
        }
        sort_by_recency(&mut maps);
        self.save_collection(&maps)?;
        tracing::info!(map = %map.id, title = %map.title, "saved mind map");
        Ok(maps)
    }

    pub fn find_map(&self, id: &str) -> Option<MindMap> {
        self.load_collection().into_iter().find(|m| m.id == id)
    }

    /// Removes the map with `id`. If it was the active map, there is no
    /// active map afterwards.
    pub fn delete_map(&self, id: &str) -> Result<Vec<MindMap>, String> {
        let mut maps = self.read_collection()?;
        maps.retain(|m| m.id != id);
        self.save_collection(&maps)?;
        if self.active_id().as_deref() == Some(id) {
            self.set_active_id(None)?;
        }
        tracing::info!(map = %id, "deleted mind map");
        Ok(maps)
    }

    pub fn active_id(&self) -> Option<String> {
        std::fs::read_to_string(self.active_id_path())
            .ok()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    pub fn set_active_id(&self, id: Option<&str>) -> Result<(), String> {
        let path = self.active_id_path();
        match id {
            Some(id) => {
                std::fs::create_dir_all(&self.dir)
                    .map_err(|e| format!("Failed to create store directory: {}", e))?;
                std::fs::write(&path, id)
                    .map_err(|e| format!("Failed to write active map id: {}", e))
            }
            None => match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(format!("Failed to clear active map id: {}", e)),
            },
        }
    }

    /// The active map, falling back to the most recent one.
    pub fn load_active(&self) -> Option<MindMap> {
        let maps = self.load_collection();
        let active = self.active_id();
        let position = active
            .as_deref()
            .and_then(|id| maps.iter().position(|m| m.id == id))
            .unwrap_or(0);
        maps.into_iter().nth(position)
    }
}

/// Parses JSON without a nesting limit. Every tree level costs two levels of
/// nesting, so deep maps exceed serde_json's default limit of 128. The stack
/// grows on demand instead of overflowing.
pub fn from_json_str<T: DeserializeOwned>(source: &str) -> Result<T, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(source);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn sort_by_recency(maps: &mut [MindMap]) {
    maps.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, MapStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::new(dir.path().join("maps"));
        (dir, store)
    }

    #[test]
    fn missing_collection_is_empty() {
        let (_dir, store) = store();
        assert!(store.load_collection().is_empty());
        assert_eq!(store.active_id(), None);
        assert_eq!(store.load_active(), None);
    }

    #[test]
    fn corrupt_collection_is_empty() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir().join(COLLECTION_FILE), "{not json").unwrap();
        assert!(store.load_collection().is_empty());
    }

    #[test]
    fn entries_get_defaults_and_recency_order() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(
            store.dir().join(COLLECTION_FILE),
            r#"[
                {"id": "old", "title": "Old", "lastModified": 10,
                 "root": {"id": "r1", "text": "Root", "children": []}},
                {"id": "new", "lastModified": 20},
                {"title": "Fresh"}
            ]"#,
        )
        .unwrap();

        let maps = store.load_collection();
        assert_eq!(maps.len(), 3);
        // The entry without a timestamp is stamped now, so it comes first.
        assert_eq!(maps[0].title, "Fresh");
        assert!(!maps[0].id.is_empty());
        assert_eq!(maps[1].id, "new");
        assert_eq!(maps[1].title, UNTITLED);
        assert_eq!(maps[1].root.text, DEFAULT_ROOT_TEXT);
        assert_eq!(maps[2].id, "old");
        assert_eq!(maps[2].root.id, NodeId::from("r1"));
    }

    #[test]
    fn deep_map_round_trips_beside_others() {
        let (_dir, store) = store();
        let other = MindMap::new();
        store.save_map(&other).unwrap();

        let mut node = Node::new("n100".into(), "leaf");
        for depth in (0..100).rev() {
            node = Node::new(NodeId::new(format!("n{}", depth)), format!("level {}", depth)).with_child(node);
        }
        let deep = MindMap {
            root: Arc::new(node),
            ..MindMap::new()
        };
        store.save_map(&deep).unwrap();

        let maps = store.load_collection();
        assert_eq!(maps.len(), 2);
        assert_eq!(store.find_map(&deep.id).unwrap().root, deep.root);
        assert_eq!(store.find_map(&deep.id).unwrap().root.node_count(), 101);
        assert!(store.find_map(&other.id).is_some());

        store.save_map(&MindMap::new()).unwrap();
        assert_eq!(store.load_collection().len(), 3);
    }

    #[test]
    fn writers_refuse_to_replace_corrupt_collection() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        let path = store.dir().join(COLLECTION_FILE);
        std::fs::write(&path, "[{\"id\": ").unwrap();

        assert!(store.save_map(&MindMap::new()).unwrap_err().contains("Failed to parse"));
        assert!(store.delete_map("anything").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"id\": ");
    }

    #[test]
    fn json_has_no_nesting_limit() {
        let depth = 2_000;
        let source = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let value: serde_json::Value = from_json_str(&source).unwrap();
        assert!(value.is_array());
        assert!(serde_json::from_str::<serde_json::Value>(&source).is_err());
        assert!(from_json_str::<serde_json::Value>("[] trailing").is_err());
    }

    #[test]
    fn save_map_upserts_and_stamps() {
        let (_dir, store) = store();
        let mut map = MindMap::new();
        map.last_modified = 1;

        let maps = store.save_map(&map).unwrap();
        assert_eq!(maps.len(), 1);
        assert!(maps[0].last_modified > 1);

        map.title = "Renamed".to_string();
        let maps = store.save_map(&map).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].title, "Renamed");

        let other = MindMap::new();
        let maps = store.save_map(&other).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(store.find_map(&map.id).unwrap().title, "Renamed");
    }

    #[test]
    fn saved_tree_round_trips() {
        let (_dir, store) = store();
        let mut map = MindMap::new();
        let mut child = Node::fresh("child");
        child.manual_x = Some(120.5);
        child.manual_y = Some(80.0);
        let child_id = child.id.clone();
        map.root = Arc::new(Node::clone(&map.root).with_child(child));
        store.save_map(&map).unwrap();

        let loaded = store.find_map(&map.id).unwrap();
        assert_eq!(loaded.root, map.root);
        assert_eq!(
            loaded.root.find(&child_id).unwrap().manual_position(),
            Some((120.5, 80.0))
        );
    }

    #[test]
    fn deleting_active_map_clears_active_id() {
        let (_dir, store) = store();
        let first = MindMap::new();
        let second = MindMap::new();
        store.save_map(&first).unwrap();
        store.save_map(&second).unwrap();

        store.set_active_id(Some(second.id.as_str())).unwrap();
        store.delete_map(&first.id).unwrap();
        assert_eq!(store.active_id().as_deref(), Some(second.id.as_str()));

        let remaining = store.delete_map(&second.id).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(store.active_id(), None);
    }

    #[test]
    fn load_active_falls_back_to_most_recent() {
        let (_dir, store) = store();
        let mut older = MindMap::new();
        older.title = "older".to_string();
        store.save_map(&older).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut newer = MindMap::new();
        newer.title = "newer".to_string();
        store.save_map(&newer).unwrap();

        assert_eq!(store.load_active().unwrap().title, "newer");
        store.set_active_id(Some(older.id.as_str())).unwrap();
        assert_eq!(store.load_active().unwrap().title, "older");
        store.set_active_id(Some("gone")).unwrap();
        assert_eq!(store.load_active().unwrap().title, "newer");
    }
}
