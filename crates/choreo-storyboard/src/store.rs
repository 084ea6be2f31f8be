//! In-memory storyboard node store.
//!
//! Nodes are partitioned by scene. Each scene has its own lock, so mutations
//! within one scene are serialized while different scenes proceed
//! independently. A node id index maps ids to their (immutable) scene.
//!
//! Positions are never renumbered: deleting a node leaves gaps, and appending
//! after a delete can produce duplicate positions. Listings break ties by
//! insertion order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metrics::counter;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use choreo_models::{NodeDraft, NodeId, NodePatch, SceneNode};

use crate::error::{StoryboardError, StoryboardResult};

const NODES_CREATED_TOTAL: &str = "choreo_storyboard_nodes_created_total";
const NODES_DELETED_TOTAL: &str = "choreo_storyboard_nodes_deleted_total";

#[derive(Debug)]
struct StoredNode {
    /// Global insertion sequence, used as the ordering tie-breaker
    seq: u64,
    node: SceneNode,
}

#[derive(Debug, Default)]
struct SceneBook {
    /// Insertion order
    nodes: Vec<StoredNode>,
}

impl SceneBook {
    fn find_mut(&mut self, id: &NodeId) -> Option<&mut StoredNode> {
        self.nodes.iter_mut().find(|n| &n.node.id == id)
    }
}

type SceneHandle = Arc<Mutex<SceneBook>>;

/// Ordered storyboard nodes keyed by id, partitioned by scene.
#[derive(Debug, Default)]
pub struct StoryboardStore {
    scenes: RwLock<HashMap<String, SceneHandle>>,
    index: RwLock<HashMap<NodeId, String>>,
    next_seq: AtomicU64,
}

impl StoryboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn scene(&self, scene_id: &str) -> Option<SceneHandle> {
        self.scenes.read().await.get(scene_id).cloned()
    }

    async fn scene_or_insert(&self, scene_id: &str) -> SceneHandle {
        if let Some(scene) = self.scene(scene_id).await {
            return scene;
        }

        let mut scenes = self.scenes.write().await;
        Arc::clone(scenes.entry(scene_id.to_string()).or_default())
    }

    async fn scene_of(&self, id: &NodeId) -> StoryboardResult<SceneHandle> {
        let scene_id = self
            .index
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoryboardError::not_found(id.as_str()))?;

        self.scene(&scene_id)
            .await
            .ok_or_else(|| StoryboardError::not_found(id.as_str()))
    }

    /// Create a node. Without an explicit position the node gets the scene's
    /// current node count.
    pub async fn create(&self, draft: NodeDraft) -> StoryboardResult<SceneNode> {
        draft.validate_draft()?;

        let scene = self.scene_or_insert(&draft.scene_id).await;
        let mut book = scene.lock().await;

        let position = draft.position.unwrap_or(book.nodes.len() as i64);
        let node = SceneNode::from_draft(draft, position);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        self.index
            .write()
            .await
            .insert(node.id.clone(), node.scene_id.clone());
        book.nodes.push(StoredNode {
            seq,
            node: node.clone(),
        });

        counter!(NODES_CREATED_TOTAL).increment(1);
        debug!(
            node_id = %node.id,
            scene_id = %node.scene_id,
            position = node.position,
            "Created storyboard node"
        );

        Ok(node)
    }

    pub async fn get(&self, id: &NodeId) -> StoryboardResult<SceneNode> {
        let scene = self.scene_of(id).await?;
        let book = scene.lock().await;
        book.nodes
            .iter()
            .find(|n| &n.node.id == id)
            .map(|n| n.node.clone())
            .ok_or_else(|| StoryboardError::not_found(id.as_str()))
    }

    /// Nodes of one scene, or of every scene, ascending by position.
    ///
    /// The cross-scene listing orders by position value alone; equal positions
    /// from different scenes interleave in insertion order.
    pub async fn list(&self, scene_id: Option<&str>) -> Vec<SceneNode> {
        let handles: Vec<SceneHandle> = match scene_id {
            Some(id) => self.scene(id).await.into_iter().collect(),
            None => self.scenes.read().await.values().cloned().collect(),
        };

        let mut entries: Vec<(i64, u64, SceneNode)> = Vec::new();
        for handle in handles {
            let book = handle.lock().await;
            entries.extend(
                book.nodes
                    .iter()
                    .map(|n| (n.node.position, n.seq, n.node.clone())),
            );
        }

        entries.sort_by_key(|(position, seq, _)| (*position, *seq));
        entries.into_iter().map(|(_, _, node)| node).collect()
    }

    /// Number of nodes currently in a scene.
    pub async fn scene_len(&self, scene_id: &str) -> usize {
        match self.scene(scene_id).await {
            Some(scene) => scene.lock().await.nodes.len(),
            None => 0,
        }
    }

    /// Overwrite the fields present in `patch`. `updated_at` always advances.
    pub async fn update(&self, id: &NodeId, patch: NodePatch) -> StoryboardResult<SceneNode> {
        patch.validate_patch()?;

        let scene = self.scene_of(id).await?;
        let mut book = scene.lock().await;
        let stored = book
            .find_mut(id)
            .ok_or_else(|| StoryboardError::not_found(id.as_str()))?;

        stored.node.apply(patch);
        debug!(node_id = %id, position = stored.node.position, "Updated storyboard node");

        Ok(stored.node.clone())
    }

    /// Remove a node. Sibling positions are left untouched.
    pub async fn delete(&self, id: &NodeId) -> StoryboardResult<()> {
        let scene = self.scene_of(id).await?;
        let mut book = scene.lock().await;

        let before = book.nodes.len();
        book.nodes.retain(|n| &n.node.id != id);
        if book.nodes.len() == before {
            return Err(StoryboardError::not_found(id.as_str()));
        }

        self.index.write().await.remove(id);
        counter!(NODES_DELETED_TOTAL).increment(1);
        debug!(node_id = %id, "Deleted storyboard node");

        Ok(())
    }
}
