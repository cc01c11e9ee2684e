use crate::config::LoaderOptions;
use crate::counter::LoadCounter;
use crate::decoder::{AttributeSchema, NodePayloadDecoder, PayloadDecoder, select_decoder};
use crate::hierarchy::{BYTES_PER_ENTRY, ParseHierarchyError, hierarchy_path, parse_hierarchy_chunk};
use crate::metadata::{HierarchyEntry, MalformedDocumentError, Metadata, parse_metadata};
use crate::octree::aabb::{Aabb, BoundingSphere, create_child_aabb, normalize_bounds};
use crate::octree::node::{HierarchyState, NodePayload, OctreeNode, PayloadState};
use crate::octree::snapshot::{OctreeNodeSnapshot, snapshot_from_node};
use crate::octree::{FlatOctree, NodeId};
use crate::resource::{ResourceClient, ResourceError, is_absolute_url, join_relative};
use crate::version::Version;
use bytes::Bytes;
use futures::channel::oneshot;
use futures::task::{Spawn, SpawnError, SpawnExt};
use glam::DVec3;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, Level, debug, span, warn};

#[derive(Error, Debug)]
pub enum LoadOctreeError {
    #[error("Error fetching metadata: {0}")]
    Transport(#[from] ResourceError),

    #[error("Malformed metadata document: {0}")]
    Malformed(#[from] MalformedDocumentError),
}

#[derive(Error, Debug)]
pub enum LoadNodeError {
    #[error("Node does not exist")]
    NodeNotFound,

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Invalid hierarchy chunk: {0}")]
    InvalidHierarchy(#[from] ParseHierarchyError),

    #[error("Inconsistent hierarchy chunk: {0}")]
    InconsistentHierarchy(#[from] MalformedDocumentError),

    #[error("Unable to spawn node load: {0}")]
    Spawn(#[from] SpawnError),

    #[error("Node load was dropped before completing")]
    Canceled,
}

/// What a finished node load hands back to the octree that owns the node.
#[derive(Debug)]
pub struct FetchedNode {
    hierarchy: Option<Bytes>,
    payload: NodePayload,
}

/// Where node files live below the octree directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeLayout {
    /// `<octreeDir>/<name>`
    Flat,
    /// `<octreeDir>/<hierarchyPath>/<name>`, with `.hrc` chunks every `step_size` levels.
    Chunked { step_size: u32 },
}

/// A streamable point cloud: normalized bounds, the payload decoder and the
/// discovered part of its octree.
#[derive(Debug)]
pub struct PotreeOctree {
    url: String,
    octree_dir: String,
    version: Version,
    spacing: f64,
    points: Option<u64>,
    hierarchy_step_size: Option<u32>,
    point_attributes: AttributeSchema,
    projection: Option<String>,
    bounding_box: Aabb,
    tight_bounding_box: Aabb,
    bounding_sphere: BoundingSphere,
    tight_bounding_sphere: BoundingSphere,
    offset: DVec3,
    decoder: PayloadDecoder,
    layout: NodeLayout,
    octree: FlatOctree<OctreeNode>,
    nodes: HashMap<String, NodeId>,
    options: LoaderOptions,
}

/// Loads the metadata document at `url` and hands the octree to `on_complete`.
///
/// Once the octree is built, the root node starts loading on `spawner` and
/// `on_complete` runs without waiting for it. Transport failures are logged
/// and reported as `on_complete(None)`; malformed documents are returned as
/// errors and `on_complete` is not called.
pub async fn load<C, S, F>(
    url: &str,
    client: Arc<C>,
    spawner: &S,
    counter: &LoadCounter,
    options: LoaderOptions,
    on_complete: F,
) -> Result<(), MalformedDocumentError>
where
    C: ResourceClient + 'static,
    S: Spawn + ?Sized,
    F: FnOnce(Option<PotreeOctree>),
{
    let result = {
        let _guard = counter.start();
        PotreeOctree::from_url(url, client.as_ref(), options).await
    };

    match result {
        Ok(mut octree) => {
            let root_id = octree.root_id();
            if let Err(error) = octree.load_node(root_id, &client, spawner, counter) {
                warn!(url, %error, "failed to start loading the root node");
            }
            on_complete(Some(octree));
            Ok(())
        }
        Err(LoadOctreeError::Transport(error)) => {
            warn!(url, %error, "failed to load point cloud metadata");
            on_complete(None);
            Ok(())
        }
        Err(LoadOctreeError::Malformed(error)) => Err(error),
    }
}

impl PotreeOctree {
    /// Fetches and parses the metadata document at `url`.
    pub async fn from_url<C: ResourceClient + ?Sized>(
        url: &str,
        client: &C,
        options: LoaderOptions,
    ) -> Result<Self, LoadOctreeError> {
        let span = span!(Level::DEBUG, "load_metadata", url);

        async move {
            let buf = client.get(url, None).await?;
            debug!(bytes = buf.len(), "fetched metadata document");

            let metadata = parse_metadata(&buf)?;
            Ok::<_, LoadOctreeError>(Self::from_metadata(url, metadata, options)?)
        }
        .instrument(span)
        .await
    }

    /// Builds the octree described by an already parsed metadata document.
    ///
    /// Up to `legacy_hierarchy_max_version` the whole hierarchy listed in the
    /// document is built; newer documents only yield the root, whose
    /// descendants are discovered through hierarchy chunks.
    pub fn from_metadata(
        url: &str,
        metadata: Metadata,
        options: LoaderOptions,
    ) -> Result<Self, MalformedDocumentError> {
        let version: Version = metadata.version.parse()?;

        let octree_dir = if is_absolute_url(&metadata.octree_dir) {
            metadata.octree_dir.clone()
        } else {
            join_relative(url, &metadata.octree_dir)
        };

        let bounds = normalize_bounds(
            metadata.bounding_box.into(),
            metadata.tight_bounding_box.map(Aabb::from),
        );

        let hierarchy_step_size = metadata.hierarchy_step_size.filter(|step| *step > 0);
        let layout = if version.equal_or_higher(options.hierarchy_path_min_version) {
            let step_size =
                hierarchy_step_size.ok_or(MalformedDocumentError::MissingField("hierarchyStepSize"))?;
            NodeLayout::Chunked { step_size }
        } else {
            NodeLayout::Flat
        };

        let legacy = version.up_to(options.legacy_hierarchy_max_version);

        let root_entry = match metadata.hierarchy.first() {
            Some(HierarchyEntry(name, _)) if *name != options.root_name => {
                return Err(MalformedDocumentError::InvalidNodeName(name.clone()));
            }
            entry => entry,
        };
        let root_num_points = if version.up_to(options.root_point_count_max_version) {
            let HierarchyEntry(_, num_points) = root_entry.ok_or(MalformedDocumentError::EmptyHierarchy)?;
            Some(*num_points)
        } else {
            root_entry.map(|HierarchyEntry(_, num_points)| *num_points)
        };

        let root = OctreeNode {
            name: options.root_name.clone(),
            bounding_box: bounds.bounding_box,
            spacing: metadata.spacing,
            level: 0,
            num_points: root_num_points,
            has_children: true,
            hierarchy: if legacy {
                HierarchyState::Discovered
            } else {
                HierarchyState::Undiscovered
            },
            ..Default::default()
        };

        let (decoder, point_attributes) = select_decoder(
            &metadata.point_attributes,
            version,
            bounds.bounding_box,
            metadata.scale,
        )?;

        let octree = FlatOctree::with_root(root);
        let nodes = HashMap::from([(options.root_name.clone(), octree.root_id())]);

        let mut this = Self {
            url: url.to_string(),
            octree_dir,
            version,
            spacing: metadata.spacing,
            points: metadata.points,
            hierarchy_step_size,
            point_attributes,
            projection: metadata.projection,
            bounding_box: bounds.bounding_box,
            tight_bounding_box: bounds.tight_bounding_box,
            bounding_sphere: bounds.bounding_box.bounding_sphere(),
            tight_bounding_sphere: bounds.tight_bounding_box.bounding_sphere(),
            offset: bounds.offset,
            decoder,
            layout,
            octree,
            nodes,
            options,
        };

        if legacy {
            let entries = metadata.hierarchy.get(1..).unwrap_or_default();
            this.build_listed_hierarchy(entries)?;
        }

        debug!(
            url,
            %version,
            nodes = this.octree.len(),
            "built octree index"
        );

        Ok(this)
    }

    /// Builds the nodes of a flat `[name, numPoints]` list, parents first.
    fn build_listed_hierarchy(&mut self, entries: &[HierarchyEntry]) -> Result<(), MalformedDocumentError> {
        self.octree.reserve(entries.len());

        for HierarchyEntry(name, num_points) in entries {
            let (parent_name, index) = split_node_name(name)?;
            let parent_id = self.parent_id(name, parent_name)?;

            self.insert_child(
                parent_id,
                index,
                name.clone(),
                Some(*num_points),
                HierarchyState::Discovered,
            )?;
        }

        Ok(())
    }

    fn parent_id(&self, name: &str, parent_name: &str) -> Result<NodeId, MalformedDocumentError> {
        self.nodes
            .get(parent_name)
            .copied()
            .ok_or_else(|| MalformedDocumentError::MissingParent {
                name: name.to_string(),
                parent: parent_name.to_string(),
            })
    }

    fn insert_child(
        &mut self,
        parent_id: NodeId,
        index: usize,
        name: String,
        num_points: Option<u64>,
        hierarchy: HierarchyState,
    ) -> Result<NodeId, MalformedDocumentError> {
        if self.nodes.contains_key(&name) {
            return Err(MalformedDocumentError::DuplicateNode(name));
        }

        let parent = self
            .octree
            .node(parent_id)
            .ok_or_else(|| MalformedDocumentError::MissingParent {
                name: name.clone(),
                parent: String::new(),
            })?;

        let level = parent.level + 1;
        let node = OctreeNode {
            name: name.clone(),
            bounding_box: create_child_aabb(&parent.bounding_box, index),
            spacing: self.spacing / 2_f64.powi(level as i32),
            level,
            num_points,
            hierarchy,
            parent: Some(parent_id),
            ..Default::default()
        };

        let node_id = self.octree.insert(node);
        if let Some(parent) = self.octree.node_mut(parent_id) {
            parent.children[index] = Some(node_id);
            parent.has_children = true;
        }
        self.nodes.insert(name, node_id);

        Ok(node_id)
    }

    /// Adds the nodes described by the hierarchy chunk of `node_id`.
    fn apply_hierarchy_chunk(&mut self, node_id: NodeId, buf: &[u8]) -> Result<(), LoadNodeError> {
        let name = self
            .octree
            .node(node_id)
            .ok_or(LoadNodeError::NodeNotFound)?
            .name
            .clone();

        let mut chunk = parse_hierarchy_chunk(&name, buf)?.into_iter();
        self.octree.reserve(buf.len() / BYTES_PER_ENTRY);

        if let Some(first) = chunk.next() {
            let node = self.octree.node_mut(node_id).ok_or(LoadNodeError::NodeNotFound)?;
            node.num_points = Some(first.num_points as u64);
            if first.expanded || first.child_mask == 0 {
                node.hierarchy = HierarchyState::Discovered;
            }
        }

        for chunk_node in chunk {
            let (parent_name, index) = split_node_name(&chunk_node.name)?;
            let parent_id = self.parent_id(&chunk_node.name, parent_name)?;

            let hierarchy = if chunk_node.expanded || chunk_node.child_mask == 0 {
                HierarchyState::Discovered
            } else {
                HierarchyState::Undiscovered
            };

            let child_id = self.insert_child(
                parent_id,
                index,
                chunk_node.name,
                Some(chunk_node.num_points as u64),
                hierarchy,
            )?;

            if let Some(child) = self.octree.node_mut(child_id) {
                child.has_children = chunk_node.child_mask != 0;
            }
        }

        debug!(name = %name, nodes = self.octree.len(), "applied hierarchy chunk");

        Ok(())
    }

    /// Node file path of `node`, without extension.
    pub fn node_url(&self, node: &OctreeNode) -> String {
        match self.layout {
            NodeLayout::Flat => format!("{}/{}", self.octree_dir, node.name),
            NodeLayout::Chunked { step_size } => format!(
                "{}/{}/{}",
                self.octree_dir,
                hierarchy_path(&node.name, &self.options.root_name, step_size),
                node.name
            ),
        }
    }

    /// The hierarchy chunk to fetch before the points of `node`, if one is due.
    pub fn hierarchy_chunk_url(&self, node: &OctreeNode) -> Option<String> {
        match self.layout {
            NodeLayout::Chunked { step_size }
                if node.level % step_size == 0
                    && node.has_children
                    && node.hierarchy == HierarchyState::Undiscovered =>
            {
                Some(format!("{}.hrc", self.node_url(node)))
            }
            _ => None,
        }
    }

    /// Starts loading `node_id` on `spawner` without waiting for it.
    ///
    /// Returns `false` if the node is already loading or loaded, or if
    /// `counter` already tracks `max_nodes_loading` loads. Completed loads are
    /// collected by [`PotreeOctree::poll_loads`].
    pub fn load_node<C, S>(
        &mut self,
        node_id: NodeId,
        client: &Arc<C>,
        spawner: &S,
        counter: &LoadCounter,
    ) -> Result<bool, LoadNodeError>
    where
        C: ResourceClient + 'static,
        S: Spawn + ?Sized,
    {
        let node = self.octree.node(node_id).ok_or(LoadNodeError::NodeNotFound)?;

        if matches!(node.payload, PayloadState::Loading(_) | PayloadState::Loaded(_)) {
            return Ok(false);
        }

        if counter.in_flight() >= self.options.max_nodes_loading {
            debug!(name = %node.name, in_flight = counter.in_flight(), "too many loads in flight");
            return Ok(false);
        }

        let hierarchy_url = self.hierarchy_chunk_url(node);
        let payload_url = self.decoder.payload_url(&self.node_url(node));
        let span = span!(Level::DEBUG, "load_node", name = %node.name);

        let (tx, rx) = oneshot::channel();
        let guard = counter.start();
        let client = Arc::clone(client);

        spawner.spawn(
            async move {
                let result = fetch_node(client.as_ref(), hierarchy_url, payload_url).await;
                if let Err(error) = &result {
                    warn!(%error, "node load failed");
                }
                let _ = tx.send(result);
                drop(guard);
            }
            .instrument(span),
        )?;

        if let Some(node) = self.octree.node_mut(node_id) {
            node.payload = PayloadState::Loading(rx);
        }

        Ok(true)
    }

    /// Collects the result of a finished load of `node_id`.
    ///
    /// Returns `true` if the load finished since the last poll.
    pub fn poll_node(&mut self, node_id: NodeId) -> Result<bool, LoadNodeError> {
        let fetched = {
            let node = self
                .octree
                .node_mut(node_id)
                .ok_or(LoadNodeError::NodeNotFound)?;

            let PayloadState::Loading(receiver) = &mut node.payload else {
                return Ok(false);
            };

            match receiver.try_recv() {
                Ok(None) => return Ok(false),
                Ok(Some(result)) => result,
                Err(oneshot::Canceled) => Err(LoadNodeError::Canceled),
            }
        };

        let state = match fetched.and_then(|fetched| self.apply_fetched(node_id, fetched)) {
            Ok(payload) => PayloadState::Loaded(payload),
            Err(error) => PayloadState::Failed(error),
        };

        let node = self
            .octree
            .node_mut(node_id)
            .ok_or(LoadNodeError::NodeNotFound)?;
        node.payload = state;

        Ok(true)
    }

    /// Collects every finished load, returning the nodes that finished.
    pub fn poll_loads(&mut self) -> Vec<NodeId> {
        let loading: Vec<NodeId> = self
            .octree
            .iter()
            .filter(|(_, node)| node.is_loading())
            .map(|(node_id, _)| node_id)
            .collect();

        loading
            .into_iter()
            .filter(|node_id| matches!(self.poll_node(*node_id), Ok(true)))
            .collect()
    }

    fn apply_fetched(&mut self, node_id: NodeId, fetched: FetchedNode) -> Result<NodePayload, LoadNodeError> {
        if let Some(hierarchy) = &fetched.hierarchy {
            self.apply_hierarchy_chunk(node_id, hierarchy)?;
        }
        Ok(fetched.payload)
    }

    /// Takes a snapshot of the currently discovered hierarchy.
    pub fn hierarchy_snapshot(&self) -> OctreeNodeSnapshot {
        snapshot_from_node(&self.octree, self.octree.root_id()).unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Directory holding node files and hierarchy chunks.
    pub fn octree_dir(&self) -> &str {
        &self.octree_dir
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Total point count declared by the document, if any.
    pub fn points(&self) -> Option<u64> {
        self.points
    }

    pub fn hierarchy_step_size(&self) -> Option<u32> {
        self.hierarchy_step_size
    }

    pub fn point_attributes(&self) -> &AttributeSchema {
        &self.point_attributes
    }

    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    /// Bounding box in normalized coordinates; add [`Self::offset`] for world coordinates.
    pub fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }

    pub fn tight_bounding_box(&self) -> &Aabb {
        &self.tight_bounding_box
    }

    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }

    pub fn tight_bounding_sphere(&self) -> &BoundingSphere {
        &self.tight_bounding_sphere
    }

    pub fn offset(&self) -> DVec3 {
        self.offset
    }

    pub fn decoder(&self) -> &PayloadDecoder {
        &self.decoder
    }

    pub fn octree(&self) -> &FlatOctree<OctreeNode> {
        &self.octree
    }

    pub fn root_id(&self) -> NodeId {
        self.octree.root_id()
    }

    pub fn root(&self) -> &OctreeNode {
        self.octree.root()
    }

    pub fn node(&self, node_id: NodeId) -> Option<&OctreeNode> {
        self.octree.node(node_id)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&OctreeNode> {
        self.node_id(name).and_then(|node_id| self.octree.node(node_id))
    }

    /// Names of every indexed node.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

/// Splits `r0123` into its parent name `r012` and octant `3`.
fn split_node_name(name: &str) -> Result<(&str, usize), MalformedDocumentError> {
    let index = name
        .chars()
        .last()
        .and_then(|c| c.to_digit(8))
        .ok_or_else(|| MalformedDocumentError::InvalidNodeName(name.to_string()))?;

    Ok((&name[..name.len() - 1], index as usize))
}

async fn fetch_node<C: ResourceClient + ?Sized>(
    client: &C,
    hierarchy_url: Option<String>,
    payload_url: String,
) -> Result<FetchedNode, LoadNodeError> {
    let hierarchy = match hierarchy_url {
        Some(url) => Some(Bytes::from(client.get(&url, None).await?)),
        None => None,
    };

    let bytes = client.get(&payload_url, None).await?;
    debug!(url = %payload_url, bytes = bytes.len(), "fetched node payload");

    Ok(FetchedNode {
        hierarchy,
        payload: NodePayload {
            url: payload_url,
            bytes: Bytes::from(bytes),
        },
    })
}
