//! Canvas surface: pointer gestures bound to the editor core
//!
//! [`CanvasSession`] is the single writer of a workflow graph. Each gesture
//! is translated into one store batch; after the batch the session records
//! an undo snapshot, drops a selection whose entity disappeared, and
//! notifies the event sink.

use std::sync::Arc;

use crate::catalog::{DragPayload, NodeTypeCatalog, NodeTypeDescriptor};
use crate::coords::{screen_to_canvas, ScreenPoint, Viewport};
use crate::error::{GraphError, Result};
use crate::events::{emit, EditorEvent, EventSink, NullEventSink};
use crate::ids::{IdGenerator, IdSource};
use crate::insertion::{self, Insertion};
use crate::node_config::NodeConfig;
use crate::selection::{ContextMenu, Selection, SelectionController};
use crate::store::{ApplyReport, GraphChange, GraphStore};
use crate::types::{
    EdgeId, EdgePresentation, GraphEdge, GraphNode, NodeId, Position, WorkflowGraph,
};
use crate::undo::UndoStack;
use crate::validation::validate_connection;

/// Canvas offset applied to a duplicated node
pub const DUPLICATE_OFFSET: f64 = 50.0;

/// Canvas size assumed until the surface reports its own
const DEFAULT_CANVAS_SIZE: (f64, f64) = (1280.0, 720.0);

/// Interactive editing session for one workflow graph
pub struct CanvasSession {
    store: GraphStore,
    selection: SelectionController,
    viewport: Viewport,
    canvas_size: (f64, f64),
    history: UndoStack,
    catalog: Arc<NodeTypeCatalog>,
    ids: Box<dyn IdSource>,
    events: Arc<dyn EventSink>,
}

impl CanvasSession {
    /// An empty canvas using the given catalog
    pub fn new(catalog: Arc<NodeTypeCatalog>) -> Self {
        Self::with_parts(catalog, Box::new(IdGenerator::new()), Arc::new(NullEventSink))
    }

    pub fn with_parts(
        catalog: Arc<NodeTypeCatalog>,
        ids: Box<dyn IdSource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let mut history = UndoStack::default();
        if let Err(e) = history.reset(&WorkflowGraph::new()) {
            log::warn!("Could not record initial undo snapshot: {}", e);
        }
        Self {
            store: GraphStore::new(),
            selection: SelectionController::new(),
            viewport: Viewport::default(),
            canvas_size: DEFAULT_CANVAS_SIZE,
            history,
            catalog,
            ids,
            events,
        }
    }

    pub fn set_event_sink(&mut self, events: Arc<dyn EventSink>) {
        self.events = events;
    }

    // Read access

    pub fn graph(&self) -> &WorkflowGraph {
        self.store.graph()
    }

    pub fn snapshot(&self) -> Arc<WorkflowGraph> {
        self.store.snapshot()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn selection(&self) -> &Selection {
        self.selection.selection()
    }

    pub fn context_menu(&self) -> ContextMenu {
        self.selection.context_menu()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn catalog(&self) -> &NodeTypeCatalog {
        &self.catalog
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // Placement

    /// Drop a dragged palette item at a screen point
    pub fn drop_payload(&mut self, raw: &str, at: ScreenPoint) -> Result<NodeId> {
        let payload = DragPayload::from_json(raw)?;
        let position = screen_to_canvas(at, &self.viewport);
        let config = match self.catalog.find(&payload.subtype) {
            Some(descriptor) => descriptor.instantiate_config(),
            None => {
                log::warn!("Dropped subtype '{}' is not in the catalog", payload.subtype);
                NodeConfig::default_for(&payload.subtype)
            }
        };
        let id = self.ids.node_id();
        let node = GraphNode::new(id.clone(), payload.category, payload.name, position, config);
        self.commit(&[GraphChange::AddNode(node)]);
        Ok(id)
    }

    /// Add a catalog node at the center of the visible canvas
    pub fn add_at_viewport_center(&mut self, subtype: &str) -> Result<NodeId> {
        let descriptor = self.descriptor(subtype)?;
        let center = ScreenPoint::new(self.canvas_size.0 / 2.0, self.canvas_size.1 / 2.0);
        let position = screen_to_canvas(center, &self.viewport);
        let id = self.ids.node_id();
        let node = instantiate(&descriptor, id.clone(), position);
        self.commit(&[GraphChange::AddNode(node)]);
        Ok(id)
    }

    // Selection

    pub fn click_node(&mut self, id: &str) -> Result<()> {
        if !self.graph().contains_node(id) {
            return Err(GraphError::node_not_found(id));
        }
        if self.selection.select_node(id) {
            self.selection_changed();
        }
        Ok(())
    }

    /// Select an edge; the click point becomes the insertion anchor
    pub fn click_edge(&mut self, id: &str, at: ScreenPoint) -> Result<()> {
        if !self.graph().contains_edge(id) {
            return Err(GraphError::edge_not_found(id));
        }
        let anchor = screen_to_canvas(at, &self.viewport);
        if self.selection.select_edge(id, anchor) {
            self.selection_changed();
        }
        Ok(())
    }

    pub fn click_pane(&mut self) {
        if self.selection.clear() {
            self.selection_changed();
        }
    }

    /// Close the edge menu without inserting
    pub fn cancel_edge_menu(&mut self) {
        if self.selection.selection().edge_id().is_some() {
            self.click_pane();
        }
    }

    // Mutation

    /// Finish dragging a node to a canvas position
    pub fn drag_node(&mut self, id: &str, position: Position) -> Result<()> {
        if !self.graph().contains_node(id) {
            return Err(GraphError::node_not_found(id));
        }
        self.commit(&[GraphChange::MoveNode {
            id: id.to_string(),
            position,
        }]);
        Ok(())
    }

    /// Draw a new edge between two nodes
    pub fn connect(&mut self, source: &str, target: &str) -> Result<EdgeId> {
        validate_connection(self.graph(), source, target)?;
        let id = self.ids.edge_id();
        let edge = GraphEdge::new(id.clone(), source, target)
            .with_presentation(EdgePresentation::standard());
        self.commit(&[GraphChange::AddEdge(edge)]);
        log::debug!("Connected {} -> {} as {}", source, target, id);
        Ok(id)
    }

    /// Move an existing edge's endpoints; the edge gets a new id
    pub fn reconnect_edge(&mut self, edge_id: &str, source: &str, target: &str) -> Result<EdgeId> {
        let old = self
            .graph()
            .find_edge(edge_id)
            .cloned()
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;

        let mut without = self.graph().clone();
        without.edges.retain(|e| e.id != edge_id);
        validate_connection(&without, source, target)?;

        let id = self.ids.edge_id();
        let edge = GraphEdge::new(id.clone(), source, target).with_presentation(old.presentation);
        self.commit(&[
            GraphChange::RemoveEdge(edge_id.to_string()),
            GraphChange::AddEdge(edge),
        ]);
        Ok(id)
    }

    /// An edge was dragged off its endpoint and dropped nowhere: remove it
    pub fn abandon_reconnect(&mut self, edge_id: &str) -> ApplyReport {
        self.commit(&[GraphChange::RemoveEdge(edge_id.to_string())])
    }

    /// Delete a node and every edge touching it
    pub fn delete_node(&mut self, id: &str) -> Result<ApplyReport> {
        if !self.graph().contains_node(id) {
            return Err(GraphError::node_not_found(id));
        }
        Ok(self.commit(&[GraphChange::RemoveNode(id.to_string())]))
    }

    pub fn delete_edge(&mut self, id: &str) -> Result<ApplyReport> {
        if !self.graph().contains_edge(id) {
            return Err(GraphError::edge_not_found(id));
        }
        Ok(self.commit(&[GraphChange::RemoveEdge(id.to_string())]))
    }

    /// Delete whatever is selected; returns false when nothing was
    pub fn delete_selection(&mut self) -> bool {
        let change = match self.selection.selection() {
            Selection::None => return false,
            Selection::Node { id } => GraphChange::RemoveNode(id.clone()),
            Selection::Edge { id, .. } => GraphChange::RemoveEdge(id.clone()),
        };
        self.commit(&[change]).changed()
    }

    /// Copy a node next to the original and select the copy
    pub fn duplicate_node(&mut self, id: &str) -> Result<NodeId> {
        let original = self
            .graph()
            .find_node(id)
            .cloned()
            .ok_or_else(|| GraphError::node_not_found(id))?;
        let copy_id = self.ids.node_id();
        let copy = GraphNode {
            id: copy_id.clone(),
            position: original
                .position
                .offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET),
            ..original
        };
        self.commit(&[GraphChange::AddNode(copy)]);
        if self.selection.select_node(copy_id.clone()) {
            self.selection_changed();
        }
        Ok(copy_id)
    }

    /// Replace a node's configuration from its edit form values
    pub fn configure_node(&mut self, id: &str, values: serde_json::Value) -> Result<()> {
        let node = self
            .graph()
            .find_node(id)
            .ok_or_else(|| GraphError::node_not_found(id))?;
        let config = NodeConfig::from_value(node.subtype(), values);
        self.commit(&[GraphChange::ConfigureNode {
            id: id.to_string(),
            config,
        }]);
        Ok(())
    }

    pub fn relabel_node(&mut self, id: &str, label: impl Into<String>) -> Result<()> {
        if !self.graph().contains_node(id) {
            return Err(GraphError::node_not_found(id));
        }
        self.commit(&[GraphChange::RelabelNode {
            id: id.to_string(),
            label: label.into(),
        }]);
        Ok(())
    }

    /// Split the selected edge with a new node of `subtype`
    pub fn insert_on_selected_edge(&mut self, subtype: &str) -> Result<Insertion> {
        let descriptor = self.descriptor(subtype)?;
        if !descriptor.category.accepts_incoming() {
            return Err(GraphError::NotInsertable(subtype.to_string()));
        }
        let inserted = insertion::insert_on_selected_edge(
            &mut self.store,
            &mut self.selection,
            &descriptor,
            self.ids.as_mut(),
        )?;
        self.after_change(&inserted.report);
        self.selection_changed();
        Ok(inserted)
    }

    // Viewport

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_size = (width, height);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn zoom_at(&mut self, anchor: ScreenPoint, factor: f64) {
        self.viewport.zoom_at(anchor, factor);
    }

    // History

    /// Restore the previous graph; returns false when there is none
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo() {
            Some(graph) => {
                self.restore(graph?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo() {
            Some(graph) => {
                self.restore(graph?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the whole graph with a loaded one and start a fresh history
    ///
    /// An inconsistent graph is rejected and the canvas is unchanged.
    pub fn load_graph(&mut self, graph: WorkflowGraph) -> Result<()> {
        let revision = self.store.replace(graph)?;
        self.history.reset(self.store.graph())?;
        self.viewport = Viewport::default();
        if self.selection.clear() {
            self.selection_changed();
        }
        emit(self.events.as_ref(), EditorEvent::GraphChanged { revision });
        log::info!(
            "Loaded graph with {} nodes and {} edges",
            self.graph().nodes.len(),
            self.graph().edges.len()
        );
        Ok(())
    }

    fn restore(&mut self, graph: WorkflowGraph) -> Result<()> {
        let revision = self.store.replace(graph)?;
        if self.selection.reconcile(self.store.graph()) {
            self.selection_changed();
        }
        emit(self.events.as_ref(), EditorEvent::GraphChanged { revision });
        Ok(())
    }

    fn descriptor(&self, subtype: &str) -> Result<NodeTypeDescriptor> {
        self.catalog
            .find(subtype)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNodeType(subtype.to_string()))
    }

    fn commit(&mut self, changes: &[GraphChange]) -> ApplyReport {
        let report = self.store.apply(changes);
        self.after_change(&report);
        report
    }

    fn after_change(&mut self, report: &ApplyReport) {
        if !report.changed() {
            return;
        }
        if let Err(e) = self.history.push(self.store.graph()) {
            log::warn!("Could not record undo snapshot: {}", e);
        }
        if self.selection.reconcile(self.store.graph()) {
            self.selection_changed();
        }
        emit(
            self.events.as_ref(),
            EditorEvent::GraphChanged {
                revision: report.revision,
            },
        );
    }

    fn selection_changed(&self) {
        emit(
            self.events.as_ref(),
            EditorEvent::SelectionChanged {
                selection: self.selection.selection().clone(),
            },
        );
    }
}

fn instantiate(descriptor: &NodeTypeDescriptor, id: NodeId, position: Position) -> GraphNode {
    GraphNode::new(
        id,
        descriptor.category,
        descriptor.label.clone(),
        position,
        descriptor.instantiate_config(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::ids::SequentialIds;
    use crate::types::NodeCategory;
    use crate::validation::ConnectionError;
    use proptest::prelude::*;

    fn session() -> (CanvasSession, Arc<VecEventSink>) {
        let sink = Arc::new(VecEventSink::new());
        let session = CanvasSession::with_parts(
            Arc::new(NodeTypeCatalog::builtin()),
            Box::new(SequentialIds::new()),
            sink.clone(),
        );
        (session, sink)
    }

    fn payload(subtype: &str) -> String {
        NodeTypeCatalog::builtin()
            .find(subtype)
            .unwrap()
            .drag_payload()
            .to_json()
            .unwrap()
    }

    #[test]
    fn test_drop_uses_canvas_coordinates() {
        let (mut s, _) = session();
        s.pan(100.0, 0.0);
        s.zoom_at(ScreenPoint::new(100.0, 0.0), 2.0);

        let id = s.drop_payload(&payload("webhook"), ScreenPoint::new(300.0, 100.0)).unwrap();

        let node = s.graph().find_node(&id).unwrap();
        assert_eq!(node.position, Position::new(100.0, 50.0));
        assert_eq!(node.category, NodeCategory::Trigger);
        assert_eq!(node.label, "Webhook");
        assert_eq!(node.subtype(), "webhook");
    }

    #[test]
    fn test_drop_rejects_garbage() {
        let (mut s, _) = session();
        assert!(s.drop_payload("not json", ScreenPoint::default()).is_err());
        assert!(s.graph().nodes.is_empty());
    }

    #[test]
    fn test_add_at_viewport_center() {
        let (mut s, _) = session();
        s.set_canvas_size(800.0, 600.0);
        let id = s.add_at_viewport_center("delay").unwrap();
        assert_eq!(s.graph().find_node(&id).unwrap().position, Position::new(400.0, 300.0));
        assert!(matches!(
            s.add_at_viewport_center("nope"),
            Err(GraphError::UnknownNodeType(_))
        ));
    }

    #[test]
    fn test_connect_validates() {
        let (mut s, _) = session();
        let t = s.add_at_viewport_center("manual").unwrap();
        let a = s.add_at_viewport_center("delay").unwrap();

        let edge = s.connect(&t, &a).unwrap();
        assert!(s.graph().find_edge(&edge).unwrap().presentation.animated);

        assert!(matches!(
            s.connect(&a, &t),
            Err(GraphError::Connection(ConnectionError::TriggerTarget(_)))
        ));
        assert!(matches!(
            s.connect(&a, &a),
            Err(GraphError::Connection(ConnectionError::SelfLoop(_)))
        ));
        assert_eq!(s.graph().edges.len(), 1);
    }

    #[test]
    fn test_delete_selected_node_clears_selection() {
        let (mut s, sink) = session();
        let a = s.add_at_viewport_center("delay").unwrap();
        let b = s.add_at_viewport_center("slack").unwrap();
        s.connect(&a, &b).unwrap();
        s.click_node(&a).unwrap();
        sink.clear();

        s.delete_node(&a).unwrap();

        assert!(s.selection().is_none());
        assert!(s.graph().edges.is_empty());
        let events = sink.events();
        assert!(events.contains(&EditorEvent::SelectionChanged {
            selection: Selection::None
        }));
        assert!(matches!(events.last(), Some(EditorEvent::GraphChanged { .. })));
    }

    #[test]
    fn test_click_edge_anchor_is_canvas_space() {
        let (mut s, _) = session();
        let a = s.add_at_viewport_center("delay").unwrap();
        let b = s.add_at_viewport_center("slack").unwrap();
        let e = s.connect(&a, &b).unwrap();
        s.pan(-50.0, -50.0);

        s.click_edge(&e, ScreenPoint::new(10.0, 10.0)).unwrap();

        match s.context_menu() {
            ContextMenu::Edge { anchor, .. } => assert_eq!(anchor, Position::new(60.0, 60.0)),
            other => panic!("Expected edge menu, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_on_selected_edge() {
        let (mut s, _) = session();
        let a = s.add_at_viewport_center("http_request").unwrap();
        let b = s.add_at_viewport_center("slack").unwrap();
        let e = s.connect(&a, &b).unwrap();
        s.click_edge(&e, ScreenPoint::new(10.0, 10.0)).unwrap();

        assert!(matches!(
            s.insert_on_selected_edge("webhook"),
            Err(GraphError::NotInsertable(_))
        ));

        let inserted = s.insert_on_selected_edge("delay").unwrap();
        let c = inserted.node_id.as_str();
        assert!(s.graph().has_connection(&a, c));
        assert!(s.graph().has_connection(c, &b));
        assert!(s.graph().find_edge(&e).is_none());
        assert_eq!(s.context_menu(), ContextMenu::Hidden);
    }

    #[test]
    fn test_reconnect_and_abandon() {
        let (mut s, _) = session();
        let a = s.add_at_viewport_center("delay").unwrap();
        let b = s.add_at_viewport_center("slack").unwrap();
        let c = s.add_at_viewport_center("email").unwrap();
        let e = s.connect(&a, &b).unwrap();

        let moved = s.reconnect_edge(&e, &a, &c).unwrap();
        assert!(s.graph().find_edge(&e).is_none());
        assert!(s.graph().has_connection(&a, &c));

        s.abandon_reconnect(&moved);
        assert!(s.graph().edges.is_empty());
    }

    #[test]
    fn test_duplicate_offsets_and_selects_copy() {
        let (mut s, _) = session();
        let a = s.add_at_viewport_center("transform").unwrap();
        s.relabel_node(&a, "Shape").unwrap();

        let copy = s.duplicate_node(&a).unwrap();

        let original = s.graph().find_node(&a).unwrap().clone();
        let dup = s.graph().find_node(&copy).unwrap();
        assert_eq!(dup.position, original.position.offset(50.0, 50.0));
        assert_eq!(dup.label, "Shape");
        assert_eq!(dup.config, original.config);
        assert_eq!(s.selection().node_id(), Some(copy.as_str()));
    }

    #[test]
    fn test_configure_node() {
        let (mut s, _) = session();
        let a = s.add_at_viewport_center("delay").unwrap();
        s.configure_node(&a, serde_json::json!({"seconds": 30})).unwrap();
        assert_eq!(s.graph().find_node(&a).unwrap().config.to_value()["seconds"], 30);
    }

    #[test]
    fn test_undo_redo() {
        let (mut s, _) = session();
        let a = s.add_at_viewport_center("delay").unwrap();
        s.drag_node(&a, Position::new(5.0, 5.0)).unwrap();
        s.click_node(&a).unwrap();

        assert!(s.undo().unwrap());
        assert_ne!(s.graph().find_node(&a).unwrap().position, Position::new(5.0, 5.0));

        assert!(s.undo().unwrap());
        assert!(s.graph().nodes.is_empty());
        assert!(s.selection().is_none());
        assert!(!s.undo().unwrap());

        assert!(s.redo().unwrap());
        assert_eq!(s.graph().nodes.len(), 1);
    }

    #[test]
    fn test_load_rejects_dangling_edges() {
        let (mut s, _) = session();
        s.add_at_viewport_center("delay").unwrap();
        let mut bad = WorkflowGraph::new();
        bad.edges.push(GraphEdge::new("e1", "x", "y"));

        assert!(s.load_graph(bad).is_err());
        assert_eq!(s.graph().nodes.len(), 1);
    }

    #[test]
    fn test_load_rejects_self_loop() {
        let (mut s, _) = session();
        s.add_at_viewport_center("delay").unwrap();
        let mut bad = WorkflowGraph::new();
        bad.nodes.push(s.graph().nodes[0].clone());
        let id = bad.nodes[0].id.clone();
        bad.edges.push(GraphEdge::new("e1", id.as_str(), id.as_str()));

        assert!(matches!(s.load_graph(bad), Err(GraphError::SelfLoop { .. })));
        assert!(s.graph().edges.is_empty());
        assert!(s.can_undo());
    }

    #[test]
    fn test_load_resets_history() {
        let (mut s, _) = session();
        s.add_at_viewport_center("delay").unwrap();
        s.load_graph(WorkflowGraph::new()).unwrap();
        assert!(!s.can_undo());
    }

    fn coordinate() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite", |v| v.is_finite())
    }

    proptest! {
        #[test]
        fn undo_restores_exact_positions(
            x1 in coordinate(),
            y1 in coordinate(),
            x2 in coordinate(),
            y2 in coordinate(),
        ) {
            let (mut s, _) = session();
            let a = s.add_at_viewport_center("delay").unwrap();
            let start = s.graph().find_node(&a).unwrap().position;
            let first = Position::new(x1, y1);
            let second = Position::new(x2, y2);
            prop_assume!(first != start && first != second);

            s.drag_node(&a, first).unwrap();
            s.drag_node(&a, second).unwrap();
            prop_assert!(s.undo().unwrap());

            let restored = s.graph().find_node(&a).unwrap().position;
            prop_assert_eq!(restored.x.to_bits(), x1.to_bits());
            prop_assert_eq!(restored.y.to_bits(), y1.to_bits());

            prop_assert!(s.redo().unwrap());
            prop_assert_eq!(s.graph().find_node(&a).unwrap().position, second);
        }
    }
}
