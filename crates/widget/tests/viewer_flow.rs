//! End-to-end controller flows over an in-process channel.

use std::sync::{Arc, Mutex};

use cadview_comm::{ChannelComm, ChannelCommHandle, Comm, CommError};
use cadview_config::{Control, DisplayConfig, PayloadEncoding, ShowOptions};
use cadview_ipc::{
    AnimationTrack, CameraPreset, ControllerToViewer, CustomContent, Envelope, Geometry, Leaf,
    NdArray, PathElement, ShapeNode, Tab, TrackAction, TrackValue, ValidationError,
    ViewerToController, Visibility, VisibilityMap,
};
use cadview_widget::{CadViewer, DEFAULT_QUATERNION, ViewerEvent, WidgetError};
use serde_json::{Map, Value, json};

fn cube(id: &str) -> ShapeNode {
    let points = NdArray::from_points(&[[-0.5, -0.5, -0.5], [0.5, 0.5, 0.5]]);
    ShapeNode::leaf(id, "cube", Leaf::new(Geometry::Vertices(points)))
}

fn scene() -> ShapeNode {
    ShapeNode::group("/top", "top", vec![cube("/top/a"), cube("/top/b")])
}

fn all_visible() -> VisibilityMap {
    ["/top/a", "/top/b"]
        .into_iter()
        .map(|id| (id.to_string(), Visibility::VISIBLE))
        .collect()
}

fn viewer_with(encoding: PayloadEncoding) -> (CadViewer<ChannelComm>, ChannelCommHandle) {
    let (comm, handle) = ChannelComm::new();
    let config = DisplayConfig {
        encoding,
        ..Default::default()
    };
    (CadViewer::new(config, comm).unwrap(), handle)
}

fn viewer() -> (CadViewer<ChannelComm>, ChannelCommHandle) {
    viewer_with(PayloadEncoding::Binary)
}

fn shown(options: ShowOptions) -> (CadViewer<ChannelComm>, ChannelCommHandle) {
    let (mut viewer, handle) = viewer();
    viewer
        .add_shapes(scene(), all_visible(), Vec::new(), options)
        .unwrap();
    handle.drain();
    (viewer, handle)
}

fn route(call: &Envelope) -> (Vec<PathElement>, Option<Vec<Value>>) {
    match call.method_call() {
        Some(CustomContent::RemoteMethodCall { method, args, .. }) => {
            (method.clone(), args.clone())
        }
        None => panic!("expected a remote method call, got {call:?}"),
    }
}

fn update(key: &str, value: Value) -> Map<String, Value> {
    let mut state = Map::new();
    state.insert(key.to_string(), value);
    state
}

#[test]
fn test_add_shapes_sends_one_batch() {
    let (mut viewer, handle) = viewer();
    viewer
        .add_shapes(scene(), all_visible(), Vec::new(), ShowOptions::default())
        .unwrap();

    let sent = handle.drain();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].state().unwrap()["initialize"], json!(true));
    assert_eq!(sent[2].state().unwrap()["initialize"], json!(false));

    let batch = sent[1].state().unwrap();
    for key in [
        "shapes",
        "states",
        "control",
        "reset_camera",
        "position",
        "quaternion",
        "target",
        "zoom",
        "position0",
        "quaternion0",
        "target0",
        "zoom0",
    ] {
        assert!(batch.contains_key(key), "missing {key}");
    }
    assert_eq!(batch["states"]["/top/a"], json!([1, 1]));
    assert_eq!(batch["control"], json!("trackball"));
    assert_eq!(batch["zoom"], json!(1.0));
    assert_eq!(batch["target"], json!([0.0, 0.0, 0.0]));
}

#[test]
fn test_binary_buffers_travel_out_of_band() {
    let (mut viewer, handle) = viewer();
    viewer
        .add_shapes(scene(), all_visible(), Vec::new(), ShowOptions::default())
        .unwrap();

    let sent = handle.drain();
    assert_eq!(sent[1].buffers.len(), 2);
    match &sent[1].message {
        ControllerToViewer::Update { buffer_paths, .. } => {
            assert_eq!(buffer_paths.len(), 2);
            assert!(buffer_paths.iter().all(|p| p[0] == PathElement::from("shapes")));
            assert!(
                buffer_paths
                    .iter()
                    .all(|p| p.last() == Some(&PathElement::from("buffer")))
            );
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[test]
fn test_compressed_payload_is_inline() {
    let (mut viewer, handle) = viewer_with(PayloadEncoding::Compressed);
    viewer
        .add_shapes(scene(), all_visible(), Vec::new(), ShowOptions::default())
        .unwrap();

    let sent = handle.drain();
    assert!(sent[1].buffers.is_empty());
    let shapes = &sent[1].state().unwrap()["shapes"];
    let block = &shapes["parts"][0]["shape"];
    assert_eq!(block[0], json!("_f32"));
    assert_eq!(block[1], json!([2, 3]));
}

#[test]
fn test_default_camera_for_centered_cube() {
    let (viewer, _handle) = shown(ShowOptions::default());
    let camera = viewer.camera().unwrap();
    for component in camera.position {
        assert!((component - 2.75).abs() < 1e-9, "{component}");
    }
    assert_eq!(camera.quaternion, Some(DEFAULT_QUATERNION));
    assert_eq!(viewer.state().position0, Some(camera.position));
}

#[test]
fn test_explicit_camera_is_kept() {
    let (viewer, _handle) = shown(ShowOptions {
        position: Some([10.0, 0.0, 0.0]),
        quaternion: Some([0.0, 0.0, 0.0, 1.0]),
        zoom: Some(2.0),
        ..Default::default()
    });
    assert_eq!(viewer.position(), Some([10.0, 0.0, 0.0]));
    assert_eq!(viewer.quaternion(), Some([0.0, 0.0, 0.0, 1.0]));
    assert_eq!(viewer.zoom(), Some(2.0));
}

#[test]
fn test_camera_kept_without_reset() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    let before = viewer.camera().unwrap();
    viewer.set_zoom(3.0).unwrap();
    handle.drain();

    viewer
        .add_shapes(
            scene(),
            all_visible(),
            Vec::new(),
            ShowOptions {
                reset_camera: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let sent = handle.drain();
    let batch = sent[1].state().unwrap();
    assert_eq!(batch["reset_camera"], json!(false));
    assert_eq!(batch["zoom"], json!(3.0));
    assert!(!batch.contains_key("position0"));
    assert_eq!(viewer.position(), Some(before.position));
}

#[test]
fn test_control_change_resets_camera() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    viewer
        .add_shapes(
            scene(),
            all_visible(),
            Vec::new(),
            ShowOptions {
                control: Some(Control::Orbit),
                reset_camera: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let sent = handle.drain();
    let batch = sent[1].state().unwrap();
    assert_eq!(batch["reset_camera"], json!(true));
    assert_eq!(batch["quaternion"], Value::Null);
    assert!(batch.contains_key("position0"));
    assert!(!batch.contains_key("quaternion0"));
    assert_eq!(viewer.control(), Some(Control::Orbit));
    assert_eq!(viewer.quaternion(), None);
}

#[test]
fn test_invalid_camera_options_send_nothing() {
    let (mut viewer, handle) = viewer();
    let result = viewer.add_shapes(
        scene(),
        all_visible(),
        Vec::new(),
        ShowOptions {
            control: Some(Control::Orbit),
            quaternion: Some([0.0, 0.0, 0.0, 1.0]),
            ..Default::default()
        },
    );
    assert!(matches!(
        result,
        Err(WidgetError::Validation(ValidationError::QuaternionWithOrbit))
    ));

    let result = viewer.add_shapes(
        scene(),
        all_visible(),
        Vec::new(),
        ShowOptions {
            position: Some([1.0, 1.0, 1.0]),
            ..Default::default()
        },
    );
    assert!(matches!(
        result,
        Err(WidgetError::Validation(
            ValidationError::PositionWithoutQuaternion
        ))
    ));
    assert!(handle.drain().is_empty());
}

#[test]
fn test_empty_scene_rejected() {
    let (mut viewer, handle) = viewer();
    let result = viewer.add_shapes(
        ShapeNode::group("/empty", "empty", Vec::new()),
        VisibilityMap::new(),
        Vec::new(),
        ShowOptions::default(),
    );
    assert!(matches!(
        result,
        Err(WidgetError::Validation(ValidationError::EmptyScene))
    ));
    assert!(handle.drain().is_empty());
}

#[test]
fn test_state_key_must_be_leaf() {
    let (mut viewer, handle) = viewer();
    let mut states = all_visible();
    states.insert("/top".into(), Visibility::VISIBLE);
    let result = viewer.add_shapes(scene(), states, Vec::new(), ShowOptions::default());
    assert!(matches!(
        result,
        Err(WidgetError::Validation(ValidationError::UnknownStateKey(_)))
    ));
    assert!(handle.drain().is_empty());
}

#[test]
fn test_update_states() {
    let (mut viewer, handle) = shown(ShowOptions::default());

    let mut patch = VisibilityMap::new();
    patch.insert("/top/b".into(), Visibility::new(false, true));
    viewer.update_states(patch).unwrap();

    let sent = handle.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].state().unwrap()["state_updates"]["/top/b"], json!([0, 1]));
    assert_eq!(viewer.state().states["/top/b"], Visibility::new(false, true));
    assert_eq!(viewer.state().states["/top/a"], Visibility::VISIBLE);
}

#[test]
fn test_rejected_patch_leaves_state_unchanged() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    let before = viewer.state().states.clone();

    let mut patch = VisibilityMap::new();
    patch.insert("/top/a".into(), Visibility::new(false, false));
    patch.insert("/nowhere".into(), Visibility::new(false, false));
    assert!(viewer.update_states(patch).is_err());

    assert!(handle.drain().is_empty());
    assert_eq!(viewer.state().states, before);
}

#[test]
fn test_rotation_needs_matching_control() {
    let (mut viewer, handle) = shown(ShowOptions::default());

    let id = viewer.rotate_x(30.0).unwrap();
    let sent = handle.drain();
    let (method, args) = route(&sent[0]);
    assert_eq!(
        method,
        vec![
            PathElement::from("viewer"),
            "controls".into(),
            "rotateX".into()
        ]
    );
    assert_eq!(args, Some(vec![json!(30.0)]));
    assert_eq!(id, 1);

    assert!(matches!(
        viewer.rotate_up(10.0),
        Err(WidgetError::ControlMismatch {
            operation: "rotate_up",
            required: Control::Orbit
        })
    ));
    assert!(handle.drain().is_empty());
}

#[test]
fn test_quaternion_rejected_under_orbit() {
    let (mut viewer, handle) = shown(ShowOptions {
        control: Some(Control::Orbit),
        ..Default::default()
    });
    assert!(viewer.set_quaternion([0.0, 0.0, 0.0, 1.0]).is_err());
    assert!(viewer.rotate_left(15.0).is_ok());
    assert!(viewer.rotate_z(15.0).is_err());
    assert_eq!(handle.drain().len(), 1);
}

#[test]
fn test_set_camera_updates_view() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    viewer.set_camera(CameraPreset::Top).unwrap();

    let sent = handle.drain();
    assert_eq!(sent.len(), 2);
    let (method, args) = route(&sent[0]);
    assert_eq!(method.last(), Some(&PathElement::from("presetCamera")));
    assert_eq!(args, Some(vec![json!("top")]));
    let (method, args) = route(&sent[1]);
    assert_eq!(method.last(), Some(&PathElement::from("update")));
    assert_eq!(args, Some(vec![]));
}

#[test]
fn test_tabs_and_animation_commands() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    viewer.select_clipping().unwrap();
    assert_eq!(viewer.state().tab, Tab::Clip);
    viewer.pause().unwrap();
    viewer.export_png("view.png").unwrap();

    let sent = handle.drain();
    assert_eq!(sent[0].state().unwrap()["tab"], json!("clip"));
    let (method, args) = route(&sent[1]);
    assert_eq!(method, vec![PathElement::from("viewer"), "controlAnimation".into()]);
    assert_eq!(args, Some(vec![json!("pause")]));
    let (method, args) = route(&sent[2]);
    assert_eq!(method, vec![PathElement::from("saveAsPng")]);
    assert_eq!(args, Some(vec![json!("view.png")]));
}

#[test]
fn test_animate_sends_tracks_then_starts() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    let track = AnimationTrack::new(
        "/top/a",
        TrackAction::RotateZ,
        vec![0.0, 1.0],
        vec![TrackValue::Scalar(0.0), TrackValue::Scalar(90.0)],
    )
    .unwrap();
    viewer.add_track(track).unwrap();
    viewer.animate(2.0).unwrap();

    let sent = handle.drain();
    assert_eq!(sent.len(), 2);
    let state = sent[0].state().unwrap();
    assert_eq!(state["tracks"], json!([["/top/a", "rz", [0.0, 1.0], [0.0, 90.0]]]));
    assert_eq!(state["animation_speed"], json!(2.0));
    let (method, args) = route(&sent[1]);
    assert_eq!(method, vec![PathElement::from("animate")]);
    assert_eq!(args, None);
}

#[test]
fn test_track_for_unknown_object_rejected() {
    let (mut viewer, _handle) = shown(ShowOptions::default());
    let track = AnimationTrack::new(
        "/other",
        TrackAction::Translate,
        vec![0.0],
        vec![TrackValue::from([0.0, 0.0, 1.0])],
    )
    .unwrap();
    assert!(matches!(
        viewer.add_track(track),
        Err(WidgetError::Validation(ValidationError::UnknownTrackPath(_)))
    ));
    assert!(viewer.tracks().is_empty());

    // a group path covers its leaves
    let track = AnimationTrack::new(
        "/top",
        TrackAction::TranslateX,
        vec![0.0],
        vec![TrackValue::Scalar(1.0)],
    )
    .unwrap();
    assert!(viewer.add_track(track).is_ok());
}

#[test]
fn test_poll_routes_file_result() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    let received = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::clone(&received);
    viewer.set_byte_sink(move |name, bytes| {
        store.lock().unwrap().push((name.to_string(), bytes));
    });

    let result = json!({"filename": "shot.png", "src": "data:image/png;base64,AQID"});
    handle.send_update(update("result", json!(result.to_string())));
    let events = viewer.poll().unwrap();

    assert!(
        events
            .iter()
            .any(|e| matches!(e, ViewerEvent::ResultReceived(_)))
    );
    assert_eq!(received.lock().unwrap()[0], ("shot.png".to_string(), vec![1, 2, 3]));
    assert_eq!(viewer.state().result, None);
    let sent = handle.drain();
    assert_eq!(sent[0].state().unwrap()["result"], Value::Null);
}

#[test]
fn test_poll_emits_pick() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    let picks = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&picks);
    viewer
        .events()
        .subscribe_kind(cadview_widget::EventKind::Picked, move |_| {
            *seen.lock().unwrap() += 1;
        });

    handle.send_update(update("lastPick", json!({"path": "/top", "name": "a"})));
    viewer.poll().unwrap();

    assert_eq!(*picks.lock().unwrap(), 1);
    assert_eq!(viewer.last_pick().unwrap()["name"], json!("a"));
}

#[test]
fn test_disposed_viewer_rejects_operations() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    handle.send_update(update("disposed", json!(true)));
    let events = viewer.poll().unwrap();
    assert!(events.contains(&ViewerEvent::Disposed));

    assert!(matches!(viewer.rotate_x(1.0), Err(WidgetError::Disposed)));
    assert!(matches!(viewer.set_axes(true), Err(WidgetError::Disposed)));
    assert!(matches!(
        viewer.update_states(VisibilityMap::new()),
        Err(WidgetError::Disposed)
    ));
    assert!(handle.drain().is_empty());
}

#[test]
fn test_close_marks_disposed() {
    let (mut viewer, handle) = shown(ShowOptions::default());
    viewer.close().unwrap();
    viewer.close().unwrap();

    let sent = handle.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].state().unwrap()["disposed"], json!(true));
    assert!(viewer.is_disposed());
}

#[test]
fn test_dump_model() {
    let (viewer, _handle) = shown(ShowOptions::default());
    let text = viewer.dump_model(false);
    assert!(text.contains("SHAPES"));
    assert!(text.contains("trackball"));
    assert!(text.contains("2 buffers"));
}

#[test]
fn test_update_states_accepts_leaf_missing_from_initial_states() {
    let (mut viewer, handle) = viewer();
    let mut states = VisibilityMap::new();
    states.insert("/top/a".into(), Visibility::VISIBLE);
    viewer
        .add_shapes(scene(), states, Vec::new(), ShowOptions::default())
        .unwrap();
    handle.drain();

    let mut patch = VisibilityMap::new();
    patch.insert("/top/b".into(), Visibility::new(true, false));
    viewer.update_states(patch).unwrap();
    assert_eq!(viewer.state().states["/top/b"], Visibility::new(true, false));
}

#[test]
fn test_tracks_checked_against_tree_not_states() {
    let (mut viewer, _handle) = viewer();
    let track = AnimationTrack::new(
        "/top/b",
        TrackAction::RotateX,
        vec![0.0],
        vec![TrackValue::Scalar(45.0)],
    )
    .unwrap();
    viewer
        .add_shapes(
            scene(),
            VisibilityMap::new(),
            vec![track.clone()],
            ShowOptions::default(),
        )
        .unwrap();
    assert_eq!(viewer.tracks().len(), 1);
    viewer.add_track(track).unwrap();
    assert_eq!(viewer.tracks().len(), 2);
}

#[test]
fn test_track_rejected_before_any_scene() {
    let (mut viewer, _handle) = viewer();
    let track = AnimationTrack::new(
        "/top/a",
        TrackAction::RotateX,
        vec![0.0],
        vec![TrackValue::Scalar(45.0)],
    )
    .unwrap();
    assert!(matches!(
        viewer.add_track(track),
        Err(WidgetError::Validation(ValidationError::UnknownTrackPath(_)))
    ));
}

#[test]
fn test_single_vertex_scene_gets_usable_camera() {
    let (mut viewer, _handle) = viewer();
    let origin = NdArray::from_points(&[[0.0, 0.0, 0.0]]);
    let point = ShapeNode::group(
        "/p",
        "p",
        vec![ShapeNode::leaf("/p/v", "v", Leaf::new(Geometry::Vertices(origin)))],
    );
    viewer
        .add_shapes(point, VisibilityMap::new(), Vec::new(), ShowOptions::default())
        .unwrap();

    let camera = viewer.camera().unwrap();
    assert_ne!(camera.position, camera.target);
    assert!(camera.position.iter().all(|c| c.is_finite()));
}

/// Channel that refuses any update carrying a scene
struct RejectScenes(ChannelComm);

impl Comm for RejectScenes {
    fn send(
        &mut self,
        message: ControllerToViewer,
        buffers: Vec<Vec<u8>>,
    ) -> Result<(), CommError> {
        if let ControllerToViewer::Update { state, .. } = &message {
            if state.contains_key("shapes") {
                return Err(CommError::SendFailed("scene too large".into()));
            }
        }
        self.0.send(message, buffers)
    }

    fn try_recv(&mut self) -> Option<ViewerToController> {
        self.0.try_recv()
    }
}

#[test]
fn test_failed_scene_batch_clears_initialize() {
    let (comm, handle) = ChannelComm::new();
    let mut viewer = CadViewer::new(DisplayConfig::default(), RejectScenes(comm)).unwrap();

    let result = viewer.add_shapes(scene(), all_visible(), Vec::new(), ShowOptions::default());
    assert!(matches!(result, Err(WidgetError::Comm(_))));
    assert!(!viewer.state().initialize);
    assert!(viewer.tree().is_none());

    let sent = handle.drain();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].state().unwrap()["initialize"], json!(true));
    assert_eq!(sent[1].state().unwrap()["initialize"], json!(false));
}

/// Channel that goes down after a number of messages
struct FailAfter {
    inner: ChannelComm,
    remaining: usize,
}

impl Comm for FailAfter {
    fn send(
        &mut self,
        message: ControllerToViewer,
        buffers: Vec<Vec<u8>>,
    ) -> Result<(), CommError> {
        if self.remaining == 0 {
            return Err(CommError::Closed);
        }
        self.remaining -= 1;
        self.inner.send(message, buffers)
    }

    fn try_recv(&mut self) -> Option<ViewerToController> {
        self.inner.try_recv()
    }
}

#[test]
fn test_initialize_cleared_locally_when_channel_drops() {
    let (inner, handle) = ChannelComm::new();
    let comm = FailAfter { inner, remaining: 1 };
    let mut viewer = CadViewer::new(DisplayConfig::default(), comm).unwrap();

    let result = viewer.add_shapes(scene(), all_visible(), Vec::new(), ShowOptions::default());
    assert!(matches!(result, Err(WidgetError::Comm(CommError::Closed))));
    assert!(!viewer.state().initialize);
    assert_eq!(handle.drain().len(), 1);
}
