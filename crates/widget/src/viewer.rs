//! The CAD viewer controller.

use std::collections::HashSet;

use cadview_comm::Comm;
use cadview_config::{Control, DisplayConfig, ShowOptions, normalize_color};
use cadview_ipc::{
    AnimationTrack, CameraPreset, CameraState, LastPick, Property, ShapeNode, Tab,
    ValidationError, ViewerResult, ViewerToController, VisibilityMap,
};
use serde_json::{Value, json};

use crate::camera::CameraRequest;
use crate::dispatch::CommandDispatcher;
use crate::encode;
use crate::error::WidgetError;
use crate::events::{EventBus, ViewerEvent};
use crate::geometry;
use crate::model::{PropertyModel, WidgetState};
use crate::results::{DisplaySink, ResultRouter};

/// Controller of one browser-side viewer.
///
/// All outbound operations fail with [`WidgetError::Disposed`] once the
/// viewer reported that it was disposed.
pub struct CadViewer<C> {
    config: DisplayConfig,
    model: PropertyModel<C>,
    dispatcher: CommandDispatcher,
    events: EventBus,
    router: ResultRouter,
    tree: Option<ShapeNode>,
    tracks: Vec<AnimationTrack>,
    empty: bool,
}

impl<C: Comm> CadViewer<C> {
    pub fn new(config: DisplayConfig, comm: C) -> Result<Self, WidgetError> {
        config.validate()?;
        let state = WidgetState::new(&config);
        Ok(Self {
            config,
            model: PropertyModel::new(comm, state),
            dispatcher: CommandDispatcher::new(),
            events: EventBus::new(),
            router: ResultRouter::default(),
            tree: None,
            tracks: Vec::new(),
            empty: true,
        })
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn state(&self) -> &WidgetState {
        self.model.state()
    }

    pub fn model(&self) -> &PropertyModel<C> {
        &self.model
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The scene tree of the last `add_shapes` call
    pub fn tree(&self) -> Option<&ShapeNode> {
        self.tree.as_ref()
    }

    pub fn set_display_sink(&mut self, sink: impl DisplaySink + Send + 'static) {
        self.router.set_display_sink(sink);
    }

    pub fn set_byte_sink(&mut self, sink: impl FnMut(&str, Vec<u8>) + Send + 'static) {
        self.router.set_byte_sink(sink);
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    fn ensure_alive(&self) -> Result<(), WidgetError> {
        if self.is_disposed() {
            Err(WidgetError::Disposed)
        } else {
            Ok(())
        }
    }

    // ========================================================================
    // Scene
    // ========================================================================

    /// Show a new scene.
    ///
    /// Everything is validated and encoded before the first message is sent.
    /// The scene and all options go out as one held update, framed by the
    /// `initialize` flag.
    pub fn add_shapes(
        &mut self,
        shapes: ShapeNode,
        states: VisibilityMap,
        tracks: Vec<AnimationTrack>,
        options: ShowOptions,
    ) -> Result<(), WidgetError> {
        self.ensure_alive()?;
        let settings = options.merge_defaults();

        shapes.validate()?;
        let leaf_ids: HashSet<&str> = shapes.leaf_ids().into_iter().collect();
        if let Some(unknown) = states.keys().find(|id| !leaf_ids.contains(id.as_str())) {
            return Err(ValidationError::UnknownStateKey(unknown.clone()).into());
        }
        for track in &tracks {
            check_track_path(track, Some(&shapes))?;
        }

        let request = CameraRequest {
            position: settings.position,
            quaternion: settings.quaternion,
            target: settings.target,
            zoom: settings.zoom,
        };
        request.validate(settings.control)?;

        let previous_control = self.state().control;
        let control_changed = previous_control != Some(settings.control);
        if (self.empty || control_changed) && previous_control.is_some() {
            tracing::info!(
                control = %settings.control,
                "Camera control changed, so camera was reset"
            );
        }
        let reset_camera = self.empty || control_changed || settings.reset_camera;

        let camera = if reset_camera {
            let bounds = geometry::combine(&shapes).ok_or(ValidationError::EmptyScene)?;
            let camera = request.resolve(settings.control, &bounds);
            tracing::debug!(?camera, "Camera reset from scene bounds");
            Some(camera)
        } else {
            None
        };

        let payload = encode::encode(&shapes.to_scene_value(), self.config.encoding)?;
        tracing::info!(
            objects = leaf_ids.len(),
            buffers = payload.buffers.len(),
            bytes = payload.buffer_bytes(),
            "Adding shapes"
        );

        self.model.sync(Property::Initialize(true))?;
        let batch = self.model.hold_sync(|m| {
            m.set(Property::Shapes(payload))?;
            m.set(Property::States(states))?;

            m.set(Property::DefaultEdgeColor(settings.default_edge_color))?;
            m.set(Property::DefaultOpacity(settings.default_opacity))?;
            m.set(Property::AmbientIntensity(settings.ambient_intensity))?;
            m.set(Property::DirectIntensity(settings.direct_intensity))?;
            m.set(Property::Metalness(settings.metalness))?;
            m.set(Property::Roughness(settings.roughness))?;
            m.set(Property::NormalLen(settings.normal_len))?;

            m.set(Property::Tools(settings.tools))?;
            m.set(Property::Control(settings.control))?;
            m.set(Property::Up(settings.up))?;
            m.set(Property::Axes(settings.axes))?;
            m.set(Property::Axes0(settings.axes0))?;
            m.set(Property::Grid(settings.grid))?;
            m.set(Property::Ticks(settings.ticks))?;
            m.set(Property::Ortho(settings.ortho))?;
            m.set(Property::Transparent(settings.transparent))?;
            m.set(Property::BlackEdges(settings.black_edges))?;
            m.set(Property::Explode(settings.explode))?;
            m.set(Property::Collapse(settings.collapse))?;
            m.set(Property::ClipIntersection(settings.clip_intersection))?;
            m.set(Property::ClipPlanes(settings.clip_planes))?;
            m.set(Property::ClipObjectColors(settings.clip_object_colors))?;

            m.set(Property::ResetCamera(reset_camera))?;
            match camera {
                Some(camera) => {
                    m.set(Property::Position(Some(camera.position)))?;
                    m.set(Property::Quaternion(camera.quaternion))?;
                    m.set(Property::Target(Some(camera.target)))?;
                    m.set(Property::Zoom(Some(camera.zoom)))?;

                    m.set(Property::Position0(Some(camera.position)))?;
                    if settings.control == Control::Trackball {
                        m.set(Property::Quaternion0(camera.quaternion))?;
                    }
                    m.set(Property::Target0(Some(camera.target)))?;
                    m.set(Property::Zoom0(Some(camera.zoom)))?;
                }
                None => {
                    // the previous pose is sent again by value
                    let state = m.state();
                    let (position, quaternion, target, zoom) =
                        (state.position, state.quaternion, state.target, state.zoom);
                    m.set(Property::Position(position))?;
                    m.set(Property::Quaternion(quaternion))?;
                    m.set(Property::Target(target))?;
                    m.set(Property::Zoom(zoom))?;
                }
            }

            m.set(Property::ZoomSpeed(settings.zoom_speed))?;
            m.set(Property::PanSpeed(settings.pan_speed))?;
            m.set(Property::RotateSpeed(settings.rotate_speed))?;
            m.set(Property::Timeit(settings.timeit))?;
            m.set(Property::JsDebug(settings.js_debug))
        });
        if let Err(e) = batch {
            if let Err(reset) = self.model.sync(Property::Initialize(false)) {
                tracing::warn!("Could not clear the initialize flag: {reset}");
                self.model.apply_local(Property::Initialize(false));
            }
            return Err(e);
        }
        self.model.sync(Property::Initialize(false))?;

        self.tree = Some(shapes);
        self.tracks = tracks;
        self.empty = false;
        Ok(())
    }

    /// Change the visibility of some objects without resending the scene
    pub fn update_states(&mut self, patch: VisibilityMap) -> Result<(), WidgetError> {
        self.ensure_alive()?;
        let leaf_ids: HashSet<&str> = self
            .tree
            .as_ref()
            .map(|tree| tree.leaf_ids().into_iter().collect())
            .unwrap_or_default();
        if let Some(unknown) = patch.keys().find(|id| !leaf_ids.contains(id.as_str())) {
            return Err(ValidationError::UnknownStateKey(unknown.clone()).into());
        }
        self.model.set(Property::StateUpdates(patch))
    }

    /// Set any writable property
    pub fn set(&mut self, property: Property) -> Result<(), WidgetError> {
        self.ensure_alive()?;
        if let Property::Quaternion(Some(_)) | Property::Quaternion0(Some(_)) = property {
            self.check_quaternion_allowed()?;
        }
        self.model.set(property)
    }

    /// Run several property changes as one update message
    pub fn hold_sync<T, F>(&mut self, f: F) -> Result<T, WidgetError>
    where
        F: FnOnce(&mut PropertyModel<C>) -> Result<T, WidgetError>,
    {
        self.ensure_alive()?;
        self.model.hold_sync(f)
    }

    fn check_quaternion_allowed(&self) -> Result<(), WidgetError> {
        if self.state().control == Some(Control::Orbit) {
            return Err(ValidationError::QuaternionWithOrbit.into());
        }
        Ok(())
    }

    // ========================================================================
    // Appearance and behavior
    // ========================================================================

    pub fn set_default_edge_color(&mut self, color: &str) -> Result<(), WidgetError> {
        self.set(Property::DefaultEdgeColor(normalize_color(color)))
    }

    pub fn set_default_opacity(&mut self, opacity: f64) -> Result<(), WidgetError> {
        self.set(Property::DefaultOpacity(opacity))
    }

    pub fn set_ambient_intensity(&mut self, value: f64) -> Result<(), WidgetError> {
        self.set(Property::AmbientIntensity(value))
    }

    pub fn set_direct_intensity(&mut self, value: f64) -> Result<(), WidgetError> {
        self.set(Property::DirectIntensity(value))
    }

    pub fn set_axes(&mut self, visible: bool) -> Result<(), WidgetError> {
        self.set(Property::Axes(visible))
    }

    pub fn set_axes0(&mut self, at_origin: bool) -> Result<(), WidgetError> {
        self.set(Property::Axes0(at_origin))
    }

    pub fn set_grid(&mut self, planes: [bool; 3]) -> Result<(), WidgetError> {
        self.set(Property::Grid(planes))
    }

    pub fn set_ortho(&mut self, ortho: bool) -> Result<(), WidgetError> {
        self.set(Property::Ortho(ortho))
    }

    pub fn set_transparent(&mut self, transparent: bool) -> Result<(), WidgetError> {
        self.set(Property::Transparent(transparent))
    }

    pub fn set_black_edges(&mut self, black: bool) -> Result<(), WidgetError> {
        self.set(Property::BlackEdges(black))
    }

    pub fn set_tools(&mut self, visible: bool) -> Result<(), WidgetError> {
        self.set(Property::Tools(visible))
    }

    pub fn set_js_debug(&mut self, debug: bool) -> Result<(), WidgetError> {
        self.set(Property::JsDebug(debug))
    }

    pub fn set_pinning(&mut self, pinning: bool) -> Result<(), WidgetError> {
        self.set(Property::Pinning(pinning))
    }

    pub fn set_clip_intersection(&mut self, intersection: bool) -> Result<(), WidgetError> {
        self.set(Property::ClipIntersection(intersection))
    }

    pub fn set_clip_planes(&mut self, visible: bool) -> Result<(), WidgetError> {
        self.set(Property::ClipPlanes(visible))
    }

    /// Normal of clipping plane `index` (0, 1 or 2)
    pub fn set_clip_normal(&mut self, index: usize, normal: [f64; 3]) -> Result<(), WidgetError> {
        let property = match index {
            0 => Property::ClipNormal0(normal),
            1 => Property::ClipNormal1(normal),
            2 => Property::ClipNormal2(normal),
            _ => return Err(ValidationError::NotWritable(format!("clip_normal_{index}")).into()),
        };
        self.set(property)
    }

    /// Slider value of clipping plane `index` (0, 1 or 2)
    pub fn set_clip_slider(&mut self, index: usize, value: f64) -> Result<(), WidgetError> {
        let property = match index {
            0 => Property::ClipSlider0(value),
            1 => Property::ClipSlider1(value),
            2 => Property::ClipSlider2(value),
            _ => return Err(ValidationError::NotWritable(format!("clip_slider_{index}")).into()),
        };
        self.set(property)
    }

    pub fn set_zoom_speed(&mut self, speed: f64) -> Result<(), WidgetError> {
        self.set(Property::ZoomSpeed(speed))
    }

    pub fn set_pan_speed(&mut self, speed: f64) -> Result<(), WidgetError> {
        self.set(Property::PanSpeed(speed))
    }

    pub fn set_rotate_speed(&mut self, speed: f64) -> Result<(), WidgetError> {
        self.set(Property::RotateSpeed(speed))
    }

    pub fn select_tree(&mut self) -> Result<(), WidgetError> {
        self.set(Property::Tab(Tab::Tree))
    }

    pub fn select_clipping(&mut self) -> Result<(), WidgetError> {
        self.set(Property::Tab(Tab::Clip))
    }

    // ========================================================================
    // Camera
    // ========================================================================

    pub fn control(&self) -> Option<Control> {
        self.state().control
    }

    pub fn position(&self) -> Option<[f64; 3]> {
        self.state().position
    }

    /// Camera orientation; always `None` under orbit control
    pub fn quaternion(&self) -> Option<[f64; 4]> {
        match self.control() {
            Some(Control::Orbit) => None,
            _ => self.state().quaternion,
        }
    }

    pub fn target(&self) -> Option<[f64; 3]> {
        self.state().target
    }

    pub fn zoom(&self) -> Option<f64> {
        self.state().zoom
    }

    /// Full camera pose, once a scene was shown
    pub fn camera(&self) -> Option<CameraState> {
        Some(CameraState {
            position: self.position()?,
            quaternion: self.quaternion(),
            target: self.target()?,
            zoom: self.zoom()?,
        })
    }

    pub fn last_pick(&self) -> Option<&LastPick> {
        self.state().last_pick.as_ref()
    }

    pub fn set_position(&mut self, position: [f64; 3]) -> Result<(), WidgetError> {
        self.set(Property::Position(Some(position)))
    }

    pub fn set_quaternion(&mut self, quaternion: [f64; 4]) -> Result<(), WidgetError> {
        self.set(Property::Quaternion(Some(quaternion)))
    }

    pub fn set_target(&mut self, target: [f64; 3]) -> Result<(), WidgetError> {
        self.set(Property::Target(Some(target)))
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), WidgetError> {
        self.set(Property::Zoom(Some(zoom)))
    }

    /// Ask the viewer to report its current camera pose
    pub fn update_camera_location(&mut self) -> Result<u64, WidgetError> {
        self.execute("updateCamera", Some(json!([])))
    }

    /// Move the camera to a predefined direction
    pub fn set_camera(&mut self, preset: CameraPreset) -> Result<u64, WidgetError> {
        self.execute("viewer.camera.presetCamera", Some(json!([preset.as_str()])))?;
        self.execute("viewer.update", Some(json!([])))
    }

    fn require_control(
        &self,
        operation: &'static str,
        required: Control,
    ) -> Result<(), WidgetError> {
        if self.control() != Some(required) {
            return Err(WidgetError::ControlMismatch {
                operation,
                required,
            });
        }
        Ok(())
    }

    /// Rotate around the x axis by `angle` degrees (trackball only)
    pub fn rotate_x(&mut self, angle: f64) -> Result<u64, WidgetError> {
        self.require_control("rotate_x", Control::Trackball)?;
        self.execute("viewer.controls.rotateX", Some(json!([angle])))
    }

    pub fn rotate_y(&mut self, angle: f64) -> Result<u64, WidgetError> {
        self.require_control("rotate_y", Control::Trackball)?;
        self.execute("viewer.controls.rotateY", Some(json!([angle])))
    }

    pub fn rotate_z(&mut self, angle: f64) -> Result<u64, WidgetError> {
        self.require_control("rotate_z", Control::Trackball)?;
        self.execute("viewer.controls.rotateZ", Some(json!([angle])))
    }

    /// Rotate up (positive) or down (negative) by `angle` degrees (orbit only)
    pub fn rotate_up(&mut self, angle: f64) -> Result<u64, WidgetError> {
        self.require_control("rotate_up", Control::Orbit)?;
        self.execute("viewer.controls.rotateUp", Some(json!([angle])))
    }

    pub fn rotate_left(&mut self, angle: f64) -> Result<u64, WidgetError> {
        self.require_control("rotate_left", Control::Orbit)?;
        self.execute("viewer.controls.rotateLeft", Some(json!([angle])))
    }

    // ========================================================================
    // Animation
    // ========================================================================

    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    /// Append a track after checking it targets a loaded object
    pub fn add_track(&mut self, track: AnimationTrack) -> Result<(), WidgetError> {
        check_track_path(&track, self.tree.as_ref())?;
        self.tracks.push(track);
        Ok(())
    }

    /// Replace all tracks; nothing changes if any track is invalid
    pub fn add_tracks(&mut self, tracks: Vec<AnimationTrack>) -> Result<(), WidgetError> {
        for track in &tracks {
            check_track_path(track, self.tree.as_ref())?;
        }
        self.tracks = tracks;
        Ok(())
    }

    pub fn clear_tracks(&mut self) -> Result<(), WidgetError> {
        self.ensure_alive()?;
        self.tracks.clear();
        self.model.set(Property::Tracks(Vec::new()))
    }

    /// Send the tracks and start the animation at `speed`
    pub fn animate(&mut self, speed: f64) -> Result<u64, WidgetError> {
        self.ensure_alive()?;
        let tracks = self.tracks.clone();
        self.model.hold_sync(|m| {
            m.set(Property::Tracks(tracks))?;
            m.set(Property::AnimationSpeed(speed))
        })?;
        self.execute("animate", None)
    }

    pub fn play(&mut self) -> Result<u64, WidgetError> {
        self.execute("viewer.controlAnimation", Some(json!(["play"])))
    }

    pub fn stop(&mut self) -> Result<u64, WidgetError> {
        self.execute("viewer.controlAnimation", Some(json!(["stop"])))
    }

    pub fn pause(&mut self) -> Result<u64, WidgetError> {
        self.execute("viewer.controlAnimation", Some(json!(["pause"])))
    }

    // ========================================================================
    // Screenshots and lifecycle
    // ========================================================================

    /// Replace the viewer output by a PNG of the current view
    pub fn pin_as_png(&mut self) -> Result<u64, WidgetError> {
        self.execute("pinAsPng", None)
    }

    /// Save the current view as PNG; the bytes arrive through `poll`
    pub fn export_png(&mut self, filename: &str) -> Result<u64, WidgetError> {
        self.execute("saveAsPng", Some(json!(filename)))
    }

    /// Call a method on a viewer object, e.g. `viewer.controls.rotateX`
    pub fn execute(&mut self, method: &str, args: Option<Value>) -> Result<u64, WidgetError> {
        self.ensure_alive()?;
        self.dispatcher
            .dispatch(self.model.comm_mut(), method, args)
    }

    /// Ask the browser to dispose the viewer
    pub fn dispose(&mut self) -> Result<u64, WidgetError> {
        self.execute("viewer.dispose", None)
    }

    /// Mark the viewer as disposed and tell the browser
    pub fn close(&mut self) -> Result<(), WidgetError> {
        if self.is_disposed() {
            return Ok(());
        }
        self.model.sync(Property::Disposed(true))?;
        self.events.emit(&ViewerEvent::Disposed);
        Ok(())
    }

    /// Listing of all synchronized fields
    pub fn dump_model(&self, include_shapes: bool) -> String {
        self.state().summary(include_shapes)
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Process all pending messages from the viewer.
    ///
    /// Returns the events that were emitted, in order.
    pub fn poll(&mut self) -> Result<Vec<ViewerEvent>, WidgetError> {
        let mut emitted = Vec::new();
        while let Some(message) = self.model.comm_mut().try_recv() {
            match message {
                ViewerToController::Update { state } => {
                    for property in self.model.apply_remote(state) {
                        self.handle_property(property, &mut emitted)?;
                    }
                }
                ViewerToController::Custom { content } => {
                    tracing::debug!(%content, "Ignoring custom message from viewer");
                }
            }
        }
        Ok(emitted)
    }

    fn handle_property(
        &mut self,
        property: Property,
        emitted: &mut Vec<ViewerEvent>,
    ) -> Result<(), WidgetError> {
        let mut follow_up = None;
        match &property {
            Property::LastPick(Some(pick)) => follow_up = Some(ViewerEvent::Picked(pick.clone())),
            Property::Disposed(true) => follow_up = Some(ViewerEvent::Disposed),
            Property::Result(Some(text)) => {
                match ViewerResult::parse(text) {
                    Ok(result) => match self.router.route(&result) {
                        Ok(_) => follow_up = Some(ViewerEvent::ResultReceived(result)),
                        Err(e) => tracing::warn!("Failed to route viewer result: {e}"),
                    },
                    Err(e) => tracing::warn!("Malformed viewer result: {e}"),
                }
                if !self.is_disposed() {
                    self.model.sync(Property::Result(None))?;
                }
            }
            _ => {}
        }

        let changed = ViewerEvent::PropertyChanged(property);
        self.events.emit(&changed);
        emitted.push(changed);
        if let Some(event) = follow_up {
            self.events.emit(&event);
            emitted.push(event);
        }
        Ok(())
    }
}

/// A track must address a loaded leaf or a group above one
fn check_track_path(track: &AnimationTrack, tree: Option<&ShapeNode>) -> Result<(), ValidationError> {
    if tree.is_some_and(|tree| tree.leaf_ids().into_iter().any(|id| track.applies_to(id))) {
        Ok(())
    } else {
        Err(ValidationError::UnknownTrackPath(track.path().to_string()))
    }
}

impl<C> std::fmt::Debug for CadViewer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CadViewer")
            .field("config", &self.config)
            .field("tracks", &self.tracks.len())
            .field("empty", &self.empty)
            .finish_non_exhaustive()
    }
}
