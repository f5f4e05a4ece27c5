//! On-screen messages: the board's render sink feeds per-eye UI text nodes.

use std::collections::HashSet;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::Runtime;

use crate::camera::{EyeCamera, NavigationEvent};
use crate::config::ViewerConfig;
use crate::messages::{
    message_font_size, play_tutorial, Annotation, AnnotationId, Eye, FadeController,
    MessageBoard, MonospaceEstimate, RenderSink, TextMeasure,
};

const NAVIGATION_MESSAGE_TICKS: i64 = 30;
const MAX_SINK_EVENTS_PER_FRAME: usize = 64;

/// Render-sink calls made by the board, replayed on the main thread.
#[derive(Clone, Debug)]
pub enum SinkEvent {
    Added(Annotation),
    Removed(AnnotationId),
}

/// Forwards sink calls into a channel drained each frame.
#[derive(Clone, Debug)]
pub struct ChannelSink(Sender<SinkEvent>);

impl ChannelSink {
    pub fn new() -> (Self, Receiver<SinkEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self(tx), rx)
    }
}

impl RenderSink for ChannelSink {
    fn add_renderable(&mut self, annotation: Annotation) {
        // The receiver only goes away at shutdown.
        let _ = self.0.send(SinkEvent::Added(annotation));
    }

    fn remove_renderable(&mut self, annotation: &Annotation) {
        let _ = self.0.send(SinkEvent::Removed(annotation.id()));
    }
}

#[derive(Resource)]
pub struct SinkEvents(pub Receiver<SinkEvent>);

/// The message board shown over the view.
#[derive(Resource, Clone)]
pub struct MessageHud {
    pub board: MessageBoard<ChannelSink>,
}

/// Runtime hosting the board's tick task; lives as long as the app.
#[derive(Resource)]
pub struct TickerRuntime(pub Runtime);

/// Text node showing one annotation to one eye.
#[derive(Component, Clone, Debug)]
pub struct MessageText {
    pub annotation: Annotation,
    pub eye: Eye,
}

/// Without a ticker runtime the board is never created; the systems below
/// then skip their work instead of failing.
pub fn message_hud_plugin(app: &mut App) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("worldvr-messages")
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("worldvr: cannot start message ticker: {err}");
            return;
        }
    };
    let render_width = app
        .world()
        .get_resource::<ViewerConfig>()
        .map_or_else(|| ViewerConfig::default().render_width, |c| c.render_width);

    let (sink, events) = ChannelSink::new();
    let controller = FadeController::new(sink, message_font_size(render_width));
    let board = MessageBoard::new(controller, runtime.handle().clone());

    app.insert_resource(MessageHud { board })
        .insert_resource(SinkEvents(events))
        .insert_resource(TickerRuntime(runtime))
        .add_systems(Startup, start_tutorial)
        .add_systems(
            Update,
            (
                announce_navigation,
                apply_sink_events,
                sync_message_opacity,
                layout_message_text,
            )
                .chain(),
        );
}

fn start_tutorial(hud: Option<Res<MessageHud>>) {
    if let Some(hud) = hud {
        play_tutorial(&hud.board);
    }
}

fn announce_navigation(hud: Option<Res<MessageHud>>, mut events: EventReader<NavigationEvent>) {
    let Some(hud) = hud else {
        events.clear();
        return;
    };
    for event in events.read() {
        let text = match event {
            NavigationEvent::SpeedChanged(speed) => format!("Navigation speed {speed:.0} m/s"),
            NavigationEvent::Arrived(name) => format!("Flying to {name}"),
        };
        hud.board.show_message(text, NAVIGATION_MESSAGE_TICKS);
    }
}

/// Spawns one text node per eye for added annotations and despawns the nodes
/// of removed ones.
pub fn apply_sink_events(
    mut commands: Commands,
    events: Res<SinkEvents>,
    eyes: Query<(Entity, &EyeCamera)>,
    texts: Query<(Entity, &MessageText)>,
) {
    let batch: Vec<SinkEvent> = events.0.try_iter().take(MAX_SINK_EVENTS_PER_FRAME).collect();
    let removed: HashSet<AnnotationId> = batch
        .iter()
        .filter_map(|event| match event {
            SinkEvent::Removed(id) => Some(*id),
            SinkEvent::Added(_) => None,
        })
        .collect();

    for (entity, text) in &texts {
        if removed.contains(&text.annotation.id()) {
            commands.entity(entity).despawn_recursive();
        }
    }

    let targets: Vec<(Eye, Option<Entity>)> = if eyes.is_empty() {
        vec![(Eye::Center, None)]
    } else {
        eyes.iter().map(|(entity, eye)| (eye.eye, Some(entity))).collect()
    };
    for event in batch {
        let SinkEvent::Added(annotation) = event else {
            continue;
        };
        // Replaced within the same frame.
        if removed.contains(&annotation.id()) {
            continue;
        }
        for &(eye, camera) in &targets {
            let mut text = commands.spawn((
                MessageText {
                    annotation: annotation.clone(),
                    eye,
                },
                Text::new(annotation.text()),
                TextFont {
                    font_size: annotation.font_size(),
                    ..default()
                },
                TextColor(Color::srgba(1.0, 1.0, 1.0, annotation.opacity())),
                Node {
                    position_type: PositionType::Absolute,
                    max_width: Val::Px(annotation.size().x),
                    ..default()
                },
            ));
            if let Some(camera) = camera {
                text.insert(TargetCamera(camera));
            }
        }
    }
}

pub fn sync_message_opacity(mut texts: Query<(&MessageText, &mut TextColor)>) {
    for (message, mut color) in &mut texts {
        let opacity = message.annotation.opacity();
        if color.0.alpha() != opacity {
            color.0.set_alpha(opacity);
        }
    }
}

fn layout_message_text(
    hud: Option<Res<MessageHud>>,
    cameras: Query<&Camera>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut texts: Query<(&MessageText, &ComputedNode, Option<&TargetCamera>, &mut Node)>,
) {
    let Some(hud) = hud else {
        return;
    };
    for (message, computed, target, mut node) in &mut texts {
        let viewport = target
            .and_then(|target| cameras.get(target.entity()).ok())
            .and_then(Camera::logical_viewport_size)
            .or_else(|| windows.get_single().ok().map(Window::size));
        let Some(viewport) = viewport else {
            continue;
        };

        let laid_out = computed.size() * computed.inverse_scale_factor();
        let measure = |text: &str, font_size: f32| -> Vec2 {
            if laid_out.x > 0.0 {
                laid_out
            } else {
                MonospaceEstimate::default().measure(text, font_size)
            }
        };

        let point = hud.board.with_controller(|controller| {
            let is_current = controller
                .current()
                .is_some_and(|current| current.same_as(&message.annotation));
            if is_current {
                controller.prepare_for_eye(message.eye, viewport, &measure)
            } else {
                None
            }
        });
        if let Some(point) = point {
            let (left, top) = (Val::Px(point.x), Val::Px(point.y));
            if node.left != left || node.top != top {
                node.left = left;
                node.top = top;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink_app() -> (App, ChannelSink) {
        let (sink, events) = ChannelSink::new();
        let mut app = App::new();
        app.insert_resource(SinkEvents(events))
            .add_systems(Update, (apply_sink_events, sync_message_opacity).chain());
        (app, sink)
    }

    fn message_count(app: &mut App) -> usize {
        let world = app.world_mut();
        world.query::<&MessageText>().iter(world).count()
    }

    #[test]
    fn systems_idle_without_a_board() {
        let mut app = App::new();
        app.add_event::<NavigationEvent>()
            .add_systems(Startup, start_tutorial)
            .add_systems(Update, (announce_navigation, layout_message_text));
        app.world_mut().spawn((
            MessageText {
                annotation: Annotation::new("Orphan", 16.0),
                eye: Eye::Center,
            },
            Node::default(),
        ));
        app.world_mut().send_event(NavigationEvent::SpeedChanged(100.0));

        app.update();
        app.update();

        assert!(app.world().get_resource::<MessageHud>().is_none());
        let world = app.world_mut();
        let node = world.query::<&Node>().single(world);
        assert_eq!(node.left, Val::Auto);
    }

    #[test]
    fn added_annotation_spawns_centered_text_without_eyes() {
        let (mut app, mut sink) = sink_app();
        let annotation = Annotation::new("Hello", 16.0);
        sink.add_renderable(annotation.clone());

        app.update();

        let world = app.world_mut();
        let texts: Vec<(Eye, String)> = world
            .query::<(&MessageText, &Text)>()
            .iter(world)
            .map(|(m, t)| (m.eye, t.0.clone()))
            .collect();
        assert_eq!(texts, vec![(Eye::Center, "Hello".to_string())]);
    }

    #[test]
    fn one_text_per_eye_camera() {
        let (mut app, mut sink) = sink_app();
        app.world_mut().spawn(EyeCamera { eye: Eye::Left });
        app.world_mut().spawn(EyeCamera { eye: Eye::Right });
        sink.add_renderable(Annotation::new("Stereo", 16.0));

        app.update();

        let world = app.world_mut();
        let mut eyes: Vec<Eye> = world
            .query_filtered::<&MessageText, With<TargetCamera>>()
            .iter(world)
            .map(|m| m.eye)
            .collect();
        eyes.sort_by_key(|eye| *eye == Eye::Right);
        assert_eq!(eyes, vec![Eye::Left, Eye::Right]);
    }

    #[test]
    fn replaced_in_the_same_frame_is_never_spawned() {
        let (mut app, mut sink) = sink_app();
        let first = Annotation::new("First", 16.0);
        sink.add_renderable(first.clone());
        sink.remove_renderable(&first);
        sink.add_renderable(Annotation::new("Second", 16.0));

        app.update();

        let world = app.world_mut();
        let texts: Vec<String> = world
            .query::<&Text>()
            .iter(world)
            .map(|t| t.0.clone())
            .collect();
        assert_eq!(texts, vec!["Second".to_string()]);
    }

    #[test]
    fn opacity_follows_annotation_and_removal_despawns() {
        let (mut app, mut sink) = sink_app();
        let annotation = Annotation::new("Fading", 16.0);
        sink.add_renderable(annotation.clone());
        app.update();

        annotation.set_opacity(0.5);
        app.update();
        let world = app.world_mut();
        let alpha = world
            .query::<&TextColor>()
            .single(world)
            .0
            .alpha();
        assert!((alpha - 0.5).abs() < 1e-6);

        sink.remove_renderable(&annotation);
        app.update();
        assert_eq!(message_count(&mut app), 0);
    }
}
