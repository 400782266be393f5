use std::fmt::Write as _;
use std::time::Duration;

use tether_core::{FrameObserver, FrameTick, Host, PointerEvents, Timestamp, ViewTag, ViewTree};

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Frame-rate meter. Register it with a scheduler through
/// [`FrameScheduler::register_observer`](tether_core::FrameScheduler::register_observer).
///
/// `fps` is frames counted over the last full one-second window; `smoothed`
/// is a moving average of the per-tick rate, useful before the first window
/// completes.
pub struct FpsGraph {
    window_start: Option<Timestamp>,
    frames_in_window: u32,
    fps: Option<u32>,
    min: Option<u32>,
    max: Option<u32>,
    smoothed: f32,
    frame_count: u64,
    on_update: Option<Box<dyn FnMut(u32)>>,
}

impl Default for FpsGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsGraph {
    pub fn new() -> Self {
        Self {
            window_start: None,
            frames_in_window: 0,
            fps: None,
            min: None,
            max: None,
            smoothed: 0.0,
            frame_count: 0,
            on_update: None,
        }
    }

    /// Called with the new value at the end of every window.
    pub fn on_update(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn fps(&self) -> Option<u32> {
        self.fps
    }

    pub fn min(&self) -> Option<u32> {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn reset(&mut self) {
        let on_update = self.on_update.take();
        *self = Self::new();
        self.on_update = on_update;
    }

    /// One-line summary, e.g. `fps: 60 (min 58, max 60)`.
    pub fn label(&self) -> String {
        match (self.fps, self.min, self.max) {
            (Some(fps), Some(min), Some(max)) => format!("fps: {fps} (min {min}, max {max})"),
            _ => format!("fps: ~{:.0}", self.smoothed),
        }
    }
}

impl FrameObserver for FpsGraph {
    fn did_update_frame(&mut self, tick: &FrameTick) {
        self.frame_count += 1;

        let dt = tick.delta.as_secs_f32();
        if dt > 0.0 {
            let fps = 1.0 / dt;
            // simple EMA
            let a = 0.2;
            self.smoothed = if self.smoothed == 0.0 {
                fps
            } else {
                (1.0 - a) * self.smoothed + a * fps
            };
        }

        let Some(start) = self.window_start else {
            self.window_start = Some(tick.timestamp);
            return;
        };
        self.frames_in_window += 1;
        let elapsed = tick.timestamp.saturating_sub(start);
        if elapsed < FPS_WINDOW {
            return;
        }

        let fps = (self.frames_in_window as f32 / elapsed.as_secs_f32()).round() as u32;
        self.fps = Some(fps);
        self.min = Some(self.min.map_or(fps, |m| m.min(fps)));
        self.max = Some(self.max.map_or(fps, |m| m.max(fps)));
        self.window_start = Some(tick.timestamp);
        self.frames_in_window = 0;
        log::trace!("devtools: {}", self.label());
        if let Some(f) = self.on_update.as_mut() {
            f(fps);
        }
    }
}

/// Point-in-time counters for a host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub tree_nodes: usize,
    pub active_touches: usize,
    pub outbound_backlog: usize,
    pub frame_observers: usize,
    pub delivered_ticks: u64,
    pub key_commands: usize,
}

impl Metrics {
    pub fn collect(host: &Host) -> Self {
        Self {
            tree_nodes: host.tree().len(),
            active_touches: host.touches().active_count(),
            outbound_backlog: host.backlog(),
            frame_observers: host.frames().observer_count(),
            delivered_ticks: host.frames().delivered_ticks(),
            key_commands: host.keys().command_count(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("nodes: {}", self.tree_nodes),
            format!("touches: {}", self.active_touches),
            format!("backlog: {}", self.outbound_backlog),
            format!("observers: {}", self.frame_observers),
            format!("ticks: {}", self.delivered_ticks),
            format!("commands: {}", self.key_commands),
        ]
    }
}

/// Text overlay state: frame meter, metrics and the hovered view.
#[derive(Default)]
pub struct Hud {
    pub fps: FpsGraph,
    pub metrics: Option<Metrics>,
    pub hovered: Option<ViewTag>,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_line(&self) -> String {
        let mut lines = vec![
            format!("frame: {}", self.fps.frame_count()),
            self.fps.label(),
        ];
        if let Some(m) = &self.metrics {
            lines.extend(m.lines());
        }
        if let Some(tag) = self.hovered {
            lines.push(format!("hover: {tag}"));
        }
        lines.join("  |  ")
    }
}

/// Tree dumps for debugging hit-testing problems.
pub struct Inspector;

impl Inspector {
    /// Indented dump of `root`'s subtree in child-sequence order.
    pub fn dump(tree: &ViewTree, root: ViewTag) -> String {
        let mut out = String::new();
        if tree.contains(root) {
            Self::dump_node(tree, root, 0, &mut out);
        } else {
            let _ = writeln!(out, "{root} (missing)");
        }
        out
    }

    fn dump_node(tree: &ViewTree, tag: ViewTag, depth: usize, out: &mut String) {
        let Some(node) = tree.node(tag) else {
            return;
        };
        let f = node.frame;
        let _ = write!(
            out,
            "{:indent$}{} {} [{}, {}, {}x{}]",
            "",
            node.tag,
            node.kind,
            f.x,
            f.y,
            f.w,
            f.h,
            indent = depth * 2
        );
        if node.z_index != 0 {
            let _ = write!(out, " z={}", node.z_index);
        }
        if node.clips_to_bounds {
            out.push_str(" clip");
        }
        if node.hidden {
            out.push_str(" hidden");
        }
        if node.pointer_events != PointerEvents::Auto {
            let _ = write!(out, " pointer-events={:?}", node.pointer_events);
        }
        if !node.hit_slop.is_zero() {
            out.push_str(" slop");
        }
        if !node.transform.is_identity() {
            out.push_str(" transformed");
        }
        out.push('\n');
        for child in tree.children(tag) {
            Self::dump_node(tree, child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tether_core::*;

    use super::*;

    fn tick(at_us: u64, delta_us: u64) -> FrameTick {
        FrameTick {
            timestamp: Duration::from_micros(at_us),
            delta: Duration::from_micros(delta_us),
        }
    }

    #[test]
    fn fps_graph_counts_one_second_windows() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut graph = FpsGraph::new().on_update({
            let seen = seen.clone();
            move |fps| seen.borrow_mut().push(fps)
        });
        for i in 0..=61 {
            graph.did_update_frame(&tick(i * 16_600, 16_600));
        }
        assert_eq!(graph.fps(), Some(60));
        assert_eq!(*seen.borrow(), vec![60]);
        assert!((graph.smoothed() - 60.24).abs() < 0.1);
    }

    #[test]
    fn fps_graph_tracks_min_and_max() {
        let mut graph = FpsGraph::new();
        let mut t = 0;
        graph.did_update_frame(&tick(t, 16_600));
        // one second at 50 fps, then one at 25
        for _ in 0..50 {
            t += 20_000;
            graph.did_update_frame(&tick(t, 20_000));
        }
        for _ in 0..25 {
            t += 40_000;
            graph.did_update_frame(&tick(t, 40_000));
        }
        assert_eq!(graph.max(), Some(50));
        assert_eq!(graph.min(), Some(25));
        assert_eq!(graph.label(), "fps: 25 (min 25, max 50)");
    }

    #[test]
    fn fps_graph_runs_as_frame_observer() {
        let frames = FrameScheduler::default();
        let graph = Rc::new(RefCell::new(FpsGraph::new()));
        frames.register_observer(graph.clone());
        for i in 0..5u64 {
            frames.tick(Duration::from_millis(20 * i));
        }
        assert_eq!(graph.borrow().frame_count(), 5);
        assert_eq!(graph.borrow().fps(), None);
        assert_eq!(graph.borrow().label(), "fps: ~54");
    }

    #[test]
    fn inspector_dump() {
        let mut tree = ViewTree::new();
        tree.create(ViewTag(1), ViewKind::View).unwrap();
        tree.set_frame(ViewTag(1), Rect::new(0.0, 0.0, 320.0, 480.0));
        tree.set_clips_to_bounds(ViewTag(1), true);
        tree.create(ViewTag(2), ViewKind::Text).unwrap();
        tree.set_frame(ViewTag(2), Rect::new(8.0, 8.0, 100.0, 20.5));
        tree.set_z_index(ViewTag(2), 2);
        tree.insert(ViewTag(2), ViewTag(1), 0).unwrap();
        tree.create(ViewTag(3), ViewKind::Custom("map".into())).unwrap();
        tree.set_pointer_events(ViewTag(3), PointerEvents::BoxNone);
        tree.set_transform(ViewTag(3), Transform::scale(2.0, 2.0));
        tree.insert(ViewTag(3), ViewTag(1), 1).unwrap();

        insta::assert_snapshot!(Inspector::dump(&tree, ViewTag(1)), @r"
        #1 View [0, 0, 320x480] clip
          #2 Text [8, 8, 100x20.5] z=2
          #3 map [0, 0, 0x0] pointer-events=BoxNone transformed
        ");
        assert_eq!(Inspector::dump(&tree, ViewTag(9)), "#9 (missing)\n");
    }

    #[test]
    fn metrics_and_hud_line() {
        let (mut host, _rx) = Host::new(ViewTag(1), HostConfig::default());
        host.apply(ViewCommand::Create {
            tag: ViewTag(1),
            kind: ViewKind::View,
        })
        .unwrap();
        let metrics = Metrics::collect(&host);
        assert_eq!(metrics.tree_nodes, 1);
        assert_eq!(metrics.frame_observers, 1);

        let hud = Hud {
            metrics: Some(metrics),
            hovered: Some(ViewTag(1)),
            ..Hud::new()
        };
        insta::assert_snapshot!(hud.status_line(), @"frame: 0  |  fps: ~0  |  nodes: 1  |  touches: 0  |  backlog: 0  |  observers: 1  |  ticks: 0  |  commands: 0  |  hover: #1");
    }
}
