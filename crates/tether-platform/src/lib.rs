//! Platform glue (desktop via winit).
//!
//! The core only speaks in root-space points and [`Timestamp`]s; this crate
//! turns native events into that form and drives a [`Host`] from the event
//! loop, ticking its frame clock only while something wants frames.

pub mod common;
#[cfg(feature = "desktop")]
pub mod desktop;

pub use common::*;

#[cfg(feature = "desktop")]
pub use desktop::{DesktopInput, map_cursor};

use tether_core::{DeliveryReceiver, Host, OutboundEvent, Timestamp};
#[cfg(feature = "desktop")]
use tether_core::{HostConfig, ViewTag};

/// Ticks the host, then hands every queued outbound event to `deliver`,
/// oldest first. Returns how many were delivered.
pub fn pump(
    host: &Host,
    now: Timestamp,
    outbound: &DeliveryReceiver<OutboundEvent>,
    mut deliver: impl FnMut(OutboundEvent),
) -> usize {
    host.tick(now);
    let items = outbound.drain();
    let n = items.len();
    items.into_iter().for_each(&mut deliver);
    n
}

#[cfg(feature = "desktop")]
pub fn run_desktop(
    root: ViewTag,
    config: HostConfig,
    setup: impl FnOnce(&mut Host),
    deliver: impl FnMut(OutboundEvent) + 'static,
) -> anyhow::Result<()> {
    use winit::application::ApplicationHandler;
    use winit::dpi::LogicalSize;
    use winit::event::WindowEvent;
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
    use winit::window::{Window, WindowAttributes, WindowId};

    use tether_core::{Cursor, ViewCommand};

    struct App {
        window: Option<Window>,
        host: Host,
        outbound: DeliveryReceiver<OutboundEvent>,
        input: DesktopInput,
        deliver: Box<dyn FnMut(OutboundEvent)>,
        cursor: Cursor,
    }

    impl App {
        fn sync_cursor(&mut self) {
            let cursor = self.host.cursor();
            if cursor == self.cursor {
                return;
            }
            self.cursor = cursor;
            let Some(win) = &self.window else {
                return;
            };
            match map_cursor(cursor) {
                Some(icon) => {
                    win.set_cursor_visible(true);
                    win.set_cursor(icon);
                }
                None => win.set_cursor_visible(false),
            }
        }
    }

    impl ApplicationHandler<()> for App {
        fn resumed(&mut self, el: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }
            let root = self.host.root();
            let size = self
                .host
                .tree()
                .node(root)
                .map(|n| n.frame.size())
                .filter(|s| s.width > 0.0 && s.height > 0.0);
            let mut attrs = WindowAttributes::default().with_title("Tether");
            if let Some(s) = size {
                attrs = attrs.with_inner_size(LogicalSize::new(s.width, s.height));
            }
            match el.create_window(attrs) {
                Ok(win) => {
                    self.input.set_scale_factor(win.scale_factor());
                    self.window = Some(win);
                }
                Err(e) => {
                    log::error!("Failed to create window: {e:?}");
                    el.exit();
                }
            }
        }

        fn window_event(&mut self, el: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            match &event {
                WindowEvent::CloseRequested => {
                    log::info!("Window close requested");
                    el.exit();
                    return;
                }
                WindowEvent::Resized(size) => {
                    if let Some(win) = &self.window {
                        let logical = size.to_logical::<f32>(win.scale_factor());
                        let root = self.host.root();
                        let frame = tether_core::Rect::new(0.0, 0.0, logical.width, logical.height);
                        if let Err(e) = self.host.apply(ViewCommand::SetFrame { tag: root, frame }) {
                            log::warn!("Failed to resize root: {e}");
                        }
                    }
                }
                _ => {}
            }
            if let Some(input) = self.input.translate(&event) {
                if self.host.handle_input(&input) {
                    log::trace!("platform: default handling suppressed for {input:?}");
                }
            }
        }

        fn about_to_wait(&mut self, el: &ActiveEventLoop) {
            let now = self.input.now();
            pump(&self.host, now, &self.outbound, &mut self.deliver);
            self.sync_cursor();
            if self.host.frames().is_running() {
                let next = web_time::Instant::now() + self.host.config().frame_interval;
                el.set_control_flow(ControlFlow::WaitUntil(next));
            } else {
                el.set_control_flow(ControlFlow::Wait);
            }
        }
    }

    let (mut host, outbound) = Host::new(root, config);
    setup(&mut host);

    let event_loop = EventLoop::new()?;
    let mut app = App {
        window: None,
        host,
        outbound,
        input: DesktopInput::default(),
        deliver: Box::new(deliver),
        cursor: Cursor::Default,
    };
    event_loop.run_app(&mut app)?;
    Ok(())
}
