use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use tether_core::*;
use tether_devtools::{FpsGraph, Hud, Inspector, Metrics};
use tether_platform::{pe_cancel, pe_down_primary, pe_mouse, pe_up_primary, pump, touch_pointer};

const ROOT: ViewTag = ViewTag(1);
const LIST: ViewTag = ViewTag(2);
const ROW: ViewTag = ViewTag(3);
const BADGE: ViewTag = ViewTag(4);
const OVERLAY: ViewTag = ViewTag(5);

fn layout() -> Vec<ViewCommand> {
    vec![
        ViewCommand::Create { tag: ROOT, kind: ViewKind::View },
        ViewCommand::SetFrame { tag: ROOT, frame: Rect::new(0.0, 0.0, 320.0, 480.0) },
        ViewCommand::Create { tag: LIST, kind: ViewKind::ScrollView },
        ViewCommand::SetFrame { tag: LIST, frame: Rect::new(0.0, 40.0, 320.0, 400.0) },
        ViewCommand::SetClip { tag: LIST, clips: true },
        ViewCommand::SetCursor { tag: LIST, cursor: Cursor::Default },
        ViewCommand::Insert { tag: LIST, parent: ROOT, index: 0 },
        ViewCommand::Create { tag: ROW, kind: ViewKind::Text },
        ViewCommand::SetFrame { tag: ROW, frame: Rect::new(0.0, 0.0, 320.0, 44.0) },
        ViewCommand::Insert { tag: ROW, parent: LIST, index: 0 },
        ViewCommand::Create { tag: BADGE, kind: ViewKind::Image },
        ViewCommand::SetFrame { tag: BADGE, frame: Rect::new(280.0, 8.0, 28.0, 28.0) },
        ViewCommand::SetHitSlop { tag: BADGE, insets: EdgeInsets::uniform(-8.0) },
        ViewCommand::SetZIndex { tag: BADGE, z: 1 },
        ViewCommand::SetCursor { tag: BADGE, cursor: Cursor::Pointer },
        ViewCommand::Insert { tag: BADGE, parent: ROW, index: 0 },
        ViewCommand::Create { tag: OVERLAY, kind: ViewKind::Custom("toast".into()) },
        ViewCommand::SetFrame { tag: OVERLAY, frame: Rect::new(20.0, 420.0, 280.0, 40.0) },
        ViewCommand::SetPointerEvents { tag: OVERLAY, mode: PointerEvents::BoxNone },
        ViewCommand::Insert { tag: OVERLAY, parent: ROOT, index: 1 },
    ]
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Input script: (time, event). Two fingers, a focus loss, a hover and a
/// keyboard shortcut.
fn script() -> Vec<InputEvent> {
    let a = touch_pointer(0);
    let b = touch_pointer(1);
    let touch = PointerKind::Touch;
    vec![
        InputEvent::Pointer(pe_down_primary(touch, a, Vec2::new(10.0, 60.0), ms(2))),
        InputEvent::Pointer(PointerEvent {
            event: PointerEventKind::Move,
            position: Vec2::new(30.0, 200.0),
            timestamp: ms(9),
            ..pe_down_primary(touch, a, Vec2::ZERO, ms(9))
        }),
        InputEvent::Pointer(pe_down_primary(touch, b, Vec2::new(300.0, 50.0), ms(20))),
        InputEvent::Pointer(pe_up_primary(touch, a, Vec2::new(30.0, 500.0), ms(25))),
        InputEvent::Pointer(pe_cancel(CancelReason::FocusLost, ms(40))),
        InputEvent::Pointer(pe_mouse(
            PointerEventKind::Move,
            Vec2::new(290.0, 50.0),
            ModifierFlags::empty(),
            ms(60),
        )),
        InputEvent::Key(KeyEvent {
            timestamp: ms(70),
            ..KeyEvent::down(Key::Character('R'), KeyCode(0x15), ModifierFlags::META)
        }),
    ]
}

fn replay() -> anyhow::Result<()> {
    let (mut host, outbound) = Host::new(ROOT, HostConfig::default());
    host.apply_all(layout()).context("applying layout")?;
    println!("{}", Inspector::dump(host.tree(), ROOT));

    host.keys().register_command(KeyChord::input("r", ModifierFlags::META), |cmd| {
        log::info!("reload requested at {:?}", cmd.timestamp);
        cmd.prevent_default();
    });

    let fps = Rc::new(RefCell::new(FpsGraph::new()));
    host.frames().register_observer(fps.clone());

    let mut delivered = 0;
    let mut frame = ms(0);
    for event in script() {
        let at = match &event {
            InputEvent::Pointer(p) => p.timestamp,
            InputEvent::Key(k) => k.timestamp,
        };
        while frame + DEFAULT_FRAME_INTERVAL <= at {
            frame += DEFAULT_FRAME_INTERVAL;
            delivered += pump(&host, frame, &outbound, print_event);
        }
        if host.handle_input(&event) {
            println!("key handled, default prevented");
        }
    }
    frame += DEFAULT_FRAME_INTERVAL;
    delivered += pump(&host, frame, &outbound, print_event);

    let hud = Hud {
        metrics: Some(Metrics::collect(&host)),
        hovered: host.hovered(),
        ..Hud::new()
    };
    println!("{}", hud.status_line());
    log::info!("{delivered} outbound event(s), {}", fps.borrow().label());
    host.teardown();
    Ok(())
}

fn print_event(event: OutboundEvent) {
    match serde_json::to_string(&event) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("failed to encode {event:?}: {e}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    if std::env::args().any(|a| a == "--window") {
        return tether_platform::run_desktop(
            ROOT,
            HostConfig::default(),
            |host| {
                if let Err(e) = host.apply_all(layout()) {
                    log::error!("layout failed: {e}");
                }
            },
            print_event,
        );
    }
    replay()
}
