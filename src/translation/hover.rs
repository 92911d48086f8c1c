//! Hover translation controller
//!
//! Holding Ctrl (alone) over an element and releasing it toggles the
//! translation of the element's first text node. The controller tracks one
//! hover target at a time as an explicit state:
//!
//! ```text
//!            ctrl down               ctrl up
//!   Idle ──────────────► Primed ─────────────► Idle
//!    │ ▲                   │ ▲
//!  enter leave          enter leave
//!    ▼ │                   ▼ │
//!  Hovering ───────────► Armed ──────────► Translating ──► Hovering
//!            ctrl down           ctrl up
//! ```
//!
//! Any other key or modifier combination disarms. Events that make no sense
//! in the current state are ignored.

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::first_text_descendant;
use crate::translation::error::TranslationResult;
use crate::translation::session::{PageSession, ToggleOutcome};

pub const TIP_TRANSLATE: &str = "Hold Ctrl to translate";
pub const TIP_REMOVE: &str = "Hold Ctrl to remove translation";

/// Offset of the tooltip from the pointer, in pixels
const TIP_OFFSET: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    fn others_held(&self) -> bool {
        self.shift || self.alt || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Control,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// The Ctrl key pressed with nothing else held
    pub fn ctrl() -> Self {
        Self {
            key: Key::Control,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn other(key: &str, modifiers: Modifiers) -> Self {
        Self {
            key: Key::Other(key.to_string()),
            modifiers,
        }
    }

    fn is_lone_ctrl(&self) -> bool {
        self.key == Key::Control && !self.modifiers.others_held()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub visible: bool,
    pub label: &'static str,
    pub x: i32,
    pub y: i32,
}

impl Default for Tooltip {
    fn default() -> Self {
        Self {
            visible: false,
            label: TIP_TRANSLATE,
            x: 0,
            y: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum HoverState {
    #[default]
    Idle,
    /// Ctrl held, nothing under the pointer
    Primed,
    Hovering(Handle),
    /// Ctrl held over a target
    Armed(Handle),
    Translating(Handle),
}

impl HoverState {
    pub fn target(&self) -> Option<&Handle> {
        match self {
            HoverState::Hovering(target)
            | HoverState::Armed(target)
            | HoverState::Translating(target) => Some(target),
            HoverState::Idle | HoverState::Primed => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, HoverState::Armed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            HoverState::Idle => "idle",
            HoverState::Primed => "primed",
            HoverState::Hovering(_) => "hovering",
            HoverState::Armed(_) => "armed",
            HoverState::Translating(_) => "translating",
        }
    }
}

/// What a Ctrl release did
#[derive(Debug, Clone)]
pub enum HoverEvent {
    Ignored,
    /// The target holds no text node
    NoText,
    Toggled(ToggleOutcome),
}

#[derive(Debug, Default)]
pub struct HoverController {
    state: HoverState,
    tooltip: Tooltip,
}

impl HoverController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &HoverState {
        &self.state
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    /// Returns false when the event was rejected
    pub fn pointer_enter(&mut self, target: &Handle, modifiers: Modifiers, session: &PageSession) -> bool {
        let next = match &self.state {
            HoverState::Translating(_) => return false,
            HoverState::Hovering(current) | HoverState::Armed(current) if Rc::ptr_eq(current, target) => {
                return true;
            }
            HoverState::Idle | HoverState::Hovering(_) => HoverState::Hovering(target.clone()),
            HoverState::Primed | HoverState::Armed(_) => {
                if modifiers.others_held() {
                    HoverState::Hovering(target.clone())
                } else {
                    HoverState::Armed(target.clone())
                }
            }
        };

        self.state = next;
        if let HoverState::Armed(target) = &self.state {
            let target = target.clone();
            self.show_tip(&target, session);
        } else {
            self.tooltip.visible = false;
        }
        true
    }

    pub fn pointer_leave(&mut self) -> bool {
        let next = match &self.state {
            HoverState::Hovering(_) => HoverState::Idle,
            HoverState::Armed(_) => HoverState::Primed,
            _ => return false,
        };
        self.state = next;
        self.tooltip.visible = false;
        true
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) {
        self.tooltip.x = x + TIP_OFFSET;
        self.tooltip.y = y + TIP_OFFSET;
    }

    pub fn key_down(&mut self, event: &KeyEvent, session: &PageSession) -> bool {
        if event.is_lone_ctrl() {
            let next = match &self.state {
                HoverState::Idle => HoverState::Primed,
                HoverState::Hovering(target) => HoverState::Armed(target.clone()),
                // Key repeat
                HoverState::Primed | HoverState::Armed(_) => return true,
                HoverState::Translating(_) => return false,
            };
            self.state = next;
            if let HoverState::Armed(target) = &self.state {
                let target = target.clone();
                self.show_tip(&target, session);
            }
            return true;
        }

        let next = match &self.state {
            HoverState::Armed(target) => HoverState::Hovering(target.clone()),
            HoverState::Primed => HoverState::Idle,
            HoverState::Translating(_) => return false,
            _ => return true,
        };
        self.state = next;
        self.tooltip.visible = false;
        true
    }

    /// Releasing Ctrl over an armed target toggles its translation
    ///
    /// The controller is back in `Hovering` on return, also on error.
    pub async fn key_up(&mut self, event: &KeyEvent, session: &mut PageSession) -> TranslationResult<HoverEvent> {
        if event.key != Key::Control {
            return Ok(HoverEvent::Ignored);
        }

        let armed = match &self.state {
            HoverState::Armed(target) => Some(target.clone()),
            HoverState::Primed => None,
            _ => return Ok(HoverEvent::Ignored),
        };
        let Some(target) = armed else {
            self.state = HoverState::Idle;
            self.reset_tip();
            return Ok(HoverEvent::Ignored);
        };

        self.reset_tip();

        let Some(text_node) = first_text_descendant(&target) else {
            self.state = HoverState::Hovering(target);
            return Ok(HoverEvent::NoText);
        };

        self.state = HoverState::Translating(target.clone());
        let result = session.toggle_node(&text_node).await;
        self.state = HoverState::Hovering(target);

        match result {
            Ok(outcome) => {
                tracing::debug!("hover toggle: {:?}", outcome);
                Ok(HoverEvent::Toggled(outcome))
            }
            Err(e) => {
                tracing::warn!("hover translation failed: {}", e);
                Err(e)
            }
        }
    }

    fn show_tip(&mut self, target: &Handle, session: &PageSession) {
        let translated = first_text_descendant(target).is_some_and(|node| session.is_translated(&node));
        self.tooltip.label = if translated { TIP_REMOVE } else { TIP_TRANSLATE };
        self.tooltip.visible = true;
    }

    fn reset_tip(&mut self) {
        self.tooltip.visible = false;
        self.tooltip.label = TIP_TRANSLATE;
    }
}
