mod common;

use std::sync::Arc;

use common::{
    session_with, test_config, HtmlTestHelper, StubTranslator, FIXTURE_PAGE, MIXED_PARAGRAPH, TEST_API_KEY,
};
use interlinear::parsers::html::dom::{next_sibling, text_content};
use interlinear::translation::error::TranslationError;
use interlinear::translation::hover::{Key, TIP_REMOVE, TIP_TRANSLATE};
use interlinear::translation::pipeline::{FilterReason, Rejection};
use interlinear::translation::{HoverController, HoverEvent, HoverState, KeyEvent, Modifiers, ToggleOutcome};

#[tokio::test]
async fn ctrl_release_toggles_translation() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "intro");
    let translator = Arc::new(StubTranslator::new());
    let (mut session, background, _dir) = session_with(test_config(TEST_API_KEY), translator.clone(), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    assert!(controller.pointer_enter(&target, Modifiers::default(), &session));
    assert_eq!(controller.state().name(), "hovering");
    assert!(!controller.tooltip().visible);

    assert!(controller.key_down(&ctrl, &session));
    assert!(controller.state().is_armed());
    assert!(controller.tooltip().visible);
    assert_eq!(controller.tooltip().label, TIP_TRANSLATE);

    let event = controller.key_up(&ctrl, &mut session).await.unwrap();
    let mirror = match event {
        HoverEvent::Toggled(ToggleOutcome::Translated(mirror)) => mirror,
        other => panic!("expected a translation, got {other:?}"),
    };
    assert_eq!(text_content(&mirror), "T:Hello world");
    assert!(std::rc::Rc::ptr_eq(&next_sibling(&target).unwrap(), &mirror));
    assert_eq!(controller.state().name(), "hovering");
    assert!(!controller.tooltip().visible);
    assert_eq!(translator.call_count(), 1);

    let used = background.handle().count(Some(TEST_API_KEY)).await.unwrap();
    assert_eq!(used, "Hello world".len() as u64);
}

#[tokio::test]
async fn second_toggle_reverts_only_its_mirror() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let intro = HtmlTestHelper::element(&dom, "intro");
    let title = HtmlTestHelper::element(&dom, "title");
    let (mut session, _background, _dir) =
        session_with(test_config(TEST_API_KEY), Arc::new(StubTranslator::new()), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    for target in [&title, &intro] {
        controller.pointer_enter(target, Modifiers::default(), &session);
        controller.key_down(&ctrl, &session);
        controller.key_up(&ctrl, &mut session).await.unwrap();
        controller.pointer_leave();
    }
    assert_eq!(HtmlTestHelper::mirrors(&dom).len(), 2);

    controller.pointer_enter(&intro, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    assert_eq!(controller.tooltip().label, TIP_REMOVE);

    let event = controller.key_up(&ctrl, &mut session).await.unwrap();
    assert!(matches!(event, HoverEvent::Toggled(ToggleOutcome::Reverted)));

    assert_eq!(HtmlTestHelper::mirrors(&dom).len(), 1);
    assert!(!session.is_translated(&HtmlTestHelper::text_of(&dom, "intro")));
    assert!(session.is_translated(&HtmlTestHelper::text_of(&dom, "title")));
    assert_eq!(text_content(&intro), "Hello world");
    assert_eq!(session.registry().len(), 1);
}

#[tokio::test]
async fn ctrl_held_before_entering_arms_on_enter() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "title");
    let (session, _background, _dir) =
        session_with(test_config(TEST_API_KEY), Arc::new(StubTranslator::new()), 1_000);
    let mut controller = HoverController::new();

    controller.key_down(&KeyEvent::ctrl(), &session);
    assert_eq!(controller.state().name(), "primed");

    controller.pointer_enter(&target, Modifiers::default(), &session);
    assert!(controller.state().is_armed());
    assert!(controller.tooltip().visible);

    controller.pointer_leave();
    assert_eq!(controller.state().name(), "primed");
    assert!(!controller.tooltip().visible);
}

#[tokio::test]
async fn other_modifiers_do_not_arm() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "title");
    let (mut session, _background, _dir) =
        session_with(test_config(TEST_API_KEY), Arc::new(StubTranslator::new()), 1_000);
    let mut controller = HoverController::new();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    let ctrl_shift = KeyEvent {
        key: Key::Control,
        modifiers: Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        },
    };
    controller.key_down(&ctrl_shift, &session);
    assert!(!controller.state().is_armed());

    let event = controller.key_up(&KeyEvent::ctrl(), &mut session).await.unwrap();
    assert!(matches!(event, HoverEvent::Ignored));
    assert!(HtmlTestHelper::mirrors(&dom).is_empty());
}

#[tokio::test]
async fn another_key_disarms() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "title");
    let (mut session, _background, _dir) =
        session_with(test_config(TEST_API_KEY), Arc::new(StubTranslator::new()), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    assert!(controller.state().is_armed());

    let ctrl_c = KeyEvent::other(
        "c",
        Modifiers {
            ctrl: true,
            ..Modifiers::default()
        },
    );
    controller.key_down(&ctrl_c, &session);
    assert_eq!(controller.state().name(), "hovering");
    assert!(!controller.tooltip().visible);

    let event = controller.key_up(&ctrl, &mut session).await.unwrap();
    assert!(matches!(event, HoverEvent::Ignored));
}

#[tokio::test]
async fn release_after_leaving_does_nothing() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "title");
    let translator = Arc::new(StubTranslator::new());
    let (mut session, _background, _dir) = session_with(test_config(TEST_API_KEY), translator.clone(), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    controller.pointer_leave();

    let event = controller.key_up(&ctrl, &mut session).await.unwrap();
    assert!(matches!(event, HoverEvent::Ignored));
    assert!(matches!(controller.state(), HoverState::Idle));
    assert_eq!(translator.call_count(), 0);
}

#[tokio::test]
async fn tooltip_tracks_the_pointer() {
    let (session, _background, _dir) =
        session_with(test_config(TEST_API_KEY), Arc::new(StubTranslator::new()), 1_000);
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let mut controller = HoverController::new();

    controller.pointer_enter(&HtmlTestHelper::element(&dom, "title"), Modifiers::default(), &session);
    controller.pointer_move(120, 45);
    assert_eq!((controller.tooltip().x, controller.tooltip().y), (130, 55));
}

#[tokio::test]
async fn ineligible_text_is_reported() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "chinese");
    let translator = Arc::new(StubTranslator::new());
    let (mut session, _background, _dir) = session_with(test_config(TEST_API_KEY), translator.clone(), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    let event = controller.key_up(&ctrl, &mut session).await.unwrap();

    assert!(matches!(
        event,
        HoverEvent::Toggled(ToggleOutcome::Ineligible(Rejection::Filtered(FilterReason::AlreadyTarget)))
    ));
    assert_eq!(translator.call_count(), 0);
}

#[tokio::test]
async fn element_without_text() {
    let dom = HtmlTestHelper::dom(r#"<html><body><div id="empty"></div></body></html>"#);
    let target = HtmlTestHelper::element(&dom, "empty");
    let (mut session, _background, _dir) =
        session_with(test_config(TEST_API_KEY), Arc::new(StubTranslator::new()), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    let event = controller.key_up(&ctrl, &mut session).await.unwrap();

    assert!(matches!(event, HoverEvent::NoText));
    assert_eq!(controller.state().name(), "hovering");
}

#[tokio::test]
async fn missing_credential_keeps_controller_usable() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "title");
    let (mut session, _background, _dir) =
        session_with(test_config(""), Arc::new(StubTranslator::new()), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    let result = controller.key_up(&ctrl, &mut session).await;

    assert!(matches!(result, Err(TranslationError::ConfigError(_))));
    assert_eq!(controller.state().name(), "hovering");
    assert!(HtmlTestHelper::mirrors(&dom).is_empty());

    // Arming again still works
    assert!(controller.key_down(&ctrl, &session));
    assert!(controller.state().is_armed());
}

#[tokio::test]
async fn quota_blocks_hover_translation() {
    let dom = HtmlTestHelper::dom(FIXTURE_PAGE);
    let target = HtmlTestHelper::element(&dom, "title");
    let translator = Arc::new(StubTranslator::new());
    let (mut session, _background, _dir) = session_with(test_config(TEST_API_KEY), translator.clone(), 5);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&target, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    let event = controller.key_up(&ctrl, &mut session).await.unwrap();

    let check = match event {
        HoverEvent::Toggled(ToggleOutcome::QuotaExceeded(check)) => check,
        other => panic!("expected the quota to block, got {other:?}"),
    };
    assert!(!check.allowed);
    assert_eq!((check.current, check.limit), (0, 5));
    assert_eq!(translator.call_count(), 0);
}

#[tokio::test]
async fn hover_revert_finds_a_displaced_mirror() {
    let dom = HtmlTestHelper::dom(MIXED_PARAGRAPH);
    let paragraph = HtmlTestHelper::element(&dom, "mixed");
    let translator = Arc::new(StubTranslator::new());
    let (mut session, _background, _dir) = session_with(test_config(TEST_API_KEY), translator.clone(), 1_000);
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    controller.pointer_enter(&paragraph, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    let event = controller.key_up(&ctrl, &mut session).await.unwrap();
    let hello_mirror = match event {
        HoverEvent::Toggled(ToggleOutcome::Translated(mirror)) => mirror,
        other => panic!("expected a translation, got {other:?}"),
    };
    controller.pointer_leave();

    // The page run puts the mirror for the trailing text in front of it
    session.translate_page(&dom).await.unwrap();
    assert_eq!(HtmlTestHelper::mirrors(&dom).len(), 3);
    assert!(!std::rc::Rc::ptr_eq(&next_sibling(&paragraph).unwrap(), &hello_mirror));
    assert!(session.is_translated(&HtmlTestHelper::child(&dom, "mixed", 0)));

    controller.pointer_enter(&paragraph, Modifiers::default(), &session);
    controller.key_down(&ctrl, &session);
    assert_eq!(controller.tooltip().label, TIP_REMOVE);
    let event = controller.key_up(&ctrl, &mut session).await.unwrap();
    assert!(matches!(event, HoverEvent::Toggled(ToggleOutcome::Reverted)));

    let remaining: Vec<String> = HtmlTestHelper::mirrors(&dom).iter().map(text_content).collect();
    assert_eq!(remaining, vec!["T:bold text", "T:world again"]);
    assert!(!session.is_translated(&HtmlTestHelper::child(&dom, "mixed", 0)));
    // The mirror for "bold text" now sits inside the paragraph, ahead of the trailing text
    assert!(session.is_translated(&HtmlTestHelper::child(&dom, "mixed", 3)));
}
