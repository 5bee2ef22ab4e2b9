use super::*;
use crate::model::AppConfig;
use crate::schema::{FieldDefinition, FieldType, Form, FormSchema, SessionPhase};
use crate::services::memory_store::MemoryStore;
use crate::services::store::{FormStore, StoreRef};
use crate::ui::{handle_key, pump_loaded, run_effects, start};
use crate::widgets::login::LOGIN_FAILED;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;

fn state() -> AppState {
    let mut st = AppState::new(AppConfig::default(), None);
    start(&mut st, None);
    st
}

fn signed_in() -> AppState {
    let mut st = state();
    let effs = update(
        &mut st,
        AppMsg::Login {
            id: "admin".into(),
            password: "1234".into(),
        },
    );
    assert!(matches!(effs.as_slice(), [Effect::LoadForms]));
    st
}

fn form(active: bool) -> Form {
    Form {
        id: "f1".into(),
        title: "Survey".into(),
        description: String::new(),
        fields: FormSchema::from_fields(vec![
            FieldDefinition::new("field_1", FieldType::Text).required(true)
        ])
        .unwrap(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        is_active: active,
    }
}

fn wait_until(st: &mut AppState, pred: impl Fn(&AppState) -> bool) {
    for _ in 0..300 {
        pump_loaded(st);
        if pred(st) {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached; screen = {}", st.screen.name());
}

#[test]
fn bad_credentials_stay_on_login() {
    let mut st = state();
    let effs = update(
        &mut st,
        AppMsg::Login {
            id: "admin".into(),
            password: "nope".into(),
        },
    );
    assert!(effs.is_empty());
    assert!(!st.authenticated);
    match &st.screen {
        Screen::Login(w) => assert_eq!(w.error(), Some(LOGIN_FAILED)),
        _ => panic!("expected login screen"),
    }
}

#[test]
fn admin_routes_redirect_to_login_when_signed_out() {
    let mut st = state();
    for route in [
        Route::Dashboard,
        Route::NewForm,
        Route::EditForm("x".into()),
        Route::Responses("x".into()),
    ] {
        assert!(update(&mut st, AppMsg::Navigate(route)).is_empty());
        assert_eq!(st.screen.name(), "login");
    }
    // the fill-in route is public
    let effs = update(&mut st, AppMsg::Navigate(Route::Fill("x".into())));
    assert!(matches!(
        effs.as_slice(),
        [Effect::LoadForm { purpose: FormPurpose::Fill, .. }]
    ));
}

#[test]
fn reorder_activation_only_applies_to_its_session() {
    let mut st = signed_in();
    let effs = update(&mut st, AppMsg::Navigate(Route::NewForm));
    assert!(matches!(
        effs.as_slice(),
        [Effect::ScheduleReorderActivation { session: 1, delay_ms: 100 }]
    ));
    update(&mut st, AppMsg::Navigate(Route::Dashboard));
    let effs = update(&mut st, AppMsg::Navigate(Route::NewForm));
    assert!(matches!(
        effs.as_slice(),
        [Effect::ScheduleReorderActivation { session: 2, .. }]
    ));

    update(&mut st, AppMsg::ReorderActivated { session: 1 });
    match &st.screen {
        Screen::Builder(b) => assert!(!b.reorder_enabled()),
        _ => panic!("expected builder"),
    }
    update(&mut st, AppMsg::ReorderActivated { session: 2 });
    match &st.screen {
        Screen::Builder(b) => assert!(b.reorder_enabled()),
        _ => panic!("expected builder"),
    }
}

#[test]
fn leaving_builder_cancels_pending_activation() {
    let mut cfg = AppConfig::default();
    cfg.builder.reorder_delay_ms = 5_000;
    let mut st = AppState::new(cfg, None);
    st.authenticated = true;
    run_effects(&mut st, vec![Effect::Navigate(Route::NewForm)]);
    assert!(st.activation.as_ref().is_some_and(|a| a.is_pending()));
    run_effects(&mut st, vec![Effect::Navigate(Route::Dashboard)]);
    assert!(st.activation.is_none());
    assert!(st
        .debug_log
        .iter()
        .any(|l| l.contains("reorder activation cancelled")));
}

#[test]
fn activation_fires_through_the_channel() {
    let mut cfg = AppConfig::default();
    cfg.builder.reorder_delay_ms = 10;
    let mut st = AppState::new(cfg, None);
    st.authenticated = true;
    run_effects(&mut st, vec![Effect::Navigate(Route::NewForm)]);
    wait_until(&mut st, |s| {
        matches!(&s.screen, Screen::Builder(b) if b.reorder_enabled())
    });
}

#[test]
fn preview_stacks_over_builder_and_back_restores_it() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::NewForm));
    let preview = FormDraft::new();
    assert!(preview.preview().is_err());
    let p = crate::schema::FormPreview {
        title: "Untitled Form".into(),
        description: String::new(),
        fields: form(true).fields,
    };
    update(&mut st, AppMsg::Navigate(Route::Preview(p)));
    match &st.screen {
        Screen::Fill(w) => assert!(w.session.is_preview()),
        _ => panic!("expected preview"),
    }
    assert_eq!(st.history.len(), 1);

    // activation arriving while the preview is open still reaches the builder
    update(&mut st, AppMsg::ReorderActivated { session: 1 });
    update(&mut st, AppMsg::Back);
    match &st.screen {
        Screen::Builder(b) => {
            assert_eq!(b.session, 1);
            assert!(b.reorder_enabled());
        }
        _ => panic!("expected builder"),
    }
    assert!(st.history.is_empty());
}

#[test]
fn fill_of_inactive_form_shows_notice() {
    let mut st = state();
    update(&mut st, AppMsg::Navigate(Route::Fill("f1".into())));
    update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Fill,
            outcome: Ok(LoadOutcome::Form(form(false))),
        },
    );
    match &st.screen {
        Screen::Notice { text, .. } => assert_eq!(text, FORM_INACTIVE),
        _ => panic!("expected notice"),
    }
}

#[test]
fn load_failure_shows_notice_and_marks_error() {
    let mut st = state();
    update(&mut st, AppMsg::Navigate(Route::Fill("f1".into())));
    update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Fill,
            outcome: Err(crate::services::loader::FORM_UNAVAILABLE.into()),
        },
    );
    assert_eq!(st.screen.name(), "notice");
    assert!(st.last_error.is_some());
    // Back on the public route has nowhere to go
    update(&mut st, AppMsg::Back);
    assert_eq!(st.screen.name(), "notice");
}

#[test]
fn late_form_load_is_ignored_after_navigation() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::EditForm("f1".into())));
    update(&mut st, AppMsg::Back);
    assert_eq!(st.screen.name(), "dashboard");
    let effs = update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Edit,
            outcome: Ok(LoadOutcome::Form(form(true))),
        },
    );
    assert!(effs.is_empty());
    assert_eq!(st.screen.name(), "dashboard");
}

#[test]
fn form_load_for_an_earlier_request_is_dropped() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::EditForm("f1".into())));
    update(&mut st, AppMsg::Navigate(Route::Dashboard));
    update(&mut st, AppMsg::Navigate(Route::EditForm("f2".into())));

    // f1's answer arrives while f2 is awaited
    let effs = update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Edit,
            outcome: Ok(LoadOutcome::Form(form(true))),
        },
    );
    assert!(effs.is_empty());
    assert_eq!(st.screen.name(), "loading");

    let mut f2 = form(true);
    f2.id = "f2".into();
    f2.title = "Second".into();
    update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f2".into(),
            purpose: FormPurpose::Edit,
            outcome: Ok(LoadOutcome::Form(f2)),
        },
    );
    match &st.screen {
        Screen::Builder(b) => {
            assert_eq!(b.form_id.as_deref(), Some("f2"));
            assert_eq!(b.draft.title, "Second");
        }
        _ => panic!("expected builder"),
    }
}

#[test]
fn form_load_for_another_purpose_is_dropped() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::EditForm("f1".into())));
    update(&mut st, AppMsg::Navigate(Route::Fill("f1".into())));
    update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Edit,
            outcome: Err(crate::services::loader::LOAD_FORM_FAILED.into()),
        },
    );
    assert_eq!(st.screen.name(), "loading");
    update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Fill,
            outcome: Ok(LoadOutcome::Form(form(true))),
        },
    );
    assert_eq!(st.screen.name(), "fill");
}

#[test]
fn late_save_leaves_a_newer_builder_alone() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::NewForm));
    if let Screen::Builder(b) = &mut st.screen {
        b.saving = true;
    }
    update(&mut st, AppMsg::Navigate(Route::Dashboard));
    update(&mut st, AppMsg::Navigate(Route::NewForm));
    if let Screen::Builder(b) = &mut st.screen {
        b.draft.builder.add_field(FieldType::Text);
    }

    let effs = update(
        &mut st,
        AppMsg::Saved {
            session: 1,
            outcome: Ok(LoadOutcome::Saved(form(true))),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast { level: ToastLevel::Success, .. }]
    ));
    match &st.screen {
        Screen::Builder(b) => {
            assert_eq!(b.session, 2);
            assert_eq!(b.draft.builder.schema().len(), 1);
        }
        _ => panic!("expected the second builder"),
    }

    // a failure from the old save does not mark the new draft either
    update(
        &mut st,
        AppMsg::Saved {
            session: 1,
            outcome: Err(crate::services::loader::CREATE_FORM_FAILED.into()),
        },
    );
    match &st.screen {
        Screen::Builder(b) => assert!(b.error().is_none()),
        _ => panic!("expected builder"),
    }
}

#[test]
fn save_of_current_builder_returns_to_dashboard() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::NewForm));
    if let Screen::Builder(b) = &mut st.screen {
        b.saving = true;
    }
    let effs = update(
        &mut st,
        AppMsg::Saved {
            session: 1,
            outcome: Ok(LoadOutcome::Saved(form(true))),
        },
    );
    assert_eq!(st.screen.name(), "dashboard");
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast { .. }, Effect::LoadForms]
    ));
}

#[test]
fn edit_load_opens_builder_with_stored_fields() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::EditForm("f1".into())));
    let effs = update(
        &mut st,
        AppMsg::LoadedForm {
            id: "f1".into(),
            purpose: FormPurpose::Edit,
            outcome: Ok(LoadOutcome::Form(form(true))),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ScheduleReorderActivation { .. }]
    ));
    match &st.screen {
        Screen::Builder(b) => {
            assert_eq!(b.form_id.as_deref(), Some("f1"));
            assert_eq!(b.draft.title, "Survey");
            assert_eq!(b.draft.builder.schema().len(), 1);
        }
        _ => panic!("expected builder"),
    }
}

#[test]
fn save_failure_keeps_builder_with_message() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Navigate(Route::NewForm));
    if let Screen::Builder(b) = &mut st.screen {
        b.saving = true;
    }
    update(
        &mut st,
        AppMsg::Saved {
            session: 1,
            outcome: Err(crate::services::loader::CREATE_FORM_FAILED.into()),
        },
    );
    match &st.screen {
        Screen::Builder(b) => assert_eq!(b.error(), Some("Failed to create form")),
        _ => panic!("expected builder"),
    }
}

#[test]
fn logout_returns_to_login() {
    let mut st = signed_in();
    update(&mut st, AppMsg::Logout);
    assert!(!st.authenticated);
    assert_eq!(st.screen.name(), "login");
}

#[test]
fn memory_store_round_trip_through_the_ui() {
    let store: StoreRef = Arc::new(MemoryStore::with_demo_data());
    let mut st = AppState::new(AppConfig::default(), Some(store.clone()));
    start(&mut st, None);
    run_effects(
        &mut st,
        vec![Effect::Login {
            id: "admin".into(),
            password: "1234".into(),
        }],
    );
    wait_until(&mut st, |s| {
        matches!(&s.screen, Screen::Dashboard(w) if !w.loading && w.forms.len() == 1)
    });
    let form_id = match &st.screen {
        Screen::Dashboard(w) => w.forms[0].id.clone(),
        _ => unreachable!(),
    };

    // Enter opens the fill-in screen for the selected form
    handle_key(&mut st, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    wait_until(&mut st, |s| s.screen.name() == "fill");
    if let Screen::Fill(w) = &mut st.screen {
        assert!(w.session.set_text("field_1", "Linus"));
        assert!(w.session.set_text("field_2", "linus@example.org"));
    }
    handle_key(
        &mut st,
        KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL),
    );
    wait_until(&mut st, |s| {
        matches!(&s.screen, Screen::Fill(w) if w.session.phase() == SessionPhase::Submitted)
    });
    assert_eq!(store.list_responses(&form_id).unwrap().len(), 3);

    // Back to the dashboard, then the responses screen shows all three
    handle_key(&mut st, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
    wait_until(&mut st, |s| {
        matches!(&s.screen, Screen::Dashboard(w) if !w.loading)
    });
    handle_key(&mut st, KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE));
    wait_until(&mut st, |s| {
        matches!(&s.screen, Screen::Responses(w) if w.responses.len() == 3)
    });
    assert!(st.loading.is_empty());
    assert!(st.last_error.is_none());
}

#[test]
fn quit_keys_stop_the_loop() {
    let mut st = state();
    handle_key(
        &mut st,
        KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
    );
    assert!(st.should_quit);
}

#[test]
fn export_effect_writes_file_and_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exports").join("Survey_responses.csv");
    let mut st = state();
    run_effects(
        &mut st,
        vec![Effect::ExportCsv {
            path: path.clone(),
            contents: "\"Submission Date\"".into(),
        }],
    );
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "\"Submission Date\""
    );
    let toast = st.toast.as_ref().unwrap();
    assert_eq!(toast.level, crate::ui::ToastLevel::Success);
    assert!(toast.text.starts_with("Exported to "));
}
