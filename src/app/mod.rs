use crate::schema::{CreateFormRequest, FormDraft, FormPreview, ResponseMap};
use crate::ui::{AppState, LoadOutcome, Screen, ToastLevel};
use crate::widgets::builder::BuilderWidget;
use crate::widgets::dashboard::DashboardWidget;
use crate::widgets::fill::FillWidget;
use crate::widgets::login::LoginWidget;
use crate::widgets::responses::ResponsesWidget;
use std::path::PathBuf;

pub const FORM_INACTIVE: &str = "This form is no longer accepting responses.";
pub const NOTICE_TITLE: &str = "Oops! Something went wrong";

/// Why a single form is being fetched; decides the screen it opens and the
/// failure message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormPurpose {
    Edit,
    Fill,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    Login,
    Dashboard,
    NewForm,
    EditForm(String),
    Fill(String),
    Responses(String),
    Preview(FormPreview),
}

impl Route {
    fn name(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Dashboard => "dashboard",
            Route::NewForm => "new-form",
            Route::EditForm(_) => "edit-form",
            Route::Fill(_) => "fill",
            Route::Responses(_) => "responses",
            Route::Preview(_) => "preview",
        }
    }

    // Login and the public fill-in route are open to everyone.
    fn needs_admin(&self) -> bool {
        !matches!(self, Route::Login | Route::Fill(_))
    }
}

pub enum AppMsg {
    Login {
        id: String,
        password: String,
    },
    Logout,
    Navigate(Route),
    Back,
    LoadedForms {
        outcome: Result<LoadOutcome, String>,
    },
    LoadedForm {
        id: String,
        purpose: FormPurpose,
        outcome: Result<LoadOutcome, String>,
    },
    LoadedResponses {
        outcome: Result<LoadOutcome, String>,
    },
    /// Result of a save started by builder `session`.
    Saved {
        session: u64,
        outcome: Result<LoadOutcome, String>,
    },
    DeletedForm {
        outcome: Result<LoadOutcome, String>,
    },
    Submitted {
        outcome: Result<LoadOutcome, String>,
    },
    DeletedResponse {
        outcome: Result<LoadOutcome, String>,
    },
    ReorderActivated {
        session: u64,
    },
}

#[allow(clippy::large_enum_variant)]
pub enum Effect {
    LoadForms,
    LoadForm {
        id: String,
        purpose: FormPurpose,
    },
    LoadResponses {
        form_id: String,
    },
    SaveForm {
        id: Option<String>,
        request: CreateFormRequest,
        session: u64,
    },
    DeleteForm {
        id: String,
    },
    SubmitResponse {
        form_id: String,
        responses: ResponseMap,
    },
    DeleteResponse {
        id: String,
    },
    ScheduleReorderActivation {
        session: u64,
        delay_ms: u64,
    },
    ExportCsv {
        path: PathBuf,
        contents: String,
    },
    CopyToClipboard {
        text: String,
        success: String,
    },
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    Navigate(Route),
    Back,
    Login {
        id: String,
        password: String,
    },
    Logout,
    Quit,
}

fn toast(text: impl Into<String>, level: ToastLevel) -> Effect {
    Effect::ShowToast {
        text: text.into(),
        level,
        seconds: 3,
    }
}

fn notice(state: &mut AppState, text: impl Into<String>) {
    state.screen = Screen::Notice {
        title: NOTICE_TITLE.to_string(),
        text: text.into(),
    };
}

/// Cancels a pending reorder activation; the builder it belonged to is gone.
fn end_builder_session(state: &mut AppState) {
    if let Some(activation) = state.activation.take() {
        if activation.cancel() {
            state.dbg("reorder activation cancelled");
        }
    }
}

fn open_builder(state: &mut AppState, draft: FormDraft, form_id: Option<String>) -> Vec<Effect> {
    state.builder_session += 1;
    let session = state.builder_session;
    state.screen = Screen::Builder(BuilderWidget::new(draft, form_id, session));
    vec![Effect::ScheduleReorderActivation {
        session,
        delay_ms: state.config.builder.reorder_delay_ms,
    }]
}

fn load_form(state: &mut AppState, id: String, purpose: FormPurpose) -> Vec<Effect> {
    state.screen = Screen::Loading {
        id: id.clone(),
        purpose,
    };
    vec![Effect::LoadForm { id, purpose }]
}

fn navigate(state: &mut AppState, route: Route) -> Vec<Effect> {
    if route.needs_admin() && !state.authenticated {
        state.dbg(format!("navigate {} refused: not signed in", route.name()));
        state.history.clear();
        state.screen = Screen::Login(LoginWidget::new());
        return Vec::new();
    }
    state.dbg(format!("navigate {}", route.name()));
    // Preview stacks on top of the builder; every other route replaces it.
    if !matches!(route, Route::Preview(_)) {
        end_builder_session(state);
        state.history.clear();
    }
    match route {
        Route::Login => {
            state.screen = Screen::Login(LoginWidget::new());
            Vec::new()
        }
        Route::Dashboard => {
            state.screen = Screen::Dashboard(DashboardWidget::new(
                state.config.public_base_url.clone(),
            ));
            vec![Effect::LoadForms]
        }
        Route::NewForm => open_builder(state, FormDraft::new(), None),
        Route::EditForm(id) => load_form(state, id, FormPurpose::Edit),
        Route::Fill(id) => load_form(state, id, FormPurpose::Fill),
        Route::Responses(form_id) => {
            let link = state.config.form_link(&form_id);
            state.screen = Screen::Responses(ResponsesWidget::new(
                form_id.clone(),
                state.config.export_dir.clone(),
                link,
            ));
            vec![Effect::LoadResponses { form_id }]
        }
        Route::Preview(preview) => {
            let prev = std::mem::replace(&mut state.screen, Screen::Fill(FillWidget::preview(preview)));
            state.history.push(prev);
            Vec::new()
        }
    }
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        Login { id, password } => {
            let auth = &state.config.auth;
            if id == auth.admin_id && password == auth.admin_password {
                state.authenticated = true;
                state.dbg(format!("signed in as {id}"));
                effects.extend(navigate(state, Route::Dashboard));
            } else {
                state.dbg("login rejected");
                if let Screen::Login(w) = &mut state.screen {
                    w.reject();
                }
            }
        }
        Logout => {
            state.authenticated = false;
            state.dbg("signed out");
            effects.extend(navigate(state, Route::Login));
        }
        Navigate(route) => effects.extend(navigate(state, route)),
        Back => {
            if let Some(prev) = state.history.pop() {
                state.screen = prev;
            } else if state.authenticated && !matches!(state.screen, Screen::Dashboard(_)) {
                effects.extend(navigate(state, Route::Dashboard));
            }
        }
        LoadedForms { outcome } => {
            if let Screen::Dashboard(w) = &mut state.screen {
                match outcome {
                    Ok(LoadOutcome::Forms(forms)) => {
                        state.last_error = None;
                        w.set_forms(forms);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        w.set_error(e.clone());
                        state.last_error = Some(e);
                    }
                }
            }
        }
        LoadedForm { id, purpose, outcome } => {
            // Only the form the loading screen waits for may open.
            let awaited = matches!(
                &state.screen,
                Screen::Loading { id: want, purpose: p } if *want == id && *p == purpose
            );
            if !awaited {
                state.dbg(format!("stale form load for {id} ignored"));
                return effects;
            }
            match (purpose, outcome) {
                (FormPurpose::Edit, Ok(LoadOutcome::Form(form))) => {
                    match FormDraft::from_parts(form.title, form.description, form.fields) {
                        Ok(draft) => effects.extend(open_builder(state, draft, Some(form.id))),
                        Err(e) => {
                            state.dbg(format!("stored schema rejected: {e}"));
                            state.last_error = Some(e.to_string());
                            notice(state, e.to_string());
                        }
                    }
                }
                (FormPurpose::Fill, Ok(LoadOutcome::Form(form))) => {
                    if !form.is_active {
                        notice(state, FORM_INACTIVE);
                    } else if let Err(e) = form.fields.validate() {
                        state.dbg(format!("stored schema rejected: {e}"));
                        state.last_error = Some(e.to_string());
                        notice(state, e.to_string());
                    } else {
                        state.screen = Screen::Fill(FillWidget::live(&form));
                    }
                }
                (_, Ok(_)) => {}
                (_, Err(e)) => {
                    state.last_error = Some(e.clone());
                    notice(state, e);
                }
            }
        }
        LoadedResponses { outcome } => {
            if let Screen::Responses(w) = &mut state.screen {
                match outcome {
                    Ok(LoadOutcome::Responses { form, responses }) if form.id == w.form_id => {
                        state.last_error = None;
                        w.set_data(form, responses);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        w.set_error(e.clone());
                        state.last_error = Some(e);
                    }
                }
            }
        }
        Saved { session, outcome } => {
            let current = matches!(
                &state.screen,
                Screen::Builder(b) if b.session == session && b.saving
            );
            match outcome {
                Ok(LoadOutcome::Saved(form)) => {
                    state.dbg(format!("saved form {} (builder session {session})", form.id));
                    effects.push(toast(format!("Saved \"{}\"", form.title), ToastLevel::Success));
                    if current {
                        effects.extend(navigate(state, Route::Dashboard));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if let Screen::Builder(w) = &mut state.screen {
                        if current {
                            w.set_error(e.clone());
                        }
                    }
                    state.last_error = Some(e);
                }
            }
        }
        DeletedForm { outcome } => {
            if let Screen::Dashboard(w) = &mut state.screen {
                match outcome {
                    Ok(LoadOutcome::Deleted(id)) => {
                        w.remove_form(&id);
                        effects.push(toast("Form deleted", ToastLevel::Success));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        w.set_error(e.clone());
                        state.last_error = Some(e);
                    }
                }
            }
        }
        Submitted { outcome } => {
            let result = match outcome {
                Ok(LoadOutcome::Submitted(receipt)) => {
                    state.dbg(format!("response {} stored", receipt.id));
                    Ok(())
                }
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            if let Screen::Fill(w) = &mut state.screen {
                w.finish_submit(result);
            }
        }
        DeletedResponse { outcome } => {
            if let Screen::Responses(w) = &mut state.screen {
                match outcome {
                    Ok(LoadOutcome::Deleted(id)) => {
                        w.remove_response(&id);
                        effects.push(toast("Response deleted", ToastLevel::Success));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        w.set_error(e.clone());
                        state.last_error = Some(e);
                    }
                }
            }
        }
        ReorderActivated { session } => {
            let mut enabled = false;
            let screens = std::iter::once(&mut state.screen).chain(state.history.iter_mut());
            for screen in screens {
                if let Screen::Builder(b) = screen {
                    if b.session == session {
                        b.enable_reorder();
                        enabled = true;
                    }
                }
            }
            if enabled {
                state.activation = None;
                state.dbg(format!("reorder enabled for builder session {session}"));
            } else {
                state.dbg(format!("stale reorder activation for session {session}"));
            }
        }
    }
    effects
}

// Keep test module at the very end to satisfy clippy::items-after-test-module
#[cfg(test)]
mod tests;
