// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanfold: scanner to PDF, desktop front end.
//
// Entry point. Initialises logging, backend services, app state, and launches
// the Dioxus UI.

mod pages;
mod services;
mod state;

use dioxus::prelude::*;

use pages::scan::Scan;
use pages::setup::Setup;

use services::app_services::AppServices;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Scanfold starting");

    dioxus::launch(app);
}

/// Top-level route enum.
#[derive(Debug, Clone, Routable, PartialEq)]
enum Route {
    #[layout(Shell)]
    #[route("/")]
    Scan {},
    #[route("/setup")]
    Setup {},
}

/// Root component.
fn app() -> Element {
    let svc = use_hook(AppServices::init);

    use_context_provider(|| svc.clone());
    use_context_provider(|| Signal::new(state::AppState::new(&svc)));

    rsx! {
        Router::<Route> {}
    }
}

/// Header with navigation, wrapping both pages.
#[component]
fn Shell() -> Element {
    let state = use_context::<Signal<state::AppState>>();
    let pages = state.read().page_count;

    rsx! {
        div {
            style: "display: flex; flex-direction: column; min-height: 100vh; font-family: system-ui, -apple-system, sans-serif; background: #fff;",

            header {
                style: "display: flex; align-items: center; gap: 16px; padding: 10px 16px; border-bottom: 1px solid #ddd; background: #f4f6f8;",
                strong { style: "font-size: 18px; margin-right: auto;", "Scanfold" }
                NavLink { to: Route::Scan {}, label: "Scan" }
                NavLink { to: Route::Setup {}, label: "Setup check" }
                span {
                    style: "min-width: 24px; padding: 2px 8px; border-radius: 10px; background: #007aff; color: white; font-size: 12px; text-align: center;",
                    title: "Pages waiting to be saved",
                    "{pages}"
                }
            }

            main { style: "flex: 1; padding: 20px;",
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn NavLink(to: Route, label: &'static str) -> Element {
    rsx! {
        Link { to: to,
            style: "color: #0a58ca; text-decoration: none; font-size: 15px;",
            "{label}"
        }
    }
}
