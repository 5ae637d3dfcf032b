// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Setup check page: runs every diagnostic and shows what to fix.

use dioxus::prelude::*;

use scanfold_capture::{CheckStatus, SetupReport};

use crate::services::app_services::AppServices;

#[derive(Debug, Clone, PartialEq)]
enum CheckState {
    Intro,
    Running,
    Complete,
}

#[component]
pub fn Setup() -> Element {
    let svc = use_context::<AppServices>();
    let mut phase = use_signal(|| CheckState::Intro);
    let mut report = use_signal(|| Option::<SetupReport>::None);
    let mut copied = use_signal(|| false);

    let platform = svc.platform_name();
    let run = move |_: MouseEvent| {
        let svc = svc.clone();
        phase.set(CheckState::Running);
        copied.set(false);
        spawn(async move {
            let result = svc.setup_check().await;
            report.set(Some(result));
            phase.set(CheckState::Complete);
        });
    };

    rsx! {
        div { style: "max-width: 600px; margin: 0 auto;",
            h1 { style: "text-align: center;", "Setup check" }
            p { style: "text-align: center; color: #666; margin-bottom: 24px;",
                "Checks the scanning tools and folders on this computer ({platform})."
            }

            match &*phase.read() {
                CheckState::Intro => rsx! {
                    div { style: "text-align: center; padding: 24px 0;",
                        button {
                            style: "padding: 16px 48px; border-radius: 12px; border: none; background: #007aff; color: white; font-size: 18px; font-weight: bold;",
                            onclick: run.clone(),
                            "Run check"
                        }
                    }
                },

                CheckState::Running => rsx! {
                    p { style: "text-align: center; font-size: 18px; color: #007aff; padding: 48px 0;",
                        "Checking... listing scanners can take a few seconds."
                    }
                },

                CheckState::Complete => {
                    if let Some(ref rpt) = *report.read() {
                        let (summary_bg, summary_fg) = if rpt.passed() {
                            ("#d4edda", "#155724")
                        } else {
                            ("#f8d7da", "#721c24")
                        };
                        let text = rpt.to_text();
                        rsx! {
                            div {
                                style: "padding: 20px; border-radius: 16px; margin-bottom: 16px; background: {summary_bg};",
                                p { style: "font-size: 18px; font-weight: bold; color: {summary_fg}; margin: 0;",
                                    "{rpt.summary()}"
                                }
                            }

                            for check in rpt.checks.iter() {
                                {
                                    let (icon, border) = match check.status {
                                        CheckStatus::Pass => ("\u{2705}", "#d4edda"),
                                        CheckStatus::Warn => ("\u{26A0}", "#fff3cd"),
                                        CheckStatus::Fail => ("\u{274C}", "#f8d7da"),
                                    };
                                    rsx! {
                                        div {
                                            style: "padding: 14px; margin: 8px 0; border: 2px solid {border}; border-radius: 12px;",
                                            div { style: "display: flex; align-items: center; gap: 12px;",
                                                span { style: "font-size: 22px;", "{icon}" }
                                                div {
                                                    strong { "{check.name}" }
                                                    p { style: "color: #666; font-size: 14px; margin: 4px 0 0 0;",
                                                        "{check.detail}"
                                                    }
                                                }
                                            }
                                            if let Some(ref fix) = check.fix {
                                                div { style: "margin-top: 10px; padding: 10px; background: #fff3cd; border-radius: 8px; color: #856404; font-size: 14px;",
                                                    strong { "What to do: " }
                                                    "{fix}"
                                                }
                                            }
                                        }
                                    }
                                }
                            }

                            div { style: "display: flex; gap: 8px; margin-top: 16px;",
                                button {
                                    style: "flex: 1; padding: 12px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                                    onclick: run.clone(),
                                    "Check again"
                                }
                                button {
                                    style: "flex: 1; padding: 12px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                                    onclick: move |_| {
                                        tracing::info!(report = %text, "setup report");
                                        copied.set(true);
                                    },
                                    if *copied.read() { "Written to the log" } else { "Write report to the log" }
                                }
                            }
                        }
                    } else {
                        rsx! { p { "No report yet." } }
                    }
                }
            }
        }
    }
}
