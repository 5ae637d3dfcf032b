// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan page: pick a device, scan pages one at a time, save them as one PDF.
//
// Every backend call runs in a spawned task with `busy` set, so the window
// keeps repainting while a scanner or the drop-folder wait is in progress.

use dioxus::prelude::*;

use scanfold_core::types::{ColorMode, Resolution};

use crate::services::app_services::AppServices;
use crate::state::{AppState, StatusLine, Tone};

#[component]
pub fn Scan() -> Element {
    let svc = use_context::<AppServices>();
    let mut state = use_context::<Signal<AppState>>();

    // Enumerate once when the page first mounts.
    use_hook({
        let svc = svc.clone();
        move || refresh_devices(svc, state)
    });

    let snapshot = state.read().clone();
    let busy = snapshot.busy;
    let pages = snapshot.page_count;
    let output = snapshot.output_dir.display().to_string();
    let status = snapshot.status.clone();
    let status_color = status.tone.color();

    rsx! {
        div { style: "max-width: 640px; margin: 0 auto;",
            h1 { "Scan" }
            p { style: "color: #666;", "Scan pages one at a time, then save them as a single PDF." }

            // Device
            label { style: "display: block; font-weight: bold; margin-top: 16px;", "Scanner" }
            div { style: "display: flex; gap: 8px; margin: 8px 0;",
                select {
                    style: "flex: 1; padding: 8px; border-radius: 8px; border: 1px solid #ccc;",
                    disabled: busy,
                    onchange: move |evt: FormEvent| {
                        state.write().selected_device = Some(evt.value());
                    },
                    if snapshot.devices.is_empty() {
                        option { value: "", "Looking for scanners..." }
                    }
                    for device in snapshot.devices.iter() {
                        option {
                            value: "{device.id}",
                            selected: snapshot.selected_device.as_deref() == Some(device.id.as_str()),
                            "{device.label}"
                        }
                    }
                }
                button {
                    style: "padding: 8px 16px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                    disabled: busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| refresh_devices(svc.clone(), state)
                    },
                    "Refresh"
                }
            }

            // Settings
            div { style: "display: flex; gap: 16px; margin: 16px 0;",
                div { style: "flex: 1;",
                    label { style: "display: block; font-weight: bold;", "Resolution" }
                    select {
                        style: "width: 100%; padding: 8px; border-radius: 8px; border: 1px solid #ccc;",
                        disabled: busy,
                        onchange: {
                            let svc = svc.clone();
                            move |evt: FormEvent| {
                                if let Ok(resolution) = evt.value().parse::<Resolution>() {
                                    state.write().settings.resolution = resolution;
                                    remember_settings(&svc, state);
                                }
                            }
                        },
                        for resolution in Resolution::ALL {
                            option {
                                value: "{resolution}",
                                selected: resolution == snapshot.settings.resolution,
                                "{resolution} dpi"
                            }
                        }
                    }
                }
                div { style: "flex: 1;",
                    label { style: "display: block; font-weight: bold;", "Mode" }
                    select {
                        style: "width: 100%; padding: 8px; border-radius: 8px; border: 1px solid #ccc;",
                        disabled: busy,
                        onchange: {
                            let svc = svc.clone();
                            move |evt: FormEvent| {
                                if let Ok(mode) = evt.value().parse::<ColorMode>() {
                                    state.write().settings.color_mode = mode;
                                    remember_settings(&svc, state);
                                }
                            }
                        },
                        for mode in ColorMode::ALL {
                            option {
                                value: "{mode}",
                                selected: mode == snapshot.settings.color_mode,
                                "{mode}"
                            }
                        }
                    }
                }
            }

            // Scan
            button {
                style: "width: 100%; padding: 16px; border-radius: 12px; border: none; background: #007aff; color: white; font-size: 18px; font-weight: bold;",
                disabled: busy || snapshot.selected_device.is_none(),
                onclick: {
                    let svc = svc.clone();
                    move |_| start_scan(svc.clone(), state)
                },
                if busy { "Working..." } else { "Scan page" }
            }

            h3 { style: "margin-top: 24px;", "{pages} page(s) in this document" }

            // Actions
            div { style: "display: flex; gap: 8px;",
                button {
                    style: "flex: 1; padding: 12px; border-radius: 8px; border: none; background: #2e7d32; color: white; font-weight: bold;",
                    disabled: busy || pages == 0,
                    onclick: {
                        let svc = svc.clone();
                        move |_| save_document(svc.clone(), state)
                    },
                    "Save PDF"
                }
                button {
                    style: "flex: 1; padding: 12px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                    disabled: busy || pages == 0,
                    onclick: {
                        let svc = svc.clone();
                        move |_| clear_pages(svc.clone(), state)
                    },
                    "Clear"
                }
            }

            // Output folder
            div { style: "margin-top: 16px; font-size: 14px; color: #666; display: flex; align-items: center; gap: 8px;",
                span { style: "flex: 1; overflow: hidden; text-overflow: ellipsis;", "Saving to {output}" }
                button {
                    style: "padding: 6px 12px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                    disabled: busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| choose_output_folder(&svc, state)
                    },
                    "Change..."
                }
            }

            // Status
            div {
                style: "margin-top: 24px; padding: 12px; border-left: 4px solid {status_color}; background: #f7f7f7; border-radius: 4px;",
                p { style: "margin: 0; color: {status_color}; font-weight: bold;", "{status.message}" }
                if let Some(detail) = status.detail.as_ref() {
                    p { style: "margin: 4px 0 0 0; color: #555; font-size: 14px;", "{detail}" }
                }
            }
        }
    }
}

// -- Actions ------------------------------------------------------------------

fn refresh_devices(svc: AppServices, mut state: Signal<AppState>) {
    {
        let mut s = state.write();
        s.busy = true;
        s.status = StatusLine::info("Looking for scanners...");
    }
    spawn(async move {
        let list = svc.enumerate().await;
        let pages = svc.page_count().await;
        let mut s = state.write();
        s.apply_devices(list);
        s.page_count = pages;
        s.busy = false;
    });
}

fn start_scan(svc: AppServices, mut state: Signal<AppState>) {
    let (device, settings) = {
        let s = state.read();
        (s.selected().cloned(), s.settings)
    };
    let Some(device) = device else {
        state.write().status = StatusLine {
            message: "Pick a scanner first.".into(),
            detail: None,
            tone: Tone::Warning,
        };
        return;
    };

    {
        let mut s = state.write();
        s.busy = true;
        s.status = StatusLine::info(format!("Starting {}...", device.label));
    }

    spawn(async move {
        let (events, mut progress) = tokio::sync::mpsc::unbounded_channel();
        let scan = svc.scan_page(device, settings, events);
        tokio::pin!(scan);

        let result = loop {
            tokio::select! {
                result = &mut scan => break result,
                Some(event) = progress.recv() => {
                    state.write().status = StatusLine::from_event(&event);
                }
            }
        };

        let mut s = state.write();
        match result {
            Ok(count) => {
                s.page_count = count;
                s.status = StatusLine::success(format!("Page {count} added."));
            }
            Err(e) => {
                tracing::warn!(error = %e, "scan failed");
                s.status = StatusLine::from_error(&e);
            }
        }
        s.busy = false;
    });
}

fn save_document(svc: AppServices, mut state: Signal<AppState>) {
    {
        let mut s = state.write();
        s.busy = true;
        s.status = StatusLine::info("Building the PDF...");
    }
    spawn(async move {
        let result = svc.save_pdf().await;
        let mut s = state.write();
        s.status = match result {
            Ok(saved) => {
                let mut line = StatusLine::success(format!(
                    "Saved {} page(s) to {}",
                    saved.pages,
                    saved.path.display()
                ));
                line.detail = saved
                    .page_size_pt
                    .map(|(w, h)| format!("Page size {w:.0} x {h:.0} pt"));
                line
            }
            Err(e) => StatusLine::from_error(&e),
        };
        s.busy = false;
    });
}

fn clear_pages(svc: AppServices, mut state: Signal<AppState>) {
    state.write().busy = true;
    spawn(async move {
        let outcome = svc.clear().await;
        let mut s = state.write();
        s.page_count = 0;
        s.status = match &outcome.warning {
            Some(warning) => StatusLine::from_error(warning),
            None => StatusLine::success(format!("Cleared {} page(s).", outcome.removed)),
        };
        s.busy = false;
    });
}

fn choose_output_folder(svc: &AppServices, mut state: Signal<AppState>) {
    let current = state.read().output_dir.clone();
    let Some(folder) = rfd::FileDialog::new().set_directory(&current).pick_folder() else {
        return;
    };
    tracing::info!(folder = %folder.display(), "output folder chosen");
    let persisted = svc.update_config(|c| c.output_dir = folder.clone());
    let mut s = state.write();
    s.output_dir = folder;
    if let Err(e) = persisted {
        s.status = StatusLine::from_error(&e);
    }
}

/// Keep the chosen settings as the default for next launch.
fn remember_settings(svc: &AppServices, mut state: Signal<AppState>) {
    let settings = state.read().settings;
    if let Err(e) = svc.update_config(|c| c.default_settings = settings) {
        tracing::warn!(error = %e, "could not save settings");
        state.write().status = StatusLine::from_error(&e);
    }
}
