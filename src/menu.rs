//! Menu bar - Platform dependent menu template and its egui rendering

use crate::APP_NAME;

/// Platform family, as far as menus and window lifecycle care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    /// Whether the process stays alive once every window is closed
    pub fn keeps_running_without_windows(self) -> bool {
        self == Platform::MacOs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    About,
    CloseWindow,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub label: &'static str,
    pub items: Vec<MenuItem>,
}

/// Build the menu template for a platform.
///
/// macOS gets an application menu in front of File; everyone else gets a
/// Help menu after it. Both carry the About entry.
pub fn menu_template(platform: Platform) -> Vec<Menu> {
    let about = MenuItem {
        label: "About",
        action: MenuAction::About,
    };

    match platform {
        Platform::MacOs => vec![
            Menu {
                label: APP_NAME,
                items: vec![about],
            },
            file_menu(platform),
        ],
        Platform::Other => vec![
            file_menu(platform),
            Menu {
                label: "Help",
                items: vec![about],
            },
        ],
    }
}

fn file_menu(platform: Platform) -> Menu {
    let item = match platform {
        Platform::MacOs => MenuItem {
            label: "Close Window",
            action: MenuAction::CloseWindow,
        },
        Platform::Other => MenuItem {
            label: "Quit",
            action: MenuAction::Quit,
        },
    };
    Menu {
        label: "File",
        items: vec![item],
    }
}

/// Draw the menu bar, returning the action the user picked this frame
pub fn show_menu_bar(ui: &mut egui::Ui, menus: &[Menu]) -> Option<MenuAction> {
    let mut picked = None;
    egui::menu::bar(ui, |ui| {
        for menu in menus {
            ui.menu_button(menu.label, |ui| {
                for item in &menu.items {
                    if ui.button(item.label).clicked() {
                        picked = Some(item.action);
                        ui.close_menu();
                    }
                }
            });
        }
    });
    picked
}
