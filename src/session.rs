//! UI session - Which windows are open and what closing them means

use crate::menu::Platform;

/// What the shell should do after a window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    KeepRunning,
    Quit,
}

/// Window lifecycle state for one run of the application
#[derive(Debug, Clone)]
pub struct UiSession {
    platform: Platform,
    main_open: bool,
    about_open: bool,
    /// Bumped every time the main window is (re)created
    main_generation: u32,
}

impl UiSession {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            main_open: true,
            about_open: false,
            main_generation: 1,
        }
    }

    pub fn main_open(&self) -> bool {
        self.main_open
    }

    pub fn about_open(&self) -> bool {
        self.about_open
    }

    pub fn main_generation(&self) -> u32 {
        self.main_generation
    }

    pub fn open_windows(&self) -> usize {
        usize::from(self.main_open) + usize::from(self.about_open)
    }

    pub fn open_about(&mut self) {
        self.about_open = true;
    }

    pub fn close_main(&mut self) -> LifecycleAction {
        self.main_open = false;
        self.after_close()
    }

    pub fn close_about(&mut self) -> LifecycleAction {
        self.about_open = false;
        self.after_close()
    }

    /// The application was reactivated. Returns true if the main window
    /// had to be recreated.
    pub fn activate(&mut self) -> bool {
        if self.open_windows() > 0 {
            return false;
        }
        self.main_open = true;
        self.main_generation += 1;
        log::info!("Recreating main window");
        true
    }

    /// The hidden main window was brought back while another window kept
    /// the application alive. The form is kept as it was.
    pub fn reopen_main(&mut self) {
        self.main_open = true;
    }

    fn after_close(&self) -> LifecycleAction {
        if self.open_windows() == 0 && !self.platform.keeps_running_without_windows() {
            LifecycleAction::Quit
        } else {
            LifecycleAction::KeepRunning
        }
    }
}
