use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

/// Cleanup hooks to run on Ctrl-C. The handler stays passive (hooks only, no
/// exit) during child handoff so the child's own interrupt handling decides
/// the final exit code; during an install it exits 130 after cleanup.
#[derive(Clone)]
pub struct InterruptHooks {
    hooks: Arc<Mutex<Vec<Box<dyn Fn() + Send>>>>,
    exit_on_interrupt: Arc<AtomicBool>,
}

impl InterruptHooks {
    pub fn new() -> Self {
        Self {
            hooks: Arc::new(Mutex::new(Vec::new())),
            exit_on_interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn install_handler(&self) -> Result<()> {
        let hooks = self.clone();
        ctrlc::set_handler(move || {
            hooks.run_hooks();
            if hooks.exit_on_interrupt.load(Ordering::SeqCst) {
                process::exit(130);
            }
        })
        .context("failed to install interrupt handler")
    }

    pub fn register(&self, hook: Box<dyn Fn() + Send>) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.push(hook);
        }
    }

    pub fn set_exit_on_interrupt(&self, value: bool) {
        self.exit_on_interrupt.store(value, Ordering::SeqCst);
    }

    pub(crate) fn run_hooks(&self) {
        if let Ok(hooks) = self.hooks.lock() {
            for hook in hooks.iter() {
                hook();
            }
        }
    }
}
