//! Theme models and theme-change notification
//!
//! [`ThemeRegistry`] holds the one current theme and notifies
//! subscribers synchronously when it changes. Subscribing returns a
//! [`Subscription`]; dropping it unregisters the listener.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::resolver::FileResolver;
use crate::error::{RegistryError, Result};
use crate::syntax::Theme;

/// A theme source and its lazily loaded theme
#[derive(Debug, Clone)]
pub struct ThemeModel {
    source: Option<String>,
    theme: Option<Arc<Theme>>,
}

impl ThemeModel {
    /// A theme read from `path` on first load
    pub fn new(path: &str) -> Self {
        Self {
            source: Some(path.to_string()),
            theme: None,
        }
    }

    /// An already built theme
    pub fn from_theme(theme: Theme) -> Self {
        Self {
            source: None,
            theme: Some(Arc::new(theme)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.theme.is_some()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn theme(&self) -> Option<&Arc<Theme>> {
        self.theme.as_ref()
    }

    /// Load the theme unless already loaded
    pub fn load(&mut self, resolver: &dyn FileResolver) -> Result<Arc<Theme>> {
        if let Some(theme) = &self.theme {
            return Ok(Arc::clone(theme));
        }
        let path = self
            .source
            .as_deref()
            .ok_or_else(|| RegistryError::NotFound("<theme without source>".to_string()))?;
        let text = resolver
            .read(path)?
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;
        let theme = Arc::new(Theme::parse(path, &text)?);
        self.theme = Some(Arc::clone(&theme));
        Ok(theme)
    }
}

type Listener = Box<dyn Fn(&mut ThemeModel) -> Result<()> + Send + Sync>;

#[derive(Default)]
struct ThemeState {
    current: Option<ThemeModel>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Holds the current theme and its change listeners
#[derive(Default, Clone)]
pub struct ThemeRegistry {
    state: Arc<Mutex<ThemeState>>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ThemeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener invoked on every theme change
    ///
    /// Listeners run while the notifier is locked and must not call
    /// back into this `ThemeRegistry`.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&mut ThemeModel) -> Result<()> + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Box::new(listener)));
        Subscription {
            state: Arc::downgrade(&self.state),
            id,
        }
    }

    /// Make `model` the current theme
    ///
    /// Every listener sees the change before this returns. If a listener
    /// fails the error is returned, the listeners that already took the
    /// new theme are handed the previous one again (the default theme if
    /// none was set), and the previous theme stays current.
    pub fn set_theme(&self, mut model: ThemeModel) -> Result<()> {
        let mut state = self.lock();
        for (idx, (_, listener)) in state.listeners.iter().enumerate() {
            if let Err(e) = listener(&mut model) {
                let mut previous = state
                    .current
                    .clone()
                    .unwrap_or_else(|| ThemeModel::from_theme(Theme::default()));
                for (_, applied) in &state.listeners[..idx] {
                    if let Err(restore) = applied(&mut previous) {
                        tracing::warn!(error = %restore, "failed to restore previous theme");
                    }
                }
                return Err(e);
            }
        }
        tracing::info!(source = model.source().unwrap_or("<builtin>"), "theme changed");
        state.current = Some(model);
        Ok(())
    }

    /// The current theme model
    pub fn current(&self) -> Option<ThemeModel> {
        self.lock().current.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

/// Keeps a theme listener registered until dropped or cancelled
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    state: Weak<Mutex<ThemeState>>,
    id: u64,
}

impl Subscription {
    /// Unregister the listener now
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
