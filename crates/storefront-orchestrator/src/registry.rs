use indexmap::IndexMap;

use crate::error::DefinitionError;
use crate::handler::Handlers;

/// Named actions that manifest-declared steps resolve their handlers from.
pub struct ActionRegistry<C, X> {
    actions: IndexMap<String, Handlers<C, X>>,
}

impl<C, X> ActionRegistry<C, X> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: IndexMap::new(),
        }
    }

    /// Register handlers under a unique action name.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::DuplicateAction` if the name is taken.
    pub fn register(
        &mut self,
        action: impl Into<String>,
        handlers: Handlers<C, X>,
    ) -> Result<&mut Self, DefinitionError> {
        let action = action.into();
        if self.actions.contains_key(&action) {
            return Err(DefinitionError::DuplicateAction { action });
        }
        self.actions.insert(action, handlers);
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, action: &str) -> Option<&Handlers<C, X>> {
        self.actions.get(action)
    }

    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Registered action names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<C, X> Default for ActionRegistry<C, X> {
    fn default() -> Self {
        Self::new()
    }
}
