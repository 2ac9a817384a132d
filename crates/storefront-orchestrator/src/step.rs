use crate::handler::Handlers;

/// A named step of a workflow.
///
/// The step's output is exposed to dependents under its name and under each
/// of its aliases. `depends_on` keys may name either.
pub struct StepDefinition<C, X> {
    name: String,
    handlers: Handlers<C, X>,
    depends_on: Vec<String>,
    aliases: Vec<String>,
    no_compensation: bool,
}

impl<C, X> StepDefinition<C, X> {
    pub fn new(name: impl Into<String>, handlers: Handlers<C, X>) -> Self {
        Self {
            name: name.into(),
            handlers,
            depends_on: Vec::new(),
            aliases: Vec::new(),
            no_compensation: false,
        }
    }

    /// Declare the keys whose outputs this step requires.
    #[must_use]
    pub fn depends_on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            let key = key.into();
            if !self.depends_on.contains(&key) {
                self.depends_on.push(key);
            }
        }
        self
    }

    /// Expose this step's output under an additional name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Mark the step as having no side effect to undo.
    ///
    /// A failure of this step still reverts the other completed steps.
    #[must_use]
    pub fn no_compensation(mut self) -> Self {
        self.no_compensation = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[must_use]
    pub fn skips_compensation(&self) -> bool {
        self.no_compensation
    }

    #[must_use]
    pub fn handlers(&self) -> &Handlers<C, X> {
        &self.handlers
    }

    pub(crate) fn set_handlers(&mut self, handlers: Handlers<C, X>) {
        self.handlers = handlers;
    }
}

impl<C, X> Clone for StepDefinition<C, X> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handlers: self.handlers.clone(),
            depends_on: self.depends_on.clone(),
            aliases: self.aliases.clone(),
            no_compensation: self.no_compensation,
        }
    }
}

impl<C, X> std::fmt::Debug for StepDefinition<C, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("aliases", &self.aliases)
            .field("no_compensation", &self.no_compensation)
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Options for [`append_action`](crate::WorkflowDefinition::append_action).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOptions {
    pub no_compensation: bool,
}
