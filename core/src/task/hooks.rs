use crate::errors::{BoxError, EaseError, SharedError};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

#[allow(unused_imports)]
use crate::engine::Engine;

/// [`HookKind`] names a lifecycle point of a task or a job. [`HookKind::Primary`] is the task
/// body itself (the runner), jobs have no primary handler and reject it
///
/// # Parsing
/// [`HookKind`] parses (case-insensitively) from ``before``, ``after``, ``error`` and
/// ``suspend``, the primary slot has no textual name and is what an address without a
/// ``:hook`` suffix resolves to
///
/// # See Also
/// - [`HookAddress`]
/// - [`Engine::task_hook`]
/// - [`Engine::job_hook`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Primary,
    Before,
    After,
    Error,
    Suspend,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Primary => "primary",
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::Error => "error",
            HookKind::Suspend => "suspend",
        }
    }
}

impl Display for HookKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "before" => Ok(HookKind::Before),
            "after" => Ok(HookKind::After),
            "error" => Ok(HookKind::Error),
            "suspend" => Ok(HookKind::Suspend),
            _ => Err(()),
        }
    }
}

/// Whether a hook belongs to a task or to a job, only used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Task,
    Job,
}

impl Display for SubjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectKind::Task => f.write_str("task"),
            SubjectKind::Job => f.write_str("job"),
        }
    }
}

/// A parsed ``base[:hook]`` registration address. The base name is lower-cased, registry keys
/// are case-insensitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookAddress {
    pub name: String,
    pub kind: HookKind,
}

impl HookAddress {
    /// Parses ``address`` for the given subject, an unknown suffix yields
    /// [`EaseError::UnsupportedHook`]
    pub fn parse(subject: SubjectKind, address: &str) -> Result<Self, EaseError> {
        let mut components = address.split(':');
        let name = normalize_name(components.next().unwrap_or_default());

        let kind = match components.next().map(str::trim) {
            None | Some("") => HookKind::Primary,
            Some(hook) => hook
                .parse::<HookKind>()
                .map_err(|_| EaseError::UnsupportedHook {
                    subject,
                    name: name.clone(),
                    hook: hook.to_lowercase(),
                })?,
        };

        Ok(Self { name, kind })
    }
}

/// Registry keys are compared case-insensitively
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// [`HookSet`] stores the four lifecycle hooks of one subject. It is generic over the handler
/// trait object, tasks store ``dyn TaskHandler`` and jobs ``dyn JobHandler``
///
/// Cloning a [`HookSet`] only clones the [`Arc`] handles, the executors take such a snapshot
/// so no registry lock is held while a hook runs
pub struct HookSet<H: ?Sized> {
    before: Option<Arc<H>>,
    after: Option<Arc<H>>,
    error: Option<Arc<H>>,
    suspend: Option<Arc<H>>,
}

impl<H: ?Sized> Default for HookSet<H> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            error: None,
            suspend: None,
        }
    }
}

impl<H: ?Sized> Clone for HookSet<H> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
            error: self.error.clone(),
            suspend: self.suspend.clone(),
        }
    }
}

impl<H: ?Sized> HookSet<H> {
    /// Gets the hook registered for ``kind``, [`HookKind::Primary`] is never stored here
    pub fn get(&self, kind: HookKind) -> Option<Arc<H>> {
        match kind {
            HookKind::Primary => None,
            HookKind::Before => self.before.clone(),
            HookKind::After => self.after.clone(),
            HookKind::Error => self.error.clone(),
            HookKind::Suspend => self.suspend.clone(),
        }
    }

    /// Replaces the hook for ``kind``, returns ``false`` for [`HookKind::Primary`]
    pub fn set(&mut self, kind: HookKind, handler: Arc<H>) -> bool {
        let slot = match kind {
            HookKind::Primary => return false,
            HookKind::Before => &mut self.before,
            HookKind::After => &mut self.after,
            HookKind::Error => &mut self.error,
            HookKind::Suspend => &mut self.suspend,
        };

        *slot = Some(handler);
        true
    }
}

/// Turns a handler failure into the shared form, done once so every consumer sees the same
/// instance
pub(crate) fn share(error: BoxError) -> SharedError {
    Arc::from(error)
}

/// Wraps a failure raised inside a hook into [`EaseError::HookError`]
pub(crate) fn hook_error(
    subject: SubjectKind,
    name: &str,
    hook: HookKind,
    error: BoxError,
) -> EaseError {
    EaseError::HookError {
        subject,
        name: name.to_string(),
        hook,
        source: share(error),
    }
}
