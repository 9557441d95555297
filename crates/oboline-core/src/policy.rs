//! Severity policies.
//!
//! The load and resolution passes never hard-code the severity of
//! recoverable conditions; the caller picks a policy per condition class:
//!
//! - [`UnhandledTagPolicy`] — a tag no reader recognizes,
//! - [`DeprecatedTagPolicy`] — a tag kept for backward compatibility,
//! - [`ResolutionPolicy`] — a dangling or obsolete reference target.
//!
//! Each policy is a plain tagged variant with one evaluation function.
//! Warn-flavored variants emit a `tracing::warn!` event and succeed; fail
//! variants return the underlying [`OboError`].

use crate::error::OboError;
use crate::value::SourcedValue;

/// What to do with a tag that no reader recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnhandledTagPolicy {
    /// Raise an [`OboError::UnhandledTag`].
    #[default]
    Fail,
    /// Log a warning and continue.
    Warn,
    /// Append `(tag, value)` to the target's unhandled-tag list.
    Record,
    /// Both of the above.
    WarnAndRecord,
    /// Silently drop the tag.
    Ignore,
}

impl UnhandledTagPolicy {
    pub(crate) fn apply(
        self,
        tag: &str,
        value: SourcedValue<String>,
        record: &mut Vec<(String, SourcedValue<String>)>,
    ) -> Result<(), OboError> {
        match self {
            UnhandledTagPolicy::Fail => Err(OboError::UnhandledTag {
                location: value.location,
                tag: tag.to_string(),
            }),
            UnhandledTagPolicy::Warn => {
                tracing::warn!("{}: unhandled tag {tag}", value.location);
                Ok(())
            }
            UnhandledTagPolicy::Record => {
                record.push((tag.to_string(), value));
                Ok(())
            }
            UnhandledTagPolicy::WarnAndRecord => {
                tracing::warn!("{}: unhandled tag {tag}", value.location);
                record.push((tag.to_string(), value));
                Ok(())
            }
            UnhandledTagPolicy::Ignore => Ok(()),
        }
    }
}

/// What to do with a deprecated tag (`exact_synonym`, `use_term`, ...).
///
/// The tag is processed normally either way; the policy only controls the
/// diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeprecatedTagPolicy {
    #[default]
    Warn,
    Silent,
}

impl DeprecatedTagPolicy {
    pub(crate) fn apply(self, tag: &str, value: &SourcedValue<String>) {
        if self == DeprecatedTagPolicy::Warn {
            tracing::warn!("{}: deprecated tag: {tag}", value.location);
        }
    }
}

/// Severity of a failed resolution (dangling target, dangling relation
/// type, undeclared synonym type or subset, obsolete target).
///
/// `Warn` and `WarnAndIgnore` behave identically today; both are kept so a
/// caller can state its intent explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    #[default]
    Fail,
    Warn,
    Ignore,
    WarnAndIgnore,
}

impl ResolutionPolicy {
    pub(crate) fn apply(self, err: OboError) -> Result<(), OboError> {
        match self {
            ResolutionPolicy::Fail => Err(err),
            ResolutionPolicy::Warn | ResolutionPolicy::WarnAndIgnore => {
                tracing::warn!("{err}");
                Ok(())
            }
            ResolutionPolicy::Ignore => Ok(()),
        }
    }
}
