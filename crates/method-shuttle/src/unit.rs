//! Work-unit traits and reconstruction helpers.

use crate::{ArgKind, CapturedArg, ShuttleError, ShuttleResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A named value object that can be captured and rebuilt elsewhere.
///
/// `PARAMS` is the unit's single constructor shape: `capture` must return
/// one value per entry, in order, and `reconstruct` must read them back in
/// the same order.
pub trait WorkUnit: Sized + Send + 'static {
    /// Ambient execution context the unit runs against.
    type Context: Send + Sync + 'static;

    /// Type tag under which the executing side registers the unit.
    const UNIT_TYPE: &'static str;

    /// Declared parameter kinds.
    const PARAMS: &'static [ArgKind];

    /// Captured field values. The context slot is [`CapturedArg::Ambient`].
    fn capture(&self) -> Vec<CapturedArg>;

    /// Rebuild the unit from checked arguments.
    fn reconstruct(args: &mut ArgReader<Self::Context>) -> ShuttleResult<Self>;
}

/// A work unit without a return value.
pub trait VoidUnit: WorkUnit {
    fn invoke(self) -> anyhow::Result<()>;
}

/// A work unit returning a value to the origin.
pub trait ValueUnit: WorkUnit {
    type Output: Serialize + DeserializeOwned + Clone + Send + 'static;

    fn invoke(self) -> anyhow::Result<Self::Output>;
}

/// Ambient context slot of a work unit.
///
/// Empty on the origin side; bound to the live context when the executor
/// rebuilds the unit.
pub struct Ambient<C> {
    context: Option<Arc<C>>,
}

impl<C> Ambient<C> {
    /// The unbound origin-side placeholder.
    pub fn placeholder() -> Self {
        Self { context: None }
    }

    pub(crate) fn bound(context: Arc<C>) -> Self {
        Self {
            context: Some(context),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.context.is_some()
    }

    /// The live context. Fails when called on the origin side.
    pub fn get(&self) -> ShuttleResult<&C> {
        self.context.as_deref().ok_or_else(|| {
            ShuttleError::Reconstruction("ambient context is not bound here".to_string())
        })
    }
}

impl<C> Default for Ambient<C> {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl<C> Clone for Ambient<C> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<C> fmt::Debug for Ambient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bound() {
            f.write_str("Ambient(bound)")
        } else {
            f.write_str("Ambient(placeholder)")
        }
    }
}

/// Typed, in-order access to an envelope's arguments.
///
/// Every accessor takes the next argument and fails with a reconstruction
/// error if it has a different kind. Values are never coerced.
pub struct ArgReader<C> {
    unit_type: String,
    args: std::vec::IntoIter<CapturedArg>,
    position: usize,
    context: Arc<C>,
}

impl<C> ArgReader<C> {
    pub(crate) fn new(unit_type: &str, args: Vec<CapturedArg>, context: Arc<C>) -> Self {
        Self {
            unit_type: unit_type.to_string(),
            args: args.into_iter(),
            position: 0,
            context,
        }
    }

    fn next(&mut self, expected: ArgKind) -> ShuttleResult<CapturedArg> {
        let index = self.position;
        self.position += 1;
        let arg = self.args.next().ok_or_else(|| {
            ShuttleError::Reconstruction(format!(
                "{}: missing parameter {} ({})",
                self.unit_type, index, expected
            ))
        })?;
        if arg.kind() != expected {
            return Err(ShuttleError::Reconstruction(format!(
                "{}: parameter {} type mismatch: expects {}, got {}",
                self.unit_type,
                index,
                expected,
                arg.kind()
            )));
        }
        Ok(arg)
    }

    /// Bind the ambient context slot.
    pub fn ambient(&mut self) -> ShuttleResult<Ambient<C>> {
        self.next(ArgKind::Ambient)?;
        Ok(Ambient::bound(self.context.clone()))
    }

    pub fn bool(&mut self) -> ShuttleResult<bool> {
        match self.next(ArgKind::Bool)? {
            CapturedArg::Bool(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn int(&mut self) -> ShuttleResult<i64> {
        match self.next(ArgKind::Int)? {
            CapturedArg::Int(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn float(&mut self) -> ShuttleResult<f64> {
        match self.next(ArgKind::Float)? {
            CapturedArg::Float(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn text(&mut self) -> ShuttleResult<String> {
        match self.next(ArgKind::Text)? {
            CapturedArg::Text(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn bytes(&mut self) -> ShuttleResult<Vec<u8>> {
        match self.next(ArgKind::Bytes)? {
            CapturedArg::Bytes(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn text_list(&mut self) -> ShuttleResult<Vec<String>> {
        match self.next(ArgKind::TextList)? {
            CapturedArg::TextList(value) => Ok(value),
            other => Err(self.unexpected(other)),
        }
    }

    /// Fail if arguments remain unread.
    pub fn finish(self) -> ShuttleResult<()> {
        let remaining = self.args.len();
        if remaining > 0 {
            return Err(ShuttleError::Reconstruction(format!(
                "{}: {} captured values left unread",
                self.unit_type, remaining
            )));
        }
        Ok(())
    }

    fn unexpected(&self, arg: CapturedArg) -> ShuttleError {
        ShuttleError::Reconstruction(format!(
            "{}: unexpected {} value",
            self.unit_type,
            arg.kind()
        ))
    }
}
