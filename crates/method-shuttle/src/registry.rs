//! Reconstruction recipes, keyed by unit type.

use crate::envelope::check_args;
use crate::{
    ArgKind, ArgReader, FailureKind, RemoteFailure, ShuttleError, ValueUnit, VoidUnit,
    WorkUnit, WorkUnitEnvelope,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

type Runner<C> =
    Box<dyn Fn(ArgReader<C>) -> Result<Option<serde_json::Value>, RemoteFailure> + Send + Sync>;

struct Recipe<C> {
    params: &'static [ArgKind],
    run: Runner<C>,
}

/// Work units the executing side knows how to rebuild.
pub struct UnitRegistry<C> {
    recipes: HashMap<&'static str, Recipe<C>>,
}

impl<C: Send + Sync + 'static> UnitRegistry<C> {
    pub fn new() -> Self {
        Self {
            recipes: HashMap::new(),
        }
    }

    /// Register a unit without a return value.
    pub fn register_void<U>(&mut self) -> &mut Self
    where
        U: VoidUnit<Context = C>,
    {
        self.insert(
            U::UNIT_TYPE,
            U::PARAMS,
            Box::new(|args: ArgReader<C>| {
                let unit = rebuild::<U>(args)?;
                unit.invoke().map_err(|e| RemoteFailure::from_error(&e))?;
                Ok(None)
            }),
        )
    }

    /// Register a unit returning a value.
    pub fn register_value<U>(&mut self) -> &mut Self
    where
        U: ValueUnit<Context = C>,
    {
        self.insert(
            U::UNIT_TYPE,
            U::PARAMS,
            Box::new(|args: ArgReader<C>| {
                let unit = rebuild::<U>(args)?;
                let output = unit.invoke().map_err(|e| RemoteFailure::from_error(&e))?;
                serde_json::to_value(output)
                    .map(Some)
                    .map_err(|e| RemoteFailure {
                        kind: FailureKind::Execution,
                        message: format!("{}: result cannot be transported: {}", U::UNIT_TYPE, e),
                        causes: Vec::new(),
                    })
            }),
        )
    }

    fn insert(
        &mut self,
        unit_type: &'static str,
        params: &'static [ArgKind],
        run: Runner<C>,
    ) -> &mut Self {
        if self
            .recipes
            .insert(unit_type, Recipe { params, run })
            .is_some()
        {
            warn!(unit_type, "work unit registered twice, keeping the last");
        }
        self
    }

    pub fn contains(&self, unit_type: &str) -> bool {
        self.recipes.contains_key(unit_type)
    }

    /// Registered parameter list of a unit type.
    pub fn params(&self, unit_type: &str) -> Option<&'static [ArgKind]> {
        self.recipes.get(unit_type).map(|recipe| recipe.params)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Rebuild and run an envelope. The unit body never runs unless the
    /// envelope matches the registered parameter list exactly.
    pub(crate) fn run(
        &self,
        envelope: &WorkUnitEnvelope,
        context: Arc<C>,
    ) -> Result<Option<serde_json::Value>, RemoteFailure> {
        let recipe = self
            .recipes
            .get(envelope.unit_type.as_str())
            .ok_or_else(|| {
                RemoteFailure::reconstruction(format!(
                    "Unknown work unit type: {}",
                    envelope.unit_type
                ))
            })?;
        check_args(&envelope.unit_type, recipe.params, &envelope.args)
            .map_err(RemoteFailure::reconstruction)?;

        (recipe.run)(ArgReader::new(
            &envelope.unit_type,
            envelope.args.clone(),
            context,
        ))
    }
}

impl<C: Send + Sync + 'static> Default for UnitRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn rebuild<U: WorkUnit>(mut args: ArgReader<U::Context>) -> Result<U, RemoteFailure> {
    let unit = U::reconstruct(&mut args).map_err(reconstruction_failure)?;
    args.finish().map_err(reconstruction_failure)?;
    Ok(unit)
}

fn reconstruction_failure(error: ShuttleError) -> RemoteFailure {
    match error {
        ShuttleError::Reconstruction(message) => RemoteFailure::reconstruction(message),
        other => RemoteFailure::reconstruction(other.to_string()),
    }
}
