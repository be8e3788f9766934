//! Work units run inside the execution context against its target table.

use crate::profile::ProfileContext;
use method_shuttle::{
    Ambient, ArgKind, ArgReader, CapturedArg, ShuttleResult, UnitRegistry, ValueUnit, WorkUnit,
};

/// Registry of every unit the controller ships.
pub fn unit_registry() -> UnitRegistry<ProfileContext> {
    let mut registry = UnitRegistry::new();
    registry
        .register_value::<SetTargetActive>()
        .register_value::<SetTargetsSuspended>()
        .register_value::<EnsureFreeToLaunch>()
        .register_value::<LaunchTarget>();
    registry
}

pub struct SetTargetActive {
    ctx: Ambient<ProfileContext>,
    target: String,
    active: bool,
}

impl SetTargetActive {
    pub fn new(target: &str, active: bool) -> Self {
        Self {
            ctx: Ambient::placeholder(),
            target: target.to_string(),
            active,
        }
    }
}

impl WorkUnit for SetTargetActive {
    type Context = ProfileContext;
    const UNIT_TYPE: &'static str = "gatehouse.set_target_active";
    const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::Text, ArgKind::Bool];

    fn capture(&self) -> Vec<CapturedArg> {
        vec![
            CapturedArg::Ambient,
            self.target.as_str().into(),
            self.active.into(),
        ]
    }

    fn reconstruct(args: &mut ArgReader<ProfileContext>) -> ShuttleResult<Self> {
        Ok(Self {
            ctx: args.ambient()?,
            target: args.text()?,
            active: args.bool()?,
        })
    }
}

impl ValueUnit for SetTargetActive {
    type Output = bool;

    fn invoke(self) -> anyhow::Result<bool> {
        Ok(self.ctx.get()?.set_active(&self.target, self.active))
    }
}

pub struct SetTargetsSuspended {
    ctx: Ambient<ProfileContext>,
    targets: Vec<String>,
    suspended: bool,
}

impl SetTargetsSuspended {
    pub fn new(targets: &[String], suspended: bool) -> Self {
        Self {
            ctx: Ambient::placeholder(),
            targets: targets.to_vec(),
            suspended,
        }
    }
}

impl WorkUnit for SetTargetsSuspended {
    type Context = ProfileContext;
    const UNIT_TYPE: &'static str = "gatehouse.set_targets_suspended";
    const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::TextList, ArgKind::Bool];

    fn capture(&self) -> Vec<CapturedArg> {
        vec![
            CapturedArg::Ambient,
            self.targets.clone().into(),
            self.suspended.into(),
        ]
    }

    fn reconstruct(args: &mut ArgReader<ProfileContext>) -> ShuttleResult<Self> {
        Ok(Self {
            ctx: args.ambient()?,
            targets: args.text_list()?,
            suspended: args.bool()?,
        })
    }
}

impl ValueUnit for SetTargetsSuspended {
    type Output = Vec<String>;

    fn invoke(self) -> anyhow::Result<Vec<String>> {
        Ok(self.ctx.get()?.set_suspended(&self.targets, self.suspended))
    }
}

pub struct EnsureFreeToLaunch {
    ctx: Ambient<ProfileContext>,
    target: String,
}

impl EnsureFreeToLaunch {
    pub fn new(target: &str) -> Self {
        Self {
            ctx: Ambient::placeholder(),
            target: target.to_string(),
        }
    }
}

impl WorkUnit for EnsureFreeToLaunch {
    type Context = ProfileContext;
    const UNIT_TYPE: &'static str = "gatehouse.ensure_free_to_launch";
    const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::Text];

    fn capture(&self) -> Vec<CapturedArg> {
        vec![CapturedArg::Ambient, self.target.as_str().into()]
    }

    fn reconstruct(args: &mut ArgReader<ProfileContext>) -> ShuttleResult<Self> {
        Ok(Self {
            ctx: args.ambient()?,
            target: args.text()?,
        })
    }
}

impl ValueUnit for EnsureFreeToLaunch {
    type Output = Option<String>;

    fn invoke(self) -> anyhow::Result<Option<String>> {
        Ok(self.ctx.get()?.ensure_free_to_launch(&self.target))
    }
}

pub struct LaunchTarget {
    ctx: Ambient<ProfileContext>,
    target: String,
}

impl LaunchTarget {
    pub fn new(target: &str) -> Self {
        Self {
            ctx: Ambient::placeholder(),
            target: target.to_string(),
        }
    }
}

impl WorkUnit for LaunchTarget {
    type Context = ProfileContext;
    const UNIT_TYPE: &'static str = "gatehouse.launch_target";
    const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::Text];

    fn capture(&self) -> Vec<CapturedArg> {
        vec![CapturedArg::Ambient, self.target.as_str().into()]
    }

    fn reconstruct(args: &mut ArgReader<ProfileContext>) -> ShuttleResult<Self> {
        Ok(Self {
            ctx: args.ambient()?,
            target: args.text()?,
        })
    }
}

impl ValueUnit for LaunchTarget {
    type Output = bool;

    fn invoke(self) -> anyhow::Result<bool> {
        Ok(self.ctx.get()?.launch(&self.target))
    }
}
