use anyhow::Result;
use sesh_core::Error;

use crate::context::Ctx;
use crate::output;

pub fn run(ctx: &Ctx) -> Result<()> {
    let history = ctx.history()?;
    match ctx.switcher(None).pop(&history) {
        Ok(entry) => {
            output::success(format!("Switched to {}", entry.session_name));
            Ok(())
        }
        Err(Error::SessionGone(name)) => Err(anyhow::anyhow!(
            "previous session {name} no longer exists (use `sesh switch` to recreate it)"
        )),
        Err(e) => Err(e.into()),
    }
}
