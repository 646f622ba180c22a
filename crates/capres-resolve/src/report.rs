//! Human-readable dump of a resolve context.
//!
//! Level 1 prints the session summary and failed requirements, level 2 adds
//! the system capabilities and input requirements, level 3 adds the blacklist.

use std::io::{self, Write};

use crate::context::RepositoryResolveContext;

pub struct DebugReporter<'a, W: Write> {
    out: W,
    context: &'a RepositoryResolveContext,
    level: u8,
}

impl<'a, W: Write> DebugReporter<'a, W> {
    pub fn new(out: W, context: &'a RepositoryResolveContext, level: u8) -> Self {
        Self { out, context, level }
    }

    pub fn report(&mut self) -> io::Result<()> {
        if self.level == 0 {
            return Ok(());
        }
        let ctx = self.context;

        writeln!(self.out, "============ Resolve context ============")?;
        match ctx.framework() {
            Some(f) => writeln!(self.out, "framework     {f}")?,
            None => writeln!(self.out, "framework     <none>")?,
        }
        match ctx.system_resource() {
            Some(s) => writeln!(self.out, "system        {s}")?,
            None => writeln!(self.out, "system        <none>")?,
        }
        match ctx.input_resource() {
            Some(i) => writeln!(self.out, "input         {i}")?,
            None => writeln!(self.out, "input         <none>")?,
        }
        for (i, repo) in ctx.repositories().iter().enumerate() {
            writeln!(self.out, "repository {i:<2} {}", repo.name())?;
        }
        for (effective, excluded) in ctx.effective_set() {
            let excluded: Vec<&str> = excluded.iter().map(String::as_str).collect();
            writeln!(self.out, "effective     {effective} excluding [{}]", excluded.join(", "))?;
        }
        writeln!(
            self.out,
            "hooks         {} resolver hook(s), {} callback(s)",
            ctx.resolver_hooks().len(),
            ctx.callbacks().len()
        )?;
        writeln!(self.out, "------------ Failed requirements ------------")?;
        for req in ctx.failed() {
            writeln!(self.out, "  {req}")?;
        }

        if self.level >= 2 {
            writeln!(self.out, "------------ System capabilities ------------")?;
            for cap in ctx.system_capabilities() {
                writeln!(self.out, "  {cap}")?;
            }
            if let Some(input) = ctx.input_resource() {
                writeln!(self.out, "------------ Input requirements ------------")?;
                for req in input.requirements(None) {
                    writeln!(self.out, "  {req}")?;
                }
            }
        }

        if self.level >= 3 {
            writeln!(self.out, "------------ Blacklist ------------")?;
            for r in ctx.black_list() {
                writeln!(self.out, "  {r}")?;
            }
        }

        self.out.flush()
    }
}
