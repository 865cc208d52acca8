mod build;
mod clap_command;
mod info;
mod preview;

use std::path::PathBuf;

use clap::{App, ArgMatches};

use crate::config::SceneConfig;

pub use build::Build;
pub use clap_command::ClapCommand;
pub use info::Info;
pub use preview::Preview;

/// One parsed command line, ready to be executed.
pub struct Invocation<'a> {
    pub input_path: PathBuf,
    /// Only set for commands that write files.
    pub output_path: Option<PathBuf>,
    pub config: SceneConfig,
    pub args: &'a ArgMatches,
}

impl Invocation<'_> {
    pub fn output_path(&self) -> anyhow::Result<&PathBuf> {
        self.output_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Missing output directory"))
    }
}

pub trait GlobeCommand {
    fn get_description(&self) -> &'static str;

    fn needs_output(&self) -> bool {
        true
    }

    /// Adds the arguments only this command understands.
    fn register_args(&self, app: App<'static>) -> App<'static> {
        app
    }

    fn exec(&self, invocation: &Invocation) -> anyhow::Result<()>;
}

#[cfg(test)]
pub struct DummyGlobeCommand {}

#[cfg(test)]
impl GlobeCommand for DummyGlobeCommand {
    fn get_description(&self) -> &'static str {
        "dummy"
    }

    fn exec(&self, _: &Invocation) -> anyhow::Result<()> {
        Ok(())
    }
}
