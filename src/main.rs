use clap::{app_from_crate, AppSettings};
use tracing_subscriber::EnvFilter;

use crate::commands::{Build, ClapCommand, Info, Preview};
use crate::config::SerdeConfigParser;

mod commands;
mod config;
mod globe;
mod pipeline;
mod raster;
mod scenejson;
mod utils;
#[cfg(test)]
mod test;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<_> = std::env::args().collect();

    if let Err(e) = execute(&args) {
        println!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn execute(input: &[String]) -> anyhow::Result<()> {
    let commands: Vec<ClapCommand> = vec![
        ClapCommand::new("build", Box::new(Build {}), Box::new(SerdeConfigParser {})),
        ClapCommand::new("preview", Box::new(Preview {}), Box::new(SerdeConfigParser {})),
        ClapCommand::new("info", Box::new(Info {}), Box::new(SerdeConfigParser {})),
        // Add commands here
    ];

    let mut app = app_from_crate!()
        .global_setting(AppSettings::PropagateVersion)
        .global_setting(AppSettings::UseLongFormatForHelpSubcommand)
        .setting(AppSettings::SubcommandRequiredElseHelp);

    app = commands.iter().fold(app, |a, c| a.subcommand(c.register()));

    let matches = app.get_matches_from(input);

    match matches.subcommand() {
        Some((name, sub_matches)) => match commands.iter().find(|c| c.identifier == name) {
            Some(command) => command.run(sub_matches),
            None => unreachable!(),
        },
        None => unreachable!(),
    }
}
